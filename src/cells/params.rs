//! Parameter store for the LTC cell.
//!
//! All trainable tensors live in the fixed [`LTCParams`] struct. Initialization
//! is driven by per-parameter [`InitRange`]s and the conductance-type tensors
//! carry a [`Constraint::NonNeg`] that is re-applied after every mutation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::{Distribution, Tensor, TensorData};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::mapping::{AffineMap, MappingMode};
use crate::error::{LtcError, Result, WiringError};
use crate::wirings::Wiring;

/// Parameters whose initialization range can be configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParamName {
    Gleak,
    Vleak,
    Cm,
    W,
    Sigma,
    Mu,
    SensoryW,
    SensorySigma,
    SensoryMu,
}

impl ParamName {
    pub const ALL: [ParamName; 9] = [
        ParamName::Gleak,
        ParamName::Vleak,
        ParamName::Cm,
        ParamName::W,
        ParamName::Sigma,
        ParamName::Mu,
        ParamName::SensoryW,
        ParamName::SensorySigma,
        ParamName::SensoryMu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::Gleak => "gleak",
            ParamName::Vleak => "vleak",
            ParamName::Cm => "cm",
            ParamName::W => "w",
            ParamName::Sigma => "sigma",
            ParamName::Mu => "mu",
            ParamName::SensoryW => "sensory_w",
            ParamName::SensorySigma => "sensory_sigma",
            ParamName::SensoryMu => "sensory_mu",
        }
    }

    /// Conductances and capacitance must stay non-negative
    pub fn is_conductance(&self) -> bool {
        matches!(
            self,
            ParamName::Gleak | ParamName::Cm | ParamName::W | ParamName::SensoryW
        )
    }

    pub fn constraint(&self) -> Option<Constraint> {
        self.is_conductance().then_some(Constraint::NonNeg)
    }

    pub fn default_range(&self) -> InitRange {
        match self {
            ParamName::Gleak | ParamName::W | ParamName::SensoryW => InitRange::new(0.001, 1.0),
            ParamName::Vleak => InitRange::new(-0.2, 0.2),
            ParamName::Cm => InitRange::new(0.4, 0.6),
            ParamName::Sigma | ParamName::SensorySigma => InitRange::new(3.0, 8.0),
            ParamName::Mu | ParamName::SensoryMu => InitRange::new(0.3, 0.8),
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = LtcError;

    fn from_str(s: &str) -> Result<Self> {
        ParamName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| LtcError::UnknownParameter {
                name: s.to_string(),
                expected: ParamName::ALL.iter().map(|name| name.as_str()).collect(),
            })
    }
}

/// Closed interval a parameter is drawn from; `min == max` means constant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitRange {
    pub min: f64,
    pub max: f64,
}

impl InitRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn initializer(&self) -> Initializer {
        if self.min == self.max {
            Initializer::Constant(self.min)
        } else {
            Initializer::Uniform {
                min: self.min,
                max: self.max,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Initializer {
    Constant(f64),
    Uniform { min: f64, max: f64 },
}

impl Initializer {
    pub fn init<B: Backend, const D: usize>(
        &self,
        shape: [usize; D],
        device: &B::Device,
    ) -> Tensor<B, D> {
        match *self {
            Initializer::Constant(value) => Tensor::full(shape, value, device),
            Initializer::Uniform { min, max } => {
                Tensor::random(shape, Distribution::Uniform(min, max), device)
            }
        }
    }
}

/// Validated initialization ranges for every configurable parameter.
///
/// Serializes as a `name -> (min, max)` map; deserialization runs the same
/// validation as [`InitRanges::with_range`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, (f64, f64)>",
    into = "BTreeMap<String, (f64, f64)>"
)]
pub struct InitRanges {
    ranges: [InitRange; 9],
}

impl Default for InitRanges {
    fn default() -> Self {
        Self {
            ranges: ParamName::ALL.map(|name| name.default_range()),
        }
    }
}

impl InitRanges {
    pub fn get(&self, name: ParamName) -> InitRange {
        self.ranges[name.index()]
    }

    /// Override one range. Checks, in order: known name, non-negative
    /// lower bound for conductances, `min <= max`.
    pub fn with_range(mut self, name: &str, min: f64, max: f64) -> Result<Self> {
        let param: ParamName = name.parse()?;
        if param.is_conductance() && min < 0.0 {
            return Err(LtcError::NegativeLowerBound {
                name: name.to_string(),
                min,
            });
        }
        if min > max {
            return Err(LtcError::InvalidRange {
                name: name.to_string(),
                min,
                max,
            });
        }
        self.ranges[param.index()] = InitRange::new(min, max);
        Ok(self)
    }

    /// Defaults overridden by every `(name, (min, max))` pair
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, (f64, f64))>,
        K: AsRef<str>,
    {
        pairs
            .into_iter()
            .try_fold(Self::default(), |ranges, (name, (min, max))| {
                ranges.with_range(name.as_ref(), min, max)
            })
    }
}

impl TryFrom<BTreeMap<String, (f64, f64)>> for InitRanges {
    type Error = LtcError;

    fn try_from(map: BTreeMap<String, (f64, f64)>) -> Result<Self> {
        Self::from_pairs(map)
    }
}

impl From<InitRanges> for BTreeMap<String, (f64, f64)> {
    fn from(ranges: InitRanges) -> Self {
        ParamName::ALL
            .iter()
            .map(|name| {
                let range = ranges.get(*name);
                (name.as_str().to_string(), (range.min, range.max))
            })
            .collect()
    }
}

/// Constraint re-applied to a parameter after it changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    NonNeg,
}

impl Constraint {
    pub fn apply<B: Backend, const D: usize>(&self, tensor: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Constraint::NonNeg => tensor.clamp_min(0.0),
        }
    }
}

/// Every tensor of an LTC cell.
///
/// `[P, N]` matrices are indexed `[presynaptic, postsynaptic]`.
#[derive(Module, Debug)]
pub struct LTCParams<B: Backend> {
    /// Leak conductance `[N]`, non-negative
    pub gleak: Param<Tensor<B, 1>>,
    /// Leak reversal potential `[N]`
    pub vleak: Param<Tensor<B, 1>>,
    /// Membrane capacitance `[N]`, non-negative
    pub cm: Param<Tensor<B, 1>>,
    /// Sigmoid slope of recurrent synapses `[N, N]`
    pub sigma: Param<Tensor<B, 2>>,
    /// Sigmoid midpoint of recurrent synapses `[N, N]`
    pub mu: Param<Tensor<B, 2>>,
    /// Maximum conductance of recurrent synapses `[N, N]`, non-negative
    pub w: Param<Tensor<B, 2>>,
    /// Reversal potential of recurrent synapses `[N, N]`
    pub erev: Param<Tensor<B, 2>>,
    pub sensory_sigma: Param<Tensor<B, 2>>,
    pub sensory_mu: Param<Tensor<B, 2>>,
    /// Maximum conductance of sensory synapses `[S, N]`, non-negative
    pub sensory_w: Param<Tensor<B, 2>>,
    pub sensory_erev: Param<Tensor<B, 2>>,
    /// `|adjacency|`, fixed at build time
    pub sparsity_mask: Param<Tensor<B, 2>>,
    /// `|sensory adjacency|`, fixed at build time
    pub sensory_sparsity_mask: Param<Tensor<B, 2>>,
    pub input_map: AffineMap<B>,
    pub output_map: AffineMap<B>,
}

impl<B: Backend> LTCParams<B> {
    /// Allocates every parameter for a built wiring.
    pub fn init(
        wiring: &dyn Wiring,
        ranges: &InitRanges,
        input_mapping: MappingMode,
        output_mapping: MappingMode,
        device: &B::Device,
    ) -> Result<Self> {
        let state_size = wiring.units();
        let motor_size = wiring.output_dim().unwrap_or(state_size);
        let sensory_matrix = wiring
            .sensory_erev_initializer()
            .ok_or(WiringError::NotBuilt)?;
        let sensory_size = sensory_matrix.nrows();
        let adjacency = wiring.erev_initializer();

        let init = |name: ParamName| ranges.get(name).initializer();
        let square = [state_size, state_size];
        let sensory = [sensory_size, state_size];

        let params = Self {
            gleak: Param::from_tensor(init(ParamName::Gleak).init([state_size], device)),
            vleak: Param::from_tensor(init(ParamName::Vleak).init([state_size], device)),
            cm: Param::from_tensor(init(ParamName::Cm).init([state_size], device)),
            sigma: Param::from_tensor(init(ParamName::Sigma).init(square, device)),
            mu: Param::from_tensor(init(ParamName::Mu).init(square, device)),
            w: Param::from_tensor(init(ParamName::W).init(square, device)),
            erev: Param::from_tensor(tensor_from_matrix(&adjacency, |x| x as f32, device)),
            sensory_sigma: Param::from_tensor(init(ParamName::SensorySigma).init(sensory, device)),
            sensory_mu: Param::from_tensor(init(ParamName::SensoryMu).init(sensory, device)),
            sensory_w: Param::from_tensor(init(ParamName::SensoryW).init(sensory, device)),
            sensory_erev: Param::from_tensor(tensor_from_matrix(
                &sensory_matrix,
                |x| x as f32,
                device,
            )),
            sparsity_mask: Param::from_tensor(tensor_from_matrix(
                &adjacency,
                |x| x.abs() as f32,
                device,
            )),
            sensory_sparsity_mask: Param::from_tensor(tensor_from_matrix(
                &sensory_matrix,
                |x| x.abs() as f32,
                device,
            )),
            input_map: AffineMap::new(input_mapping, sensory_size, device),
            output_map: AffineMap::new(output_mapping, motor_size, device),
        };

        Ok(params.apply_constraints())
    }

    /// Clamps `gleak`, `cm`, `w` and `sensory_w` to be >= 0
    pub fn apply_constraints(mut self) -> Self {
        let non_neg = Constraint::NonNeg;
        self.gleak = Param::from_tensor(non_neg.apply(self.gleak.val()));
        self.cm = Param::from_tensor(non_neg.apply(self.cm.val()));
        self.w = Param::from_tensor(non_neg.apply(self.w.val()));
        self.sensory_w = Param::from_tensor(non_neg.apply(self.sensory_w.val()));
        self
    }

    /// `(state_size, sensory_size)` as seen by the recurrent and sensory matrices
    pub fn dims(&self) -> (usize, usize) {
        let [sensory_size, state_size] = self.sensory_w.val().dims();
        (state_size, sensory_size)
    }

    /// Checks every tensor against the dimensions of `other`.
    pub(crate) fn check_shapes(&self, other: &Self) -> Result<()> {
        let vectors = [
            ("gleak", self.gleak.val().dims(), other.gleak.val().dims()),
            ("vleak", self.vleak.val().dims(), other.vleak.val().dims()),
            ("cm", self.cm.val().dims(), other.cm.val().dims()),
        ];
        for (what, actual, expected) in vectors {
            if actual != expected {
                return Err(LtcError::shape_mismatch(what, expected.to_vec(), actual.to_vec()));
            }
        }

        let matrices = [
            ("sigma", self.sigma.val().dims(), other.sigma.val().dims()),
            ("mu", self.mu.val().dims(), other.mu.val().dims()),
            ("w", self.w.val().dims(), other.w.val().dims()),
            ("erev", self.erev.val().dims(), other.erev.val().dims()),
            ("sensory_sigma", self.sensory_sigma.val().dims(), other.sensory_sigma.val().dims()),
            ("sensory_mu", self.sensory_mu.val().dims(), other.sensory_mu.val().dims()),
            ("sensory_w", self.sensory_w.val().dims(), other.sensory_w.val().dims()),
            ("sensory_erev", self.sensory_erev.val().dims(), other.sensory_erev.val().dims()),
        ];
        for (what, actual, expected) in matrices {
            if actual != expected {
                return Err(LtcError::shape_mismatch(what, expected.to_vec(), actual.to_vec()));
            }
        }

        self.input_map.check_compatible(&other.input_map, "input")?;
        self.output_map.check_compatible(&other.output_map, "output")?;
        Ok(())
    }
}

fn tensor_from_matrix<B: Backend>(
    matrix: &Array2<i32>,
    convert: impl Fn(i32) -> f32,
    device: &B::Device,
) -> Tensor<B, 2> {
    let (rows, cols) = matrix.dim();
    let data: Vec<f32> = matrix.iter().map(|&x| convert(x)).collect();
    Tensor::from_data(TensorData::new(data, [rows, cols]), device)
}
