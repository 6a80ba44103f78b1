//! Elementwise input/output mapping: `y = x * w (+ b)`.

use std::fmt;
use std::str::FromStr;

use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{self, LtcError};

/// Input/output mapping modes
///
/// Parsed from text as `"affine"`, `"linear"`, anything else is identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MappingMode {
    /// Affine mapping: y = w * x + b
    #[default]
    Affine,
    /// Linear mapping: y = w * x
    Linear,
    /// Pass-through, no parameters
    Identity,
}

impl MappingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingMode::Affine => "affine",
            MappingMode::Linear => "linear",
            MappingMode::Identity => "identity",
        }
    }

    fn has_scale(&self) -> bool {
        !matches!(self, MappingMode::Identity)
    }

    fn has_shift(&self) -> bool {
        matches!(self, MappingMode::Affine)
    }
}

impl fmt::Display for MappingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "affine" => MappingMode::Affine,
            "linear" => MappingMode::Linear,
            _ => MappingMode::Identity,
        })
    }
}

impl From<String> for MappingMode {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        }
    }
}

impl From<MappingMode> for String {
    fn from(mode: MappingMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Learned elementwise scale and shift.
///
/// Only the tensors the mode needs are allocated; the mode is recovered from
/// which of them are present.
#[derive(Module, Debug)]
pub struct AffineMap<B: Backend> {
    /// Scale, initialised to 1
    pub w: Option<Param<Tensor<B, 1>>>,
    /// Shift, initialised to 0
    pub b: Option<Param<Tensor<B, 1>>>,
}

impl<B: Backend> AffineMap<B> {
    pub fn new(mode: MappingMode, size: usize, device: &B::Device) -> Self {
        let w = mode
            .has_scale()
            .then(|| Param::from_tensor(Tensor::ones([size], device)));
        let b = mode
            .has_shift()
            .then(|| Param::from_tensor(Tensor::zeros([size], device)));
        Self { w, b }
    }

    pub fn mode(&self) -> MappingMode {
        match (&self.w, &self.b) {
            (_, Some(_)) => MappingMode::Affine,
            (Some(_), None) => MappingMode::Linear,
            (None, None) => MappingMode::Identity,
        }
    }

    /// Checks that `self` can stand in for `other`: same mode, same sizes.
    /// A shift without a scale matches no mode and is rejected.
    pub(crate) fn check_compatible(&self, other: &Self, what: &'static str) -> error::Result<()> {
        if self.w.is_none() && self.b.is_some() {
            return Err(LtcError::config(format!(
                "{} mapping has a shift but no scale",
                what
            )));
        }
        if self.mode() != other.mode() {
            return Err(LtcError::config(format!(
                "{} mapping mode differs: expected {}, got {}",
                what,
                other.mode(),
                self.mode()
            )));
        }
        let pairs = [(&self.w, &other.w), (&self.b, &other.b)];
        for (actual, expected) in pairs {
            if let (Some(actual), Some(expected)) = (actual, expected) {
                let (actual, expected) = (actual.val().dims(), expected.val().dims());
                if actual != expected {
                    return Err(LtcError::shape_mismatch(
                        what,
                        expected.to_vec(),
                        actual.to_vec(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// `x: [batch, size]`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut y = x;
        if let Some(w) = &self.w {
            y = y.mul(w.val().unsqueeze::<2>());
        }
        if let Some(b) = &self.b {
            y = y.add(b.val().unsqueeze::<2>());
        }
        y
    }
}
