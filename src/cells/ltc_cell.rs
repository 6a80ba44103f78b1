//! Liquid Time-Constant (LTC) Cell Implementation
//!
//! Reference: Hasani et al., "Liquid time-constant networks", AAAI 2021

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::mapping::MappingMode;
use super::params::{InitRanges, LTCParams};
use super::solver::{OdeSolver, DEFAULT_EPSILON, DEFAULT_ODE_UNFOLDS};
use crate::error::{LtcError, Result};
use crate::wirings::{Wiring, WiringConfig};

/// Input of a single step
#[derive(Debug, Clone)]
pub enum StepInput<B: Backend> {
    /// Regularly sampled: `[batch, S]`, elapsed time 1.0
    Regular(Tensor<B, 2>),
    /// Irregularly sampled: `[batch, S]` plus a `[batch]` elapsed time per row
    Irregular {
        inputs: Tensor<B, 2>,
        elapsed_time: Tensor<B, 1>,
    },
}

impl<B: Backend> StepInput<B> {
    /// Irregular input with the same elapsed time for every batch row
    pub fn timed(inputs: Tensor<B, 2>, elapsed_time: f64) -> Self {
        let [batch, _] = inputs.dims();
        let elapsed_time = Tensor::full([batch], elapsed_time, &inputs.device());
        StepInput::Irregular {
            inputs,
            elapsed_time,
        }
    }

    fn into_parts(self) -> (Tensor<B, 2>, Tensor<B, 1>) {
        match self {
            StepInput::Regular(inputs) => {
                let [batch, _] = inputs.dims();
                let elapsed_time = Tensor::ones([batch], &inputs.device());
                (inputs, elapsed_time)
            }
            StepInput::Irregular {
                inputs,
                elapsed_time,
            } => (inputs, elapsed_time),
        }
    }
}

impl<B: Backend> From<Tensor<B, 2>> for StepInput<B> {
    fn from(inputs: Tensor<B, 2>) -> Self {
        StepInput::Regular(inputs)
    }
}

impl<B: Backend> From<(Tensor<B, 2>, Tensor<B, 1>)> for StepInput<B> {
    fn from((inputs, elapsed_time): (Tensor<B, 2>, Tensor<B, 1>)) -> Self {
        StepInput::Irregular {
            inputs,
            elapsed_time,
        }
    }
}

/// Construction options of an LTC cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LTCOptions {
    #[serde(default)]
    pub input_mapping: MappingMode,
    #[serde(default)]
    pub output_mapping: MappingMode,
    #[serde(default = "default_ode_unfolds")]
    pub ode_unfolds: usize,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default)]
    pub initialization_ranges: InitRanges,
}

fn default_ode_unfolds() -> usize {
    DEFAULT_ODE_UNFOLDS
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

impl Default for LTCOptions {
    fn default() -> Self {
        Self {
            input_mapping: MappingMode::Affine,
            output_mapping: MappingMode::Affine,
            ode_unfolds: DEFAULT_ODE_UNFOLDS,
            epsilon: DEFAULT_EPSILON,
            initialization_ranges: InitRanges::default(),
        }
    }
}

impl LTCOptions {
    pub fn with_input_mapping(mut self, mode: MappingMode) -> Self {
        self.input_mapping = mode;
        self
    }

    pub fn with_output_mapping(mut self, mode: MappingMode) -> Self {
        self.output_mapping = mode;
        self
    }

    pub fn with_ode_unfolds(mut self, unfolds: usize) -> Self {
        self.ode_unfolds = unfolds;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_initialization_ranges(mut self, ranges: InitRanges) -> Self {
        self.initialization_ranges = ranges;
        self
    }

    /// Overrides a single initialization range, validating it immediately
    pub fn with_init_range(mut self, name: &str, min: f64, max: f64) -> Result<Self> {
        self.initialization_ranges = self.initialization_ranges.with_range(name, min, max)?;
        Ok(self)
    }

    fn solver(&self) -> Result<OdeSolver> {
        OdeSolver::new(self.ode_unfolds, self.epsilon)
    }
}

/// Serialized configuration of a cell.
///
/// Enough to rebuild an equivalent cell with freshly initialised parameters;
/// trained values travel separately as a burn record of [`LTCParams`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LTCCellConfig {
    pub wiring: WiringConfig,
    #[serde(flatten)]
    pub options: LTCOptions,
}

impl LTCCellConfig {
    pub fn new(wiring: WiringConfig) -> Self {
        Self {
            wiring,
            options: LTCOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LTCOptions) -> Self {
        self.options = options;
        self
    }

    /// Rebuilds the wiring and allocates a new cell for `input_dim` features
    pub fn init<B: Backend>(&self, input_dim: usize, device: &B::Device) -> Result<LTCCell<B>> {
        let mut wiring = self.wiring.clone().into_wiring()?;
        LTCCell::with_options(wiring.as_mut(), input_dim, self.options.clone(), device)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.options.solver()?;
        Ok(config)
    }
}

/// Liquid Time-Constant (LTC) Cell
///
/// Processes one time-step: maps the input, integrates the membrane ODE and
/// emits the motor prefix of the new state through the output mapping. The
/// cell keeps no state between calls.
#[derive(Debug, Clone)]
pub struct LTCCell<B: Backend> {
    params: LTCParams<B>,
    solver: OdeSolver,
    config: LTCCellConfig,
    state_size: usize,
    motor_size: usize,
    sensory_size: usize,
    synapse_count: usize,
    sensory_synapse_count: usize,
}

impl<B: Backend> LTCCell<B> {
    /// Creates a cell with default options, building `wiring` for `input_dim` features
    pub fn new(wiring: &mut dyn Wiring, input_dim: usize, device: &B::Device) -> Result<Self> {
        Self::with_options(wiring, input_dim, LTCOptions::default(), device)
    }

    pub fn with_options(
        wiring: &mut dyn Wiring,
        input_dim: usize,
        options: LTCOptions,
        device: &B::Device,
    ) -> Result<Self> {
        let solver = options.solver()?;
        wiring.build(input_dim)?;

        let state_size = wiring.units();
        let motor_size = wiring.output_dim().unwrap_or(state_size);
        if motor_size > state_size {
            return Err(LtcError::config(format!(
                "motor size {} exceeds state size {}",
                motor_size, state_size
            )));
        }

        let params = LTCParams::init(
            wiring,
            &options.initialization_ranges,
            options.input_mapping,
            options.output_mapping,
            device,
        )?;

        debug!(
            state_size,
            motor_size,
            sensory_size = input_dim,
            synapses = wiring.synapse_count(),
            sensory_synapses = wiring.sensory_synapse_count(),
            ode_unfolds = options.ode_unfolds,
            input_mapping = %options.input_mapping,
            output_mapping = %options.output_mapping,
            "built LTC cell"
        );

        Ok(Self {
            params,
            solver,
            state_size,
            motor_size,
            sensory_size: input_dim,
            synapse_count: wiring.synapse_count(),
            sensory_synapse_count: wiring.sensory_synapse_count(),
            config: LTCCellConfig {
                wiring: wiring.get_config(),
                options,
            },
        })
    }

    pub fn state_size(&self) -> usize {
        self.state_size
    }

    pub fn motor_size(&self) -> usize {
        self.motor_size
    }

    pub fn output_size(&self) -> usize {
        self.motor_size
    }

    pub fn sensory_size(&self) -> usize {
        self.sensory_size
    }

    /// Active recurrent synapses in the wiring
    pub fn synapse_count(&self) -> usize {
        self.synapse_count
    }

    /// Active sensory synapses in the wiring
    pub fn sensory_synapse_count(&self) -> usize {
        self.sensory_synapse_count
    }

    pub fn ode_unfolds(&self) -> usize {
        self.solver.ode_unfolds()
    }

    pub fn epsilon(&self) -> f64 {
        self.solver.epsilon()
    }

    pub fn input_mapping(&self) -> MappingMode {
        self.params.input_map.mode()
    }

    pub fn output_mapping(&self) -> MappingMode {
        self.params.output_map.mode()
    }

    pub fn config(&self) -> LTCCellConfig {
        self.config.clone()
    }

    pub fn params(&self) -> &LTCParams<B> {
        &self.params
    }

    /// Applies an external update to the parameters, then re-applies the
    /// non-negativity constraints. Sparsity masks are restored afterwards.
    ///
    /// The update must keep every shape and both mapping modes; otherwise the
    /// current parameters are left untouched and an error is returned.
    pub fn update_params<F>(&mut self, update: F) -> Result<()>
    where
        F: FnOnce(LTCParams<B>) -> LTCParams<B>,
    {
        let mut params = update(self.params.clone());
        params.check_shapes(&self.params)?;

        params.sparsity_mask = self.params.sparsity_mask.clone();
        params.sensory_sparsity_mask = self.params.sensory_sparsity_mask.clone();
        self.params = params.apply_constraints();
        Ok(())
    }

    /// Replaces the parameters, e.g. with values loaded from a record.
    ///
    /// The replacement must match the built shapes and mapping modes.
    pub fn load_params(&mut self, params: LTCParams<B>) -> Result<()> {
        self.update_params(|_| params)
    }

    /// Zero state for `batch` sequences
    pub fn initial_state(&self, batch: usize, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([batch, self.state_size], device)
    }

    /// Apply input mapping
    fn map_inputs(&self, inputs: Tensor<B, 2>) -> Tensor<B, 2> {
        self.params.input_map.forward(inputs)
    }

    /// Apply output mapping to the motor neurons
    fn map_outputs(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        let output = if self.motor_size < self.state_size {
            state.narrow(1, 0, self.motor_size)
        } else {
            state
        };
        self.params.output_map.forward(output)
    }

    /// Single step, RNN-cell convention: `(output, [next_state])`.
    ///
    /// Shapes are checked against the built dimensions before any compute.
    pub fn step(
        &self,
        sequence: impl Into<StepInput<B>>,
        states: [Tensor<B, 2>; 1],
    ) -> Result<(Tensor<B, 2>, [Tensor<B, 2>; 1])> {
        let (inputs, elapsed_time) = sequence.into().into_parts();
        let [state] = states;
        self.check_shapes(&inputs, &state, &elapsed_time)?;
        check_elapsed_time(&elapsed_time)?;

        trace!(batch = state.dims()[0], "LTC step");
        let (output, next_state) = self.forward(inputs, state, elapsed_time);
        Ok((output, [next_state]))
    }

    /// Unchecked step on raw tensors, returns `(output, next_state)`
    ///
    /// * `inputs` - `[batch, sensory_size]`
    /// * `states` - `[batch, state_size]`
    /// * `elapsed_time` - `[batch]`
    pub fn forward(
        &self,
        inputs: Tensor<B, 2>,
        states: Tensor<B, 2>,
        elapsed_time: Tensor<B, 1>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let mapped_inputs = self.map_inputs(inputs);

        let new_states = self
            .solver
            .solve(&self.params, mapped_inputs, states, elapsed_time);

        let output = self.map_outputs(new_states.clone());

        (output, new_states)
    }

    fn check_shapes(
        &self,
        inputs: &Tensor<B, 2>,
        state: &Tensor<B, 2>,
        elapsed_time: &Tensor<B, 1>,
    ) -> Result<()> {
        let [batch, _] = state.dims();
        let checks = [
            ("state", vec![batch, self.state_size], state.dims().to_vec()),
            ("inputs", vec![batch, self.sensory_size], inputs.dims().to_vec()),
            ("elapsed_time", vec![batch], elapsed_time.dims().to_vec()),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(LtcError::shape_mismatch(what, expected, actual));
            }
        }
        Ok(())
    }
}

/// Every row must cover a positive, finite duration
fn check_elapsed_time<B: Backend>(elapsed_time: &Tensor<B, 1>) -> Result<()> {
    if elapsed_time.dims()[0] == 0 {
        return Ok(());
    }
    let min: f64 = elapsed_time.clone().min().into_scalar().elem();
    let max: f64 = elapsed_time.clone().max().into_scalar().elem();
    if min > 0.0 && max.is_finite() {
        Ok(())
    } else {
        Err(LtcError::InvalidElapsedTime { min, max })
    }
}
