//! # LTC Cell
//!
//! Single-step Liquid Time-Constant cell, split into the pieces it is made of:
//!
//! | Module | Role |
//! |--------|------|
//! | [`synapse`] | sigmoidal synapse activation and its current reduction |
//! | [`solver`] | fused semi-implicit Euler unfolding of the membrane ODE |
//! | [`mapping`] | elementwise affine input/output maps |
//! | [`params`] | parameter store, initialization ranges and constraints |
//! | [`ltc_cell`] | the cell driver tying them together |
//!
//! ## Tensor Shapes
//!
//! | Tensor | Shape | Description |
//! |--------|-------|-------------|
//! | `inputs` | `[batch, sensory_size]` | Input features |
//! | `elapsed_time` | `[batch]` | Time covered by the step |
//! | `state` | `[batch, state_size]` | Membrane potentials |
//! | `output` | `[batch, motor_size]` | Mapped motor neurons |
//!
//! ## Example
//!
//! ```rust
//! use burn::backend::NdArray;
//! use burn::tensor::Tensor;
//! use ncps_ltc::cells::LTCCell;
//! use ncps_ltc::wirings::FullyConnected;
//!
//! type Backend = NdArray<f32>;
//!
//! let device = Default::default();
//! let mut wiring = FullyConnected::new(8, Some(2), 1234, true).unwrap();
//! let cell = LTCCell::<Backend>::new(&mut wiring, 3, &device).unwrap();
//!
//! let inputs = Tensor::<Backend, 2>::zeros([4, 3], &device);
//! let state = cell.initial_state(4, &device);
//! let (output, [next_state]) = cell.step(inputs, [state]).unwrap();
//!
//! assert_eq!(output.dims(), [4, 2]);
//! assert_eq!(next_state.dims(), [4, 8]);
//! ```

pub mod ltc_cell;
pub mod mapping;
pub mod params;
pub mod solver;
pub mod synapse;

pub use ltc_cell::{LTCCell, LTCCellConfig, LTCOptions, StepInput};
pub use mapping::{AffineMap, MappingMode};
pub use params::{Constraint, InitRange, InitRanges, LTCParams, ParamName};
pub use solver::OdeSolver;
pub use synapse::{SynapticCurrent, Synapses};
