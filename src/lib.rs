//! # NCPS LTC - Liquid Time-Constant cell (Rust)
//!
//! A single-step LTC cell on the Burn framework, driven by Neural Circuit
//! Policy wirings.
//!
//! ## Features
//!
//! - **LTC**: ODE-based membrane dynamics unfolded a fixed number of times
//! - **Irregular sampling**: per-row elapsed time on every step
//! - **Wirings**: fully connected, random sparse, NCP and AutoNCP topologies
//! - **Sparsity Masks**: wiring adjacency enforced on every synapse
//! - **Input/Output Mapping**: Affine, Linear, or pass-through modes
//! - **Config**: JSON round-trip of the cell and its wiring
//!
//! ## Quick Start
//!
//! ```rust
//! use ncps_ltc::prelude::*;
//!
//! // Create a wiring configuration
//! let mut wiring = AutoNCP::new(32, 8, 0.5, 22222).unwrap();
//! wiring.build(16).unwrap(); // 16 input features
//!
//! assert_eq!(wiring.units(), 32);
//! assert_eq!(wiring.output_dim(), Some(8));
//! ```

pub mod cells;
pub mod error;
pub mod wirings;

pub use error::{LtcError, Result, WiringError};

pub mod prelude {
    pub use crate::cells::{LTCCell, LTCCellConfig, LTCOptions, MappingMode, StepInput};
    pub use crate::error::{LtcError, WiringError};
    pub use crate::wirings::{AutoNCP, FullyConnected, NCP, Random, Wiring, WiringConfig};
}
