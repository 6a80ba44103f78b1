//! # Wiring collaborators
//!
//! A wiring decides which neurons are connected and with which polarity. The
//! LTC cell only reads the resulting signed adjacency matrices: `|adjacency|`
//! becomes the sparsity mask and the sign seeds the reversal potentials.
//!
//! | Wiring | Topology |
//! |--------|----------|
//! | [`FullyConnected`] | every neuron to every neuron |
//! | [`Random`] | uniformly sampled subset of synapses |
//! | [`NCP`] / [`AutoNCP`] | sensory → inter → command → motor layers |

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::WiringError;

mod base;
mod ncp;
mod random;

pub use base::{FullyConnected, NeuronType, Wiring};
pub use ncp::{AutoNCP, NCP};
pub use random::Random;

pub(crate) use base::Adjacency;

/// Which concrete wiring a [`WiringConfig`] describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WiringKind {
    FullyConnected,
    Random,
    Ncp,
    AutoNcp,
}

/// Serializable snapshot of a wiring.
///
/// Constructor parameters are kept so an unbuilt wiring can be recreated and
/// built later; the adjacency matrices are kept so a built wiring comes back
/// with exactly the same synapses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WiringConfig {
    pub kind: WiringKind,
    pub units: usize,
    #[serde(default)]
    pub adjacency_matrix: Option<Vec<Vec<i32>>>,
    #[serde(default)]
    pub sensory_adjacency_matrix: Option<Vec<Vec<i32>>>,
    #[serde(default)]
    pub input_dim: Option<usize>,
    #[serde(default)]
    pub output_dim: Option<usize>,
    // FullyConnected
    #[serde(default)]
    pub erev_init_seed: Option<u64>,
    #[serde(default)]
    pub self_connections: Option<bool>,
    // NCP
    #[serde(default)]
    pub num_inter_neurons: Option<usize>,
    #[serde(default)]
    pub num_command_neurons: Option<usize>,
    #[serde(default)]
    pub num_motor_neurons: Option<usize>,
    #[serde(default)]
    pub sensory_fanout: Option<usize>,
    #[serde(default)]
    pub inter_fanout: Option<usize>,
    #[serde(default)]
    pub recurrent_command_synapses: Option<usize>,
    #[serde(default)]
    pub motor_fanin: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
    // Random / AutoNCP
    #[serde(default)]
    pub sparsity_level: Option<f64>,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl WiringConfig {
    /// Empty config for `kind`; each wiring fills in its own fields.
    pub fn new(kind: WiringKind, units: usize) -> Self {
        Self {
            kind,
            units,
            adjacency_matrix: None,
            sensory_adjacency_matrix: None,
            input_dim: None,
            output_dim: None,
            erev_init_seed: None,
            self_connections: None,
            num_inter_neurons: None,
            num_command_neurons: None,
            num_motor_neurons: None,
            sensory_fanout: None,
            inter_fanout: None,
            recurrent_command_synapses: None,
            motor_fanin: None,
            seed: None,
            sparsity_level: None,
            random_seed: None,
        }
    }

    /// Recreate the wiring this config was taken from.
    pub fn into_wiring(self) -> Result<Box<dyn Wiring>, WiringError> {
        Ok(match self.kind {
            WiringKind::FullyConnected => Box::new(FullyConnected::from_config(self)?),
            WiringKind::Random => Box::new(Random::from_config(self)?),
            WiringKind::Ncp => Box::new(NCP::from_config(self)?),
            WiringKind::AutoNcp => Box::new(AutoNCP::from_config(self)?),
        })
    }
}

pub(crate) fn matrix_to_rows(matrix: &Array2<i32>) -> Vec<Vec<i32>> {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}

pub(crate) fn matrix_from_rows(
    rows: Vec<Vec<i32>>,
    shape: (usize, usize),
    what: &'static str,
) -> Result<Array2<i32>, WiringError> {
    let malformed = WiringError::MalformedMatrix {
        what,
        rows: shape.0,
        cols: shape.1,
    };
    if rows.len() != shape.0 || rows.iter().any(|row| row.len() != shape.1) {
        return Err(malformed);
    }
    Array2::from_shape_vec(shape, rows.into_iter().flatten().collect()).map_err(|_| malformed)
}
