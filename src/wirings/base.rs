use ndarray::Array2;
use rand::prelude::*;
use tracing::debug;

use super::{matrix_from_rows, matrix_to_rows, WiringConfig, WiringKind};
use crate::error::WiringError;

/// Role of a neuron inside a wiring
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeuronType {
    Motor,
    Command,
    Inter,
}

/// Topology contract consumed by the LTC cell
pub trait Wiring: Send + Sync + std::fmt::Debug {
    /// Returns the number of neurons in this wiring
    fn units(&self) -> usize;

    /// Returns the input dimension (number of sensory neurons)
    fn input_dim(&self) -> Option<usize>;

    /// Returns the output dimension (number of motor neurons)
    fn output_dim(&self) -> Option<usize>;

    fn num_layers(&self) -> usize {
        1
    }

    fn get_neurons_of_layer(&self, layer_id: usize) -> Vec<usize> {
        if layer_id == 0 {
            (0..self.units()).collect()
        } else {
            vec![]
        }
    }

    /// Check if the wiring has been built (input dimension is set)
    fn is_built(&self) -> bool {
        self.input_dim().is_some()
    }

    /// Build the sensory side of the wiring for `input_dim` features.
    ///
    /// Building again with the same width is a no-op; a different width fails.
    fn build(&mut self, input_dim: usize) -> Result<(), WiringError>;

    fn neuron_type(&self, neuron_id: usize) -> NeuronType {
        if neuron_id < self.output_dim().unwrap_or(0) {
            NeuronType::Motor
        } else {
            NeuronType::Inter
        }
    }

    /// Signed `[units, units]` matrix; entry `[src, dest]` is the polarity of a synapse
    fn adjacency_matrix(&self) -> &Array2<i32>;

    /// Signed `[input_dim, units]` matrix, present once built
    fn sensory_adjacency_matrix(&self) -> Option<&Array2<i32>>;

    /// Initial reversal potentials for recurrent synapses
    fn erev_initializer(&self) -> Array2<i32> {
        self.adjacency_matrix().clone()
    }

    /// Initial reversal potentials for sensory synapses
    fn sensory_erev_initializer(&self) -> Option<Array2<i32>> {
        self.sensory_adjacency_matrix().cloned()
    }

    fn add_synapse(&mut self, src: usize, dest: usize, polarity: i32) -> Result<(), WiringError>;

    fn add_sensory_synapse(
        &mut self,
        src: usize,
        dest: usize,
        polarity: i32,
    ) -> Result<(), WiringError>;

    fn synapse_count(&self) -> usize {
        self.adjacency_matrix().mapv(|x| x.unsigned_abs() as usize).sum()
    }

    fn sensory_synapse_count(&self) -> usize {
        self.sensory_adjacency_matrix()
            .map(|m| m.mapv(|x| x.unsigned_abs() as usize).sum())
            .unwrap_or(0)
    }

    /// Serializable snapshot used to rebuild an identical wiring
    fn get_config(&self) -> WiringConfig;
}

/// Adjacency bookkeeping shared by every wiring
#[derive(Clone, Debug)]
pub(crate) struct Adjacency {
    units: usize,
    matrix: Array2<i32>,
    sensory: Option<Array2<i32>>,
}

impl Adjacency {
    pub(crate) fn new(units: usize) -> Self {
        Self {
            units,
            matrix: Array2::zeros((units, units)),
            sensory: None,
        }
    }

    pub(crate) fn units(&self) -> usize {
        self.units
    }

    pub(crate) fn input_dim(&self) -> Option<usize> {
        self.sensory.as_ref().map(|m| m.nrows())
    }

    pub(crate) fn matrix(&self) -> &Array2<i32> {
        &self.matrix
    }

    pub(crate) fn sensory(&self) -> Option<&Array2<i32>> {
        self.sensory.as_ref()
    }

    /// Allocates the sensory matrix. Returns `false` when already built for `input_dim`.
    pub(crate) fn begin_build(&mut self, input_dim: usize) -> Result<bool, WiringError> {
        match self.input_dim() {
            Some(existing) if existing != input_dim => Err(WiringError::ConflictingInputDim {
                expected: existing,
                got: input_dim,
            }),
            Some(_) => Ok(false),
            None => {
                self.sensory = Some(Array2::zeros((input_dim, self.units)));
                Ok(true)
            }
        }
    }

    pub(crate) fn add_synapse(
        &mut self,
        src: usize,
        dest: usize,
        polarity: i32,
    ) -> Result<(), WiringError> {
        if src >= self.units || dest >= self.units {
            return Err(WiringError::InvalidSynapse {
                src,
                dest,
                units: self.units,
            });
        }
        check_polarity(polarity)?;
        self.matrix[[src, dest]] = polarity;
        Ok(())
    }

    pub(crate) fn add_sensory_synapse(
        &mut self,
        src: usize,
        dest: usize,
        polarity: i32,
    ) -> Result<(), WiringError> {
        let units = self.units;
        let sensory = self.sensory.as_mut().ok_or(WiringError::NotBuilt)?;
        let input_dim = sensory.nrows();
        if src >= input_dim || dest >= units {
            return Err(WiringError::InvalidSensorySynapse {
                src,
                dest,
                input_dim,
                units,
            });
        }
        check_polarity(polarity)?;
        sensory[[src, dest]] = polarity;
        Ok(())
    }

    pub(crate) fn write_config(&self, config: &mut WiringConfig) {
        config.adjacency_matrix = Some(matrix_to_rows(&self.matrix));
        config.sensory_adjacency_matrix = self.sensory.as_ref().map(matrix_to_rows);
        config.input_dim = self.input_dim();
    }

    /// Overwrites the matrices with those stored in `config`, when present.
    pub(crate) fn restore(&mut self, config: &WiringConfig) -> Result<(), WiringError> {
        if let Some(rows) = config.adjacency_matrix.clone() {
            self.matrix = matrix_from_rows(rows, (self.units, self.units), "adjacency")?;
        }
        if let Some(rows) = config.sensory_adjacency_matrix.clone() {
            let input_dim = config.input_dim.ok_or(WiringError::NotBuilt)?;
            self.sensory = Some(matrix_from_rows(
                rows,
                (input_dim, self.units),
                "sensory adjacency",
            )?);
        }
        Ok(())
    }
}

pub(crate) fn check_polarity(polarity: i32) -> Result<(), WiringError> {
    if polarity == 1 || polarity == -1 {
        Ok(())
    } else {
        Err(WiringError::InvalidPolarity(polarity))
    }
}

/// One third inhibitory, two thirds excitatory
pub(crate) fn random_polarity<R: Rng>(rng: &mut R) -> i32 {
    if rng.gen::<f64>() < 0.33 {
        -1
    } else {
        1
    }
}

/// Fully connected wiring structure
#[derive(Clone, Debug)]
pub struct FullyConnected {
    adjacency: Adjacency,
    output_dim: usize,
    self_connections: bool,
    erev_init_seed: u64,
}

impl FullyConnected {
    pub fn new(
        units: usize,
        output_dim: Option<usize>,
        erev_init_seed: u64,
        self_connections: bool,
    ) -> Result<Self, WiringError> {
        let output_dim = output_dim.unwrap_or(units);
        if output_dim > units {
            return Err(WiringError::InvalidOutputSize {
                output: output_dim,
                limit: units,
            });
        }

        let mut adjacency = Adjacency::new(units);
        let mut rng = StdRng::seed_from_u64(erev_init_seed);
        for src in 0..units {
            for dest in 0..units {
                if src == dest && !self_connections {
                    continue;
                }
                adjacency.add_synapse(src, dest, random_polarity(&mut rng))?;
            }
        }

        Ok(Self {
            adjacency,
            output_dim,
            self_connections,
            erev_init_seed,
        })
    }

    pub fn from_config(config: WiringConfig) -> Result<Self, WiringError> {
        let mut wiring = Self::new(
            config.units,
            config.output_dim,
            config.erev_init_seed.unwrap_or(1111),
            config.self_connections.unwrap_or(true),
        )?;
        wiring.adjacency.restore(&config)?;
        Ok(wiring)
    }
}

impl Wiring for FullyConnected {
    fn units(&self) -> usize {
        self.adjacency.units()
    }

    fn input_dim(&self) -> Option<usize> {
        self.adjacency.input_dim()
    }

    fn output_dim(&self) -> Option<usize> {
        Some(self.output_dim)
    }

    fn build(&mut self, input_dim: usize) -> Result<(), WiringError> {
        if !self.adjacency.begin_build(input_dim)? {
            return Ok(());
        }

        let mut rng = StdRng::seed_from_u64(self.erev_init_seed);
        for src in 0..input_dim {
            for dest in 0..self.units() {
                self.adjacency
                    .add_sensory_synapse(src, dest, random_polarity(&mut rng))?;
            }
        }
        debug!(
            units = self.units(),
            input_dim,
            synapses = self.synapse_count(),
            "built fully connected wiring"
        );
        Ok(())
    }

    fn adjacency_matrix(&self) -> &Array2<i32> {
        self.adjacency.matrix()
    }

    fn sensory_adjacency_matrix(&self) -> Option<&Array2<i32>> {
        self.adjacency.sensory()
    }

    fn add_synapse(&mut self, src: usize, dest: usize, polarity: i32) -> Result<(), WiringError> {
        self.adjacency.add_synapse(src, dest, polarity)
    }

    fn add_sensory_synapse(
        &mut self,
        src: usize,
        dest: usize,
        polarity: i32,
    ) -> Result<(), WiringError> {
        self.adjacency.add_sensory_synapse(src, dest, polarity)
    }

    fn get_config(&self) -> WiringConfig {
        let mut config = WiringConfig::new(WiringKind::FullyConnected, self.units());
        self.adjacency.write_config(&mut config);
        config.output_dim = Some(self.output_dim);
        config.erev_init_seed = Some(self.erev_init_seed);
        config.self_connections = Some(self.self_connections);
        config
    }
}
