use ndarray::Array2;
use rand::prelude::*;
use tracing::debug;

use super::base::{random_polarity, Adjacency, Wiring};
use super::{WiringConfig, WiringKind};
use crate::error::WiringError;

/// Random sparsity wiring structure
///
/// Keeps `round((1 - sparsity_level) * total)` synapses, chosen uniformly,
/// for both the recurrent and the sensory matrix.
#[derive(Clone, Debug)]
pub struct Random {
    adjacency: Adjacency,
    output_dim: usize,
    sparsity_level: f64,
    random_seed: u64,
}

impl Random {
    pub fn new(
        units: usize,
        output_dim: Option<usize>,
        sparsity_level: f64,
        random_seed: u64,
    ) -> Result<Self, WiringError> {
        if !(0.0..1.0).contains(&sparsity_level) {
            return Err(WiringError::InvalidSparsity {
                level: sparsity_level,
                allowed: "[0, 1)",
            });
        }
        let output_dim = output_dim.unwrap_or(units);
        if output_dim > units {
            return Err(WiringError::InvalidOutputSize {
                output: output_dim,
                limit: units,
            });
        }

        let mut adjacency = Adjacency::new(units);
        let mut rng = StdRng::seed_from_u64(random_seed);
        for (src, dest, polarity) in sample_synapses(units, units, sparsity_level, &mut rng) {
            adjacency.add_synapse(src, dest, polarity)?;
        }

        Ok(Self {
            adjacency,
            output_dim,
            sparsity_level,
            random_seed,
        })
    }

    pub fn sparsity_level(&self) -> f64 {
        self.sparsity_level
    }

    pub fn from_config(config: WiringConfig) -> Result<Self, WiringError> {
        let mut wiring = Self::new(
            config.units,
            config.output_dim,
            config.sparsity_level.unwrap_or(0.5),
            config.random_seed.unwrap_or(1111),
        )?;
        wiring.adjacency.restore(&config)?;
        Ok(wiring)
    }
}

/// Samples `(src, dest, polarity)` triples without replacement.
fn sample_synapses(
    sources: usize,
    targets: usize,
    sparsity_level: f64,
    rng: &mut StdRng,
) -> Vec<(usize, usize, i32)> {
    let total = sources * targets;
    let keep = (total as f64 * (1.0 - sparsity_level)).round() as usize;

    let pairs: Vec<(usize, usize)> = (0..sources)
        .flat_map(|src| (0..targets).map(move |dest| (src, dest)))
        .collect();
    let selected: Vec<(usize, usize)> = pairs.choose_multiple(rng, keep).cloned().collect();

    selected
        .into_iter()
        .map(|(src, dest)| (src, dest, random_polarity(rng)))
        .collect()
}

impl Wiring for Random {
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

        let mut rng = StdRng::seed_from_u64(self.random_seed);
        for (src, dest, polarity) in
            sample_synapses(input_dim, self.units(), self.sparsity_level, &mut rng)
        {
            self.adjacency.add_sensory_synapse(src, dest, polarity)?;
        }
        debug!(
            units = self.units(),
            input_dim,
            sparsity = self.sparsity_level,
            synapses = self.synapse_count(),
            sensory_synapses = self.sensory_synapse_count(),
            "built random wiring"
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
        let mut config = WiringConfig::new(WiringKind::Random, self.units());
        self.adjacency.write_config(&mut config);
        config.output_dim = Some(self.output_dim);
        config.sparsity_level = Some(self.sparsity_level);
        config.random_seed = Some(self.random_seed);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_synapse_count() {
        let wiring = Random::new(10, None, 0.75, 5).unwrap();
        assert_eq!(wiring.synapse_count(), 25);
    }

    #[test]
    fn test_zero_sparsity_is_dense() {
        let mut wiring = Random::new(4, Some(2), 0.0, 5).unwrap();
        wiring.build(3).unwrap();
        assert_eq!(wiring.synapse_count(), 16);
        assert_eq!(wiring.sensory_synapse_count(), 12);
    }

    #[test]
    fn test_invalid_sparsity() {
        assert!(matches!(
            Random::new(4, None, 1.0, 5),
            Err(WiringError::InvalidSparsity { .. })
        ));
        assert!(Random::new(4, None, -0.1, 5).is_err());
    }
}
