use ndarray::Array2;
use rand::prelude::*;
use tracing::debug;

use super::base::{random_polarity, Adjacency, NeuronType, Wiring};
use super::{WiringConfig, WiringKind};
use crate::error::WiringError;

/// Neural Circuit Policy wiring structure
/// Implements a 4-layer architecture: sensories -> inter -> command -> motor
///
/// Neuron ids are laid out as `[motor | command | inter]`, so the motor
/// neurons are the state prefix the cell emits as output.
#[derive(Clone, Debug)]
pub struct NCP {
    adjacency: Adjacency,
    num_inter_neurons: usize,
    num_command_neurons: usize,
    num_motor_neurons: usize,
    sensory_fanout: usize,
    inter_fanout: usize,
    recurrent_command_synapses: usize,
    motor_fanin: usize,
    motor_neurons: Vec<usize>,
    command_neurons: Vec<usize>,
    inter_neurons: Vec<usize>,
    seed: u64,
    rng: StdRng,
}

impl NCP {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inter_neurons: usize,
        command_neurons: usize,
        motor_neurons: usize,
        sensory_fanout: usize,
        inter_fanout: usize,
        recurrent_command_synapses: usize,
        motor_fanin: usize,
        seed: u64,
    ) -> Result<Self, WiringError> {
        check_fanout("Motor fanin", motor_fanin, "command", command_neurons)?;
        check_fanout("Sensory fanout", sensory_fanout, "inter", inter_neurons)?;
        check_fanout("Inter fanout", inter_fanout, "command", command_neurons)?;

        let units = inter_neurons + command_neurons + motor_neurons;
        let command_start = motor_neurons;
        let inter_start = motor_neurons + command_neurons;

        Ok(Self {
            adjacency: Adjacency::new(units),
            num_inter_neurons: inter_neurons,
            num_command_neurons: command_neurons,
            num_motor_neurons: motor_neurons,
            sensory_fanout,
            inter_fanout,
            recurrent_command_synapses,
            motor_fanin,
            motor_neurons: (0..command_start).collect(),
            command_neurons: (command_start..inter_start).collect(),
            inter_neurons: (inter_start..units).collect(),
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    fn build_sensory_to_inter_layer(&mut self, input_dim: usize) -> Result<(), WiringError> {
        let mut unreachable_inter = self.inter_neurons.clone();

        for src in 0..input_dim {
            let selected: Vec<usize> = self
                .inter_neurons
                .choose_multiple(&mut self.rng, self.sensory_fanout)
                .cloned()
                .collect();
            for dest in selected {
                unreachable_inter.retain(|&n| n != dest);
                let polarity = random_polarity(&mut self.rng);
                self.adjacency.add_sensory_synapse(src, dest, polarity)?;
            }
        }

        if input_dim == 0 {
            return Ok(());
        }
        let mean_inter_fanin = (input_dim * self.sensory_fanout / self.num_inter_neurons.max(1))
            .max(1)
            .min(input_dim);
        let sensory_neurons: Vec<usize> = (0..input_dim).collect();
        for dest in unreachable_inter {
            let selected: Vec<usize> = sensory_neurons
                .choose_multiple(&mut self.rng, mean_inter_fanin)
                .cloned()
                .collect();
            for src in selected {
                let polarity = random_polarity(&mut self.rng);
                self.adjacency.add_sensory_synapse(src, dest, polarity)?;
            }
        }
        Ok(())
    }

    fn build_inter_to_command_layer(&mut self) -> Result<(), WiringError> {
        let mut unreachable_command = self.command_neurons.clone();

        for &src in &self.inter_neurons {
            let selected: Vec<usize> = self
                .command_neurons
                .choose_multiple(&mut self.rng, self.inter_fanout)
                .cloned()
                .collect();
            for dest in selected {
                unreachable_command.retain(|&n| n != dest);
                let polarity = random_polarity(&mut self.rng);
                self.adjacency.add_synapse(src, dest, polarity)?;
            }
        }

        if self.num_inter_neurons == 0 {
            return Ok(());
        }
        let mean_command_fanin = (self.num_inter_neurons * self.inter_fanout
            / self.num_command_neurons.max(1))
        .max(1)
        .min(self.num_inter_neurons);
        for dest in unreachable_command {
            let selected: Vec<usize> = self
                .inter_neurons
                .choose_multiple(&mut self.rng, mean_command_fanin)
                .cloned()
                .collect();
            for src in selected {
                let polarity = random_polarity(&mut self.rng);
                self.adjacency.add_synapse(src, dest, polarity)?;
            }
        }
        Ok(())
    }

    fn build_recurrent_command_layer(&mut self) -> Result<(), WiringError> {
        if self.command_neurons.is_empty() {
            return Ok(());
        }
        for _ in 0..self.recurrent_command_synapses {
            let src = self.command_neurons[self.rng.gen_range(0..self.command_neurons.len())];
            let dest = self.command_neurons[self.rng.gen_range(0..self.command_neurons.len())];
            let polarity = random_polarity(&mut self.rng);
            self.adjacency.add_synapse(src, dest, polarity)?;
        }
        Ok(())
    }

    fn build_command_to_motor_layer(&mut self) -> Result<(), WiringError> {
        let mut unreachable_command = self.command_neurons.clone();

        for &dest in &self.motor_neurons {
            let selected: Vec<usize> = self
                .command_neurons
                .choose_multiple(&mut self.rng, self.motor_fanin)
                .cloned()
                .collect();
            for src in selected {
                unreachable_command.retain(|&n| n != src);
                let polarity = random_polarity(&mut self.rng);
                self.adjacency.add_synapse(src, dest, polarity)?;
            }
        }

        if self.num_motor_neurons == 0 {
            return Ok(());
        }
        let mean_command_fanout = (self.num_motor_neurons * self.motor_fanin
            / self.num_command_neurons.max(1))
        .max(1)
        .min(self.num_motor_neurons);
        for src in unreachable_command {
            let selected: Vec<usize> = self
                .motor_neurons
                .choose_multiple(&mut self.rng, mean_command_fanout)
                .cloned()
                .collect();
            for dest in selected {
                let polarity = random_polarity(&mut self.rng);
                self.adjacency.add_synapse(src, dest, polarity)?;
            }
        }
        Ok(())
    }

    pub fn from_config(config: WiringConfig) -> Result<Self, WiringError> {
        let motor = config.num_motor_neurons.or(config.output_dim).unwrap_or(1);
        let inter_and_command = config.units.saturating_sub(motor);
        let command = config
            .num_command_neurons
            .unwrap_or_else(|| (inter_and_command as f64 * 0.4).ceil() as usize);
        let inter = config
            .num_inter_neurons
            .unwrap_or_else(|| inter_and_command.saturating_sub(command));

        let mut wiring = NCP::new(
            inter,
            command,
            motor,
            config.sensory_fanout.unwrap_or(6.min(inter)),
            config.inter_fanout.unwrap_or(6.min(command)),
            config.recurrent_command_synapses.unwrap_or(4),
            config.motor_fanin.unwrap_or(6.min(command)),
            config.seed.unwrap_or(22222),
        )?;
        wiring.adjacency.restore(&config)?;
        Ok(wiring)
    }

    fn write_config(&self, config: &mut WiringConfig) {
        self.adjacency.write_config(config);
        config.output_dim = Some(self.num_motor_neurons);
        config.num_inter_neurons = Some(self.num_inter_neurons);
        config.num_command_neurons = Some(self.num_command_neurons);
        config.num_motor_neurons = Some(self.num_motor_neurons);
        config.sensory_fanout = Some(self.sensory_fanout);
        config.inter_fanout = Some(self.inter_fanout);
        config.recurrent_command_synapses = Some(self.recurrent_command_synapses);
        config.motor_fanin = Some(self.motor_fanin);
        config.seed = Some(self.seed);
    }
}

fn check_fanout(
    what: &'static str,
    fanout: usize,
    target: &'static str,
    available: usize,
) -> Result<(), WiringError> {
    if fanout > available {
        return Err(WiringError::InvalidFanout {
            what,
            fanout,
            target,
            available,
        });
    }
    Ok(())
}

impl Wiring for NCP {
    fn units(&self) -> usize {
        self.adjacency.units()
    }

    fn input_dim(&self) -> Option<usize> {
        self.adjacency.input_dim()
    }

    fn output_dim(&self) -> Option<usize> {
        Some(self.num_motor_neurons)
    }

    fn num_layers(&self) -> usize {
        3
    }

    fn get_neurons_of_layer(&self, layer_id: usize) -> Vec<usize> {
        match layer_id {
            0 => self.inter_neurons.clone(),
            1 => self.command_neurons.clone(),
            2 => self.motor_neurons.clone(),
            _ => vec![],
        }
    }

    fn neuron_type(&self, neuron_id: usize) -> NeuronType {
        if neuron_id < self.num_motor_neurons {
            NeuronType::Motor
        } else if neuron_id < self.num_motor_neurons + self.num_command_neurons {
            NeuronType::Command
        } else {
            NeuronType::Inter
        }
    }

    fn build(&mut self, input_dim: usize) -> Result<(), WiringError> {
        if !self.adjacency.begin_build(input_dim)? {
            return Ok(());
        }

        self.build_sensory_to_inter_layer(input_dim)?;
        self.build_inter_to_command_layer()?;
        self.build_recurrent_command_layer()?;
        self.build_command_to_motor_layer()?;
        debug!(
            units = self.units(),
            input_dim,
            synapses = self.synapse_count(),
            sensory_synapses = self.sensory_synapse_count(),
            "built NCP wiring"
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
        let mut config = WiringConfig::new(WiringKind::Ncp, self.units());
        self.write_config(&mut config);
        config
    }
}

/// AutoNCP derives the NCP layer sizes and fanouts from a unit count,
/// an output size and a sparsity level
#[derive(Clone, Debug)]
pub struct AutoNCP {
    ncp: NCP,
    output_size: usize,
    sparsity_level: f64,
    seed: u64,
}

impl AutoNCP {
    pub fn new(
        units: usize,
        output_size: usize,
        sparsity_level: f64,
        seed: u64,
    ) -> Result<Self, WiringError> {
        let limit = units.saturating_sub(2);
        if output_size >= limit {
            return Err(WiringError::InvalidOutputSize {
                output: output_size,
                limit,
            });
        }
        if !(0.0..=0.9).contains(&sparsity_level) {
            return Err(WiringError::InvalidSparsity {
                level: sparsity_level,
                allowed: "[0, 0.9]",
            });
        }

        let density_level = 1.0 - sparsity_level;
        let inter_and_command_neurons = units - output_size;
        let command_neurons = ((inter_and_command_neurons as f64 * 0.4).ceil() as usize).max(1);
        let inter_neurons = inter_and_command_neurons - command_neurons;

        let sensory_fanout = ((inter_neurons as f64 * density_level).ceil() as usize).max(1);
        let inter_fanout = ((command_neurons as f64 * density_level).ceil() as usize).max(1);
        let recurrent_command_synapses =
            ((command_neurons as f64 * density_level * 2.0).ceil() as usize).max(1);
        let motor_fanin = ((command_neurons as f64 * density_level).ceil() as usize).max(1);

        let ncp = NCP::new(
            inter_neurons,
            command_neurons,
            output_size,
            sensory_fanout,
            inter_fanout,
            recurrent_command_synapses,
            motor_fanin,
            seed,
        )?;

        Ok(Self {
            ncp,
            output_size,
            sparsity_level,
            seed,
        })
    }

    pub fn from_config(config: WiringConfig) -> Result<Self, WiringError> {
        let output_size = config.output_dim.unwrap_or(1);
        let mut wiring = Self::new(
            config.units,
            output_size,
            config.sparsity_level.unwrap_or(0.5),
            config.seed.unwrap_or(22222),
        )?;
        wiring.ncp.adjacency.restore(&config)?;
        Ok(wiring)
    }
}

impl Wiring for AutoNCP {
    fn units(&self) -> usize {
        self.ncp.units()
    }

    fn input_dim(&self) -> Option<usize> {
        self.ncp.input_dim()
    }

    fn output_dim(&self) -> Option<usize> {
        Some(self.output_size)
    }

    fn num_layers(&self) -> usize {
        self.ncp.num_layers()
    }

    fn get_neurons_of_layer(&self, layer_id: usize) -> Vec<usize> {
        self.ncp.get_neurons_of_layer(layer_id)
    }

    fn neuron_type(&self, neuron_id: usize) -> NeuronType {
        self.ncp.neuron_type(neuron_id)
    }

    fn build(&mut self, input_dim: usize) -> Result<(), WiringError> {
        self.ncp.build(input_dim)
    }

    fn adjacency_matrix(&self) -> &Array2<i32> {
        self.ncp.adjacency_matrix()
    }

    fn sensory_adjacency_matrix(&self) -> Option<&Array2<i32>> {
        self.ncp.sensory_adjacency_matrix()
    }

    fn add_synapse(&mut self, src: usize, dest: usize, polarity: i32) -> Result<(), WiringError> {
        self.ncp.add_synapse(src, dest, polarity)
    }

    fn add_sensory_synapse(
        &mut self,
        src: usize,
        dest: usize,
        polarity: i32,
    ) -> Result<(), WiringError> {
        self.ncp.add_sensory_synapse(src, dest, polarity)
    }

    fn get_config(&self) -> WiringConfig {
        let mut config = WiringConfig::new(WiringKind::AutoNcp, self.units());
        self.ncp.write_config(&mut config);
        config.output_dim = Some(self.output_size);
        config.sparsity_level = Some(self.sparsity_level);
        config.seed = Some(self.seed);
        config
    }
}
