//! Tests for the wirings module

use ncps_ltc::error::WiringError;
use ncps_ltc::wirings::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_connected_creation() {
        let fc = FullyConnected::new(10, None, 1234, true).unwrap();
        assert_eq!(fc.units(), 10);
        assert_eq!(fc.output_dim(), Some(10));
        assert!(!fc.is_built());
    }

    #[test]
    fn test_fully_connected_build() {
        let mut fc = FullyConnected::new(10, Some(5), 1234, true).unwrap();
        fc.build(20).unwrap(); // 20 input features
        assert!(fc.is_built());
        assert_eq!(fc.input_dim(), Some(20));

        // Check sensory matrix dimensions
        let sensory = fc.sensory_adjacency_matrix().unwrap();
        assert_eq!(sensory.shape(), &[20, 10]);

        // Every pair carries a polarity
        assert!(fc.adjacency_matrix().iter().all(|&x| x == 1 || x == -1));
    }

    #[test]
    fn test_fully_connected_serialization() {
        let mut fc = FullyConnected::new(10, Some(5), 1234, true).unwrap();
        fc.build(20).unwrap();

        let config = fc.get_config();
        let fc2 = FullyConnected::from_config(config).unwrap();

        assert_eq!(fc.units(), fc2.units());
        assert_eq!(fc.input_dim(), fc2.input_dim());
        assert_eq!(fc.output_dim(), fc2.output_dim());
        assert_eq!(fc.adjacency_matrix(), fc2.adjacency_matrix());
        assert_eq!(fc.sensory_adjacency_matrix(), fc2.sensory_adjacency_matrix());
    }

    #[test]
    fn test_conflicting_input_dim() {
        let mut fc = FullyConnected::new(10, None, 1234, true).unwrap();
        fc.build(20).unwrap();
        assert_eq!(
            fc.build(30),
            Err(WiringError::ConflictingInputDim {
                expected: 20,
                got: 30
            })
        );
    }

    #[test]
    fn test_ncp_structure() {
        let ncp = NCP::new(
            10,    // inter_neurons
            8,     // command_neurons
            5,     // motor_neurons
            6,     // sensory_fanout
            6,     // inter_fanout
            4,     // recurrent_command_synapses
            6,     // motor_fanin
            22222, // seed
        )
        .unwrap();

        assert_eq!(ncp.units(), 23); // 10 + 8 + 5
        assert_eq!(ncp.output_dim(), Some(5));
        assert_eq!(ncp.num_layers(), 3);
        assert_eq!(ncp.get_neurons_of_layer(2).len(), 5); // motor
    }

    #[test]
    fn test_ncp_neuron_types() {
        let ncp = NCP::new(10, 8, 5, 6, 6, 4, 6, 22222).unwrap();

        // First 5 neurons are motor
        assert_eq!(ncp.neuron_type(0), NeuronType::Motor);
        assert_eq!(ncp.neuron_type(4), NeuronType::Motor);

        // Next 8 neurons are command
        assert_eq!(ncp.neuron_type(5), NeuronType::Command);
        assert_eq!(ncp.neuron_type(12), NeuronType::Command);

        // Remaining are inter
        assert_eq!(ncp.neuron_type(13), NeuronType::Inter);
    }

    #[test]
    fn test_ncp_build() {
        let mut ncp = NCP::new(10, 8, 5, 6, 6, 4, 6, 22222).unwrap();
        ncp.build(15).unwrap(); // 15 sensory inputs

        assert!(ncp.is_built());
        assert_eq!(ncp.input_dim(), Some(15));

        // Check connections were created
        assert!(ncp.sensory_synapse_count() > 0);
        assert!(ncp.synapse_count() > 0);
    }

    #[test]
    fn test_ncp_build_is_deterministic() {
        let build = || {
            let mut ncp = NCP::new(10, 8, 5, 6, 6, 4, 6, 22222).unwrap();
            ncp.build(15).unwrap();
            ncp
        };
        let (a, b) = (build(), build());
        assert_eq!(a.adjacency_matrix(), b.adjacency_matrix());
        assert_eq!(a.sensory_adjacency_matrix(), b.sensory_adjacency_matrix());
    }

    #[test]
    fn test_auto_ncp_convenience() {
        let auto_ncp = AutoNCP::new(32, 8, 0.5, 22222).unwrap();

        assert_eq!(auto_ncp.units(), 32);
        assert_eq!(auto_ncp.output_dim(), Some(8));
        assert_eq!(auto_ncp.num_layers(), 3);
    }

    #[test]
    fn test_auto_ncp_invalid_sparsity() {
        assert!(matches!(
            AutoNCP::new(32, 8, 1.5, 22222),
            Err(WiringError::InvalidSparsity { .. })
        ));
    }

    #[test]
    fn test_auto_ncp_invalid_output_size() {
        // 9 >= 10 - 2
        assert!(matches!(
            AutoNCP::new(10, 9, 0.5, 22222),
            Err(WiringError::InvalidOutputSize { .. })
        ));
    }

    #[test]
    fn test_output_size_error_reports_limit() {
        let err = FullyConnected::new(4, Some(6), 1234, true).unwrap_err();
        assert_eq!(err.to_string(), "Output size 6 exceeds limit 4");

        let err = Random::new(4, Some(5), 0.5, 1234).unwrap_err();
        assert_eq!(err.to_string(), "Output size 5 exceeds limit 4");

        let err = AutoNCP::new(10, 9, 0.5, 22222).unwrap_err();
        assert_eq!(err.to_string(), "Output size 9 exceeds limit 8");
    }

    #[test]
    fn test_wiring_synapse_count() {
        let mut fc = FullyConnected::new(10, None, 1234, true).unwrap();
        fc.build(5).unwrap();

        let count = fc.synapse_count();
        let adj = fc.adjacency_matrix();
        let manual_count: usize = adj.iter().map(|&x| x.abs() as usize).sum();
        assert_eq!(count, manual_count);
        assert_eq!(fc.sensory_synapse_count(), 50);
    }

    #[test]
    fn test_random_wiring() {
        let mut random = Random::new(10, Some(5), 0.5, 1234).unwrap();
        random.build(20).unwrap();

        assert_eq!(random.units(), 10);
        assert_eq!(random.synapse_count(), 50);
        assert_eq!(random.sensory_synapse_count(), 100);
    }

    #[test]
    fn test_add_synapse() {
        let mut fc = FullyConnected::new(10, None, 1234, true).unwrap();

        // Add excitatory synapse
        fc.add_synapse(0, 1, 1).unwrap();
        assert_eq!(fc.adjacency_matrix()[[0, 1]], 1);

        // Add inhibitory synapse
        fc.add_synapse(2, 3, -1).unwrap();
        assert_eq!(fc.adjacency_matrix()[[2, 3]], -1);
    }

    #[test]
    fn test_add_synapse_invalid_polarity() {
        let mut fc = FullyConnected::new(10, None, 1234, true).unwrap();
        assert_eq!(fc.add_synapse(0, 1, 2), Err(WiringError::InvalidPolarity(2)));
    }

    #[test]
    fn test_add_synapse_out_of_bounds() {
        let mut fc = FullyConnected::new(10, None, 1234, true).unwrap();
        assert!(matches!(
            fc.add_synapse(0, 15, 1),
            Err(WiringError::InvalidSynapse { dest: 15, .. })
        ));
    }

    #[test]
    fn test_wiring_config_json_roundtrip() {
        let mut wiring = AutoNCP::new(16, 4, 0.5, 7).unwrap();
        wiring.build(3).unwrap();

        let json = serde_json::to_string(&wiring.get_config()).unwrap();
        let config: WiringConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.kind, WiringKind::AutoNcp);

        let restored = config.into_wiring().unwrap();
        assert_eq!(restored.units(), 16);
        assert_eq!(restored.output_dim(), Some(4));
        assert_eq!(restored.input_dim(), Some(3));
        assert_eq!(restored.adjacency_matrix(), wiring.adjacency_matrix());
    }
}
