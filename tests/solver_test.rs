//! Numerical properties of the LTC update

use burn::backend::NdArray;
use burn::module::Param;
use burn::tensor::{Distribution, Tensor};
use ncps_ltc::cells::{InitRanges, LTCCell, LTCOptions, MappingMode, StepInput};
use ncps_ltc::error::LtcError;
use ncps_ltc::wirings::{FullyConnected, Random, Wiring};

type Backend = NdArray<f32>;

fn to_vec<const D: usize>(tensor: Tensor<Backend, D>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().unwrap()
}

/// N=4, S=2, M=1 cell with decoupled neurons and constant, excitatory sensory synapses
fn decoupled_cell(ode_unfolds: usize) -> LTCCell<Backend> {
    let device = Default::default();
    let mut wiring = FullyConnected::new(4, Some(1), 1234, true).unwrap();
    wiring.build(2).unwrap();
    for src in 0..2 {
        for dest in 0..4 {
            wiring.add_sensory_synapse(src, dest, 1).unwrap();
        }
    }

    let ranges = InitRanges::from_pairs([
        ("gleak", (0.5, 0.5)),
        ("cm", (0.5, 0.5)),
        ("vleak", (0.0, 0.0)),
        ("w", (0.0, 0.0)),
        ("sensory_w", (1.0, 1.0)),
        ("sensory_mu", (0.5, 0.5)),
        ("sensory_sigma", (4.0, 4.0)),
    ])
    .unwrap();
    let options = LTCOptions::default()
        .with_input_mapping(MappingMode::Identity)
        .with_output_mapping(MappingMode::Identity)
        .with_ode_unfolds(ode_unfolds)
        .with_initialization_ranges(ranges);

    LTCCell::with_options(&mut wiring, 2, options, &device).unwrap()
}

fn decoupled_step(ode_unfolds: usize) -> Vec<f32> {
    let device = Default::default();
    let cell = decoupled_cell(ode_unfolds);
    let inputs = Tensor::<Backend, 2>::from_floats([[1.0, 0.0]], &device);
    let (_, [state]) = cell.step(inputs, [cell.initial_state(1, &device)]).unwrap();
    to_vec(state)
}

#[test]
fn test_golden_decoupled_neurons() {
    // sigmoid(2) + sigmoid(-2) = 1, so every sub-step is v <- (3v + 1) / 4.5
    let mut expected = 0.0f64;
    for _ in 0..6 {
        expected = (3.0 * expected + 1.0) / 4.5;
    }
    assert!((expected - 0.608139).abs() < 1e-6);

    let device = Default::default();
    let cell = decoupled_cell(6);
    let inputs = Tensor::<Backend, 2>::from_floats([[1.0, 0.0]], &device);
    let (output, [state]) = cell.step(inputs, [cell.initial_state(1, &device)]).unwrap();

    let state = to_vec(state);
    assert_eq!(state.len(), 4);
    for v in &state {
        assert!((*v as f64 - expected).abs() < 1e-5, "got {v}, expected {expected}");
    }
    assert_eq!(to_vec(output), vec![state[0]]);
}

#[test]
fn test_sub_step_count_changes_result() {
    let one = decoupled_step(1);
    let six = decoupled_step(6);

    // a single implicit step: (0 + 1) / (0.5 + 0.5 + 1)
    assert!((one[0] - 0.5).abs() < 1e-5);
    assert!((one[0] - six[0]).abs() > 0.1);
}

#[test]
fn test_more_unfolds_refine_toward_exact_solution() {
    // dv/dt = (1 - 1.5 v) / 0.5 from v = 0, evaluated at t = 1
    let exact = (1.0 - (-3.0f64).exp()) / 1.5;

    let errors: Vec<f64> = [1, 6, 60]
        .into_iter()
        .map(|unfolds| (decoupled_step(unfolds)[0] as f64 - exact).abs())
        .collect();

    assert!(errors[0] > errors[1]);
    assert!(errors[1] > errors[2]);
    assert!(errors[2] < 5e-3);
}

#[test]
fn test_fixed_point_without_conductances() {
    let device = Default::default();
    let ranges = InitRanges::from_pairs([
        ("gleak", (0.0, 0.0)),
        ("cm", (0.5, 0.5)),
        ("w", (0.0, 0.0)),
        ("sensory_w", (0.0, 0.0)),
    ])
    .unwrap();

    for ode_unfolds in [1, 6] {
        let mut wiring = FullyConnected::new(5, Some(2), 7, true).unwrap();
        let options = LTCOptions::default()
            .with_ode_unfolds(ode_unfolds)
            .with_initialization_ranges(ranges.clone());
        let cell = LTCCell::<Backend>::with_options(&mut wiring, 3, options, &device).unwrap();

        let state = Tensor::<Backend, 2>::from_floats([[0.5, -0.25, 0.125, 2.0, 0.0]], &device);
        let inputs = Tensor::<Backend, 2>::from_floats([[3.0, -1.0, 0.5]], &device);

        for elapsed_time in [0.5, 1.0, 2.0] {
            let (_, [next]) = cell
                .step(StepInput::timed(inputs.clone(), elapsed_time), [state.clone()])
                .unwrap();
            assert_eq!(to_vec(next), to_vec(state.clone()));
        }
    }
}

#[test]
fn test_masked_synapses_do_not_contribute() {
    let device = Default::default();
    let mut wiring = Random::new(6, Some(2), 0.5, 7).unwrap();
    let mut cell = LTCCell::<Backend>::new(&mut wiring, 3, &device).unwrap();

    let inputs = Tensor::<Backend, 2>::random([2, 3], Distribution::Uniform(-1.0, 1.0), &device);
    let states = Tensor::<Backend, 2>::random([2, 6], Distribution::Uniform(-1.0, 1.0), &device);
    let (_, [before]) = cell.step(inputs.clone(), [states.clone()]).unwrap();

    // large weights on every pair the wiring leaves out
    cell.update_params(|mut params| {
        let unmasked = params.sparsity_mask.val().neg().add_scalar(1.0);
        params.w = Param::from_tensor(params.w.val().add(unmasked.mul_scalar(100.0)));
        params
    })
    .unwrap();
    let (_, [after]) = cell.step(inputs, [states]).unwrap();

    assert_eq!(to_vec(before), to_vec(after));
}

#[test]
fn test_update_params_keeps_masks() {
    let device = Default::default();
    let mut wiring = Random::new(6, None, 0.5, 7).unwrap();
    let mut cell = LTCCell::<Backend>::new(&mut wiring, 3, &device).unwrap();
    let mask = to_vec(cell.params().sparsity_mask.val());

    cell.update_params(|mut params| {
        params.sparsity_mask = Param::from_tensor(params.sparsity_mask.val().ones_like());
        params
    })
    .unwrap();

    assert_eq!(to_vec(cell.params().sparsity_mask.val()), mask);
}

#[test]
fn test_update_params_rejects_shape_and_mode_changes() {
    let device = Default::default();
    let mut wiring = FullyConnected::new(6, Some(2), 7, true).unwrap();
    let mut cell = LTCCell::<Backend>::new(&mut wiring, 3, &device).unwrap();
    let gleak = to_vec(cell.params().gleak.val());

    let err = cell
        .update_params(|mut params| {
            params.gleak = Param::from_tensor(Tensor::ones([7], &device));
            params
        })
        .unwrap_err();
    assert!(matches!(err, LtcError::ShapeMismatch { what: "gleak", .. }));

    let err = cell
        .update_params(|mut params| {
            params.output_map.b = None;
            params
        })
        .unwrap_err();
    assert!(matches!(err, LtcError::InvalidConfig(_)));

    let err = cell
        .update_params(|mut params| {
            params.input_map.w = None;
            params
        })
        .unwrap_err();
    assert!(matches!(err, LtcError::InvalidConfig(_)));

    let err = cell
        .update_params(|mut params| {
            params.output_map.w = Some(Param::from_tensor(Tensor::ones([6], &device)));
            params
        })
        .unwrap_err();
    assert!(matches!(err, LtcError::ShapeMismatch { what: "output", .. }));

    // rejected updates leave the cell as it was
    assert_eq!(to_vec(cell.params().gleak.val()), gleak);
    assert_eq!(cell.input_mapping(), MappingMode::Affine);
    assert_eq!(cell.output_mapping(), MappingMode::Affine);
    assert_eq!(cell.config().options.output_mapping, cell.output_mapping());

    let inputs = Tensor::<Backend, 2>::zeros([2, 3], &device);
    let (output, _) = cell.step(inputs, [cell.initial_state(2, &device)]).unwrap();
    assert_eq!(output.dims(), [2, 2]);
}

#[test]
fn test_constraints_reapplied_after_update() {
    let device = Default::default();
    let mut wiring = FullyConnected::new(6, Some(2), 7, true).unwrap();
    let mut cell = LTCCell::<Backend>::new(&mut wiring, 3, &device).unwrap();

    cell.update_params(|mut params| {
        params.gleak = Param::from_tensor(params.gleak.val().sub_scalar(5.0));
        params.cm = Param::from_tensor(params.cm.val().neg());
        params.w = Param::from_tensor(params.w.val().sub_scalar(5.0));
        params.sensory_w = Param::from_tensor(params.sensory_w.val().sub_scalar(5.0));
        params.vleak = Param::from_tensor(params.vleak.val().sub_scalar(5.0));
        params
    })
    .unwrap();

    let params = cell.params();
    assert!(params.gleak.val().min().into_scalar() >= 0.0);
    assert!(params.cm.val().min().into_scalar() >= 0.0);
    assert!(params.w.val().min().into_scalar() >= 0.0);
    assert!(params.sensory_w.val().min().into_scalar() >= 0.0);
    // unconstrained
    assert!(params.vleak.val().max().into_scalar() < 0.0);
}

#[test]
fn test_output_is_motor_prefix_of_state() {
    let device = Default::default();
    let mut wiring = FullyConnected::new(6, Some(2), 7, true).unwrap();
    let options = LTCOptions::default().with_output_mapping(MappingMode::Identity);
    let cell = LTCCell::<Backend>::with_options(&mut wiring, 3, options, &device).unwrap();

    let inputs = Tensor::<Backend, 2>::random([3, 3], Distribution::Uniform(-1.0, 1.0), &device);
    let (output, [state]) = cell.step(inputs, [cell.initial_state(3, &device)]).unwrap();

    assert_eq!(output.dims(), [3, 2]);
    assert_eq!(to_vec(output), to_vec(state.narrow(1, 0, 2)));
}

#[test]
fn test_fresh_affine_mapping_is_identity() {
    let device = Default::default();
    let mut wiring = FullyConnected::new(6, Some(4), 7, true).unwrap();
    let cell = LTCCell::<Backend>::new(&mut wiring, 3, &device).unwrap();
    assert_eq!(cell.output_mapping(), MappingMode::Affine);

    let inputs = Tensor::<Backend, 2>::random([2, 3], Distribution::Uniform(-1.0, 1.0), &device);
    let (output, [state]) = cell.step(inputs, [cell.initial_state(2, &device)]).unwrap();

    assert_eq!(to_vec(output), to_vec(state.narrow(1, 0, 4)));
}

#[test]
fn test_input_mapping_applies_to_inputs_only() {
    let device = Default::default();
    let mut wiring = FullyConnected::new(5, Some(2), 7, true).unwrap();
    let options = LTCOptions::default().with_input_mapping(MappingMode::Linear);
    let unit = LTCCell::<Backend>::with_options(&mut wiring, 3, options, &device).unwrap();

    let mut doubled = unit.clone();
    doubled.update_params(|mut params| {
        params.input_map.w = params
            .input_map
            .w
            .map(|w| Param::from_tensor(w.val().mul_scalar(2.0)));
        params
    })
    .unwrap();

    let inputs = Tensor::<Backend, 2>::from_floats([[0.25, -0.5, 1.0]], &device);
    let state = Tensor::<Backend, 2>::from_floats([[0.1, 0.2, -0.3, 0.0, 0.5]], &device);

    // the elapsed time passes through untouched
    let (_, [a]) = doubled
        .step(StepInput::timed(inputs.clone(), 0.5), [state.clone()])
        .unwrap();
    let (_, [b]) = unit
        .step(StepInput::timed(inputs.mul_scalar(2.0), 0.5), [state])
        .unwrap();

    assert_eq!(to_vec(a), to_vec(b));
}

#[test]
fn test_invalid_initialization_ranges() {
    assert!(matches!(
        LTCOptions::default().with_init_range("gleak", 1.0, 0.5),
        Err(LtcError::InvalidRange { .. })
    ));
    assert!(matches!(
        LTCOptions::default().with_init_range("gleak", -1.0, 1.0),
        Err(LtcError::NegativeLowerBound { .. })
    ));
    assert!(matches!(
        LTCOptions::default().with_init_range("unknown_param", 0.0, 1.0),
        Err(LtcError::UnknownParameter { .. })
    ));
    assert!(matches!(
        InitRanges::from_pairs([("sensory_w", (-0.1, 0.1))]),
        Err(LtcError::NegativeLowerBound { .. })
    ));
}
