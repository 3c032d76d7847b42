//! Integration tests of the modal state-space pipeline.
//!
//! - model JSON round-trip and builder from a file
//! - host solver and CPU backend agree sample by sample
//! - static gain compensation restores the model static gain
//! - Tustin and zero-order hold converge to the same static response
//! - named IO access and error reporting

use std::sync::Arc;

use approx::assert_relative_eq;
use modus_compute::CpuBackend;
use modus_core::discretise::{Bilinear, Exponential};
use modus_core::{DiscreteModalSolver, IoGroup, ModalModel, ModalSolver, SolverError};
use ndarray::{Array1, Array2, ArrayView2};

// ─────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────

const N_MODES: usize = 12;

/// Deterministic pseudo-random entries in [-0.5, 0.5).
fn entry(i: usize, j: usize, salt: usize) -> f64 {
    ((i * 137 + j * 251 + salt) % 997) as f64 / 997.0 - 0.5
}

/// A 12 mode model, 1Hz to 12Hz, with 2 input and 2 output groups, whose
/// static gain is the modal static gain of all the modes.
fn synthetic_model() -> ModalModel {
    let inputs = vec![IoGroup::new("force", 3), IoGroup::new("torque", 2)];
    let outputs = vec![IoGroup::new("disp", 4), IoGroup::new("angle", 2)];
    let (n_in, n_out) = (5, 6);
    let b = Array2::from_shape_fn((N_MODES, n_in), |(i, j)| entry(i, j, 31));
    let c = Array2::from_shape_fn((n_out, N_MODES), |(i, j)| entry(i, j, 59));
    let eigen_frequencies: Vec<f64> = (1..=N_MODES).map(|k| k as f64).collect();
    let inv_w2 = Array1::from_iter(
        eigen_frequencies
            .iter()
            .map(|f| (2.0 * std::f64::consts::PI * f).powi(2).recip()),
    );
    let static_gain = (&c * &inv_w2).dot(&b);
    ModalModel {
        description: "synthetic".into(),
        eigen_frequencies,
        proportional_damping: vec![0.02; N_MODES],
        inputs,
        outputs,
        inputs_to_modal_forces: b.iter().copied().collect(),
        modal_disp_to_outputs: c.iter().copied().collect(),
        static_gain: Some(static_gain.iter().copied().collect()),
    }
}

fn input_signal(k: usize, n: usize) -> Vec<f64> {
    (0..n)
        .map(|j| (0.05 * k as f64 + j as f64).sin() + 0.1 * j as f64)
        .collect()
}

// ─────────────────────────────────────────────────────────────
// Model files
// ─────────────────────────────────────────────────────────────

#[test]
fn test_model_json_round_trip_builds_the_same_solver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    synthetic_model().to_path(&path).unwrap();

    let mut from_file = DiscreteModalSolver::<Exponential>::from_path(&path)
        .unwrap()
        .sampling(1e3)
        .ins("force")
        .outs("disp")
        .build()
        .unwrap();
    let mut from_model = DiscreteModalSolver::<Exponential>::from_model(synthetic_model())
        .sampling(1e3)
        .ins("force")
        .outs("disp")
        .build()
        .unwrap();
    for k in 0..50 {
        let u = input_signal(k, 3);
        from_file.set_input("force", &u).unwrap();
        from_model.set_input("force", &u).unwrap();
        from_file.step().unwrap();
        from_model.step().unwrap();
    }
    for (a, b) in from_file.y.iter().zip(&from_model.y) {
        assert_relative_eq!(*a, *b, max_relative = 1e-12);
    }
}

#[test]
fn test_loading_rejects_inconsistent_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    let mut model = synthetic_model();
    model.proportional_damping.pop();
    model.to_path(&path).unwrap();
    assert!(ModalModel::from_path(&path).is_err());
}

// ─────────────────────────────────────────────────────────────
// Host vs backend
// ─────────────────────────────────────────────────────────────

#[test]
fn test_cpu_backend_matches_host_solver() {
    let host = DiscreteModalSolver::<Exponential>::from_model(synthetic_model())
        .sampling(500.0)
        .max_eigen_frequency(8.0)
        .use_static_gain_compensation()
        .ins("force")
        .ins("torque")
        .outs("disp")
        .outs("angle")
        .build()
        .unwrap();
    assert_eq!(host.state_space.len(), 8);
    let mut accelerated = host
        .clone()
        .with_backend(Arc::new(CpuBackend::new()))
        .unwrap();
    let mut host = host;

    for k in 0..200 {
        let force = input_signal(k, 3);
        let torque = input_signal(k + 7, 2);
        let solvers: [&mut dyn ModalSolver; 2] = [&mut host, &mut accelerated];
        for solver in solvers {
            solver.set_input("force", &force).unwrap();
            solver.set_input("torque", &torque).unwrap();
            solver.step().unwrap();
        }
        for (a, b) in host.y().iter().zip(accelerated.y()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12, max_relative = 1e-10);
        }
    }
    assert_eq!(accelerated.output("angle").unwrap().len(), 2);
}

#[test]
fn test_accelerated_reset_replays_the_same_outputs() {
    let mut solver = DiscreteModalSolver::<Exponential>::from_model(synthetic_model())
        .sampling(1e3)
        .ins("torque")
        .outs("angle")
        .build()
        .unwrap()
        .with_backend(Arc::new(CpuBackend::with_threads(2).unwrap()))
        .unwrap();
    let run = |solver: &mut modus_core::AcceleratedModalSolver| {
        (0..30)
            .map(|k| {
                solver.set_input("torque", &input_signal(k, 2)).unwrap();
                solver.step().unwrap();
                solver.y().to_vec()
            })
            .collect::<Vec<_>>()
    };
    let first = run(&mut solver);
    solver.reset().unwrap();
    assert!(solver.y().iter().all(|y| *y == 0.0));
    let second = run(&mut solver);
    assert_eq!(first, second);
    assert!(solver.device_info().name.contains("2 threads"));
}

// ─────────────────────────────────────────────────────────────
// Static response
// ─────────────────────────────────────────────────────────────

fn steady_state<S: modus_core::discretise::ModeSolver>(
    mut solver: DiscreteModalSolver<S>,
    u: &[f64],
) -> Vec<f64> {
    solver.u.copy_from_slice(u);
    // ζ = 0.5 from 1Hz: the slowest mode decays as e^{-πt}
    solver.by_ref().take(10_000).for_each(drop);
    solver.y
}

#[test]
fn test_static_gain_compensation_restores_the_static_gain() {
    let model = synthetic_model();
    let u = [1.0, -0.5, 0.25, 2.0, -1.0];
    let gain = ArrayView2::from_shape((6, 5), model.static_gain.as_ref().unwrap().as_slice())
        .unwrap()
        .dot(&Array1::from(u.to_vec()));

    let builder = DiscreteModalSolver::<Exponential>::from_model(model)
        .sampling(1e3)
        .proportional_damping(0.5)
        .max_eigen_frequency(4.0)
        .ins("force")
        .ins("torque")
        .outs("disp")
        .outs("angle");

    let compensated = steady_state(
        builder.clone().use_static_gain_compensation().build().unwrap(),
        &u,
    );
    for (y, g) in compensated.iter().zip(gain.iter()) {
        assert_relative_eq!(*y, *g, epsilon = 1e-9, max_relative = 1e-6);
    }

    // without compensation the truncated modes are missing
    let truncated = steady_state(builder.build().unwrap(), &u);
    let error: f64 = truncated
        .iter()
        .zip(gain.iter())
        .map(|(y, g)| (y - g).abs())
        .sum();
    assert!(error > 1e-6, "truncation error {:e}", error);
}

#[test]
fn test_bilinear_and_exponential_share_the_static_response() {
    let u = [0.3, 0.1, -0.2];
    let exponential = steady_state(
        DiscreteModalSolver::<Exponential>::from_model(synthetic_model())
            .sampling(1e3)
            .proportional_damping(0.5)
            .ins("force")
            .outs("disp")
            .build()
            .unwrap(),
        &u,
    );
    let bilinear = steady_state(
        DiscreteModalSolver::<Bilinear>::from_model(synthetic_model())
            .sampling(1e3)
            .proportional_damping(0.5)
            .ins("force")
            .outs("disp")
            .build()
            .unwrap(),
        &u,
    );
    for (e, b) in exponential.iter().zip(&bilinear) {
        assert_relative_eq!(*e, *b, epsilon = 1e-9, max_relative = 1e-6);
    }
}

// ─────────────────────────────────────────────────────────────
// Named IO
// ─────────────────────────────────────────────────────────────

#[test]
fn test_named_io_access() {
    let mut solver = DiscreteModalSolver::<Exponential>::from_model(synthetic_model())
        .sampling(1e3)
        .ins("torque")
        .ins("force")
        .outs("angle")
        .build()
        .unwrap();
    assert_eq!(solver.n_inputs(), 5);
    assert_eq!(solver.n_outputs(), 2);

    solver.input_mut("force").unwrap()[2] = 4.0;
    assert_eq!(solver.u[4], 4.0);
    assert!(solver.input_mut("disp").is_none());
    assert!(solver.output("disp").is_none());

    assert!(matches!(
        solver.set_input("gravity", &[1.0]),
        Err(SolverError::UnknownInput(_))
    ));
    assert!(matches!(
        solver.set_input("torque", &[1.0]),
        Err(SolverError::DimensionMismatch { expected: 2, found: 1, .. })
    ));

    let summary = solver.to_string();
    assert!(summary.contains("12 2x2 state space models"));
    assert!(summary.contains("torque"));
}

#[test]
fn test_outputs_lag_the_inputs_by_one_sample() {
    let mut solver = DiscreteModalSolver::<Exponential>::from_model(synthetic_model())
        .sampling(1e3)
        .ins("force")
        .outs("disp")
        .build()
        .unwrap();
    solver.set_input("force", &[1.0, 1.0, 1.0]).unwrap();
    solver.step().unwrap();
    assert!(solver.y.iter().all(|y| *y == 0.0));
    solver.step().unwrap();
    assert!(solver.y.iter().any(|y| *y != 0.0));
}
