//! Host vs backend stepping benchmark.
//!
//! Run with:
//!   cargo test -p modus-core --features gpu --release -- backend_benchmark --nocapture
//!
//! Prints the time per step of the host solver and of every available
//! backend. The assertions only check that the backends agree with the host
//! (within f32 tolerance for the GPU).

use std::sync::Arc;
use std::time::Instant;

use modus_compute::{ComputeBackend, CpuBackend};
use modus_core::discretise::Exponential;
use modus_core::{DiscreteModalSolver, IoGroup, ModalModel, ModalSolver};

const N_INPUTS: usize = 16;
const N_OUTPUTS: usize = 32;
const N_STEPS: usize = 200;

/// A model of `n_modes` modes spread from 0.5Hz to 200Hz with deterministic
/// pseudo-random modal maps.
fn model(n_modes: usize) -> ModalModel {
    let entry = |i: usize, j: usize, salt: usize| {
        ((i * 193 + j * 229 + salt) % 983) as f64 / 983.0 - 0.5
    };
    ModalModel {
        description: format!("{} modes benchmark model", n_modes),
        eigen_frequencies: (0..n_modes)
            .map(|k| 0.5 + 199.5 * k as f64 / n_modes as f64)
            .collect(),
        proportional_damping: vec![0.02; n_modes],
        inputs: vec![IoGroup::new("u", N_INPUTS)],
        outputs: vec![IoGroup::new("y", N_OUTPUTS)],
        inputs_to_modal_forces: (0..n_modes * N_INPUTS)
            .map(|k| entry(k / N_INPUTS, k % N_INPUTS, 41))
            .collect(),
        modal_disp_to_outputs: (0..N_OUTPUTS * n_modes)
            .map(|k| entry(k / n_modes, k % n_modes, 67))
            .collect(),
        static_gain: None,
    }
}

fn input(k: usize) -> Vec<f64> {
    (0..N_INPUTS)
        .map(|j| (2e-2 * k as f64 * (j + 1) as f64).sin())
        .collect()
}

/// Steps `solver` and returns the output history and the mean time per step in µs.
fn run(solver: &mut dyn ModalSolver) -> (Vec<Vec<f64>>, f64) {
    let mut history = Vec::with_capacity(N_STEPS);
    let start = Instant::now();
    for k in 0..N_STEPS {
        solver.set_input("u", &input(k)).unwrap();
        solver.step().unwrap();
        history.push(solver.y().to_vec());
    }
    let elapsed = start.elapsed().as_secs_f64() * 1e6 / N_STEPS as f64;
    (history, elapsed)
}

/// Largest deviation between two histories, relative to the largest output.
fn relative_error(reference: &[Vec<f64>], other: &[Vec<f64>]) -> f64 {
    let max_diff = reference
        .iter()
        .flatten()
        .zip(other.iter().flatten())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0_f64, f64::max);
    let norm = reference
        .iter()
        .flatten()
        .map(|a| a.abs())
        .fold(0.0_f64, f64::max);
    max_diff / norm
}

#[test]
fn backend_benchmark() {
    let cpu: Arc<dyn ComputeBackend> = Arc::new(CpuBackend::new());

    #[cfg(feature = "gpu")]
    let gpu: Option<Arc<dyn ComputeBackend>> = {
        match modus_compute::GpuBackend::new_blocking() {
            Ok(g) => {
                println!("\n=== GPU Device: {} ===", g.device_info().name);
                Some(Arc::new(g))
            }
            Err(e) => {
                println!("\n=== GPU not available: {}, CPU-only results ===", e);
                None
            }
        }
    };
    #[cfg(not(feature = "gpu"))]
    let gpu: Option<Arc<dyn ComputeBackend>> = {
        println!("\n=== GPU feature not enabled, CPU-only results ===");
        None
    };

    println!(
        "{:<8} {:>12} {:>12} {:>12}",
        "Modes", "Host (µs)", "CPU (µs)", "GPU (µs)"
    );
    println!("{}", "-".repeat(48));

    for &n_modes in &[100, 1000, 4000] {
        let host = DiscreteModalSolver::<Exponential>::from_model(model(n_modes))
            .sampling(1e3)
            .ins("u")
            .outs("y")
            .build()
            .unwrap();

        let mut on_cpu = host.clone().with_backend(Arc::clone(&cpu)).unwrap();
        let mut on_gpu = gpu
            .as_ref()
            .map(|g| host.clone().with_backend(Arc::clone(g)).unwrap());
        let mut host = host;

        let (reference, host_us) = run(&mut host);
        let (cpu_y, cpu_us) = run(&mut on_cpu);
        let cpu_err = relative_error(&reference, &cpu_y);
        assert!(cpu_err < 1e-10, "host/CPU diverge with {n_modes} modes: {cpu_err:e}");

        match on_gpu.as_mut() {
            Some(solver) => {
                let (gpu_y, gpu_us) = run(solver);
                println!(
                    "{:<8} {:>12.1} {:>12.1} {:>12.1}",
                    n_modes, host_us, cpu_us, gpu_us
                );
                let gpu_err = relative_error(&reference, &gpu_y);
                println!("         relative error: {:.2e} (f32 on device)", gpu_err);
                assert!(gpu_err < 5e-3, "host/GPU diverge with {n_modes} modes");
            }
            None => {
                println!("{:<8} {:>12.1} {:>12.1} {:>12}", n_modes, host_us, cpu_us, "N/A");
            }
        }
    }

    println!();
}
