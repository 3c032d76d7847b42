//! Simulation runner: ties together the model, the state space builder and the solver.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use modus_compute::ComputeBackend;
use modus_core::discretise::{Bilinear, Exponential, ModeSolver};
use modus_core::{DiscreteModalSolver, DiscreteStateSpace, IoRange, ModalModel, ModalSolver};

use crate::config::{JobConfig, SimulationConfig};

/// Recorded output history of a simulation run.
#[derive(Debug)]
pub struct SimulationOutput {
    /// Sample times (s).
    pub time: Vec<f64>,
    /// Output blocks, in the order of the recorded samples.
    pub outputs: Vec<IoRange>,
    /// One full output vector per recorded sample.
    pub samples: Vec<Vec<f64>>,
    /// Execution method the solver reported.
    pub method: String,
}

/// Load the model of a job and check the job against it.
pub fn load_model(job: &JobConfig) -> Result<ModalModel> {
    let model = ModalModel::from_path(&job.model.path)
        .with_context(|| format!("loading model {}", job.model.path.display()))?;
    for input in &job.inputs {
        if model.input_range(&input.name).is_none() {
            bail!("Unknown input '{}' in model {}", input.name, job.model.path.display());
        }
    }
    for name in &job.output.names {
        if model.output_range(name).is_none() {
            bail!("Unknown output '{}' in model {}", name, job.model.path.display());
        }
    }
    if job.simulation.static_gain_compensation && model.static_gain.is_none() {
        bail!("static gain compensation requested but the model has no static gain");
    }
    Ok(model)
}

/// Apply the job's simulation parameters and IO selection to a builder.
fn state_space<S: ModeSolver>(model: ModalModel, job: &JobConfig) -> DiscreteStateSpace<S> {
    let SimulationConfig {
        sampling,
        damping,
        max_eigen_frequency,
        eigen_frequencies,
        hankel_singular_values_threshold,
        hankel_frequency_lower_bound,
        static_gain_compensation,
        rigid_body_modes,
        ..
    } = &job.simulation;
    let mut builder = DiscreteStateSpace::<S>::new(model).sampling(*sampling);
    if let Some(zeta) = damping {
        builder = builder.proportional_damping(*zeta);
    }
    if let Some(max_ef) = max_eigen_frequency {
        builder = builder.max_eigen_frequency(*max_ef);
    }
    if !eigen_frequencies.is_empty() {
        builder = builder.eigen_frequencies(
            eigen_frequencies
                .iter()
                .map(|o| (o.index, o.frequency))
                .collect(),
        );
    }
    if let Some(hsv_t) = hankel_singular_values_threshold {
        builder = builder.truncate_hankel_singular_values(*hsv_t);
    }
    if let Some(lower_bound) = hankel_frequency_lower_bound {
        builder = builder.hankel_frequency_lower_bound(*lower_bound);
    }
    if *static_gain_compensation {
        builder = builder.use_static_gain_compensation();
    }
    if let Some(n) = rigid_body_modes {
        builder = builder.rigid_body_modes(*n);
    }
    let builder = job.inputs.iter().fold(builder, |b, input| b.ins(input.name.as_str()));
    job.output.names.iter().fold(builder, |b, name| b.outs(name.as_str()))
}

/// Build the solver a job asks for.
pub fn build_solver(model: ModalModel, job: &JobConfig) -> Result<Box<dyn ModalSolver>> {
    let solver: Box<dyn ModalSolver> = match job.simulation.solver.as_str() {
        "bilinear" => {
            if job.simulation.backend != "host" {
                log::warn!("the bilinear solver runs on the host, ignoring backend '{}'", job.simulation.backend);
            }
            Box::new(state_space::<Bilinear>(model, job).build()?)
        }
        _ => {
            let solver = state_space::<Exponential>(model, job).build()?;
            match create_backend(&job.simulation.backend)? {
                Some(backend) => Box::new(solver.with_backend(backend)?),
                None => Box::new(solver),
            }
        }
    };
    Ok(solver)
}

/// Step `solver` through the job's input signals and record the outputs.
pub fn simulate(solver: &mut dyn ModalSolver, job: &JobConfig) -> Result<SimulationOutput> {
    let tau = job.simulation.sampling.recip();
    let steps = job.simulation.steps;
    let decimation = job.output.decimation;
    let n_records = steps.div_ceil(decimation);
    let mut time = Vec::with_capacity(n_records);
    let mut samples = Vec::with_capacity(n_records);

    for k in 0..steps {
        let t = k as f64 * tau;
        for input in &job.inputs {
            let value = input.signal.value(t);
            solver
                .input_mut(&input.name)
                .with_context(|| format!("input '{}' is not in the state space", input.name))?
                .iter_mut()
                .for_each(|u| *u = value);
        }
        solver.step()?;
        if k % decimation == 0 {
            time.push(t);
            samples.push(solver.y().to_vec());
        }
        if (k + 1) % (steps / 10).max(1) == 0 || k + 1 == steps {
            log::info!("[{}/{}] t={:.3}s", k + 1, steps, t);
        }
    }

    Ok(SimulationOutput {
        time,
        outputs: solver.outputs().to_vec(),
        samples,
        method: solver.method_name(),
    })
}

/// Run a full simulation from a parsed job configuration.
pub fn run_simulation(job: &JobConfig) -> Result<SimulationOutput> {
    let model = load_model(job)?;
    println!("Model: {}", job.model.path.display());
    println!("{}", model);

    let mut solver = build_solver(model, job)?;
    println!(
        "State space: {} modes, {} inputs, {} outputs on {}",
        solver.n_modes(),
        solver.inputs().iter().map(IoRange::len).sum::<usize>(),
        solver.outputs().iter().map(IoRange::len).sum::<usize>(),
        solver.method_name()
    );

    simulate(solver.as_mut(), job)
}

/// Write the output history to a CSV file with a metadata header.
pub fn write_outputs_csv(output: &SimulationOutput, path: &Path, job: &JobConfig) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);

    // Metadata header
    writeln!(file, "# Modus modal state space simulation")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# model: {}", job.model.path.display())?;
    writeln!(
        file,
        "# sampling: {} Hz, solver: {}, method: {}",
        job.simulation.sampling, job.simulation.solver, output.method
    )?;
    for input in &job.inputs {
        writeln!(file, "# input '{}': {:?}", input.name, input.signal)?;
    }
    writeln!(file, "#")?;

    let columns: Vec<String> = output
        .outputs
        .iter()
        .flat_map(|io| (0..io.len()).map(move |i| format!("{}_{}", io.name, i)))
        .collect();
    writeln!(file, "time_s,{}", columns.join(","))?;

    for (t, y) in output.time.iter().zip(&output.samples) {
        let values: Vec<String> = y.iter().map(|v| format!("{:.9e}", v)).collect();
        writeln!(file, "{:.6},{}", t, values.join(","))?;
    }

    println!("Outputs written to: {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    time: &'a [f64],
    outputs: BTreeMap<&'a str, Vec<&'a [f64]>>,
}

/// Write the output history to a JSON file, one series of samples per output block.
pub fn write_outputs_json(output: &SimulationOutput, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let record = OutputRecord {
        time: &output.time,
        outputs: output
            .outputs
            .iter()
            .map(|io| {
                (
                    io.name.as_str(),
                    output
                        .samples
                        .iter()
                        .map(|y| &y[io.range.clone()])
                        .collect(),
                )
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Outputs (JSON) written to: {}", path.display());
    Ok(())
}

/// Create a compute backend based on the user's preference string.
///
/// - `"host"`: no backend, the modes are stepped by the host solver.
/// - `"cpu"`: the CPU backend.
/// - `"gpu"`: the GPU backend, fails if unavailable.
/// - `"auto"` (default): try GPU, fall back to CPU.
pub fn create_backend(preference: &str) -> Result<Option<Arc<dyn ComputeBackend>>> {
    match preference {
        "host" => {
            println!("Backend: host");
            Ok(None)
        }
        "cpu" => {
            let cpu = modus_compute::CpuBackend::new();
            println!("Backend: {}", cpu.device_info().name);
            Ok(Some(Arc::new(cpu)))
        }
        "gpu" => {
            #[cfg(feature = "gpu")]
            {
                let gpu = modus_compute::GpuBackend::new_blocking()
                    .context("GPU requested but unavailable")?;
                println!("Backend: {}", gpu.device_info().name);
                Ok(Some(Arc::new(gpu)))
            }
            #[cfg(not(feature = "gpu"))]
            {
                bail!("GPU requested but binary was built without --features gpu")
            }
        }
        _ => {
            // "auto" or any unrecognised value
            #[cfg(feature = "gpu")]
            {
                match modus_compute::GpuBackend::new_blocking() {
                    Ok(gpu) => {
                        println!("Backend: {} (auto-detected)", gpu.device_info().name);
                        return Ok(Some(Arc::new(gpu)));
                    }
                    Err(e) => {
                        println!("GPU not available ({}), using CPU", e);
                    }
                }
            }
            Ok(Some(Arc::new(modus_compute::CpuBackend::new())))
        }
    }
}
