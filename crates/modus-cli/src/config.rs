//! TOML configuration deserialisation for simulation jobs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Deserialize;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub simulation: SimulationConfig,
    pub model: ModelConfig,
    #[serde(rename = "input")]
    pub inputs: Vec<InputConfig>,
    pub output: OutputConfig,
}

/// Simulation parameters from TOML.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Sampling frequency in Hz.
    pub sampling: f64,
    /// Number of samples to step.
    pub steps: usize,
    /// Mode discretisation: "exponential" or "bilinear". Default: "exponential".
    #[serde(default = "default_solver")]
    pub solver: String,
    /// Compute backend: "auto", "host", "cpu", or "gpu". Default: "auto".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Proportional damping applied to every mode, instead of the model's.
    pub damping: Option<f64>,
    /// Highest eigen frequency kept in the model, in Hz.
    pub max_eigen_frequency: Option<f64>,
    /// Eigen frequency overrides.
    #[serde(default)]
    pub eigen_frequencies: Vec<EigenFrequencyOverride>,
    pub hankel_singular_values_threshold: Option<f64>,
    pub hankel_frequency_lower_bound: Option<f64>,
    #[serde(default)]
    pub static_gain_compensation: bool,
    /// Number of leading modes treated as rigid body modes by the static gain compensation.
    pub rigid_body_modes: Option<usize>,
}

fn default_solver() -> String {
    "exponential".into()
}
fn default_backend() -> String {
    "auto".into()
}

/// New eigen frequency (Hz) of the mode at `index`.
#[derive(Debug, Deserialize)]
pub struct EigenFrequencyOverride {
    pub index: usize,
    pub frequency: f64,
}

/// Model file location.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    /// JSON model file, relative to the configuration file.
    pub path: PathBuf,
}

/// An input block and the signal driving every one of its channels.
#[derive(Debug, Deserialize)]
pub struct InputConfig {
    pub name: String,
    pub signal: Signal,
}

/// Time signals, evaluated at `t` seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Signal {
    Constant {
        value: f64,
    },
    Step {
        value: f64,
        /// Switch-on time (s).
        #[serde(default)]
        start: f64,
    },
    Sine {
        amplitude: f64,
        /// Frequency (Hz).
        frequency: f64,
        /// Phase (rad).
        #[serde(default)]
        phase: f64,
    },
}

impl Signal {
    pub fn value(&self, t: f64) -> f64 {
        match *self {
            Signal::Constant { value } => value,
            Signal::Step { value, start } => {
                if t >= start {
                    value
                } else {
                    0.0
                }
            }
            Signal::Sine {
                amplitude,
                frequency,
                phase,
            } => amplitude * (2.0 * std::f64::consts::PI * frequency * t + phase).sin(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output blocks to record.
    pub names: Vec<String>,
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save the outputs as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_csv: bool,
    /// Whether to also save the outputs as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Record every n-th sample (default: 1).
    #[serde(default = "default_decimation")]
    pub decimation: usize,
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}
fn default_decimation() -> usize {
    1
}

impl JobConfig {
    /// Check the job on its own, without looking at the model.
    pub fn validate(&self) -> anyhow::Result<()> {
        let sim = &self.simulation;
        if !(sim.sampling.is_finite() && sim.sampling > 0.0) {
            bail!("simulation.sampling must be a positive frequency, got {}", sim.sampling);
        }
        if sim.steps == 0 {
            bail!("simulation.steps must be at least 1");
        }
        if !matches!(sim.solver.as_str(), "exponential" | "bilinear") {
            bail!(
                "Unknown solver '{}'. Valid solvers: exponential, bilinear",
                sim.solver
            );
        }
        if !matches!(sim.backend.as_str(), "auto" | "host" | "cpu" | "gpu") {
            bail!(
                "Unknown backend '{}'. Valid backends: auto, host, cpu, gpu",
                sim.backend
            );
        }
        if sim.solver == "bilinear" && matches!(sim.backend.as_str(), "cpu" | "gpu") {
            bail!("the bilinear solver only runs on the host backend");
        }
        if self.inputs.is_empty() {
            bail!("at least one [[input]] is required");
        }
        if self.output.names.is_empty() {
            bail!("output.names must list at least one output");
        }
        if self.output.decimation == 0 {
            bail!("output.decimation must be at least 1");
        }
        Ok(())
    }
}

/// Load and parse a TOML job configuration file.
///
/// A relative model path is resolved against the directory of the
/// configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut config: JobConfig = toml::from_str(&content)?;
    if config.model.path.is_relative() {
        if let Some(dir) = path.parent() {
            config.model.path = dir.join(&config.model.path);
        }
    }
    config.validate()?;
    Ok(config)
}
