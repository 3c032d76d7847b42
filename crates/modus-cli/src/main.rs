//! Modus command-line interface.
//!
//! Run modal state space simulations from TOML configuration files:
//! ```sh
//! modus-cli run job.toml
//! modus-cli validate job.toml
//! modus-cli inspect model.json --hsv-threshold -6
//! ```

mod config;
mod inspect;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modus-cli")]
#[command(about = "Modus: discrete modal state space models of FEMs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and its model without running the simulation.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// Summarise a model with optional Hankel singular value model reduction.
    Inspect {
        /// Path to the JSON model file.
        model: PathBuf,
        /// Additional relative Hankel singular value threshold.
        hsv: Option<f64>,
        /// log10 of the lowest relative Hankel singular value threshold.
        #[arg(long, allow_hyphen_values = true, default_value_t = -6)]
        hsv_threshold: i32,
        /// Modal damping coefficient.
        #[arg(long)]
        damping: Option<f64>,
        /// Frequency lower bound for Hankel singular value truncation (default: 0Hz).
        #[arg(long)]
        freq: Option<f64>,
        /// Inputs to down select to.
        #[arg(short, long, value_delimiter = ',')]
        inputs: Vec<String>,
        /// Outputs to down select to.
        #[arg(short, long, value_delimiter = ',')]
        outputs: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Modus modal state space");
            println!("=======================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_simulation(&job)?;

            // Determine output directory
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            // CSV outputs (default on)
            if job.output.save_csv {
                runner::write_outputs_csv(&result, &out_dir.join("outputs.csv"), &job)?;
            }

            // JSON outputs (optional)
            if job.output.save_json {
                runner::write_outputs_json(&result, &out_dir.join("outputs.json"))?;
            }

            println!("Simulation complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let model = runner::load_model(&job)?;
            runner::build_solver(model, &job)?;
            println!("Configuration is valid: {}", config.display());
            Ok(())
        }
        Commands::Inspect {
            model,
            hsv,
            hsv_threshold,
            damping,
            freq,
            inputs,
            outputs,
        } => inspect::inspect(
            &model,
            &inspect::InspectOptions {
                hsv,
                hsv_log_threshold: hsv_threshold,
                damping,
                frequency_lower_bound: freq,
                inputs,
                outputs,
            },
        ),
    }
}
