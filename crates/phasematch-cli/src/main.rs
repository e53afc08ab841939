//! Phasematch command-line interface.
//!
//! Run phase-matching jobs from TOML configuration files:
//! ```sh
//! phasematch run job.toml
//! phasematch validate job.toml
//! phasematch crystals
//! phasematch index BBO --wavelength 1064
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use phasematch_materials::{Catalog, IndexProvider};

#[derive(Parser)]
#[command(name = "phasematch")]
#[command(about = "Phase matching and d_eff for SHG/SFG in birefringent crystals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve every request of a TOML job file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a job file without solving it.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the built-in crystals and their Sellmeier sources.
    Crystals,
    /// Print the principal refractive indices of a crystal.
    Index {
        /// Crystal name (e.g. BBO, LBO).
        crystal: String,
        /// Wavelength in nm.
        #[arg(short, long)]
        wavelength: f64,
        /// Temperature in °C (default: the crystal's reference temperature).
        #[arg(short, long)]
        temperature: Option<f64>,
        /// Sellmeier source (default: the crystal's first source).
        #[arg(short, long)]
        source: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Phasematch Solver");
            println!("=================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_job(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            // CSV (default on)
            if job.output.save_csv {
                runner::write_solutions_csv(
                    &result.records,
                    &out_dir.join("solutions.csv"),
                    &result.crystal,
                    job.output.crystal_length_mm,
                )?;
            }

            // JSON (optional)
            if job.output.save_json {
                runner::write_solutions_json(&result.records, &out_dir.join("solutions.json"))?;
            }

            println!("Job complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let crystal = runner::validate_job(&job)?;
            println!(
                "Configuration is valid: {} ({} request(s), crystal {})",
                config.display(),
                job.requests.len(),
                crystal.name
            );
            Ok(())
        }
        Commands::Crystals => {
            let catalog = Catalog::builtin()?;
            println!("Built-in crystals:");
            println!();
            for name in catalog.names() {
                let sources = catalog.sources(name);
                let crystal = catalog.crystal(name, None)?;
                let range = crystal
                    .wavelength_range()
                    .map_or_else(String::new, |(lo, hi)| format!(", {lo}–{hi} nm"));
                println!(
                    "  {:<6} {:<5} sources: {}{}",
                    name,
                    crystal.point_group,
                    sources.join(", "),
                    range
                );
            }
            Ok(())
        }
        Commands::Index { crystal, wavelength, temperature, source } => {
            let catalog = Catalog::builtin()?;
            let record = catalog.crystal(&crystal, source.as_deref())?;
            let t = temperature.unwrap_or(record.reference_temperature);
            let n = record.principal_indices(wavelength, t)?;
            println!("{} ({}) at {wavelength} nm, {t} °C:", record.name, record.source);
            if record.optical_class.is_uniaxial() {
                println!("  n_o = {:.6}", n.nx);
                println!("  n_e = {:.6}", n.nz);
            } else {
                println!("  n_x = {:.6}", n.nx);
                println!("  n_y = {:.6}", n.ny);
                println!("  n_z = {:.6}", n.nz);
            }
            Ok(())
        }
    }
}
