//! TOML configuration deserialisation for phase-matching jobs.

use anyhow::Context;
use serde::Deserialize;

use phasematch_core::types::{
    InteractionType, PolarizationType, PrincipalPlane, PropagationAxis, SolverConfig,
    WaveAssignment,
};
use phasematch_materials::Crystal;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub crystal: CrystalConfig,
    #[serde(default, rename = "request")]
    pub requests: Vec<RequestConfig>,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crystal selection: a full inline record, or a catalog entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CrystalConfig {
    Inline(Box<Crystal>),
    Catalog {
        name: String,
        /// Sellmeier source; the crystal's default if absent.
        #[serde(default)]
        source: Option<String>,
    },
}

/// What to hold fixed while solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningKind {
    #[default]
    Angle,
    Temperature,
}

/// A single phase-matching request.
#[derive(Debug, Deserialize)]
pub struct RequestConfig {
    /// Label used in the output (default: "request-N").
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_interaction")]
    pub interaction: InteractionType,
    /// Fundamental wavelength (nm).
    pub lambda1: f64,
    /// Second input for SFG (nm); equals `lambda1` for SHG.
    #[serde(default)]
    pub lambda2: Option<f64>,
    #[serde(default)]
    pub polarization: Option<PolarizationType>,
    /// Explicit wave assignment such as "oee"; overrides `polarization`.
    #[serde(default)]
    pub assignment: Option<WaveAssignment>,
    /// Solve every wave assignment (angle tuning only).
    #[serde(default)]
    pub all_modes: bool,
    #[serde(default)]
    pub tuning: TuningKind,
    /// Crystal temperature for angle tuning (°C); the solver reference
    /// temperature if absent.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Fixed direction for temperature tuning, as angles...
    #[serde(default)]
    pub theta_deg: Option<f64>,
    #[serde(default)]
    pub phi_deg: Option<f64>,
    /// ...or as a principal axis.
    #[serde(default)]
    pub axis: Option<PropagationAxis>,
    /// Principal plane for the direction (biaxial crystals).
    #[serde(default)]
    pub plane: Option<PrincipalPlane>,
}

fn default_interaction() -> InteractionType {
    InteractionType::Shg
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save solutions as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_csv: bool,
    /// Whether to also save solutions as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Crystal length for acceptance bandwidths (mm, default: 10).
    #[serde(default = "default_length")]
    pub crystal_length_mm: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_csv: true,
            save_json: false,
            crystal_length_mm: default_length(),
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}
fn default_length() -> f64 {
    phasematch_core::acceptance::DEFAULT_CRYSTAL_LENGTH_MM
}

/// Parse a TOML job configuration.
pub fn parse_config(content: &str) -> anyhow::Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    if config.requests.is_empty() {
        anyhow::bail!("Job has no [[request]] entries");
    }
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid job file {}", path.display()))
}
