//! Refractive index provider trait.
//!
//! All crystal dispersion sources implement [`IndexProvider`], which returns
//! the three principal refractive indices $(n_x, n_y, n_z)$ at a given vacuum
//! wavelength and crystal temperature. Uniaxial crystals report
//! $n_x = n_y = n_o$ and $n_z = n_e$.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crystal::CrystalAxis;

/// Errors from material providers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MaterialError {
    #[error("Wavelength {wavelength_nm} nm is outside the data range [{min}, {max}] nm")]
    OutOfRange {
        wavelength_nm: f64,
        min: f64,
        max: f64,
    },

    #[error("Sellmeier pole at {wavelength_nm} nm (resonance λ² = {pole} µm²)")]
    Pole { wavelength_nm: f64, pole: f64 },

    #[error("n² = {n_squared:.4e} is not positive at {wavelength_nm} nm (absorption edge)")]
    NegativeIndexSquared { wavelength_nm: f64, n_squared: f64 },

    #[error("Crystal not found: {0}")]
    NotFound(String),

    #[error("Data error: {0}")]
    DataError(String),
}

/// The three principal refractive indices at one wavelength and temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrincipalIndices {
    pub nx: f64,
    pub ny: f64,
    pub nz: f64,
}

impl PrincipalIndices {
    /// Index for light polarised along a principal axis.
    pub fn along(&self, axis: CrystalAxis) -> f64 {
        match axis {
            CrystalAxis::X => self.nx,
            CrystalAxis::Y => self.ny,
            CrystalAxis::Z => self.nz,
        }
    }
}

/// Provides wavelength- and temperature-dependent principal indices.
///
/// Implementations must be pure: the same inputs always give the same
/// indices, and no interior state is mutated. This lets solvers share a
/// provider across threads without coordination.
pub trait IndexProvider: Send + Sync {
    /// Human-readable name of this material.
    fn name(&self) -> &str;

    /// Wavelength range over which the dispersion formula is valid (nm),
    /// if the data source states one.
    fn wavelength_range(&self) -> Option<(f64, f64)>;

    /// Principal indices $(n_x, n_y, n_z)$ at a vacuum wavelength (nm) and
    /// temperature (°C).
    fn principal_indices(
        &self,
        wavelength_nm: f64,
        temperature_c: f64,
    ) -> Result<PrincipalIndices, MaterialError>;

    /// Whether every principal axis carries a thermal correction term.
    fn has_thermal_model(&self) -> bool;
}
