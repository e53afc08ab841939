//! Phase-mismatch functions.
//!
//! For waves 1 + 2 → 3 with vacuum wavelengths $\lambda_i$,
//!
//! $$
//! \Delta k = 2\pi\left(\frac{n_3}{\lambda_3} - \frac{n_1}{\lambda_1} - \frac{n_2}{\lambda_2}\right)
//!          = \frac{2\pi}{\lambda_3}\,\Delta n,
//! \qquad
//! \Delta n = n_3 - \frac{\lambda_3}{\lambda_1} n_1 - \frac{\lambda_3}{\lambda_2} n_2 .
//! $$
//!
//! The solvers search for zeros of the dimensionless $\Delta n$; $\Delta k$
//! (rad/mm) is used for acceptance bandwidths.

use phasematch_materials::Crystal;

use crate::error::PhaseMatchError;
use crate::index::{eigen_indices, principal_indices, section_indices};
use crate::types::{Condition, Polarization, PolarizationType, WaveAssignment, WavelengthTriplet};

/// $\Delta k$ in rad/mm from $\Delta n$ and the output wavelength (nm).
pub fn delta_k_from_delta_n(delta_n: f64, lambda3_nm: f64) -> f64 {
    2.0 * std::f64::consts::PI * delta_n / (lambda3_nm * 1e-6)
}

/// Mismatch of one wave assignment, evaluated at any condition.
#[derive(Debug, Clone, Copy)]
pub struct Mismatch<'a> {
    pub crystal: &'a Crystal,
    pub wavelengths: WavelengthTriplet,
    pub assignment: WaveAssignment,
}

impl<'a> Mismatch<'a> {
    pub fn new(crystal: &'a Crystal, wavelengths: WavelengthTriplet, assignment: WaveAssignment) -> Self {
        Self { crystal, wavelengths, assignment }
    }

    /// Index of the wave at `wavelength_nm` with the given role.
    fn wave_index(
        &self,
        wavelength_nm: f64,
        condition: &Condition,
        pol: Polarization,
    ) -> Result<f64, PhaseMatchError> {
        let n = principal_indices(self.crystal, wavelength_nm, condition.temperature)?;
        Ok(section_indices(self.crystal, &n, &condition.geometry)?.get(pol))
    }

    /// $\Delta n$ at a condition.
    pub fn delta_n(&self, condition: &Condition) -> Result<f64, PhaseMatchError> {
        let w = &self.wavelengths;
        let n1 = self.wave_index(w.lambda1, condition, self.assignment.input1)?;
        let n2 = self.wave_index(w.lambda2, condition, self.assignment.input2)?;
        let n3 = self.wave_index(w.lambda3, condition, self.assignment.output)?;
        Ok(n3 - w.lambda3 / w.lambda1 * n1 - w.lambda3 / w.lambda2 * n2)
    }

    /// $\Delta k$ (rad/mm) at a condition.
    pub fn delta_k(&self, condition: &Condition) -> Result<f64, PhaseMatchError> {
        Ok(delta_k_from_delta_n(self.delta_n(condition)?, self.wavelengths.lambda3))
    }
}

/// Mismatch between slow and fast eigenwaves along an arbitrary direction.
///
/// Type I couples slow + slow → fast, Type II slow + fast → fast.
#[derive(Debug, Clone, Copy)]
pub struct EigenMismatch<'a> {
    pub crystal: &'a Crystal,
    pub wavelengths: WavelengthTriplet,
    pub polarization: PolarizationType,
}

impl EigenMismatch<'_> {
    pub fn delta_n(&self, condition: &Condition) -> Result<f64, PhaseMatchError> {
        let w = &self.wavelengths;
        let t = condition.temperature;
        let g = &condition.geometry;
        let (slow1, _) = eigen_indices(&principal_indices(self.crystal, w.lambda1, t)?, g);
        let (slow2, fast2) = eigen_indices(&principal_indices(self.crystal, w.lambda2, t)?, g);
        let (_, fast3) = eigen_indices(&principal_indices(self.crystal, w.lambda3, t)?, g);
        let n2 = match self.polarization {
            PolarizationType::TypeI => slow2,
            PolarizationType::TypeII => fast2,
        };
        Ok(fast3 - w.lambda3 / w.lambda1 * slow1 - w.lambda3 / w.lambda2 * n2)
    }
}
