//! Error kinds returned by the phase-matching solvers.
//!
//! Every failure is local to one request and carries enough context
//! (crystal, inputs, residual, iteration count) to diagnose it.

use phasematch_materials::MaterialError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhaseMatchError {
    /// Index evaluation undefined (pole, absorption edge, outside the data range).
    #[error("Index evaluation failed for {crystal}: {source}")]
    Domain {
        crystal: String,
        source: MaterialError,
    },

    #[error("No phase match for {crystal}: {detail}")]
    NoPhaseMatchFound { crystal: String, detail: String },

    /// Mismatch touches zero without changing sign.
    #[error("Degenerate (tangential) phase match for {crystal} at {parameter} = {value:.6} (|Δn| = {residual:.2e})")]
    DegenerateMatch {
        crystal: String,
        parameter: &'static str,
        value: f64,
        residual: f64,
    },

    #[error("Root finding for {crystal} did not converge after {iterations} iterations (residual: {residual:.2e})")]
    Convergence {
        crystal: String,
        iterations: usize,
        residual: f64,
    },

    #[error("No d_eff formula for point group {point_group} ({crystal})")]
    UnsupportedSymmetryClass { crystal: String, point_group: String },

    #[error("{crystal} has no thermo-optic data; temperature tuning is unavailable")]
    ThermalModelUnavailable { crystal: String },

    #[error("Wavelengths ({lambda1}, {lambda2}, {lambda3}) nm violate energy conservation (relative error {relative_error:.2e})")]
    MalformedWavelengthTriplet {
        lambda1: f64,
        lambda2: f64,
        lambda3: f64,
        relative_error: f64,
    },

    #[error("Direction θ = {theta_deg:.4}°, φ = {phi_deg:.4}° is not in a principal plane of {crystal}")]
    OffPrincipalPlane {
        crystal: String,
        theta_deg: f64,
        phi_deg: f64,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl PhaseMatchError {
    pub(crate) fn domain(crystal: &str, source: MaterialError) -> Self {
        PhaseMatchError::Domain {
            crystal: crystal.to_string(),
            source,
        }
    }
}
