//! Temperature-tuned phase matching at a fixed direction.
//!
//! Uses the same scan-then-refine machinery as the angle solver, with the
//! crystal temperature as the search variable over
//! [`SolverConfig::temperature_range`]. Requires thermo-optic data on every
//! principal axis.

use phasematch_materials::{Crystal, IndexProvider};

use super::angle::{effective_sign_negative, validate_request};
use super::mismatch::Mismatch;
use super::{find_conditions, TemperatureTuning, Tuning};
use crate::error::PhaseMatchError;
use crate::index::section_plane;
use crate::types::{
    Geometry, InteractionType, PhaseMatchingSolution, PolarizationType, SolverConfig,
    WaveAssignment, WavelengthTriplet,
};

/// Temperatures at which an explicit assignment phase matches, ascending.
pub fn solve_temperature_all_roots(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    assignment: WaveAssignment,
    geometry: &Geometry,
    config: &SolverConfig,
) -> Result<Vec<PhaseMatchingSolution>, PhaseMatchError> {
    validate_request(&wavelengths, interaction, crystal.reference_temperature, config)?;
    if !crystal.has_thermal_model() {
        return Err(PhaseMatchError::ThermalModelUnavailable {
            crystal: crystal.name.clone(),
        });
    }
    if !(geometry.theta.is_finite() && geometry.phi.is_finite()) {
        return Err(PhaseMatchError::InvalidRequest(format!(
            "direction must be finite, got θ = {}, φ = {}",
            geometry.theta, geometry.phi
        )));
    }
    if assignment.is_uniform() {
        return Err(PhaseMatchError::InvalidRequest(format!(
            "assignment {assignment} has no birefringent phase match"
        )));
    }

    let plane = section_plane(crystal, geometry)?;
    let geometry = if crystal.optical_class.is_uniaxial() {
        *geometry
    } else {
        Geometry { plane: Some(plane), ..*geometry }
    };
    let negative = effective_sign_negative(
        crystal,
        plane,
        wavelengths.lambda1,
        crystal.reference_temperature,
    )?;

    let tuning = TemperatureTuning { geometry, range: config.temperature_range };
    let mismatch = Mismatch::new(crystal, wavelengths, assignment);
    let found = find_conditions(crystal, &mismatch, &tuning, config)?;
    log::debug!(
        "{}: {assignment} at θ = {:.4}°, φ = {:.4}° -> {} temperature root(s)",
        crystal.name,
        geometry.theta_deg(),
        geometry.phi_deg(),
        found.len()
    );

    Ok(found
        .into_iter()
        .map(|(condition, convergence)| PhaseMatchingSolution {
            crystal: crystal.name.clone(),
            source: crystal.source.clone(),
            interaction,
            polarization: assignment.polarization_type(negative),
            assignment,
            wavelengths,
            condition,
            tuned: tuning.parameter(),
            convergence,
        })
        .collect())
}

/// Lowest phase-matching temperature for an explicit assignment.
pub fn solve_temperature_assignment(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    assignment: WaveAssignment,
    geometry: &Geometry,
    config: &SolverConfig,
) -> Result<PhaseMatchingSolution, PhaseMatchError> {
    solve_temperature_all_roots(crystal, wavelengths, interaction, assignment, geometry, config)?
        .into_iter()
        .next()
        .ok_or_else(|| PhaseMatchError::NoPhaseMatchFound {
            crystal: crystal.name.clone(),
            detail: "empty root set".into(),
        })
}

/// Temperature at which a polarization type phase matches along a fixed
/// direction. The temperature is [`PhaseMatchingSolution::temperature`].
///
/// # Errors
/// - [`PhaseMatchError::ThermalModelUnavailable`] if any axis lacks thermal data.
/// - [`PhaseMatchError::NoPhaseMatchFound`] if $\Delta n$ keeps its sign over the range.
/// - [`PhaseMatchError::Convergence`] if refinement exhausts its budget.
/// - [`PhaseMatchError::OffPrincipalPlane`] for a biaxial direction off the principal planes.
pub fn solve_temperature_matching(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    polarization: PolarizationType,
    geometry: &Geometry,
    config: &SolverConfig,
) -> Result<PhaseMatchingSolution, PhaseMatchError> {
    let plane = section_plane(crystal, geometry)?;
    let negative = effective_sign_negative(
        crystal,
        plane,
        wavelengths.lambda1,
        crystal.reference_temperature,
    )?;
    let mut solution = solve_temperature_assignment(
        crystal,
        wavelengths,
        interaction,
        polarization.assignment(negative),
        geometry,
        config,
    )?;
    solution.polarization = Some(polarization);
    Ok(solution)
}
