//! Angle-tuned phase matching.
//!
//! Uniaxial crystals are tuned in $\theta \in [0°, 90°]$; the index does
//! not depend on $\phi$, which is reported as 0 (see
//! [`optimal_azimuth`](crate::nonlinear::optimal_azimuth) for the azimuth
//! that maximises $d_{\text{eff}}$).
//!
//! Biaxial crystals are solved in the three principal planes, where the
//! static-axis wave plays the ordinary role. Type I/II map to wave
//! assignments through the plane's effective sign: negative when the static
//! index exceeds the mean of the two in-plane indices. Off-plane directions
//! are covered by [`solve_phase_matching_locus`], which traces the full
//! phase-matching cone over $(\theta, \phi)$ with slow/fast eigenwaves.

use ndarray::Array2;
use phasematch_materials::{Crystal, OpticalClass};

use super::mismatch::{EigenMismatch, Mismatch};
use super::roots::RootFinder;
use super::{find_conditions, AngleTuning, Tuning};
use crate::error::PhaseMatchError;
use crate::index::principal_indices;
use crate::types::{
    Condition, Convergence, Geometry, InteractionType, PhaseMatchingSolution, PolarizationType,
    PrincipalPlane, SolverConfig, WaveAssignment, WavelengthTriplet,
};

/// Whether a crystal (or one principal plane of a biaxial crystal) behaves
/// as optically negative at a wavelength and temperature.
pub fn effective_sign_negative(
    crystal: &Crystal,
    plane: PrincipalPlane,
    wavelength_nm: f64,
    temperature_c: f64,
) -> Result<bool, PhaseMatchError> {
    match crystal.optical_class {
        OpticalClass::UniaxialNegative => Ok(true),
        OpticalClass::UniaxialPositive => Ok(false),
        OpticalClass::Biaxial => {
            let n = principal_indices(crystal, wavelength_nm, temperature_c)?;
            let (a, b) = plane.ellipse_axes();
            Ok(n.along(plane.static_axis()) > 0.5 * (n.along(a) + n.along(b)))
        }
    }
}

pub(crate) fn validate_request(
    wavelengths: &WavelengthTriplet,
    interaction: InteractionType,
    temperature: f64,
    config: &SolverConfig,
) -> Result<(), PhaseMatchError> {
    config.validate()?;
    wavelengths.validate(interaction, config.energy_tolerance)?;
    if !temperature.is_finite() {
        return Err(PhaseMatchError::InvalidRequest(format!(
            "temperature must be finite, got {temperature}"
        )));
    }
    Ok(())
}

/// Planes to search. Uniaxial crystals have a single (azimuth-free) search.
fn planes_for(crystal: &Crystal, plane: Option<PrincipalPlane>) -> Vec<Option<PrincipalPlane>> {
    if crystal.optical_class.is_uniaxial() {
        vec![None]
    } else {
        match plane {
            Some(p) => vec![Some(p)],
            None => PrincipalPlane::ALL.iter().copied().map(Some).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Type(PolarizationType),
    Explicit(WaveAssignment),
}

fn roots_in_plane(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    mode: Mode,
    plane: Option<PrincipalPlane>,
    temperature: f64,
    config: &SolverConfig,
) -> Result<Vec<PhaseMatchingSolution>, PhaseMatchError> {
    let negative = effective_sign_negative(
        crystal,
        plane.unwrap_or(PrincipalPlane::XZ),
        wavelengths.lambda1,
        temperature,
    )?;
    let (assignment, polarization) = match mode {
        Mode::Type(t) => (t.assignment(negative), Some(t)),
        Mode::Explicit(a) => (a, a.polarization_type(negative)),
    };
    if assignment.is_uniform() {
        return Err(PhaseMatchError::InvalidRequest(format!(
            "assignment {assignment} has no birefringent phase match"
        )));
    }

    let tuning = AngleTuning { plane, azimuth: 0.0, temperature };
    let mismatch = Mismatch::new(crystal, wavelengths, assignment);
    let found = find_conditions(crystal, &mismatch, &tuning, config)?;
    log::debug!(
        "{}: {assignment} in {:?} -> {} root(s)",
        crystal.name,
        plane,
        found.len()
    );

    Ok(found
        .into_iter()
        .map(|(condition, convergence)| PhaseMatchingSolution {
            crystal: crystal.name.clone(),
            source: crystal.source.clone(),
            interaction,
            polarization,
            assignment,
            wavelengths,
            condition,
            tuned: tuning.parameter(),
            convergence,
        })
        .collect())
}

/// Prefer a degenerate-match diagnosis over a plain "no match".
fn keep_most_specific(current: Option<PhaseMatchError>, new: PhaseMatchError) -> PhaseMatchError {
    match current {
        Some(e @ PhaseMatchError::DegenerateMatch { .. }) => e,
        _ => new,
    }
}

fn roots_over_planes(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    mode: Mode,
    planes: &[Option<PrincipalPlane>],
    temperature: f64,
    config: &SolverConfig,
) -> Result<Vec<PhaseMatchingSolution>, PhaseMatchError> {
    let mut solutions = Vec::new();
    let mut failure: Option<PhaseMatchError> = None;

    for &plane in planes {
        match roots_in_plane(crystal, wavelengths, interaction, mode, plane, temperature, config) {
            Ok(mut found) => solutions.append(&mut found),
            Err(e @ (PhaseMatchError::NoPhaseMatchFound { .. }
            | PhaseMatchError::DegenerateMatch { .. })) => {
                failure = Some(keep_most_specific(failure, e));
            }
            Err(e) => return Err(e),
        }
    }

    if solutions.is_empty() {
        return Err(failure.unwrap_or_else(|| PhaseMatchError::NoPhaseMatchFound {
            crystal: crystal.name.clone(),
            detail: "no search plane".into(),
        }));
    }
    Ok(solutions)
}

/// First solution in plane-visit order; roots within a plane are ascending.
fn first_root(
    crystal: &Crystal,
    solutions: Vec<PhaseMatchingSolution>,
) -> Result<PhaseMatchingSolution, PhaseMatchError> {
    solutions
        .into_iter()
        .next()
        .ok_or_else(|| PhaseMatchError::NoPhaseMatchFound {
            crystal: crystal.name.clone(),
            detail: "empty root set".into(),
        })
}

/// Every angle-tuned solution for a polarization type at a fixed
/// temperature, ascending in the tuning angle within each plane. Biaxial
/// planes are visited in XY, YZ, XZ order.
pub fn solve_all_roots(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    polarization: PolarizationType,
    temperature: f64,
    config: &SolverConfig,
) -> Result<Vec<PhaseMatchingSolution>, PhaseMatchError> {
    validate_request(&wavelengths, interaction, temperature, config)?;
    roots_over_planes(
        crystal,
        wavelengths,
        interaction,
        Mode::Type(polarization),
        &planes_for(crystal, None),
        temperature,
        config,
    )
}

/// The primary phase-matching solution: the smallest tuning angle in the
/// first principal plane (XY, YZ, XZ) that matches. For uniaxial crystals
/// this is simply the smallest $\theta$.
///
/// # Errors
/// - [`PhaseMatchError::MalformedWavelengthTriplet`] if energy is not conserved.
/// - [`PhaseMatchError::NoPhaseMatchFound`] if $\Delta n$ never changes sign.
/// - [`PhaseMatchError::DegenerateMatch`] for a tangential match.
/// - [`PhaseMatchError::Convergence`] if refinement exhausts its budget.
/// - [`PhaseMatchError::Domain`] if an index cannot be evaluated.
pub fn solve_phase_matching(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    polarization: PolarizationType,
    temperature: f64,
    config: &SolverConfig,
) -> Result<PhaseMatchingSolution, PhaseMatchError> {
    let all = solve_all_roots(crystal, wavelengths, interaction, polarization, temperature, config)?;
    let primary = first_root(crystal, all)?;
    log::debug!(
        "{}: {} {} matched at θ = {:.4}°, φ = {:.4}°",
        crystal.name,
        interaction,
        polarization,
        primary.theta_deg(),
        primary.phi_deg()
    );
    Ok(primary)
}

/// Solve an explicit wave assignment. For biaxial crystals `plane`
/// restricts the search to one principal plane; uniaxial crystals ignore it.
pub fn solve_assignment(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    assignment: WaveAssignment,
    plane: Option<PrincipalPlane>,
    temperature: f64,
    config: &SolverConfig,
) -> Result<PhaseMatchingSolution, PhaseMatchError> {
    validate_request(&wavelengths, interaction, temperature, config)?;
    let all = roots_over_planes(
        crystal,
        wavelengths,
        interaction,
        Mode::Explicit(assignment),
        &planes_for(crystal, plane),
        temperature,
        config,
    )?;
    first_root(crystal, all)
}

/// Outcome of one mode in [`solve_all_modes`].
#[derive(Debug, Clone)]
pub struct ModeOutcome {
    pub plane: Option<PrincipalPlane>,
    pub assignment: WaveAssignment,
    pub polarization: Option<PolarizationType>,
    pub result: Result<PhaseMatchingSolution, PhaseMatchError>,
}

/// Try every distinct wave assignment of the interaction (and every
/// principal plane of a biaxial crystal). Per-mode failures are reported in
/// the outcome rather than aborting the table.
pub fn solve_all_modes(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    temperature: f64,
    config: &SolverConfig,
) -> Result<Vec<ModeOutcome>, PhaseMatchError> {
    validate_request(&wavelengths, interaction, temperature, config)?;
    let mut outcomes = Vec::new();
    for plane in planes_for(crystal, None) {
        let negative = effective_sign_negative(
            crystal,
            plane.unwrap_or(PrincipalPlane::XZ),
            wavelengths.lambda1,
            temperature,
        )?;
        for assignment in WaveAssignment::all_for(interaction) {
            let result = roots_in_plane(
                crystal,
                wavelengths,
                interaction,
                Mode::Explicit(assignment),
                plane,
                temperature,
                config,
            )
            .and_then(|all| first_root(crystal, all));
            outcomes.push(ModeOutcome {
                plane,
                assignment,
                polarization: assignment.polarization_type(negative),
                result,
            });
        }
    }
    Ok(outcomes)
}

/// One direction on the phase-matching cone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocusPoint {
    pub geometry: Geometry,
    pub convergence: Convergence,
}

/// Phase-matching directions over the first octant, with the sampled
/// mismatch map.
#[derive(Debug, Clone)]
pub struct PhaseMatchingLocus {
    pub crystal: String,
    pub interaction: InteractionType,
    pub polarization: PolarizationType,
    pub wavelengths: WavelengthTriplet,
    pub temperature: f64,
    /// Azimuths of the map rows (rad).
    pub phi: Vec<f64>,
    /// Polar angles of the map columns (rad).
    pub theta: Vec<f64>,
    /// $\Delta n$ between slow/fast eigenwaves, shape `(phi.len(), theta.len())`.
    pub mismatch: Array2<f64>,
    pub points: Vec<LocusPoint>,
}

/// Trace the phase-matching cone over $\phi \in [0°, 90°]$ with `phi_steps`
/// rows, finding $\theta$ roots along each row.
///
/// Uses slow/fast eigen-indices from the full Fresnel equation, so it holds
/// for any direction, including off the principal planes.
pub fn solve_phase_matching_locus(
    crystal: &Crystal,
    wavelengths: WavelengthTriplet,
    interaction: InteractionType,
    polarization: PolarizationType,
    temperature: f64,
    phi_steps: usize,
    config: &SolverConfig,
) -> Result<PhaseMatchingLocus, PhaseMatchError> {
    use std::f64::consts::FRAC_PI_2;

    validate_request(&wavelengths, interaction, temperature, config)?;
    let rows = phi_steps.max(2);
    let cols = config.samples() + 1;
    let phi: Vec<f64> = (0..rows)
        .map(|i| FRAC_PI_2 * i as f64 / (rows - 1) as f64)
        .collect();
    let theta: Vec<f64> = (0..cols)
        .map(|j| FRAC_PI_2 * j as f64 / (cols - 1) as f64)
        .collect();

    let eigen = EigenMismatch { crystal, wavelengths, polarization };
    let at = |t: f64, p: f64| Condition { geometry: Geometry::new(t, p), temperature };

    let mut mismatch = Array2::<f64>::zeros((rows, cols));
    for ((i, j), value) in mismatch.indexed_iter_mut() {
        *value = eigen.delta_n(&at(theta[j], phi[i]))?;
    }

    let finder = RootFinder {
        label: &crystal.name,
        samples: cols - 1,
        tolerance: config.angle_tolerance,
        max_iterations: config.max_iterations,
        degeneracy_tolerance: config.degeneracy_tolerance,
    };

    let mut points = Vec::new();
    for (i, row) in mismatch.outer_iter().enumerate() {
        let p = phi[i];
        for j in 0..cols {
            if row[j] == 0.0 {
                points.push(LocusPoint {
                    geometry: Geometry::new(theta[j], p),
                    convergence: Convergence { residual: 0.0, iterations: 0 },
                });
            } else if j + 1 < cols && row[j] * row[j + 1] < 0.0 {
                let root = finder.refine(
                    &mut |t| eigen.delta_n(&at(t, p)),
                    theta[j],
                    row[j],
                    theta[j + 1],
                    row[j + 1],
                )?;
                points.push(LocusPoint {
                    geometry: Geometry::new(root.x, p),
                    convergence: Convergence { residual: root.residual, iterations: root.iterations },
                });
            }
        }
    }
    log::debug!("{}: locus has {} point(s) over {rows} azimuths", crystal.name, points.len());

    if points.is_empty() {
        return Err(PhaseMatchError::NoPhaseMatchFound {
            crystal: crystal.name.clone(),
            detail: format!("no {polarization} direction in the first octant"),
        });
    }

    Ok(PhaseMatchingLocus {
        crystal: crystal.name.clone(),
        interaction,
        polarization,
        wavelengths,
        temperature,
        phi,
        theta,
        mismatch,
        points,
    })
}
