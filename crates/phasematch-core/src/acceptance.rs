//! Walk-off and acceptance bandwidths of a solved condition.
//!
//! The generated intensity of a crystal of length $L$ follows
//! $\mathrm{sinc}^2(\Delta k L / 2)$, which falls to half its peak at
//! $|\Delta k| L / 2 = 1.391557$. Each bandwidth is the full width between
//! the two parameter values on either side of the solution where that
//! threshold is reached.
//!
//! Edges are found by stepping outward with a doubling step until the
//! threshold is crossed, then bisecting. No linearisation of $\Delta k$ is
//! made, so non-critical matching (where $\Delta k$ is quadratic in the
//! angle) gets its wider bandwidth without special handling.

use phasematch_materials::{Crystal, IndexProvider};
use serde::{Deserialize, Serialize};

use crate::error::PhaseMatchError;
use crate::index::{section_plane, walk_off_angle};
use crate::solver::mismatch::Mismatch;
use crate::types::{Condition, Geometry, PhaseMatchingSolution};

/// Crystal length used when none is given (mm).
pub const DEFAULT_CRYSTAL_LENGTH_MM: f64 = 10.0;

/// $x$ at which $\mathrm{sinc}^2 x = 1/2$.
pub const HALF_MAX_PHASE: f64 = 1.391557;

/// Speed of light (m/s).
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Doublings of the outward step before giving up on an edge.
const MAX_EXPANSIONS: usize = 64;

const MAX_BISECTIONS: usize = 100;

/// Poynting walk-off of each wave (rad, signed). Ordinary waves are 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkOff {
    pub input1: f64,
    pub input2: f64,
    pub output: f64,
}

impl WalkOff {
    /// Largest magnitude over the three waves.
    pub fn max_abs(&self) -> f64 {
        self.input1.abs().max(self.input2.abs()).max(self.output.abs())
    }
}

/// Walk-off angles at a solved condition.
pub fn walk_off(
    crystal: &Crystal,
    solution: &PhaseMatchingSolution,
) -> Result<WalkOff, PhaseMatchError> {
    let w = &solution.wavelengths;
    let t = solution.temperature();
    let g = solution.geometry();
    let a = solution.assignment;
    Ok(WalkOff {
        input1: walk_off_angle(crystal, w.lambda1, t, g, a.input1)?,
        input2: walk_off_angle(crystal, w.lambda2, t, g, a.input2)?,
        output: walk_off_angle(crystal, w.lambda3, t, g, a.output)?,
    })
}

/// Full widths at half maximum for one crystal length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceBandwidths {
    pub crystal_length_mm: f64,
    /// Tuning angle (rad).
    pub angle_rad: f64,
    /// `None` if the crystal has no thermo-optic data.
    pub temperature_c: Option<f64>,
    /// Fundamental wavelength $\lambda_1$ (nm).
    pub wavelength_nm: f64,
    pub frequency_ghz: f64,
}

/// $\Delta\nu = c\,\Delta\lambda / \lambda^2$ in GHz for nm inputs.
pub fn frequency_bandwidth_ghz(delta_lambda_nm: f64, lambda_nm: f64) -> f64 {
    SPEED_OF_LIGHT * delta_lambda_nm / (lambda_nm * lambda_nm)
}

fn check_length(length_mm: f64) -> Result<(), PhaseMatchError> {
    if !(length_mm.is_finite() && length_mm > 0.0) {
        return Err(PhaseMatchError::InvalidRequest(format!(
            "crystal length must be positive, got {length_mm} mm"
        )));
    }
    Ok(())
}

/// Offset from the solution at which $|\Delta k| L/2$ reaches the
/// half-maximum phase, searching in `direction` (±1).
fn edge<F>(
    crystal: &Crystal,
    phase: &mut F,
    initial_step: f64,
    direction: f64,
) -> Result<f64, PhaseMatchError>
where
    F: FnMut(f64) -> Result<f64, PhaseMatchError>,
{
    let mut inner = 0.0;
    let mut outer = initial_step;
    let mut expansions = 0;
    while phase(direction * outer)? < HALF_MAX_PHASE {
        expansions += 1;
        if expansions >= MAX_EXPANSIONS {
            return Err(PhaseMatchError::Convergence {
                crystal: crystal.name.clone(),
                iterations: expansions,
                residual: HALF_MAX_PHASE - phase(direction * outer)?,
            });
        }
        inner = outer;
        outer *= 2.0;
    }

    for _ in 0..MAX_BISECTIONS {
        let mid = 0.5 * (inner + outer);
        if phase(direction * mid)? < HALF_MAX_PHASE {
            inner = mid;
        } else {
            outer = mid;
        }
        if outer - inner <= 1e-10 * outer {
            break;
        }
    }
    Ok(0.5 * (inner + outer))
}

fn full_width<F>(crystal: &Crystal, mut phase: F, initial_step: f64) -> Result<f64, PhaseMatchError>
where
    F: FnMut(f64) -> Result<f64, PhaseMatchError>,
{
    let upper = edge(crystal, &mut phase, initial_step, 1.0)?;
    let lower = edge(crystal, &mut phase, initial_step, -1.0)?;
    Ok(upper + lower)
}

/// Direction at an offset of the tuning angle: $\theta$ for uniaxial
/// crystals, the plane angle for biaxial ones.
fn offset_geometry(
    crystal: &Crystal,
    geometry: &Geometry,
    delta: f64,
) -> Result<Geometry, PhaseMatchError> {
    if crystal.optical_class.is_uniaxial() {
        return Ok(Geometry::new(geometry.theta + delta, geometry.phi));
    }
    let plane = section_plane(crystal, geometry)?;
    Ok(plane.geometry(geometry.tuning_angle(plane) + delta))
}

/// Angular FWHM (rad).
pub fn angle_acceptance(
    crystal: &Crystal,
    solution: &PhaseMatchingSolution,
    length_mm: f64,
) -> Result<f64, PhaseMatchError> {
    check_length(length_mm)?;
    let mismatch = Mismatch::new(crystal, solution.wavelengths, solution.assignment);
    let base = solution.condition;
    full_width(
        crystal,
        |delta| {
            let condition = Condition {
                geometry: offset_geometry(crystal, &base.geometry, delta)?,
                ..base
            };
            Ok(mismatch.delta_k(&condition)?.abs() * length_mm / 2.0)
        },
        1e-5,
    )
}

/// Temperature FWHM (°C).
///
/// # Errors
/// [`PhaseMatchError::ThermalModelUnavailable`] without thermo-optic data.
pub fn temperature_acceptance(
    crystal: &Crystal,
    solution: &PhaseMatchingSolution,
    length_mm: f64,
) -> Result<f64, PhaseMatchError> {
    check_length(length_mm)?;
    if !crystal.has_thermal_model() {
        return Err(PhaseMatchError::ThermalModelUnavailable {
            crystal: crystal.name.clone(),
        });
    }
    let mismatch = Mismatch::new(crystal, solution.wavelengths, solution.assignment);
    let base = solution.condition;
    full_width(
        crystal,
        |delta| {
            let condition = Condition { temperature: base.temperature + delta, ..base };
            Ok(mismatch.delta_k(&condition)?.abs() * length_mm / 2.0)
        },
        1e-3,
    )
}

/// Spectral FWHM in the fundamental $\lambda_1$ (nm). For SFG, $\lambda_2$
/// moves with $\lambda_1$ at a fixed ratio.
pub fn wavelength_acceptance(
    crystal: &Crystal,
    solution: &PhaseMatchingSolution,
    length_mm: f64,
) -> Result<f64, PhaseMatchError> {
    check_length(length_mm)?;
    let base = solution.wavelengths;
    full_width(
        crystal,
        |delta| {
            let wavelengths = base.with_fundamental(base.lambda1 + delta);
            let mismatch = Mismatch::new(crystal, wavelengths, solution.assignment);
            Ok(mismatch.delta_k(&solution.condition)?.abs() * length_mm / 2.0)
        },
        1e-4,
    )
}

/// All bandwidths of a solved condition. The temperature width is skipped
/// for crystals without thermo-optic data.
pub fn acceptance_bandwidths(
    crystal: &Crystal,
    solution: &PhaseMatchingSolution,
    length_mm: f64,
) -> Result<AcceptanceBandwidths, PhaseMatchError> {
    let angle_rad = angle_acceptance(crystal, solution, length_mm)?;
    let temperature_c = if crystal.has_thermal_model() {
        Some(temperature_acceptance(crystal, solution, length_mm)?)
    } else {
        None
    };
    let wavelength_nm = wavelength_acceptance(crystal, solution, length_mm)?;
    let frequency_ghz = frequency_bandwidth_ghz(wavelength_nm, solution.wavelengths.lambda1);
    log::debug!(
        "{}: acceptance over {length_mm} mm: {:.3} mrad, {:?} °C, {:.4} nm",
        crystal.name,
        angle_rad * 1e3,
        temperature_c,
        wavelength_nm
    );
    Ok(AcceptanceBandwidths {
        crystal_length_mm: length_mm,
        angle_rad,
        temperature_c,
        wavelength_nm,
        frequency_ghz,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_half_max_phase() {
        let x = HALF_MAX_PHASE;
        let sinc2 = (x.sin() / x).powi(2);
        assert_relative_eq!(sinc2, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_frequency_bandwidth() {
        // 1 nm at 1000 nm is ~299.8 GHz
        assert_relative_eq!(frequency_bandwidth_ghz(1.0, 1000.0), 299.792458, epsilon = 1e-9);
    }

    #[test]
    fn test_edge_of_linear_phase() {
        let crystal = phasematch_materials::Catalog::builtin()
            .unwrap()
            .crystal("BBO", None)
            .unwrap()
            .clone();
        // phase = 2|x| crosses the threshold at x = 0.6957785
        let mut phase = |x: f64| Ok::<_, PhaseMatchError>(2.0 * x.abs());
        let up = edge(&crystal, &mut phase, 1e-3, 1.0).unwrap();
        let down = edge(&crystal, &mut phase, 1e-3, -1.0).unwrap();
        assert_relative_eq!(up, HALF_MAX_PHASE / 2.0, epsilon = 1e-8);
        assert_relative_eq!(down, HALF_MAX_PHASE / 2.0, epsilon = 1e-8);
    }

    #[test]
    fn test_edge_gives_up_on_flat_phase() {
        let crystal = phasematch_materials::Catalog::builtin()
            .unwrap()
            .crystal("BBO", None)
            .unwrap()
            .clone();
        let mut phase = |_: f64| Ok::<_, PhaseMatchError>(0.0);
        let err = edge(&crystal, &mut phase, 1e-3, 1.0).unwrap_err();
        assert!(matches!(err, PhaseMatchError::Convergence { .. }), "got {err:?}");
    }

    #[test]
    fn test_length_must_be_positive() {
        assert!(check_length(0.0).is_err());
        assert!(check_length(f64::NAN).is_err());
        assert!(check_length(5.0).is_ok());
    }
}
