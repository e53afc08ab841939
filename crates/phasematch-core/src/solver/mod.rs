//! Phase-matching solvers.
//!
//! Both solvers share one strategy: pick a [`Tuning`] variable, scan the
//! mismatch $\Delta n$ over its range, bracket sign changes and refine them
//! (see [`roots`]). They differ only in what is tuned:
//!
//! - [`angle`]: propagation direction at fixed temperature
//!   ($\theta$ for uniaxial crystals and the XZ/YZ planes, $\phi$ in XY);
//! - [`temperature`]: crystal temperature at fixed direction.

pub mod angle;
pub mod mismatch;
pub mod roots;
pub mod temperature;

use std::f64::consts::FRAC_PI_2;

use phasematch_materials::Crystal;

use crate::error::PhaseMatchError;
use crate::types::{
    Condition, Convergence, Geometry, PrincipalPlane, SolverConfig, TunedParameter,
};
use mismatch::Mismatch;
use roots::RootFinder;

/// A one-dimensional search variable.
pub trait Tuning {
    fn parameter(&self) -> TunedParameter;

    /// Search interval in native units (rad or °C).
    fn range(&self) -> (f64, f64);

    /// Root tolerance in native units.
    fn tolerance(&self, config: &SolverConfig) -> f64;

    /// Condition at a value of the tuned variable.
    fn condition(&self, x: f64) -> Condition;

    /// Value in reporting units (degrees or °C).
    fn display_value(&self, x: f64) -> f64 {
        x
    }
}

/// Direction tuning over $[0°, 90°]$ at a fixed temperature.
#[derive(Debug, Clone, Copy)]
pub struct AngleTuning {
    /// Principal plane for biaxial crystals; `None` tunes $\theta$ of a
    /// uniaxial crystal at fixed azimuth.
    pub plane: Option<PrincipalPlane>,
    pub azimuth: f64,
    pub temperature: f64,
}

impl Tuning for AngleTuning {
    fn parameter(&self) -> TunedParameter {
        self.plane
            .map_or(TunedParameter::Theta, |p| p.tuning_parameter())
    }

    fn range(&self) -> (f64, f64) {
        (0.0, FRAC_PI_2)
    }

    fn tolerance(&self, config: &SolverConfig) -> f64 {
        config.angle_tolerance
    }

    fn condition(&self, x: f64) -> Condition {
        let geometry = match self.plane {
            Some(plane) => plane.geometry(x),
            None => Geometry::new(x, self.azimuth),
        };
        Condition { geometry, temperature: self.temperature }
    }

    fn display_value(&self, x: f64) -> f64 {
        x.to_degrees()
    }
}

/// Temperature tuning at a fixed direction.
#[derive(Debug, Clone, Copy)]
pub struct TemperatureTuning {
    pub geometry: Geometry,
    pub range: (f64, f64),
}

impl Tuning for TemperatureTuning {
    fn parameter(&self) -> TunedParameter {
        TunedParameter::Temperature
    }

    fn range(&self) -> (f64, f64) {
        self.range
    }

    fn tolerance(&self, config: &SolverConfig) -> f64 {
        config.temperature_tolerance
    }

    fn condition(&self, x: f64) -> Condition {
        Condition { geometry: self.geometry, temperature: x }
    }
}

/// All zeros of the mismatch over the tuning range, ascending.
///
/// # Errors
/// - [`PhaseMatchError::DegenerateMatch`] if $\Delta n$ only touches zero.
/// - [`PhaseMatchError::NoPhaseMatchFound`] if it never reaches zero.
/// - [`PhaseMatchError::Convergence`] if a refinement exhausts its budget.
pub(crate) fn find_conditions<T: Tuning>(
    crystal: &Crystal,
    mismatch: &Mismatch<'_>,
    tuning: &T,
    config: &SolverConfig,
) -> Result<Vec<(Condition, Convergence)>, PhaseMatchError> {
    find_zeros(
        &crystal.name,
        |x| mismatch.delta_n(&tuning.condition(x)),
        tuning,
        config,
        || {
            format!(
                "Δn does not change sign for {} ({:.1}/{:.1}/{:.1} nm)",
                mismatch.assignment,
                mismatch.wavelengths.lambda1,
                mismatch.wavelengths.lambda2,
                mismatch.wavelengths.lambda3,
            )
        },
    )
}

/// Scan `delta_n` over the tuning range and turn its zeros into
/// conditions. `describe` names the request when nothing is found.
fn find_zeros<T, F, D>(
    label: &str,
    delta_n: F,
    tuning: &T,
    config: &SolverConfig,
    describe: D,
) -> Result<Vec<(Condition, Convergence)>, PhaseMatchError>
where
    T: Tuning,
    F: FnMut(f64) -> Result<f64, PhaseMatchError>,
    D: FnOnce() -> String,
{
    let (lo, hi) = tuning.range();
    let finder = RootFinder {
        label,
        samples: config.samples(),
        tolerance: tuning.tolerance(config),
        max_iterations: config.max_iterations,
        degeneracy_tolerance: config.degeneracy_tolerance,
    };
    let scan = finder.find_all(delta_n, lo, hi)?;

    if scan.roots.is_empty() {
        let parameter = tuning.parameter().name();
        if let Some(t) = scan.tangential.first() {
            return Err(PhaseMatchError::DegenerateMatch {
                crystal: label.to_string(),
                parameter,
                value: tuning.display_value(t.x),
                residual: t.residual,
            });
        }
        return Err(PhaseMatchError::NoPhaseMatchFound {
            crystal: label.to_string(),
            detail: format!(
                "{} over {parameter} ∈ [{:.1}, {:.1}]",
                describe(),
                tuning.display_value(lo),
                tuning.display_value(hi),
            ),
        });
    }

    Ok(scan
        .roots
        .iter()
        .map(|r| {
            (
                tuning.condition(r.x),
                Convergence { residual: r.residual, iterations: r.iterations },
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn theta_tuning() -> AngleTuning {
        AngleTuning { plane: None, azimuth: 0.0, temperature: 20.0 }
    }

    fn no_detail() -> String {
        "test mismatch".into()
    }

    #[test]
    fn test_touching_mismatch_is_degenerate() {
        let c = 0.4321;
        let err = find_zeros(
            "toy",
            |x| Ok((x - c) * (x - c)),
            &theta_tuning(),
            &SolverConfig::default(),
            no_detail,
        )
        .unwrap_err();
        match err {
            PhaseMatchError::DegenerateMatch { crystal, parameter, value, residual } => {
                assert_eq!(crystal, "toy");
                assert_eq!(parameter, "theta");
                assert_abs_diff_eq!(value, c.to_degrees(), epsilon = 1e-2);
                assert!(residual < 1e-10);
            }
            other => panic!("expected DegenerateMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_positive_mismatch_has_no_match() {
        let err = find_zeros(
            "toy",
            |x| Ok(1e-3 + x * x),
            &theta_tuning(),
            &SolverConfig::default(),
            no_detail,
        )
        .unwrap_err();
        match err {
            PhaseMatchError::NoPhaseMatchFound { detail, .. } => {
                assert!(detail.starts_with("test mismatch over theta"), "{detail}");
            }
            other => panic!("expected NoPhaseMatchFound, got {other:?}"),
        }
    }

    #[test]
    fn test_crossing_mismatch_gives_condition() {
        let found = find_zeros(
            "toy",
            |x| Ok(x - 0.5),
            &theta_tuning(),
            &SolverConfig::default(),
            no_detail,
        )
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_abs_diff_eq!(found[0].0.geometry.theta, 0.5, epsilon = 1e-5);
        assert_eq!(found[0].0.temperature, 20.0);
    }
}
