//! Effective nonlinear coefficient $d_{\text{eff}}$.
//!
//! The second-order polarization at the output is driven by the two input
//! fields through the contracted tensor $d_{il}$ (Voigt notation):
//!
//! $$
//! d_{\text{eff}} = \hat{e}_3 \cdot \mathbf{d} \cdot V(\hat{e}_1, \hat{e}_2)
//! $$
//!
//! where $V$ is the symmetric pair vector of
//! [`voigt_pair`](crate::geometry::voigt_pair) and $\hat{e}_i$ are the
//! polarization unit vectors of [`geometry`](crate::geometry).
//!
//! Each supported point group has a closed form in $(\theta, \phi)$,
//! selected by [`closed_form`]:
//!
//! | Class | $o+o\to e$ | $o+e\to e$ | $e+e\to o$ | $o+e\to o$ |
//! |-------|-----------|-----------|-----------|-----------|
//! | 3m | $d_{31}s_\theta - d_{22}c_\theta s_{3\phi}$ | $d_{22}c^2_\theta c_{3\phi}$ | $d_{22}c^2_\theta c_{3\phi}$ | $d_{15}s_\theta - d_{22}c_\theta s_{3\phi}$ |
//! | 32 | $d_{11}c_\theta c_{3\phi}$ | $d_{11}c^2_\theta s_{3\phi} + \tfrac12 d_{14}s_{2\theta}$ | $d_{11}c^2_\theta s_{3\phi} - d_{14}s_{2\theta}$ | $d_{11}c_\theta c_{3\phi}$ |
//! | $\bar{4}2m$ | $-d_{36}s_\theta s_{2\phi}$ | $\tfrac12(d_{14}+d_{36})s_{2\theta}c_{2\phi}$ | $d_{14}s_{2\theta}c_{2\phi}$ | $-d_{14}s_\theta s_{2\phi}$ |
//! | 4mm, 6mm | $d_{31}s_\theta$ | 0 | 0 | $d_{15}s_\theta$ |
//! | $\bar{6}m2$ | $-d_{22}c_\theta s_{3\phi}$ | $d_{22}c^2_\theta c_{3\phi}$ | $d_{22}c^2_\theta c_{3\phi}$ | $-d_{22}c_\theta s_{3\phi}$ |
//!
//! Biaxial mm2 crystals are handled in the principal planes only, with
//! tuning angle $\alpha$. The tensor is given in the optical frame, so the
//! two-fold axis may lie along any of $x$, $y$, $z$ (it is $y$ for LBO and
//! $z$ for KTP). The forms below hold for all three orientations; only the
//! components allowed by the actual one are non-zero:
//!
//! | Plane | $o+o\to e$ | $o+e\to e$ | $e+e\to o$ | $o+e\to o$ |
//! |-------|-----------|-----------|-----------|-----------|
//! | XY | $d_{13}s_\alpha - d_{23}c_\alpha$ | $d_{15}s^2_\alpha + d_{24}c^2_\alpha$ | $d_{31}s^2_\alpha + d_{32}c^2_\alpha$ | $d_{35}s_\alpha - d_{34}c_\alpha$ |
//! | XZ | $d_{32}s_\alpha - d_{12}c_\alpha$ | $-(d_{16}c^2_\alpha + d_{34}s^2_\alpha)$ | $-(d_{21}c^2_\alpha + d_{23}s^2_\alpha)$ | $d_{24}s_\alpha - d_{26}c_\alpha$ |
//! | YZ | $d_{31}s_\alpha - d_{21}c_\alpha$ | $d_{26}c^2_\alpha + d_{35}s^2_\alpha$ | $d_{12}c^2_\alpha + d_{13}s^2_\alpha$ | $d_{15}s_\alpha - d_{16}c_\alpha$ |
//!
//! Signs follow the source tensor data; nothing is normalised.

use nalgebra::Matrix3x6;
use phasematch_materials::{Crystal, NonlinearTensor, PointGroup};

use crate::error::PhaseMatchError;
use crate::geometry::{polarization, voigt_pair};
use crate::index::section_plane;
use crate::solver::angle::effective_sign_negative;
use crate::types::{
    Geometry, InteractionType, NonlinearCoefficientResult, PhaseMatchingSolution,
    PolarizationType, PrincipalPlane, WaveAssignment,
};

/// Wavelength at which the effective sign of a biaxial plane is taken when
/// mapping a polarization type without a solution (nm).
const SIGN_PROBE_NM: f64 = 1064.0;

/// Azimuth samples per turn in [`optimal_azimuth`].
const AZIMUTH_SAMPLES: usize = 7200;

/// Voigt index $l$ (0-based) to the pair of Cartesian indices it stands for.
const VOIGT_PAIRS: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (1, 2), (0, 2), (0, 1)];

/// Apply Kleinman permutation symmetry.
///
/// Components whose index triples are permutations of each other form one
/// class (e.g. $d_{31}$ and $d_{15}$, sharing $\{1,1,3\}$). Every
/// member of a class is set to the mean of the supplied non-zero members;
/// classes with no supplied member stay zero.
pub fn kleinman_fill(d: &[[f64; 6]; 3]) -> [[f64; 6]; 3] {
    let key = |i: usize, l: usize| {
        let (j, k) = VOIGT_PAIRS[l];
        let mut t = [i, j, k];
        t.sort_unstable();
        t
    };

    let mut filled = *d;
    for i in 0..3 {
        for l in 0..6 {
            let class = key(i, l);
            let (sum, count) = (0..3)
                .flat_map(|a| (0..6).map(move |b| (a, b)))
                .filter(|&(a, b)| key(a, b) == class && d[a][b] != 0.0)
                .fold((0.0, 0usize), |(s, n), (a, b)| (s + d[a][b], n + 1));
            if count > 0 {
                filled[i][l] = sum / count as f64;
            }
        }
    }
    filled
}

/// Tensor used for $d_{\text{eff}}$: Kleinman-filled if the record allows it.
pub fn effective_tensor(tensor: &NonlinearTensor) -> [[f64; 6]; 3] {
    if tensor.kleinman {
        kleinman_fill(&tensor.d)
    } else {
        tensor.d
    }
}

/// Full $3\times6$ matrix of a point group from its independent components,
/// with the symmetry-required relations filled in (e.g. $d_{21} = -d_{22}$
/// in 3m).
pub fn point_group_matrix(
    point_group: &PointGroup,
    d: &[[f64; 6]; 3],
) -> Option<Matrix3x6<f64>> {
    let g = |i: usize, l: usize| d[i - 1][l - 1];
    #[rustfmt::skip]
    let rows: [f64; 18] = match point_group {
        PointGroup::C3v => {
            let (d15, d22, d31, d33) = (g(1, 5), g(2, 2), g(3, 1), g(3, 3));
            [
                0.0, 0.0, 0.0, 0.0, d15, -d22,
                -d22, d22, 0.0, d15, 0.0, 0.0,
                d31, d31, d33, 0.0, 0.0, 0.0,
            ]
        }
        PointGroup::D3 => {
            let (d11, d14) = (g(1, 1), g(1, 4));
            [
                d11, -d11, 0.0, d14, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, -d14, -d11,
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            ]
        }
        PointGroup::D2d => {
            let (d14, d36) = (g(1, 4), g(3, 6));
            [
                0.0, 0.0, 0.0, d14, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, d14, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0, d36,
            ]
        }
        PointGroup::C4v | PointGroup::C6v => {
            let (d15, d31, d33) = (g(1, 5), g(3, 1), g(3, 3));
            [
                0.0, 0.0, 0.0, 0.0, d15, 0.0,
                0.0, 0.0, 0.0, d15, 0.0, 0.0,
                d31, d31, d33, 0.0, 0.0, 0.0,
            ]
        }
        PointGroup::D3h => {
            let d22 = g(2, 2);
            [
                0.0, 0.0, 0.0, 0.0, 0.0, -d22,
                -d22, d22, 0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            ]
        }
        // Two-fold axis along x, y or z: d_{p,jj} and d_{j,pj} survive.
        PointGroup::C2v => [
            g(1, 1), g(1, 2), g(1, 3), 0.0, g(1, 5), g(1, 6),
            g(2, 1), g(2, 2), g(2, 3), g(2, 4), 0.0, g(2, 6),
            g(3, 1), g(3, 2), g(3, 3), g(3, 4), g(3, 5), 0.0,
        ],
        PointGroup::Other(_) => return None,
    };
    Some(Matrix3x6::from_row_slice(&rows))
}

/// Direct contraction $\hat{e}_3 \cdot \mathbf{d} \cdot V(\hat{e}_1, \hat{e}_2)$.
pub fn contract(d: &Matrix3x6<f64>, geometry: &Geometry, assignment: WaveAssignment) -> f64 {
    let e1 = polarization(geometry, assignment.input1);
    let e2 = polarization(geometry, assignment.input2);
    let e3 = polarization(geometry, assignment.output);
    e3.dot(&(d * voigt_pair(&e1, &e2)))
}

/// The four distinct mixed-polarization couplings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coupling {
    /// $o + o \to e$
    Ooe,
    /// $o + e \to e$
    Oee,
    /// $e + e \to o$
    Eeo,
    /// $o + e \to o$
    Oeo,
}

impl Coupling {
    fn of(a: WaveAssignment) -> Option<Self> {
        use crate::types::Polarization::{Extraordinary as E, Ordinary as O};
        match (a.input1, a.input2, a.output) {
            (O, O, E) => Some(Coupling::Ooe),
            (O, E, E) | (E, O, E) => Some(Coupling::Oee),
            (E, E, O) => Some(Coupling::Eeo),
            (O, E, O) | (E, O, O) => Some(Coupling::Oeo),
            _ => None,
        }
    }
}

fn class_3m(d: &[[f64; 6]; 3], t: f64, p: f64, c: Coupling) -> f64 {
    let (d15, d22, d31) = (d[0][4], d[1][1], d[2][0]);
    match c {
        Coupling::Ooe => d31 * t.sin() - d22 * t.cos() * (3.0 * p).sin(),
        Coupling::Oee | Coupling::Eeo => d22 * t.cos().powi(2) * (3.0 * p).cos(),
        Coupling::Oeo => d15 * t.sin() - d22 * t.cos() * (3.0 * p).sin(),
    }
}

fn class_32(d: &[[f64; 6]; 3], t: f64, p: f64, c: Coupling) -> f64 {
    let (d11, d14) = (d[0][0], d[0][3]);
    match c {
        Coupling::Ooe | Coupling::Oeo => d11 * t.cos() * (3.0 * p).cos(),
        Coupling::Oee => {
            d11 * t.cos().powi(2) * (3.0 * p).sin() + 0.5 * d14 * (2.0 * t).sin()
        }
        Coupling::Eeo => d11 * t.cos().powi(2) * (3.0 * p).sin() - d14 * (2.0 * t).sin(),
    }
}

fn class_42m(d: &[[f64; 6]; 3], t: f64, p: f64, c: Coupling) -> f64 {
    let (d14, d36) = (d[0][3], d[2][5]);
    match c {
        Coupling::Ooe => -d36 * t.sin() * (2.0 * p).sin(),
        Coupling::Oee => 0.5 * (d14 + d36) * (2.0 * t).sin() * (2.0 * p).cos(),
        Coupling::Eeo => d14 * (2.0 * t).sin() * (2.0 * p).cos(),
        Coupling::Oeo => -d14 * t.sin() * (2.0 * p).sin(),
    }
}

fn class_4mm(d: &[[f64; 6]; 3], t: f64, c: Coupling) -> f64 {
    let (d15, d31) = (d[0][4], d[2][0]);
    match c {
        Coupling::Ooe => d31 * t.sin(),
        Coupling::Oee | Coupling::Eeo => 0.0,
        Coupling::Oeo => d15 * t.sin(),
    }
}

fn class_6m2(d: &[[f64; 6]; 3], t: f64, p: f64, c: Coupling) -> f64 {
    let d22 = d[1][1];
    match c {
        Coupling::Ooe | Coupling::Oeo => -d22 * t.cos() * (3.0 * p).sin(),
        Coupling::Oee | Coupling::Eeo => d22 * t.cos().powi(2) * (3.0 * p).cos(),
    }
}

fn class_mm2(d: &[[f64; 6]; 3], plane: PrincipalPlane, a: f64, c: Coupling) -> f64 {
    let g = |i: usize, l: usize| d[i - 1][l - 1];
    let (s, co) = a.sin_cos();
    let (s2, c2) = (s * s, co * co);
    match (plane, c) {
        (PrincipalPlane::XY, Coupling::Ooe) => g(1, 3) * s - g(2, 3) * co,
        (PrincipalPlane::XY, Coupling::Oee) => g(1, 5) * s2 + g(2, 4) * c2,
        (PrincipalPlane::XY, Coupling::Eeo) => g(3, 1) * s2 + g(3, 2) * c2,
        (PrincipalPlane::XY, Coupling::Oeo) => g(3, 5) * s - g(3, 4) * co,
        (PrincipalPlane::XZ, Coupling::Ooe) => g(3, 2) * s - g(1, 2) * co,
        (PrincipalPlane::XZ, Coupling::Oee) => -(g(1, 6) * c2 + g(3, 4) * s2),
        (PrincipalPlane::XZ, Coupling::Eeo) => -(g(2, 1) * c2 + g(2, 3) * s2),
        (PrincipalPlane::XZ, Coupling::Oeo) => g(2, 4) * s - g(2, 6) * co,
        (PrincipalPlane::YZ, Coupling::Ooe) => g(3, 1) * s - g(2, 1) * co,
        (PrincipalPlane::YZ, Coupling::Oee) => g(2, 6) * c2 + g(3, 5) * s2,
        (PrincipalPlane::YZ, Coupling::Eeo) => g(1, 2) * c2 + g(1, 3) * s2,
        (PrincipalPlane::YZ, Coupling::Oeo) => g(1, 5) * s - g(1, 6) * co,
    }
}

/// Closed-form $d_{\text{eff}}$ for a point group.
///
/// Returns `Ok(None)` if the point group has no formula. mm2 needs a
/// principal-plane geometry.
pub fn closed_form(
    point_group: &PointGroup,
    d: &[[f64; 6]; 3],
    geometry: &Geometry,
    assignment: WaveAssignment,
) -> Result<Option<f64>, PhaseMatchError> {
    let coupling = Coupling::of(assignment).ok_or_else(|| {
        PhaseMatchError::InvalidRequest(format!(
            "assignment {assignment} has no birefringent phase match"
        ))
    })?;
    let (t, p) = (geometry.theta, geometry.phi);
    let value = match point_group {
        PointGroup::C3v => class_3m(d, t, p, coupling),
        PointGroup::D3 => class_32(d, t, p, coupling),
        PointGroup::D2d => class_42m(d, t, p, coupling),
        PointGroup::C4v | PointGroup::C6v => class_4mm(d, t, coupling),
        PointGroup::D3h => class_6m2(d, t, p, coupling),
        PointGroup::C2v => {
            let Some(plane) = geometry.principal_plane() else {
                return Err(PhaseMatchError::OffPrincipalPlane {
                    crystal: String::new(),
                    theta_deg: geometry.theta_deg(),
                    phi_deg: geometry.phi_deg(),
                });
            };
            class_mm2(d, plane, geometry.tuning_angle(plane), coupling)
        }
        PointGroup::Other(_) => return Ok(None),
    };
    Ok(Some(value))
}

/// $d_{\text{eff}}$ for an explicit wave assignment.
///
/// # Errors
/// - [`PhaseMatchError::UnsupportedSymmetryClass`] if the point group has no formula.
/// - [`PhaseMatchError::OffPrincipalPlane`] for a biaxial direction off the planes.
pub fn compute_d_eff_for_assignment(
    crystal: &Crystal,
    geometry: &Geometry,
    interaction: InteractionType,
    assignment: WaveAssignment,
) -> Result<NonlinearCoefficientResult, PhaseMatchError> {
    if !(geometry.theta.is_finite() && geometry.phi.is_finite()) {
        return Err(PhaseMatchError::InvalidRequest(format!(
            "direction must be finite, got θ = {}, φ = {}",
            geometry.theta, geometry.phi
        )));
    }
    // Uniaxial polarizations do not depend on a plane tag.
    let plane = if crystal.optical_class.is_uniaxial() {
        None
    } else {
        Some(section_plane(crystal, geometry)?)
    };
    let geometry = Geometry { plane, ..*geometry };

    let d = effective_tensor(&crystal.nonlinear);
    let value = closed_form(&crystal.point_group, &d, &geometry, assignment)
        .map_err(|e| match e {
            PhaseMatchError::OffPrincipalPlane { theta_deg, phi_deg, .. } => {
                PhaseMatchError::OffPrincipalPlane {
                    crystal: crystal.name.clone(),
                    theta_deg,
                    phi_deg,
                }
            }
            e => e,
        })?
        .ok_or_else(|| PhaseMatchError::UnsupportedSymmetryClass {
            crystal: crystal.name.clone(),
            point_group: crystal.point_group.symbol().to_string(),
        })?;
    log::trace!(
        "{}: d_eff({assignment}) = {value:.4} pm/V at θ = {:.4}°, φ = {:.4}°",
        crystal.name,
        geometry.theta_deg(),
        geometry.phi_deg()
    );

    Ok(NonlinearCoefficientResult {
        d_eff: value,
        point_group: crystal.point_group.clone(),
        geometry,
        interaction,
        assignment,
    })
}

/// $d_{\text{eff}}$ for a polarization type at a geometry.
///
/// The wave assignment follows the crystal's optical sign; for a biaxial
/// plane the effective sign is taken at 1064 nm (clamped to the data range)
/// and the reference temperature.
pub fn compute_d_eff(
    crystal: &Crystal,
    geometry: &Geometry,
    interaction: InteractionType,
    polarization: PolarizationType,
) -> Result<NonlinearCoefficientResult, PhaseMatchError> {
    let plane = section_plane(crystal, geometry)?;
    let probe = match crystal.wavelength_range_nm {
        Some((min, max)) => SIGN_PROBE_NM.clamp(min, max),
        None => SIGN_PROBE_NM,
    };
    let negative =
        effective_sign_negative(crystal, plane, probe, crystal.reference_temperature)?;
    compute_d_eff_for_assignment(crystal, geometry, interaction, polarization.assignment(negative))
}

/// $d_{\text{eff}}$ at a solved condition, using the solution's own
/// assignment.
pub fn d_eff_for_solution(
    crystal: &Crystal,
    solution: &PhaseMatchingSolution,
) -> Result<NonlinearCoefficientResult, PhaseMatchError> {
    compute_d_eff_for_assignment(
        crystal,
        solution.geometry(),
        solution.interaction,
        solution.assignment,
    )
}

/// Azimuth in $[0, 2\pi)$ maximising $|d_{\text{eff}}|$ at a fixed $\theta$
/// of a uniaxial crystal, sampled every 0.05°.
pub fn optimal_azimuth(
    crystal: &Crystal,
    theta: f64,
    interaction: InteractionType,
    assignment: WaveAssignment,
) -> Result<NonlinearCoefficientResult, PhaseMatchError> {
    if !crystal.optical_class.is_uniaxial() {
        return Err(PhaseMatchError::InvalidRequest(format!(
            "{} is biaxial; the azimuth is fixed by the principal plane",
            crystal.name
        )));
    }
    let mut best: Option<NonlinearCoefficientResult> = None;
    for k in 0..AZIMUTH_SAMPLES {
        let phi = std::f64::consts::TAU * k as f64 / AZIMUTH_SAMPLES as f64;
        let r = compute_d_eff_for_assignment(
            crystal,
            &Geometry::new(theta, phi),
            interaction,
            assignment,
        )?;
        // Symmetry-equivalent maxima keep the smallest azimuth.
        if best
            .as_ref()
            .map_or(true, |b| r.d_eff.abs() > b.d_eff.abs() * (1.0 + 1e-12))
        {
            best = Some(r);
        }
    }
    best.ok_or_else(|| PhaseMatchError::InvalidRequest("no azimuth sampled".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_kleinman_fill_averages_class() {
        let mut d = [[0.0; 6]; 3];
        d[2][0] = 0.04; // d31
        d[0][4] = 0.06; // d15
        let f = kleinman_fill(&d);
        assert_abs_diff_eq!(f[2][0], 0.05, epsilon = 1e-15);
        assert_abs_diff_eq!(f[0][4], 0.05, epsilon = 1e-15);
        // d24 and d32 share {2,2,3}, unsupplied
        assert_eq!(f[1][3], 0.0);
        assert_eq!(f[2][1], 0.0);
    }

    #[test]
    fn test_kleinman_fill_kdp_class() {
        let mut d = [[0.0; 6]; 3];
        d[2][5] = 0.39; // d36
        let f = kleinman_fill(&d);
        assert_eq!(f[0][3], 0.39); // d14
        assert_eq!(f[1][4], 0.39); // d25
    }

    #[test]
    fn test_uniform_assignment_rejected() {
        let d = [[0.0; 6]; 3];
        let a = WaveAssignment::parse("ooo").unwrap();
        let r = closed_form(&PointGroup::C3v, &d, &Geometry::new(0.3, 0.0), a);
        assert!(matches!(r, Err(PhaseMatchError::InvalidRequest(_))));
    }

    #[test]
    fn test_unknown_group_has_no_formula() {
        let d = [[0.0; 6]; 3];
        let r = closed_form(
            &PointGroup::Other("23".into()),
            &d,
            &Geometry::new(0.3, 0.0),
            WaveAssignment::OOE,
        );
        assert_eq!(r, Ok(None));
        assert!(point_group_matrix(&PointGroup::Other("23".into()), &d).is_none());
    }
}
