//! Refractive index model.
//!
//! Principal indices come from the crystal's Sellmeier and thermal data
//! (see [`phasematch_materials::IndexProvider`]). Direction-dependent
//! indices follow from the index ellipsoid.
//!
//! ## Uniaxial
//!
//! $$
//! \frac{1}{n_e(\theta)^2} = \frac{\cos^2\theta}{n_o^2} + \frac{\sin^2\theta}{n_z^2}
//! $$
//!
//! so $n_e(0) = n_o$ and $n_e(90°) = n_z$. The azimuth does not enter.
//!
//! ## Biaxial
//!
//! Inside a principal plane the section of the ellipsoid is an ellipse for
//! the in-plane wave and a circle for the wave polarised along the static
//! axis, so the uniaxial relation carries over with the plane's axes (see
//! [`PrincipalPlane::ellipse_axes`]). Off the principal planes the two
//! eigen-indices solve the Fresnel quadratic in $x = 1/n^2$:
//!
//! $$
//! x^2 - x\sum_i k_i^2 (b_j + b_k) + \sum_i k_i^2 b_j b_k = 0,
//! \qquad b_i = 1/n_i^2
//! $$
//!
//! with $(i, j, k)$ running over cyclic permutations of $(x, y, z)$. This
//! branch gives a two-dimensional root problem; see
//! [`solve_phase_matching_locus`](crate::solver::angle::solve_phase_matching_locus).

use phasematch_materials::{Crystal, IndexProvider, PrincipalIndices};
use serde::{Deserialize, Serialize};

use crate::error::PhaseMatchError;
use crate::geometry::propagation;
use crate::types::{Geometry, Polarization, PrincipalPlane};

/// Indices of the two eigen-polarizations at one direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexPair {
    /// Ordinary (static-axis) wave.
    pub n_o: f64,
    /// Extraordinary (in-plane) wave.
    pub n_e: f64,
}

impl IndexPair {
    pub fn get(&self, pol: Polarization) -> f64 {
        match pol {
            Polarization::Ordinary => self.n_o,
            Polarization::Extraordinary => self.n_e,
        }
    }
}

/// Principal indices with material errors mapped to [`PhaseMatchError::Domain`].
pub fn principal_indices(
    crystal: &Crystal,
    wavelength_nm: f64,
    temperature_c: f64,
) -> Result<PrincipalIndices, PhaseMatchError> {
    crystal
        .principal_indices(wavelength_nm, temperature_c)
        .map_err(|e| PhaseMatchError::domain(&crystal.name, e))
}

/// $\left(\cos^2\alpha/n_a^2 + \sin^2\alpha/n_b^2\right)^{-1/2}$.
pub fn ellipse_index(n_a: f64, n_b: f64, alpha: f64) -> f64 {
    let (s, c) = alpha.sin_cos();
    1.0 / (c * c / (n_a * n_a) + s * s / (n_b * n_b)).sqrt()
}

/// The principal plane used for ordinary/extraordinary labels.
///
/// Uniaxial crystals always use the XZ convention, for which the labels
/// hold at any azimuth.
pub(crate) fn section_plane(
    crystal: &Crystal,
    geometry: &Geometry,
) -> Result<PrincipalPlane, PhaseMatchError> {
    if crystal.optical_class.is_uniaxial() {
        return Ok(PrincipalPlane::XZ);
    }
    geometry
        .principal_plane()
        .ok_or_else(|| PhaseMatchError::OffPrincipalPlane {
            crystal: crystal.name.clone(),
            theta_deg: geometry.theta_deg(),
            phi_deg: geometry.phi_deg(),
        })
}

/// Ordinary and extraordinary indices for already-evaluated principal indices.
pub(crate) fn section_indices(
    crystal: &Crystal,
    n: &PrincipalIndices,
    geometry: &Geometry,
) -> Result<IndexPair, PhaseMatchError> {
    if crystal.optical_class.is_uniaxial() {
        return Ok(IndexPair {
            n_o: n.nx,
            n_e: ellipse_index(n.nx, n.nz, geometry.theta),
        });
    }
    let plane = section_plane(crystal, geometry)?;
    let (a, b) = plane.ellipse_axes();
    Ok(IndexPair {
        n_o: n.along(plane.static_axis()),
        n_e: ellipse_index(n.along(a), n.along(b), geometry.tuning_angle(plane)),
    })
}

/// Ordinary and extraordinary indices at a wavelength (nm) and temperature
/// (°C).
///
/// Without a geometry the extraordinary index is the principal one
/// ($\theta = 90°$); biaxial crystals need a principal-plane geometry.
///
/// # Errors
/// - [`PhaseMatchError::Domain`] for a pole, negative $n^2$ or a wavelength
///   outside the data range.
/// - [`PhaseMatchError::OffPrincipalPlane`] for a biaxial direction outside
///   the principal planes.
pub fn evaluate_index(
    crystal: &Crystal,
    wavelength_nm: f64,
    temperature_c: f64,
    geometry: Option<&Geometry>,
) -> Result<IndexPair, PhaseMatchError> {
    let n = principal_indices(crystal, wavelength_nm, temperature_c)?;
    match geometry {
        Some(g) => section_indices(crystal, &n, g),
        None if crystal.optical_class.is_uniaxial() => Ok(IndexPair { n_o: n.nx, n_e: n.nz }),
        None => Err(PhaseMatchError::InvalidRequest(format!(
            "{} is biaxial; a principal-plane direction is required",
            crystal.name
        ))),
    }
}

/// Slow and fast eigen-indices $(n_{\text{slow}}, n_{\text{fast}})$ along any
/// direction.
pub fn eigen_indices(n: &PrincipalIndices, geometry: &Geometry) -> (f64, f64) {
    let k = propagation(geometry);
    let (kx2, ky2, kz2) = (k.x * k.x, k.y * k.y, k.z * k.z);
    let (bx, by, bz) = (n.nx.powi(-2), n.ny.powi(-2), n.nz.powi(-2));

    let sum = kx2 * (by + bz) + ky2 * (bx + bz) + kz2 * (bx + by);
    let product = kx2 * by * bz + ky2 * bx * bz + kz2 * bx * by;
    let disc = (sum * sum - 4.0 * product).max(0.0);

    let x_large = 0.5 * (sum + disc.sqrt());
    let x_small = product / x_large;
    (1.0 / x_small.sqrt(), 1.0 / x_large.sqrt())
}

/// Poynting-vector walk-off angle (rad) of one wave.
///
/// $$
/// \tan\rho = \tfrac{1}{2}\, n(\alpha)^2 \left(\frac{1}{n_b^2} - \frac{1}{n_a^2}\right)\sin 2\alpha
/// $$
///
/// The ordinary (static-axis) wave does not walk off.
pub fn walk_off_angle(
    crystal: &Crystal,
    wavelength_nm: f64,
    temperature_c: f64,
    geometry: &Geometry,
    pol: Polarization,
) -> Result<f64, PhaseMatchError> {
    if pol == Polarization::Ordinary {
        return Ok(0.0);
    }
    let n = principal_indices(crystal, wavelength_nm, temperature_c)?;
    let plane = section_plane(crystal, geometry)?;
    let (n_a, n_b, alpha) = if crystal.optical_class.is_uniaxial() {
        (n.nx, n.nz, geometry.theta)
    } else {
        let (a, b) = plane.ellipse_axes();
        (n.along(a), n.along(b), geometry.tuning_angle(plane))
    };
    let n_alpha = ellipse_index(n_a, n_b, alpha);
    let tan_rho = 0.5 * n_alpha * n_alpha * (n_b.powi(-2) - n_a.powi(-2)) * (2.0 * alpha).sin();
    Ok(tan_rho.atan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use phasematch_materials::Catalog;

    #[test]
    fn test_ellipse_endpoints() {
        assert_relative_eq!(ellipse_index(1.6, 1.5, 0.0), 1.6, epsilon = 1e-14);
        assert_relative_eq!(
            ellipse_index(1.6, 1.5, std::f64::consts::FRAC_PI_2),
            1.5,
            epsilon = 1e-14
        );
    }

    #[test]
    fn test_eigen_indices_reduce_to_plane_values() {
        let catalog = Catalog::builtin().unwrap();
        let lbo = catalog.crystal("LBO", None).unwrap();
        let n = lbo.principal_indices(1064.0, 20.0).unwrap();
        let g = PrincipalPlane::XY.geometry(0.4);
        let (slow, fast) = eigen_indices(&n, &g);
        let pair = section_indices(lbo, &n, &g).unwrap();
        // In XY the static z wave is slowest.
        assert_relative_eq!(slow, pair.n_o, epsilon = 1e-12);
        assert_relative_eq!(fast, pair.n_e, epsilon = 1e-12);
    }

    #[test]
    fn test_biaxial_needs_plane() {
        let catalog = Catalog::builtin().unwrap();
        let ktp = catalog.crystal("KTP", None).unwrap();
        let g = Geometry::from_degrees(50.0, 30.0);
        let err = evaluate_index(ktp, 1064.0, 20.0, Some(&g)).unwrap_err();
        assert!(matches!(err, PhaseMatchError::OffPrincipalPlane { .. }));
        assert!(evaluate_index(ktp, 1064.0, 20.0, None).is_err());
    }

    #[test]
    fn test_ordinary_wave_has_no_walk_off() {
        let catalog = Catalog::builtin().unwrap();
        let bbo = catalog.crystal("BBO", None).unwrap();
        let g = Geometry::from_degrees(30.0, 0.0);
        let rho = walk_off_angle(bbo, 1064.0, 20.0, &g, Polarization::Ordinary).unwrap();
        assert_eq!(rho, 0.0);
    }
}
