//! Propagation and polarization unit vectors.
//!
//! With $\theta$ measured from $z$ and $\phi$ from $x$:
//!
//! $$
//! \hat{k} = (\sin\theta\cos\phi,\ \sin\theta\sin\phi,\ \cos\theta)
//! $$
//! $$
//! \hat{o} = (\sin\phi,\ -\cos\phi,\ 0), \qquad
//! \hat{e} = (-\cos\theta\cos\phi,\ -\cos\theta\sin\phi,\ \sin\theta)
//! $$
//!
//! $\hat{o}$ is normal to the plane containing $z$ and $\hat{k}$; $\hat{e}$
//! lies in it. In the XZ and YZ principal planes of a biaxial crystal these
//! coincide with the static and in-plane waves. In the XY plane the static
//! wave is polarised along $z$, i.e. the roles are swapped.

use nalgebra::{Vector3, Vector6};

use crate::types::{Geometry, Polarization, PrincipalPlane};

/// Unit propagation vector.
pub fn propagation(geometry: &Geometry) -> Vector3<f64> {
    let (st, ct) = geometry.theta.sin_cos();
    let (sp, cp) = geometry.phi.sin_cos();
    Vector3::new(st * cp, st * sp, ct)
}

/// Polarization unit vector of a wave with the given label.
pub fn polarization(geometry: &Geometry, pol: Polarization) -> Vector3<f64> {
    let (st, ct) = geometry.theta.sin_cos();
    let (sp, cp) = geometry.phi.sin_cos();
    let ordinary = Vector3::new(sp, -cp, 0.0);
    let extraordinary = Vector3::new(-ct * cp, -ct * sp, st);

    let swapped = geometry.plane == Some(PrincipalPlane::XY);
    match (pol, swapped) {
        (Polarization::Ordinary, false) | (Polarization::Extraordinary, true) => ordinary,
        (Polarization::Extraordinary, false) | (Polarization::Ordinary, true) => extraordinary,
    }
}

/// Symmetric Voigt pair vector of two fields:
/// $(a_xb_x,\ a_yb_y,\ a_zb_z,\ a_yb_z + a_zb_y,\ a_xb_z + a_zb_x,\ a_xb_y + a_yb_x)$.
pub fn voigt_pair(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector6<f64> {
    Vector6::new(
        a.x * b.x,
        a.y * b.y,
        a.z * b.z,
        a.y * b.z + a.z * b.y,
        a.x * b.z + a.z * b.x,
        a.x * b.y + a.y * b.x,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_triad_is_orthonormal() {
        let g = Geometry::from_degrees(33.0, 71.0);
        let k = propagation(&g);
        let o = polarization(&g, Polarization::Ordinary);
        let e = polarization(&g, Polarization::Extraordinary);
        assert_abs_diff_eq!(k.norm(), 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(o.norm(), 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(e.norm(), 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(k.dot(&o), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(k.dot(&e), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(o.dot(&e), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_static_wave_in_principal_planes() {
        let xy = PrincipalPlane::XY.geometry(0.3);
        assert_abs_diff_eq!(polarization(&xy, Polarization::Ordinary), Vector3::z(), epsilon = 1e-14);
        let xz = PrincipalPlane::XZ.geometry(0.3);
        assert_abs_diff_eq!(
            polarization(&xz, Polarization::Ordinary),
            -Vector3::y(),
            epsilon = 1e-14
        );
        let yz = PrincipalPlane::YZ.geometry(0.3);
        assert_abs_diff_eq!(polarization(&yz, Polarization::Ordinary), Vector3::x(), epsilon = 1e-14);
    }
}
