//! Integration tests for the angle and temperature solvers.
//!
//! ## Angle tuning
//! - BBO Type I / Type II SHG of 1064 nm against published angles
//! - SFG 1064 + 532 nm, explicit assignments, per-mode tables
//! - Energy-conservation check, no-match and repeatability
//! - LBO principal-plane (φ) tuning and the off-plane phase-matching locus
//!
//! ## Temperature tuning
//! - BBO at a fixed cut: recovers the cut temperature, tunes with λ₁
//! - LBO non-critical Type I along x
//! - Crystals without thermo-optic data

use approx::{assert_abs_diff_eq, assert_relative_eq};

use phasematch_core::error::PhaseMatchError;
use phasematch_core::index::evaluate_index;
use phasematch_core::solver::angle::{
    solve_all_modes, solve_all_roots, solve_assignment, solve_phase_matching,
    solve_phase_matching_locus,
};
use phasematch_core::solver::mismatch::{EigenMismatch, Mismatch};
use phasematch_core::solver::temperature::solve_temperature_matching;
use phasematch_core::types::{
    Condition, Geometry, InteractionType, PolarizationType, PrincipalPlane, PropagationAxis,
    SolverConfig, TunedParameter, WaveAssignment, WavelengthTriplet,
};
use phasematch_materials::{Catalog, Crystal};

// ─────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────

fn crystal(name: &str, source: Option<&str>) -> Crystal {
    Catalog::builtin()
        .unwrap()
        .crystal(name, source)
        .unwrap()
        .clone()
}

fn config() -> SolverConfig {
    SolverConfig::default()
}

// ─────────────────────────────────────────────────────────────
// Angle tuning
// ─────────────────────────────────────────────────────────────

#[test]
fn test_bbo_type_i_shg_1064() {
    let bbo = crystal("BBO", None);
    let sol = solve_phase_matching(
        &bbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        20.0,
        &config(),
    )
    .unwrap();

    assert_abs_diff_eq!(sol.theta_deg(), 22.83, epsilon = 0.1);
    assert_eq!(sol.assignment, WaveAssignment::OOE);
    assert_eq!(sol.tuned, TunedParameter::Theta);
    assert_eq!(sol.phi_deg(), 0.0);
    assert_eq!(sol.source, "default");

    let mismatch = Mismatch::new(&bbo, sol.wavelengths, sol.assignment);
    let dn = mismatch.delta_n(&sol.condition).unwrap();
    assert!(dn.abs() < 1e-6, "residual Δn = {dn:e}");
    assert_relative_eq!(sol.convergence.residual, dn.abs(), epsilon = 1e-15);
}

#[test]
fn test_bbo_type_ii_shg_1064() {
    let bbo = crystal("BBO", None);
    let sol = solve_phase_matching(
        &bbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeII,
        20.0,
        &config(),
    )
    .unwrap();
    assert_abs_diff_eq!(sol.theta_deg(), 32.44, epsilon = 0.1);
    assert_eq!(sol.assignment, WaveAssignment::OEE);
}

#[test]
fn test_bbo_sfg_1064_532() {
    let bbo = crystal("BBO", None);
    let w = WavelengthTriplet::sfg(1064.0, 532.0);
    let sol = solve_phase_matching(
        &bbo,
        w,
        InteractionType::Sfg,
        PolarizationType::TypeI,
        20.0,
        &config(),
    )
    .unwrap();
    assert_abs_diff_eq!(sol.theta_deg(), 31.28, epsilon = 0.1);
    assert_relative_eq!(sol.wavelengths.lambda3, 354.6667, epsilon = 1e-3);
}

#[test]
fn test_malformed_triplet_is_rejected_before_solving() {
    let bbo = crystal("BBO", None);
    let err = solve_phase_matching(
        &bbo,
        WavelengthTriplet::new(1064.0, 1064.0, 500.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        20.0,
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, PhaseMatchError::MalformedWavelengthTriplet { .. }), "got {err:?}");
}

#[test]
fn test_short_fundamental_has_no_match() {
    let bbo = crystal("BBO", None);
    let err = solve_phase_matching(
        &bbo,
        WavelengthTriplet::shg(400.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        20.0,
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, PhaseMatchError::NoPhaseMatchFound { .. }), "got {err:?}");
}

#[test]
fn test_out_of_range_wavelength_is_domain_error() {
    let bbo = crystal("BBO", None);
    let err = solve_phase_matching(
        &bbo,
        WavelengthTriplet::shg(5000.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        20.0,
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, PhaseMatchError::Domain { .. }), "got {err:?}");
}

#[test]
fn test_solve_is_repeatable() {
    let bbo = crystal("BBO", None);
    let solve = || {
        solve_phase_matching(
            &bbo,
            WavelengthTriplet::shg(800.0),
            InteractionType::Shg,
            PolarizationType::TypeI,
            20.0,
            &config(),
        )
        .unwrap()
    };
    assert_eq!(solve(), solve());
}

#[test]
fn test_extraordinary_index_at_optic_axis() {
    let bbo = crystal("BBO", None);
    let axis = evaluate_index(&bbo, 1064.0, 20.0, Some(&Geometry::new(0.0, 0.0))).unwrap();
    assert_relative_eq!(axis.n_e, axis.n_o, epsilon = 1e-12);

    let bare = evaluate_index(&bbo, 1064.0, 20.0, None).unwrap();
    assert_relative_eq!(bare.n_o, 1.65436, epsilon = 1e-4);
    assert_relative_eq!(bare.n_e, 1.54208, epsilon = 1e-4);
}

#[test]
fn test_explicit_assignment_matches_type() {
    let bbo = crystal("BBO", None);
    let w = WavelengthTriplet::shg(1064.0);
    let by_type = solve_phase_matching(
        &bbo,
        w,
        InteractionType::Shg,
        PolarizationType::TypeI,
        20.0,
        &config(),
    )
    .unwrap();
    let by_assignment = solve_assignment(
        &bbo,
        w,
        InteractionType::Shg,
        WaveAssignment::OOE,
        None,
        20.0,
        &config(),
    )
    .unwrap();
    assert_eq!(by_type, by_assignment);

    let uniform = WaveAssignment::parse("eee").unwrap();
    let err = solve_assignment(&bbo, w, InteractionType::Shg, uniform, None, 20.0, &config())
        .unwrap_err();
    assert!(matches!(err, PhaseMatchError::InvalidRequest(_)), "got {err:?}");
}

#[test]
fn test_mode_table_for_negative_uniaxial() {
    let bbo = crystal("BBO", None);
    let table = solve_all_modes(
        &bbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        20.0,
        &config(),
    )
    .unwrap();
    assert_eq!(table.len(), 4);

    for outcome in &table {
        let matched = outcome.result.is_ok();
        match outcome.assignment.label().as_str() {
            "ooe" | "oee" => assert!(matched, "{} should match", outcome.assignment),
            _ => assert!(!matched, "{} should not match", outcome.assignment),
        }
    }
    let ooe = table.iter().find(|o| o.assignment == WaveAssignment::OOE).unwrap();
    assert_eq!(ooe.polarization, Some(PolarizationType::TypeI));
}

#[test]
fn test_all_roots_are_ascending() {
    let bbo = crystal("BBO", None);
    let roots = solve_all_roots(
        &bbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        20.0,
        &config(),
    )
    .unwrap();
    assert!(!roots.is_empty());
    assert!(roots.windows(2).all(|w| w[0].condition.geometry.theta < w[1].condition.geometry.theta));
}

#[test]
fn test_lbo_type_i_in_xy_plane() {
    let lbo = crystal("LBO", None);
    let sol = solve_phase_matching(
        &lbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        20.0,
        &config(),
    )
    .unwrap();
    assert_eq!(sol.geometry().plane, Some(PrincipalPlane::XY));
    assert_eq!(sol.tuned, TunedParameter::Phi);
    assert_abs_diff_eq!(sol.theta_deg(), 90.0, epsilon = 1e-12);
    assert_abs_diff_eq!(sol.phi_deg(), 11.6, epsilon = 0.3);
}

#[test]
fn test_biaxial_primary_follows_plane_order() {
    let rank = |p: Option<PrincipalPlane>| {
        PrincipalPlane::ALL.iter().position(|q| Some(*q) == p).unwrap()
    };
    let lbo = crystal("LBO", None);
    let w = WavelengthTriplet::shg(1064.0);
    let all =
        solve_all_roots(&lbo, w, InteractionType::Shg, PolarizationType::TypeI, 20.0, &config())
            .unwrap();
    let primary =
        solve_phase_matching(&lbo, w, InteractionType::Shg, PolarizationType::TypeI, 20.0, &config())
            .unwrap();
    assert_eq!(primary, all[0]);
    for pair in all.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let (ra, rb) = (rank(a.geometry().plane), rank(b.geometry().plane));
        assert!(ra <= rb, "planes out of order: {:?}", all);
        if ra == rb {
            assert!(a.tuned_value() <= b.tuned_value(), "roots not ascending: {:?}", all);
        }
    }
}

#[test]
fn test_lbo_locus_crosses_xy_plane() {
    let lbo = crystal("LBO", None);
    let w = WavelengthTriplet::shg(1064.0);
    let locus = solve_phase_matching_locus(
        &lbo,
        w,
        InteractionType::Shg,
        PolarizationType::TypeI,
        20.0,
        10,
        &config(),
    )
    .unwrap();
    assert_eq!(locus.mismatch.dim(), (10, locus.theta.len()));
    assert!(!locus.points.is_empty());

    let eigen = EigenMismatch { crystal: &lbo, wavelengths: w, polarization: PolarizationType::TypeI };
    for p in &locus.points {
        let dn = eigen
            .delta_n(&Condition { geometry: p.geometry, temperature: 20.0 })
            .unwrap();
        assert!(dn.abs() < 1e-6, "Δn = {dn:e} at {:?}", p.geometry);
        assert!((0.0..=std::f64::consts::FRAC_PI_2).contains(&p.geometry.theta));
    }
}

// ─────────────────────────────────────────────────────────────
// Temperature tuning
// ─────────────────────────────────────────────────────────────

fn bbo_cut_at_25c(bbo: &Crystal) -> Geometry {
    *solve_phase_matching(
        bbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        25.0,
        &config(),
    )
    .unwrap()
    .geometry()
}

#[test]
fn test_temperature_recovers_cut_temperature() {
    let bbo = crystal("BBO", None);
    let cut = bbo_cut_at_25c(&bbo);
    assert_abs_diff_eq!(cut.theta.to_degrees(), 22.837, epsilon = 0.1);

    let sol = solve_temperature_matching(
        &bbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        &cut,
        &config(),
    )
    .unwrap();
    assert_eq!(sol.tuned, TunedParameter::Temperature);
    assert_abs_diff_eq!(sol.temperature(), 25.0, epsilon = 1e-3);
}

#[test]
fn test_temperature_tracks_fundamental() {
    let bbo = crystal("BBO", None);
    let cut = bbo_cut_at_25c(&bbo);
    let w = WavelengthTriplet::shg(1065.0);
    let sol = solve_temperature_matching(
        &bbo,
        w,
        InteractionType::Shg,
        PolarizationType::TypeI,
        &cut,
        &config(),
    )
    .unwrap();
    assert_abs_diff_eq!(sol.temperature(), 43.35, epsilon = 0.5);

    let dk = Mismatch::new(&bbo, w, sol.assignment)
        .delta_k(&sol.condition)
        .unwrap();
    assert!(dk.abs() < 1e-2, "Δk = {dk:e} rad/mm");
}

#[test]
fn test_lbo_noncritical_type_i() {
    let lbo = crystal("LBO", Some("Thorlabs"));
    let sol = solve_temperature_matching(
        &lbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        &PropagationAxis::X.geometry(),
        &config(),
    )
    .unwrap();
    assert_abs_diff_eq!(sol.temperature(), 149.15, epsilon = 0.5);
    assert_eq!(sol.assignment, WaveAssignment::OOE);
    assert_eq!(sol.geometry().plane, Some(PrincipalPlane::XY));
}

#[test]
fn test_temperature_needs_thermal_data() {
    let kdp = crystal("KDP", None);
    let err = solve_temperature_matching(
        &kdp,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        &Geometry::from_degrees(41.0, 45.0),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, PhaseMatchError::ThermalModelUnavailable { .. }), "got {err:?}");
}

#[test]
fn test_biaxial_off_plane_temperature_request() {
    let ktp = crystal("KTP", None);
    let err = solve_temperature_matching(
        &ktp,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeII,
        &Geometry::from_degrees(60.0, 30.0),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, PhaseMatchError::OffPrincipalPlane { .. }), "got {err:?}");
}

#[test]
fn test_z_axis_temperature_request_is_in_plane() {
    // z lies in XZ and YZ whatever the azimuth
    let lbo = crystal("LBO", Some("Thorlabs"));
    let err = solve_temperature_matching(
        &lbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        &Geometry::new(0.0, 0.6),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, PhaseMatchError::NoPhaseMatchFound { .. }), "got {err:?}");
}
