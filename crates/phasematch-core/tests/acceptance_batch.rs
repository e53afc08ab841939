//! Integration tests for walk-off, acceptance bandwidths and batch dispatch.
//!
//! - BBO Type I walk-off of the second harmonic
//! - Critical vs non-critical angular acceptance and their length scaling
//! - Temperature acceptance only with thermo-optic data
//! - Parallel batch results equal sequential solves, in input order

use approx::{assert_abs_diff_eq, assert_relative_eq};

use phasematch_core::acceptance::{
    acceptance_bandwidths, angle_acceptance, frequency_bandwidth_ghz, temperature_acceptance,
    walk_off, DEFAULT_CRYSTAL_LENGTH_MM,
};
use phasematch_core::batch::{solve_batch, PhaseMatchRequest, RequestMode, TuningMode};
use phasematch_core::error::PhaseMatchError;
use phasematch_core::solver::angle::solve_phase_matching;
use phasematch_core::solver::temperature::solve_temperature_matching;
use phasematch_core::types::{
    Geometry, InteractionType, PhaseMatchingSolution, PolarizationType, PropagationAxis,
    SolverConfig, WaveAssignment, WavelengthTriplet,
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

fn type_i_shg(crystal: &Crystal, temperature: f64) -> PhaseMatchingSolution {
    solve_phase_matching(
        crystal,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        temperature,
        &SolverConfig::default(),
    )
    .unwrap()
}

fn lbo_noncritical(lbo: &Crystal) -> PhaseMatchingSolution {
    solve_temperature_matching(
        lbo,
        WavelengthTriplet::shg(1064.0),
        InteractionType::Shg,
        PolarizationType::TypeI,
        &PropagationAxis::X.geometry(),
        &SolverConfig::default(),
    )
    .unwrap()
}

// ─────────────────────────────────────────────────────────────
// Walk-off
// ─────────────────────────────────────────────────────────────

#[test]
fn test_bbo_second_harmonic_walk_off() {
    let bbo = crystal("BBO", None);
    let sol = type_i_shg(&bbo, 20.0);
    let rho = walk_off(&bbo, &sol).unwrap();
    assert_eq!(rho.input1, 0.0);
    assert_eq!(rho.input2, 0.0);
    assert_abs_diff_eq!(rho.output.to_degrees(), 3.19, epsilon = 0.05);
    assert_eq!(rho.max_abs(), rho.output.abs());
}

#[test]
fn test_noncritical_has_no_walk_off() {
    let lbo = crystal("LBO", Some("Thorlabs"));
    let rho = walk_off(&lbo, &lbo_noncritical(&lbo)).unwrap();
    assert_abs_diff_eq!(rho.max_abs(), 0.0, epsilon = 1e-12);
}

// ─────────────────────────────────────────────────────────────
// Acceptance
// ─────────────────────────────────────────────────────────────

#[test]
fn test_critical_angle_acceptance_scales_inversely_with_length() {
    let bbo = crystal("BBO", None);
    let sol = type_i_shg(&bbo, 20.0);
    let short = angle_acceptance(&bbo, &sol, 10.0).unwrap();
    let long = angle_acceptance(&bbo, &sol, 20.0).unwrap();
    // about 0.5 mrad·cm for BBO
    assert!(short > 0.3e-3 && short < 1.0e-3, "width = {short} rad");
    assert_relative_eq!(long, short / 2.0, max_relative = 0.02);
}

#[test]
fn test_noncritical_angle_acceptance_is_wider() {
    let lbo = crystal("LBO", Some("Thorlabs"));
    let ncpm = lbo_noncritical(&lbo);
    let cpm = type_i_shg(&lbo, 20.0);

    let wide = angle_acceptance(&lbo, &ncpm, DEFAULT_CRYSTAL_LENGTH_MM).unwrap();
    let narrow = angle_acceptance(&lbo, &cpm, DEFAULT_CRYSTAL_LENGTH_MM).unwrap();
    assert!(wide > 5.0 * narrow, "NCPM {wide} rad vs CPM {narrow} rad");

    // quadratic mismatch: width goes as 1/√L
    let long = angle_acceptance(&lbo, &ncpm, 4.0 * DEFAULT_CRYSTAL_LENGTH_MM).unwrap();
    assert_relative_eq!(long, wide / 2.0, max_relative = 0.02);
}

#[test]
fn test_bandwidths_with_and_without_thermal_data() {
    let lbo = crystal("LBO", Some("Thorlabs"));
    let b = acceptance_bandwidths(&lbo, &lbo_noncritical(&lbo), 10.0).unwrap();
    let dt = b.temperature_c.unwrap();
    assert!(dt > 1.0 && dt < 20.0, "ΔT = {dt} °C");
    assert!(b.wavelength_nm > 0.0);
    assert_relative_eq!(
        b.frequency_ghz,
        frequency_bandwidth_ghz(b.wavelength_nm, 1064.0),
        epsilon = 1e-12
    );

    let kdp = crystal("KDP", None);
    let sol = type_i_shg(&kdp, 20.0);
    let b = acceptance_bandwidths(&kdp, &sol, 10.0).unwrap();
    assert!(b.temperature_c.is_none());
    assert!(b.angle_rad > 0.0);
    let err = temperature_acceptance(&kdp, &sol, 10.0).unwrap_err();
    assert!(matches!(err, PhaseMatchError::ThermalModelUnavailable { .. }), "got {err:?}");
}

#[test]
fn test_invalid_length() {
    let bbo = crystal("BBO", None);
    let sol = type_i_shg(&bbo, 20.0);
    let err = angle_acceptance(&bbo, &sol, -1.0).unwrap_err();
    assert!(matches!(err, PhaseMatchError::InvalidRequest(_)), "got {err:?}");
}

// ─────────────────────────────────────────────────────────────
// Batch
// ─────────────────────────────────────────────────────────────

#[test]
fn test_batch_equals_sequential() {
    let bbo = crystal("BBO", None);
    let lbo = crystal("LBO", Some("Thorlabs"));
    let kdp = crystal("KDP", None);
    let config = SolverConfig::default();

    let mut requests = Vec::new();
    for lambda in [700.0, 800.0, 1064.0, 1550.0, 400.0] {
        requests.push(PhaseMatchRequest {
            crystal: &bbo,
            wavelengths: WavelengthTriplet::shg(lambda),
            interaction: InteractionType::Shg,
            mode: RequestMode::Type(PolarizationType::TypeI),
            tuning: TuningMode::Angle { temperature: 20.0 },
        });
    }
    requests.push(PhaseMatchRequest {
        crystal: &lbo,
        wavelengths: WavelengthTriplet::shg(1064.0),
        interaction: InteractionType::Shg,
        mode: RequestMode::Assignment(WaveAssignment::OOE),
        tuning: TuningMode::Temperature { geometry: PropagationAxis::X.geometry() },
    });
    requests.push(PhaseMatchRequest {
        crystal: &kdp,
        wavelengths: WavelengthTriplet::shg(1064.0),
        interaction: InteractionType::Shg,
        mode: RequestMode::Type(PolarizationType::TypeI),
        tuning: TuningMode::Temperature { geometry: Geometry::from_degrees(41.0, 45.0) },
    });
    requests.push(PhaseMatchRequest {
        crystal: &bbo,
        wavelengths: WavelengthTriplet::sfg(1064.0, 1550.0),
        interaction: InteractionType::Sfg,
        mode: RequestMode::Type(PolarizationType::TypeII),
        tuning: TuningMode::Angle { temperature: 40.0 },
    });

    let parallel = solve_batch(&requests, &config);
    let sequential: Vec<_> = requests.iter().map(|r| r.solve(&config)).collect();
    assert_eq!(parallel, sequential);

    assert!(parallel[2].is_ok());
    assert!(matches!(parallel[4], Err(PhaseMatchError::NoPhaseMatchFound { .. })));
    assert!(matches!(parallel[6], Err(PhaseMatchError::ThermalModelUnavailable { .. })));
    let lbo_sol = parallel[5].as_ref().unwrap();
    assert_eq!(lbo_sol.crystal, "LBO");
    assert_abs_diff_eq!(lbo_sol.temperature(), 149.15, epsilon = 0.5);
}
