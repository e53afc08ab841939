//! Job runner: ties together the crystal record, the solvers and the
//! derived quantities of each solution.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use phasematch_core::acceptance::{acceptance_bandwidths, walk_off, AcceptanceBandwidths, WalkOff};
use phasematch_core::batch::{solve_batch, PhaseMatchRequest, RequestMode, TuningMode};
use phasematch_core::error::PhaseMatchError;
use phasematch_core::nonlinear::d_eff_for_solution;
use phasematch_core::solver::angle::solve_all_modes;
use phasematch_core::types::{
    Geometry, PhaseMatchingSolution, PolarizationType, PrincipalPlane, WavelengthTriplet,
};
use phasematch_materials::{Catalog, Crystal};

use crate::config::{CrystalConfig, JobConfig, RequestConfig, TuningKind};

/// Results from a job run.
pub struct JobOutput {
    pub crystal: Crystal,
    pub records: Vec<SolutionRecord>,
}

/// One output row: a solved (or failed) request or mode.
#[derive(Debug, Clone, Serialize)]
pub struct SolutionRecord {
    pub request: String,
    pub mode: String,
    pub plane: Option<PrincipalPlane>,
    pub solution: Option<PhaseMatchingSolution>,
    /// $d_{\text{eff}}$ (pm/V).
    pub d_eff: Option<f64>,
    pub walk_off: Option<WalkOff>,
    pub acceptance: Option<AcceptanceBandwidths>,
    pub error: Option<String>,
}

impl SolutionRecord {
    fn failed(
        request: &str,
        mode: String,
        plane: Option<PrincipalPlane>,
        e: &PhaseMatchError,
    ) -> Self {
        Self {
            request: request.to_string(),
            mode,
            plane,
            solution: None,
            d_eff: None,
            walk_off: None,
            acceptance: None,
            error: Some(e.to_string()),
        }
    }
}

/// Resolve the job's crystal record.
pub fn resolve_crystal(config: &CrystalConfig) -> Result<Crystal> {
    match config {
        CrystalConfig::Inline(crystal) => {
            crystal
                .validate()
                .with_context(|| format!("Inline crystal '{}' is invalid", crystal.name))?;
            Ok((**crystal).clone())
        }
        CrystalConfig::Catalog { name, source } => {
            let catalog = Catalog::builtin().context("Built-in catalog failed to load")?;
            let crystal = catalog
                .crystal(name, source.as_deref())
                .with_context(|| format!("Crystal '{name}' not in the built-in catalog"))?;
            Ok(crystal.clone())
        }
    }
}

fn request_label(index: usize, request: &RequestConfig) -> String {
    request
        .name
        .clone()
        .unwrap_or_else(|| format!("request-{}", index + 1))
}

fn wavelengths(request: &RequestConfig) -> WavelengthTriplet {
    match request.lambda2 {
        Some(l2) => WavelengthTriplet::sfg(request.lambda1, l2),
        None => WavelengthTriplet::shg(request.lambda1),
    }
}

fn fixed_geometry(label: &str, request: &RequestConfig) -> Result<Geometry> {
    if let Some(axis) = request.axis {
        return Ok(axis.geometry());
    }
    match (request.theta_deg, request.phi_deg) {
        (Some(theta), phi) => {
            let mut geometry = Geometry::from_degrees(theta, phi.unwrap_or(0.0));
            geometry.plane = request.plane;
            Ok(geometry)
        }
        (None, _) => anyhow::bail!(
            "Request '{label}': temperature tuning requires 'axis' or 'theta_deg'"
        ),
    }
}

/// Build the solver request for a non-table entry.
pub fn build_request<'a>(
    crystal: &'a Crystal,
    job: &JobConfig,
    index: usize,
) -> Result<PhaseMatchRequest<'a>> {
    let request = &job.requests[index];
    let label = request_label(index, request);
    let mode = match (request.assignment, request.polarization) {
        (Some(a), _) => RequestMode::Assignment(a),
        (None, Some(p)) => RequestMode::Type(p),
        (None, None) => RequestMode::Type(PolarizationType::TypeI),
    };
    let tuning = match request.tuning {
        TuningKind::Angle => TuningMode::Angle {
            temperature: request.temperature.unwrap_or(job.solver.reference_temperature),
        },
        TuningKind::Temperature => TuningMode::Temperature {
            geometry: fixed_geometry(&label, request)?,
        },
    };
    Ok(PhaseMatchRequest {
        crystal,
        wavelengths: wavelengths(request),
        interaction: request.interaction,
        mode,
        tuning,
    })
}

/// Check a job without solving it.
pub fn validate_job(job: &JobConfig) -> Result<Crystal> {
    let crystal = resolve_crystal(&job.crystal)?;
    job.solver.validate().context("Invalid [solver] section")?;
    if !(job.output.crystal_length_mm.is_finite() && job.output.crystal_length_mm > 0.0) {
        anyhow::bail!("crystal_length_mm must be positive");
    }
    for (i, request) in job.requests.iter().enumerate() {
        let label = request_label(i, request);
        wavelengths(request)
            .validate(request.interaction, job.solver.energy_tolerance)
            .with_context(|| format!("Request '{label}'"))?;
        if request.all_modes {
            if request.tuning == TuningKind::Temperature {
                anyhow::bail!("Request '{label}': all_modes only applies to angle tuning");
            }
        } else {
            build_request(&crystal, job, i)?;
        }
    }
    Ok(crystal)
}

fn describe(
    crystal: &Crystal,
    request: &str,
    solution: PhaseMatchingSolution,
    length_mm: f64,
) -> SolutionRecord {
    let d_eff = d_eff_for_solution(crystal, &solution)
        .map(|r| r.d_eff)
        .map_err(|e| log::warn!("{request}: d_eff unavailable: {e}"))
        .ok();
    let walk_off = walk_off(crystal, &solution)
        .map_err(|e| log::warn!("{request}: walk-off unavailable: {e}"))
        .ok();
    let acceptance = acceptance_bandwidths(crystal, &solution, length_mm)
        .map_err(|e| log::warn!("{request}: acceptance unavailable: {e}"))
        .ok();
    SolutionRecord {
        request: request.to_string(),
        mode: solution.assignment.label(),
        plane: solution.geometry().plane,
        solution: Some(solution),
        d_eff,
        walk_off,
        acceptance,
        error: None,
    }
}

fn print_record(record: &SolutionRecord) {
    match (&record.solution, &record.error) {
        (Some(s), _) => println!(
            "  {} [{}]: θ={:.4}° φ={:.4}° T={:.2} °C, d_eff={}",
            record.request,
            record.mode,
            s.theta_deg(),
            s.phi_deg(),
            s.temperature(),
            record
                .d_eff
                .map_or_else(|| "n/a".to_string(), |d| format!("{d:.4} pm/V")),
        ),
        (None, Some(e)) => println!("  {} [{}]: {}", record.request, record.mode, e),
        (None, None) => {}
    }
}

/// Run every request of a job.
pub fn run_job(job: &JobConfig) -> Result<JobOutput> {
    let crystal = validate_job(job)?;
    println!(
        "Crystal: {} ({}, {}, point group {})",
        crystal.name,
        crystal.source,
        match crystal.optical_class {
            phasematch_materials::OpticalClass::UniaxialNegative => "negative uniaxial",
            phasematch_materials::OpticalClass::UniaxialPositive => "positive uniaxial",
            phasematch_materials::OpticalClass::Biaxial => "biaxial",
        },
        crystal.point_group
    );
    let length = job.output.crystal_length_mm;

    // Single solves go through the parallel batch; mode tables are solved
    // per request.
    let singles: Vec<usize> = (0..job.requests.len())
        .filter(|&i| !job.requests[i].all_modes)
        .collect();
    let batch = singles
        .iter()
        .map(|&i| build_request(&crystal, job, i))
        .collect::<Result<Vec<_>>>()?;
    let mut solved = singles.iter().zip(solve_batch(&batch, &job.solver));

    let mut records = Vec::new();
    for (i, request) in job.requests.iter().enumerate() {
        let label = request_label(i, request);
        if request.all_modes {
            let temperature = request.temperature.unwrap_or(job.solver.reference_temperature);
            let table = solve_all_modes(
                &crystal,
                wavelengths(request),
                request.interaction,
                temperature,
                &job.solver,
            )
            .with_context(|| format!("Request '{label}'"))?;
            for outcome in table {
                let record = match outcome.result {
                    Ok(solution) => describe(&crystal, &label, solution, length),
                    Err(e) => SolutionRecord::failed(
                        &label,
                        outcome.assignment.label(),
                        outcome.plane,
                        &e,
                    ),
                };
                print_record(&record);
                records.push(record);
            }
        } else if let Some((_, result)) = solved.next() {
            let record = match result {
                Ok(solution) => describe(&crystal, &label, solution, length),
                Err(e) => {
                    let mode = match request.assignment {
                        Some(a) => a.label(),
                        None => request
                            .polarization
                            .unwrap_or(PolarizationType::TypeI)
                            .to_string(),
                    };
                    SolutionRecord::failed(&label, mode, request.plane, &e)
                }
            };
            print_record(&record);
            records.push(record);
        }
    }

    let matched = records.iter().filter(|r| r.solution.is_some()).count();
    println!("Solved {matched}/{} mode(s).", records.len());
    Ok(JobOutput { crystal, records })
}

fn opt(value: Option<f64>, scale: f64) -> String {
    value.map_or_else(String::new, |v| format!("{:.6e}", v * scale))
}

/// Write solutions to a CSV file with a metadata header.
pub fn write_solutions_csv(
    records: &[SolutionRecord],
    path: &Path,
    crystal: &Crystal,
    length_mm: f64,
) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;

    writeln!(file, "# phasematch solutions")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# crystal: {} (source {})", crystal.name, crystal.source)?;
    writeln!(file, "# crystal_length_mm: {length_mm}")?;
    writeln!(file, "#")?;
    writeln!(
        file,
        "request,mode,plane,lambda1_nm,lambda2_nm,lambda3_nm,theta_deg,phi_deg,temperature_c,residual,iterations,d_eff_pm_v,walk_off_mrad,angle_acceptance_mrad,temperature_acceptance_c,wavelength_acceptance_nm,frequency_acceptance_ghz,error"
    )?;

    for r in records {
        let plane = r.plane.map(|p| p.to_string()).unwrap_or_default();
        let error = r.error.as_deref().unwrap_or("").replace(',', ";");
        match &r.solution {
            Some(s) => writeln!(
                file,
                "{},{},{},{:.4},{:.4},{:.4},{:.6},{:.6},{:.4},{:.3e},{},{},{},{},{},{},{},{}",
                r.request,
                r.mode,
                plane,
                s.wavelengths.lambda1,
                s.wavelengths.lambda2,
                s.wavelengths.lambda3,
                s.theta_deg(),
                s.phi_deg(),
                s.temperature(),
                s.convergence.residual,
                s.convergence.iterations,
                opt(r.d_eff, 1.0),
                opt(r.walk_off.map(|w| w.max_abs()), 1e3),
                opt(r.acceptance.map(|a| a.angle_rad), 1e3),
                opt(r.acceptance.and_then(|a| a.temperature_c), 1.0),
                opt(r.acceptance.map(|a| a.wavelength_nm), 1.0),
                opt(r.acceptance.map(|a| a.frequency_ghz), 1.0),
                error,
            )?,
            None => writeln!(file, "{},{},{},,,,,,,,,,,,,,,{}", r.request, r.mode, plane, error)?,
        }
    }

    println!("Solutions written to: {}", path.display());
    Ok(())
}

/// Write solutions to a JSON file.
pub fn write_solutions_json(records: &[SolutionRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(records)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Solutions (JSON) written to: {}", path.display());
    Ok(())
}
