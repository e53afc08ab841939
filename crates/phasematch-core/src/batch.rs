//! Parallel dispatch of independent solves using Rayon.

use phasematch_materials::Crystal;
use rayon::prelude::*;

use crate::error::PhaseMatchError;
use crate::solver::angle::{solve_assignment, solve_phase_matching};
use crate::solver::temperature::{solve_temperature_assignment, solve_temperature_matching};
use crate::types::{
    Geometry, InteractionType, PhaseMatchingSolution, PolarizationType, SolverConfig,
    WaveAssignment, WavelengthTriplet,
};

/// What a request holds fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TuningMode {
    /// Tune the direction at a fixed temperature (°C).
    Angle { temperature: f64 },
    /// Tune the temperature along a fixed direction.
    Temperature { geometry: Geometry },
}

/// Polarization convention or an explicit wave assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Type(PolarizationType),
    Assignment(WaveAssignment),
}

/// One independent phase-matching request.
#[derive(Debug, Clone, Copy)]
pub struct PhaseMatchRequest<'a> {
    pub crystal: &'a Crystal,
    pub wavelengths: WavelengthTriplet,
    pub interaction: InteractionType,
    pub mode: RequestMode,
    pub tuning: TuningMode,
}

impl PhaseMatchRequest<'_> {
    pub fn solve(&self, config: &SolverConfig) -> Result<PhaseMatchingSolution, PhaseMatchError> {
        let (c, w, i) = (self.crystal, self.wavelengths, self.interaction);
        match (self.tuning, self.mode) {
            (TuningMode::Angle { temperature }, RequestMode::Type(p)) => {
                solve_phase_matching(c, w, i, p, temperature, config)
            }
            (TuningMode::Angle { temperature }, RequestMode::Assignment(a)) => {
                solve_assignment(c, w, i, a, None, temperature, config)
            }
            (TuningMode::Temperature { geometry }, RequestMode::Type(p)) => {
                solve_temperature_matching(c, w, i, p, &geometry, config)
            }
            (TuningMode::Temperature { geometry }, RequestMode::Assignment(a)) => {
                solve_temperature_assignment(c, w, i, a, &geometry, config)
            }
        }
    }
}

/// Solve every request in parallel. Results are in input order and each
/// failure stays with its own request.
pub fn solve_batch(
    requests: &[PhaseMatchRequest<'_>],
    config: &SolverConfig,
) -> Vec<Result<PhaseMatchingSolution, PhaseMatchError>> {
    log::debug!(
        "Solving {} request(s) on {} thread(s)",
        requests.len(),
        rayon::current_num_threads()
    );
    requests.par_iter().map(|r| r.solve(config)).collect()
}
