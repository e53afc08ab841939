//! # Phasematch Core
//!
//! The numerical backbone of the phase-matching toolkit. This crate solves
//! for the propagation direction or crystal temperature at which a
//! second-order three-wave interaction (SHG or SFG) is phase matched, and
//! evaluates the effective nonlinear coefficient $d_{\text{eff}}$ there.
//!
//! ## Architecture
//!
//! Both solvers scan the index mismatch $\Delta n$ over a [`solver::Tuning`]
//! variable, bracket its sign changes and refine each bracket
//! ([`solver::roots::RootFinder`]). Solutions are plain values; the
//! nonlinearity and acceptance modules only read them.
//!
//! ## Modules
//!
//! - [`types`] — Requests, solutions and solver settings.
//! - [`error`] — Failure kinds of a single request.
//! - [`index`] — Direction-dependent refractive indices and walk-off.
//! - [`geometry`] — Propagation and polarization unit vectors.
//! - [`solver`] — Angle and temperature phase matching.
//! - [`nonlinear`] — $d_{\text{eff}}$ per point group.
//! - [`acceptance`] — Walk-off and acceptance bandwidths.
//! - [`batch`] — Parallel dispatch of independent requests.

pub mod acceptance;
pub mod batch;
pub mod error;
pub mod geometry;
pub mod index;
pub mod nonlinear;
pub mod solver;
pub mod types;

pub use error::PhaseMatchError;
pub use types::{
    Geometry, InteractionType, PhaseMatchingSolution, PolarizationType, SolverConfig,
    WaveAssignment, WavelengthTriplet,
};
