//! # Phasematch Materials
//!
//! Crystal reference data for the phase-matching solvers. Every crystal
//! record implements the [`IndexProvider`](provider::IndexProvider) trait,
//! which returns the principal refractive indices at a given wavelength and
//! temperature.
//!
//! ## Data model
//!
//! | Concern | Module |
//! |--------|--------|
//! | Sellmeier formulas $n^2(\lambda)$ | [`sellmeier`] |
//! | Thermo-optic corrections | [`thermal`] |
//! | Optical class, point group, $d_{il}$ tensor | [`crystal`] |
//! | Built-in crystals and Sellmeier sources | [`catalog`] |
//!
//! Records are validated once when built and never mutated by the solvers.

pub mod catalog;
pub mod crystal;
pub mod provider;
pub mod sellmeier;
pub mod thermal;

pub use catalog::Catalog;
pub use crystal::{Crystal, CrystalAxis, NonlinearTensor, OpticalClass, PointGroup};
pub use provider::{IndexProvider, MaterialError, PrincipalIndices};
