//! Temperature corrections to the principal indices.
//!
//! Two published forms are supported:
//!
//! - **Index shift** (applied after the square root):
//!   $$
//!   n(\lambda, T) = n(\lambda, T_0) + (\Delta T + q\,\Delta T^2) \sum_i c_i \lambda^{p_i}
//!   $$
//!   With $q = 0$ and a single $p = 0$ term this is a constant $dn/dT$.
//! - **Squared-index shift** (applied before the square root), for sources
//!   that publish temperature-shifted Sellmeier coefficients:
//!   $$
//!   n^2(\lambda, T) = n^2(\lambda, T_0) + \Delta T \sum_i c_i \lambda^{p_i}
//!   $$
//!
//! $\Delta T = T - T_0$ and $\lambda$ is in micrometres.

use serde::{Deserialize, Serialize};

use crate::provider::MaterialError;

/// One term $c\,\lambda^p$ of a thermal coefficient polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerTerm {
    pub coefficient: f64,
    pub exponent: i32,
}

impl PowerTerm {
    pub fn new(coefficient: f64, exponent: i32) -> Self {
        Self { coefficient, exponent }
    }
}

fn polynomial(terms: &[PowerTerm], lambda_um: f64) -> f64 {
    terms
        .iter()
        .map(|t| t.coefficient * lambda_um.powi(t.exponent))
        .sum()
}

/// Thermal correction model for one principal axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThermalModel {
    /// $\Delta n = (\Delta T + q\Delta T^2)\,\sum c_i\lambda^{p_i}$.
    IndexShift {
        #[serde(default)]
        quadratic: f64,
        dn_dt: Vec<PowerTerm>,
    },
    /// $\Delta(n^2) = \Delta T\,\sum c_i\lambda^{p_i}$.
    SquaredIndexShift { dn2_dt: Vec<PowerTerm> },
}

impl ThermalModel {
    /// Wavelength-independent $dn/dT$ (per °C).
    pub fn constant(dn_dt: f64) -> Self {
        ThermalModel::IndexShift {
            quadratic: 0.0,
            dn_dt: vec![PowerTerm::new(dn_dt, 0)],
        }
    }

    /// $dn/dT$ as a polynomial in $\lambda$, given as `(coefficient, exponent)` pairs.
    pub fn polynomial(terms: &[(f64, i32)]) -> Self {
        ThermalModel::IndexShift {
            quadratic: 0.0,
            dn_dt: terms.iter().map(|&(c, p)| PowerTerm::new(c, p)).collect(),
        }
    }

    /// $dn/dT$ polynomial with a quadratic-in-$\Delta T$ factor $q$.
    pub fn quadratic(quadratic: f64, terms: &[(f64, i32)]) -> Self {
        ThermalModel::IndexShift {
            quadratic,
            dn_dt: terms.iter().map(|&(c, p)| PowerTerm::new(c, p)).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), MaterialError> {
        let (terms, q) = match self {
            ThermalModel::IndexShift { quadratic, dn_dt } => (dn_dt, *quadratic),
            ThermalModel::SquaredIndexShift { dn2_dt } => (dn2_dt, 0.0),
        };
        if terms.is_empty() {
            return Err(MaterialError::DataError("thermal model has no terms".into()));
        }
        if !q.is_finite() || terms.iter().any(|t| !t.coefficient.is_finite()) {
            return Err(MaterialError::DataError(
                "thermal model has a non-finite coefficient".into(),
            ));
        }
        Ok(())
    }

    /// Shift added to $n$ after the square root. Zero for squared-index models.
    pub fn index_shift(&self, lambda_um: f64, delta_t: f64) -> f64 {
        match self {
            ThermalModel::IndexShift { quadratic, dn_dt } => {
                (delta_t + quadratic * delta_t * delta_t) * polynomial(dn_dt, lambda_um)
            }
            ThermalModel::SquaredIndexShift { .. } => 0.0,
        }
    }

    /// Shift added to $n^2$ before the square root. Zero for index-shift models.
    pub fn squared_index_shift(&self, lambda_um: f64, delta_t: f64) -> f64 {
        match self {
            ThermalModel::SquaredIndexShift { dn2_dt } => delta_t * polynomial(dn2_dt, lambda_um),
            ThermalModel::IndexShift { .. } => 0.0,
        }
    }
}
