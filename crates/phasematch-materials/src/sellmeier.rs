//! Sellmeier dispersion formulas.
//!
//! Every principal axis of a crystal is described by a sum of terms in the
//! vacuum wavelength $\lambda$ (micrometres):
//!
//! $$
//! n^2(\lambda) = \sum_i t_i(\lambda)
//! $$
//!
//! where each term is a constant, a resonance $B/(\lambda^2 - C)$, a
//! weighted resonance $B\lambda^2/(\lambda^2 - C)$, or a power law
//! $D\lambda^p$. This covers the common published forms, e.g.
//! $A + B/(\lambda^2 - C) - D\lambda^2$ and the classic three-resonance
//! $1 + \sum B_i\lambda^2/(\lambda^2 - C_i)$.

use serde::{Deserialize, Serialize};

use crate::provider::MaterialError;

/// Relative distance of $\lambda^2$ from a resonance below which the formula
/// is treated as singular.
const POLE_EPSILON: f64 = 1e-12;

/// One additive term of a Sellmeier expression for $n^2$.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SellmeierTerm {
    /// Constant offset $A$.
    Constant { a: f64 },
    /// Resonance $B / (\lambda^2 - C)$, with $C$ in µm².
    Pole { b: f64, c: f64 },
    /// Weighted resonance $B\lambda^2 / (\lambda^2 - C)$, with $C$ in µm².
    WeightedPole { b: f64, c: f64 },
    /// Power law $D\lambda^p$.
    Power { d: f64, exponent: i32 },
}

impl SellmeierTerm {
    fn is_finite(&self) -> bool {
        match *self {
            SellmeierTerm::Constant { a } => a.is_finite(),
            SellmeierTerm::Pole { b, c } | SellmeierTerm::WeightedPole { b, c } => {
                b.is_finite() && c.is_finite()
            }
            SellmeierTerm::Power { d, .. } => d.is_finite(),
        }
    }

    fn resonance(&self) -> Option<f64> {
        match *self {
            SellmeierTerm::Pole { c, .. } | SellmeierTerm::WeightedPole { c, .. } => Some(c),
            _ => None,
        }
    }

    fn evaluate(&self, lambda_um: f64, lambda_sq: f64) -> f64 {
        match *self {
            SellmeierTerm::Constant { a } => a,
            SellmeierTerm::Pole { b, c } => b / (lambda_sq - c),
            SellmeierTerm::WeightedPole { b, c } => b * lambda_sq / (lambda_sq - c),
            SellmeierTerm::Power { d, exponent } => d * lambda_um.powi(exponent),
        }
    }
}

/// A complete Sellmeier expression for one principal axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellmeierFormula {
    terms: Vec<SellmeierTerm>,
}

impl SellmeierFormula {
    /// Build a formula from its terms.
    ///
    /// # Errors
    /// Returns [`MaterialError::DataError`] if the formula has no terms or
    /// any coefficient is not finite.
    pub fn new(terms: Vec<SellmeierTerm>) -> Result<Self, MaterialError> {
        let formula = Self { terms };
        formula.validate()?;
        Ok(formula)
    }

    pub(crate) fn from_terms(terms: Vec<SellmeierTerm>) -> Self {
        Self { terms }
    }

    /// Check the coefficients once at load time.
    pub fn validate(&self) -> Result<(), MaterialError> {
        if self.terms.is_empty() {
            return Err(MaterialError::DataError(
                "Sellmeier formula has no terms".into(),
            ));
        }
        if let Some(bad) = self.terms.iter().find(|t| !t.is_finite()) {
            return Err(MaterialError::DataError(format!(
                "Sellmeier term {:?} has a non-finite coefficient",
                bad
            )));
        }
        Ok(())
    }

    pub fn terms(&self) -> &[SellmeierTerm] {
        &self.terms
    }

    /// Evaluate $n^2$ at a vacuum wavelength in micrometres.
    ///
    /// # Errors
    /// - [`MaterialError::Pole`] if $\lambda^2$ coincides with a resonance $C_i$.
    /// - [`MaterialError::NegativeIndexSquared`] if the sum is not positive.
    pub fn n_squared(&self, wavelength_um: f64) -> Result<f64, MaterialError> {
        let lambda_sq = wavelength_um * wavelength_um;

        for c in self.terms.iter().filter_map(SellmeierTerm::resonance) {
            if (lambda_sq - c).abs() <= POLE_EPSILON * c.abs().max(1.0) {
                return Err(MaterialError::Pole {
                    wavelength_nm: wavelength_um * 1000.0,
                    pole: c,
                });
            }
        }

        let n_sq: f64 = self
            .terms
            .iter()
            .map(|t| t.evaluate(wavelength_um, lambda_sq))
            .sum();

        if !(n_sq > 0.0) {
            return Err(MaterialError::NegativeIndexSquared {
                wavelength_nm: wavelength_um * 1000.0,
                n_squared: n_sq,
            });
        }
        Ok(n_sq)
    }
}
