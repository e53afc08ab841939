//! Nonlinear crystal records.
//!
//! A [`Crystal`] bundles everything the solvers consume about one material
//! from one data source:
//!
//! - optical class (positive/negative uniaxial or biaxial),
//! - point group, which selects the closed-form $d_{\text{eff}}$ expression,
//! - one Sellmeier formula per principal axis with optional thermal terms,
//! - the second-order tensor $d_{il}$ in Voigt notation (pm/V).
//!
//! Records are validated once in [`Crystal::new`] and are immutable
//! afterwards. Uniaxial records report $n_x = n_y = n_o$, $n_z = n_e$.

use serde::{Deserialize, Serialize};

use crate::provider::{IndexProvider, MaterialError, PrincipalIndices};
use crate::sellmeier::SellmeierFormula;
use crate::thermal::ThermalModel;

/// Default reference temperature of published Sellmeier data (°C).
pub const DEFAULT_REFERENCE_TEMPERATURE: f64 = 20.0;

/// Wavelength at which the optical sign of uniaxial records is checked (nm).
const SIGN_PROBE_NM: f64 = 1064.0;

/// Principal dielectric axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrystalAxis {
    X,
    Y,
    Z,
}

impl CrystalAxis {
    /// Unit vector along this axis.
    pub fn unit(&self) -> [f64; 3] {
        match self {
            CrystalAxis::X => [1.0, 0.0, 0.0],
            CrystalAxis::Y => [0.0, 1.0, 0.0],
            CrystalAxis::Z => [0.0, 0.0, 1.0],
        }
    }
}

/// Optical class of a crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpticalClass {
    /// $n_e > n_o$.
    UniaxialPositive,
    /// $n_e < n_o$.
    UniaxialNegative,
    Biaxial,
}

impl OpticalClass {
    pub fn is_uniaxial(&self) -> bool {
        !matches!(self, OpticalClass::Biaxial)
    }
}

/// Crystallographic point group, written with its Hermann–Mauguin symbol.
///
/// Only the non-centrosymmetric classes common among phase-matching
/// crystals are named; anything else is carried as [`PointGroup::Other`]
/// and rejected by the $d_{\text{eff}}$ calculator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PointGroup {
    /// 3m (BBO, LiNbO₃).
    C3v,
    /// 32 (α-quartz).
    D3,
    /// $\bar{4}2m$ (KDP, DKDP, CLBO).
    D2d,
    /// 4mm.
    C4v,
    /// 6mm.
    C6v,
    /// $\bar{6}m2$ (GaSe).
    D3h,
    /// mm2 (KTP, LBO).
    C2v,
    Other(String),
}

impl PointGroup {
    pub fn symbol(&self) -> &str {
        match self {
            PointGroup::C3v => "3m",
            PointGroup::D3 => "32",
            PointGroup::D2d => "-42m",
            PointGroup::C4v => "4mm",
            PointGroup::C6v => "6mm",
            PointGroup::D3h => "-6m2",
            PointGroup::C2v => "mm2",
            PointGroup::Other(s) => s,
        }
    }

    /// Parse a Hermann–Mauguin or Schoenflies symbol. Unknown symbols map
    /// to [`PointGroup::Other`].
    pub fn parse(s: &str) -> Self {
        let t = s.trim();
        match t.to_ascii_lowercase().replace(['_', ' '], "").as_str() {
            "3m" | "c3v" => PointGroup::C3v,
            "32" | "d3" => PointGroup::D3,
            "-42m" | "4bar2m" | "d2d" => PointGroup::D2d,
            "4mm" | "c4v" => PointGroup::C4v,
            "6mm" | "c6v" => PointGroup::C6v,
            "-6m2" | "6barm2" | "d3h" => PointGroup::D3h,
            "mm2" | "c2v" => PointGroup::C2v,
            _ => PointGroup::Other(t.to_string()),
        }
    }
}

impl From<String> for PointGroup {
    fn from(s: String) -> Self {
        PointGroup::parse(&s)
    }
}

impl From<PointGroup> for String {
    fn from(p: PointGroup) -> Self {
        p.symbol().to_string()
    }
}

impl std::fmt::Display for PointGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Dispersion of one principal axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDispersion {
    pub sellmeier: SellmeierFormula,
    #[serde(default)]
    pub thermal: Option<ThermalModel>,
}

impl AxisDispersion {
    pub fn new(sellmeier: SellmeierFormula) -> Self {
        Self { sellmeier, thermal: None }
    }

    pub fn with_thermal(mut self, thermal: ThermalModel) -> Self {
        self.thermal = Some(thermal);
        self
    }

    /// Index at a wavelength (µm) and temperature offset from the reference.
    pub fn index(&self, wavelength_um: f64, delta_t: f64) -> Result<f64, MaterialError> {
        let mut n_sq = self.sellmeier.n_squared(wavelength_um)?;
        if let Some(thermal) = &self.thermal {
            n_sq += thermal.squared_index_shift(wavelength_um, delta_t);
            if !(n_sq > 0.0) {
                return Err(MaterialError::NegativeIndexSquared {
                    wavelength_nm: wavelength_um * 1000.0,
                    n_squared: n_sq,
                });
            }
        }
        let shift = self
            .thermal
            .as_ref()
            .map_or(0.0, |t| t.index_shift(wavelength_um, delta_t));
        Ok(n_sq.sqrt() + shift)
    }

    fn validate(&self) -> Result<(), MaterialError> {
        self.sellmeier.validate()?;
        if let Some(thermal) = &self.thermal {
            thermal.validate()?;
        }
        Ok(())
    }
}

/// Per-axis dispersion data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dispersion {
    Uniaxial {
        ordinary: AxisDispersion,
        extraordinary: AxisDispersion,
    },
    Biaxial {
        x: AxisDispersion,
        y: AxisDispersion,
        z: AxisDispersion,
    },
}

impl Dispersion {
    fn axes(&self) -> Vec<&AxisDispersion> {
        match self {
            Dispersion::Uniaxial { ordinary, extraordinary } => vec![ordinary, extraordinary],
            Dispersion::Biaxial { x, y, z } => vec![x, y, z],
        }
    }
}

/// Second-order nonlinear tensor $d_{il}$ (pm/V), $i \in \{1,2,3\}$,
/// $l \in \{1..6\}$ with Voigt pairs 1=xx, 2=yy, 3=zz, 4=yz, 5=xz, 6=xy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonlinearTensor {
    pub d: [[f64; 6]; 3],
    /// Whether Kleinman full-permutation symmetry may be assumed.
    #[serde(default = "default_kleinman")]
    pub kleinman: bool,
}

fn default_kleinman() -> bool {
    true
}

impl NonlinearTensor {
    /// Build from labelled components such as `("d31", 0.04)`.
    pub fn from_components(
        components: &[(&str, f64)],
        kleinman: bool,
    ) -> Result<Self, MaterialError> {
        let mut d = [[0.0; 6]; 3];
        for &(label, value) in components {
            let (i, l) = parse_label(label)?;
            if !value.is_finite() {
                return Err(MaterialError::DataError(format!(
                    "{label} = {value} is not finite"
                )));
            }
            d[i][l] = value;
        }
        Ok(Self { d, kleinman })
    }

    /// Component by 1-based Voigt indices, e.g. `get(3, 1)` for $d_{31}$.
    pub fn get(&self, i: usize, l: usize) -> f64 {
        self.d[i - 1][l - 1]
    }
}

fn parse_label(label: &str) -> Result<(usize, usize), MaterialError> {
    let bad = || MaterialError::DataError(format!("invalid tensor label '{label}'"));
    let digits = label.trim().strip_prefix(['d', 'D']).ok_or_else(bad)?;
    let mut chars = digits.chars();
    let (Some(a), Some(b), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(bad());
    };
    let i = a.to_digit(10).filter(|v| (1..=3).contains(v)).ok_or_else(bad)?;
    let l = b.to_digit(10).filter(|v| (1..=6).contains(v)).ok_or_else(bad)?;
    Ok((i as usize - 1, l as usize - 1))
}

/// A validated nonlinear crystal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    pub name: String,
    /// Data source of the Sellmeier coefficients (e.g. "CASTECH").
    pub source: String,
    pub optical_class: OpticalClass,
    pub point_group: PointGroup,
    pub dispersion: Dispersion,
    pub nonlinear: NonlinearTensor,
    /// Transparency / validity range of the Sellmeier data (nm).
    #[serde(default)]
    pub wavelength_range_nm: Option<(f64, f64)>,
    /// Temperature the Sellmeier coefficients refer to (°C).
    #[serde(default = "default_reference_temperature")]
    pub reference_temperature: f64,
}

fn default_reference_temperature() -> f64 {
    DEFAULT_REFERENCE_TEMPERATURE
}

impl Crystal {
    /// Assemble and validate a crystal record.
    ///
    /// # Errors
    /// [`MaterialError::DataError`] if the dispersion shape does not match
    /// the optical class, a coefficient is not finite, the range is empty,
    /// or a uniaxial record's optical sign contradicts its dispersion.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        optical_class: OpticalClass,
        point_group: PointGroup,
        dispersion: Dispersion,
        nonlinear: NonlinearTensor,
        wavelength_range_nm: Option<(f64, f64)>,
    ) -> Result<Self, MaterialError> {
        let crystal = Self {
            name: name.into(),
            source: source.into(),
            optical_class,
            point_group,
            dispersion,
            nonlinear,
            wavelength_range_nm,
            reference_temperature: DEFAULT_REFERENCE_TEMPERATURE,
        };
        crystal.validate()?;
        Ok(crystal)
    }

    pub fn with_reference_temperature(mut self, t: f64) -> Self {
        self.reference_temperature = t;
        self
    }

    /// Check a record, e.g. one deserialised from a job file.
    pub fn validate(&self) -> Result<(), MaterialError> {
        let shape_ok = matches!(
            (&self.optical_class, &self.dispersion),
            (OpticalClass::Biaxial, Dispersion::Biaxial { .. })
                | (OpticalClass::UniaxialNegative, Dispersion::Uniaxial { .. })
                | (OpticalClass::UniaxialPositive, Dispersion::Uniaxial { .. })
        );
        if !shape_ok {
            return Err(MaterialError::DataError(format!(
                "{}: {:?} crystal with mismatched dispersion data",
                self.name, self.optical_class
            )));
        }
        for axis in self.dispersion.axes() {
            axis.validate()?;
        }
        if self.nonlinear.d.iter().flatten().any(|v| !v.is_finite()) {
            return Err(MaterialError::DataError(format!(
                "{}: non-finite d coefficient",
                self.name
            )));
        }
        if !self.reference_temperature.is_finite() {
            return Err(MaterialError::DataError(format!(
                "{}: reference temperature is not finite",
                self.name
            )));
        }
        if let Some((min, max)) = self.wavelength_range_nm {
            if !(min > 0.0 && max > min) {
                return Err(MaterialError::DataError(format!(
                    "{}: invalid wavelength range [{min}, {max}] nm",
                    self.name
                )));
            }
        }

        if self.optical_class.is_uniaxial() {
            let probe = match self.wavelength_range_nm {
                Some((min, max)) => SIGN_PROBE_NM.clamp(min, max),
                None => SIGN_PROBE_NM,
            };
            let n = self.principal_indices(probe, self.reference_temperature)?;
            let negative = n.nz < n.nx;
            if negative != (self.optical_class == OpticalClass::UniaxialNegative) {
                return Err(MaterialError::DataError(format!(
                    "{}: declared {:?} but n_o = {:.5}, n_e = {:.5} at {probe} nm",
                    self.name, self.optical_class, n.nx, n.nz
                )));
            }
        }
        log::debug!("validated crystal {} ({})", self.name, self.source);
        Ok(())
    }

    /// Temperature offset from the reference temperature.
    pub fn delta_t(&self, temperature_c: f64) -> f64 {
        temperature_c - self.reference_temperature
    }
}

impl IndexProvider for Crystal {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> Option<(f64, f64)> {
        self.wavelength_range_nm
    }

    fn principal_indices(
        &self,
        wavelength_nm: f64,
        temperature_c: f64,
    ) -> Result<PrincipalIndices, MaterialError> {
        if let Some((min, max)) = self.wavelength_range_nm {
            if !(wavelength_nm >= min && wavelength_nm <= max) {
                return Err(MaterialError::OutOfRange { wavelength_nm, min, max });
            }
        }
        let um = wavelength_nm / 1000.0;
        let dt = self.delta_t(temperature_c);
        match &self.dispersion {
            Dispersion::Uniaxial { ordinary, extraordinary } => {
                let n_o = ordinary.index(um, dt)?;
                let n_e = extraordinary.index(um, dt)?;
                Ok(PrincipalIndices { nx: n_o, ny: n_o, nz: n_e })
            }
            Dispersion::Biaxial { x, y, z } => Ok(PrincipalIndices {
                nx: x.index(um, dt)?,
                ny: y.index(um, dt)?,
                nz: z.index(um, dt)?,
            }),
        }
    }

    fn has_thermal_model(&self) -> bool {
        self.dispersion.axes().iter().all(|a| a.thermal.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sellmeier::SellmeierTerm;
    use approx::assert_relative_eq;

    fn constant_axis(n: f64) -> AxisDispersion {
        AxisDispersion::new(SellmeierFormula::from_terms(vec![SellmeierTerm::Constant {
            a: n * n,
        }]))
    }

    fn toy_uniaxial(class: OpticalClass) -> Result<Crystal, MaterialError> {
        Crystal::new(
            "toy",
            "test",
            class,
            PointGroup::C3v,
            Dispersion::Uniaxial {
                ordinary: constant_axis(1.6),
                extraordinary: constant_axis(1.5),
            },
            NonlinearTensor::from_components(&[("d22", 2.0)], true)?,
            None,
        )
    }

    #[test]
    fn test_tensor_labels() {
        let t = NonlinearTensor::from_components(&[("d31", 0.5), ("D15", 0.4)], true).unwrap();
        assert_eq!(t.get(3, 1), 0.5);
        assert_eq!(t.get(1, 5), 0.4);
        assert!(NonlinearTensor::from_components(&[("d41", 1.0)], true).is_err());
        assert!(NonlinearTensor::from_components(&[("d17", 1.0)], true).is_err());
        assert!(NonlinearTensor::from_components(&[("x31", 1.0)], true).is_err());
        assert!(NonlinearTensor::from_components(&[("d311", 1.0)], true).is_err());
    }

    #[test]
    fn test_optical_sign_is_checked() {
        assert!(toy_uniaxial(OpticalClass::UniaxialNegative).is_ok());
        let err = toy_uniaxial(OpticalClass::UniaxialPositive).unwrap_err();
        assert!(matches!(err, MaterialError::DataError(_)));
        assert!(toy_uniaxial(OpticalClass::Biaxial).is_err());
    }

    #[test]
    fn test_range_enforced() {
        let mut c = toy_uniaxial(OpticalClass::UniaxialNegative).unwrap();
        c.wavelength_range_nm = Some((200.0, 2000.0));
        assert!(c.principal_indices(1064.0, 20.0).is_ok());
        let err = c.principal_indices(150.0, 20.0).unwrap_err();
        assert!(matches!(err, MaterialError::OutOfRange { .. }));
    }

    #[test]
    fn test_thermal_shift_applied() {
        let mut c = toy_uniaxial(OpticalClass::UniaxialNegative).unwrap();
        assert!(!c.has_thermal_model());
        if let Dispersion::Uniaxial { ordinary, extraordinary } = &mut c.dispersion {
            ordinary.thermal = Some(ThermalModel::constant(1e-5));
            extraordinary.thermal = Some(ThermalModel::constant(-1e-5));
        }
        assert!(c.has_thermal_model());
        let n = c.principal_indices(1000.0, 30.0).unwrap();
        assert_relative_eq!(n.nx, 1.6 + 1e-4, epsilon = 1e-12);
        assert_relative_eq!(n.nz, 1.5 - 1e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_point_group_parse() {
        assert_eq!(PointGroup::parse("3m"), PointGroup::C3v);
        assert_eq!(PointGroup::parse("D2d"), PointGroup::D2d);
        assert_eq!(PointGroup::parse(" mm2 "), PointGroup::C2v);
        assert_eq!(PointGroup::parse("-6m2").symbol(), "-6m2");
        assert_eq!(PointGroup::parse("43m"), PointGroup::Other("43m".into()));
    }

    #[test]
    fn test_crystal_serde_round_trip() {
        let c = toy_uniaxial(OpticalClass::UniaxialNegative).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"point_group\":\"3m\""));
        let back: Crystal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
