//! Built-in crystal catalog.
//!
//! Published Sellmeier, thermo-optic and nonlinear coefficients for common
//! phase-matching crystals. Wavelengths are in µm inside the formulas,
//! reference temperature 20 °C, $d_{il}$ in pm/V.
//!
//! | Crystal | Class | Point group | Sources |
//! |---------|-------|-------------|---------|
//! | BBO | negative uniaxial | 3m | default |
//! | KDP | negative uniaxial | $\bar{4}2m$ | default (no thermal data) |
//! | DKDP | negative uniaxial | $\bar{4}2m$ | default (no thermal data) |
//! | CLBO | negative uniaxial | $\bar{4}2m$ | CASTECH, OXIDE |
//! | LBO | biaxial | mm2 | CASTECH, Thorlabs |
//! | KTP | biaxial | mm2 | default |
//!
//! The first source registered for a crystal is its default.

use crate::crystal::{
    AxisDispersion, Crystal, Dispersion, NonlinearTensor, OpticalClass, PointGroup,
};
use crate::provider::MaterialError;
use crate::sellmeier::{SellmeierFormula, SellmeierTerm};
use crate::thermal::ThermalModel;

use SellmeierTerm::{Constant, Pole, Power, WeightedPole};

pub const DEFAULT_SOURCE: &str = "default";

/// A collection of crystal records keyed by (name, source).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Crystal>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in crystals.
    pub fn builtin() -> Result<Self, MaterialError> {
        let mut catalog = Self::new();
        for crystal in [
            bbo()?,
            kdp()?,
            dkdp()?,
            clbo_castech()?,
            clbo_oxide()?,
            lbo_castech()?,
            lbo_thorlabs()?,
            ktp()?,
        ] {
            catalog.insert(crystal);
        }
        Ok(catalog)
    }

    /// Add a record, replacing any existing record with the same name and source.
    pub fn insert(&mut self, crystal: Crystal) {
        if let Some(existing) = self.entries.iter_mut().find(|c| {
            c.name.eq_ignore_ascii_case(&crystal.name)
                && c.source.eq_ignore_ascii_case(&crystal.source)
        }) {
            *existing = crystal;
        } else {
            self.entries.push(crystal);
        }
    }

    /// Look up a crystal by name (case-insensitive). `source = None` picks
    /// the default source.
    pub fn crystal(&self, name: &str, source: Option<&str>) -> Result<&Crystal, MaterialError> {
        let mut matches = self
            .entries
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case(name));
        let found = match source {
            None => matches.next(),
            Some(s) => matches.find(|c| c.source.eq_ignore_ascii_case(s)),
        };
        found.ok_or_else(|| match source {
            None => MaterialError::NotFound(name.to_string()),
            Some(s) => MaterialError::NotFound(format!("{name} (source {s})")),
        })
    }

    /// Distinct crystal names in registration order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for c in &self.entries {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&c.name)) {
                names.push(&c.name);
            }
        }
        names
    }

    /// Sellmeier sources available for a crystal, default first.
    pub fn sources(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.source.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Crystal> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Helpers ───

fn axis(terms: Vec<SellmeierTerm>, thermal: Option<ThermalModel>) -> AxisDispersion {
    AxisDispersion {
        sellmeier: SellmeierFormula::from_terms(terms),
        thermal,
    }
}

/// $A + B/(\lambda^2 - C) - D\lambda^2$, the most common published form.
fn abcd(a: f64, b: f64, c: f64, d: f64) -> Vec<SellmeierTerm> {
    vec![Constant { a }, Pole { b, c }, Power { d: -d, exponent: 2 }]
}

// ─── Uniaxial ───

/// β-BaB₂O₄, three-resonance fit of Tamošauskas et al., Opt. Mater. Express 8, 1410 (2018).
fn bbo() -> Result<Crystal, MaterialError> {
    let ordinary = axis(
        vec![
            Constant { a: 1.0 },
            WeightedPole { b: 0.90291, c: 0.003926 },
            WeightedPole { b: 0.83155, c: 0.018786 },
            WeightedPole { b: 0.76536, c: 60.01 },
        ],
        Some(ThermalModel::constant(-16.6e-6)),
    );
    let extraordinary = axis(
        vec![
            Constant { a: 1.0 },
            WeightedPole { b: 1.151075, c: 0.007142 },
            WeightedPole { b: 0.21803, c: 0.02259 },
            WeightedPole { b: 0.656, c: 263.0 },
        ],
        Some(ThermalModel::constant(-9.3e-6)),
    );
    Crystal::new(
        "BBO",
        DEFAULT_SOURCE,
        OpticalClass::UniaxialNegative,
        PointGroup::C3v,
        Dispersion::Uniaxial { ordinary, extraordinary },
        NonlinearTensor::from_components(&[("d22", 2.2), ("d31", 0.04), ("d15", 0.04)], true)?,
        Some((189.0, 3500.0)),
    )
}

/// KH₂PO₄.
fn kdp() -> Result<Crystal, MaterialError> {
    let ordinary = axis(
        vec![
            Constant { a: 2.259276 },
            Pole { b: 0.01008956, c: 0.012942625 },
            WeightedPole { b: 13.00522, c: 400.0 },
        ],
        None,
    );
    let extraordinary = axis(
        vec![
            Constant { a: 2.132668 },
            Pole { b: 0.008637494, c: 0.012281043 },
            WeightedPole { b: 3.2279924, c: 400.0 },
        ],
        None,
    );
    Crystal::new(
        "KDP",
        DEFAULT_SOURCE,
        OpticalClass::UniaxialNegative,
        PointGroup::D2d,
        Dispersion::Uniaxial { ordinary, extraordinary },
        NonlinearTensor::from_components(&[("d36", 0.39), ("d14", 0.39)], true)?,
        Some((200.0, 1500.0)),
    )
}

/// KD₂PO₄ (deuterated KDP).
fn dkdp() -> Result<Crystal, MaterialError> {
    let ordinary = axis(
        vec![
            Constant { a: 1.9575544 },
            WeightedPole { b: 0.2901391, c: 0.0281399 },
            Power { d: -0.02824391, exponent: 2 },
            Power { d: 0.004977826, exponent: 4 },
        ],
        None,
    );
    let extraordinary = axis(
        vec![
            Constant { a: 1.5057799 },
            WeightedPole { b: 0.6276034, c: 0.0131558 },
            Power { d: -0.01054063, exponent: 2 },
            Power { d: 0.002243821, exponent: 4 },
        ],
        None,
    );
    Crystal::new(
        "DKDP",
        DEFAULT_SOURCE,
        OpticalClass::UniaxialNegative,
        PointGroup::D2d,
        Dispersion::Uniaxial { ordinary, extraordinary },
        NonlinearTensor::from_components(&[("d36", 0.37), ("d14", 0.37)], true)?,
        Some((200.0, 1500.0)),
    )
}

fn clbo_tensor() -> Result<NonlinearTensor, MaterialError> {
    NonlinearTensor::from_components(&[("d36", 0.95), ("d14", 0.95)], true)
}

/// CsLiB₆O₁₀, CASTECH data sheet.
fn clbo_castech() -> Result<Crystal, MaterialError> {
    let ordinary = axis(
        abcd(2.2104, 0.01018, 0.01424, 0.01258),
        Some(ThermalModel::polynomial(&[(-12.48e-6, 0), (-0.328e-6, -1)])),
    );
    let extraordinary = axis(
        abcd(2.0588, 0.00838, 0.01363, 0.00607),
        Some(ThermalModel::polynomial(&[
            (-8.36e-6, 0),
            (0.047e-6, -1),
            (-0.039e-6, -2),
            (0.014e-6, -3),
        ])),
    );
    Crystal::new(
        "CLBO",
        "CASTECH",
        OpticalClass::UniaxialNegative,
        PointGroup::D2d,
        Dispersion::Uniaxial { ordinary, extraordinary },
        clbo_tensor()?,
        Some((212.8, 1338.2)),
    )
}

/// CsLiB₆O₁₀, Oxide Corp. data sheet.
fn clbo_oxide() -> Result<Crystal, MaterialError> {
    let ordinary = axis(
        abcd(2.2145, 0.00890, 0.02051, 0.01413),
        Some(ThermalModel::polynomial(&[(-1.04e-6, 2), (0.35e-6, 1), (-12.91e-6, 0)])),
    );
    let extraordinary = axis(
        abcd(2.0588, 0.00866, 0.01202, 0.00607),
        Some(ThermalModel::polynomial(&[(3.31e-6, 2), (-2.43e-6, 1), (-8.40e-6, 0)])),
    );
    Crystal::new(
        "CLBO",
        "OXIDE",
        OpticalClass::UniaxialNegative,
        PointGroup::D2d,
        Dispersion::Uniaxial { ordinary, extraordinary },
        clbo_tensor()?,
        Some((180.0, 2750.0)),
    )
}

// ─── Biaxial ───

/// LBO in the optical frame ($x \parallel a$, $y \parallel c$, $z \parallel b$),
/// so the polar axis is $y$. In crystallographic labels these are
/// $d_{31} = 1.05$, $d_{32} = 0.85$ and $d_{33} = 0.05$ pm/V.
fn lbo_tensor() -> Result<NonlinearTensor, MaterialError> {
    NonlinearTensor::from_components(
        &[("d21", 1.05), ("d23", 0.85), ("d22", 0.05), ("d16", 1.05), ("d34", 0.85)],
        true,
    )
}

/// LiB₃O₅, CASTECH data sheet.
fn lbo_castech() -> Result<Crystal, MaterialError> {
    let x = axis(
        vec![
            Constant { a: 2.454140 },
            Pole { b: 0.011249, c: 0.011350 },
            Power { d: -0.014591, exponent: 2 },
            Power { d: -6.60e-5, exponent: 4 },
        ],
        Some(ThermalModel::constant(-9.3e-6)),
    );
    let y = axis(
        vec![
            Constant { a: 2.539070 },
            Pole { b: 0.012711, c: 0.012523 },
            Power { d: -0.018540, exponent: 2 },
            Power { d: 2.00e-4, exponent: 4 },
        ],
        Some(ThermalModel::constant(-13.6e-6)),
    );
    let z = axis(
        vec![
            Constant { a: 2.586179 },
            Pole { b: 0.013099, c: 0.011893 },
            Power { d: -0.017968, exponent: 2 },
            Power { d: -2.26e-4, exponent: 4 },
        ],
        Some(ThermalModel::polynomial(&[(-6.3e-6, 0), (-2.1e-6, 1)])),
    );
    Crystal::new(
        "LBO",
        "CASTECH",
        OpticalClass::Biaxial,
        PointGroup::C2v,
        Dispersion::Biaxial { x, y, z },
        lbo_tensor()?,
        Some((160.0, 2600.0)),
    )
}

/// LiB₃O₅, Thorlabs data with quadratic temperature dependence.
fn lbo_thorlabs() -> Result<Crystal, MaterialError> {
    let x = axis(
        abcd(2.4542, 0.01125, 0.01135, 0.01388),
        Some(ThermalModel::quadratic(29.13e-3, &[(-3.76e-6, 1), (2.30e-6, 0)])),
    );
    let y = axis(
        vec![
            Constant { a: 2.5390 },
            Pole { b: 0.01277, c: 0.01189 },
            Power { d: -0.01849, exponent: 2 },
            Power { d: 4.3025e-5, exponent: 4 },
            Power { d: -2.9131e-5, exponent: 6 },
        ],
        Some(ThermalModel::quadratic(-32.89e-4, &[(6.01e-6, 1), (-19.40e-6, 0)])),
    );
    let z = axis(
        vec![
            Constant { a: 2.5865 },
            Pole { b: 0.01310, c: 0.01223 },
            Power { d: -0.01862, exponent: 2 },
            Power { d: 4.5778e-5, exponent: 4 },
            Power { d: -3.2526e-5, exponent: 6 },
        ],
        Some(ThermalModel::quadratic(-74.49e-4, &[(1.50e-6, 1), (-9.70e-6, 0)])),
    );
    Crystal::new(
        "LBO",
        "Thorlabs",
        OpticalClass::Biaxial,
        PointGroup::C2v,
        Dispersion::Biaxial { x, y, z },
        lbo_tensor()?,
        Some((160.0, 2600.0)),
    )
}

/// KTiOPO₄ (flux grown).
fn ktp() -> Result<Crystal, MaterialError> {
    let x = axis(abcd(3.0065, 0.03901, 0.04251, 0.01327), Some(ThermalModel::constant(1.1e-5)));
    let y = axis(abcd(3.0333, 0.04154, 0.04547, 0.01408), Some(ThermalModel::constant(1.3e-5)));
    let z = axis(abcd(3.3134, 0.05694, 0.05658, 0.01682), Some(ThermalModel::constant(1.6e-5)));
    Crystal::new(
        "KTP",
        DEFAULT_SOURCE,
        OpticalClass::Biaxial,
        PointGroup::C2v,
        Dispersion::Biaxial { x, y, z },
        NonlinearTensor::from_components(
            &[("d31", 2.20), ("d32", 3.70), ("d33", 14.6), ("d15", 2.2), ("d24", 3.7)],
            true,
        )?,
        Some((350.0, 4500.0)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::IndexProvider;
    use approx::assert_relative_eq;

    #[test]
    fn test_builtin_records_validate() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 8);
        for c in catalog.iter() {
            c.validate().unwrap_or_else(|e| panic!("{} ({}): {e}", c.name, c.source));
        }
        assert_eq!(catalog.names(), vec!["BBO", "KDP", "DKDP", "CLBO", "LBO", "KTP"]);
    }

    #[test]
    fn test_default_and_named_sources() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.crystal("lbo", None).unwrap().source, "CASTECH");
        assert_eq!(catalog.crystal("LBO", Some("thorlabs")).unwrap().source, "Thorlabs");
        assert_eq!(catalog.sources("CLBO"), vec!["CASTECH", "OXIDE"]);
        assert!(matches!(
            catalog.crystal("LBO", Some("nobody")),
            Err(MaterialError::NotFound(_))
        ));
        assert!(matches!(catalog.crystal("GaAs", None), Err(MaterialError::NotFound(_))));
    }

    #[test]
    fn test_insert_replaces_same_source() {
        let mut catalog = Catalog::builtin().unwrap();
        let mut bbo = catalog.crystal("BBO", None).unwrap().clone();
        bbo.reference_temperature = 25.0;
        catalog.insert(bbo);
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.crystal("BBO", None).unwrap().reference_temperature, 25.0);
    }

    #[test]
    fn test_bbo_indices_at_1064() {
        let catalog = Catalog::builtin().unwrap();
        let n = catalog
            .crystal("BBO", None)
            .unwrap()
            .principal_indices(1064.0, 20.0)
            .unwrap();
        assert_relative_eq!(n.nx, 1.6544, epsilon = 1e-4);
        assert_relative_eq!(n.nz, 1.5421, epsilon = 1e-4);
        assert_eq!(n.nx, n.ny);
    }

    #[test]
    fn test_biaxial_ordering() {
        let catalog = Catalog::builtin().unwrap();
        for name in ["LBO", "KTP"] {
            for source in catalog.sources(name) {
                let n = catalog
                    .crystal(name, Some(source))
                    .unwrap()
                    .principal_indices(1064.0, 20.0)
                    .unwrap();
                assert!(n.nx < n.ny && n.ny < n.nz, "{name} {source}: {n:?}");
            }
        }
    }

    #[test]
    fn test_mm2_polar_axis_in_optical_frame() {
        let catalog = Catalog::builtin().unwrap();
        for source in catalog.sources("LBO") {
            let t = &catalog.crystal("LBO", Some(source)).unwrap().nonlinear;
            assert_eq!(t.get(2, 3), 0.85);
            assert_eq!(t.get(2, 1), 1.05);
            assert_eq!(t.get(3, 1), 0.0);
            assert_eq!(t.get(3, 2), 0.0);
        }
        let ktp = &catalog.crystal("KTP", None).unwrap().nonlinear;
        assert_eq!(ktp.get(3, 3), 14.6);
        assert_eq!(ktp.get(2, 3), 0.0);
    }

    #[test]
    fn test_kdp_has_no_thermal_model() {
        let catalog = Catalog::builtin().unwrap();
        assert!(!catalog.crystal("KDP", None).unwrap().has_thermal_model());
        assert!(catalog.crystal("BBO", None).unwrap().has_thermal_model());
    }
}
