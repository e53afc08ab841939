//! Core types shared across the solver stack.
//!
//! Requests are described by a [`WavelengthTriplet`], an [`InteractionType`]
//! and either a [`PolarizationType`] or an explicit [`WaveAssignment`].
//! Solvers return immutable [`PhaseMatchingSolution`]s, which the
//! nonlinearity and acceptance modules consume.
//!
//! Angles are stored in radians, wavelengths in nanometres, temperatures in
//! degrees Celsius.

use std::fmt;

use phasematch_materials::{CrystalAxis, PointGroup};
use serde::{Deserialize, Serialize};

use crate::error::PhaseMatchError;

/// Three-wave process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionType {
    /// Second-harmonic generation, $\omega + \omega \to 2\omega$.
    #[serde(rename = "SHG", alias = "shg")]
    Shg,
    /// Sum-frequency generation, $\omega_1 + \omega_2 \to \omega_3$.
    #[serde(rename = "SFG", alias = "sfg")]
    Sfg,
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionType::Shg => f.write_str("SHG"),
            InteractionType::Sfg => f.write_str("SFG"),
        }
    }
}

/// Polarization of one wave relative to the principal section.
///
/// In a biaxial principal plane "ordinary" is the wave polarised along the
/// axis normal to the plane and "extraordinary" the in-plane wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarization {
    Ordinary,
    Extraordinary,
}

impl Polarization {
    pub fn symbol(&self) -> char {
        match self {
            Polarization::Ordinary => 'o',
            Polarization::Extraordinary => 'e',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'o' => Some(Polarization::Ordinary),
            'e' => Some(Polarization::Extraordinary),
            _ => None,
        }
    }
}

/// Polarizations of (input 1, input 2, output), written e.g. `ooe` for
/// $o + o \to e$.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WaveAssignment {
    pub input1: Polarization,
    pub input2: Polarization,
    pub output: Polarization,
}

const O: Polarization = Polarization::Ordinary;
const E: Polarization = Polarization::Extraordinary;

impl WaveAssignment {
    pub const OOE: Self = Self::new(O, O, E);
    pub const EEO: Self = Self::new(E, E, O);
    pub const OEE: Self = Self::new(O, E, E);
    pub const EOE: Self = Self::new(E, O, E);
    pub const OEO: Self = Self::new(O, E, O);
    pub const EOO: Self = Self::new(E, O, O);

    pub const fn new(input1: Polarization, input2: Polarization, output: Polarization) -> Self {
        Self { input1, input2, output }
    }

    /// Distinct modes worth solving for an interaction. For SHG the two
    /// inputs are the same wave, so `oee` and `eoe` coincide.
    pub fn all_for(interaction: InteractionType) -> Vec<Self> {
        match interaction {
            InteractionType::Shg => vec![Self::OOE, Self::EEO, Self::OEE, Self::OEO],
            InteractionType::Sfg => vec![
                Self::OOE,
                Self::EEO,
                Self::OEE,
                Self::EOE,
                Self::OEO,
                Self::EOO,
            ],
        }
    }

    pub fn label(&self) -> String {
        [self.input1, self.input2, self.output]
            .iter()
            .map(Polarization::symbol)
            .collect()
    }

    /// Parse a three-letter label such as `"oee"`.
    pub fn parse(label: &str) -> Result<Self, PhaseMatchError> {
        let bad = || PhaseMatchError::InvalidRequest(format!("invalid wave assignment '{label}'"));
        let pols: Vec<Polarization> = label
            .trim()
            .chars()
            .map(|c| Polarization::from_symbol(c).ok_or_else(bad))
            .collect::<Result<_, _>>()?;
        match pols.as_slice() {
            &[a, b, c] => Ok(Self::new(a, b, c)),
            _ => Err(bad()),
        }
    }

    /// Type I / Type II classification given the (effective) optical sign.
    pub fn polarization_type(&self, negative: bool) -> Option<PolarizationType> {
        [PolarizationType::TypeI, PolarizationType::TypeII]
            .into_iter()
            .find(|t| {
                let a = t.assignment(negative);
                a.output == self.output
                    && ((a.input1, a.input2) == (self.input1, self.input2)
                        || (a.input2, a.input1) == (self.input1, self.input2))
            })
    }

    /// Same polarization on all three waves; not a birefringent phase match.
    pub fn is_uniform(&self) -> bool {
        self.input1 == self.input2 && self.input2 == self.output
    }
}

impl fmt::Display for WaveAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl TryFrom<String> for WaveAssignment {
    type Error = PhaseMatchError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        WaveAssignment::parse(&s)
    }
}

impl From<WaveAssignment> for String {
    fn from(a: WaveAssignment) -> Self {
        a.label()
    }
}

/// Standard three-wave polarization conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolarizationType {
    #[serde(rename = "type_i", alias = "I")]
    TypeI,
    #[serde(rename = "type_ii", alias = "II")]
    TypeII,
}

impl PolarizationType {
    /// Wave assignment for a crystal (or principal plane) of the given sign.
    ///
    /// | Sign | Type I | Type II |
    /// |------|--------|---------|
    /// | negative | $o + o \to e$ | $o + e \to e$ |
    /// | positive | $e + e \to o$ | $o + e \to o$ |
    pub fn assignment(&self, negative: bool) -> WaveAssignment {
        match (self, negative) {
            (PolarizationType::TypeI, true) => WaveAssignment::OOE,
            (PolarizationType::TypeII, true) => WaveAssignment::OEE,
            (PolarizationType::TypeI, false) => WaveAssignment::EEO,
            (PolarizationType::TypeII, false) => WaveAssignment::OEO,
        }
    }
}

impl fmt::Display for PolarizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolarizationType::TypeI => f.write_str("Type I"),
            PolarizationType::TypeII => f.write_str("Type II"),
        }
    }
}

/// Vacuum wavelengths (nm) of the two inputs and the output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavelengthTriplet {
    pub lambda1: f64,
    pub lambda2: f64,
    pub lambda3: f64,
}

impl WavelengthTriplet {
    pub fn new(lambda1: f64, lambda2: f64, lambda3: f64) -> Self {
        Self { lambda1, lambda2, lambda3 }
    }

    /// Second harmonic of `lambda1`.
    pub fn shg(lambda1: f64) -> Self {
        Self::new(lambda1, lambda1, lambda1 / 2.0)
    }

    /// Sum frequency of `lambda1` and `lambda2`.
    pub fn sfg(lambda1: f64, lambda2: f64) -> Self {
        Self::new(lambda1, lambda2, lambda1 * lambda2 / (lambda1 + lambda2))
    }

    /// Same ratio $\lambda_2/\lambda_1$ with a new fundamental; $\lambda_3$
    /// follows from energy conservation.
    pub fn with_fundamental(&self, lambda1: f64) -> Self {
        let lambda2 = self.lambda2 * lambda1 / self.lambda1;
        Self::sfg(lambda1, lambda2)
    }

    /// Check energy conservation to a relative tolerance.
    ///
    /// For SHG $\lambda_1 = \lambda_2$ and $1/\lambda_3 = 2/\lambda_1$;
    /// for SFG $1/\lambda_3 = 1/\lambda_1 + 1/\lambda_2$.
    pub fn validate(
        &self,
        interaction: InteractionType,
        tolerance: f64,
    ) -> Result<(), PhaseMatchError> {
        let all = [self.lambda1, self.lambda2, self.lambda3];
        if all.iter().any(|l| !(l.is_finite() && *l > 0.0)) {
            return Err(PhaseMatchError::InvalidRequest(format!(
                "wavelengths must be positive and finite, got {all:?} nm"
            )));
        }

        let mut relative_error =
            ((1.0 / self.lambda3 - 1.0 / self.lambda1 - 1.0 / self.lambda2) * self.lambda3).abs();
        if interaction == InteractionType::Shg {
            relative_error = relative_error.max((self.lambda1 - self.lambda2).abs() / self.lambda1);
        }
        if relative_error > tolerance {
            return Err(PhaseMatchError::MalformedWavelengthTriplet {
                lambda1: self.lambda1,
                lambda2: self.lambda2,
                lambda3: self.lambda3,
                relative_error,
            });
        }
        Ok(())
    }
}

/// Principal plane of a biaxial crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalPlane {
    XY,
    XZ,
    YZ,
}

impl PrincipalPlane {
    pub const ALL: [PrincipalPlane; 3] = [PrincipalPlane::XY, PrincipalPlane::YZ, PrincipalPlane::XZ];

    /// Axis normal to the plane; the "ordinary" wave is polarised along it.
    pub fn static_axis(&self) -> CrystalAxis {
        match self {
            PrincipalPlane::XY => CrystalAxis::Z,
            PrincipalPlane::XZ => CrystalAxis::Y,
            PrincipalPlane::YZ => CrystalAxis::X,
        }
    }

    /// Axes $(a, b)$ of the in-plane index ellipse
    /// $1/n^2 = \cos^2\alpha/n_a^2 + \sin^2\alpha/n_b^2$.
    pub fn ellipse_axes(&self) -> (CrystalAxis, CrystalAxis) {
        match self {
            PrincipalPlane::XY => (CrystalAxis::Y, CrystalAxis::X),
            PrincipalPlane::XZ => (CrystalAxis::X, CrystalAxis::Z),
            PrincipalPlane::YZ => (CrystalAxis::Y, CrystalAxis::Z),
        }
    }

    /// Name of the tuning angle in this plane.
    pub fn tuning_parameter(&self) -> TunedParameter {
        match self {
            PrincipalPlane::XY => TunedParameter::Phi,
            PrincipalPlane::XZ | PrincipalPlane::YZ => TunedParameter::Theta,
        }
    }

    /// Direction at tuning angle `alpha` (rad) within this plane.
    pub fn geometry(&self, alpha: f64) -> Geometry {
        let (theta, phi) = match self {
            PrincipalPlane::XY => (std::f64::consts::FRAC_PI_2, alpha),
            PrincipalPlane::XZ => (alpha, 0.0),
            PrincipalPlane::YZ => (alpha, std::f64::consts::FRAC_PI_2),
        };
        Geometry {
            theta,
            phi,
            plane: Some(*self),
        }
    }
}

impl fmt::Display for PrincipalPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Propagation along a principal axis (non-critical phase matching).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropagationAxis {
    X,
    Y,
    Z,
}

impl PropagationAxis {
    pub fn geometry(&self) -> Geometry {
        match self {
            PropagationAxis::X => PrincipalPlane::XY.geometry(0.0),
            PropagationAxis::Y => PrincipalPlane::XY.geometry(std::f64::consts::FRAC_PI_2),
            PropagationAxis::Z => PrincipalPlane::XZ.geometry(0.0),
        }
    }
}

/// Angular tolerance for recognising a principal plane from $(\theta, \phi)$.
const PLANE_TOLERANCE: f64 = 1e-9;

/// Propagation direction: polar angle $\theta$ from $z$ and azimuth $\phi$
/// from $x$ (radians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub theta: f64,
    pub phi: f64,
    /// Principal plane the direction was solved in, for biaxial crystals.
    #[serde(default)]
    pub plane: Option<PrincipalPlane>,
}

impl Geometry {
    pub fn new(theta: f64, phi: f64) -> Self {
        Self { theta, phi, plane: None }
    }

    pub fn from_degrees(theta_deg: f64, phi_deg: f64) -> Self {
        Self::new(theta_deg.to_radians(), phi_deg.to_radians())
    }

    pub fn theta_deg(&self) -> f64 {
        self.theta.to_degrees()
    }

    pub fn phi_deg(&self) -> f64 {
        self.phi.to_degrees()
    }

    /// The principal plane containing this direction, either as tagged or
    /// recognised from the angles. The $z$ axis lies in both XZ and YZ and
    /// is reported as XZ whatever its azimuth.
    pub fn principal_plane(&self) -> Option<PrincipalPlane> {
        use std::f64::consts::FRAC_PI_2;
        if self.plane.is_some() {
            return self.plane;
        }
        if self.phi.abs() < PLANE_TOLERANCE {
            Some(PrincipalPlane::XZ)
        } else if (self.phi - FRAC_PI_2).abs() < PLANE_TOLERANCE {
            Some(PrincipalPlane::YZ)
        } else if self.theta.sin().abs() < PLANE_TOLERANCE {
            Some(PrincipalPlane::XZ)
        } else if (self.theta - FRAC_PI_2).abs() < PLANE_TOLERANCE {
            Some(PrincipalPlane::XY)
        } else {
            None
        }
    }

    /// Tuning angle within a plane.
    pub fn tuning_angle(&self, plane: PrincipalPlane) -> f64 {
        match plane {
            PrincipalPlane::XY => self.phi,
            PrincipalPlane::XZ | PrincipalPlane::YZ => self.theta,
        }
    }
}

/// A point in the (direction, temperature) space of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub geometry: Geometry,
    pub temperature: f64,
}

/// Which variable a solve searched over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunedParameter {
    Theta,
    Phi,
    Temperature,
}

impl TunedParameter {
    pub fn name(&self) -> &'static str {
        match self {
            TunedParameter::Theta => "theta",
            TunedParameter::Phi => "phi",
            TunedParameter::Temperature => "temperature",
        }
    }
}

/// Convergence quality of a refined root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Convergence {
    /// $|\Delta n|$ at the returned root.
    pub residual: f64,
    pub iterations: usize,
}

/// A solved phase-matching condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseMatchingSolution {
    pub crystal: String,
    pub source: String,
    pub interaction: InteractionType,
    /// `None` when solved for an explicit assignment outside Type I/II.
    pub polarization: Option<PolarizationType>,
    pub assignment: WaveAssignment,
    pub wavelengths: WavelengthTriplet,
    pub condition: Condition,
    pub tuned: TunedParameter,
    pub convergence: Convergence,
}

impl PhaseMatchingSolution {
    pub fn geometry(&self) -> &Geometry {
        &self.condition.geometry
    }

    pub fn temperature(&self) -> f64 {
        self.condition.temperature
    }

    pub fn theta_deg(&self) -> f64 {
        self.condition.geometry.theta_deg()
    }

    pub fn phi_deg(&self) -> f64 {
        self.condition.geometry.phi_deg()
    }

    /// Value of the tuned variable (rad or °C).
    pub fn tuned_value(&self) -> f64 {
        match self.tuned {
            TunedParameter::Theta => self.condition.geometry.theta,
            TunedParameter::Phi => self.condition.geometry.phi,
            TunedParameter::Temperature => self.condition.temperature,
        }
    }
}

/// Effective nonlinear coefficient at one geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonlinearCoefficientResult {
    /// $d_{\text{eff}}$ in the units of the source tensor (pm/V), with sign.
    pub d_eff: f64,
    pub point_group: PointGroup,
    pub geometry: Geometry,
    pub interaction: InteractionType,
    pub assignment: WaveAssignment,
}

/// Numerical settings shared by all solvers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Coarse-scan samples over the search interval (at least 200 are used).
    pub scan_samples: usize,
    /// Angular root tolerance (rad).
    pub angle_tolerance: f64,
    /// Temperature root tolerance (°C).
    pub temperature_tolerance: f64,
    /// Iteration budget of one refinement.
    pub max_iterations: usize,
    /// Relative energy-conservation tolerance of a wavelength triplet.
    pub energy_tolerance: f64,
    /// $|\Delta n|$ below which a tangential minimum counts as a match.
    pub degeneracy_tolerance: f64,
    /// Temperature search band (°C).
    pub temperature_range: (f64, f64),
    /// Default crystal temperature for angle tuning (°C).
    pub reference_temperature: f64,
}

/// Fewest coarse-scan samples a solve will use.
pub const MIN_SCAN_SAMPLES: usize = 200;

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            scan_samples: 400,
            angle_tolerance: 1e-6,
            temperature_tolerance: 1e-6,
            max_iterations: 100,
            energy_tolerance: 1e-9,
            degeneracy_tolerance: 1e-10,
            temperature_range: (-50.0, 200.0),
            reference_temperature: 20.0,
        }
    }
}

impl SolverConfig {
    /// Effective number of scan samples.
    pub fn samples(&self) -> usize {
        self.scan_samples.max(MIN_SCAN_SAMPLES)
    }

    pub fn validate(&self) -> Result<(), PhaseMatchError> {
        let positive = [
            ("angle_tolerance", self.angle_tolerance),
            ("temperature_tolerance", self.temperature_tolerance),
            ("energy_tolerance", self.energy_tolerance),
            ("degeneracy_tolerance", self.degeneracy_tolerance),
        ];
        if let Some((name, v)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(PhaseMatchError::InvalidRequest(format!(
                "{name} must be positive, got {v}"
            )));
        }
        if self.max_iterations == 0 {
            return Err(PhaseMatchError::InvalidRequest("max_iterations must be > 0".into()));
        }
        let (lo, hi) = self.temperature_range;
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(PhaseMatchError::InvalidRequest(format!(
                "invalid temperature range [{lo}, {hi}] °C"
            )));
        }
        Ok(())
    }
}
