//! # Interferometric detector registry
//!
//! Ground-based gravitational-wave detectors are described by the Earth-fixed position of their
//! vertex and the unit vectors along their two arms (values from `LALDetectors.h`). The
//! response tensor `d = ½ (u uᵀ − v vᵀ)` is derived from the arm directions.
//!
//! Detector identifiers are two-character prefixes (`"H1"`, `"L1"`, `"V1"`, …). Lists may be
//! given as a slice or as a comma-separated string (`"H1, L1"`, spaces ignored).

use std::fmt;
use std::sync::LazyLock;

use nalgebra::{Matrix3, Vector3};
use regex::Regex;
use tracing::debug;

use crate::cw_errors::CwError;

static DETECTOR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9]$").expect("detector name pattern is a valid regex")
});

/// A ground-based interferometer in the Earth-fixed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detector {
    /// Two-character identifier, e.g. `"H1"`.
    pub name: &'static str,
    /// Human-readable site name.
    pub site: &'static str,
    /// Vertex position, meters, Earth-fixed.
    vertex: [f64; 3],
    /// Unit vector along the X arm, Earth-fixed.
    x_arm: [f64; 3],
    /// Unit vector along the Y arm, Earth-fixed.
    y_arm: [f64; 3],
}

const LHO_VERTEX: [f64; 3] = [-2.161_414_926_36e6, -3.834_695_178_89e6, 4.600_350_226_64e6];
const LHO_X_ARM: [f64; 3] = [-0.223_892_661_54, 0.799_830_627_46, 0.556_904_878_31];
const LHO_Y_ARM: [f64; 3] = [-0.913_978_185_74, 0.026_094_039_89, -0.404_923_421_25];

static REGISTRY: [Detector; 6] = [
    Detector {
        name: "H1",
        site: "LIGO Hanford Observatory",
        vertex: LHO_VERTEX,
        x_arm: LHO_X_ARM,
        y_arm: LHO_Y_ARM,
    },
    Detector {
        name: "H2",
        site: "LIGO Hanford Observatory (2 km)",
        vertex: LHO_VERTEX,
        x_arm: LHO_X_ARM,
        y_arm: LHO_Y_ARM,
    },
    Detector {
        name: "L1",
        site: "LIGO Livingston Observatory",
        vertex: [-7.427_604_472_38e4, -5.496_283_719_71e6, 3.224_257_017_44e6],
        x_arm: [-0.954_574_121_53, -0.141_580_773_40, -0.262_189_113_24],
        y_arm: [0.297_741_568_94, -0.487_910_336_47, -0.820_544_612_86],
    },
    Detector {
        name: "V1",
        site: "Virgo",
        vertex: [4.546_374_099e6, 8.429_896_976_26e5, 4.378_576_962_41e6],
        x_arm: [-0.700_458_214_79, 0.208_489_486_19, 0.682_561_662_77],
        y_arm: [-0.053_792_553_68, -0.969_081_805_49, 0.240_804_517_08],
    },
    Detector {
        name: "G1",
        site: "GEO600",
        vertex: [3.856_309_949_26e6, 6.665_989_563_17e5, 5.019_641_417_25e6],
        x_arm: [-0.445_306_769_05, 0.866_513_541_30, 0.225_513_113_12],
        y_arm: [-0.626_057_567_76, -0.552_186_095_24, 0.550_583_724_86],
    },
    Detector {
        name: "K1",
        site: "KAGRA",
        vertex: [-3.777_336_024e6, 3.484_898_411e6, 3.765_313_697e6],
        x_arm: [-0.375_904_0, -0.836_158_3, 0.399_418_9],
        y_arm: [0.716_437_8, 0.011_140_76, 0.697_562_0],
    },
];

impl Detector {
    /// Resolve a detector from its two-character identifier.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::MalformedDetectorName`] if `name` is not of the form `[A-Z][A-Z0-9]`.
    /// * [`CwError::UnknownDetector`] if the identifier is well-formed but not registered.
    pub fn from_name(name: &str) -> Result<Self, CwError> {
        if !DETECTOR_NAME.is_match(name) {
            return Err(CwError::MalformedDetectorName(name.to_string()));
        }
        REGISTRY
            .iter()
            .find(|det| det.name == name)
            .copied()
            .ok_or_else(|| CwError::UnknownDetector(name.to_string()))
    }

    /// All registered detectors.
    pub fn registry() -> &'static [Detector] {
        &REGISTRY
    }

    /// Vertex position in the Earth-fixed frame, meters.
    pub fn vertex(&self) -> Vector3<f64> {
        Vector3::from(self.vertex)
    }

    /// Arm unit vectors `(u, v)` in the Earth-fixed frame.
    pub fn arms(&self) -> (Vector3<f64>, Vector3<f64>) {
        (Vector3::from(self.x_arm), Vector3::from(self.y_arm))
    }

    /// Response tensor `d = ½ (u uᵀ − v vᵀ)` in the Earth-fixed frame.
    pub fn response_tensor(&self) -> Matrix3<f64> {
        let (u, v) = self.arms();
        0.5 * (u * u.transpose() - v * v.transpose())
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An explicit list of detectors, as a comma-separated string or a list of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorSpec {
    Csv(String),
    List(Vec<String>),
}

impl From<&str> for DetectorSpec {
    fn from(s: &str) -> Self {
        DetectorSpec::Csv(s.to_string())
    }
}

impl From<String> for DetectorSpec {
    fn from(s: String) -> Self {
        DetectorSpec::Csv(s)
    }
}

impl From<Vec<String>> for DetectorSpec {
    fn from(v: Vec<String>) -> Self {
        DetectorSpec::List(v)
    }
}

impl From<&[&str]> for DetectorSpec {
    fn from(v: &[&str]) -> Self {
        DetectorSpec::List(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DetectorSpec {
    fn from(v: [&str; N]) -> Self {
        DetectorSpec::List(v.iter().map(|s| s.to_string()).collect())
    }
}

impl DetectorSpec {
    /// Names as given by the caller, after removing blanks from a comma-separated string.
    pub fn names(&self) -> Vec<String> {
        match self {
            DetectorSpec::Csv(s) => {
                debug!("Converting detector string {s:?} to list");
                s.replace(' ', "").split(',').map(str::to_string).collect()
            }
            DetectorSpec::List(v) => v.iter().map(|s| s.trim().to_string()).collect(),
        }
    }

    /// Resolve every name against the registry, rejecting duplicates.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::MalformedDetectorName`] / [`CwError::UnknownDetector`] for bad names.
    /// * [`CwError::DuplicateDetector`] if a detector appears twice.
    pub fn parse(&self) -> Result<Vec<Detector>, CwError> {
        parse_detectors(self.names())
    }
}

/// Resolve a sequence of detector names, rejecting duplicates.
pub fn parse_detectors<I, S>(names: I) -> Result<Vec<Detector>, CwError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut detectors: Vec<Detector> = Vec::new();
    for name in names {
        let det = Detector::from_name(name.as_ref())?;
        if detectors.iter().any(|d| d.name == det.name) {
            return Err(CwError::DuplicateDetector(det.name.to_string()));
        }
        detectors.push(det);
    }
    Ok(detectors)
}

#[cfg(test)]
mod detectors_test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::constants::REARTH_SI;
    use crate::cw_errors::ErrorKind;

    #[test]
    fn test_registry_geometry() {
        for det in Detector::registry() {
            let (u, v) = det.arms();
            assert_relative_eq!(u.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-6);
            assert!(u.dot(&v).abs() < 1e-3, "{} arms not orthogonal", det.name);

            let r = det.vertex().norm();
            assert!((r - REARTH_SI).abs() < 3e4, "{} vertex radius {r}", det.name);

            let d = det.response_tensor();
            assert_relative_eq!(d, d.transpose(), epsilon = 1e-15);
            assert!(d.trace().abs() < 1e-6);
        }
    }

    #[test]
    fn test_parse_csv_with_spaces() {
        let dets = DetectorSpec::from("H1, L1,V1").parse().unwrap();
        let names: Vec<_> = dets.iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["H1", "L1", "V1"]);
    }

    #[test]
    fn test_parse_errors() {
        let err = DetectorSpec::from("H1,X7").parse().unwrap_err();
        assert_eq!(err, CwError::UnknownDetector("X7".into()));
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = DetectorSpec::from("H1,,L1").parse().unwrap_err();
        assert_eq!(err, CwError::MalformedDetectorName("".into()));

        let err = DetectorSpec::from(["h1"]).parse().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = DetectorSpec::from("L1,L1").parse().unwrap_err();
        assert_eq!(err, CwError::DuplicateDetector("L1".into()));
    }
}
