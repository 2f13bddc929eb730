use thiserror::Error;

/// Taxonomy of failures raised by the crate.
///
/// Every [`CwError`] variant belongs to exactly one kind, see [`CwError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input dimensionality or non-numeric values.
    Shape,
    /// Mutually exclusive, incomplete or out-of-range configuration.
    Configuration,
    /// Unrecognized or malformed identifiers and text tables.
    Parse,
    /// A physically required invariant of a result is violated.
    Computation,
    /// The external report executable is missing or failed.
    ExternalTool,
    /// File-system access failed.
    Io,
}

#[derive(Error, Debug)]
pub enum CwError {
    #[error("Timestamp input must be one-dimensional, got a {rows}x{cols} array")]
    NotOneDimensional { rows: usize, cols: usize },

    #[error("Timestamp input contains a non-numeric value {value} at index {index}")]
    NonNumericTimestamp { index: usize, value: f64 },

    #[error("Per-detector timestamps are redundant with the explicit detector list {0:?}")]
    RedundantDetectors(Vec<String>),

    #[error("A shared timestamp sequence needs an explicit detector list")]
    MissingDetectors,

    #[error("Detector {0} is listed more than once")]
    DuplicateDetector(String),

    #[error("Timestamp series of detector {0} is empty")]
    EmptyTimestamps(String),

    #[error("Invalid SFT baseline Tsft = {0} s (must be finite and positive)")]
    InvalidTsft(f64),

    #[error("Need either `noise_weights` or `assume_sqrt_sx` to account for background noise, but not both")]
    NoiseSourceConflict { weights: bool, sqrt_sx: bool },

    #[error("Invalid assumed amplitude spectral density: {0}")]
    InvalidSqrtSX(f64),

    #[error("Need either (h0, cosi) or (aPlus, aCross), but not both; incomplete or conflicting fields: {0:?}")]
    AmplitudeBasisConflict(Vec<&'static str>),

    #[error("Detector sets differ: {context} has {found:?}, expected {expected:?}")]
    DetectorMismatch {
        context: &'static str,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Detector {detector}: {context} has {found} samples, expected {expected}")]
    SampleCountMismatch {
        detector: String,
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("GPS time {gps} s is outside the ephemeris range [{start}, {end}]")]
    EphemerisOutOfRange { gps: f64, start: f64, end: f64 },

    #[error("Invalid ephemeris configuration: {0}")]
    InvalidEphemeris(String),

    #[error("Invalid spin range: {0}")]
    InvalidSpinRange(String),

    #[error("Invalid binary orbit bounds: {0}")]
    InvalidOrbitBounds(String),

    #[error("Invalid noise estimation input: {0}")]
    InvalidNoiseInput(String),

    #[error("Parameter {0} cannot be handled by the loudest-candidate report (glitch parameters are unsupported)")]
    UnsupportedReportParameter(String),

    #[error("Unknown detector: {0}")]
    UnknownDetector(String),

    #[error("Malformed detector identifier: {0:?}")]
    MalformedDetectorName(String),

    #[error("Error during the ephemeris table parsing: {0}")]
    EphemerisParsingError(String),

    #[error("Observation end {end} precedes its start {start}")]
    InvertedTimeRange { start: f64, end: f64 },

    #[error("Got invalid pair min_freq={min}, max_freq={max} for the covering band")]
    InvalidCoveringBand { min: f64, max: f64 },

    #[error("Invalid optimal SNR^2: {0}")]
    InvalidSnr2(f64),

    #[error("Antenna pattern matrix is not positive semi-definite: {0}")]
    InvalidAntennaPattern(String),

    #[error("Could not find either lalpulsar or lalapps version of command {0}")]
    ExecutableNotFound(String),

    #[error("Command {command} exited with status {status:?}: {stderr}")]
    NonZeroExit {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl CwError {
    /// Classify this error within the crate-wide taxonomy.
    pub fn kind(&self) -> ErrorKind {
        use CwError::*;
        match self {
            NotOneDimensional { .. } | NonNumericTimestamp { .. } => ErrorKind::Shape,

            RedundantDetectors(_)
            | MissingDetectors
            | DuplicateDetector(_)
            | EmptyTimestamps(_)
            | InvalidTsft(_)
            | NoiseSourceConflict { .. }
            | InvalidSqrtSX(_)
            | AmplitudeBasisConflict(_)
            | DetectorMismatch { .. }
            | SampleCountMismatch { .. }
            | EphemerisOutOfRange { .. }
            | InvalidEphemeris(_)
            | InvalidSpinRange(_)
            | InvalidOrbitBounds(_)
            | InvalidNoiseInput(_)
            | UnsupportedReportParameter(_) => ErrorKind::Configuration,

            UnknownDetector(_) | MalformedDetectorName(_) | EphemerisParsingError(_) => {
                ErrorKind::Parse
            }

            InvertedTimeRange { .. }
            | InvalidCoveringBand { .. }
            | InvalidSnr2(_)
            | InvalidAntennaPattern(_) => ErrorKind::Computation,

            ExecutableNotFound(_) | NonZeroExit { .. } => ErrorKind::ExternalTool,

            IoError(_) => ErrorKind::Io,
        }
    }
}

impl PartialEq for CwError {
    fn eq(&self, other: &Self) -> bool {
        use CwError::*;
        match (self, other) {
            (
                NotOneDimensional { rows: r1, cols: c1 },
                NotOneDimensional { rows: r2, cols: c2 },
            ) => r1 == r2 && c1 == c2,
            (
                NonNumericTimestamp { index: i1, .. },
                NonNumericTimestamp { index: i2, .. },
            ) => i1 == i2,
            (RedundantDetectors(a), RedundantDetectors(b)) => a == b,
            (MissingDetectors, MissingDetectors) => true,
            (DuplicateDetector(a), DuplicateDetector(b)) => a == b,
            (EmptyTimestamps(a), EmptyTimestamps(b)) => a == b,
            (InvalidTsft(a), InvalidTsft(b)) => a.to_bits() == b.to_bits(),
            (
                NoiseSourceConflict { weights: w1, sqrt_sx: s1 },
                NoiseSourceConflict { weights: w2, sqrt_sx: s2 },
            ) => w1 == w2 && s1 == s2,
            (InvalidSqrtSX(a), InvalidSqrtSX(b)) => a.to_bits() == b.to_bits(),
            (AmplitudeBasisConflict(a), AmplitudeBasisConflict(b)) => a == b,
            (
                DetectorMismatch {
                    context: c1,
                    expected: e1,
                    found: f1,
                },
                DetectorMismatch {
                    context: c2,
                    expected: e2,
                    found: f2,
                },
            ) => c1 == c2 && e1 == e2 && f1 == f2,
            (
                SampleCountMismatch {
                    detector: d1,
                    context: c1,
                    expected: e1,
                    found: f1,
                },
                SampleCountMismatch {
                    detector: d2,
                    context: c2,
                    expected: e2,
                    found: f2,
                },
            ) => d1 == d2 && c1 == c2 && e1 == e2 && f1 == f2,
            (EphemerisOutOfRange { gps: a, .. }, EphemerisOutOfRange { gps: b, .. }) => {
                a.to_bits() == b.to_bits()
            }
            (InvalidEphemeris(a), InvalidEphemeris(b)) => a == b,
            (InvalidSpinRange(a), InvalidSpinRange(b)) => a == b,
            (InvalidOrbitBounds(a), InvalidOrbitBounds(b)) => a == b,
            (InvalidNoiseInput(a), InvalidNoiseInput(b)) => a == b,
            (UnsupportedReportParameter(a), UnsupportedReportParameter(b)) => a == b,
            (UnknownDetector(a), UnknownDetector(b)) => a == b,
            (MalformedDetectorName(a), MalformedDetectorName(b)) => a == b,
            (EphemerisParsingError(a), EphemerisParsingError(b)) => a == b,
            (
                InvertedTimeRange { start: s1, end: e1 },
                InvertedTimeRange { start: s2, end: e2 },
            ) => s1.to_bits() == s2.to_bits() && e1.to_bits() == e2.to_bits(),
            (InvalidCoveringBand { min: a1, max: b1 }, InvalidCoveringBand { min: a2, max: b2 }) => {
                a1.to_bits() == a2.to_bits() && b1.to_bits() == b2.to_bits()
            }
            (InvalidSnr2(a), InvalidSnr2(b)) => a.to_bits() == b.to_bits(),
            (InvalidAntennaPattern(a), InvalidAntennaPattern(b)) => a == b,
            (ExecutableNotFound(a), ExecutableNotFound(b)) => a == b,
            (
                NonZeroExit {
                    command: c1,
                    status: s1,
                    ..
                },
                NonZeroExit {
                    command: c2,
                    status: s2,
                    ..
                },
            ) => c1 == c2 && s1 == s2,

            // io::Error is not comparable: same variant means equal
            (IoError(_), IoError(_)) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod cw_errors_test {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            CwError::NotOneDimensional { rows: 2, cols: 3 }.kind(),
            ErrorKind::Shape
        );
        assert_eq!(
            CwError::AmplitudeBasisConflict(vec!["h0"]).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            CwError::UnknownDetector("X9".into()).kind(),
            ErrorKind::Parse
        );
        assert_eq!(
            CwError::InvalidCoveringBand { min: 1.0, max: 0.5 }.kind(),
            ErrorKind::Computation
        );
        assert_eq!(
            CwError::ExecutableNotFound("ComputeFstatistic_v2".into()).kind(),
            ErrorKind::ExternalTool
        );
    }

    #[test]
    fn test_io_errors_compare_by_variant() {
        let a: CwError = std::io::Error::other("a").into();
        let b: CwError = std::io::Error::new(std::io::ErrorKind::NotFound, "b").into();
        assert_eq!(a, b);
        assert_eq!(a.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_display_names_fields() {
        let err = CwError::AmplitudeBasisConflict(vec!["h0", "aPlus"]);
        let msg = err.to_string();
        assert!(msg.contains("h0"));
        assert!(msg.contains("aPlus"));
    }
}
