//! Reader for the LALSuite plain-text ephemeris tables (`earth00-40-DE405.dat`, `sun00-40-DE405.dat`, …).
//!
//! File layout
//! -----------------
//! * Comment lines starting with `#` or `%` are ignored.
//! * Header: three numbers – a legacy start-year tag (unused), the tabulation step in seconds
//!   and the number of entries.
//! * Body: `n_entries` records of ten whitespace-separated numbers (records may span lines):
//!   GPS time, position (3, light-seconds), velocity (3, units of `c`), acceleration (3, `c`/s).
//!
//! Compressed (`.gz`) tables must be decompressed beforehand.

use camino::{Utf8Path, Utf8PathBuf};
use nalgebra::Vector3;
use nom::{
    character::complete::multispace0, multi::many0, number::complete::double,
    sequence::preceded, IResult, Parser,
};
use tracing::debug;

use super::{BodyTable, EphemerisData, EphemerisEntry, EphemerisProvider};
use crate::cw_errors::CwError;

const VALUES_PER_ENTRY: usize = 10;

/// Paths of a pair of LALSuite ephemeris tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LalEphemerisFiles {
    pub earth: Utf8PathBuf,
    pub sun: Utf8PathBuf,
}

impl LalEphemerisFiles {
    pub fn new(earth: impl Into<Utf8PathBuf>, sun: impl Into<Utf8PathBuf>) -> Self {
        LalEphemerisFiles {
            earth: earth.into(),
            sun: sun.into(),
        }
    }
}

impl EphemerisProvider for LalEphemerisFiles {
    fn load(&self) -> Result<EphemerisData, CwError> {
        let earth = read_table_file(&self.earth)?;
        let sun = read_table_file(&self.sun)?;
        Ok(EphemerisData::new(earth, sun))
    }
}

/// Read and parse one table file.
pub fn read_table_file(path: &Utf8Path) -> Result<BodyTable, CwError> {
    debug!("Reading ephemeris table {path}");
    let content = std::fs::read_to_string(path)?;
    parse_table(&content)
}

fn ws_double(input: &str) -> IResult<&str, f64> {
    preceded(multispace0, double).parse(input)
}

fn parse_header(input: &str) -> IResult<&str, (f64, f64, f64)> {
    (ws_double, ws_double, ws_double).parse(input)
}

/// Parse the textual content of a LALSuite ephemeris table.
///
/// Errors
/// ----------
/// * [`CwError::EphemerisParsingError`] on malformed numbers, trailing garbage or a record
///   count that does not match the header.
/// * [`CwError::InvalidEphemeris`] if the records are not regularly spaced by the header step.
pub fn parse_table(content: &str) -> Result<BodyTable, CwError> {
    let body = content
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            !line.starts_with('#') && !line.starts_with('%')
        })
        .collect::<Vec<_>>()
        .join("\n");

    let (rest, (_year_tag, step, n_entries)) = parse_header(&body)
        .map_err(|e| CwError::EphemerisParsingError(format!("invalid header: {e}")))?;

    let (rest, values) = many0(ws_double)
        .parse(rest)
        .map_err(|e| CwError::EphemerisParsingError(e.to_string()))?;

    if !rest.trim().is_empty() {
        let snippet: String = rest.trim().chars().take(32).collect();
        return Err(CwError::EphemerisParsingError(format!(
            "unexpected content {snippet:?}"
        )));
    }

    if n_entries < 1.0 || n_entries.fract() != 0.0 {
        return Err(CwError::EphemerisParsingError(format!(
            "invalid entry count {n_entries}"
        )));
    }
    let n_entries = n_entries as usize;
    if values.len() != n_entries * VALUES_PER_ENTRY {
        return Err(CwError::EphemerisParsingError(format!(
            "header announces {n_entries} entries, found {} values",
            values.len()
        )));
    }

    let entries = values
        .chunks_exact(VALUES_PER_ENTRY)
        .map(|rec| EphemerisEntry {
            gps: rec[0],
            position: Vector3::new(rec[1], rec[2], rec[3]),
            velocity: Vector3::new(rec[4], rec[5], rec[6]),
            acceleration: Vector3::new(rec[7], rec[8], rec[9]),
        })
        .collect();

    BodyTable::new(step, entries)
}
