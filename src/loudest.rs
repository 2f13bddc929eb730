//! # Loudest-candidate report
//!
//! The `ComputeFstatistic_v2` executable of LALSuite can write a `.loudest` file describing the
//! F-statistic at a single parameter-space point. [`LoudestFileRequest`] holds the parameter
//! dictionary it needs, renders it as command-line flags and runs the executable:
//!
//! ```text
//! lalpulsar_ComputeFstatistic_v2 --DataFiles=<pattern> --outputLoudest=<outdir>/<label>.loudest
//!     --refTime=<tref> --Alpha=.. --Delta=.. --Freq=.. [--minStartTime=..] [--maxStartTime=..]
//!     [--transient-WindowType=..] [--ephemEarth=..] [--ephemSun=..]
//! ```
//!
//! The older `lalapps_` prefix is tried when the `lalpulsar_` one is not installed. The call is
//! blocking and never retried.

use std::collections::BTreeMap;
use std::fmt;
use std::process::Command;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::GpsSeconds;
use crate::cw_errors::CwError;

const EXECUTABLE: &str = "ComputeFstatistic_v2";
const EXECUTABLE_PREFIXES: [&str; 2] = ["lalpulsar_", "lalapps_"];
const GLITCH_PARAMETERS: [&str; 3] = ["delta_F0", "delta_F1", "tglitch"];

/// Transient window shape passed through to the executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransientWindowType {
    Rect,
    Exp,
}

impl fmt::Display for TransientWindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransientWindowType::Rect => write!(f, "rect"),
            TransientWindowType::Exp => write!(f, "exp"),
        }
    }
}

/// Parameters of a `.loudest` report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoudestFileRequest {
    /// Single parameter-space point, keyed by the executable's option names (`Alpha`, `Freq`, …).
    pub max_params: BTreeMap<String, f64>,
    pub tref: GpsSeconds,
    pub outdir: Utf8PathBuf,
    pub label: String,
    /// SFT file pattern; wildcards and colon-separated lists are expanded by the executable.
    pub sft_pattern: String,
    pub min_start_time: Option<GpsSeconds>,
    pub max_start_time: Option<GpsSeconds>,
    pub transient_window: Option<TransientWindowType>,
    pub earth_ephemeris: Option<Utf8PathBuf>,
    pub sun_ephemeris: Option<Utf8PathBuf>,
}

impl LoudestFileRequest {
    pub fn new(
        max_params: BTreeMap<String, f64>,
        tref: GpsSeconds,
        outdir: impl Into<Utf8PathBuf>,
        label: impl Into<String>,
        sft_pattern: impl Into<String>,
    ) -> Self {
        LoudestFileRequest {
            max_params,
            tref,
            outdir: outdir.into(),
            label: label.into(),
            sft_pattern: sft_pattern.into(),
            min_start_time: None,
            max_start_time: None,
            transient_window: None,
            earth_ephemeris: None,
            sun_ephemeris: None,
        }
    }

    /// Path of the report written by the executable.
    pub fn loudest_file(&self) -> Utf8PathBuf {
        self.outdir.join(format!("{}.loudest", self.label))
    }

    /// Command-line flags for the executable.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::UnsupportedReportParameter`] if the point carries glitch parameters.
    pub fn command_line_args(&self) -> Result<Vec<String>, CwError> {
        if let Some(key) = GLITCH_PARAMETERS
            .iter()
            .find(|k| self.max_params.contains_key(**k))
        {
            return Err(CwError::UnsupportedReportParameter(key.to_string()));
        }

        let mut args = vec![
            format!("--DataFiles={}", self.sft_pattern),
            format!("--outputLoudest={}", self.loudest_file()),
            format!("--refTime={}", self.tref),
        ];
        args.extend(self.max_params.iter().map(|(k, v)| format!("--{k}={v}")));

        let optional = [
            ("minStartTime", self.min_start_time.map(|t| t.to_string())),
            ("maxStartTime", self.max_start_time.map(|t| t.to_string())),
            (
                "transient-WindowType",
                self.transient_window.map(|w| w.to_string()),
            ),
            ("ephemEarth", self.earth_ephemeris.as_ref().map(|p| p.to_string())),
            ("ephemSun", self.sun_ephemeris.as_ref().map(|p| p.to_string())),
        ];
        args.extend(
            optional
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| format!("--{k}={v}"))),
        );
        Ok(args)
    }

    /// Run `ComputeFstatistic_v2` and return the path of the `.loudest` file.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::UnsupportedReportParameter`] for glitch parameters.
    /// * [`CwError::ExecutableNotFound`] if neither `lalpulsar_` nor `lalapps_` variant runs.
    /// * [`CwError::NonZeroExit`] if the executable fails.
    pub fn run(&self) -> Result<Utf8PathBuf, CwError> {
        let executables = EXECUTABLE_PREFIXES.map(|prefix| format!("{prefix}{EXECUTABLE}"));
        self.run_with_executables(&executables)
    }

    /// Same as [`LoudestFileRequest::run`] with an explicit list of candidate executables, the
    /// first one found on the `PATH` being used.
    pub fn run_with_executables<S: AsRef<str>>(
        &self,
        executables: &[S],
    ) -> Result<Utf8PathBuf, CwError> {
        let args = self.command_line_args()?;
        if self.transient_window.is_some() {
            warn!(
                "{EXECUTABLE} --outputLoudest always reports the maximum of the standard CW \
                 2F-statistic, not the transient max2F"
            );
        }
        info!("Running {EXECUTABLE} to get {}", self.loudest_file());

        for exe in executables {
            let exe: &str = exe.as_ref();
            debug!("{exe} {}", args.join(" "));
            let output = match Command::new(exe).args(&args).output() {
                Ok(output) => output,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{exe} not found");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if !output.status.success() {
                return Err(CwError::NonZeroExit {
                    command: exe.to_string(),
                    status: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            return Ok(self.loudest_file());
        }
        Err(CwError::ExecutableNotFound(EXECUTABLE.to_string()))
    }
}
