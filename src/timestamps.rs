//! # Per-detector timestamp series
//!
//! A [`MultiTimestampSeries`] maps each detector of a network onto the ordered GPS start times
//! of its data segments (SFTs), all sharing the same baseline duration `Tsft`.
//!
//! Two explicit constructors cover the two ways of describing an observing schedule:
//!
//! * [`MultiTimestampSeries::from_detector_map`] – one sequence per detector, the detectors
//!   being the keys of the map;
//! * [`MultiTimestampSeries::from_shared`] – a single sequence applied to every detector of an
//!   explicit list (`["H1", "L1"]` or `"H1,L1"`).
//!
//! [`MultiTimestampSeries::build`] accepts the tagged [`TimestampInput`] together with an
//! optional detector list and rejects the redundant / incomplete combinations.
//!
//! Every floating-point time is floor-split into a [`GpsTime`].

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use tracing::debug;

use crate::constants::Seconds;
use crate::cw_errors::CwError;
use crate::detectors::{parse_detectors, Detector, DetectorSpec};
use crate::time::GpsTime;

/// Ordered timestamps of a single detector.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampSeries {
    pub detector: Detector,
    pub timestamps: Vec<GpsTime>,
    /// Baseline duration covered by each timestamp, s.
    pub tsft: Seconds,
}

impl TimestampSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Timestamp series of a detector network, ordered as the detectors were given.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTimestampSeries {
    series: Vec<TimestampSeries>,
    tsft: Seconds,
}

/// The two accepted descriptions of an observing schedule.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampInput {
    /// One sequence of GPS times per detector name.
    PerDetector(BTreeMap<String, Vec<f64>>),
    /// One sequence shared by every detector of an explicit list.
    Shared(Vec<f64>),
}

impl MultiTimestampSeries {
    /// Build from the tagged input plus an optional detector list.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::RedundantDetectors`] – per-detector input together with a detector list.
    /// * [`CwError::MissingDetectors`] – shared input without a detector list.
    /// * Any error of [`from_detector_map`](Self::from_detector_map) /
    ///   [`from_shared`](Self::from_shared).
    pub fn build(
        input: TimestampInput,
        detectors: Option<DetectorSpec>,
        tsft: Seconds,
    ) -> Result<Self, CwError> {
        match (input, detectors) {
            (TimestampInput::PerDetector(_), Some(spec)) => {
                Err(CwError::RedundantDetectors(spec.names()))
            }
            (TimestampInput::PerDetector(map), None) => {
                debug!("Retrieving detectors from timestamps map");
                Self::from_detector_map(map, tsft)
            }
            (TimestampInput::Shared(_), None) => Err(CwError::MissingDetectors),
            (TimestampInput::Shared(times), Some(spec)) => Self::from_shared(&times, spec, tsft),
        }
    }

    /// Build from a mapping detector name → GPS times.
    ///
    /// Arguments
    /// -----------------
    /// * `map`: detector names and their 1-D sequences of GPS times (s).
    /// * `tsft`: baseline duration of each timestamp (s), finite and positive.
    ///
    /// Return
    /// ----------
    /// * The series, ordered as iterated from `map`.
    pub fn from_detector_map<I, S, T>(map: I, tsft: Seconds) -> Result<Self, CwError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<[f64]>,
    {
        check_tsft(tsft)?;
        let (names, times): (Vec<S>, Vec<T>) = map.into_iter().unzip();
        let detectors = parse_detectors(names.iter().map(AsRef::as_ref))?;

        let series = detectors
            .into_iter()
            .zip(times)
            .map(|(detector, ts)| to_series(detector, ts.as_ref(), tsft))
            .collect::<Result<Vec<_>, CwError>>()?;

        Ok(MultiTimestampSeries { series, tsft })
    }

    /// Build from one sequence of GPS times shared by all the listed detectors.
    pub fn from_shared(
        times: &[f64],
        detectors: impl Into<DetectorSpec>,
        tsft: Seconds,
    ) -> Result<Self, CwError> {
        check_tsft(tsft)?;
        let detectors = detectors.into().parse()?;

        debug!("Checking integrity of timestamps");
        let series = detectors
            .into_iter()
            .map(|detector| to_series(detector, times, tsft))
            .collect::<Result<Vec<_>, CwError>>()?;

        Ok(MultiTimestampSeries { series, tsft })
    }

    /// Same as [`from_shared`](Self::from_shared) for a numeric array that must be a single
    /// row or a single column.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::NotOneDimensional`] if the array has more than one row and more than one column.
    pub fn from_shared_matrix(
        times: &DMatrix<f64>,
        detectors: impl Into<DetectorSpec>,
        tsft: Seconds,
    ) -> Result<Self, CwError> {
        let (rows, cols) = times.shape();
        if rows > 1 && cols > 1 {
            return Err(CwError::NotOneDimensional { rows, cols });
        }
        Self::from_shared(times.as_slice(), detectors, tsft)
    }

    /// Assemble already converted series (e.g. produced by a dataset reader).
    ///
    /// Every series must carry the network `tsft`, otherwise [`CwError::InvalidTsft`] is
    /// returned with the offending value.
    pub fn from_series(series: Vec<TimestampSeries>, tsft: Seconds) -> Result<Self, CwError> {
        check_tsft(tsft)?;
        if let Some(s) = series.iter().find(|s| s.tsft != tsft) {
            return Err(CwError::InvalidTsft(s.tsft));
        }
        parse_detectors(series.iter().map(|s| s.detector.name))?;
        Ok(MultiTimestampSeries { series, tsft })
    }

    pub fn tsft(&self) -> Seconds {
        self.tsft
    }

    pub fn series(&self) -> &[TimestampSeries] {
        &self.series
    }

    pub fn detectors(&self) -> Vec<&'static str> {
        self.series.iter().map(|s| s.detector.name).collect()
    }

    pub fn get(&self, detector: &str) -> Option<&TimestampSeries> {
        self.series.iter().find(|s| s.detector.name == detector)
    }

    /// Total number of timestamps across all detectors.
    pub fn total_len(&self) -> usize {
        self.series.iter().map(TimestampSeries::len).sum()
    }
}

fn check_tsft(tsft: Seconds) -> Result<(), CwError> {
    if tsft.is_finite() && tsft > 0.0 {
        Ok(())
    } else {
        Err(CwError::InvalidTsft(tsft))
    }
}

fn to_series(detector: Detector, times: &[f64], tsft: Seconds) -> Result<TimestampSeries, CwError> {
    let timestamps = times
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if value.is_finite() {
                Ok(GpsTime::from_f64(value))
            } else {
                Err(CwError::NonNumericTimestamp { index, value })
            }
        })
        .collect::<Result<Vec<_>, CwError>>()?;

    Ok(TimestampSeries {
        detector,
        timestamps,
        tsft,
    })
}
