//! # Detector kinematic and orientation states
//!
//! For every timestamp of a [`MultiTimestampSeries`] the [`DetectorStates`] estimator computes,
//! at `t + time_offset`:
//!
//! 1. the Earth barycentric state from the shared [`EphemerisData`] context,
//! 2. the Greenwich mean sidereal time of the GPS instant,
//! 3. the detector vertex and response tensor rotated from the Earth-fixed frame into the
//!    equatorial frame,
//! 4. the detector velocity `v_earth + ω⊕ × r_vertex`.
//!
//! ```text
//! Earth-fixed (vertex, arms)  --R_z(GMST)-->  equatorial  --+ Earth SSB state-->  DetectorState
//! ```
//!
//! The ephemeris context is loaded once per estimator and shared behind an [`Arc`], so any
//! number of threads may evaluate states concurrently.
//!
//! A second entry point, [`DetectorStates::multi_detector_states_from_sfts`], takes its
//! timestamps from a detector dataset and also returns the frequency-windowed power spectra
//! needed to derive noise weights.

use std::sync::Arc;

use nalgebra::{Matrix3, Vector3};
use tracing::{debug, info};

use crate::constants::{Hertz, Seconds, C_SI, EARTH_ROTATION_RATE};
use crate::cw_errors::CwError;
use crate::detectors::Detector;
use crate::ephemeris::{EarthState, EphemerisData, EphemerisProvider};
use crate::ref_system::earth_fixed_to_equatorial;
use crate::sft_data::{SftDataset, SftDatasetReader};
use crate::time::{gmst_of_gps, GpsTime};
use crate::timestamps::MultiTimestampSeries;

/// State of one detector at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorState {
    /// Timestamp this state belongs to (before the time offset).
    pub timestamp: GpsTime,
    /// Detector vertex position relative to the SSB, light-seconds, equatorial frame.
    pub position: Vector3<f64>,
    /// Detector velocity relative to the SSB, units of `c`.
    pub velocity: Vector3<f64>,
    /// Response tensor `½ (u uᵀ − v vᵀ)` in the equatorial frame.
    pub detector_tensor: Matrix3<f64>,
    /// Greenwich mean sidereal time at evaluation, rad.
    pub gmst: f64,
    pub earth: EarthState,
}

/// States of one detector, aligned index-for-index with its timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorStateSeries {
    pub detector: Detector,
    pub states: Vec<DetectorState>,
    /// Baseline duration of each timestamp, s.
    pub tsft: Seconds,
}

impl DetectorStateSeries {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// States of a detector network.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiDetectorStateSeries {
    series: Vec<DetectorStateSeries>,
    tsft: Seconds,
}

impl MultiDetectorStateSeries {
    pub fn series(&self) -> &[DetectorStateSeries] {
        &self.series
    }

    pub fn tsft(&self) -> Seconds {
        self.tsft
    }

    pub fn detectors(&self) -> Vec<&'static str> {
        self.series.iter().map(|s| s.detector.name).collect()
    }

    pub fn get(&self, detector: &str) -> Option<&DetectorStateSeries> {
        self.series.iter().find(|s| s.detector.name == detector)
    }

    pub fn total_len(&self) -> usize {
        self.series.iter().map(DetectorStateSeries::len).sum()
    }
}

/// Detector state estimator holding the shared ephemeris context.
#[derive(Debug, Clone)]
pub struct DetectorStates {
    ephemeris: Arc<EphemerisData>,
}

impl DetectorStates {
    /// Load the ephemeris context from a provider.
    pub fn new(provider: &impl EphemerisProvider) -> Result<Self, CwError> {
        Ok(DetectorStates {
            ephemeris: Arc::new(provider.load()?),
        })
    }

    /// Share an already loaded context.
    pub fn with_ephemeris(ephemeris: Arc<EphemerisData>) -> Self {
        DetectorStates { ephemeris }
    }

    pub fn ephemeris(&self) -> &Arc<EphemerisData> {
        &self.ephemeris
    }

    /// Compute the states of every detector at every timestamp.
    ///
    /// Arguments
    /// -----------------
    /// * `timestamps`: per-detector timestamps and `Tsft`.
    /// * `time_offset`: seconds added to each timestamp before evaluation (e.g. `Tsft/2`
    ///   for SFT midpoints).
    ///
    /// Return
    /// ----------
    /// * States aligned index-for-index with `timestamps`.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::EmptyTimestamps`] if a detector has no timestamp.
    /// * [`CwError::EphemerisOutOfRange`] if an instant is not covered by the ephemeris.
    pub fn multi_detector_states(
        &self,
        timestamps: &MultiTimestampSeries,
        time_offset: Seconds,
    ) -> Result<MultiDetectorStateSeries, CwError> {
        if timestamps.series().is_empty() {
            return Err(CwError::EmptyTimestamps("<no detector>".into()));
        }

        let series = timestamps
            .series()
            .iter()
            .map(|ts| {
                if ts.is_empty() {
                    return Err(CwError::EmptyTimestamps(ts.detector.name.to_string()));
                }
                debug!(
                    "Computing {} states for detector {}",
                    ts.len(),
                    ts.detector
                );
                let states = ts
                    .timestamps
                    .iter()
                    .map(|t| self.detector_state(&ts.detector, t, time_offset))
                    .collect::<Result<Vec<_>, CwError>>()?;
                Ok(DetectorStateSeries {
                    detector: ts.detector,
                    states,
                    tsft: ts.tsft,
                })
            })
            .collect::<Result<Vec<_>, CwError>>()?;

        Ok(MultiDetectorStateSeries {
            series,
            tsft: timestamps.tsft(),
        })
    }

    /// Load a frequency window of a detector dataset and compute the states of its timestamps.
    ///
    /// The window is `central_frequency ± df × frequency_wing_bins`, `df` being the frequency
    /// resolution reported by the reader for `pattern`.
    ///
    /// Return
    /// ----------
    /// * The detector states and the loaded dataset (timestamps + power spectra).
    pub fn multi_detector_states_from_sfts(
        &self,
        reader: &impl SftDatasetReader,
        pattern: &str,
        central_frequency: Hertz,
        frequency_wing_bins: usize,
        time_offset: Seconds,
    ) -> Result<(MultiDetectorStateSeries, SftDataset), CwError> {
        let df = reader.frequency_resolution(pattern)?;
        let wing = df * frequency_wing_bins as f64;
        info!(
            "Loading dataset {pattern} in [{}, {}] Hz",
            central_frequency - wing,
            central_frequency + wing
        );
        let dataset = reader.load(pattern, central_frequency - wing, central_frequency + wing)?;
        let states = self.multi_detector_states(dataset.timestamps(), time_offset)?;
        Ok((states, dataset))
    }

    fn detector_state(
        &self,
        detector: &Detector,
        timestamp: &GpsTime,
        time_offset: Seconds,
    ) -> Result<DetectorState, CwError> {
        let t = timestamp.offset(time_offset);
        let earth = self.ephemeris.earth_state(&t)?;
        let gmst = gmst_of_gps(&t);
        let rot = earth_fixed_to_equatorial(gmst);

        let vertex = rot * detector.vertex() / C_SI;
        let spin = Vector3::new(0.0, 0.0, EARTH_ROTATION_RATE);

        Ok(DetectorState {
            timestamp: *timestamp,
            position: earth.position + vertex,
            velocity: earth.velocity + spin.cross(&vertex),
            detector_tensor: rot * detector.response_tensor() * rot.transpose(),
            gmst,
            earth,
        })
    }
}
