//! # Optimal signal-to-noise ratio
//!
//! The optimal SNR of a CW signal is the quadratic form
//!
//! ```text
//! SNR² = Sinv_Tsft · A^μ M_μν A^ν
//! M = | A  C  0  E |
//!     | C  B −E  0 |
//!     | 0 −E  A  C |
//!     | E  0  C  B |
//! ```
//!
//! where `A^μ` are the JKS amplitudes and `A, B, C, E` the antenna-pattern sums. The
//! F-statistic `2F` then follows a non-central χ² distribution with four degrees of freedom
//! and non-centrality `SNR²`, see [`TwoFExpectation`].
//!
//! [`SignalToNoiseRatio`] bundles precomputed detector states with a noise source so that
//! many sky positions and amplitudes can be evaluated against the same observation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::amplitude::{AmplitudeInput, AmplitudeParams};
use crate::antenna_pattern::{compute_multi_am_coeffs, AntennaPatternMatrix, SkyPosition};
use crate::constants::{Hertz, Seconds, EXTRA_WING_BINS, PSD_TOLERANCE};
use crate::cw_errors::CwError;
use crate::detector_states::{DetectorStates, MultiDetectorStateSeries};
use crate::ephemeris::EphemerisData;
use crate::noise_weights::{MultiNoiseWeights, NoiseSource};
use crate::sft_data::SftDatasetReader;

/// Mean and standard deviation of `2F`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoFExpectation {
    pub expected: f64,
    pub stdev: f64,
}

impl TwoFExpectation {
    pub fn from_snr2(snr2: f64) -> Self {
        TwoFExpectation {
            expected: 4.0 + snr2,
            stdev: (8.0 + 4.0 * snr2).sqrt(),
        }
    }
}

/// Optimal `SNR²` of canonical amplitudes for an antenna-pattern matrix.
///
/// A degenerate matrix (single SFT, or a polarization along its null direction) makes the
/// quadratic form cancel exactly; rounding residues below [`PSD_TOLERANCE`] relative to
/// `(|A| + |B| + 2|C| + 2|E|)·|A^μ|²` are returned as zero.
///
/// Errors
/// ----------
/// * [`CwError::InvalidSnr2`] if the result is NaN or negative beyond rounding.
pub fn snr2_from_mmunu(
    matrix: &AntennaPatternMatrix,
    amplitude: &AmplitudeParams,
) -> Result<f64, CwError> {
    let amp = amplitude.jks_vector();
    let form = (amp.transpose() * matrix.mmunu() * amp)[(0, 0)];
    if form.is_nan() {
        return Err(CwError::InvalidSnr2(form));
    }
    if form >= 0.0 {
        return Ok(matrix.sinv_tsft() * form);
    }

    let scale = matrix.a().abs()
        + matrix.b().abs()
        + 2.0 * (matrix.c().abs() + matrix.e().abs());
    if -form <= PSD_TOLERANCE * scale * amp.norm_squared() {
        return Ok(0.0);
    }
    Err(CwError::InvalidSnr2(matrix.sinv_tsft() * form))
}

/// SNR calculator over a fixed observation.
#[derive(Debug, Clone)]
pub struct SignalToNoiseRatio {
    states: MultiDetectorStateSeries,
    noise: NoiseSource,
}

impl SignalToNoiseRatio {
    /// Bind detector states to a noise description.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::DetectorMismatch`] if the weights do not cover exactly the detectors of the
    ///   states, in the same order.
    /// * [`CwError::SampleCountMismatch`] if a detector has a different number of weights and
    ///   states.
    pub fn new(states: MultiDetectorStateSeries, noise: NoiseSource) -> Result<Self, CwError> {
        if let NoiseSource::Weights(weights) = &noise {
            let expected: Vec<String> = states.detectors().iter().map(|d| d.to_string()).collect();
            let found: Vec<String> = weights.detectors().iter().map(|d| d.to_string()).collect();
            if expected != found {
                return Err(CwError::DetectorMismatch {
                    context: "noise weights",
                    expected,
                    found,
                });
            }
            for (s, w) in states.series().iter().zip(weights.series()) {
                if s.len() != w.weights.len() {
                    return Err(CwError::SampleCountMismatch {
                        detector: s.detector.name.to_string(),
                        context: "noise weights",
                        expected: s.len(),
                        found: w.weights.len(),
                    });
                }
            }
        }
        Ok(SignalToNoiseRatio { states, noise })
    }

    /// Build states and noise weights from a detector dataset.
    ///
    /// The dataset is loaded around `f0` with `window / 2 + 10` bins on each side, so that the
    /// running median of width `window` leaves a few estimates for every SFT.
    ///
    /// Arguments
    /// -----------------
    /// * `f0`: signal frequency the noise floor is estimated at, Hz.
    /// * `reader`, `pattern`: dataset access.
    /// * `time_offset`: offset applied to the SFT start times (e.g. `Tsft/2`).
    /// * `window`: running-median window, bins.
    /// * `ephemeris`: shared ephemeris context.
    pub fn from_sfts(
        f0: Hertz,
        reader: &impl SftDatasetReader,
        pattern: &str,
        time_offset: Seconds,
        window: usize,
        ephemeris: Arc<EphemerisData>,
    ) -> Result<Self, CwError> {
        let wing_bins = window / 2 + EXTRA_WING_BINS;
        let (states, dataset) = DetectorStates::with_ephemeris(ephemeris)
            .multi_detector_states_from_sfts(reader, pattern, f0, wing_bins, time_offset)?;
        let weights = MultiNoiseWeights::from_dataset(&dataset, window)?;
        info!(
            "Noise weights from {} SFTs of {:?}: Sinv_Tsft = {:.6e}",
            states.total_len(),
            states.detectors(),
            weights.sinv_tsft()
        );
        SignalToNoiseRatio::new(states, NoiseSource::Weights(weights))
    }

    pub fn states(&self) -> &MultiDetectorStateSeries {
        &self.states
    }

    pub fn noise(&self) -> &NoiseSource {
        &self.noise
    }

    /// Antenna-pattern matrix for a sky position.
    pub fn compute_mmunu(&self, sky: &SkyPosition) -> Result<AntennaPatternMatrix, CwError> {
        Ok(compute_multi_am_coeffs(&self.states, sky, &self.noise)?.matrix)
    }

    /// Optimal `SNR²` of a signal at a sky position.
    pub fn compute_snr2(
        &self,
        sky: &SkyPosition,
        amplitude: &AmplitudeInput,
    ) -> Result<f64, CwError> {
        let matrix = self.compute_mmunu(sky)?;
        let snr2 = snr2_from_mmunu(&matrix, &amplitude.to_canonical())?;
        debug!("SNR^2 = {snr2:.6e} at (α={:.4}, δ={:.4})", sky.alpha, sky.delta);
        Ok(snr2)
    }

    /// Expected mean and standard deviation of `2F`.
    pub fn compute_twof(
        &self,
        sky: &SkyPosition,
        amplitude: &AmplitudeInput,
    ) -> Result<TwoFExpectation, CwError> {
        Ok(TwoFExpectation::from_snr2(self.compute_snr2(sky, amplitude)?))
    }
}

#[cfg(test)]
mod snr_test {
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::constants::DPI;
    use crate::cw_errors::ErrorKind;
    use crate::detectors::Detector;
    use crate::ephemeris::analytic::AnalyticEphemeris;
    use crate::ephemeris::EphemerisProvider;
    use crate::noise_weights::NoiseWeightSeries;
    use crate::sft_data::{InMemorySftReader, PowerSpectrum};
    use crate::timestamps::MultiTimestampSeries;

    fn ephemeris() -> Arc<EphemerisData> {
        Arc::new(
            AnalyticEphemeris::new(1e9, 1e9 + 2.0 * 86400.0)
                .load()
                .unwrap(),
        )
    }

    fn states(n: usize) -> MultiDetectorStateSeries {
        let times: Vec<f64> = (0..n).map(|i| 1e9 + i as f64 * 1800.0).collect();
        let ts = MultiTimestampSeries::from_shared(&times, "H1,L1", 1800.0).unwrap();
        DetectorStates::with_ephemeris(ephemeris())
            .multi_detector_states(&ts, 900.0)
            .unwrap()
    }

    #[test]
    fn test_twof_expectation() {
        let zero = TwoFExpectation::from_snr2(0.0);
        assert_eq!(zero.expected, 4.0);
        assert_relative_eq!(zero.stdev, 8f64.sqrt());
        let loud = TwoFExpectation::from_snr2(100.0);
        assert_eq!(loud.expected, 104.0);
        assert_eq!(loud.stdev, 408f64.sqrt());
    }

    #[test]
    fn test_snr2_non_negative() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let a: f64 = rng.random_range(0.0..50.0);
            let b: f64 = rng.random_range(0.0..50.0);
            let c: f64 = rng.random_range(-1.0..1.0) * (a * b).sqrt();
            let matrix = AntennaPatternMatrix::new(a, b, c, 0.0, 1.0).unwrap();
            let amp = AmplitudeParams {
                aplus: rng.random_range(-10.0..10.0),
                across: rng.random_range(-10.0..10.0),
                psi: rng.random_range(-4.0..4.0),
                phi0: rng.random_range(-7.0..7.0),
            };
            assert!(snr2_from_mmunu(&matrix, &amp).unwrap() >= 0.0);
        }
    }

    #[test]
    fn test_snr2_null_polarization() {
        // single SFT: A = a², B = b², C = ab, and ψ chosen so that a·F+ + b·F× cancels
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2000 {
            let a: f64 = rng.random_range(-1.0..1.0);
            let b: f64 = rng.random_range(-1.0..1.0);
            let matrix = AntennaPatternMatrix::new(a * a, b * b, a * b, 0.0, 1800.0).unwrap();
            let amp = AmplitudeParams {
                aplus: rng.random_range(0.0..2.0),
                across: 0.0,
                psi: 0.5 * (-a).atan2(b),
                phi0: rng.random_range(0.0..DPI),
            };
            let snr2 = snr2_from_mmunu(&matrix, &amp).unwrap();
            assert!((0.0..1e-9).contains(&snr2), "SNR² = {snr2}");
        }

        let (a, b) = (-0.94373_f64, -0.85722_f64);
        let matrix = AntennaPatternMatrix::new(a * a, b * b, a * b, 0.0, 1.0).unwrap();
        let amp = AmplitudeParams {
            aplus: 1.9225,
            across: 0.0,
            psi: 1.15410,
            phi0: 2.98962,
        };
        assert!(snr2_from_mmunu(&matrix, &amp).unwrap() >= 0.0);
    }

    #[test]
    fn test_snr2_nan_rejected() {
        let matrix = AntennaPatternMatrix::new(1.0, 1.0, 0.0, 0.0, 1.0).unwrap();
        let amp = AmplitudeParams {
            aplus: f64::NAN,
            across: 0.0,
            psi: 0.0,
            phi0: 0.0,
        };
        let err = snr2_from_mmunu(&matrix, &amp).unwrap_err();
        assert!(matches!(err, CwError::InvalidSnr2(v) if v.is_nan()));
        assert_eq!(err.kind(), ErrorKind::Computation);
    }

    #[test]
    fn test_snr2_closed_form() {
        // A^μ M A^ν = A (A1² + A3²) + B (A2² + A4²) + 2C (A1 A2 + A3 A4)
        let matrix = AntennaPatternMatrix::new(3.0, 2.0, 0.5, 0.0, 10.0).unwrap();
        let amp = AmplitudeParams::from_h0_cosi(1.0, 0.3, 0.4, 1.1);
        let v = amp.jks_vector();
        let expected = 10.0
            * (3.0 * (v[0] * v[0] + v[2] * v[2])
                + 2.0 * (v[1] * v[1] + v[3] * v[3])
                + 2.0 * 0.5 * (v[0] * v[1] + v[2] * v[3]));
        assert_relative_eq!(
            snr2_from_mmunu(&matrix, &amp).unwrap(),
            expected,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_snr_scales_with_noise_floor() {
        let states = states(48);
        let sky = SkyPosition::new(0.8, 0.2);
        let amp = AmplitudeInput::from_options(Some(1e-24), Some(0.5), None, None, 0.3, 0.0)
            .unwrap();

        let quiet = SignalToNoiseRatio::new(states.clone(), NoiseSource::assumed(1e-23).unwrap())
            .unwrap()
            .compute_snr2(&sky, &amp)
            .unwrap();
        let loud = SignalToNoiseRatio::new(states, NoiseSource::assumed(2e-23).unwrap())
            .unwrap()
            .compute_snr2(&sky, &amp)
            .unwrap();
        assert!(quiet > 0.0);
        assert_relative_eq!(quiet, 4.0 * loud, max_relative = 1e-12);
    }

    #[test]
    fn test_weights_validation() {
        let states = states(4);
        let weights = MultiNoiseWeights::new(
            vec![NoiseWeightSeries {
                detector: Detector::from_name("H1").unwrap(),
                weights: vec![1.0; 4],
            }],
            1.0,
        )
        .unwrap();
        let err = SignalToNoiseRatio::new(states, NoiseSource::Weights(weights)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_from_sfts_matches_flat_noise() {
        let window = 21;
        let tsft = 1800.0;
        let sqrt_sx: f64 = 1e-23;
        let bias = crate::noise_weights::running_median_bias(window);
        let mut reader = InMemorySftReader::new(tsft);
        for det in ["H1", "L1"] {
            for i in 0..24 {
                reader = reader
                    .with_sft(
                        det,
                        1e9 + i as f64 * tsft,
                        PowerSpectrum {
                            f0: 99.0,
                            df: 1.0 / tsft,
                            power: vec![sqrt_sx * sqrt_sx * bias; 3600],
                        },
                    )
                    .unwrap();
            }
        }

        let snr = SignalToNoiseRatio::from_sfts(100.0, &reader, "", tsft / 2.0, window, ephemeris())
            .unwrap();
        assert_eq!(snr.states().total_len(), 48);

        let flat_states = states(24);
        let flat = SignalToNoiseRatio::new(flat_states, NoiseSource::assumed(sqrt_sx).unwrap())
            .unwrap();

        let sky = SkyPosition::new(2.0, -0.7);
        let amp: AmplitudeInput = AmplitudeParams::from_h0_cosi(1e-24, 0.1, 1.0, 2.0).into();
        assert_relative_eq!(
            snr.compute_snr2(&sky, &amp).unwrap(),
            flat.compute_snr2(&sky, &amp).unwrap(),
            max_relative = 1e-9
        );
    }
}
