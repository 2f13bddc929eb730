//! # Background noise accounting
//!
//! The background noise enters the antenna-pattern sums through per-SFT weights and the overall
//! normalization `Sinv_Tsft`. Two sources are accepted, and exactly one must be chosen
//! (see [`NoiseSource::from_options`]):
//!
//! * [`MultiNoiseWeights`] derived from a detector dataset, and
//! * an assumed flat single-sided amplitude spectral density `sqrtSX` (1/√Hz), equivalent to
//!   unit weights with `Sinv_Tsft = Tsft / sqrtSX²`.
//!
//! ## Weights from power spectra
//!
//! For every SFT of every detector the PSD `S_Xα` is estimated by a running median of the power
//! over `window` bins, divided by the median-to-mean bias of a χ² distribution with two degrees
//! of freedom ([`running_median_bias`]). The SFT weight is the inverse of the mean PSD over the
//! band,
//!
//! ```text
//! w_Xα = 1 / ⟨S_Xα⟩        Sinv = Σ w_Xα / N_SFT        w_Xα ← w_Xα / Sinv        Sinv_Tsft = Tsft · Sinv
//! ```
//!
//! so that the normalized weights average to one over the whole network.

use itertools::Itertools;
use tracing::debug;

use crate::constants::Seconds;
use crate::cw_errors::CwError;
use crate::detectors::Detector;
use crate::sft_data::SftDataset;

/// Normalized weights of one detector, aligned with its SFTs.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseWeightSeries {
    pub detector: Detector,
    pub weights: Vec<f64>,
}

/// Noise weights of a detector network.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiNoiseWeights {
    series: Vec<NoiseWeightSeries>,
    sinv_tsft: f64,
}

impl MultiNoiseWeights {
    /// Assemble weights computed elsewhere.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::InvalidNoiseInput`] if a weight is negative or non-finite, or if
    ///   `sinv_tsft` is not finite and positive.
    pub fn new(series: Vec<NoiseWeightSeries>, sinv_tsft: f64) -> Result<Self, CwError> {
        if !(sinv_tsft.is_finite() && sinv_tsft > 0.0) {
            return Err(CwError::InvalidNoiseInput(format!(
                "normalization Sinv_Tsft must be finite and positive, got {sinv_tsft}"
            )));
        }
        if let Some((s, w)) = series
            .iter()
            .flat_map(|s| s.weights.iter().map(move |w| (s, w)))
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(CwError::InvalidNoiseInput(format!(
                "invalid weight {w} for detector {}",
                s.detector
            )));
        }
        Ok(MultiNoiseWeights { series, sinv_tsft })
    }

    /// Derive the weights from the power spectra of a dataset.
    ///
    /// Arguments
    /// -----------------
    /// * `dataset`: timestamps and band-limited spectra.
    /// * `window`: running-median window, in bins.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::InvalidNoiseInput`] if the window is zero or wider than a spectrum, or if a
    ///   spectrum has a non-positive mean power.
    pub fn from_dataset(dataset: &SftDataset, window: usize) -> Result<Self, CwError> {
        if window == 0 {
            return Err(CwError::InvalidNoiseInput(
                "running-median window must be at least one bin".into(),
            ));
        }
        let bias = running_median_bias(window);
        debug!("Running median over {window} bins, bias {bias}");

        let mut series = dataset
            .spectra()
            .iter()
            .map(|det| {
                let weights = det
                    .spectra
                    .iter()
                    .map(|sp| {
                        let psd = running_median(&sp.power, window)?;
                        let mean = psd.iter().sum::<f64>() / (psd.len() as f64 * bias);
                        if !(mean.is_finite() && mean > 0.0) {
                            return Err(CwError::InvalidNoiseInput(format!(
                                "non-positive mean PSD {mean} for detector {}",
                                det.detector
                            )));
                        }
                        Ok(1.0 / mean)
                    })
                    .collect::<Result<Vec<_>, CwError>>()?;
                Ok(NoiseWeightSeries {
                    detector: det.detector,
                    weights,
                })
            })
            .collect::<Result<Vec<_>, CwError>>()?;

        let n_sfts: usize = series.iter().map(|s| s.weights.len()).sum();
        if n_sfts == 0 {
            return Err(CwError::InvalidNoiseInput("dataset holds no SFT".into()));
        }
        let sinv = series.iter().flat_map(|s| &s.weights).sum::<f64>() / n_sfts as f64;
        series
            .iter_mut()
            .flat_map(|s| s.weights.iter_mut())
            .for_each(|w| *w /= sinv);

        MultiNoiseWeights::new(series, dataset.tsft() * sinv)
    }

    pub fn series(&self) -> &[NoiseWeightSeries] {
        &self.series
    }

    /// Overall normalization `Tsft · ⟨1/S⟩`.
    pub fn sinv_tsft(&self) -> f64 {
        self.sinv_tsft
    }

    pub fn detectors(&self) -> Vec<&'static str> {
        self.series.iter().map(|s| s.detector.name).collect()
    }

    pub fn get(&self, detector: &str) -> Option<&NoiseWeightSeries> {
        self.series.iter().find(|s| s.detector.name == detector)
    }
}

/// Background noise description consumed by the antenna-pattern computation.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseSource {
    Weights(MultiNoiseWeights),
    /// Flat single-sided amplitude spectral density, 1/√Hz.
    AssumedSqrtSX(f64),
}

impl NoiseSource {
    /// Select the noise source from two optional, mutually exclusive inputs.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::NoiseSourceConflict`] if both or neither are given.
    /// * [`CwError::InvalidSqrtSX`] if the assumed ASD is not finite and positive.
    pub fn from_options(
        noise_weights: Option<MultiNoiseWeights>,
        assume_sqrt_sx: Option<f64>,
    ) -> Result<Self, CwError> {
        match (noise_weights, assume_sqrt_sx) {
            (Some(weights), None) => Ok(NoiseSource::Weights(weights)),
            (None, Some(sqrt_sx)) => NoiseSource::assumed(sqrt_sx),
            (weights, sqrt_sx) => Err(CwError::NoiseSourceConflict {
                weights: weights.is_some(),
                sqrt_sx: sqrt_sx.is_some(),
            }),
        }
    }

    /// Flat noise floor with a validated ASD.
    pub fn assumed(sqrt_sx: f64) -> Result<Self, CwError> {
        if sqrt_sx.is_finite() && sqrt_sx > 0.0 {
            Ok(NoiseSource::AssumedSqrtSX(sqrt_sx))
        } else {
            Err(CwError::InvalidSqrtSX(sqrt_sx))
        }
    }

    /// Normalization `Sinv_Tsft` for a baseline `tsft`.
    pub fn sinv_tsft(&self, tsft: Seconds) -> f64 {
        match self {
            NoiseSource::Weights(w) => w.sinv_tsft(),
            NoiseSource::AssumedSqrtSX(sqrt_sx) => tsft / (sqrt_sx * sqrt_sx),
        }
    }
}

/// Running median of `data` over `window` consecutive samples.
///
/// Returns the `n − window + 1` medians of the fully populated windows; an even window
/// averages its two central values.
///
/// Errors
/// ----------
/// * [`CwError::InvalidNoiseInput`] if `window` is zero or larger than `data`.
pub fn running_median(data: &[f64], window: usize) -> Result<Vec<f64>, CwError> {
    if window == 0 || window > data.len() {
        return Err(CwError::InvalidNoiseInput(format!(
            "running-median window of {window} bins does not fit {} bins",
            data.len()
        )));
    }
    if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
        return Err(CwError::InvalidNoiseInput(format!(
            "non-finite power value {bad}"
        )));
    }

    let mut sorted: Vec<f64> = data[..window].iter().copied().sorted_by(f64::total_cmp).collect();
    let median = |s: &[f64]| {
        if window % 2 == 1 {
            s[window / 2]
        } else {
            0.5 * (s[window / 2 - 1] + s[window / 2])
        }
    };

    let mut out = Vec::with_capacity(data.len() - window + 1);
    out.push(median(&sorted));
    for (old, new) in data.iter().zip(&data[window..]) {
        let pos = sorted.partition_point(|v| v.total_cmp(old).is_lt());
        sorted.remove(pos);
        let pos = sorted.partition_point(|v| v.total_cmp(new).is_lt());
        sorted.insert(pos, *new);
        out.push(median(&sorted));
    }
    Ok(out)
}

/// Ratio between the median and the mean of χ²₂-distributed samples estimated from `window`
/// samples.
///
/// For an odd window this is `Σ_{k=1}^{N} (−1)^{k+1} / k`, tending to `ln 2`; an even window uses
/// the average of the two neighbouring odd windows.
pub fn running_median_bias(window: usize) -> f64 {
    let odd = |n: usize| {
        (1..=n)
            .map(|k| if k % 2 == 1 { 1.0 / k as f64 } else { -1.0 / k as f64 })
            .sum::<f64>()
    };
    match window {
        0 => 1.0,
        n if n % 2 == 1 => odd(n),
        n => 0.5 * (odd(n - 1) + odd(n + 1)),
    }
}

#[cfg(test)]
mod noise_weights_test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::cw_errors::ErrorKind;
    use crate::sft_data::{InMemorySftReader, PowerSpectrum, SftDatasetReader};

    #[test]
    fn test_running_median() {
        let data = [5.0, 1.0, 4.0, 2.0, 3.0, 9.0];
        assert_eq!(running_median(&data, 3).unwrap(), vec![4.0, 2.0, 3.0, 3.0]);
        assert_eq!(running_median(&data, 2).unwrap(), vec![3.0, 2.5, 3.0, 2.5, 6.0]);
        assert_eq!(running_median(&data, 6).unwrap(), vec![3.5]);
        assert!(running_median(&data, 7).is_err());
        assert!(running_median(&data, 0).is_err());
    }

    #[test]
    fn test_running_median_bias() {
        assert_eq!(running_median_bias(1), 1.0);
        assert_relative_eq!(running_median_bias(3), 1.0 - 0.5 + 1.0 / 3.0);
        assert_relative_eq!(running_median_bias(101), std::f64::consts::LN_2, epsilon = 5e-3);
        let even = running_median_bias(100);
        assert!(even > running_median_bias(101) && even < running_median_bias(99));
    }

    #[test]
    fn test_noise_source_selection() {
        let weights = MultiNoiseWeights::new(vec![], 1.0).unwrap();
        assert_eq!(
            NoiseSource::from_options(None, None).unwrap_err(),
            CwError::NoiseSourceConflict {
                weights: false,
                sqrt_sx: false
            }
        );
        assert_eq!(
            NoiseSource::from_options(Some(weights.clone()), Some(1.0))
                .unwrap_err()
                .kind(),
            ErrorKind::Configuration
        );
        assert!(matches!(
            NoiseSource::from_options(Some(weights), None),
            Ok(NoiseSource::Weights(_))
        ));
        assert_eq!(
            NoiseSource::from_options(None, Some(-1.0)).unwrap_err(),
            CwError::InvalidSqrtSX(-1.0)
        );
        let flat = NoiseSource::from_options(None, Some(2.0)).unwrap();
        assert_eq!(flat.sinv_tsft(1800.0), 450.0);
    }

    #[test]
    fn test_weights_from_dataset() {
        let window = 11;
        let bias = running_median_bias(window);
        let spectrum = |level: f64| PowerSpectrum {
            f0: 100.0,
            df: 1.0 / 1800.0,
            power: vec![level * bias; 64],
        };
        let reader = InMemorySftReader::new(1800.0)
            .with_sft("H1", 1e9, spectrum(1.0))
            .unwrap()
            .with_sft("H1", 1e9 + 1800.0, spectrum(4.0))
            .unwrap()
            .with_sft("L1", 1e9, spectrum(2.0))
            .unwrap();
        let dataset = reader.load("", 100.0, 100.03).unwrap();
        let weights = MultiNoiseWeights::from_dataset(&dataset, window).unwrap();

        // raw weights 1, 1/4, 1/2 → Sinv = 7/12
        let sinv = 7.0 / 12.0;
        assert_relative_eq!(weights.sinv_tsft(), 1800.0 * sinv, epsilon = 1e-9);
        let h1 = &weights.get("H1").unwrap().weights;
        assert_relative_eq!(h1[0], 1.0 / sinv, epsilon = 1e-12);
        assert_relative_eq!(h1[1], 0.25 / sinv, epsilon = 1e-12);
        let total: f64 = weights.series().iter().flat_map(|s| &s.weights).sum();
        assert_relative_eq!(total, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_window_wider_than_spectrum() {
        let reader = InMemorySftReader::new(1800.0)
            .with_sft(
                "H1",
                1e9,
                PowerSpectrum {
                    f0: 100.0,
                    df: 1.0,
                    power: vec![1.0; 10],
                },
            )
            .unwrap();
        let dataset = reader.load("", 100.0, 109.0).unwrap();
        let err = MultiNoiseWeights::from_dataset(&dataset, 101).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
