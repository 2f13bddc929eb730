#![allow(dead_code)]

use std::sync::Arc;

use cwsnr::ephemeris::analytic::AnalyticEphemeris;
use cwsnr::ephemeris::{EphemerisData, EphemerisProvider};
use cwsnr::noise_weights::running_median_bias;
use cwsnr::sft_data::{InMemorySftReader, PowerSpectrum};

pub const T0: f64 = 1_000_000_000.0;
pub const TSFT: f64 = 1800.0;

/// Analytic ephemeris context covering `days` days from [`T0`].
pub fn shared_ephemeris(days: f64) -> Arc<EphemerisData> {
    Arc::new(
        AnalyticEphemeris::new(T0, T0 + days * 86400.0)
            .load()
            .unwrap(),
    )
}

/// Contiguous SFT start times from [`T0`].
pub fn contiguous_timestamps(n: usize) -> Vec<f64> {
    (0..n).map(|i| T0 + i as f64 * TSFT).collect()
}

/// Reader serving `n` contiguous SFTs per detector, each with a flat noise floor such that the
/// bias-corrected running median gives `sqrt_sx²` for `window`.
pub fn flat_noise_reader(
    detectors: &[(&str, f64)],
    n: usize,
    f0: f64,
    n_bins: usize,
    window: usize,
) -> InMemorySftReader {
    let bias = running_median_bias(window);
    let mut reader = InMemorySftReader::new(TSFT);
    for &(det, sqrt_sx) in detectors {
        for t in contiguous_timestamps(n) {
            reader = reader
                .with_sft(
                    det,
                    t,
                    PowerSpectrum {
                        f0,
                        df: 1.0 / TSFT,
                        power: vec![sqrt_sx * sqrt_sx * bias; n_bins],
                    },
                )
                .unwrap();
        }
    }
    reader
}
