//! # Detector dataset access
//!
//! The detectability estimate can take its observing schedule and its noise floor from an
//! existing dataset of short Fourier transforms (SFTs). Reading SFT files is the job of an
//! external collaborator implementing [`SftDatasetReader`]; this module fixes the shape of the
//! data it hands back:
//!
//! * a [`MultiTimestampSeries`] with the start time of every SFT, and
//! * for each detector and each SFT, a [`PowerSpectrum`] restricted to the requested band,
//!   holding one-sided power spectral density estimates (1/Hz), e.g. `2 |X̃(f)|² / Tsft`.
//!
//! [`InMemorySftReader`] serves spectra already held in memory.

use std::collections::BTreeMap;

use crate::constants::{Hertz, Seconds};
use crate::cw_errors::CwError;
use crate::detectors::Detector;
use crate::time::GpsTime;
use crate::timestamps::{MultiTimestampSeries, TimestampSeries};

/// Power spectral density of one SFT over a contiguous band.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    /// Frequency of the first bin, Hz.
    pub f0: Hertz,
    /// Bin width, Hz.
    pub df: Hertz,
    /// One-sided PSD estimate per bin, 1/Hz.
    pub power: Vec<f64>,
}

impl PowerSpectrum {
    /// Frequency of the last bin, Hz.
    pub fn f_max(&self) -> Hertz {
        self.f0 + (self.power.len().saturating_sub(1)) as f64 * self.df
    }

    /// Restrict to the bins covering `[f_min, f_max]`.
    pub fn band(&self, f_min: Hertz, f_max: Hertz) -> Result<PowerSpectrum, CwError> {
        if self.power.is_empty() || f_min > f_max || f_min < self.f0 || f_max > self.f_max() {
            return Err(CwError::InvalidNoiseInput(format!(
                "band [{f_min}, {f_max}] Hz not contained in the data [{}, {}] Hz",
                self.f0,
                self.f_max()
            )));
        }
        let first = ((f_min - self.f0) / self.df).floor() as usize;
        let last = (((f_max - self.f0) / self.df).ceil() as usize).min(self.power.len() - 1);
        Ok(PowerSpectrum {
            f0: self.f0 + first as f64 * self.df,
            df: self.df,
            power: self.power[first..=last].to_vec(),
        })
    }
}

/// Spectra of one detector, aligned with its timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSpectra {
    pub detector: Detector,
    pub spectra: Vec<PowerSpectrum>,
}

/// Timestamps and band-limited spectra returned by a dataset reader.
#[derive(Debug, Clone, PartialEq)]
pub struct SftDataset {
    timestamps: MultiTimestampSeries,
    spectra: Vec<DetectorSpectra>,
}

impl SftDataset {
    /// Assemble a dataset, checking that spectra and timestamps describe the same SFTs.
    pub fn new(
        timestamps: MultiTimestampSeries,
        spectra: Vec<DetectorSpectra>,
    ) -> Result<Self, CwError> {
        let expected: Vec<String> = timestamps.detectors().iter().map(|s| s.to_string()).collect();
        let found: Vec<String> = spectra.iter().map(|s| s.detector.name.to_string()).collect();
        if expected != found {
            return Err(CwError::DetectorMismatch {
                context: "power spectra",
                expected,
                found,
            });
        }
        for (ts, sp) in timestamps.series().iter().zip(&spectra) {
            if ts.len() != sp.spectra.len() {
                return Err(CwError::SampleCountMismatch {
                    detector: ts.detector.name.to_string(),
                    context: "power spectra",
                    expected: ts.len(),
                    found: sp.spectra.len(),
                });
            }
        }
        Ok(SftDataset {
            timestamps,
            spectra,
        })
    }

    pub fn timestamps(&self) -> &MultiTimestampSeries {
        &self.timestamps
    }

    pub fn spectra(&self) -> &[DetectorSpectra] {
        &self.spectra
    }

    pub fn tsft(&self) -> Seconds {
        self.timestamps.tsft()
    }
}

/// Collaborator able to locate and load SFT datasets.
pub trait SftDatasetReader {
    /// Frequency resolution (bin width) of the dataset matching `pattern`, Hz.
    fn frequency_resolution(&self, pattern: &str) -> Result<Hertz, CwError>;

    /// Load the timestamps and the spectra restricted to `[f_min, f_max]`.
    fn load(&self, pattern: &str, f_min: Hertz, f_max: Hertz) -> Result<SftDataset, CwError>;
}

/// Dataset reader over SFT spectra held in memory. The file pattern is ignored.
#[derive(Debug, Clone, Default)]
pub struct InMemorySftReader {
    tsft: Seconds,
    sfts: BTreeMap<&'static str, Vec<(GpsTime, PowerSpectrum)>>,
}

impl InMemorySftReader {
    pub fn new(tsft: Seconds) -> Self {
        InMemorySftReader {
            tsft,
            sfts: BTreeMap::new(),
        }
    }

    /// Register the spectrum of one SFT starting at `start` GPS seconds.
    pub fn with_sft(
        mut self,
        detector: &str,
        start: f64,
        spectrum: PowerSpectrum,
    ) -> Result<Self, CwError> {
        let detector = Detector::from_name(detector)?;
        let entry = self.sfts.entry(detector.name).or_default();
        entry.push((GpsTime::from_f64(start), spectrum));
        entry.sort_by_key(|(t, _)| *t);
        Ok(self)
    }
}

impl SftDatasetReader for InMemorySftReader {
    fn frequency_resolution(&self, _pattern: &str) -> Result<Hertz, CwError> {
        self.sfts
            .values()
            .flatten()
            .map(|(_, spectrum)| spectrum.df)
            .next()
            .ok_or_else(|| CwError::InvalidNoiseInput("no SFT registered".into()))
    }

    fn load(&self, _pattern: &str, f_min: Hertz, f_max: Hertz) -> Result<SftDataset, CwError> {
        let mut series = Vec::with_capacity(self.sfts.len());
        let mut spectra = Vec::with_capacity(self.sfts.len());
        for (name, sfts) in &self.sfts {
            let detector = Detector::from_name(name)?;
            series.push(TimestampSeries {
                detector,
                timestamps: sfts.iter().map(|(t, _)| *t).collect(),
                tsft: self.tsft,
            });
            spectra.push(DetectorSpectra {
                detector,
                spectra: sfts
                    .iter()
                    .map(|(_, s)| s.band(f_min, f_max))
                    .collect::<Result<Vec<_>, CwError>>()?,
            });
        }
        SftDataset::new(MultiTimestampSeries::from_series(series, self.tsft)?, spectra)
    }
}

#[cfg(test)]
mod sft_data_test {
    use super::*;
    use crate::cw_errors::ErrorKind;

    fn flat(f0: f64, df: f64, n: usize, level: f64) -> PowerSpectrum {
        PowerSpectrum {
            f0,
            df,
            power: vec![level; n],
        }
    }

    #[test]
    fn test_band_selection() {
        let sp = PowerSpectrum {
            f0: 100.0,
            df: 0.5,
            power: (0..20).map(|i| i as f64).collect(),
        };
        let band = sp.band(101.2, 102.0).unwrap();
        assert_eq!(band.f0, 101.0);
        assert_eq!(band.power, vec![2.0, 3.0, 4.0]);
        assert!(sp.band(99.0, 101.0).is_err());
        assert!(sp.band(101.0, 120.0).is_err());
    }

    #[test]
    fn test_in_memory_reader() {
        let reader = InMemorySftReader::new(1800.0)
            .with_sft("L1", 1e9 + 1800.0, flat(50.0, 1.0 / 1800.0, 1000, 1e-46))
            .unwrap()
            .with_sft("L1", 1e9, flat(50.0, 1.0 / 1800.0, 1000, 1e-46))
            .unwrap()
            .with_sft("H1", 1e9, flat(50.0, 1.0 / 1800.0, 1000, 2e-46))
            .unwrap();

        assert_eq!(reader.frequency_resolution("*.sft").unwrap(), 1.0 / 1800.0);
        let data = reader.load("*.sft", 50.1, 50.2).unwrap();
        assert_eq!(data.timestamps().detectors(), vec!["H1", "L1"]);
        let l1 = data.timestamps().get("L1").unwrap();
        assert!(l1.timestamps[0] < l1.timestamps[1]);
        assert_eq!(data.spectra()[1].spectra.len(), 2);
        assert!(data.spectra()[0].spectra[0].power.len() >= 180);
    }

    #[test]
    fn test_reader_errors() {
        let empty = InMemorySftReader::new(1800.0);
        assert_eq!(
            empty.frequency_resolution("").unwrap_err().kind(),
            ErrorKind::Configuration
        );
        let err = InMemorySftReader::new(1800.0)
            .with_sft("Q1", 1e9, flat(50.0, 1.0, 10, 1.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
