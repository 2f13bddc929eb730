//! # Covering band of a CW signal
//!
//! Bound the frequency interval that the instantaneous (detector-frame) frequency of a signal
//! can occupy during `[tstart, tend]`, for every sky position:
//!
//! 1. the spin range `(F0, F1, F2) + [0, band]` given at `tref` is extrapolated to `tstart`,
//!    `tend` and to every interior stationary point of the frequency evolution, taking the
//!    term-wise extremes of the Taylor series;
//! 2. the bound is widened by the largest Doppler factor due to the Earth orbital and
//!    rotational motion,
//!
//! ```text
//! extra = 1.05 · 2π/c · (AU / yr_sid + R⊕ / day_sid) ≈ 1.06e-4
//! ```
//!
//! 3. and, for a binary source, by `1.05 · 2π · asini · (1 + e) / (P √(1 − e²))`.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{
    GpsSeconds, Hertz, LightSeconds, Seconds, AU_SI, C_SI, DAYSID_SI, DOPPLER_MARGIN, DPI,
    REARTH_SI, YRSID_SI,
};
use crate::cw_errors::CwError;

/// Number of spin parameters: frequency and its first two derivatives.
pub const SPIN_ORDER: usize = 3;

/// Spin parameters `fkdot` and their non-negative bandwidths at a reference time.
///
/// The covered range of the k-th derivative is `[fkdot[k], fkdot[k] + fkdot_band[k]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinRange {
    pub ref_time: GpsSeconds,
    pub fkdot: [f64; SPIN_ORDER],
    pub fkdot_band: [f64; SPIN_ORDER],
}

impl SpinRange {
    /// Errors
    /// ----------
    /// * [`CwError::InvalidSpinRange`] if a value is non-finite or a band is negative.
    pub fn new(
        ref_time: GpsSeconds,
        fkdot: [f64; SPIN_ORDER],
        fkdot_band: [f64; SPIN_ORDER],
    ) -> Result<Self, CwError> {
        if !ref_time.is_finite() || fkdot.iter().chain(&fkdot_band).any(|v| !v.is_finite()) {
            return Err(CwError::InvalidSpinRange(format!(
                "non-finite value in tref={ref_time}, fkdot={fkdot:?}, band={fkdot_band:?}"
            )));
        }
        if let Some((k, band)) = fkdot_band.iter().enumerate().find(|(_, b)| **b < 0.0) {
            return Err(CwError::InvalidSpinRange(format!(
                "band of spin derivative {k} is negative: {band}"
            )));
        }
        Ok(SpinRange {
            ref_time,
            fkdot,
            fkdot_band,
        })
    }

    /// Range at another reference time.
    ///
    /// Every derivative is propagated with its Taylor series
    /// `f⁽ᵏ⁾(t) = Σ_l f⁽ᵏ⁺ˡ⁾ Δtˡ / l!`, taking the smallest and the largest value of each term
    /// over the band edges, so the result encloses all trajectories starting in `self`.
    pub fn extrapolate(&self, new_ref_time: GpsSeconds) -> SpinRange {
        let dt = new_ref_time - self.ref_time;
        let mut fkdot = [0.0; SPIN_ORDER];
        let mut fkdot_band = [0.0; SPIN_ORDER];
        for k in 0..SPIN_ORDER {
            let (mut lo, mut hi) = (0.0, 0.0);
            for l in 0..SPIN_ORDER - k {
                let factor = dt.powi(l as i32) / (1..=l).product::<usize>() as f64;
                let edge0 = self.fkdot[k + l] * factor;
                let edge1 = (self.fkdot[k + l] + self.fkdot_band[k + l]) * factor;
                lo += edge0.min(edge1);
                hi += edge0.max(edge1);
            }
            fkdot[k] = lo;
            fkdot_band[k] = hi - lo;
        }
        SpinRange {
            ref_time: new_ref_time,
            fkdot,
            fkdot_band,
        }
    }

    /// Times relative to `ref_time` where `F0(t)` is stationary, for every corner of the
    /// `(F1, F2)` box.
    fn stationary_offsets(&self) -> impl Iterator<Item = Seconds> + '_ {
        let f1 = [self.fkdot[1], self.fkdot[1] + self.fkdot_band[1]];
        let f2 = [self.fkdot[2], self.fkdot[2] + self.fkdot_band[2]];
        f1.into_iter()
            .cartesian_product(f2)
            .filter(|(_, f2)| *f2 != 0.0)
            .map(|(f1, f2)| -f1 / f2)
    }
}

/// Worst-case orbital parameters of a binary source. All zero means no orbital motion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BinaryOrbitBounds {
    /// Largest projected semi-major axis, light-seconds.
    pub max_asini: LightSeconds,
    /// Shortest orbital period, s.
    pub min_period: Seconds,
    /// Largest eccentricity.
    pub max_ecc: f64,
}

impl BinaryOrbitBounds {
    fn validate(&self) -> Result<(), CwError> {
        if !(self.max_asini.is_finite() && self.max_asini >= 0.0) {
            return Err(CwError::InvalidOrbitBounds(format!(
                "projected semi-major axis must be non-negative, got {}",
                self.max_asini
            )));
        }
        if !(0.0..1.0).contains(&self.max_ecc) {
            return Err(CwError::InvalidOrbitBounds(format!(
                "eccentricity must lie in [0, 1), got {}",
                self.max_ecc
            )));
        }
        if self.max_asini > 0.0 && !(self.min_period.is_finite() && self.min_period > 0.0) {
            return Err(CwError::InvalidOrbitBounds(format!(
                "orbital period must be positive for asini = {} s, got {}",
                self.max_asini, self.min_period
            )));
        }
        Ok(())
    }

    /// Largest relative Doppler shift due to the orbit.
    pub fn max_doppler(&self) -> f64 {
        if self.max_asini > 0.0 {
            let e = self.max_ecc;
            DOPPLER_MARGIN * DPI * self.max_asini * (1.0 + e)
                / (self.min_period * (1.0 - e * e).sqrt())
        } else {
            0.0
        }
    }
}

/// Frequency interval `[min_frequency, max_frequency]`, both finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoveringBand {
    pub min_frequency: Hertz,
    pub max_frequency: Hertz,
}

impl CoveringBand {
    pub fn width(&self) -> Hertz {
        self.max_frequency - self.min_frequency
    }

    pub fn contains(&self, frequency: Hertz) -> bool {
        (self.min_frequency..=self.max_frequency).contains(&frequency)
    }
}

/// Largest relative Doppler shift due to the Earth orbital and rotational motion.
pub fn detector_max_doppler() -> f64 {
    DOPPLER_MARGIN * DPI / C_SI * (AU_SI / YRSID_SI + REARTH_SI / DAYSID_SI)
}

/// Covering band of a signal observed during `[tstart, tend]`.
///
/// Errors
/// ----------
/// * [`CwError::InvertedTimeRange`] if `tend < tstart`.
/// * [`CwError::InvalidOrbitBounds`] for a negative axis, an eccentricity outside `[0, 1)` or
///   a non-positive period of an orbiting source.
/// * [`CwError::InvalidCoveringBand`] if the result is non-finite, not strictly positive or
///   inverted.
pub fn cw_signal_covering_band(
    tstart: GpsSeconds,
    tend: GpsSeconds,
    spin_range: &SpinRange,
    binary: &BinaryOrbitBounds,
) -> Result<CoveringBand, CwError> {
    if !(tend >= tstart) {
        return Err(CwError::InvertedTimeRange {
            start: tstart,
            end: tend,
        });
    }
    binary.validate()?;

    let interior = spin_range
        .stationary_offsets()
        .map(|dt| spin_range.ref_time + dt)
        .filter(|t| *t > tstart && *t < tend);
    let (f_min, f_max) = [tstart, tend]
        .into_iter()
        .chain(interior)
        .map(|t| spin_range.extrapolate(t))
        .flat_map(|r| [r.fkdot[0], r.fkdot[0] + r.fkdot_band[0]])
        .minmax_by(f64::total_cmp)
        .into_option()
        .ok_or(CwError::InvalidCoveringBand {
            min: f64::NAN,
            max: f64::NAN,
        })?;

    let extra = detector_max_doppler() + binary.max_doppler();
    let band = CoveringBand {
        min_frequency: f_min * (1.0 - extra),
        max_frequency: f_max * (1.0 + extra),
    };
    debug!(
        "Covering band over [{tstart}, {tend}]: intrinsic [{f_min}, {f_max}] Hz, Doppler factor {extra:.4e} -> [{}, {}] Hz",
        band.min_frequency, band.max_frequency
    );

    let CoveringBand {
        min_frequency: min,
        max_frequency: max,
    } = band;
    if !(min.is_finite() && max.is_finite() && min > 0.0 && max > 0.0 && min <= max) {
        return Err(CwError::InvalidCoveringBand { min, max });
    }
    Ok(band)
}

#[cfg(test)]
mod covering_band_test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::cw_errors::ErrorKind;

    fn spin(f: [f64; 3], band: [f64; 3], tref: f64) -> SpinRange {
        SpinRange::new(tref, f, band).unwrap()
    }

    #[test]
    fn test_detector_doppler() {
        let extra = detector_max_doppler();
        assert!((1.05e-4..1.07e-4).contains(&extra), "{extra}");
    }

    #[test]
    fn test_extrapolate_spin_range() {
        let range = spin([10.0, -1e-9, 0.0], [0.0, 2e-10, 0.0], 1e9);
        let moved = range.extrapolate(1e9 + 1000.0);
        assert_relative_eq!(moved.fkdot[0], 10.0 - 1e-6, epsilon = 1e-15);
        assert_relative_eq!(moved.fkdot_band[0], 2e-7, epsilon = 1e-15);
        assert_relative_eq!(moved.fkdot[1], -1e-9);

        // backwards: the upper F1 edge gives the lower F0
        let back = range.extrapolate(1e9 - 1000.0);
        assert_relative_eq!(back.fkdot[0], 10.0 + 1e-6 - 2e-7, epsilon = 1e-15);

        let same = range.extrapolate(1e9);
        assert_eq!(same.fkdot, range.fkdot);
        assert_relative_eq!(same.fkdot_band[1], 2e-10, epsilon = 1e-20);
    }

    #[test]
    fn test_one_day_band_is_symmetric() {
        let t0 = 1_000_000_000.0;
        let band = cw_signal_covering_band(
            t0,
            t0 + 86400.0,
            &spin([100.0, 0.0, 0.0], [0.0; 3], t0),
            &BinaryOrbitBounds::default(),
        )
        .unwrap();
        let extra = detector_max_doppler();
        assert_relative_eq!(band.min_frequency, 100.0 * (1.0 - extra), epsilon = 1e-12);
        assert_relative_eq!(band.max_frequency, 100.0 * (1.0 + extra), epsilon = 1e-12);
        assert_relative_eq!(
            100.0 - band.min_frequency,
            band.max_frequency - 100.0,
            max_relative = 1e-9
        );
        assert!(band.contains(100.0));
        assert!(band.width() > 1.0 / 1800.0);
    }

    #[test]
    fn test_spindown_drift() {
        let t0 = 1e9;
        let band = cw_signal_covering_band(
            t0,
            t0 + 1e6,
            &spin([50.0, -1e-8, 0.0], [0.1, 0.0, 0.0], t0 + 5e5),
            &BinaryOrbitBounds::default(),
        )
        .unwrap();
        assert!(band.min_frequency < 50.0 - 5e-3);
        assert!(band.max_frequency > 50.1 + 5e-3);
    }

    #[test]
    fn test_interior_extremum() {
        let t0 = 1e9;
        // F0(t) peaks at 100.05 Hz half-way and is back to 100 Hz at the end
        let band = cw_signal_covering_band(
            t0,
            t0 + 2e5,
            &spin([100.0, 1e-6, -1e-11], [0.0; 3], t0),
            &BinaryOrbitBounds::default(),
        )
        .unwrap();
        assert!(band.max_frequency >= 100.05);
    }

    #[test]
    fn test_binary_widening() {
        let t0 = 1e9;
        let spin = spin([100.0, 0.0, 0.0], [0.0; 3], t0);
        let orbit = BinaryOrbitBounds {
            max_asini: 10.0,
            min_period: 86400.0,
            max_ecc: 0.0,
        };
        let band = cw_signal_covering_band(t0, t0 + 86400.0, &spin, &orbit).unwrap();
        let extra = detector_max_doppler() + 1.05 * DPI * 10.0 / 86400.0;
        assert_relative_eq!(band.max_frequency, 100.0 * (1.0 + extra), epsilon = 1e-10);

        let eccentric = BinaryOrbitBounds {
            max_ecc: 0.5,
            ..orbit
        };
        assert!(eccentric.max_doppler() > orbit.max_doppler());
    }

    #[test]
    fn test_invalid_inputs() {
        let t0 = 1e9;
        let spin_ok = spin([100.0, 0.0, 0.0], [0.0; 3], t0);
        let err = cw_signal_covering_band(t0, t0 - 1.0, &spin_ok, &BinaryOrbitBounds::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Computation);

        assert_eq!(
            SpinRange::new(t0, [100.0, 0.0, 0.0], [-1.0, 0.0, 0.0])
                .unwrap_err()
                .kind(),
            ErrorKind::Configuration
        );

        let bad_orbit = BinaryOrbitBounds {
            max_asini: 1.0,
            min_period: 0.0,
            max_ecc: 0.0,
        };
        let err = cw_signal_covering_band(t0, t0 + 1.0, &spin_ok, &bad_orbit).unwrap_err();
        assert!(matches!(err, CwError::InvalidOrbitBounds(_)));
        let bad_ecc = BinaryOrbitBounds {
            max_ecc: 1.0,
            ..Default::default()
        };
        assert!(cw_signal_covering_band(t0, t0 + 1.0, &spin_ok, &bad_ecc).is_err());

        // a spin-down reaching negative frequencies
        let crash = spin([1.0, -1e-3, 0.0], [0.0; 3], t0);
        let err = cw_signal_covering_band(t0, t0 + 1e4, &crash, &BinaryOrbitBounds::default())
            .unwrap_err();
        assert!(matches!(err, CwError::InvalidCoveringBand { .. }));
    }
}
