//! # GPS time representation and sidereal time
//!
//! - [`GpsTime`]: integer-second / integer-nanosecond GPS instant obtained by floor-splitting a
//!   floating-point second value. Sub-nanosecond precision is dropped.
//! - Conversions to [`hifitime::Epoch`] (GPS time scale) and to the MJD values needed by the
//!   Earth-rotation and orbital models.
//! - [`gmst`]: Greenwich Mean Sidereal Time from a UT1 (≈ UTC) Modified Julian Date.

use std::fmt;

use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use crate::constants::{DAYS_PER_CENTURY, DPI, T2000};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A GPS-referenced instant split into integer seconds and nanoseconds.
///
/// Invariant: `0 <= nanoseconds < 1e9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GpsTime {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl GpsTime {
    /// Floor-split a floating-point GPS second value.
    ///
    /// `seconds = floor(t)` and `nanoseconds = floor(1e9 × (t − seconds))`.
    ///
    /// Arguments
    /// -----------------
    /// * `t`: GPS time in seconds (must be finite, checked by the callers).
    ///
    /// Return
    /// ----------
    /// * The corresponding [`GpsTime`].
    pub fn from_f64(t: f64) -> Self {
        let seconds = t.floor();
        let mut secs = seconds as i64;
        let mut nanos = (1e9 * (t - seconds)).floor() as i64;
        // 1e9 × frac can round up to exactly 1e9 for fractions within one ulp of 1
        if nanos >= NANOS_PER_SECOND {
            secs += 1;
            nanos -= NANOS_PER_SECOND;
        }
        GpsTime {
            seconds: secs,
            nanoseconds: nanos as u32,
        }
    }

    /// GPS time as floating-point seconds.
    pub fn as_f64(&self) -> f64 {
        self.seconds as f64 + self.nanoseconds as f64 * 1e-9
    }

    /// Shift by a floating-point number of seconds.
    pub fn offset(&self, dt: f64) -> Self {
        GpsTime::from_f64(self.seconds as f64 + (self.nanoseconds as f64 * 1e-9 + dt))
    }

    /// Convert to a [`hifitime::Epoch`] in the GPS time scale.
    pub fn to_epoch(&self) -> Epoch {
        Epoch::from_gpst_seconds(self.as_f64())
    }
}

impl From<f64> for GpsTime {
    fn from(t: f64) -> Self {
        GpsTime::from_f64(t)
    }
}

impl fmt::Display for GpsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
    }
}

/// Julian centuries of TT elapsed since J2000.0 for a GPS epoch.
pub fn tt_centuries_since_j2000(epoch: &Epoch) -> f64 {
    (epoch.to_mjd_tt_days() - T2000) / DAYS_PER_CENTURY
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date (UT1 time scale).
///
/// IAU 1982 polynomial for the mean sidereal time at 0h UT1, plus the fractional-day
/// contribution scaled from solar to sidereal rate.
///
/// # Arguments
/// * `tjm` - Modified Julian Date (MJD, UT1 time scale)
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
pub fn gmst(tjm: f64) -> f64 {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // Ratio of sidereal day to solar day
    const RAP: f64 = 1.00273790934;

    let itjm = tjm.floor();
    let t = (itjm - T2000) / DAYS_PER_CENTURY;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / 86400.0;

    let h = (tjm - itjm) * DPI;
    (gmst0 + h * RAP).rem_euclid(DPI)
}

/// GMST of a GPS instant, using UTC as a proxy for UT1 (|UT1 − UTC| < 0.9 s).
pub fn gmst_of_gps(time: &GpsTime) -> f64 {
    gmst(time.to_epoch().to_mjd_utc_days())
}
