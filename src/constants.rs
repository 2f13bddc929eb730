//! # Constants and type definitions for cwsnr
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! aliases** used throughout the crate, together with the few **default values** callers may
//! override (running-median window, ephemeris tabulation step).
//!
//! ## Overview
//!
//! - Astronomical and geophysical constants (SI, matching the LALSuite values)
//! - Unit conversions (degrees ↔ radians, AU ↔ light-seconds)
//! - Core type aliases used across the crate
//! - Defaults shared by the noise-floor estimation and the ephemeris providers

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Speed of light in vacuum, m/s
pub const C_SI: f64 = 299_792_458.0;

/// Astronomical Unit in meters (IAU 2012)
pub const AU_SI: f64 = 149_597_870_700.0;

/// Astronomical Unit in light-seconds
pub const AU_LIGHT_SECONDS: f64 = AU_SI / C_SI;

/// Sidereal year, s
pub const YRSID_SI: f64 = 31_558_149.763_545_6;

/// Sidereal day, s
pub const DAYSID_SI: f64 = 86_164.090_530_832_88;

/// Earth equatorial radius, m (IERS)
pub const REARTH_SI: f64 = 6_378_136.6;

/// Earth rotation rate around the celestial pole, rad/s
pub const EARTH_ROTATION_RATE: f64 = DPI / DAYSID_SI;

/// Obliquity of the ecliptic at J2000.0, rad
pub const OBLIQUITY_J2000: f64 = 0.409_092_804_222_329;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Number of days in a Julian century
pub const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Safety margin applied to the worst-case Doppler factors of the covering band
pub const DOPPLER_MARGIN: f64 = 1.05;

/// Relative tolerance used when checking positive semi-definiteness of antenna-pattern matrices
pub const PSD_TOLERANCE: f64 = 1e-12;

// -------------------------------------------------------------------------------------------------
// Defaults
// -------------------------------------------------------------------------------------------------

/// Running-median window (in frequency bins) used for noise-floor estimation,
/// consistent with `ComputeFstatistic_v2` / `PredictFstat`.
pub const DEFAULT_RUNNING_MEDIAN_WINDOW: usize = 101;

/// Extra frequency bins added on each side of the running-median half window
/// when loading a dataset around a central frequency.
pub const EXTRA_WING_BINS: usize = 10;

/// Tabulation step of the built-in analytic ephemeris, s
pub const DEFAULT_EPHEMERIS_STEP: f64 = 14_400.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in radians
pub type Radian = f64;
/// Frequency in hertz
pub type Hertz = f64;
/// Duration or absolute time in seconds
pub type Seconds = f64;
/// GPS time expressed as floating-point seconds
pub type GpsSeconds = f64;
/// Distance expressed in light-seconds
pub type LightSeconds = f64;
