//! # Solar-system ephemeris context
//!
//! The motion of a ground-based detector relative to the solar-system barycentre (SSB) is
//! obtained from tabulated positions, velocities and accelerations of the Earth (and of the Sun)
//! sampled on a regular GPS-time grid. Between two samples the state is recovered with the
//! second-order Taylor expansion around the **nearest** entry:
//!
//! ```text
//! r(t) = r_j + v_j Δt + ½ a_j Δt²        v(t) = v_j + a_j Δt        Δt = t − t_j
//! ```
//!
//! ## Units & frame
//!
//! - positions: light-seconds; velocities: units of `c`; accelerations: `c`/s
//! - equatorial (ICRS-aligned) frame, origin at the SSB
//!
//! ## Providers
//!
//! An [`EphemerisProvider`] is consumed **once** to produce an immutable [`EphemerisData`],
//! which is then shared read-only (typically behind an [`std::sync::Arc`]) by every detector
//! state evaluation:
//!
//! - [`lal_reader::LalEphemerisFiles`] – LALSuite plain-text `earth*.dat` / `sun*.dat` tables.
//! - [`analytic::AnalyticEphemeris`] – low-precision Keplerian orbit of the Earth–Moon
//!   barycentre, tabulated over a requested GPS span (no data files needed).

pub mod analytic;
pub mod lal_reader;

use nalgebra::Vector3;

use crate::constants::GpsSeconds;
use crate::cw_errors::CwError;
use crate::time::GpsTime;

/// One tabulated state of a solar-system body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EphemerisEntry {
    pub gps: GpsSeconds,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
}

/// Regularly sampled states of one body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyTable {
    step: f64,
    entries: Vec<EphemerisEntry>,
}

impl BodyTable {
    /// Build a table from entries spaced by `step` seconds.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::InvalidEphemeris`] if the table is empty, the step is not positive or the
    ///   entries are not regularly spaced.
    pub fn new(step: f64, entries: Vec<EphemerisEntry>) -> Result<Self, CwError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(CwError::InvalidEphemeris(format!(
                "tabulation step must be positive, got {step}"
            )));
        }
        let Some(first) = entries.first() else {
            return Err(CwError::InvalidEphemeris("empty table".into()));
        };
        let start = first.gps;
        if let Some((i, e)) = entries
            .iter()
            .enumerate()
            .find(|(i, e)| (e.gps - (start + *i as f64 * step)).abs() > 1e-6 * step)
        {
            return Err(CwError::InvalidEphemeris(format!(
                "entry {i} at GPS {} breaks the regular {step} s spacing",
                e.gps
            )));
        }
        Ok(BodyTable { step, entries })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn entries(&self) -> &[EphemerisEntry] {
        &self.entries
    }

    /// GPS span `[start, end]` covered by the table.
    pub fn span(&self) -> (GpsSeconds, GpsSeconds) {
        let start = self.entries[0].gps;
        (start, start + (self.entries.len() - 1) as f64 * self.step)
    }

    /// Position and velocity at `gps` from the nearest tabulated entry.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::EphemerisOutOfRange`] if `gps` lies outside the table span.
    pub fn interpolate(&self, gps: GpsSeconds) -> Result<(Vector3<f64>, Vector3<f64>), CwError> {
        let (start, end) = self.span();
        if !(start..=end).contains(&gps) {
            return Err(CwError::EphemerisOutOfRange { gps, start, end });
        }
        let idx = (((gps - start) / self.step).round() as usize).min(self.entries.len() - 1);
        let entry = &self.entries[idx];
        let dt = gps - entry.gps;

        let position = entry.position + entry.velocity * dt + entry.acceleration * (0.5 * dt * dt);
        let velocity = entry.velocity + entry.acceleration * dt;
        Ok((position, velocity))
    }
}

/// Earth barycentric state at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarthState {
    /// Earth centre position relative to the SSB, light-seconds.
    pub position: Vector3<f64>,
    /// Earth centre velocity relative to the SSB, units of `c`.
    pub velocity: Vector3<f64>,
    /// Sun position relative to the SSB, light-seconds.
    pub sun_position: Vector3<f64>,
}

impl EarthState {
    /// Earth–Sun distance, light-seconds.
    pub fn sun_distance(&self) -> f64 {
        (self.position - self.sun_position).norm()
    }
}

/// Immutable ephemeris context: Earth and Sun tables.
///
/// Loaded once through an [`EphemerisProvider`], then shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisData {
    earth: BodyTable,
    sun: BodyTable,
}

impl EphemerisData {
    pub fn new(earth: BodyTable, sun: BodyTable) -> Self {
        EphemerisData { earth, sun }
    }

    pub fn earth(&self) -> &BodyTable {
        &self.earth
    }

    pub fn sun(&self) -> &BodyTable {
        &self.sun
    }

    /// GPS span over which both Earth and Sun are available.
    pub fn span(&self) -> (GpsSeconds, GpsSeconds) {
        let (e0, e1) = self.earth.span();
        let (s0, s1) = self.sun.span();
        (e0.max(s0), e1.min(s1))
    }

    /// Earth (and Sun) barycentric state at a GPS instant.
    pub fn earth_state(&self, time: &GpsTime) -> Result<EarthState, CwError> {
        let gps = time.as_f64();
        let (position, velocity) = self.earth.interpolate(gps)?;
        let (sun_position, _) = self.sun.interpolate(gps)?;
        Ok(EarthState {
            position,
            velocity,
            sun_position,
        })
    }
}

/// Source of an [`EphemerisData`] context.
pub trait EphemerisProvider {
    /// Load (or compute) the ephemeris tables. Called once per estimator.
    fn load(&self) -> Result<EphemerisData, CwError>;
}

impl EphemerisProvider for EphemerisData {
    fn load(&self) -> Result<EphemerisData, CwError> {
        Ok(self.clone())
    }
}
