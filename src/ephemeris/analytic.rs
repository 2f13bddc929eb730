//! Low-precision analytic ephemeris.
//!
//! The Earth is placed on the Keplerian orbit of the Earth–Moon barycentre given by the mean
//! elements of Standish, *Keplerian Elements for Approximate Positions of the Major Planets*
//! (valid 1800–2050 AD). The Sun is held at the origin, so the resulting "barycentric" states are
//! heliocentric: positions are good to ~0.01 AU and velocities to ~1e-6 c, which is adequate for
//! antenna-pattern and Doppler-bound estimates but not for coherent phase models.

use nalgebra::Vector3;
use tracing::debug;

use super::{BodyTable, EphemerisData, EphemerisEntry, EphemerisProvider};
use crate::constants::{
    GpsSeconds, AU_LIGHT_SECONDS, DAYS_PER_CENTURY, DEFAULT_EPHEMERIS_STEP, DPI, RADEG,
    SECONDS_PER_DAY,
};
use crate::cw_errors::CwError;
use crate::ref_system::{ecliptic_to_equatorial, rotmt, Axis};
use crate::time::{tt_centuries_since_j2000, GpsTime};

/// Mean orbital elements of the Earth–Moon barycentre at J2000 and their rates per century.
/// (a [AU], e, I [deg], L [deg], long. perihelion [deg], long. node [deg])
const EMB_ELEMENTS: [f64; 6] = [1.000_002_61, 0.016_711_23, -0.000_015_31, 100.464_571_66, 102.937_681_93, 0.0];
const EMB_RATES: [f64; 6] = [0.000_005_62, -0.000_043_92, -0.012_946_68, 35_999.372_449_81, 0.323_273_64, 0.0];

const KEPLER_MAX_ITER: usize = 50;
/// Upper bound on the number of tabulated entries per body.
const MAX_TABLE_ENTRIES: usize = 1 << 20;
const KEPLER_TOL: f64 = 1e-14;

/// Analytic Earth orbit tabulated over `[start, end]` GPS seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticEphemeris {
    pub start: GpsSeconds,
    pub end: GpsSeconds,
    pub step: f64,
}

impl AnalyticEphemeris {
    /// Tabulate with the default step ([`DEFAULT_EPHEMERIS_STEP`]).
    pub fn new(start: GpsSeconds, end: GpsSeconds) -> Self {
        AnalyticEphemeris {
            start,
            end,
            step: DEFAULT_EPHEMERIS_STEP,
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }
}

impl EphemerisProvider for AnalyticEphemeris {
    fn load(&self) -> Result<EphemerisData, CwError> {
        if !(self.start.is_finite() && self.end.is_finite() && self.end >= self.start) {
            return Err(CwError::InvalidEphemeris(format!(
                "invalid GPS span [{}, {}]",
                self.start, self.end
            )));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(CwError::InvalidEphemeris(format!(
                "tabulation step must be positive, got {}",
                self.step
            )));
        }

        // one extra sample on each side so that every instant of the span has a nearest entry
        let first = self.start - self.step;
        let n = ((self.end - self.start) / self.step).ceil() + 3.0;
        if n > MAX_TABLE_ENTRIES as f64 {
            return Err(CwError::InvalidEphemeris(format!(
                "step {} s over [{}, {}] needs {n} entries, more than {MAX_TABLE_ENTRIES}",
                self.step, self.start, self.end
            )));
        }
        let n = n as usize;
        debug!("Tabulating analytic Earth orbit: {n} entries from GPS {first}");

        let earth_entries = (0..n)
            .map(|i| {
                let gps = first + i as f64 * self.step;
                let (position, velocity, acceleration) = earth_barycentric_state(gps);
                EphemerisEntry {
                    gps,
                    position,
                    velocity,
                    acceleration,
                }
            })
            .collect();
        let sun_entries = (0..n)
            .map(|i| EphemerisEntry {
                gps: first + i as f64 * self.step,
                position: Vector3::zeros(),
                velocity: Vector3::zeros(),
                acceleration: Vector3::zeros(),
            })
            .collect();

        Ok(EphemerisData::new(
            BodyTable::new(self.step, earth_entries)?,
            BodyTable::new(self.step, sun_entries)?,
        ))
    }
}

/// Solve Kepler's equation `E − e sin E = M` by Newton iterations.
pub(crate) fn solve_kepler(mean_anomaly: f64, ecc: f64) -> f64 {
    let m = (mean_anomaly + std::f64::consts::PI).rem_euclid(DPI) - std::f64::consts::PI;
    let mut ecc_anomaly = if ecc < 0.8 { m } else { std::f64::consts::PI.copysign(m) };
    for _ in 0..KEPLER_MAX_ITER {
        let delta = (ecc_anomaly - ecc * ecc_anomaly.sin() - m) / (1.0 - ecc * ecc_anomaly.cos());
        ecc_anomaly -= delta;
        if delta.abs() < KEPLER_TOL {
            break;
        }
    }
    ecc_anomaly
}

/// Earth state (light-seconds, c, c/s) in the equatorial frame at a GPS time.
fn earth_barycentric_state(gps: GpsSeconds) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let t = tt_centuries_since_j2000(&GpsTime::from_f64(gps).to_epoch());
    let el: [f64; 6] = std::array::from_fn(|i| EMB_ELEMENTS[i] + EMB_RATES[i] * t);
    let (a, ecc) = (el[0], el[1]);
    let incl = el[2] * RADEG;
    let mean_long = el[3] * RADEG;
    let long_peri = el[4] * RADEG;
    let node = el[5] * RADEG;

    let mean_motion = (EMB_RATES[3] - EMB_RATES[4]) * RADEG / (DAYS_PER_CENTURY * SECONDS_PER_DAY);
    let ecc_anomaly = solve_kepler(mean_long - long_peri, ecc);
    let (sin_e, cos_e) = ecc_anomaly.sin_cos();
    let sqrt_1me2 = (1.0 - ecc * ecc).sqrt();

    let orbital_pos = Vector3::new(a * (cos_e - ecc), a * sqrt_1me2 * sin_e, 0.0);
    let e_dot = mean_motion / (1.0 - ecc * cos_e);
    let orbital_vel = Vector3::new(-a * sin_e * e_dot, a * sqrt_1me2 * cos_e * e_dot, 0.0);

    let to_ecliptic =
        rotmt(node, Axis::Z) * rotmt(incl, Axis::X) * rotmt(long_peri - node, Axis::Z);
    let to_equatorial = ecliptic_to_equatorial() * to_ecliptic;

    let pos_au = to_equatorial * orbital_pos;
    let vel_au = to_equatorial * orbital_vel;
    let mu = mean_motion * mean_motion * a * a * a;
    let acc_au = -pos_au * (mu / pos_au.norm().powi(3));

    (
        pos_au * AU_LIGHT_SECONDS,
        vel_au * AU_LIGHT_SECONDS,
        acc_au * AU_LIGHT_SECONDS,
    )
}

#[cfg(test)]
mod analytic_test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::constants::C_SI;

    #[test]
    fn test_solve_kepler() {
        for &(m, e) in &[(0.3, 0.0167), (2.9, 0.5), (-1.0, 0.9), (7.0, 0.1)] {
            let ecc_anomaly = solve_kepler(m, e);
            let residual = ecc_anomaly - e * ecc_anomaly.sin() - m;
            let wrapped = (residual + std::f64::consts::PI).rem_euclid(DPI) - std::f64::consts::PI;
            assert!(wrapped.abs() < 1e-12, "m={m} e={e} residual={wrapped}");
        }
    }

    #[test]
    fn test_earth_orbit_radius_and_speed() {
        // 2015-01-01, close to perihelion
        let (pos, vel, acc) = earth_barycentric_state(1_104_105_616.0);
        let r_au = pos.norm() / AU_LIGHT_SECONDS;
        assert!((0.982..0.988).contains(&r_au), "r = {r_au} AU");
        let speed_km_s = vel.norm() * C_SI / 1e3;
        assert!((29.9..30.5).contains(&speed_km_s), "v = {speed_km_s} km/s");
        // velocity is perpendicular to the radius near perihelion
        assert!(pos.normalize().dot(&vel.normalize()).abs() < 0.01);
        assert!(acc.dot(&pos) < 0.0);
    }

    #[test]
    fn test_velocity_matches_finite_difference() {
        let gps = 1_200_000_000.0;
        let h = 60.0;
        let (p0, _, _) = earth_barycentric_state(gps - h);
        let (_, v, _) = earth_barycentric_state(gps);
        let (p1, _, _) = earth_barycentric_state(gps + h);
        let fd = (p1 - p0) / (2.0 * h);
        assert_relative_eq!(fd, v, epsilon = 1e-8);
    }

    #[test]
    fn test_provider_covers_span() {
        let eph = AnalyticEphemeris::new(1e9, 1e9 + 86400.0).load().unwrap();
        let (start, end) = eph.span();
        assert!(start <= 1e9 && end >= 1e9 + 86400.0);

        let state = eph.earth_state(&GpsTime::from_f64(1e9 + 43200.0)).unwrap();
        let r_au = state.sun_distance() / AU_LIGHT_SECONDS;
        assert!((0.98..1.02).contains(&r_au));

        assert!(AnalyticEphemeris::new(2e9, 1e9).load().is_err());
        assert!(AnalyticEphemeris::new(1e9, 2e9).with_step(0.0).load().is_err());
    }

    #[test]
    fn test_table_size_bounded() {
        let err = AnalyticEphemeris::new(1e9, 1e9 + 86400.0)
            .with_step(1e-6)
            .load()
            .unwrap_err();
        assert!(matches!(err, CwError::InvalidEphemeris(_)));

        let eph = AnalyticEphemeris::new(1e9, 1e9 + 30.0 * 86400.0)
            .with_step(60.0)
            .load()
            .unwrap();
        assert_eq!(eph.earth().step(), 60.0);
    }
}
