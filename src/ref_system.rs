//! Elementary rotations between the reference frames used by the crate.
//!
//! Frames
//! -----------------
//! * **Earth-fixed**: x towards the Greenwich meridian, z along the rotation axis. Detector
//!   vertices and arms are tabulated in this frame.
//! * **Equatorial (ICRS-aligned)**: the frame of the ephemeris tables, of detector states and of
//!   sky positions (right ascension, declination).
//! * **Ecliptic J2000**: the frame of the analytic Keplerian orbit of the Earth.

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::constants::{Radian, OBLIQUITY_J2000};

/// Principal axis of an elementary rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Construct a right-handed 3×3 rotation matrix around one of the principal axes.
///
/// The rotation is **active**: it rotates the vector by `alpha` in the direct sense,
/// `x' = R · x`, and does not represent a change of basis.
///
/// # Arguments
///
/// * `alpha` - Rotation angle in **radians**.
/// * `axis` - Principal axis of rotation.
pub fn rotmt(alpha: Radian, axis: Axis) -> Matrix3<f64> {
    let axis = match axis {
        Axis::X => Vector3::x_axis(),
        Axis::Y => Vector3::y_axis(),
        Axis::Z => Vector3::z_axis(),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Rotation taking Earth-fixed vectors to the equatorial frame at a given sidereal angle.
///
/// At GMST `θ` the Greenwich meridian sits at right ascension `θ`, hence the active
/// rotation by `+θ` about the pole (precession and nutation are neglected).
pub fn earth_fixed_to_equatorial(gmst: Radian) -> Matrix3<f64> {
    rotmt(gmst, Axis::Z)
}

/// Rotation from ecliptic J2000 to equatorial J2000 coordinates.
pub fn ecliptic_to_equatorial() -> Matrix3<f64> {
    rotmt(OBLIQUITY_J2000, Axis::X)
}
