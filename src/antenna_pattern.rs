//! # Antenna-pattern response
//!
//! For a sky position `(α, δ)` and the response tensor `d` of a detector at one instant, the
//! polarization-independent beam coefficients are
//!
//! ```text
//! ξ = (−sin α, cos α, 0)          η = (sin δ cos α, sin δ sin α, −cos δ)
//! a = ξᵀ d ξ − ηᵀ d η             b = 2 ξᵀ d η
//! ```
//!
//! and the network antenna-pattern matrix is made of the noise-weighted sums
//! `A = Σ w a²`, `B = Σ w b²`, `C = Σ w a b`, with `E = 0` in the long-wavelength limit and
//! `D = A B − C² − E²`. The normalization `Sinv_Tsft` travels with the matrix.

use itertools::izip;
use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{Radian, DPI, PSD_TOLERANCE};
use crate::cw_errors::CwError;
use crate::detector_states::MultiDetectorStateSeries;
use crate::detectors::Detector;
use crate::noise_weights::NoiseSource;

/// Equatorial sky position, radians.
///
/// Constructed positions are normalized: `alpha ∈ [0, 2π)`, `delta ∈ [−π/2, π/2]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub alpha: Radian,
    pub delta: Radian,
}

impl SkyPosition {
    pub fn new(alpha: Radian, delta: Radian) -> Self {
        SkyPosition { alpha, delta }.normalized()
    }

    /// Fold the latitude into `[−π/2, π/2]` (shifting the longitude by π when folding) and wrap
    /// the longitude into `[0, 2π)`.
    pub fn normalized(&self) -> Self {
        use std::f64::consts::{FRAC_PI_2, PI};

        let mut alpha = self.alpha.rem_euclid(DPI);
        let mut delta = (self.delta + PI).rem_euclid(DPI) - PI;
        if delta > FRAC_PI_2 {
            delta = PI - delta;
            alpha += PI;
        } else if delta < -FRAC_PI_2 {
            delta = -PI - delta;
            alpha += PI;
        }
        SkyPosition {
            alpha: alpha.rem_euclid(DPI),
            delta,
        }
    }

    /// Orthonormal basis `(ξ, η)` of the plane transverse to the propagation direction.
    pub fn wave_frame(&self) -> (Vector3<f64>, Vector3<f64>) {
        let (sin_a, cos_a) = self.alpha.sin_cos();
        let (sin_d, cos_d) = self.delta.sin_cos();
        (
            Vector3::new(-sin_a, cos_a, 0.0),
            Vector3::new(sin_d * cos_a, sin_d * sin_a, -cos_d),
        )
    }

    /// Beam coefficients `(a, b)` of a response tensor for this sky position.
    pub fn beam_coefficients(&self, detector_tensor: &Matrix3<f64>) -> (f64, f64) {
        let (xi, eta) = self.wave_frame();
        let d_xi = detector_tensor * xi;
        let d_eta = detector_tensor * eta;
        (xi.dot(&d_xi) - eta.dot(&d_eta), 2.0 * xi.dot(&d_eta))
    }
}

/// Beam coefficients of one detector and their weighted sums.
#[derive(Debug, Clone, PartialEq)]
pub struct AmCoeffs {
    pub detector: Detector,
    pub a: Vec<f64>,
    pub b: Vec<f64>,
    /// `Σ w a²`
    pub a_sum: f64,
    /// `Σ w b²`
    pub b_sum: f64,
    /// `Σ w a b`
    pub c_sum: f64,
}

/// Network antenna-pattern matrix with its noise normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AntennaPatternMatrix {
    a: f64,
    b: f64,
    c: f64,
    e: f64,
    sinv_tsft: f64,
}

impl AntennaPatternMatrix {
    /// Validate and build a matrix from its components.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::InvalidAntennaPattern`] if a component is non-finite, `sinv_tsft` is
    ///   negative, or the matrix is not positive semi-definite (`A, B ≥ 0`, `D ≥ 0` up to
    ///   [`PSD_TOLERANCE`]).
    pub fn new(a: f64, b: f64, c: f64, e: f64, sinv_tsft: f64) -> Result<Self, CwError> {
        if ![a, b, c, e, sinv_tsft].iter().all(|v| v.is_finite()) {
            return Err(CwError::InvalidAntennaPattern(format!(
                "non-finite component in A={a}, B={b}, C={c}, E={e}, Sinv_Tsft={sinv_tsft}"
            )));
        }
        let scale = a.abs().max(b.abs()).max(1.0);
        let tol = PSD_TOLERANCE * scale;
        let d = a * b - c * c - e * e;
        if a < -tol || b < -tol || d < -tol * scale || sinv_tsft < 0.0 {
            return Err(CwError::InvalidAntennaPattern(format!(
                "A={a}, B={b}, D={d}, Sinv_Tsft={sinv_tsft}"
            )));
        }
        Ok(AntennaPatternMatrix {
            a,
            b,
            c,
            e,
            sinv_tsft,
        })
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn e(&self) -> f64 {
        self.e
    }

    /// Determinant-like combination `A B − C² − E²`.
    pub fn d(&self) -> f64 {
        self.a * self.b - self.c * self.c - self.e * self.e
    }

    pub fn sinv_tsft(&self) -> f64 {
        self.sinv_tsft
    }

    /// 4×4 metric `M_μν` of the amplitude parameters (without the `Sinv_Tsft` factor).
    pub fn mmunu(&self) -> Matrix4<f64> {
        let (a, b, c, e) = (self.a, self.b, self.c, self.e);
        Matrix4::new(
            a, c, 0.0, e, //
            c, b, -e, 0.0, //
            0.0, -e, a, c, //
            e, 0.0, c, b,
        )
    }
}

/// Per-detector coefficients and the network matrix for one sky position.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiAmCoeffs {
    pub coeffs: Vec<AmCoeffs>,
    pub matrix: AntennaPatternMatrix,
}

/// Compute the beam coefficients of every state and their weighted sums.
///
/// Arguments
/// -----------------
/// * `states`: detector states of the network.
/// * `sky`: sky position, normalized before use.
/// * `noise`: per-SFT weights, or a flat noise floor (unit weights).
///
/// Errors
/// ----------
/// * [`CwError::DetectorMismatch`] / [`CwError::SampleCountMismatch`] if the weights do not
///   follow the states.
/// * [`CwError::InvalidAntennaPattern`] if the resulting matrix is not valid.
pub fn compute_multi_am_coeffs(
    states: &MultiDetectorStateSeries,
    sky: &SkyPosition,
    noise: &NoiseSource,
) -> Result<MultiAmCoeffs, CwError> {
    let sky = sky.normalized();
    let weights = match noise {
        NoiseSource::Weights(w) => Some(w),
        NoiseSource::AssumedSqrtSX(_) => None,
    };
    if let Some(w) = weights {
        let expected: Vec<String> = states.detectors().iter().map(|s| s.to_string()).collect();
        let found: Vec<String> = w.detectors().iter().map(|s| s.to_string()).collect();
        if expected != found {
            return Err(CwError::DetectorMismatch {
                context: "noise weights",
                expected,
                found,
            });
        }
    }

    let coeffs = states
        .series()
        .iter()
        .enumerate()
        .map(|(i, series)| {
            let (a, b): (Vec<f64>, Vec<f64>) = series
                .states
                .iter()
                .map(|s| sky.beam_coefficients(&s.detector_tensor))
                .unzip();

            let w = match weights {
                Some(w) => {
                    let w = &w.series()[i].weights;
                    if w.len() != a.len() {
                        return Err(CwError::SampleCountMismatch {
                            detector: series.detector.name.to_string(),
                            context: "noise weights",
                            expected: a.len(),
                            found: w.len(),
                        });
                    }
                    w.clone()
                }
                None => vec![1.0; a.len()],
            };

            let (mut a_sum, mut b_sum, mut c_sum) = (0.0, 0.0, 0.0);
            for (ai, bi, wi) in izip!(&a, &b, &w) {
                a_sum += wi * ai * ai;
                b_sum += wi * bi * bi;
                c_sum += wi * ai * bi;
            }
            Ok(AmCoeffs {
                detector: series.detector,
                a,
                b,
                a_sum,
                b_sum,
                c_sum,
            })
        })
        .collect::<Result<Vec<_>, CwError>>()?;

    let a = coeffs.iter().map(|c| c.a_sum).sum();
    let b = coeffs.iter().map(|c| c.b_sum).sum();
    let c = coeffs.iter().map(|c| c.c_sum).sum();
    let matrix = AntennaPatternMatrix::new(a, b, c, 0.0, noise.sinv_tsft(states.tsft()))?;
    debug!(
        "Antenna pattern at (α={:.4}, δ={:.4}): A={a:.6e} B={b:.6e} C={c:.6e} D={:.6e}",
        sky.alpha,
        sky.delta,
        matrix.d()
    );

    Ok(MultiAmCoeffs { coeffs, matrix })
}
