//! # Amplitude parameter bases
//!
//! A CW signal amplitude is described either by the physical pair `(h0, cosi)` or by the
//! canonical polarization amplitudes `(aPlus, aCross)`, always together with the polarization
//! angle `psi` and the initial phase `phi0`:
//!
//! ```text
//! aPlus = ½ h0 (1 + cosi²)        aCross = h0 cosi
//! ```
//!
//! The canonical basis maps onto the four JKS amplitudes `A^μ` that enter the `SNR²`
//! quadratic form.

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::constants::Radian;
use crate::cw_errors::CwError;

/// Canonical amplitude parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeParams {
    pub aplus: f64,
    pub across: f64,
    pub psi: Radian,
    pub phi0: Radian,
}

impl AmplitudeParams {
    pub fn from_h0_cosi(h0: f64, cosi: f64, psi: Radian, phi0: Radian) -> Self {
        AmplitudeParams {
            aplus: 0.5 * h0 * (1.0 + cosi * cosi),
            across: h0 * cosi,
            psi,
            phi0,
        }
    }

    /// JKS amplitude vector `(A1, A2, A3, A4)`.
    pub fn jks_vector(&self) -> Vector4<f64> {
        let (s2psi, c2psi) = (2.0 * self.psi).sin_cos();
        let (sphi, cphi) = self.phi0.sin_cos();
        let (ap, ax) = (self.aplus, self.across);
        Vector4::new(
            ap * c2psi * cphi - ax * s2psi * sphi,
            ap * s2psi * cphi + ax * c2psi * sphi,
            -ap * c2psi * sphi - ax * s2psi * cphi,
            -ap * s2psi * sphi + ax * c2psi * cphi,
        )
    }
}

/// Amplitude given in exactly one of the two bases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AmplitudeInput {
    Physical {
        h0: f64,
        cosi: f64,
        psi: Radian,
        phi0: Radian,
    },
    Canonical(AmplitudeParams),
}

impl AmplitudeInput {
    /// Select the basis from optional fields, as received from a caller's keyword arguments.
    ///
    /// Exactly one of the pairs `(h0, cosi)` and `(aPlus, aCross)` must be complete and the other
    /// must be absent.
    ///
    /// Errors
    /// ----------
    /// * [`CwError::AmplitudeBasisConflict`] naming the offending fields: all four when nothing
    ///   is given, the given fields when both pairs are touched, the missing field of a
    ///   partial pair otherwise.
    pub fn from_options(
        h0: Option<f64>,
        cosi: Option<f64>,
        aplus: Option<f64>,
        across: Option<f64>,
        psi: Radian,
        phi0: Radian,
    ) -> Result<Self, CwError> {
        match (h0, cosi, aplus, across) {
            (Some(h0), Some(cosi), None, None) => Ok(AmplitudeInput::Physical {
                h0,
                cosi,
                psi,
                phi0,
            }),
            (None, None, Some(aplus), Some(across)) => {
                Ok(AmplitudeInput::Canonical(AmplitudeParams {
                    aplus,
                    across,
                    psi,
                    phi0,
                }))
            }
            _ => {
                let fields = [
                    ("h0", h0.is_some()),
                    ("cosi", cosi.is_some()),
                    ("aPlus", aplus.is_some()),
                    ("aCross", across.is_some()),
                ];
                let physical = h0.is_some() || cosi.is_some();
                let canonical = aplus.is_some() || across.is_some();
                let offending = match (physical, canonical) {
                    (false, false) => fields.iter().map(|(n, _)| *n).collect(),
                    (true, true) => fields.iter().filter(|(_, p)| *p).map(|(n, _)| *n).collect(),
                    _ => fields
                        .iter()
                        .enumerate()
                        .filter(|(i, (_, p))| !p && ((*i < 2) == physical))
                        .map(|(_, (n, _))| *n)
                        .collect(),
                };
                Err(CwError::AmplitudeBasisConflict(offending))
            }
        }
    }

    /// Convert to the canonical basis.
    pub fn to_canonical(&self) -> AmplitudeParams {
        match *self {
            AmplitudeInput::Physical {
                h0,
                cosi,
                psi,
                phi0,
            } => AmplitudeParams::from_h0_cosi(h0, cosi, psi, phi0),
            AmplitudeInput::Canonical(params) => params,
        }
    }
}

impl From<AmplitudeParams> for AmplitudeInput {
    fn from(params: AmplitudeParams) -> Self {
        AmplitudeInput::Canonical(params)
    }
}

#[cfg(test)]
mod amplitude_test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_basis_conversion() {
        let p = AmplitudeInput::from_options(Some(1e-24), Some(1.0), None, None, 0.1, 0.2)
            .unwrap()
            .to_canonical();
        assert_eq!(p.aplus, 1e-24);
        assert_eq!(p.across, 1e-24);

        let p = AmplitudeParams::from_h0_cosi(2.0, 0.0, 0.0, 0.0);
        assert_eq!((p.aplus, p.across), (1.0, 0.0));

        let canonical = AmplitudeInput::from_options(None, None, Some(3.0), Some(-1.0), 0.5, 1.5)
            .unwrap();
        assert_eq!(
            canonical.to_canonical(),
            AmplitudeParams {
                aplus: 3.0,
                across: -1.0,
                psi: 0.5,
                phi0: 1.5
            }
        );
    }

    #[test]
    fn test_basis_conflicts() {
        let err = |h0, cosi, ap, ax| {
            match AmplitudeInput::from_options(h0, cosi, ap, ax, 0.0, 0.0).unwrap_err() {
                CwError::AmplitudeBasisConflict(fields) => fields,
                other => panic!("unexpected error {other:?}"),
            }
        };
        assert_eq!(err(None, None, None, None), vec!["h0", "cosi", "aPlus", "aCross"]);
        assert_eq!(err(Some(1.0), None, None, None), vec!["cosi"]);
        assert_eq!(err(None, None, None, Some(1.0)), vec!["aPlus"]);
        assert_eq!(
            err(Some(1.0), Some(0.5), Some(1.0), None),
            vec!["h0", "cosi", "aPlus"]
        );
    }

    #[test]
    fn test_jks_vector() {
        // psi = phi0 = 0: A = (aPlus, 0, 0, aCross)
        let p = AmplitudeParams {
            aplus: 2.0,
            across: 1.0,
            psi: 0.0,
            phi0: 0.0,
        };
        assert_eq!(p.jks_vector(), Vector4::new(2.0, 0.0, 0.0, 1.0));

        // the norm is invariant under psi and phi0 for circular polarization
        let c = AmplitudeParams::from_h0_cosi(1.0, 1.0, 0.7, -2.1);
        assert_relative_eq!(c.jks_vector().norm_squared(), 2.0, epsilon = 1e-12);
    }
}
