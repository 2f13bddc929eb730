//! Detectability of continuous gravitational-wave signals.
//!
//! ```text
//! timestamps ──► detector_states ──► antenna_pattern ──► snr ◄── amplitude
//!                     ▲                    ▲
//!                 ephemeris          noise_weights ◄── sft_data
//!
//! covering_band (independent)
//! ```

pub mod amplitude;
pub mod antenna_pattern;
pub mod constants;
pub mod covering_band;
pub mod cw_errors;
pub mod detector_states;
pub mod detectors;
pub mod ephemeris;
pub mod loudest;
pub mod noise_weights;
pub mod ref_system;
pub mod sft_data;
pub mod snr;
pub mod time;
pub mod timestamps;
