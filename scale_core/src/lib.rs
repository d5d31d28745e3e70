#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Weight acquisition and calibration (hardware-agnostic).
//!
//! Every converter interaction goes through `scale_traits::AdcDriver`, every
//! human or remote "proceed" signal through `scale_traits::Confirmation`.
//!
//! ## Architecture
//!
//! - **Median filter**: rolling window over raw samples (`median`)
//! - **Raw reader**: channel select, settle reads, retries (`reader`)
//! - **Calibration engine**: tare and two-point protocol state machine (`calibration`)
//! - **AFE settle**: async front-end calibration and settle gating (`afe`)
//! - **Weight channel**: conversion, hysteresis, persisted state writes (`channel`)
//! - **Bank**: owns channels and the configuration arena (`bank`, `arena`)
//!
//! Weights are whole grams (`i32`); raw samples are signed converter counts.

pub mod afe;
pub mod arena;
pub mod bank;
pub mod builder;
pub mod calibration;
pub mod channel;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod hysteresis;
pub mod median;
pub mod mocks;
pub mod reader;
pub mod status;
pub mod units;

pub use afe::AfeSettle;
pub use arena::{ChannelArena, ChannelId};
pub use bank::ScaleBank;
pub use builder::{ChannelBuilder, Missing};
pub use calibration::{CalibrationEngine, CalibrationOutcome, CalibrationState};
pub use channel::{
    BeginStatus, CalibrationMode, Datapoint, Verification, WeightChannel, WeightReading,
};
pub use config::{AfeCfg, CalibrationCfg, ChannelConfig, FilterCfg, HysteresisCfg, SamplingCfg};
pub use error::{BuildError, Report, Result, ScaleError};
pub use hysteresis::ChangeState;
pub use median::MedianFilter;
pub use reader::RawReader;
pub use status::ChannelView;
