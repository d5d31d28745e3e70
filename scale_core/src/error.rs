use thiserror::Error;

/// Error kinds surfaced by the weighing engine.
///
/// Every variant is reported to the immediate caller; the most severe
/// automatic reaction anywhere in the engine is disabling the affected channel.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("scale-{channel} is not calibrated (slope 0.0)")]
    Uncalibrated { channel: usize },
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for converter")]
    Timeout,
    #[error("unsupported adc channel {index} (device has {channels})")]
    UnsupportedChannel { index: u8, channels: u8 },
    #[error("scale-{channel} calibration produced a zero slope; channel disabled")]
    InvalidCalibration { channel: usize },
    #[error("analog front-end calibration failed")]
    AfeCalibrationFailed,
    #[error("timeout waiting for analog front-end calibration")]
    AfeTimeout,
    #[error("scale-{channel} calibration was not confirmed")]
    CalibrationDeclined { channel: usize },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing adc driver")]
    MissingDriver,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
