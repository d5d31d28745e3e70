use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("adc read timeout")]
    Timeout,
    #[error("adc data-ready timeout")]
    DataReadyTimeout,
    #[error("unsupported channel {index} (device has {channels})")]
    UnsupportedChannel { index: u8, channels: u8 },
    #[error("adc not bound; call bind() first")]
    NotBound,
    #[error("adc did not report power-up ready")]
    PowerUpFailed,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl From<rppal::i2c::Error> for HwError {
    fn from(e: rppal::i2c::Error) -> Self {
        HwError::I2c(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
