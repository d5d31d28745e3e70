//! Maps `Box<dyn Error>` from trait boundaries to typed `ScaleError`.
//!
//! The traits in `scale_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `scale_hardware::HwError` downcasting.

use crate::error::ScaleError;

/// Map a trait-boundary error to a typed `ScaleError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ScaleError {
    #[cfg(feature = "hardware-errors")]
    {
        use scale_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::DataReadyTimeout => ScaleError::Timeout,
                HwError::UnsupportedChannel { index, channels } => ScaleError::UnsupportedChannel {
                    index: *index,
                    channels: *channels,
                },
                other => ScaleError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ScaleError::Timeout
    } else {
        ScaleError::HardwareFault(s)
    }
}
