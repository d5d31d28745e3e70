use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Poll `is_ready` until it reports true or `timeout` expires.
/// Sleeps `poll_interval` between polls to avoid CPU spinning; errors from the
/// predicate (e.g. a failed register read) are returned immediately.
pub fn wait_until_ready_with_timeout(
    mut is_ready: impl FnMut() -> Result<bool>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !is_ready()? {
        if Instant::now() >= deadline {
            return Err(HwError::DataReadyTimeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}

/// Sign-extend a big-endian 24-bit two's-complement conversion result.
#[inline]
pub fn sign_extend_24(bytes: [u8; 3]) -> i32 {
    let mut value = (i32::from(bytes[0]) << 16) | (i32::from(bytes[1]) << 8) | i32::from(bytes[2]);
    if (value & 0x80_0000) != 0 {
        value |= !0xFF_FFFF;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::sign_extend_24;

    #[test]
    fn sign_extends_negative_values() {
        assert_eq!(sign_extend_24([0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(sign_extend_24([0x80, 0x00, 0x00]), -8_388_608);
    }

    #[test]
    fn keeps_positive_values() {
        assert_eq!(sign_extend_24([0x00, 0x00, 0x01]), 1);
        assert_eq!(sign_extend_24([0x7F, 0xFF, 0xFF]), 8_388_607);
    }
}
