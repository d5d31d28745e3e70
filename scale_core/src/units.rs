//! Integer helpers for raw counts and grams.

/// Average of two i32 values, rounded to nearest with ties away from zero.
/// Uses 64-bit intermediates; cannot overflow.
#[inline]
pub fn avg2_round_nearest_i32(a: i32, b: i32) -> i32 {
    let s = (a as i64) + (b as i64);
    if s >= 0 {
        ((s + 1) / 2) as i32
    } else {
        ((s - 1) / 2) as i32
    }
}

/// Absolute difference of two i32 values as u32 without overflow.
///
/// For any `i32` inputs, `|a - b| <= u32::MAX`, so the cast is always lossless.
#[inline]
pub fn abs_diff_i32_u32(a: i32, b: i32) -> u32 {
    let diff = (a as i64) - (b as i64);
    diff.unsigned_abs() as u32
}

/// Convert a raw median to whole grams: `round((raw - offset) / slope)`.
///
/// Returns `None` for a zero or non-finite slope; the division is never performed.
/// Ties round away from zero and the result saturates to the `i32` range.
#[inline]
pub fn raw_to_grams(raw: i32, offset: i32, slope: f32) -> Option<i32> {
    if slope == 0.0 || !slope.is_finite() {
        return None;
    }
    let grams = ((raw as f64) - (offset as f64)) / (slope as f64);
    Some(clamp_f64_to_i32(grams.round()))
}

/// Slope in raw units per gram from two calibration medians.
///
/// `reference_grams` must be non-zero.
#[inline]
pub fn slope_from_medians(before: i32, after: i32, reference_grams: u32) -> f32 {
    (((after as f64) - (before as f64)) / (reference_grams as f64)) as f32
}

#[inline]
fn clamp_f64_to_i32(x: f64) -> i32 {
    if x >= i32::MAX as f64 {
        i32::MAX
    } else if x <= i32::MIN as f64 {
        i32::MIN
    } else {
        x as i32
    }
}
