#![no_main]
use libfuzzer_sys::fuzz_target;
use scale_core::units::raw_to_grams;

fuzz_target!(|input: (i32, i32, f32)| {
    let (raw, offset, slope) = input;
    match raw_to_grams(raw, offset, slope) {
        Some(_) => assert!(slope != 0.0 && slope.is_finite()),
        None => assert!(slope == 0.0 || !slope.is_finite()),
    }
});
