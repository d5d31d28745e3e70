#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = scale_config::load_toml(data) {
        if cfg.validate().is_ok() {
            assert!(cfg.slots() >= 1);
        }
    }
});
