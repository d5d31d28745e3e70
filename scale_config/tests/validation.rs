use rstest::rstest;
use scale_config::load_toml;

const MINIMAL: &str = r#"
[device]
adcs = 1
channels_per_adc = 2
"#;

#[test]
fn minimal_config_uses_firmware_defaults() {
    let cfg = load_toml(MINIMAL).expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.slots(), 2);
    assert_eq!(cfg.filter.median_window, 9);
    assert_eq!(cfg.filter.calibration_window, 20);
    assert_eq!(cfg.hysteresis.allowed_variance_g, 250);
    assert_eq!(cfg.hysteresis.updates_threshold, 8);
    assert_eq!(cfg.calibration.reference_grams, 4000);
    assert_eq!(cfg.device.i2c_address, 0x2A);
    assert!(!cfg.afe.enabled);
}

#[test]
fn missing_device_section_is_a_parse_error() {
    assert!(load_toml("[filter]\nmedian_window = 5\n").is_err());
}

#[rstest]
#[case("[filter]\nmedian_window = 0", "filter.median_window must be >= 1")]
#[case("[filter]\ncalibration_window = 0", "filter.calibration_window must be >= 1")]
#[case("[hysteresis]\nupdates_threshold = 0", "hysteresis.updates_threshold must be >= 1")]
#[case("[calibration]\nreference_grams = 0", "calibration.reference_grams must be > 0")]
#[case("[calibration]\nverify_tolerance = 0.0", "verify_tolerance must be in (0.0, 1.0]")]
#[case("[afe]\npoll_ms = 0", "afe.poll_ms must be >= 1")]
#[case("[schedule]\nshort_interval_s = 600", "must not exceed")]
#[case("[simulation]\ncounts_per_gram = 0.0", "counts_per_gram must be finite and non-zero")]
fn rejects_invalid_sections(#[case] extra: &str, #[case] needle: &str) {
    let toml = format!("{MINIMAL}\n{extra}\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle}"
    );
}

#[rstest]
#[case("adcs = 0", "device.adcs must be >= 1")]
#[case("channels_per_adc = 3", "channels_per_adc must be 1 or 2")]
#[case("read_timeout_ms = 0", "read_timeout_ms must be >= 1")]
#[case("i2c_address = 0x80", "7-bit address")]
fn rejects_invalid_device(#[case] line: &str, #[case] needle: &str) {
    let toml = format!("[device]\n{line}\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(format!("{err}").contains(needle), "got {err}");
}

#[test]
fn two_adcs_double_the_slots() {
    let cfg = load_toml("[device]\nadcs = 2\nchannels_per_adc = 2\n").unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.slots(), 4);
}
