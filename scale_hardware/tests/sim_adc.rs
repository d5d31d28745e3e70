use std::time::Duration;

use rstest::rstest;
use scale_hardware::SimulatedAdc;
use scale_hardware::error::HwError;
use scale_traits::{AdcDriver, AfeStatus};

const T: Duration = Duration::from_millis(10);

#[rstest]
#[case(0, true)]
#[case(1, true)]
#[case(2, false)]
#[case(7, false)]
fn select_channel_respects_device_width(#[case] index: u8, #[case] ok: bool) {
    let mut adc = SimulatedAdc::new(2);
    let res = adc.select_channel(index);
    assert_eq!(res.is_ok(), ok);
    if let Err(e) = res {
        let hw = e.downcast_ref::<HwError>().expect("typed hw error");
        assert!(matches!(hw, HwError::UnsupportedChannel { channels: 2, .. }));
    }
}

#[test]
fn clones_share_device_state() {
    let mut handle = SimulatedAdc::new(2).with_zero_counts(0).with_counts_per_gram(1.0);
    let bench = handle.clone();
    handle.bind().unwrap();
    bench.set_load(0, 123.0);
    handle.select_channel(0).unwrap();
    assert_eq!(handle.read_raw(T).unwrap(), 123);
    assert_eq!(bench.reads(), 1);
}

#[test]
fn bind_failure_is_reported() {
    let mut adc = SimulatedAdc::new(2);
    adc.set_fail_bind(true);
    assert!(adc.bind().is_err());
}

#[test]
fn afe_calibration_completes_after_configured_polls() {
    let mut adc = SimulatedAdc::new(2).with_afe(2);
    assert!(adc.supports_afe_calibration());
    adc.start_afe_calibration().unwrap();
    assert_eq!(adc.calibration_status().unwrap(), AfeStatus::InProgress);
    assert_eq!(adc.calibration_status().unwrap(), AfeStatus::InProgress);
    assert_eq!(adc.calibration_status().unwrap(), AfeStatus::Ok);
}

#[test]
fn afe_calibration_can_fail() {
    let mut adc = SimulatedAdc::new(2).with_afe(0);
    adc.set_afe_fails(true);
    adc.start_afe_calibration().unwrap();
    assert_eq!(adc.calibration_status().unwrap(), AfeStatus::Failed);
}

#[test]
fn afe_unsupported_without_opt_in() {
    let mut adc = SimulatedAdc::new(2);
    assert!(!adc.supports_afe_calibration());
    assert!(adc.start_afe_calibration().is_err());
}
