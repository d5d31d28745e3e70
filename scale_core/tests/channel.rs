use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use scale_core::mocks::{AlwaysConfirm, ScriptedAdc, ScriptedConfirm};
use scale_core::{
    AfeCfg, BeginStatus, CalibrationCfg, CalibrationMode, ChannelConfig, Datapoint, FilterCfg,
    ScaleError, WeightChannel,
};
use scale_traits::{AfeStatus, Clock};
use scale_traits::clock::test_clock::TestClock;

fn calibrated(slope: f32, offset: i32) -> ChannelConfig {
    ChannelConfig {
        slope,
        offset,
        ..ChannelConfig::default()
    }
}

fn small_windows() -> FilterCfg {
    FilterCfg {
        median_window: 3,
        calibration_window: 2,
    }
}

fn no_delay() -> CalibrationCfg {
    CalibrationCfg {
        sample_delay_ms: 0,
        ..CalibrationCfg::default()
    }
}

fn channel(adc: ScriptedAdc) -> WeightChannel<ScriptedAdc> {
    WeightChannel::builder()
        .with_driver(adc)
        .with_filter(small_windows())
        .with_calibration(no_delay())
        .with_clock(Arc::new(TestClock::new()))
        .build()
        .unwrap()
}

fn started(adc: ScriptedAdc, cfg: &mut ChannelConfig) -> WeightChannel<ScriptedAdc> {
    let mut ch = channel(adc);
    ch.begin(Some(cfg), &mut AlwaysConfirm(false)).unwrap();
    ch
}

fn weight(dp: Datapoint) -> i32 {
    match dp {
        Datapoint::Weight(r) => r.weight_g,
        Datapoint::Disabled => panic!("channel unexpectedly disabled"),
    }
}

#[test]
fn converts_median_to_grams() {
    let mut cfg = calibrated(2.0, 100);
    let mut ch = started(ScriptedAdc::new(1).with_reads([150, 9999, 150]), &mut cfg);
    assert_eq!(weight(ch.datapoint(&mut cfg).unwrap()), 25);
    assert_eq!(ch.weight(), 25);
    assert_eq!(cfg.last_weight, 25);
}

#[test]
fn uncalibrated_channel_reports_error_without_reading() {
    let mut cfg = ChannelConfig::default();
    let mut ch = channel(ScriptedAdc::new(1).with_repeat(150));
    // synchronous auto-calibration is declined, slope stays 0
    assert!(ch.begin(Some(&mut cfg), &mut AlwaysConfirm(false)).is_err());
    let err = ch.datapoint(&mut cfg).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ScaleError>(),
        Some(&ScaleError::Uncalibrated { channel: 0 })
    );
    assert_eq!(ch.driver().reads_taken(), 0);
    assert!(cfg.enabled);
    assert_eq!(cfg.updates, 0);
}

#[test]
fn disabled_or_unstarted_channel_touches_no_hardware() {
    let mut cfg = calibrated(2.0, 0);
    let mut ch = channel(ScriptedAdc::new(1).with_repeat(10));
    assert_eq!(ch.datapoint(&mut cfg).unwrap(), Datapoint::Disabled);

    cfg.enabled = false;
    assert_eq!(
        ch.begin(Some(&mut cfg), &mut AlwaysConfirm(true)).unwrap(),
        BeginStatus::Disabled
    );
    assert_eq!(ch.datapoint(&mut cfg).unwrap(), Datapoint::Disabled);
    assert_eq!(ch.driver().reads_taken(), 0);
    assert!(!ch.enabled());
}

#[test]
fn missing_configuration_is_a_config_error() {
    let mut ch = channel(ScriptedAdc::new(1));
    let err = ch.begin(None, &mut AlwaysConfirm(true)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScaleError>(),
        Some(ScaleError::Config(_))
    ));
    assert!(!ch.is_bound());
}

#[test]
fn bind_failure_force_disables() {
    let mut cfg = calibrated(2.0, 0);
    let mut ch = channel(ScriptedAdc::new(1).with_bind_failure());
    let status = ch.begin(Some(&mut cfg), &mut AlwaysConfirm(true)).unwrap();
    assert_eq!(status, BeginStatus::HardwareDisabled);
    assert!(!status.is_operational());
    assert!(!cfg.enabled);
    assert_eq!(ch.datapoint(&mut cfg).unwrap(), Datapoint::Disabled);
}

#[test]
fn begin_auto_calibrates_with_reference_weight() {
    let mut cfg = ChannelConfig::default();
    // 4 baseline samples at 8000, then 4000 g at 2 counts/g
    let mut ch = channel(ScriptedAdc::new(1).with_reads([8000; 4]).with_repeat(16000));
    let mut confirm = ScriptedConfirm::new([true, true]);
    let status = ch.begin(Some(&mut cfg), &mut confirm).unwrap();
    assert_eq!(status, BeginStatus::Calibrated);
    assert_eq!(cfg.slope, 2.0);
    assert_eq!(cfg.offset, 8000);
    assert!(confirm.prompts()[1].contains("4.0 kg"));
}

#[test]
fn nine_stable_readings_after_a_jump_return_to_idle() {
    let mut cfg = calibrated(1.0, 0);
    let mut ch = started(ScriptedAdc::new(1).with_repeat(300), &mut cfg);
    let reading = ch.datapoint(&mut cfg).unwrap();
    let Datapoint::Weight(r) = reading else {
        panic!("expected weight")
    };
    assert!(r.weight_change);
    assert_eq!(cfg.updates, 1);
    for _ in 0..8 {
        ch.datapoint(&mut cfg).unwrap();
        assert!(ch.recent_weight_change());
    }
    ch.datapoint(&mut cfg).unwrap();
    assert!(!ch.recent_weight_change());
}

#[test]
fn accessors_are_idempotent() {
    let mut cfg = calibrated(2.0, 0);
    let mut ch = started(ScriptedAdc::new(1).with_repeat(500), &mut cfg);
    ch.datapoint(&mut cfg).unwrap();
    let first = (ch.enabled(), ch.weight(), ch.channel_index());
    for _ in 0..5 {
        assert_eq!((ch.enabled(), ch.weight(), ch.channel_index()), first);
    }
    assert_eq!(first, (true, 250, 0));
}

#[test]
fn tare_moves_offset_and_keeps_slope() {
    let mut cfg = calibrated(2.0, 0);
    cfg.last_weight = 123;
    let mut ch = started(ScriptedAdc::new(1).with_repeat(640), &mut cfg);
    ch.tare(&mut cfg, &mut AlwaysConfirm(true)).unwrap();
    assert_eq!(cfg.offset, 640);
    assert_eq!(cfg.slope, 2.0);
    assert_eq!(cfg.last_weight, 0);
    assert_eq!(ch.weight(), 0);
    assert_eq!(weight(ch.datapoint(&mut cfg).unwrap()), 0);
}

#[test]
fn zero_slope_calibration_disables_channel() {
    let mut cfg = calibrated(2.0, 0);
    let mut ch = started(ScriptedAdc::new(1).with_repeat(700), &mut cfg);
    let err = ch
        .calibrate(&mut cfg, 1000, &mut AlwaysConfirm(true))
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<ScaleError>(),
        Some(&ScaleError::InvalidCalibration { channel: 0 })
    );
    assert!(!cfg.enabled);
    assert!(!ch.enabled());
    assert_eq!(ch.datapoint(&mut cfg).unwrap(), Datapoint::Disabled);
}

#[test]
fn read_fault_aborts_the_pass_and_leaves_config() {
    let mut cfg = calibrated(2.0, 0);
    let mut ch = started(ScriptedAdc::new(1).with_repeat(500).with_fault_at(1), &mut cfg);
    let before = cfg;
    let err = ch.datapoint(&mut cfg).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScaleError>(),
        Some(ScaleError::HardwareFault(_))
    ));
    assert_eq!(cfg, before);
}

#[rstest]
#[case(4000, true)]
#[case(3880, true)]
#[case(3870, false)]
#[case(4130, false)]
fn verify_uses_relative_tolerance(#[case] on_scale_g: i32, #[case] passed: bool) {
    let mut cfg = calibrated(1.0, 0);
    let mut ch = started(ScriptedAdc::new(1).with_repeat(on_scale_g), &mut cfg);
    let before = cfg;
    let v = ch
        .verify_calibration(&cfg, 4000, 0.03, &mut AlwaysConfirm(true))
        .unwrap();
    assert_eq!(v.measured_g, on_scale_g);
    assert_eq!(v.passed, passed);
    assert_eq!(cfg, before);
}

#[test]
fn watchdog_is_kicked_per_sample() {
    let kicks = Rc::new(Cell::new(0u32));
    let k = Rc::clone(&kicks);
    let mut cfg = calibrated(1.0, 0);
    let mut ch = WeightChannel::builder()
        .with_driver(ScriptedAdc::new(1).with_repeat(5))
        .with_filter(small_windows())
        .with_calibration(no_delay())
        .with_clock(Arc::new(TestClock::new()))
        .with_watchdog(move || k.set(k.get() + 1))
        .build()
        .unwrap();
    ch.begin(Some(&mut cfg), &mut AlwaysConfirm(true)).unwrap();
    ch.datapoint(&mut cfg).unwrap();
    assert_eq!(kicks.get(), 3);
    ch.tare(&mut cfg, &mut AlwaysConfirm(true)).unwrap();
    assert_eq!(kicks.get(), 3 + 4);
}

fn afe_channel(adc: ScriptedAdc, clock: &TestClock) -> WeightChannel<ScriptedAdc> {
    WeightChannel::builder()
        .with_driver(adc)
        .with_filter(small_windows())
        .with_calibration(no_delay())
        .with_afe(AfeCfg {
            enabled: true,
            settle_ms: 500,
            ready_timeout_ms: 50,
            poll_ms: 5,
        })
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap()
}

#[test]
fn async_begin_starts_afe_calibration() {
    let clock = TestClock::new();
    let mut cfg = ChannelConfig::default();
    let mut ch = afe_channel(ScriptedAdc::new(1).with_afe([AfeStatus::Ok]), &clock);
    assert_eq!(ch.mode(), CalibrationMode::AsyncAfe);
    let status = ch.begin(Some(&mut cfg), &mut AlwaysConfirm(false)).unwrap();
    assert_eq!(status, BeginStatus::CalibrationStarted);
    assert_eq!(ch.driver().afe_starts(), 1);
    assert!(ch.last_calibration_start().is_some());
}

#[test]
fn datapoint_waits_out_the_settle_time() {
    let clock = TestClock::new();
    let mut cfg = calibrated(1.0, 0);
    let mut ch = afe_channel(
        ScriptedAdc::new(1).with_repeat(10).with_afe([AfeStatus::Ok]),
        &clock,
    );
    ch.begin(Some(&mut cfg), &mut AlwaysConfirm(true)).unwrap();
    ch.recalibrate_afe().unwrap();
    let started = ch.last_calibration_start().unwrap();
    clock.advance(Duration::from_millis(120));

    ch.datapoint(&mut cfg).unwrap();
    assert!(clock.now().saturating_duration_since(started) >= Duration::from_millis(500));

    // already settled: no further wait
    let slept = clock.total_slept();
    ch.datapoint(&mut cfg).unwrap();
    assert_eq!(clock.total_slept(), slept);
}

#[test]
fn afe_failure_and_timeout_surface_distinctly() {
    let clock = TestClock::new();
    let mut cfg = calibrated(1.0, 0);
    let mut ch = afe_channel(ScriptedAdc::new(1).with_afe([AfeStatus::Failed]), &clock);
    ch.begin(Some(&mut cfg), &mut AlwaysConfirm(true)).unwrap();
    let err = ch.recalibrate_afe().unwrap_err();
    assert_eq!(err.downcast_ref::<ScaleError>(), Some(&ScaleError::AfeCalibrationFailed));

    let mut ch = afe_channel(ScriptedAdc::new(1).with_afe([AfeStatus::InProgress]), &clock);
    ch.begin(Some(&mut cfg), &mut AlwaysConfirm(true)).unwrap();
    let err = ch.recalibrate_afe().unwrap_err();
    assert_eq!(err.downcast_ref::<ScaleError>(), Some(&ScaleError::AfeTimeout));
}

#[test]
fn recalibrate_afe_needs_async_mode() {
    let mut cfg = calibrated(1.0, 0);
    let mut ch = started(ScriptedAdc::new(1), &mut cfg);
    assert_eq!(ch.mode(), CalibrationMode::Synchronous);
    assert!(ch.recalibrate_afe().is_err());
}
