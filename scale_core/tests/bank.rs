use std::sync::Arc;

use scale_core::mocks::{AlwaysConfirm, ScriptedAdc};
use scale_core::{
    BeginStatus, CalibrationCfg, ChannelArena, ChannelConfig, ChannelId, Datapoint, FilterCfg,
    ScaleBank, ScaleError, WeightChannel,
};
use scale_traits::clock::test_clock::TestClock;

fn channel(index: usize, adc: ScriptedAdc) -> WeightChannel<ScriptedAdc> {
    WeightChannel::builder()
        .with_driver(adc)
        .with_index(index)
        .with_filter(FilterCfg {
            median_window: 3,
            calibration_window: 2,
        })
        .with_calibration(CalibrationCfg {
            sample_delay_ms: 0,
            ..CalibrationCfg::default()
        })
        .with_clock(Arc::new(TestClock::new()))
        .build()
        .unwrap()
}

fn slot(slope: f32, offset: i32) -> ChannelConfig {
    ChannelConfig {
        slope,
        offset,
        ..ChannelConfig::default()
    }
}

fn two_channel_bank(first: ScriptedAdc, second: ScriptedAdc) -> ScaleBank<ScriptedAdc> {
    let mut bank = ScaleBank::new(ChannelArena::new(vec![slot(1.0, 0), slot(2.0, 100)]));
    bank.attach(channel(0, first)).unwrap();
    bank.attach(channel(1, second)).unwrap();
    bank
}

#[test]
fn one_failing_channel_does_not_affect_another() {
    let mut bank = two_channel_bank(
        ScriptedAdc::new(1).with_bind_failure(),
        ScriptedAdc::new(1).with_repeat(150),
    );
    let results = bank.begin_all(&mut AlwaysConfirm(true));
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].1.as_ref().ok(),
        Some(&BeginStatus::HardwareDisabled)
    );
    assert_eq!(results[1].1.as_ref().ok(), Some(&BeginStatus::Ready));

    let readings = bank.datapoint_all();
    assert_eq!(readings[0].1.as_ref().ok(), Some(&Datapoint::Disabled));
    assert!(matches!(readings[1].1, Ok(Datapoint::Weight(r)) if r.weight_g == 25));

    let first = bank.channel(ChannelId::new(0)).unwrap();
    assert!(!first.enabled());
    let second = bank.channel(ChannelId::new(1)).unwrap();
    assert_eq!(second.weight(), 25);
    assert_eq!(second.offset(), 100);
    assert_eq!(second.slope(), 2.0);
}

#[test]
fn each_channel_writes_only_its_own_slot() {
    let mut bank = two_channel_bank(
        ScriptedAdc::new(1).with_repeat(300),
        ScriptedAdc::new(1).with_repeat(100),
    );
    bank.begin_all(&mut AlwaysConfirm(true));
    let untouched = *bank.arena().get(ChannelId::new(1)).unwrap();
    bank.datapoint(ChannelId::new(0)).unwrap();
    assert_eq!(bank.arena().get(ChannelId::new(0)).unwrap().last_weight, 300);
    assert_eq!(*bank.arena().get(ChannelId::new(1)).unwrap(), untouched);
    assert!(bank.any_recent_weight_change());
    assert!(bank.channel(ChannelId::new(0)).unwrap().recent_weight_change());
    assert!(!bank.channel(ChannelId::new(1)).unwrap().recent_weight_change());
}

#[test]
fn missing_slot_is_a_config_error_for_that_channel_only() {
    let mut bank = ScaleBank::new(ChannelArena::new(vec![slot(1.0, 0)]));
    bank.attach(channel(0, ScriptedAdc::new(1).with_repeat(5))).unwrap();
    bank.attach(channel(3, ScriptedAdc::new(1).with_repeat(5))).unwrap();
    let results = bank.begin_all(&mut AlwaysConfirm(true));
    assert!(results[0].1.is_ok());
    let err = results[1].1.as_ref().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ScaleError>(),
        Some(ScaleError::Config(_))
    ));
    assert!(bank.channel(ChannelId::new(3)).is_none());
    assert_eq!(bank.views().count(), 1);
}

#[test]
fn duplicate_attach_is_rejected() {
    let mut bank = ScaleBank::new(ChannelArena::with_slots(1));
    bank.attach(channel(0, ScriptedAdc::new(1))).unwrap();
    assert!(bank.attach(channel(0, ScriptedAdc::new(1))).is_err());
    assert_eq!(bank.len(), 1);
}

#[test]
fn tare_and_reload_go_through_the_arena() {
    let mut bank = two_channel_bank(
        ScriptedAdc::new(1).with_repeat(40),
        ScriptedAdc::new(1).with_repeat(100),
    );
    bank.begin_all(&mut AlwaysConfirm(true));
    bank.tare(ChannelId::new(0), &mut AlwaysConfirm(true)).unwrap();
    assert_eq!(bank.arena().get(ChannelId::new(0)).unwrap().offset, 40);

    let old = bank.reload(vec![slot(1.0, 40), slot(2.0, 0)]);
    assert_eq!(old[0].offset, 40);
    let Ok(Datapoint::Weight(r)) = bank.datapoint(ChannelId::new(1)) else {
        panic!("expected a weight");
    };
    assert_eq!(r.weight_g, 50);

    let arena = bank.into_arena();
    assert_eq!(arena.len(), 2);
}

#[test]
fn unknown_channel_id_is_an_error() {
    let mut bank = two_channel_bank(ScriptedAdc::new(1), ScriptedAdc::new(1));
    assert!(bank.datapoint(ChannelId::new(7)).is_err());
    assert!(bank.recalibrate_afe(ChannelId::new(7)).is_err());
}
