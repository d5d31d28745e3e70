//! End-to-end runs against the simulated converter, with loads placed on the
//! scale between calibration prompts.

use std::sync::Arc;

use scale_core::{
    CalibrationCfg, ChannelArena, ChannelId, FilterCfg, ScaleBank, WeightChannel,
};
use scale_hardware::SimulatedAdc;
use scale_traits::Confirmation;
use scale_traits::clock::test_clock::TestClock;

/// Stages loads on the simulator as each prompt is confirmed.
struct Operator {
    adc: SimulatedAdc,
    channel: u8,
    loads: Vec<f32>,
}

impl Confirmation for Operator {
    fn await_confirmation(&mut self, _prompt: &str) -> bool {
        if self.loads.is_empty() {
            return false;
        }
        let g = self.loads.remove(0);
        self.adc.set_load(self.channel, g);
        true
    }
}

fn bank(adc: &SimulatedAdc, clock: &TestClock) -> ScaleBank<SimulatedAdc> {
    let mut bank = ScaleBank::new(ChannelArena::with_slots(2));
    for i in 0..2u8 {
        let ch = WeightChannel::builder()
            .with_driver(adc.clone())
            .with_index(usize::from(i))
            .with_adc_channel(i)
            .with_filter(FilterCfg {
                median_window: 9,
                calibration_window: 20,
            })
            .with_calibration(CalibrationCfg::default())
            .with_clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        bank.attach(ch).unwrap();
    }
    bank
}

#[test]
fn noisy_channels_calibrate_and_read_back() {
    let adc = SimulatedAdc::new(2).with_noise(40).with_seed(7);
    let clock = TestClock::new();
    let mut bank = bank(&adc, &clock);

    // begin auto-calibrates both uncalibrated channels with 4 kg
    for ch in 0..2u8 {
        let mut op = Operator {
            adc: adc.clone(),
            channel: ch,
            loads: vec![0.0, 4000.0],
        };
        let results = bank.begin_all(&mut op);
        assert!(results[usize::from(ch)].1.is_ok());
    }
    // sample pacing went through the clock
    assert!(clock.total_slept().as_millis() >= 2 * 2 * 39 * 100);

    for ch in 0..2u8 {
        let view = bank.channel(ChannelId::new(usize::from(ch))).unwrap();
        assert!((view.slope() - 2.0).abs() < 0.05, "slope {}", view.slope());
        assert!((view.offset() - 8000).abs() <= 40);
    }

    adc.set_load(0, 1500.0);
    adc.set_load(1, 250.0);
    let readings = bank.datapoint_all();
    for (id, r) in readings {
        let view = bank.channel(id).unwrap();
        assert!(r.is_ok());
        let expected = if id.index() == 0 { 1500 } else { 250 };
        assert!((view.weight() - expected).abs() <= 60, "{id}: {}", view.weight());
    }
}

#[test]
fn verification_passes_with_the_reference_on_the_scale() {
    let adc = SimulatedAdc::new(2).with_noise(20);
    let clock = TestClock::new();
    let mut bank = bank(&adc, &clock);
    let mut op = Operator {
        adc: adc.clone(),
        channel: 0,
        loads: vec![0.0, 4000.0],
    };
    let results = bank.begin_all(&mut op);
    assert!(results[0].1.is_ok());
    // second channel was left uncalibrated (no loads left to confirm)
    assert!(results[1].1.is_err());

    adc.set_load(0, 0.0);
    let mut op = Operator {
        adc: adc.clone(),
        channel: 0,
        loads: vec![4000.0],
    };
    let v = bank
        .verify(ChannelId::new(0), 4000, 0.03, &mut op)
        .unwrap();
    assert!(v.passed, "{v:?}");
}
