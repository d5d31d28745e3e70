//! Command execution: assemble the bank, run one command, persist state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::WrapErr;
use scale_config::{ChannelState, Config, StateStore};
use scale_core::{
    BeginStatus, CalibrationOutcome, ChannelArena, ChannelConfig, ChannelId, Datapoint, RawReader,
    Report, SamplingCfg, ScaleBank, ScaleError, WeightChannel,
};
use scale_traits::Confirmation;
use serde_json::json;
use tracing::{info, warn};

use crate::cli::Commands;
use crate::confirm::{AutoConfirm, SimOperator, StdinConfirmation};
use crate::hw::{self, Driver, Hardware};

/// Measured weight outside the accepted tolerance.
#[derive(Debug, thiserror::Error)]
#[error(
    "scale-{channel} read {measured_g} g for a {reference_grams} g reference ({error_pct:.2}% off)"
)]
pub struct VerificationFailed {
    pub channel: usize,
    pub reference_grams: u32,
    pub measured_g: i32,
    pub error_pct: f32,
}

pub struct Options {
    pub json: bool,
    pub yes: bool,
    pub shutdown: Arc<AtomicBool>,
}

pub fn run(cmd: &Commands, cfg: &Config, opts: &Options) -> eyre::Result<()> {
    let hw = hw::open(cfg)?;
    if let Commands::SelfCheck = cmd {
        return self_check(cfg, hw, opts);
    }

    let store = StateStore::new(&cfg.state.path);
    let slots = store.load(cfg.slots())?;
    let arena = ChannelArena::new(slots.iter().map(ChannelConfig::from).collect());
    let mut confirm = confirmation(cfg, &hw, opts, reference_grams(cmd, cfg));
    let mut bank = assemble(cfg, hw.drivers, arena)?;

    let outcome = execute(cmd, cfg, &mut bank, confirm.as_mut(), opts);

    let states: Vec<ChannelState> = bank
        .arena()
        .as_slice()
        .iter()
        .map(ChannelState::from)
        .collect();
    match store.save(&states) {
        Ok(()) => outcome,
        Err(e) if outcome.is_ok() => Err(e),
        Err(e) => {
            warn!(error = %e, "failed to persist channel state");
            outcome
        }
    }
}

fn assemble(
    cfg: &Config,
    drivers: Vec<Driver>,
    arena: ChannelArena,
) -> eyre::Result<ScaleBank<Driver>> {
    let per_adc = usize::from(cfg.device.channels_per_adc).max(1);
    let mut bank = ScaleBank::new(arena);
    for (slot, driver) in drivers.into_iter().enumerate() {
        let channel = WeightChannel::builder()
            .with_driver(driver)
            .with_config(cfg)
            .with_index(slot)
            .with_adc_channel((slot % per_adc) as u8)
            .build()?;
        bank.attach(channel)?;
    }
    Ok(bank)
}

/// Weight the operator is asked to place for this command.
fn reference_grams(cmd: &Commands, cfg: &Config) -> u32 {
    match cmd {
        Commands::Calibrate { grams, .. } | Commands::Verify { grams, .. } => {
            grams.unwrap_or(cfg.calibration.reference_grams)
        }
        _ => cfg.calibration.reference_grams,
    }
}

fn confirmation(
    cfg: &Config,
    hw: &Hardware,
    opts: &Options,
    reference_grams: u32,
) -> Box<dyn Confirmation> {
    if !opts.yes {
        return Box::new(StdinConfirmation);
    }
    if hw.is_simulated() {
        return Box::new(SimOperator::new(
            hw.sims.clone(),
            usize::from(cfg.device.channels_per_adc),
            reference_grams as f32,
        ));
    }
    Box::new(AutoConfirm)
}

fn channel_id(bank: &ScaleBank<Driver>, channel: usize) -> eyre::Result<ChannelId> {
    let id = ChannelId::new(channel);
    if bank.channel(id).is_none() {
        eyre::bail!("scale-{channel} does not exist (configured channels: {})", bank.len());
    }
    Ok(id)
}

/// Begin every channel, reporting (not failing on) per-channel problems.
fn begin_all(bank: &mut ScaleBank<Driver>, confirm: &mut dyn Confirmation) {
    for (id, res) in bank.begin_all(confirm) {
        log_begin(id, &res);
    }
}

/// Begin every channel; the result for `channel` is returned to the caller.
fn begin_target(
    bank: &mut ScaleBank<Driver>,
    confirm: &mut dyn Confirmation,
    channel: usize,
) -> eyre::Result<(ChannelId, BeginStatus)> {
    let id = channel_id(bank, channel)?;
    let mut target = None;
    for (other, res) in bank.begin_all(confirm) {
        log_begin(other, &res);
        if other == id {
            target = Some(res);
        }
    }
    match target {
        Some(res) => Ok((id, res?)),
        None => eyre::bail!("scale-{channel} is not attached"),
    }
}

fn log_begin(id: ChannelId, res: &eyre::Result<BeginStatus>) {
    match res {
        Ok(BeginStatus::HardwareDisabled) => {
            warn!(channel = id.index(), "converter unavailable; channel disabled");
        }
        Ok(status) => info!(channel = id.index(), ?status, "channel started"),
        Err(e) => warn!(channel = id.index(), error = %e, "channel failed to start"),
    }
}

fn execute(
    cmd: &Commands,
    cfg: &Config,
    bank: &mut ScaleBank<Driver>,
    confirm: &mut dyn Confirmation,
    opts: &Options,
) -> eyre::Result<()> {
    match cmd {
        Commands::Read => {
            begin_all(bank, confirm);
            read_all(bank, opts.json)
        }
        Commands::Tare { channel } => {
            let (id, _) = begin_target(bank, confirm, *channel)?;
            let outcome = bank.tare(id, confirm)?;
            emit(
                opts.json,
                json!({ "channel": channel, "tared": true, "offset": outcome.before }),
                format!("scale-{channel} tared: offset={}", outcome.before),
            );
            Ok(())
        }
        Commands::Calibrate { channel, grams } => {
            let grams = grams.unwrap_or(cfg.calibration.reference_grams);
            if grams == 0 {
                eyre::bail!("calibration weight must be > 0 grams (use `tare` to zero)");
            }
            let (id, status) = begin_target(bank, confirm, *channel)?;
            // begin() already ran the interactive calibration with the configured weight
            let outcome = if status == BeginStatus::Calibrated
                && grams == cfg.calibration.reference_grams
            {
                let view = bank
                    .channel(id)
                    .ok_or_else(|| eyre::eyre!("scale-{channel} is not attached"))?;
                CalibrationOutcome {
                    before: view.offset(),
                    after: None,
                    slope: view.slope(),
                }
            } else {
                bank.calibrate(id, grams, confirm)?
            };
            emit(
                opts.json,
                json!({
                    "channel": channel,
                    "reference_grams": grams,
                    "slope": outcome.slope,
                    "offset": outcome.before,
                }),
                format!(
                    "scale-{channel} calibrated: slope={:.4} offset={}",
                    outcome.slope, outcome.before
                ),
            );
            Ok(())
        }
        Commands::Verify {
            channel,
            grams,
            tolerance,
        } => {
            let grams = grams.unwrap_or(cfg.calibration.reference_grams);
            let tolerance = tolerance.unwrap_or(cfg.calibration.verify_tolerance);
            if !(tolerance > 0.0 && tolerance <= 1.0) {
                return Err(Report::new(ScaleError::Config(format!(
                    "--tolerance must be in (0, 1], got {tolerance}"
                ))));
            }
            let (id, _) = begin_target(bank, confirm, *channel)?;
            let v = bank.verify(id, grams, tolerance, confirm)?;
            let error_pct = v.error_ratio * 100.0;
            emit(
                opts.json,
                json!({
                    "channel": channel,
                    "reference_grams": grams,
                    "measured_g": v.measured_g,
                    "error_pct": error_pct,
                    "passed": v.passed,
                }),
                format!(
                    "scale-{channel} verify: measured {} g for {grams} g ({error_pct:.2}% off) {}",
                    v.measured_g,
                    if v.passed { "PASS" } else { "FAIL" }
                ),
            );
            if !v.passed {
                return Err(eyre::Report::new(VerificationFailed {
                    channel: *channel,
                    reference_grams: grams,
                    measured_g: v.measured_g,
                    error_pct,
                }));
            }
            Ok(())
        }
        Commands::Watch { iterations } => {
            begin_all(bank, confirm);
            watch(cfg, bank, *iterations, opts)
        }
        Commands::Afe { channel } => {
            let (id, _) = begin_target(bank, confirm, *channel)?;
            bank.recalibrate_afe(id)?;
            emit(
                opts.json,
                json!({ "channel": channel, "afe_calibrated": true }),
                format!("scale-{channel} AFE calibration complete"),
            );
            Ok(())
        }
        Commands::SelfCheck => Ok(()),
    }
}

fn read_all(bank: &mut ScaleBank<Driver>, json: bool) -> eyre::Result<()> {
    let mut first_err = None;
    for (id, res) in bank.datapoint_all() {
        match res {
            Ok(Datapoint::Weight(r)) => emit(
                json,
                json!({
                    "channel": id.index(),
                    "weight_g": r.weight_g,
                    "weight_change": r.weight_change,
                }),
                format!(
                    "{id}: {:.3} kg{}",
                    f64::from(r.weight_g) / 1000.0,
                    if r.weight_change { " (changing)" } else { "" }
                ),
            ),
            Ok(Datapoint::Disabled) => emit(
                json,
                json!({ "channel": id.index(), "disabled": true }),
                format!("{id}: disabled"),
            ),
            Err(e) => {
                warn!(channel = id.index(), error = %e, "datapoint failed");
                emit(
                    json,
                    json!({ "channel": id.index(), "error": e.to_string() }),
                    format!("{id}: error: {e}"),
                );
                first_err.get_or_insert(e);
            }
        }
    }
    first_err.map_or(Ok(()), Err)
}

fn watch(
    cfg: &Config,
    bank: &mut ScaleBank<Driver>,
    iterations: Option<u64>,
    opts: &Options,
) -> eyre::Result<()> {
    let short = Duration::from_secs(cfg.schedule.short_interval_s);
    let long = Duration::from_secs(cfg.schedule.long_interval_s);
    let mut polls = 0u64;
    loop {
        if let Err(e) = read_all(bank, opts.json) {
            // keep polling; a single bad pass should not end the watch
            warn!(error = %e, "poll had errors");
        }
        polls += 1;
        if iterations.is_some_and(|n| polls >= n) || opts.shutdown.load(Ordering::Relaxed) {
            break;
        }
        let interval = if bank.any_recent_weight_change() { short } else { long };
        info!(interval_s = interval.as_secs(), "next poll");
        if !sleep_unless_shutdown(interval, &opts.shutdown) {
            break;
        }
    }
    info!(polls, "watch stopped");
    Ok(())
}

/// Sleep in short slices; returns false if shutdown was requested.
fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    while Instant::now() < deadline {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        std::thread::sleep(left.min(Duration::from_millis(100)));
    }
    !shutdown.load(Ordering::Relaxed)
}

fn self_check(cfg: &Config, hw: Hardware, opts: &Options) -> eyre::Result<()> {
    let per_adc = usize::from(cfg.device.channels_per_adc).max(1);
    let sampling = SamplingCfg::from(cfg);
    let simulated = hw.is_simulated();
    for (slot, driver) in hw.drivers.into_iter().enumerate() {
        let mut reader = RawReader::new(driver, (slot % per_adc) as u8, &sampling);
        reader
            .bind()
            .and_then(|()| reader.read())
            .map(|raw| {
                emit(
                    opts.json,
                    json!({ "channel": slot, "ok": true, "raw": raw, "simulated": simulated }),
                    format!("scale-{slot}: OK (raw {raw})"),
                );
            })
            .wrap_err_with(|| format!("self-check failed on scale-{slot}"))?;
    }
    Ok(())
}

fn emit(json: bool, value: serde_json::Value, text: String) {
    if json {
        println!("{value}");
    } else {
        println!("{text}");
    }
}
