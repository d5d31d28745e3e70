//! Human-readable error descriptions and structured JSON error formatting.

use scale_core::error::{BuildError, ScaleError};

use crate::commands::VerificationFailed;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDriver => {
                "What happened: No converter driver was provided to a channel.\nLikely causes: The ADC failed to initialize or was not wired into the builder.\nHow to fix: Check [device] in the config and the I2C wiring.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(v) = err.downcast_ref::<VerificationFailed>() {
        return format!(
            "What happened: {v}.\nLikely causes: Wrong reference weight, load cell drift, or a stale calibration.\nHow to fix: Re-run `scale calibrate --channel {}` with the reference weight.",
            v.channel
        );
    }

    if let Some(se) = err.downcast_ref::<ScaleError>() {
        return match se {
            ScaleError::Uncalibrated { channel } => format!(
                "What happened: scale-{channel} has no calibration (slope 0.0).\nLikely causes: Fresh state file or a previous calibration was rejected.\nHow to fix: Run `scale calibrate --channel {channel}`."
            ),
            ScaleError::InvalidCalibration { channel } => format!(
                "What happened: Calibration of scale-{channel} measured no change between empty and loaded; the channel was disabled.\nLikely causes: Reference weight not on the scale, or a disconnected load cell.\nHow to fix: Check the load cell wiring, place the reference weight when asked, and calibrate again."
            ),
            ScaleError::CalibrationDeclined { channel } => format!(
                "What happened: Calibration of scale-{channel} was not confirmed; nothing was changed.\nLikely causes: Prompt answered 'n' or stdin closed.\nHow to fix: Answer the prompts, or pass --yes."
            ),
            ScaleError::Config(msg) => format!(
                "What happened: Configuration is invalid or incomplete ({msg}).\nLikely causes: Missing [device] section or out-of-range values.\nHow to fix: Edit the TOML config and try again."
            ),
            ScaleError::Timeout => "What happened: Converter read timed out.\nLikely causes: ADC not powered, I2C wiring, or read timeout too low.\nHow to fix: Verify power and SDA/SCL, and consider increasing device.read_timeout_ms.".to_string(),
            ScaleError::UnsupportedChannel { index, channels } => format!(
                "What happened: Input {index} does not exist on a converter with {channels} inputs.\nLikely causes: device.channels_per_adc does not match the hardware.\nHow to fix: Fix [device] in the config."
            ),
            ScaleError::AfeCalibrationFailed => "What happened: The converter reported an analog front-end calibration failure.\nLikely causes: Unstable supply or a floating input.\nHow to fix: Check the excitation supply and load-cell wiring, then run `scale afe` again.".to_string(),
            ScaleError::AfeTimeout => "What happened: The analog front-end calibration did not finish in time.\nLikely causes: afe.ready_timeout_ms too low or the converter is stuck.\nHow to fix: Raise afe.ready_timeout_ms or power-cycle the converter.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing at a TOML config. Original: {msg}"
        );
    }

    if lower.contains("parse config") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid or incomplete.\nLikely causes: Missing [device] section or out-of-range values.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    if lower.contains("state file") {
        return format!(
            "What happened: The channel-state file could not be used.\nLikely causes: Corrupted or hand-edited file.\nHow to fix: Fix or remove the file (channels restart uncalibrated). Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable kind names for JSON output.
pub fn error_kind(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    if err.downcast_ref::<VerificationFailed>().is_some() {
        return "VerificationFailed";
    }
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::Config(_)) => "Config",
        Some(ScaleError::Uncalibrated { .. }) => "Uncalibrated",
        Some(ScaleError::HardwareFault(_)) => "HardwareFault",
        Some(ScaleError::Timeout) => "Timeout",
        Some(ScaleError::UnsupportedChannel { .. }) => "UnsupportedChannel",
        Some(ScaleError::InvalidCalibration { .. }) => "InvalidCalibration",
        Some(ScaleError::AfeCalibrationFailed) => "AfeCalibrationFailed",
        Some(ScaleError::AfeTimeout) => "AfeTimeout",
        Some(ScaleError::CalibrationDeclined { .. }) => "CalibrationDeclined",
        None => "Error",
    }
}

/// Map error kinds to stable exit codes; anything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match error_kind(err) {
        "Config" => 2,
        "Uncalibrated" => 3,
        "HardwareFault" | "Timeout" | "UnsupportedChannel" => 4,
        "InvalidCalibration" => 5,
        "AfeCalibrationFailed" | "AfeTimeout" => 6,
        "CalibrationDeclined" => 7,
        "VerificationFailed" => 8,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({ "reason": error_kind(err), "message": humanize(err) });
    if let Some(v) = err.downcast_ref::<VerificationFailed>() {
        obj["details"] = json!({
            "channel": v.channel,
            "reference_grams": v.reference_grams,
            "measured_g": v.measured_g,
            "error_pct": v.error_pct,
        });
    }
    obj.to_string()
}
