mod cli;
mod commands;
mod confirm;
mod error_fmt;
mod hw;
mod logging;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use scale_core::ScaleError;

use crate::cli::{Cli, JSON_MODE};
use crate::commands::Options;

fn main() {
    // Best-effort: if color-eyre is already installed, keep going
    let _ = color_eyre::install();

    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        tracing::error!(error = %e, kind = error_fmt::error_kind(&e), "command failed");
        std::process::exit(error_fmt::exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let text = std::fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("read config {}", cli.config.display()))?;
    let mut cfg = scale_config::load_toml(&text).map_err(|e| {
        ScaleError::Config(format!("parse config {}: {e}", cli.config.display()))
    })?;
    cfg.validate()
        .map_err(|e| ScaleError::Config(format!("{e:#}")))?;
    if let Some(state) = cli.state {
        cfg.state.path = state;
    }

    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    logging::init(level, cli.json, &cfg.logging)?;
    tracing::info!(config = %cli.config.display(), slots = cfg.slots(), "starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    let opts = Options {
        json: cli.json,
        yes: cli.yes,
        shutdown,
    };
    commands::run(&cli.cmd, &cfg, &opts)
}
