//! Tracing subscriber setup for the binary.
//!
//! Console output goes to stderr (pretty or JSON) so stdout stays reserved for
//! results. An optional JSON-lines file layer is added from `[logging]`.

use std::path::Path;

use eyre::WrapErr;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, Registry};

use crate::cli::FILE_GUARD;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init(level: &str, json: bool, file_cfg: &scale_config::Logging) -> eyre::Result<()> {
    let default_level: LevelFilter = level
        .parse()
        .wrap_err_with(|| format!("invalid log level '{level}'"))?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    let console: BoxedLayer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let mut layers = vec![console];
    if let Some(path) = file_cfg.file.as_deref() {
        layers.push(file_layer(Path::new(path), file_cfg.rotation.as_deref())?);
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(env_filter))
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

fn file_layer(path: &Path, rotation: Option<&str>) -> eyre::Result<BoxedLayer> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file must name a file: {}", path.display()))?;
    let appender = match rotation.unwrap_or("never") {
        "never" => tracing_appender::rolling::never(dir, name),
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        other => eyre::bail!("logging.rotation must be never|daily|hourly, got '{other}'"),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    Ok(tracing_subscriber::fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .boxed())
}
