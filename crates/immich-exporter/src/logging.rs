use immich_common::{
    config::EXPORTER_LOG_LEVEL,
    error::{ExporterError, Result},
};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

const BOOTSTRAP_LEVEL: &str = "info";

/// Handle to the installed subscriber's filter so the level can follow config.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

/// Installs JSON logging at INFO until configuration is known.
pub fn init() -> LogHandle {
    let (filter, handle) = reload::Layer::new(EnvFilter::new(BOOTSTRAP_LEVEL));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(false))
        .init();

    LogHandle { filter: handle }
}

impl LogHandle {
    pub fn set_level(&self, level: &str) -> Result<()> {
        let filter = filter_for(level)?;
        self.filter.reload(filter).map_err(|err| {
            ExporterError::InternalError(format!("failed to apply log level: {err}"))
        })
    }
}

fn filter_for(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(normalize_level(level)).map_err(|err| ExporterError::InvalidConfig {
        key: EXPORTER_LOG_LEVEL,
        reason: format!("{level:?} is not a log level: {err}"),
    })
}

/// Accepts the level names operators already use (`WARNING`, `CRITICAL`, ...).
pub fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "notset" => "trace".to_string(),
        other => other.to_string(),
    }
}
