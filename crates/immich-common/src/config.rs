use std::{fmt, path::Path, time::Duration};

use tracing::error;

use crate::error::{ExporterError, Result};

pub const IMMICH_HOST: &str = "IMMICH_HOST";
pub const IMMICH_PORT: &str = "IMMICH_PORT";
pub const IMMICH_API_TOKEN: &str = "IMMICH_API_TOKEN";
pub const EXPORTER_PORT: &str = "EXPORTER_PORT";
pub const EXPORTER_LOG_LEVEL: &str = "EXPORTER_LOG_LEVEL";
pub const METRICS_PREFIX: &str = "METRICS_PREFIX";
pub const EXPORTER_REQUEST_TIMEOUT_SECS: &str = "EXPORTER_REQUEST_TIMEOUT_SECS";
pub const EXPORTER_VERSION_ATTEMPTS: &str = "EXPORTER_VERSION_ATTEMPTS";

/// Environment keys prefixed with this point at a file holding the value.
pub const FILE_PREFIX: &str = "FILE__";

const DEFAULT_EXPORTER_PORT: u16 = 8000;
const DEFAULT_LOG_LEVEL: &str = "INFO";
const DEFAULT_METRICS_PREFIX: &str = "immich";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_VERSION_ATTEMPTS: u32 = 3;

/// Values supplied on the command line. Each one wins over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub immich_host: Option<String>,
    pub immich_port: Option<String>,
    pub immich_api_token: Option<String>,
    pub exporter_port: Option<String>,
    pub log_level: Option<String>,
    pub metrics_prefix: Option<String>,
    pub request_timeout_secs: Option<String>,
    pub version_attempts: Option<String>,
}

#[derive(Clone)]
pub struct Config {
    pub immich_host: String,
    pub immich_port: u16,
    pub api_token: String,
    pub exporter_port: u16,
    pub log_level: String,
    pub metrics_prefix: String,
    pub request_timeout: Duration,
    pub version_attempts: u32,
}

impl Config {
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(overrides: ConfigOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { overrides, lookup };

        let immich_host = source
            .value(IMMICH_HOST, |o| &o.immich_host)
            .ok_or(ExporterError::ConfigMissing {
                key: IMMICH_HOST,
                hint: "no host specified, please set IMMICH_HOST environment variable",
            })?;
        let immich_port = source
            .value(IMMICH_PORT, |o| &o.immich_port)
            .ok_or(ExporterError::ConfigMissing {
                key: IMMICH_PORT,
                hint: "no port specified, please set IMMICH_PORT environment variable",
            })?;
        let api_token = source
            .value(IMMICH_API_TOKEN, |o| &o.immich_api_token)
            .ok_or(ExporterError::ConfigMissing {
                key: IMMICH_API_TOKEN,
                hint: "no token specified, please set IMMICH_API_TOKEN environment variable",
            })?;

        let exporter_port = match source.value(EXPORTER_PORT, |o| &o.exporter_port) {
            Some(raw) => parse_port(EXPORTER_PORT, &raw)?,
            None => DEFAULT_EXPORTER_PORT,
        };
        let request_timeout = match source.value(EXPORTER_REQUEST_TIMEOUT_SECS, |o| {
            &o.request_timeout_secs
        }) {
            Some(raw) => Duration::from_secs(parse_positive(EXPORTER_REQUEST_TIMEOUT_SECS, &raw)?),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        let version_attempts = match source.value(EXPORTER_VERSION_ATTEMPTS, |o| &o.version_attempts)
        {
            Some(raw) => u32::try_from(parse_positive(EXPORTER_VERSION_ATTEMPTS, &raw)?).map_err(
                |err| ExporterError::InvalidConfig {
                    key: EXPORTER_VERSION_ATTEMPTS,
                    reason: err.to_string(),
                },
            )?,
            None => DEFAULT_VERSION_ATTEMPTS,
        };

        Ok(Self {
            immich_port: parse_port(IMMICH_PORT, &immich_port)?,
            immich_host,
            api_token,
            exporter_port,
            log_level: source
                .value(EXPORTER_LOG_LEVEL, |o| &o.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            metrics_prefix: match source.value(METRICS_PREFIX, |o| &o.metrics_prefix) {
                Some(raw) => parse_metric_prefix(METRICS_PREFIX, raw)?,
                None => DEFAULT_METRICS_PREFIX.to_string(),
            },
            request_timeout,
            version_attempts,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.immich_host, self.immich_port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("immich_host", &self.immich_host)
            .field("immich_port", &self.immich_port)
            .field("api_token", &"<redacted>")
            .field("exporter_port", &self.exporter_port)
            .field("log_level", &self.log_level)
            .field("metrics_prefix", &self.metrics_prefix)
            .field("request_timeout", &self.request_timeout)
            .field("version_attempts", &self.version_attempts)
            .finish()
    }
}

struct Source<F> {
    overrides: ConfigOverrides,
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Resolves a key as flag, then `FILE__<key>`, then plain environment.
    /// Empty values count as absent.
    fn value(
        &self,
        key: &str,
        select: impl Fn(&ConfigOverrides) -> &Option<String>,
    ) -> Option<String> {
        if let Some(value) = non_empty(select(&self.overrides).clone()) {
            return Some(value);
        }

        if let Some(path) = non_empty((self.lookup)(&format!("{FILE_PREFIX}{key}"))) {
            match read_value_file(Path::new(&path)) {
                Ok(value) => return non_empty(Some(value)),
                Err(err) => {
                    error!(key, path = %path, error = %err, "unable to read configuration file");
                }
            }
        }

        non_empty((self.lookup)(key))
    }
}

fn read_value_file(path: &Path) -> std::io::Result<String> {
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_port(key: &'static str, raw: &str) -> Result<u16> {
    raw.parse::<u16>().map_err(|err| ExporterError::InvalidConfig {
        key,
        reason: format!("{raw:?} is not a valid port: {err}"),
    })
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(0) => Err(ExporterError::InvalidConfig {
            key,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(value) => Ok(value),
        Err(err) => Err(ExporterError::InvalidConfig {
            key,
            reason: format!("{raw:?} is not a positive integer: {err}"),
        }),
    }
}

/// Prefixes must match the Prometheus name grammar `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn parse_metric_prefix(key: &'static str, raw: String) -> Result<String> {
    let mut chars = raw.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_' || first == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
    if !valid {
        return Err(ExporterError::InvalidConfig {
            key,
            reason: format!("{raw:?} is not a valid metric name prefix"),
        });
    }
    Ok(raw)
}
