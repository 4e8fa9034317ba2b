use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("missing required configuration: {key} ({hint})")]
    ConfigMissing { key: &'static str, hint: &'static str },
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
    #[error("cannot reach immich at {url}: {reason}")]
    UpstreamUnreachable { url: String, reason: String },
    #[error("immich endpoint {url} returned status {status}")]
    UpstreamStatus { url: String, status: u16 },
    #[error("bad response from immich endpoint {url}: {reason}")]
    UpstreamBadResponse { url: String, reason: String },
    #[error("internal error: {0}")]
    InternalError(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    /// Process exit code reported when this error ends the exporter.
    pub fn exit_code(&self) -> u8 {
        1
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigMissing { .. } | Self::InvalidConfig { .. })
    }

    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnreachable { .. }
                | Self::UpstreamStatus { .. }
                | Self::UpstreamBadResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
