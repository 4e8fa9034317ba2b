use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use immich_client::{ImmichApi, ServerAbout, types::ABOUT_ENDPOINT};
use immich_common::error::{ExporterError, Result};
use tracing::warn;

use crate::metrics::{collectors::Extractor, collectors::fetch, types::MetricRecord};

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Reports the server version as a label on a constant gauge.
pub struct VersionMetrics {
    api: Arc<dyn ImmichApi>,
    name: String,
    attempts: u32,
    retry_delay: Duration,
}

impl VersionMetrics {
    pub fn new(api: Arc<dyn ImmichApi>, prefix: &str, attempts: u32) -> Self {
        Self {
            api,
            name: format!("{prefix}_server_info_version_number"),
            attempts: attempts.max(1),
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    async fn fetch_about(&self) -> Result<ServerAbout> {
        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match fetch::<ServerAbout>(self.api.as_ref(), ABOUT_ENDPOINT).await {
                Ok(about) => return Ok(about),
                Err(err) => {
                    warn!(attempt, attempts = self.attempts, error = %err, "couldn't get server version");
                    last_error = Some(err);
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ExporterError::InternalError("version lookup made no attempts".to_string())
        }))
    }
}

#[async_trait]
impl Extractor for VersionMetrics {
    fn name(&self) -> &'static str {
        "version"
    }

    async fn extract(&self) -> Result<Vec<MetricRecord>> {
        let about = self.fetch_about().await?;

        Ok(vec![
            MetricRecord::flag(&self.name, !about.version.is_empty(), "server version number")
                .with_label("version", about.version),
        ])
    }
}
