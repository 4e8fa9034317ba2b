use std::sync::Arc;

use async_trait::async_trait;
use immich_client::{ImmichApi, ServerStatistics, types::STATISTICS_ENDPOINT};
use immich_common::error::Result;

use crate::metrics::{collectors::Extractor, collectors::fetch, types::MetricRecord};

const USER_LABEL: &str = "firstName";

/// Per-user media counts plus the server-wide totals.
pub struct UserMetrics {
    api: Arc<dyn ImmichApi>,
    prefix: String,
}

impl UserMetrics {
    pub fn new(api: Arc<dyn ImmichApi>, prefix: &str) -> Self {
        Self {
            api,
            prefix: prefix.to_string(),
        }
    }

    /// Growth gauges carry the totals the server reports, not a sum over users.
    pub fn records(&self, stats: &ServerStatistics) -> Vec<MetricRecord> {
        let prefix = &self.prefix;
        let mut records = Vec::with_capacity(stats.usage_by_user.len() * 3 + 4);

        for user in &stats.usage_by_user {
            let first_name = user.first_name();
            records.push(
                MetricRecord::gauge(
                    format!("{prefix}_server_stats_photos_by_users"),
                    user.photos as f64,
                    format!("Number of photos by user {first_name}"),
                )
                .with_label(USER_LABEL, first_name),
            );
            records.push(
                MetricRecord::gauge(
                    format!("{prefix}_server_stats_videos_by_users"),
                    user.videos as f64,
                    format!("Number of videos by user {first_name}"),
                )
                .with_label(USER_LABEL, first_name),
            );
            records.push(
                MetricRecord::gauge(
                    format!("{prefix}_server_stats_usage_by_users"),
                    user.usage as f64,
                    format!("Storage usage in bytes by user {first_name}"),
                )
                .with_label(USER_LABEL, first_name),
            );
        }

        records.extend([
            MetricRecord::gauge(
                format!("{prefix}_server_stats_user_count"),
                stats.usage_by_user.len() as f64,
                "number of users on the immich server",
            ),
            MetricRecord::gauge(
                format!("{prefix}_server_stats_photos_growth"),
                stats.photos as f64,
                "photos counter that is added or removed",
            ),
            MetricRecord::gauge(
                format!("{prefix}_server_stats_videos_growth"),
                stats.videos as f64,
                "videos counter that is added or removed",
            ),
            MetricRecord::gauge(
                format!("{prefix}_server_stats_usage_growth"),
                stats.usage as f64,
                "usage counter that is added or removed",
            ),
        ]);

        records
    }
}

#[async_trait]
impl Extractor for UserMetrics {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn extract(&self) -> Result<Vec<MetricRecord>> {
        let stats = fetch::<ServerStatistics>(self.api.as_ref(), STATISTICS_ENDPOINT).await?;
        Ok(self.records(&stats))
    }
}
