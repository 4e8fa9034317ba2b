pub mod storage;
pub mod system;
pub mod users;
pub mod version;

use std::sync::Arc;

use async_trait::async_trait;
use immich_client::ImmichApi;
use immich_common::{
    Config,
    error::{ExporterError, Result},
};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::metrics::{
    registry::{MetricSource, families},
    types::{MetricFamily, MetricRecord},
};

use self::{
    storage::StorageMetrics, system::SystemMetrics, users::UserMetrics, version::VersionMetrics,
};

/// One independent data source turned into metric records.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;
    async fn extract(&self) -> Result<Vec<MetricRecord>>;
}

/// Runs every extractor on each scrape and keeps whatever succeeded.
pub struct ImmichCollector {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ImmichCollector {
    /// Extractors run in the order version, storage, users, system.
    pub fn new(api: Arc<dyn ImmichApi>, config: &Config) -> Self {
        let prefix = config.metrics_prefix.as_str();
        Self::with_extractors(vec![
            Box::new(VersionMetrics::new(
                Arc::clone(&api),
                prefix,
                config.version_attempts,
            )),
            Box::new(StorageMetrics::new(Arc::clone(&api), prefix)),
            Box::new(UserMetrics::new(api, prefix)),
            Box::new(SystemMetrics::new(prefix)),
        ])
    }

    pub fn with_extractors(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    pub async fn collect_all(&self) -> Vec<MetricRecord> {
        info!("requested the metrics");
        let mut records = Vec::new();
        for extractor in &self.extractors {
            match extractor.extract().await {
                Ok(extracted) => {
                    debug!(
                        extractor = extractor.name(),
                        count = extracted.len(),
                        "collected metrics"
                    );
                    records.extend(extracted);
                }
                Err(err) => {
                    error!(
                        extractor = extractor.name(),
                        error = %err,
                        "failed to collect metrics, skipping for this scrape"
                    );
                }
            }
        }
        records
    }
}

#[async_trait]
impl MetricSource for ImmichCollector {
    fn name(&self) -> &str {
        "immich"
    }

    async fn collect(&self) -> Vec<MetricFamily> {
        families(self.collect_all().await).collect()
    }
}

/// Fetches an endpoint and decodes it into the extractor's view of the response.
pub(crate) async fn fetch<T: DeserializeOwned>(api: &dyn ImmichApi, endpoint: &str) -> Result<T> {
    let body = api.get(endpoint).await?;
    serde_json::from_value(body).map_err(|err| ExporterError::UpstreamBadResponse {
        url: endpoint.to_string(),
        reason: err.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use immich_client::types::{ABOUT_ENDPOINT, STATISTICS_ENDPOINT, STORAGE_ENDPOINT};
    use serde_json::json;

    use super::{testing::CannedApi, *};

    struct FixedRecords(&'static str, Vec<MetricRecord>);

    #[async_trait]
    impl Extractor for FixedRecords {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn extract(&self) -> Result<Vec<MetricRecord>> {
            Ok(self.1.clone())
        }
    }

    fn healthy_api() -> CannedApi {
        CannedApi::default()
            .with(ABOUT_ENDPOINT, json!({ "version": "v1.118.2" }))
            .with(
                STORAGE_ENDPOINT,
                json!({
                    "diskAvailableRaw": 600,
                    "diskSizeRaw": 1000,
                    "diskUseRaw": 400,
                    "diskUsagePercentage": 40.0
                }),
            )
            .with(
                STATISTICS_ENDPOINT,
                json!({
                    "photos": 5,
                    "videos": 1,
                    "usage": 900,
                    "usageByUser": [
                        { "userName": "Jane Doe", "photos": 5, "videos": 1, "usage": 900 }
                    ]
                }),
            )
    }

    fn upstream_only(api: Arc<CannedApi>) -> ImmichCollector {
        ImmichCollector::with_extractors(vec![
            Box::new(VersionMetrics::new(api.clone(), "immich", 1)),
            Box::new(StorageMetrics::new(api.clone(), "immich")),
            Box::new(UserMetrics::new(api, "immich")),
            Box::new(FixedRecords(
                "system",
                vec![MetricRecord::gauge("immich_system_info_cpu_usage", 12.5, "cpu")],
            )),
        ])
    }

    #[tokio::test]
    async fn records_follow_extractor_order() {
        let collector = upstream_only(Arc::new(healthy_api()));

        let records = collector.collect_all().await;
        let names: Vec<&str> = records.iter().map(|record| record.name.as_str()).collect();

        assert_eq!(records.len(), 1 + 4 + 7 + 1);
        assert_eq!(names[0], "immich_server_info_version_number");
        assert_eq!(names[1], "immich_server_info_diskAvailable");
        assert_eq!(names[5], "immich_server_stats_photos_by_users");
        assert_eq!(names[12], "immich_system_info_cpu_usage");
    }

    #[tokio::test]
    async fn failing_extractor_does_not_blank_the_others() {
        let api = CannedApi::default()
            .with(ABOUT_ENDPOINT, json!({ "version": "v1.118.2" }))
            .with(
                STATISTICS_ENDPOINT,
                json!({ "photos": 0, "videos": 0, "usage": 0, "usageByUser": [] }),
            );
        let collector = upstream_only(Arc::new(api));

        let records = collector.collect_all().await;

        assert!(
            records
                .iter()
                .all(|record| !record.name.starts_with("immich_server_info_disk"))
        );
        assert!(
            records
                .iter()
                .any(|record| record.name == "immich_server_info_version_number")
        );
        assert!(
            records
                .iter()
                .any(|record| record.name == "immich_server_stats_user_count")
        );
        assert!(
            records
                .iter()
                .any(|record| record.name == "immich_system_info_cpu_usage")
        );
    }

    #[tokio::test]
    async fn malformed_body_is_skipped() {
        let api = healthy_api().with(STORAGE_ENDPOINT, json!({ "diskSizeRaw": "lots" }));
        let collector = upstream_only(Arc::new(api));

        let records = collector.collect_all().await;

        assert_eq!(records.len(), 1 + 7 + 1);
    }

    #[tokio::test]
    async fn repeated_scrapes_are_identical() {
        let collector = upstream_only(Arc::new(healthy_api()));

        let first = collector.collect_all().await;
        let second = collector.collect_all().await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn collector_renders_one_family_per_record() {
        let collector = upstream_only(Arc::new(healthy_api()));

        let families = MetricSource::collect(&collector).await;

        assert_eq!(families.len(), 13);
        assert!(families.iter().all(|family| family.samples.len() == 1));
    }
}
