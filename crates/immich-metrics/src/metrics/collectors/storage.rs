use std::sync::Arc;

use async_trait::async_trait;
use immich_client::{ImmichApi, ServerStorage, types::STORAGE_ENDPOINT};
use immich_common::error::Result;

use crate::metrics::{collectors::Extractor, collectors::fetch, types::MetricRecord};

pub struct StorageMetrics {
    api: Arc<dyn ImmichApi>,
    prefix: String,
}

impl StorageMetrics {
    pub fn new(api: Arc<dyn ImmichApi>, prefix: &str) -> Self {
        Self {
            api,
            prefix: prefix.to_string(),
        }
    }

    pub fn records(&self, storage: &ServerStorage) -> Vec<MetricRecord> {
        let prefix = &self.prefix;
        vec![
            MetricRecord::gauge(
                format!("{prefix}_server_info_diskAvailable"),
                storage.disk_available_raw as f64,
                "Available space on disk",
            ),
            MetricRecord::gauge(
                format!("{prefix}_server_info_totalDiskSize"),
                storage.disk_size_raw as f64,
                "total disk size",
            ),
            MetricRecord::gauge(
                format!("{prefix}_server_info_diskUse"),
                storage.disk_use_raw as f64,
                "disk space in use",
            ),
            MetricRecord::gauge(
                format!("{prefix}_server_info_diskUsagePercentage"),
                storage.disk_usage_percentage,
                "disk usage in percent",
            ),
        ]
    }
}

#[async_trait]
impl Extractor for StorageMetrics {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn extract(&self) -> Result<Vec<MetricRecord>> {
        let storage = fetch::<ServerStorage>(self.api.as_ref(), STORAGE_ENDPOINT).await?;
        Ok(self.records(&storage))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::metrics::collectors::testing::CannedApi;

    #[tokio::test]
    async fn storage_yields_four_unlabeled_gauges() {
        let api = Arc::new(CannedApi::default().with(
            STORAGE_ENDPOINT,
            json!({
                "diskAvailable": "1.2 TiB",
                "diskAvailableRaw": 1_319_413_953_331_u64,
                "diskSize": "1.8 TiB",
                "diskSizeRaw": 1_979_120_929_996_u64,
                "diskUse": "600 GiB",
                "diskUseRaw": 659_706_976_665_u64,
                "diskUsagePercentage": 33.33
            }),
        ));
        let metrics = StorageMetrics::new(api.clone(), "immich");

        let records = metrics.extract().await.expect("storage extracted");

        let summary: Vec<(&str, f64)> = records
            .iter()
            .map(|record| (record.name.as_str(), record.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("immich_server_info_diskAvailable", 1_319_413_953_331.0),
                ("immich_server_info_totalDiskSize", 1_979_120_929_996.0),
                ("immich_server_info_diskUse", 659_706_976_665.0),
                ("immich_server_info_diskUsagePercentage", 33.33),
            ]
        );
        assert!(records.iter().all(|record| record.labels.is_empty()));
        assert_eq!(api.calls(STORAGE_ENDPOINT), 1);
    }

    #[tokio::test]
    async fn failed_request_is_not_retried() {
        let api = Arc::new(CannedApi::default());
        let metrics = StorageMetrics::new(api.clone(), "immich");

        assert!(metrics.extract().await.is_err());
        assert_eq!(api.calls(STORAGE_ENDPOINT), 1);
    }

    #[test]
    fn prefix_is_applied() {
        let api = Arc::new(CannedApi::default());
        let metrics = StorageMetrics::new(api, "photos");
        let storage = ServerStorage {
            disk_available_raw: 1,
            disk_size_raw: 2,
            disk_use_raw: 1,
            disk_usage_percentage: 50.0,
        };

        let records = metrics.records(&storage);

        assert!(records.iter().all(|record| record.name.starts_with("photos_server_info_")));
    }
}
