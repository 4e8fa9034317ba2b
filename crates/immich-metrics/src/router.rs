use std::sync::Arc;

use axum::{Router, routing::get};

use crate::{handlers, metrics::MetricsRegistry};

pub const METRICS_PATH: &str = "/metrics";
pub const LIVE_PATH: &str = "/health/live";

pub struct ExporterState {
    pub registry: Arc<MetricsRegistry>,
}

impl ExporterState {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }
}

pub fn exporter_router(state: Arc<ExporterState>) -> Router {
    Router::new()
        .route(METRICS_PATH, get(handlers::metrics::prometheus_metrics))
        .route(LIVE_PATH, get(handlers::health::health_live))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use immich_common::error::{ExporterError, Result};
    use tower::ServiceExt;

    use super::*;
    use crate::metrics::{Extractor, ImmichCollector, MetricRecord};

    struct Fixed(Vec<MetricRecord>);

    #[async_trait]
    impl Extractor for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn extract(&self) -> Result<Vec<MetricRecord>> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl Extractor for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn extract(&self) -> Result<Vec<MetricRecord>> {
            Err(ExporterError::UpstreamUnreachable {
                url: "http://immich:2283/api/server/storage".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    fn router_with(extractors: Vec<Box<dyn Extractor>>) -> Router {
        let registry = Arc::new(MetricsRegistry::new());
        registry
            .register(Arc::new(ImmichCollector::with_extractors(extractors)))
            .expect("register collector");
        exporter_router(Arc::new(ExporterState::new(registry)))
    }

    async fn get(router: Router, path: &str) -> (StatusCode, Option<String>, String) {
        let response = router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_text_format() {
        let router = router_with(vec![Box::new(Fixed(vec![
            MetricRecord::flag("immich_server_info_version_number", true, "server version number")
                .with_label("version", "v1.118.2"),
        ]))]);

        let (status, content_type, body) = get(router, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            content_type.as_deref(),
            Some(handlers::metrics::TEXT_FORMAT_CONTENT_TYPE)
        );
        assert!(body.contains("# TYPE immich_server_info_version_number gauge\n"));
        assert!(body.contains("immich_server_info_version_number{version=\"v1.118.2\"} 1\n"));
    }

    #[tokio::test]
    async fn failing_extractor_still_returns_ok() {
        let router = router_with(vec![
            Box::new(Broken),
            Box::new(Fixed(vec![MetricRecord::gauge(
                "immich_system_info_cpu_usage",
                3.5,
                "cpu",
            )])),
        ]);

        let (status, _, body) = get(router, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("immich_system_info_cpu_usage 3.5\n"));
    }

    #[tokio::test]
    async fn liveness_probe_answers() {
        let router = router_with(Vec::new());

        let (status, _, _) = get(router, "/health/live").await;

        assert_eq!(status, StatusCode::OK);
    }
}
