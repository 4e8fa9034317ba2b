pub mod collectors;
pub mod registry;
pub mod types;

pub use collectors::{
    Extractor, ImmichCollector, storage::StorageMetrics, system::SystemMetrics,
    users::UserMetrics, version::VersionMetrics,
};
pub use registry::{MetricSource, MetricsRegistry, encode_text, families};
pub use types::{MetricDescriptor, MetricFamily, MetricRecord, MetricType, MetricValue};
