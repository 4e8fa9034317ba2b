use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use immich_common::error::{ExporterError, Result};

use crate::metrics::types::{MetricDescriptor, MetricFamily, MetricRecord, MetricSample};

/// A component that produces metric families on every scrape.
#[async_trait]
pub trait MetricSource: Send + Sync {
    fn name(&self) -> &str;
    async fn collect(&self) -> Vec<MetricFamily>;
}

/// Turns records into one family per record, lazily and in order.
pub fn families(records: Vec<MetricRecord>) -> impl Iterator<Item = MetricFamily> {
    records.into_iter().map(MetricRecord::into_family)
}

pub struct MetricsRegistry {
    sources: RwLock<Vec<Arc<dyn MetricSource>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
        }
    }

    pub fn register(&self, source: Arc<dyn MetricSource>) -> Result<()> {
        let mut sources = self.sources.write().map_err(|_| {
            ExporterError::InternalError("failed to acquire metrics registry lock".to_string())
        })?;

        if sources.iter().any(|existing| existing.name() == source.name()) {
            return Err(ExporterError::InternalError(format!(
                "metric source already registered: {}",
                source.name()
            )));
        }

        sources.push(source);
        Ok(())
    }

    pub fn source_count(&self) -> usize {
        self.sources.read().map(|guard| guard.len()).unwrap_or_default()
    }

    pub async fn collect_all(&self) -> Vec<MetricFamily> {
        let sources = match self.sources.read() {
            Ok(guard) => guard.clone(),
            Err(_) => return Vec::new(),
        };

        let mut collected = Vec::new();
        for source in sources {
            collected.extend(source.collect().await);
        }
        collected
    }

    pub async fn render_prometheus(&self) -> String {
        encode_text(self.collect_all().await)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes families in the text exposition format. Families sharing a name
/// are written under the first one's HELP and TYPE lines.
pub fn encode_text(families: impl IntoIterator<Item = MetricFamily>) -> String {
    let mut order: Vec<(MetricDescriptor, Vec<MetricSample>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for family in families {
        match index.get(&family.descriptor.name) {
            Some(&position) => order[position].1.extend(family.samples),
            None => {
                index.insert(family.descriptor.name.clone(), order.len());
                order.push((family.descriptor, family.samples));
            }
        }
    }

    let mut output = String::new();
    for (descriptor, samples) in order {
        output.push_str("# HELP ");
        output.push_str(&descriptor.name);
        output.push(' ');
        output.push_str(&escape_help(&descriptor.help));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(&descriptor.name);
        output.push(' ');
        output.push_str(descriptor.metric_type.as_prometheus_type());
        output.push('\n');

        for sample in samples {
            output.push_str(&render_sample_line(
                &descriptor.name,
                &sample.labels,
                sample.value.as_f64(),
            ));
        }
    }

    output
}

fn render_sample_line(name: &str, labels: &[(String, String)], value: f64) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);

    if !labels.is_empty() {
        rendered.push('{');
        for (index, (key, value)) in labels.iter().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "+" } else { "-" };
        format!("{sign}Inf")
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}
