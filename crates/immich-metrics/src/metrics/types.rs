use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    #[default]
    Gauge,
}

impl MetricType {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

/// One scrape's worth of a single series, as produced by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: String,
    pub value: f64,
    pub help: String,
    pub labels: BTreeMap<String, String>,
    pub kind: MetricType,
}

impl MetricRecord {
    pub fn gauge(name: impl Into<String>, value: f64, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            help: help.into(),
            labels: BTreeMap::new(),
            kind: MetricType::Gauge,
        }
    }

    pub fn counter(name: impl Into<String>, value: f64, help: impl Into<String>) -> Self {
        Self {
            kind: MetricType::Counter,
            ..Self::gauge(name, value, help)
        }
    }

    pub fn flag(name: impl Into<String>, value: bool, help: impl Into<String>) -> Self {
        Self::gauge(name, if value { 1.0 } else { 0.0 }, help)
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Builds a fresh single-sample family. Records sharing a name are never merged here.
    pub fn into_family(self) -> MetricFamily {
        let value = match self.kind {
            MetricType::Counter => MetricValue::Counter(self.value),
            MetricType::Gauge => MetricValue::Gauge(self.value),
        };
        let variable_labels = self.labels.keys().cloned().collect();

        MetricFamily {
            descriptor: MetricDescriptor {
                name: self.name,
                help: self.help,
                metric_type: self.kind,
                variable_labels,
            },
            samples: vec![MetricSample {
                labels: self.labels.into_iter().collect(),
                value,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub variable_labels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Counter(f64),
    Gauge(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Counter(value) | Self::Gauge(value) => *value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub labels: Vec<(String, String)>,
    pub value: MetricValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub descriptor: MetricDescriptor,
    pub samples: Vec<MetricSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_defaults_to_gauge() {
        let record = MetricRecord::gauge("immich_server_info_diskUse", 42.0, "disk space in use");
        assert_eq!(record.kind, MetricType::Gauge);
        assert!(record.labels.is_empty());
    }

    #[test]
    fn counter_record_becomes_counter_family() {
        let family = MetricRecord::counter("immich_uploads", 7.0, "uploads")
            .with_label("firstName", "Jane")
            .into_family();

        assert_eq!(family.descriptor.metric_type, MetricType::Counter);
        assert_eq!(family.descriptor.variable_labels, vec!["firstName".to_string()]);
        assert_eq!(family.samples.len(), 1);
        assert_eq!(family.samples[0].value, MetricValue::Counter(7.0));
        assert_eq!(
            family.samples[0].labels,
            vec![("firstName".to_string(), "Jane".to_string())]
        );
    }

    #[test]
    fn flag_maps_bool_to_number() {
        assert_eq!(MetricRecord::flag("up", true, "").value, 1.0);
        assert_eq!(MetricRecord::flag("up", false, "").value, 0.0);
    }
}
