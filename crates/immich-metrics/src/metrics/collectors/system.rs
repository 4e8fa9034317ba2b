use std::time::Duration;

use async_trait::async_trait;
use immich_common::error::{ExporterError, Result};
use sysinfo::System;

use crate::metrics::{collectors::Extractor, types::MetricRecord};

const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// Host counters read at scrape time.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    pub load_average: [f64; 3],
    pub memory_total: u64,
    pub memory_available: u64,
    pub memory_used: u64,
    pub memory_free: u64,
    pub cpu_percent: f64,
}

impl SystemSnapshot {
    /// Blocks the calling thread for `window` while CPU usage is sampled.
    pub fn sample(window: Duration) -> Self {
        let load = System::load_average();
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu();
        std::thread::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        system.refresh_cpu();

        Self {
            load_average: [load.one, load.five, load.fifteen],
            memory_total: system.total_memory(),
            memory_available: system.available_memory(),
            memory_used: system.used_memory(),
            memory_free: system.free_memory(),
            cpu_percent: f64::from(system.global_cpu_info().cpu_usage()),
        }
    }

    pub fn memory_percent(&self) -> f64 {
        if self.memory_total == 0 {
            return 0.0;
        }
        let in_use = self.memory_total.saturating_sub(self.memory_available);
        (in_use as f64 / self.memory_total as f64 * 1000.0).round() / 10.0
    }
}

pub struct SystemMetrics {
    prefix: String,
    window: Duration,
}

impl SystemMetrics {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            window: CPU_SAMPLE_WINDOW,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn records(&self, snapshot: &SystemSnapshot) -> Vec<MetricRecord> {
        let load_name = format!("{}_system_info_loadAverage", self.prefix);
        let memory_name = format!("{}_system_info_memory", self.prefix);

        let mut records = Vec::with_capacity(9);
        for (period, value) in ["1m", "5m", "15m"].into_iter().zip(snapshot.load_average) {
            records.push(
                MetricRecord::gauge(&load_name, value, format!("CPU Load average {period}"))
                    .with_label("period", period),
            );
        }

        let memory = [
            ("Total", snapshot.memory_total as f64),
            ("Available", snapshot.memory_available as f64),
            ("Percent", snapshot.memory_percent()),
            ("Used", snapshot.memory_used as f64),
            ("Free", snapshot.memory_free as f64),
        ];
        for (kind, value) in memory {
            records.push(
                MetricRecord::gauge(&memory_name, value, format!("Virtual Memory - {kind}"))
                    .with_label("type", kind),
            );
        }

        records.push(MetricRecord::gauge(
            format!("{}_system_info_cpu_usage", self.prefix),
            snapshot.cpu_percent,
            "Representing the current system-wide CPU utilization as a percentage",
        ));

        records
    }
}

#[async_trait]
impl Extractor for SystemMetrics {
    fn name(&self) -> &'static str {
        "system"
    }

    async fn extract(&self) -> Result<Vec<MetricRecord>> {
        let window = self.window;
        let snapshot = tokio::task::spawn_blocking(move || SystemSnapshot::sample(window))
            .await
            .map_err(|err| {
                ExporterError::InternalError(format!("system sampling task failed: {err}"))
            })?;

        Ok(self.records(&snapshot))
    }
}
