//! Producers shipped with the daemon.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use scrapegate_core::config::{StaticMetricConfig, StaticMetricKind};

use crate::collector::Producer;
use crate::metric::{LiveGauge, Metric, MetricFamily, MetricKind, Sample};
use crate::registry::Registry;

/// Process start time and uptime.
pub struct ProcessProducer {
    started: Instant,
    start_epoch_secs: f64,
}

impl ProcessProducer {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            start_epoch_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
        }
    }
}

impl Default for ProcessProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Producer for ProcessProducer {
    fn name(&self) -> &str {
        "process"
    }

    fn produce(&self, registry: &mut Registry) -> anyhow::Result<()> {
        registry.register(
            MetricFamily::gauge("process_start_time_seconds", self.start_epoch_secs)
                .with_help("Start time of the process since unix epoch in seconds."),
        );
        let started = self.started;
        registry.register(
            LiveGauge::new("process_uptime_seconds", move || started.elapsed().as_secs_f64())
                .with_help("Seconds since the process started."),
        );
        Ok(())
    }
}

/// Constant `scrapegate_build_info{version="..."} 1`.
pub struct BuildInfoProducer {
    version: String,
}

impl BuildInfoProducer {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl Producer for BuildInfoProducer {
    fn name(&self) -> &str {
        "build_info"
    }

    fn produce(&self, registry: &mut Registry) -> anyhow::Result<()> {
        registry.register(
            MetricFamily::new("scrapegate_build_info")
                .with_help("Build information of the running binary.")
                .with_kind(MetricKind::Gauge)
                .with_sample(Sample::new(1.0).with_label("version", self.version.as_str())),
        );
        Ok(())
    }
}

/// Metrics declared as `[[static_metric]]` entries in the config file.
pub struct StaticTableProducer {
    metrics: Vec<MetricFamily>,
}

impl StaticTableProducer {
    /// Entries sharing a name become one family, one sample per entry,
    /// in the order the names first appear.
    pub fn from_config(entries: &[StaticMetricConfig]) -> Self {
        let mut metrics: Vec<MetricFamily> = Vec::new();
        for entry in entries {
            let sample = entry
                .labels
                .iter()
                .fold(Sample::new(entry.value), |s, (k, v)| s.with_label(k, v));

            if let Some(family) = metrics.iter_mut().find(|m| m.name() == entry.name) {
                family.push_sample(sample);
                continue;
            }

            let mut family = MetricFamily::new(&entry.name)
                .with_kind(match entry.kind {
                    StaticMetricKind::Counter => MetricKind::Counter,
                    StaticMetricKind::Gauge => MetricKind::Gauge,
                    StaticMetricKind::Untyped => MetricKind::Untyped,
                })
                .with_sample(sample);
            if let Some(help) = &entry.help {
                family = family.with_help(help);
            }
            metrics.push(family);
        }
        Self { metrics }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Producer for StaticTableProducer {
    fn name(&self) -> &str {
        "static_table"
    }

    fn produce(&self, registry: &mut Registry) -> anyhow::Result<()> {
        for metric in &self.metrics {
            registry.register(metric.clone());
        }
        Ok(())
    }
}
