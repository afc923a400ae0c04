//! Metric capability and the sample values it produces.
//!
//! Anything that can name itself and produce samples on demand is a
//! [`Metric`]. Samples are recomputed on every call so a metric can back
//! a live reading rather than a cached value.

use std::collections::BTreeMap;
use std::fmt;

/// Exposition type of a metric, emitted in the `# TYPE` header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricKind {
    Counter,
    Gauge,
    /// No `# TYPE` line is emitted.
    #[default]
    Untyped,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Untyped => "untyped",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measured data point.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Label set. Kept in a `BTreeMap` so labels serialize sorted by key.
    pub labels: BTreeMap<String, String>,
    pub value: f64,
    /// Milliseconds since the Unix epoch. `None` means "scrape time".
    pub timestamp_ms: Option<i64>,
}

impl Sample {
    /// An unlabeled sample without timestamp.
    pub fn new(value: f64) -> Self {
        Self {
            labels: BTreeMap::new(),
            value,
            timestamp_ms: None,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}

/// A named metric that can render its current samples.
///
/// `name` must be free of side effects; `samples` may read live state.
pub trait Metric: Send {
    fn name(&self) -> &str;

    fn samples(&self) -> Vec<Sample>;

    /// Text for the `# HELP` line, if any.
    fn help(&self) -> Option<&str> {
        None
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Untyped
    }
}

/// A metric with a fixed set of samples, captured at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    name: String,
    help: Option<String>,
    kind: MetricKind,
    samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: None,
            kind: MetricKind::Untyped,
            samples: Vec::new(),
        }
    }

    /// Single unlabeled untyped sample, e.g. `up 1`.
    pub fn untyped(name: impl Into<String>, value: f64) -> Self {
        Self::new(name).with_sample(Sample::new(value))
    }

    /// Single unlabeled gauge sample.
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self::untyped(name, value).with_kind(MetricKind::Gauge)
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_kind(mut self, kind: MetricKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_sample(mut self, sample: Sample) -> Self {
        self.samples.push(sample);
        self
    }

    pub fn push_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
}

impl Metric for MetricFamily {
    fn name(&self) -> &str {
        &self.name
    }

    fn samples(&self) -> Vec<Sample> {
        self.samples.clone()
    }

    fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    fn kind(&self) -> MetricKind {
        self.kind
    }
}

/// Gauge whose value is read from a closure each time it is rendered.
pub struct LiveGauge {
    name: String,
    help: Option<String>,
    read: Box<dyn Fn() -> f64 + Send>,
}

impl LiveGauge {
    pub fn new(name: impl Into<String>, read: impl Fn() -> f64 + Send + 'static) -> Self {
        Self {
            name: name.into(),
            help: None,
            read: Box::new(read),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Debug for LiveGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveGauge")
            .field("name", &self.name)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

impl Metric for LiveGauge {
    fn name(&self) -> &str {
        &self.name
    }

    fn samples(&self) -> Vec<Sample> {
        vec![Sample::new((self.read)())]
    }

    fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }
}
