//! scrapegate-metrics - request-scoped metric collection and exposition.
//!
//! Producers register named metrics into a fresh [`Registry`] on every
//! collection pass; the registry is then rendered in the Prometheus text
//! exposition format.
//!
//! # Architecture
//!
//! ```text
//! Collector
//!   ├── collect() → fresh Registry per pass
//!   │   └── Producer::produce(&mut Registry), one after another
//!   └── failing / slow producers lose only their own metrics
//!
//! Registry
//!   └── one Metric per name, last registration wins
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /{tag}/metrics
//! ```

pub mod builtin;
pub mod collector;
pub mod metric;
pub mod prometheus;
pub mod registry;

pub use collector::{
    producer_fn, CollectionReport, Collector, FnProducer, Producer, ProducerOutcome,
};
pub use metric::{LiveGauge, Metric, MetricFamily, MetricKind, Sample};
pub use prometheus::{render_prometheus, CONTENT_TYPE};
pub use registry::Registry;
