//! Collection pass - runs every producer against a fresh registry.
//!
//! Producers run one after another in declared order. Each producer fills
//! its own scratch registry on a blocking worker; the scratch registry is
//! merged into the pass registry only if the producer returns `Ok` within
//! its timeout. A failing, panicking, or hung producer loses its own
//! metrics and nothing else.
//!
//! A producer that timed out cannot be cancelled. Until that run returns,
//! later passes skip the producer instead of starting another run, so one
//! hung producer holds at most one blocking worker.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::registry::Registry;

/// Something that registers metrics into a registry during a pass.
pub trait Producer: Send + Sync {
    /// Identifier used in logs and collection reports.
    fn name(&self) -> &str;

    fn produce(&self, registry: &mut Registry) -> anyhow::Result<()>;
}

/// Adapts a closure into a [`Producer`].
pub struct FnProducer<F> {
    name: String,
    produce: F,
}

/// Wrap a closure as a named producer.
pub fn producer_fn<F>(name: impl Into<String>, produce: F) -> FnProducer<F>
where
    F: Fn(&mut Registry) -> anyhow::Result<()> + Send + Sync,
{
    FnProducer {
        name: name.into(),
        produce,
    }
}

impl<F> Producer for FnProducer<F>
where
    F: Fn(&mut Registry) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn produce(&self, registry: &mut Registry) -> anyhow::Result<()> {
        (self.produce)(registry)
    }
}

/// What happened to one producer during a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerOutcome {
    /// Contribution merged; `metrics` is how many names it registered.
    Collected { metrics: usize },
    Failed(String),
    Panicked,
    /// Exceeded the per-producer timeout.
    TimedOut,
    /// Not started: an earlier run of this producer is still in progress.
    Skipped,
}

/// Per-producer outcomes of one pass, in execution order.
#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub outcomes: Vec<(String, ProducerOutcome)>,
}

impl CollectionReport {
    pub fn outcome(&self, producer: &str) -> Option<&ProducerOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == producer)
            .map(|(_, outcome)| outcome)
    }

    /// Number of producers whose contribution was merged.
    pub fn collected(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ProducerOutcome::Collected { .. }))
            .count()
    }
}

/// A registered producer and whether a run of it is in flight.
///
/// The flag is shared by every clone of the collector, so concurrent
/// scrapes see the same state.
#[derive(Clone)]
struct ProducerSlot {
    producer: Arc<dyn Producer>,
    running: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the run ends, including by panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs the registered producers once per call to [`Collector::collect`].
#[derive(Clone, Default)]
pub struct Collector {
    producers: Vec<ProducerSlot>,
    /// Time each producer gets per pass. `None` means unbounded.
    timeout: Option<Duration>,
}

impl Collector {
    pub fn new(producers: Vec<Arc<dyn Producer>>) -> Self {
        Self {
            producers: producers
                .into_iter()
                .map(|producer| ProducerSlot {
                    producer,
                    running: Arc::new(AtomicBool::new(false)),
                })
                .collect(),
            timeout: None,
        }
    }

    /// Bound every producer's run to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn producer_names(&self) -> Vec<&str> {
        self.producers.iter().map(|s| s.producer.name()).collect()
    }

    /// Run a collection pass and return the populated registry.
    ///
    /// Never fails: producer errors only remove that producer's metrics.
    pub async fn collect(&self) -> Registry {
        self.collect_with_report().await.0
    }

    /// Like [`collect`](Self::collect), also returning per-producer outcomes.
    pub async fn collect_with_report(&self) -> (Registry, CollectionReport) {
        let started = Instant::now();
        let mut registry = Registry::new();
        let mut report = CollectionReport::default();

        for slot in &self.producers {
            let name = slot.producer.name().to_string();

            let outcome = match run_producer(slot, self.timeout).await {
                Ok(scratch) => {
                    let metrics = scratch.len();
                    registry.merge(scratch);
                    ProducerOutcome::Collected { metrics }
                }
                Err(outcome) => {
                    match &outcome {
                        ProducerOutcome::Failed(e) => {
                            warn!(producer = %name, error = %e, "producer failed, metrics dropped")
                        }
                        ProducerOutcome::Panicked => {
                            warn!(producer = %name, "producer panicked, metrics dropped")
                        }
                        ProducerOutcome::TimedOut => {
                            warn!(producer = %name, "producer timed out, metrics dropped")
                        }
                        ProducerOutcome::Skipped => {
                            warn!(producer = %name, "previous run still in progress, producer skipped")
                        }
                        ProducerOutcome::Collected { .. } => {}
                    }
                    outcome
                }
            };
            report.outcomes.push((name, outcome));
        }

        debug!(
            producers = self.producers.len(),
            collected = report.collected(),
            metrics = registry.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection pass finished"
        );
        (registry, report)
    }
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("producers", &self.producer_names())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Run one producer on a blocking worker into a scratch registry.
///
/// A timed-out run keeps its worker and in-flight flag until it returns;
/// its result is discarded.
async fn run_producer(
    slot: &ProducerSlot,
    timeout: Option<Duration>,
) -> Result<Registry, ProducerOutcome> {
    if slot.running.swap(true, Ordering::AcqRel) {
        return Err(ProducerOutcome::Skipped);
    }
    let guard = InFlight(Arc::clone(&slot.running));
    let producer = Arc::clone(&slot.producer);

    let task = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        let mut scratch = Registry::new();
        producer.produce(&mut scratch).map(|()| scratch)
    });

    let joined = match timeout {
        Some(timeout) => match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined,
            Err(_) => return Err(ProducerOutcome::TimedOut),
        },
        None => task.await,
    };

    match joined {
        Ok(Ok(scratch)) => Ok(scratch),
        Ok(Err(e)) => Err(ProducerOutcome::Failed(format!("{e:#}"))),
        Err(e) if e.is_panic() => Err(ProducerOutcome::Panicked),
        Err(e) => Err(ProducerOutcome::Failed(e.to_string())),
    }
}
