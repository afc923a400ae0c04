//! Request-scoped metric registry.
//!
//! A `Registry` is created empty for each collection pass, filled by
//! producers, rendered once, and dropped. It holds at most one metric per
//! name: registering a name again replaces the earlier metric in place.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::metric::Metric;

/// Metrics keyed by name, iterated in first-registration order.
#[derive(Default)]
pub struct Registry {
    /// Metrics in the order their name was first registered.
    entries: Vec<Box<dyn Metric>>,
    /// Name → index into `entries`.
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a metric, replacing any earlier metric with the same name.
    ///
    /// The replacement keeps the slot of the original registration, so
    /// iteration order only depends on when a name was first seen.
    pub fn register<M: Metric + 'static>(&mut self, metric: M) {
        self.register_boxed(Box::new(metric));
    }

    pub fn register_boxed(&mut self, metric: Box<dyn Metric>) {
        let name = metric.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                trace!(metric = %name, "replacing previously registered metric");
                self.entries[slot] = metric;
            }
            None => {
                self.index.insert(name, self.entries.len());
                self.entries.push(metric);
            }
        }
    }

    /// Every registered metric, in deterministic order.
    pub fn all(&self) -> impl Iterator<Item = &dyn Metric> {
        self.entries.iter().map(|m| m.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Metric> {
        self.index.get(name).map(|&slot| self.entries[slot].as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register every metric of `other`, in its order.
    ///
    /// Names already present here are replaced by `other`'s metric.
    pub fn merge(&mut self, other: Registry) {
        for metric in other.entries {
            self.register_boxed(metric);
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("metrics", &self.names())
            .finish()
    }
}
