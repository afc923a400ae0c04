//! Static producer registration table.

use std::sync::Arc;

use scrapegate_core::ScrapegateConfig;
use scrapegate_metrics::builtin::{BuildInfoProducer, ProcessProducer, StaticTableProducer};
use scrapegate_metrics::Producer;

/// Producers run on every scrape, in this order.
pub fn build_producers(config: &ScrapegateConfig) -> Vec<Arc<dyn Producer>> {
    let mut producers: Vec<Arc<dyn Producer>> = vec![
        Arc::new(ProcessProducer::new()),
        Arc::new(BuildInfoProducer::new(env!("CARGO_PKG_VERSION"))),
    ];

    let table = StaticTableProducer::from_config(&config.static_metrics);
    if !table.is_empty() {
        producers.push(Arc::new(table));
    }
    producers
}
