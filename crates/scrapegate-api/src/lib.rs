//! scrapegate-api - HTTP surface for scrapegate.
//!
//! Serves the registry of a fresh collection pass to authorized scrapers.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/{tag}/metrics?token=...` | Prometheus exposition for an authorized tag |
//! | GET | `/healthz` | Liveness check |

pub mod access;
pub mod handlers;

use axum::Router;
use axum::routing::get;
use scrapegate_metrics::Collector;

pub use access::{AccessGate, AccessScope, AuthError, SecretStore, StaticSecrets};

/// Shared state for API handlers.
#[derive(Clone, Debug)]
pub struct ApiState {
    pub gate: AccessGate,
    pub collector: Collector,
}

/// Build the complete API router.
pub fn build_router(gate: AccessGate, collector: Collector) -> Router {
    let state = ApiState { gate, collector };

    Router::new()
        .route("/{tag}/metrics", get(handlers::scrape))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
