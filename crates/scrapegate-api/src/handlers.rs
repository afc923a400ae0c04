//! HTTP handlers.
//!
//! The scrape handler runs the access gate before anything else; a
//! rejected request never starts a collection pass.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use scrapegate_core::config::is_valid_tag;
use scrapegate_metrics::render_prometheus;

use crate::ApiState;

/// Content type of error responses.
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Query string of a scrape request.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeParams {
    pub token: Option<String>,
}

// ── Exposition ─────────────────────────────────────────────────

/// GET /{tag}/metrics
pub async fn scrape(
    State(state): State<ApiState>,
    Path(tag): Path<String>,
    query: Result<Query<ScrapeParams>, QueryRejection>,
) -> Response {
    // Only alphanumeric tags are routable.
    if !is_valid_tag(&tag) {
        return StatusCode::NOT_FOUND.into_response();
    }

    // A query string that does not decode (e.g. `token` given twice) counts
    // as no token.
    let token = match &query {
        Ok(Query(params)) => params.token.as_deref(),
        Err(e) => {
            debug!(%tag, error = %e, "undecodable scrape query");
            None
        }
    };

    let scope = match state.gate.authorize(&tag, token) {
        Ok(scope) => scope,
        Err(e) => {
            warn!(%tag, error = %e, "scrape rejected");
            return (StatusCode::UNAUTHORIZED, [(CONTENT_TYPE, PLAIN_TEXT)], "").into_response();
        }
    };

    let registry = state.collector.collect().await;
    let body = render_prometheus(&registry);

    debug!(
        tag = %scope.tag(),
        metrics = registry.len(),
        bytes = body.len(),
        "scrape served"
    );
    (
        StatusCode::OK,
        [(CONTENT_TYPE, scrapegate_metrics::CONTENT_TYPE)],
        body,
    )
        .into_response()
}

// ── Liveness ───────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, [(CONTENT_TYPE, PLAIN_TEXT)], "ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use scrapegate_metrics::{producer_fn, Collector, MetricFamily, Producer, Registry};

    use crate::access::{AccessGate, StaticSecrets};

    fn test_state(calls: Arc<AtomicUsize>) -> ApiState {
        let spy: Arc<dyn Producer> = Arc::new(producer_fn("spy", move |r: &mut Registry| {
            calls.fetch_add(1, Ordering::SeqCst);
            r.register(MetricFamily::untyped("up", 1.0));
            Ok(())
        }));
        ApiState {
            gate: AccessGate::new(StaticSecrets::new(BTreeMap::from([(
                "team1".to_string(),
                "valid".to_string(),
            )]))),
            collector: Collector::new(vec![spy]),
        }
    }

    fn params(token: Option<&str>) -> Result<Query<ScrapeParams>, QueryRejection> {
        Ok(Query(ScrapeParams {
            token: token.map(str::to_string),
        }))
    }

    async fn body_string(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn scrape_with_valid_token() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resp = scrape(
            State(test_state(calls.clone())),
            Path("team1".to_string()),
            params(Some("valid")),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4; charset=utf-8"
        );
        assert_eq!(body_string(resp).await, "up 1\n");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scrape_with_wrong_token_skips_collection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resp = scrape(
            State(test_state(calls.clone())),
            Path("team1".to_string()),
            params(Some("wrong-token")),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(resp).await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scrape_without_token_is_unauthorized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resp = scrape(State(test_state(calls.clone())), Path("team1".to_string()), params(None)).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scrape_unknown_tag_is_unauthorized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resp = scrape(
            State(test_state(calls.clone())),
            Path("team2".to_string()),
            params(Some("valid")),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scrape_non_alphanumeric_tag_is_not_found() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resp = scrape(
            State(test_state(calls.clone())),
            Path("team-1".to_string()),
            params(Some("valid")),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scrape_with_no_producers_is_empty_success() {
        let state = ApiState {
            collector: Collector::new(Vec::new()),
            ..test_state(Arc::new(AtomicUsize::new(0)))
        };
        let resp = scrape(State(state), Path("team1".to_string()), params(Some("valid"))).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_string(resp).await.is_empty());
    }

    #[tokio::test]
    async fn healthz_ok() {
        let resp = healthz().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
