//! HTTP routes.
//!
//! ```text
//! GET  /_health  - Liveness and stored job count
//! ANY  /{target} - Register a job delivering this request to {target}
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::routing::get;
use axum::{Json, Router};
use ralley_queue::{RawRequest, RequestBody};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Largest accepted inbound body.
pub const MAX_BODY_BYTES: usize = 15 * 1_000_000;

/// Create the router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/_health", get(health))
        .fallback(enqueue)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// GET /_health
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "jobs": state.job_count(),
    }))
}

/// Register any other request as a job.
async fn enqueue(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let raw = raw_request(&method, &uri, &headers, body);
    debug!(method = %method, target = %raw.url, "Inbound request");

    let job = state.scheduler.enqueue_request(raw)?;
    Ok(Json(serde_json::json!({ "id": job.id })))
}

/// Convert an inbound request into a [`RawRequest`]. The path is the target URL.
pub fn raw_request(method: &Method, uri: &Uri, headers: &HeaderMap, body: Bytes) -> RawRequest {
    let params: BTreeMap<String, String> = uri
        .query()
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            debug!(header = %name, "Skipping non-text header");
            continue;
        };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    RawRequest {
        method: method.as_str().to_string(),
        url: uri.path().trim_start_matches('/').to_string(),
        headers: collected,
        params,
        body: request_body(body),
    }
}

/// Inbound bodies are forwarded as the exact bytes received.
fn request_body(body: Bytes) -> Option<RequestBody> {
    if body.is_empty() {
        None
    } else {
        Some(RequestBody::Raw(body.to_vec()))
    }
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
