use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_LENGTH, PRAGMA, TRANSFER_ENCODING},
        HeaderMap, HeaderValue, StatusCode,
    },
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, error};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
}

fn has_payload(headers: &HeaderMap, body: &Bytes) -> bool {
    let declared_len = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|n| n > 0);
    let chunked = headers
        .get(TRANSFER_ENCODING)
        .is_some_and(|v| v != "identity");
    declared_len || chunked || !body.is_empty()
}

/// Empty-bodied liveness probe that also checks the credential store.
pub async fn healthz(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if query.is_some_and(|q| !q.is_empty()) || has_payload(&headers, &body) {
        return StatusCode::BAD_REQUEST;
    }

    match state.users.ping().await {
        Ok(()) => {
            debug!("health check ok");
            StatusCode::OK
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
