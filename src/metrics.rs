//! Per-route request counters and latency histograms, exposed on `/metrics`.

use std::time::Instant;

use anyhow::Context;
use axum::{
    extract::{MatchedPath, Request, State},
    http::header::CONTENT_TYPE,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

use crate::error::AppError;
use crate::state::AppState;

const UNMATCHED: &str = "unmatched";

pub struct ApiMetrics {
    registry: Registry,
    pub requests_total: CounterVec,
    pub request_duration_seconds: HistogramVec,
}

impl ApiMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Requests served, by route and status")
                .namespace("userhub"),
            &["method", "route", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "Request latency by route")
                .namespace("userhub")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "route"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
        })
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .context("encode metrics")?;
        String::from_utf8(buf).context("metrics are not utf-8")
    }
}

/// Labels by route template rather than raw path, so tokens in
/// `/v1/user/self/verify/:token` never become label values.
pub async fn track_requests(State(st): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED.to_owned());

    let res = next.run(req).await;

    let status = res.status().as_u16().to_string();
    st.metrics
        .requests_total
        .with_label_values(&[&method, &route, &status])
        .inc();
    st.metrics
        .request_duration_seconds
        .with_label_values(&[&method, &route])
        .observe(start.elapsed().as_secs_f64());
    res
}

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(scrape))
}

async fn scrape(State(st): State<AppState>) -> Result<Response, AppError> {
    let body = st.metrics.render()?;
    Ok(([(CONTENT_TYPE, TextEncoder::new().format_type().to_owned())], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_recorded_series() {
        let m = ApiMetrics::new().unwrap();
        m.requests_total
            .with_label_values(&["GET", "/healthz", "200"])
            .inc();
        let text = m.render().unwrap();
        assert!(text.contains("userhub_http_requests_total"));
        assert!(text.contains("route=\"/healthz\""));
    }

    #[test]
    fn registries_are_independent() {
        let a = ApiMetrics::new().unwrap();
        let b = ApiMetrics::new().unwrap();
        a.requests_total.with_label_values(&["GET", "/x", "200"]).inc();
        assert_eq!(b.requests_total.with_label_values(&["GET", "/x", "200"]).get(), 0.0);
    }
}
