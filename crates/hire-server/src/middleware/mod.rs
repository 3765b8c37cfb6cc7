//! HTTP middleware: CORS and per-request tracing spans

use axum::http::{header, HeaderValue, Method, Request};
use std::time::Duration;
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer},
    LatencyUnit,
};
use tracing::{Level, Span};
use uuid::Uuid;

use crate::config::CorsConfig;

const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// CORS for browser clients uploading files and reading reports
///
/// `*` (or no origins at all) allows any origin. Credentials are only
/// allowed together with an explicit origin list.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
        .max_age(CORS_MAX_AGE);

    match explicit_origins(&config.allowed_origins) {
        None => layer.allow_origin(AllowOrigin::any()),
        Some(origins) => layer
            .allow_origin(origins)
            .allow_credentials(config.allow_credentials),
    }
}

/// Parsed origin list, or `None` when any origin is allowed
fn explicit_origins(configured: &[String]) -> Option<Vec<HeaderValue>> {
    if configured.is_empty() || configured.iter().any(|o| o == "*") {
        return None;
    }

    let origins = configured
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            },
        })
        .collect();
    Some(origins)
}

/// Opens an `http_request` span with a fresh request id, so every log line
/// of an upload (including the ingestion batch span) can be correlated
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestSpan;

impl<B> MakeSpan<B> for MakeRequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let content_length = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        tracing::info_span!(
            "http_request",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            path = %request.uri().path(),
            content_length,
        )
    }
}

pub type RequestTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    MakeRequestSpan,
    DefaultOnRequest,
    DefaultOnResponse,
>;

/// Request logging: one span per request, one event per response with latency in ms
pub fn tracing_layer() -> RequestTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(MakeRequestSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}
