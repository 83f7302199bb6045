use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::OriginalUri;
use axum::http::{
    header::{HeaderName, ACCEPT, CONTENT_TYPE, ORIGIN},
    Request, StatusCode,
};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use once_cell::sync::Lazy;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::config::Config;
use crate::utils::clock::TokioClock;

pub mod messages;

pub use messages::MessageState;

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);
static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub fn router() -> Router {
    let cfg = Config::get();
    let state = MessageState {
        format: cfg.mock_stream_format,
        chunk_delay: cfg.mock_chunk_delay,
        clock: Arc::new(TokioClock),
    };
    router_with(state, &cfg.cors_origins)
}

pub fn router_with(state: MessageState, cors_origins: &[String]) -> Router {
    Lazy::force(&START_TIME);

    let allowed_headers = [
        ACCEPT,
        CONTENT_TYPE,
        ORIGIN,
        HeaderName::from_static("x-requested-with"),
        HeaderName::from_static("x-request-id"),
    ];

    let cors = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_headers(allowed_headers)
            .allow_methods(Any)
            .allow_credentials(false)
    } else {
        let origins = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect::<Vec<_>>();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_headers(allowed_headers)
            .allow_methods(Any)
            .allow_credentials(true)
    };

    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            let request_id = header_value(req, &REQUEST_ID_HEADER);
            info_span!(
                "http.request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
                request_id = %request_id
            )
        })
        .on_request(|_req: &Request<Body>, _span: &tracing::Span| {
            info!("request.start");
        })
        .on_response(
            |res: &Response, latency: std::time::Duration, _span: &tracing::Span| {
                info!(status = %res.status(), latency_ms = %latency.as_millis(), "request.end");
            },
        )
        .on_failure(|err, latency: std::time::Duration, _span: &tracing::Span| {
            tracing::error!(error = %err, latency_ms = %latency.as_millis(), "request.failure");
        });

    Router::new()
        .merge(messages::router(state))
        .route("/health", axum::routing::get(health))
        .route("/", axum::routing::get(root))
        .fallback(fallback_404)
        .layer(cors)
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER.clone()))
        .layer(SetRequestIdLayer::new(
            REQUEST_ID_HEADER.clone(),
            MakeRequestUuid,
        ))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": START_TIME.elapsed().as_secs_f64()
    }))
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "chat_stream_rs mock server",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Replays chat fixtures as NDJSON or concatenated JSON",
        "endpoints": {
            "health": "/health",
            "message": "/message"
        }
    }))
}

async fn fallback_404(uri: OriginalUri) -> impl IntoResponse {
    let path = uri.0.path().to_string();
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "message": "resource not found",
                "path": path
            }
        })),
    )
}

fn header_value(req: &Request<Body>, name: &HeaderName) -> String {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}
