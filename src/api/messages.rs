use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::fixtures::{echo_reply, encode_frames, fixture_sequence, replay_stream, StreamFormat};
use crate::utils::clock::Clock;

#[derive(Clone)]
pub struct MessageState {
    pub format: StreamFormat,
    pub chunk_delay: Duration,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Deserialize)]
struct MessageRequest {
    message: Option<String>,
    stream: Option<bool>,
}

pub fn router(state: MessageState) -> Router {
    Router::new()
        .route("/message", post(post_message))
        .with_state(state)
}

async fn post_message(
    State(state): State<MessageState>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let message = req.message.unwrap_or_default();
    let stream = req.stream.unwrap_or(false);
    info!(
        "[MOCK] message: len={}, stream={}, format={}",
        message.len(),
        stream,
        state.format
    );

    if !stream {
        return Json(echo_reply(&message)).into_response();
    }

    let frames = encode_frames(&fixture_sequence(), state.format);
    let body = Body::from_stream(replay_stream(frames, state.chunk_delay, state.clock.clone()));
    match Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, state.format.content_type())
        .body(body)
    {
        Ok(resp) => resp,
        Err(err) => {
            error!("[MOCK] build stream response failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": err.to_string()})),
            )
                .into_response()
        }
    }
}
