use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::core::{decode_stream, EventCallback, MessageEvent, StreamDecoder};
use crate::utils::log_helpers::{log_dispatch_begin, log_dispatch_end, truncate_log};

use super::error::{DispatchError, TransportError};
use super::transport::{ChatTransport, ReqwestTransport, ResponseBody};

/// Outgoing chat message. `stream` is omitted from the body when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl SendMessageRequest {
    pub fn new(message: impl Into<String>, stream: bool) -> Self {
        Self {
            message: message.into(),
            stream: Some(stream),
        }
    }
}

#[derive(Clone)]
pub struct ChatDispatcher {
    transport: Arc<dyn ChatTransport>,
    base_url: String,
}

impl ChatDispatcher {
    pub fn new(transport: Arc<dyn ChatTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(cfg.request_timeout)?;
        Ok(Self::new(Arc::new(transport), cfg.chat_base_url.clone()))
    }

    pub fn endpoint(&self) -> String {
        format!("{}/message", self.base_url.trim_end_matches('/'))
    }

    /// Posts one message and decodes the reply, forwarding every decoded unit
    /// to `on_event`. Resolves with the last event of the response.
    pub async fn send_message(
        &self,
        request: SendMessageRequest,
        on_event: Option<EventCallback>,
    ) -> Result<MessageEvent, DispatchError> {
        let request_id = Uuid::new_v4();
        let url = self.endpoint();
        let payload = serde_json::to_value(&request)?;
        let started = Instant::now();

        log_dispatch_begin(&request_id, &url, request.stream, request.message.len());

        let resp = self.transport.post_json(&url, &payload).await.map_err(|err| {
            error!(request_id = %request_id, error = %err, "[DISPATCH] request failed");
            err
        })?;

        if !resp.is_success() {
            let status = resp.status;
            let body = match resp.body.into_text().await {
                Ok(text) => text,
                Err(err) => {
                    warn!(
                        request_id = %request_id,
                        status = status,
                        error = %err,
                        "[DISPATCH] failed to read error body"
                    );
                    String::new()
                }
            };
            let preview = truncate_log(&body, 2000);
            error!(
                request_id = %request_id,
                status = status,
                body = %preview,
                "[DISPATCH] non-success status"
            );
            return Err(DispatchError::Status { status, body });
        }

        let last = match resp.body {
            ResponseBody::Buffered(text) => StreamDecoder::decode_blob(&text, on_event),
            ResponseBody::Streaming(stream) => {
                decode_stream(stream, on_event).await.map_err(|err| {
                    error!(request_id = %request_id, error = %err, "[DISPATCH] stream read failed");
                    err
                })?
            }
        };

        log_dispatch_end(&request_id, &last, started.elapsed());
        info!(request_id = %request_id, done = last.done, "[DISPATCH] complete");
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::stream;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use super::*;
    use crate::services::transport::{TransportBoxFuture, TransportResponse};

    enum Reply {
        Buffered(&'static str),
        Chunks(Vec<&'static str>),
        FailingChunks(Vec<&'static str>),
        Status(u16, &'static str),
        StatusUnreadable(u16),
        Unreachable,
    }

    struct ScriptedTransport {
        reply: Mutex<Option<Reply>>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl ScriptedTransport {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().clone()
        }
    }

    fn byte_chunks(parts: Vec<&'static str>) -> Vec<Result<Bytes, TransportError>> {
        parts
            .into_iter()
            .map(|part| Ok(Bytes::from_static(part.as_bytes())))
            .collect()
    }

    impl ChatTransport for ScriptedTransport {
        fn post_json<'a>(
            &'a self,
            url: &'a str,
            body: &'a Value,
        ) -> TransportBoxFuture<'a, Result<TransportResponse, TransportError>> {
            Box::pin(async move {
                self.calls.lock().push((url.to_string(), body.clone()));
                let reply = self.reply.lock().take().expect("one call per script");
                let (status, body) = match reply {
                    Reply::Buffered(text) => (200, ResponseBody::Buffered(text.to_string())),
                    Reply::Chunks(parts) => {
                        (200, ResponseBody::streaming(stream::iter(byte_chunks(parts))))
                    }
                    Reply::FailingChunks(parts) => {
                        let mut items = byte_chunks(parts);
                        items.push(Err(TransportError::message("connection reset")));
                        (200, ResponseBody::streaming(stream::iter(items)))
                    }
                    Reply::Status(status, text) => (status, ResponseBody::Buffered(text.to_string())),
                    Reply::StatusUnreadable(status) => {
                        let items = vec![
                            Ok(Bytes::from_static(b"partial")),
                            Err(TransportError::message("connection reset")),
                        ];
                        (status, ResponseBody::streaming(stream::iter(items)))
                    }
                    Reply::Unreachable => {
                        return Err(TransportError::message("connection refused"));
                    }
                };
                Ok(TransportResponse { status, body })
            })
        }
    }

    fn recorder() -> (EventCallback, Arc<Mutex<Vec<MessageEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: EventCallback = Arc::new(move |event: &MessageEvent| {
            sink.lock().push(event.clone());
        });
        (callback, seen)
    }

    #[test]
    fn endpoint_trims_trailing_slashes() {
        let transport = ScriptedTransport::new(Reply::Unreachable);
        let dispatcher = ChatDispatcher::new(transport, "http://localhost:3001//");
        assert_eq!(dispatcher.endpoint(), "http://localhost:3001/message");
    }

    #[test]
    fn request_body_omits_unset_stream_flag() {
        let body = serde_json::to_value(SendMessageRequest {
            message: String::new(),
            stream: None,
        })
        .unwrap();
        assert_eq!(body, json!({"message": ""}));

        let body = serde_json::to_value(SendMessageRequest::new("hi", true)).unwrap();
        assert_eq!(body, json!({"message": "hi", "stream": true}));
    }

    #[tokio::test]
    async fn streaming_reply_forwards_events_and_returns_last() {
        let transport = ScriptedTransport::new(Reply::Chunks(vec![
            "{\"response\":\"Hel",
            "lo\",\"thinking\":\"\",\"done\":false}\n{\"respon",
            "se\":\"World\",\"thinking\":\"\",\"done\":true}",
        ]));
        let dispatcher = ChatDispatcher::new(transport.clone(), "http://chat.local");
        let (callback, seen) = recorder();

        let last = dispatcher
            .send_message(SendMessageRequest::new("hi", true), Some(callback))
            .await
            .expect("send should succeed");

        assert_eq!(last, MessageEvent::new("World", "", true));
        assert_eq!(seen.lock().len(), 2);
        assert_eq!(
            transport.calls(),
            vec![(
                "http://chat.local/message".to_string(),
                json!({"message": "hi", "stream": true})
            )]
        );
    }

    #[tokio::test]
    async fn buffered_reply_uses_blob_path() {
        let transport = ScriptedTransport::new(Reply::Buffered(
            "{\"response\":\"whole\",\"thinking\":\"\",\"done\":true}",
        ));
        let dispatcher = ChatDispatcher::new(transport, "http://chat.local");
        let (callback, seen) = recorder();

        let last = dispatcher
            .send_message(SendMessageRequest::new("", false), Some(callback))
            .await
            .unwrap();

        assert_eq!(last, MessageEvent::new("whole", "", true));
        assert_eq!(*seen.lock(), vec![last]);
    }

    #[tokio::test]
    async fn streaming_flag_does_not_change_decoding_of_streamed_body() {
        let transport = ScriptedTransport::new(Reply::Chunks(vec![
            "{\"response\":\"a\",\"done\":false}{\"response\":\"b\"}",
        ]));
        let dispatcher = ChatDispatcher::new(transport, "http://chat.local");
        let (callback, seen) = recorder();

        let last = dispatcher
            .send_message(SendMessageRequest::new("x", false), Some(callback))
            .await
            .unwrap();

        assert_eq!(last, MessageEvent::new("b", "", true));
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error_with_body() {
        let transport = ScriptedTransport::new(Reply::Status(503, "overloaded"));
        let dispatcher = ChatDispatcher::new(transport, "http://chat.local");

        let err = dispatcher
            .send_message(SendMessageRequest::new("x", true), None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "status 503: overloaded");
    }

    #[tokio::test]
    async fn unreadable_error_body_still_reports_status() {
        let transport = ScriptedTransport::new(Reply::StatusUnreadable(500));
        let dispatcher = ChatDispatcher::new(transport, "http://chat.local");

        let err = dispatcher
            .send_message(SendMessageRequest::new("x", true), None)
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            DispatchError::Status { status: 500, body } if body.is_empty()
        ));
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn connection_failure_propagates() {
        let transport = ScriptedTransport::new(Reply::Unreachable);
        let dispatcher = ChatDispatcher::new(transport, "http://chat.local");

        let err = dispatcher
            .send_message(SendMessageRequest::new("x", true), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Transport(_)));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn mid_stream_read_failure_propagates_after_partial_events() {
        let transport = ScriptedTransport::new(Reply::FailingChunks(vec![
            "{\"response\":\"partial\",\"done\":false}\n",
        ]));
        let dispatcher = ChatDispatcher::new(transport, "http://chat.local");
        let (callback, seen) = recorder();

        let err = dispatcher
            .send_message(SendMessageRequest::new("x", true), Some(callback))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Transport(TransportError::Message(_))));
        assert_eq!(*seen.lock(), vec![MessageEvent::new("partial", "", false)]);
    }
}
