use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, error};

use super::brace_scan::find_complete_object;
use super::message_event::{DecodedUnit, EventCallback, MessageEvent};
use super::utf8::Utf8StreamDecoder;

/// Incremental decoder for one chat response body.
///
/// Accepts NDJSON and back-to-back JSON objects. Each complete line is decoded
/// first, then whatever remains is brace-scanned for complete objects. Units
/// that are not JSON pass through as raw text.
pub struct StreamDecoder {
    buffer: String,
    utf8: Utf8StreamDecoder,
    callback: Option<EventCallback>,
    last_event: Option<MessageEvent>,
    emitted: usize,
}

impl StreamDecoder {
    pub fn new(callback: Option<EventCallback>) -> Self {
        Self {
            buffer: String::new(),
            utf8: Utf8StreamDecoder::new(),
            callback,
            last_event: None,
            emitted: 0,
        }
    }

    /// Decodes a whole body that was never streamed.
    ///
    /// A body that is a bare JSON string is unwrapped to its contents.
    pub fn decode_blob(text: &str, callback: Option<EventCallback>) -> MessageEvent {
        let mut decoder = Self::new(callback);
        match serde_json::from_str::<Value>(text) {
            Ok(Value::String(unwrapped)) => decoder.emit(MessageEvent::raw(unwrapped)),
            _ => decoder.emit_unit(text),
        }
        decoder.last_event.unwrap_or_default()
    }

    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn last_event(&self) -> Option<&MessageEvent> {
        self.last_event.as_ref()
    }

    pub fn push_bytes(&mut self, chunk: &[u8]) {
        let text = self.utf8.decode(chunk);
        self.push_text(&text);
    }

    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.buffer.push_str(text);
        self.drain_lines();
        self.drain_objects();
    }

    /// Handles leftovers once the transport reports end of stream and returns
    /// the last decoded event.
    pub fn finish(mut self) -> MessageEvent {
        let tail = self.utf8.finish();
        self.buffer.push_str(&tail);

        let leftover = std::mem::take(&mut self.buffer);
        let leftover = leftover.trim();
        if !leftover.is_empty() {
            debug!(len = leftover.len(), "[DECODER] decoding leftover");
            let segments: Vec<&str> = leftover
                .split('\n')
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .collect();
            if segments.len() > 1 {
                for segment in segments {
                    self.emit_unit(segment);
                }
            } else {
                self.emit_unit(leftover);
            }
        }

        self.last_event.unwrap_or_default()
    }

    fn drain_lines(&mut self) {
        while let Some(idx) = self.buffer.find('\n') {
            let line = self.buffer[..idx].trim().to_string();
            self.buffer.drain(..=idx);
            if !line.is_empty() {
                self.emit_unit(&line);
            }
        }
    }

    fn drain_objects(&mut self) {
        // rescans from the start after every match since the buffer shifted
        while let Some((start, end)) = find_complete_object(&self.buffer) {
            let candidate = self.buffer[start..=end].to_string();
            self.buffer.drain(..=end);
            self.emit_unit(&candidate);
        }
    }

    fn emit_unit(&mut self, candidate: &str) {
        let unit = DecodedUnit::parse(candidate);
        if !unit.is_structured() {
            debug!(len = candidate.len(), "[DECODER] unit is not JSON, passing through raw text");
        }
        self.emit(unit.into_event());
    }

    fn emit(&mut self, event: MessageEvent) {
        self.emitted += 1;
        if let Some(callback) = &self.callback {
            invoke_callback(callback, &event);
        }
        self.last_event = Some(event);
    }
}

fn invoke_callback(callback: &EventCallback, event: &MessageEvent) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
        error!(
            panic = %panic_message(payload.as_ref()),
            "[DECODER] event callback panicked, continuing with next unit"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}

/// Drives a [`StreamDecoder`] over a chunk stream until it ends.
///
/// A read error aborts decoding and is returned as is.
pub async fn decode_stream<S, E>(
    mut stream: S,
    callback: Option<EventCallback>,
) -> Result<MessageEvent, E>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let mut decoder = StreamDecoder::new(callback);

    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        decoder.push_bytes(&bytes);
    }

    Ok(decoder.finish())
}
