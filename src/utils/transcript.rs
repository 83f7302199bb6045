use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::core::{EventCallback, MessageEvent};

/// Terminal rendering of one assistant reply.
///
/// The first event inserts the reply line, later events append to it. A failed
/// send appends an error marker to whatever was rendered so far.
pub struct Transcript<W: Write + Send> {
    out: W,
    inserted: bool,
    rendered: String,
}

impl<W: Write + Send> Transcript<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            inserted: false,
            rendered: String::new(),
        }
    }

    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn apply(&mut self, event: &MessageEvent) {
        if !event.thinking.is_empty() {
            debug!(thinking = %event.thinking, "[TRANSCRIPT] thinking");
        }
        if !self.inserted {
            self.inserted = true;
            self.write("assistant: ");
        }
        self.rendered.push_str(&event.response);
        self.write(&event.response);
    }

    pub fn mark_error(&mut self, message: &str) {
        if !self.inserted {
            self.inserted = true;
            self.write("assistant: ");
        }
        let marker = format!(" [error: {message}]");
        self.rendered.push_str(&marker);
        self.write(&marker);
    }

    pub fn finish(&mut self) {
        if self.inserted {
            self.write("\n");
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(err) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            warn!(error = %err, "[TRANSCRIPT] write failed");
        }
    }
}

/// Wraps a shared transcript as a decoder callback.
pub fn transcript_callback<W>(transcript: Arc<Mutex<Transcript<W>>>) -> EventCallback
where
    W: Write + Send + 'static,
{
    Arc::new(move |event: &MessageEvent| {
        transcript.lock().apply(event);
    })
}
