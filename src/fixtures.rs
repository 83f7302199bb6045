use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};

use crate::core::MessageEvent;
use crate::utils::clock::Clock;

/// Wire shape used when replaying fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// One object per line, no newline after the last one.
    Ndjson,
    /// Objects back to back with no separator.
    Concat,
}

impl StreamFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            StreamFormat::Ndjson => "application/x-ndjson",
            StreamFormat::Concat => "application/json",
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFormat::Ndjson => f.write_str("ndjson"),
            StreamFormat::Concat => f.write_str("concat"),
        }
    }
}

impl FromStr for StreamFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ndjson" | "lines" => Ok(StreamFormat::Ndjson),
            "concat" | "concatenated" => Ok(StreamFormat::Concat),
            other => Err(format!("unknown stream format: {other}")),
        }
    }
}

pub fn fixture_sequence() -> Vec<MessageEvent> {
    vec![
        MessageEvent::new("First chunk", "...", false),
        MessageEvent::new("Second chunk", "still thinking", false),
        MessageEvent::new("Final chunk", "", true),
    ]
}

pub fn echo_reply(message: &str) -> MessageEvent {
    MessageEvent::new(format!("Echo: {message}"), "", true)
}

/// Serializes events into the frames written to the body, one per chunk.
pub fn encode_frames(events: &[MessageEvent], format: StreamFormat) -> Vec<String> {
    let last = events.len().saturating_sub(1);
    events
        .iter()
        .enumerate()
        .map(|(idx, event)| {
            let mut frame = serde_json::to_string(event).unwrap_or_default();
            if format == StreamFormat::Ndjson && idx < last {
                frame.push('\n');
            }
            frame
        })
        .collect()
}

/// Replays frames as a body stream, sleeping `delay` before every frame but
/// the first.
pub fn replay_stream(
    frames: Vec<String>,
    delay: Duration,
    clock: Arc<dyn Clock>,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream::iter(frames.into_iter().enumerate()).then(move |(idx, frame)| {
        let clock = clock.clone();
        async move {
            if idx > 0 && !delay.is_zero() {
                clock.sleep(delay).await;
            }
            Ok::<_, Infallible>(Bytes::from(frame))
        }
    })
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;
    use crate::utils::clock::InstantClock;

    #[test]
    fn format_parses_aliases_and_rejects_unknown() {
        assert_eq!("NDJSON".parse::<StreamFormat>(), Ok(StreamFormat::Ndjson));
        assert_eq!(" concat ".parse::<StreamFormat>(), Ok(StreamFormat::Concat));
        assert!("sse".parse::<StreamFormat>().is_err());
        assert_eq!(StreamFormat::Concat.to_string(), "concat");
    }

    #[test]
    fn ndjson_frames_have_no_trailing_newline_on_last() {
        let frames = encode_frames(&fixture_sequence(), StreamFormat::Ndjson);
        assert_eq!(frames.len(), 3);
        assert!(frames[0].ends_with('\n'));
        assert!(frames[1].ends_with('\n'));
        assert!(frames[2].ends_with('}'));
    }

    #[test]
    fn concat_frames_have_no_separators() {
        let body = encode_frames(&fixture_sequence(), StreamFormat::Concat).concat();
        assert!(!body.contains('\n'));
        assert!(body.contains("}{"));
    }

    #[tokio::test]
    async fn replay_stream_yields_every_frame_in_order() {
        let frames = encode_frames(&fixture_sequence(), StreamFormat::Concat);
        let chunks: Vec<Bytes> = replay_stream(
            frames.clone(),
            Duration::from_secs(5),
            Arc::new(InstantClock),
        )
        .try_collect()
        .await
        .unwrap();

        let got: Vec<String> = chunks
            .iter()
            .map(|chunk| String::from_utf8(chunk.to_vec()).unwrap())
            .collect();
        assert_eq!(got, frames);
    }
}
