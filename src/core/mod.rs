pub mod brace_scan;
pub mod message_event;
pub mod stream_decoder;
pub mod utf8;

pub use message_event::{DecodedUnit, EventCallback, MessageEvent};
pub use stream_decoder::{decode_stream, StreamDecoder};
