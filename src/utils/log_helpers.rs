use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use crate::core::MessageEvent;

pub fn truncate_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }

    let mut cut = max_len;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = value[..cut].to_string();
    out.push_str("...[truncated]");
    out
}

pub fn log_dispatch_begin(request_id: &Uuid, url: &str, stream: Option<bool>, message_len: usize) {
    info!(
        "[DISPATCH] begin: request={}, url={}, stream={}, messageLen={}",
        request_id,
        url,
        stream.map(|s| s.to_string()).unwrap_or_else(|| "(unset)".to_string()),
        message_len
    );
}

pub fn log_dispatch_end(request_id: &Uuid, last: &MessageEvent, elapsed: Duration) {
    info!(
        "[DISPATCH] end: request={}, done={}, lastResponse={}, elapsedMs={}",
        request_id,
        last.done,
        truncate_log(&last.response, 200),
        elapsed.as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::truncate_log;

    #[test]
    fn truncate_log_adds_suffix_when_exceeding_limit() {
        assert_eq!(truncate_log("abcdefgh", 4), "abcd...[truncated]");
        assert_eq!(truncate_log("abc", 4), "abc");
    }

    #[test]
    fn truncate_log_backs_off_to_char_boundary() {
        assert_eq!(truncate_log("世界", 4), "世...[truncated]");
    }
}
