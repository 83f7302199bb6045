/// Transient state of one left-to-right scan over the decoder buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanState {
    pub brace_depth: usize,
    pub in_string: bool,
    pub escape: bool,
    pub start: Option<usize>,
}

impl ScanState {
    /// Advances over one byte. Returns `Some((start, idx))` when `idx` closes a
    /// top-level object opened at `start`.
    fn step(&mut self, idx: usize, byte: u8) -> Option<(usize, usize)> {
        if self.escape {
            self.escape = false;
            return None;
        }

        match byte {
            b'\\' => self.escape = true,
            b'"' => self.in_string = !self.in_string,
            b'{' if !self.in_string => {
                if self.brace_depth == 0 {
                    self.start = Some(idx);
                }
                self.brace_depth += 1;
            }
            // stray closers at depth 0 are ignored
            b'}' if !self.in_string && self.brace_depth > 0 => {
                self.brace_depth -= 1;
                if self.brace_depth == 0 {
                    return self.start.take().map(|start| (start, idx));
                }
            }
            _ => {}
        }
        None
    }
}

/// Finds the first complete top-level JSON object in `buffer`.
///
/// Returns the byte range `start..=end` of the object. Only ASCII bytes drive
/// the state machine, so both indices always sit on char boundaries.
pub fn find_complete_object(buffer: &str) -> Option<(usize, usize)> {
    let mut state = ScanState::default();
    buffer
        .bytes()
        .enumerate()
        .find_map(|(idx, byte)| state.step(idx, byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(buffer: &str) -> Option<&str> {
        find_complete_object(buffer).map(|(start, end)| &buffer[start..=end])
    }

    #[test]
    fn finds_first_object_in_concatenated_input() {
        assert_eq!(span("{\"a\":1}{\"b\":2}"), Some("{\"a\":1}"));
    }

    #[test]
    fn nested_objects_do_not_close_early() {
        assert_eq!(
            span("{\"a\":{\"b\":{}}}tail"),
            Some("{\"a\":{\"b\":{}}}")
        );
    }

    #[test]
    fn braces_and_escaped_quotes_inside_strings_are_ignored() {
        let input = r#"{"response":"a } \" { b","done":true}{"x":1}"#;
        assert_eq!(span(input), Some(r#"{"response":"a } \" { b","done":true}"#));
    }

    #[test]
    fn escaped_backslash_before_quote_closes_string() {
        let input = r#"{"response":"path\\"}"#;
        assert_eq!(span(input), Some(input));
    }

    #[test]
    fn incomplete_object_yields_nothing() {
        assert_eq!(span("{\"response\":\"Hel"), None);
        assert_eq!(span("plain text"), None);
    }

    #[test]
    fn leading_noise_and_stray_closers_are_skipped() {
        assert_eq!(span("} junk {\"a\":1}"), Some("{\"a\":1}"));
    }

    #[test]
    fn multibyte_text_keeps_char_boundaries() {
        let input = "é{\"response\":\"世界\"}";
        assert_eq!(span(input), Some("{\"response\":\"世界\"}"));
    }
}
