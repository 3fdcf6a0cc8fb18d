// src/exec/line_buffer.rs

//! Partial-line accumulator for process output.

/// Accumulates raw bytes and yields only complete, `\n`-terminated lines.
///
/// Splitting happens on bytes so that a multi-byte UTF-8 sequence cut across
/// two reads is reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return every line completed by them, without the
    /// terminator and with trailing whitespace (including `\r`) removed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = bytes;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.partial.extend_from_slice(&rest[..pos]);
            let line = String::from_utf8_lossy(&self.partial).trim_end().to_string();
            lines.push(line);
            self.partial.clear();
            rest = &rest[pos + 1..];
        }

        self.partial.extend_from_slice(rest);
        lines
    }

    /// Number of bytes held for a line that has not been terminated yet.
    pub fn pending_len(&self) -> usize {
        self.partial.len()
    }

    /// Drop any unterminated fragment. Returns how many bytes were discarded.
    pub fn discard_partial(&mut self) -> usize {
        let n = self.partial.len();
        self.partial.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_then_rest_yields_one_line() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"partial").is_empty());
        assert_eq!(buf.pending_len(), 7);
        assert_eq!(buf.push(b"-line\n"), vec!["partial-line".to_string()]);
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn several_lines_in_one_chunk_keep_order() {
        let mut buf = LineBuffer::new();
        let lines = buf.push(b"one\r\ntwo\nthree");
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(buf.push(b"\n"), vec!["three"]);
    }

    #[test]
    fn empty_lines_are_reported() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"\n\n"), vec!["", ""]);
    }

    #[test]
    fn utf8_split_across_reads_is_reassembled() {
        let mut buf = LineBuffer::new();
        let text = "größe\n".as_bytes();
        assert!(buf.push(&text[..3]).is_empty());
        assert_eq!(buf.push(&text[3..]), vec!["größe"]);
    }

    #[test]
    fn unterminated_fragment_is_discarded_not_flushed() {
        let mut buf = LineBuffer::new();
        buf.push(b"no newline");
        assert_eq!(buf.discard_partial(), 10);
        assert!(buf.push(b"\n").iter().all(|l| l.is_empty()));
    }
}
