//! Line-oriented wire codec
//!
//! Bridges raw socket bytes and protocol lines. Inbound, `LineDecoder`
//! buffers whatever a read produced and yields complete `\n`-terminated
//! lines, so frames split across reads reassemble transparently. Outbound,
//! `encode` renders one `ServerMessage` as exactly one terminated line.

use crate::error::DecodeError;
use crate::message::ServerMessage;

/// Cap on buffered bytes for a single inbound line.
///
/// A peer that streams this much without a newline is not speaking the
/// protocol; the connection is dropped rather than buffering unboundedly.
pub const MAX_LINE_LEN: usize = 8192;

/// Incremental decoder for newline-terminated UTF-8 lines
///
/// Feed it the bytes of each socket read, then drain completed lines with
/// [`LineDecoder::next_line`]. Trailing `\r` is trimmed and zero-length
/// segments are skipped (a bare `\r\n` or `\n` is a no-op, not an error).
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes from a socket read to the frame buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete line, if any.
    ///
    /// Returns `Ok(None)` when the buffer holds only a partial line.
    /// Invalid UTF-8 and over-long lines are unrecoverable: the caller
    /// must drop the connection.
    pub fn next_line(&mut self) -> Result<Option<String>, DecodeError> {
        loop {
            let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
                if self.buf.len() > MAX_LINE_LEN {
                    return Err(DecodeError::LineTooLong(MAX_LINE_LEN));
                }
                return Ok(None);
            };

            if pos > MAX_LINE_LEN {
                return Err(DecodeError::LineTooLong(MAX_LINE_LEN));
            }

            let mut segment: Vec<u8> = self.buf.drain(..=pos).collect();
            segment.pop(); // the '\n'
            if segment.last() == Some(&b'\r') {
                segment.pop();
            }
            if segment.is_empty() {
                continue;
            }

            let line = String::from_utf8(segment).map_err(|_| DecodeError::InvalidUtf8)?;
            return Ok(Some(line));
        }
    }
}

/// Render an outbound message as a single terminated wire line.
pub fn encode(msg: &ServerMessage) -> String {
    format!("{}\n", msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let mut dec = LineDecoder::new();
        dec.feed(b"hello\n");
        assert_eq!(dec.next_line().unwrap(), Some("hello".to_string()));
        assert_eq!(dec.next_line().unwrap(), None);
    }

    #[test]
    fn test_line_split_across_reads() {
        let mut dec = LineDecoder::new();
        dec.feed(b"/nick al");
        assert_eq!(dec.next_line().unwrap(), None);
        dec.feed(b"ice\n/join lo");
        assert_eq!(dec.next_line().unwrap(), Some("/nick alice".to_string()));
        assert_eq!(dec.next_line().unwrap(), None);
        dec.feed(b"bby\n");
        assert_eq!(dec.next_line().unwrap(), Some("/join lobby".to_string()));
    }

    #[test]
    fn test_multiple_lines_one_read() {
        let mut dec = LineDecoder::new();
        dec.feed(b"one\ntwo\nthree\n");
        assert_eq!(dec.next_line().unwrap(), Some("one".to_string()));
        assert_eq!(dec.next_line().unwrap(), Some("two".to_string()));
        assert_eq!(dec.next_line().unwrap(), Some("three".to_string()));
        assert_eq!(dec.next_line().unwrap(), None);
    }

    #[test]
    fn test_crlf_trimmed() {
        let mut dec = LineDecoder::new();
        dec.feed(b"hello\r\n");
        assert_eq!(dec.next_line().unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn test_empty_segments_skipped() {
        let mut dec = LineDecoder::new();
        dec.feed(b"\n\r\nhello\n\n");
        assert_eq!(dec.next_line().unwrap(), Some("hello".to_string()));
        assert_eq!(dec.next_line().unwrap(), None);
    }

    #[test]
    fn test_interior_cr_preserved() {
        let mut dec = LineDecoder::new();
        dec.feed(b"a\rb\n");
        assert_eq!(dec.next_line().unwrap(), Some("a\rb".to_string()));
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let mut dec = LineDecoder::new();
        dec.feed(&[0xff, 0xfe, b'\n']);
        assert_eq!(dec.next_line(), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn test_overlong_line_without_newline() {
        let mut dec = LineDecoder::new();
        dec.feed(&vec![b'a'; MAX_LINE_LEN + 1]);
        assert_eq!(dec.next_line(), Err(DecodeError::LineTooLong(MAX_LINE_LEN)));
    }

    #[test]
    fn test_overlong_completed_line() {
        let mut dec = LineDecoder::new();
        let mut data = vec![b'a'; MAX_LINE_LEN + 1];
        data.push(b'\n');
        dec.feed(&data);
        assert_eq!(dec.next_line(), Err(DecodeError::LineTooLong(MAX_LINE_LEN)));
    }

    #[test]
    fn test_encode_appends_newline() {
        assert_eq!(encode(&ServerMessage::Ok), "OK\n");
        assert_eq!(
            encode(&ServerMessage::Chat {
                from: "alice".to_string(),
                text: "hi".to_string()
            }),
            "MESSAGE alice hi\n"
        );
    }
}
