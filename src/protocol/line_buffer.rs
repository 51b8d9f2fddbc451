//! Line buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` so complete lines are split off without copying the
//! remainder. Socket reads arrive in arbitrary chunks; the buffer holds the
//! unfinished tail until the next newline shows up.
//!
//! # Example
//!
//! ```
//! use quizwire::protocol::LineBuffer;
//!
//! let mut buffer = LineBuffer::new();
//! assert!(buffer.push(b"ANSW").unwrap().is_empty());
//!
//! let lines = buffer.push(b"ER:2\nANSWER:3\n").unwrap();
//! assert_eq!(lines, vec!["ANSWER:2".to_string(), "ANSWER:3".to_string()]);
//! ```

use std::collections::VecDeque;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::wire_format::{strip_cr, LINE_TERMINATOR, MAX_LINE_LENGTH};
use crate::error::{QuizError, Result};

/// Size of a single socket read.
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Buffer for accumulating incoming bytes and extracting complete lines.
pub struct LineBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Bytes already scanned for a terminator.
    scanned: usize,
    /// Maximum allowed line length.
    max_line_length: usize,
}

impl LineBuffer {
    /// Create a new line buffer with the default line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Create a new line buffer with a custom line limit.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            scanned: 0,
            max_line_length,
        }
    }

    /// Push data into the buffer and extract all complete lines.
    ///
    /// Line terminators (and a preceding `\r`) are removed. Invalid UTF-8 is
    /// replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`QuizError::LineTooLong`] once the unterminated tail grows
    /// past the limit.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(line) = self.try_extract_one()? {
            lines.push(line);
        }
        Ok(lines)
    }

    /// Try to extract a single line from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(line))` if a complete line was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the pending line is over the limit
    pub fn try_extract_one(&mut self) -> Result<Option<String>> {
        let unscanned = &self.buffer[self.scanned..];
        match unscanned.iter().position(|b| *b == LINE_TERMINATOR) {
            Some(offset) => {
                let end = self.scanned + offset;
                if end > self.max_line_length {
                    return Err(QuizError::LineTooLong {
                        limit: self.max_line_length,
                    });
                }

                let raw = self.buffer.split_to(end + 1);
                self.scanned = 0;

                let text = String::from_utf8_lossy(&raw[..end]);
                Ok(Some(strip_cr(&text).to_string()))
            }
            None => {
                self.scanned = self.buffer.len();
                if self.buffer.len() > self.max_line_length {
                    return Err(QuizError::LineTooLong {
                        limit: self.max_line_length,
                    });
                }
                Ok(None)
            }
        }
    }

    /// Take whatever unterminated text is left (used at end-of-stream).
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let raw = self.buffer.split();
        self.scanned = 0;
        let text = String::from_utf8_lossy(&raw);
        Some(strip_cr(&text).to_string())
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Async line reader over any byte stream.
///
/// An unterminated tail at end-of-stream is returned as a final line.
pub struct LineReader<R> {
    inner: R,
    buffer: LineBuffer,
    ready: VecDeque<String>,
    chunk: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_line_length(inner, MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(inner: R, max_line_length: usize) -> Self {
        Self {
            inner,
            buffer: LineBuffer::with_max_line_length(max_line_length),
            ready: VecDeque::new(),
            chunk: vec![0u8; READ_CHUNK_SIZE],
            eof: false,
        }
    }

    /// Read the next line.
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(None);
            }

            let n = self.inner.read(&mut self.chunk).await?;
            if n == 0 {
                self.eof = true;
                return Ok(self.buffer.take_remainder());
            }
            self.ready.extend(self.buffer.push(&self.chunk[..n])?);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_line() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"ANSWER:1\n").unwrap();

        assert_eq!(lines, vec!["ANSWER:1"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_lines_in_one_push() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"a\nb\nc\n").unwrap();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_fragmented_line() {
        let mut buffer = LineBuffer::new();

        assert!(buffer.push(b"ANS").unwrap().is_empty());
        assert!(buffer.push(b"WER:").unwrap().is_empty());
        assert_eq!(buffer.len(), 7);

        let lines = buffer.push(b"4\nQUES").unwrap();
        assert_eq!(lines, vec!["ANSWER:4"]);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_crlf_stripped() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"ANSWER:2\r\n").unwrap();
        assert_eq!(lines, vec!["ANSWER:2"]);
    }

    #[test]
    fn test_empty_lines_preserved() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(b"\n\nx\n").unwrap();
        assert_eq!(lines, vec!["", "", "x"]);
    }

    #[test]
    fn test_line_too_long_without_terminator() {
        let mut buffer = LineBuffer::with_max_line_length(8);
        let err = buffer.push(b"0123456789").unwrap_err();
        assert!(matches!(err, QuizError::LineTooLong { limit: 8 }));
    }

    #[test]
    fn test_line_too_long_with_terminator() {
        let mut buffer = LineBuffer::with_max_line_length(4);
        assert!(buffer.push(b"12345\n").is_err());
    }

    #[test]
    fn test_line_at_limit_accepted() {
        let mut buffer = LineBuffer::with_max_line_length(4);
        assert_eq!(buffer.push(b"1234\n").unwrap(), vec!["1234"]);
    }

    #[test]
    fn test_take_remainder() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"done\npartial").unwrap();

        assert_eq!(buffer.take_remainder(), Some("partial".to_string()));
        assert_eq!(buffer.take_remainder(), None);
    }

    #[test]
    fn test_invalid_utf8_replaced() {
        let mut buffer = LineBuffer::new();
        let lines = buffer.push(&[b'A', 0xFF, b'\n']).unwrap();
        assert_eq!(lines, vec!["A\u{FFFD}"]);
    }

    #[tokio::test]
    async fn test_line_reader_across_chunks() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = LineReader::new(rx);

        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            tx.write_all(b"ANSWER").await.unwrap();
            tx.write_all(b":1\nANSWER:2\ntail").await.unwrap();
        });

        assert_eq!(reader.next_line().await.unwrap(), Some("ANSWER:1".into()));
        assert_eq!(reader.next_line().await.unwrap(), Some("ANSWER:2".into()));
        assert_eq!(reader.next_line().await.unwrap(), Some("tail".into()));
        assert_eq!(reader.next_line().await.unwrap(), None);
        assert_eq!(reader.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_reader_rejects_long_line() {
        let data: &[u8] = b"0123456789\n";
        let mut reader = LineReader::with_max_line_length(data, 4);
        assert!(matches!(
            reader.next_line().await,
            Err(QuizError::LineTooLong { limit: 4 })
        ));
    }

    #[test]
    fn test_clear() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"abc").unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.push(b"x\n").unwrap(), vec!["x"]);
    }
}
