//! Frame types with line encoding.
//!
//! [`ServerFrame`] covers everything the server emits, [`ClientFrame`] the
//! single thing a client sends. Encoding produces the exact bytes written to
//! the socket, including the trailing newline, so one frame is always handed
//! to the writer as one contiguous buffer.
//!
//! # Example
//!
//! ```
//! use quizwire::protocol::{ClientFrame, ServerFrame};
//!
//! let frame = ServerFrame::Options(vec!["3".into(), "4".into()]);
//! assert_eq!(&frame.encode()[..], b"OPTIONS:2\n3\n4\n");
//!
//! let answer = ClientFrame::decode("ANSWER:2").unwrap();
//! assert_eq!(answer, ClientFrame::Answer(2));
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::wire_format::{prefix, single_line, split_frame, verdict, LINE_TERMINATOR};

/// Recoverable frame-level problem.
///
/// The `Display` output doubles as the payload of the `ERROR` frame sent back
/// to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// A numeric field could not be parsed as an integer.
    #[error("Invalid {field} format")]
    InvalidNumber { field: &'static str, value: String },

    /// Answer names an option outside `[1, max]`.
    #[error("Answer out of range: choose an option between 1 and {max}")]
    OutOfRange { value: i64, max: usize },

    /// Line carries a prefix this side does not understand.
    #[error("Unknown frame: {0}")]
    UnknownPrefix(String),

    /// Line has no `PREFIX:` part.
    #[error("Missing frame prefix: {0}")]
    MissingSeparator(String),
}

/// Outcome of a single answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    /// Wrong answer; the correct option number is revealed.
    Incorrect { correct_option: usize },
}

/// Frames sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// Number of questions in the quiz.
    Total(usize),
    /// Prompt text of the current question.
    Question(String),
    /// Options of the current question, in order (1-indexed on the wire).
    Options(Vec<String>),
    /// Verdict for the last answer.
    Result(Verdict),
    /// Running score after `position` answered questions.
    Score { score: usize, position: usize },
    /// Human-readable completion summary.
    Finished(String),
    /// Human-readable error for a rejected answer.
    Error(String),
}

impl ServerFrame {
    /// Build the completion frame for a final score.
    pub fn finished(score: usize, total: usize) -> Self {
        ServerFrame::Finished(format!("Your final score is {} out of {}", score, total))
    }

    /// Build an error frame from a frame-level problem.
    pub fn error(err: &FrameError) -> Self {
        ServerFrame::Error(err.to_string())
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Encode into an existing buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            ServerFrame::Total(n) => put_line(buf, prefix::TOTAL, &n.to_string()),
            ServerFrame::Question(text) => put_line(buf, prefix::QUESTION, &single_line(text)),
            ServerFrame::Options(options) => {
                put_line(buf, prefix::OPTIONS, &options.len().to_string());
                for option in options {
                    buf.put_slice(single_line(option).as_bytes());
                    buf.put_u8(LINE_TERMINATOR);
                }
            }
            ServerFrame::Result(Verdict::Correct) => {
                put_line(buf, prefix::RESULT, verdict::CORRECT)
            }
            ServerFrame::Result(Verdict::Incorrect { correct_option }) => put_line(
                buf,
                prefix::RESULT,
                &format!("{}:{}", verdict::INCORRECT, correct_option),
            ),
            ServerFrame::Score { score, position } => {
                put_line(buf, prefix::SCORE, &format!("{}/{}", score, position))
            }
            ServerFrame::Finished(text) => put_line(buf, prefix::FINISHED, &single_line(text)),
            ServerFrame::Error(text) => put_line(buf, prefix::ERROR, &single_line(text)),
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerFrame::Total(_) => prefix::TOTAL,
            ServerFrame::Question(_) => prefix::QUESTION,
            ServerFrame::Options(_) => prefix::OPTIONS,
            ServerFrame::Result(_) => prefix::RESULT,
            ServerFrame::Score { .. } => prefix::SCORE,
            ServerFrame::Finished(_) => prefix::FINISHED,
            ServerFrame::Error(_) => prefix::ERROR,
        }
    }
}

/// Frames sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Chosen option number, not yet range-checked.
    Answer(i64),
    /// Any syntactically valid line that is not an answer.
    Other(String),
}

impl ClientFrame {
    /// Decode one inbound line (terminator already removed).
    ///
    /// A non-integer answer payload is a [`FrameError::InvalidNumber`];
    /// anything that is not an `ANSWER` frame decodes to [`ClientFrame::Other`].
    pub fn decode(line: &str) -> Result<Self, FrameError> {
        match split_frame(line) {
            Some((prefix::ANSWER, payload)) => {
                let payload = payload.trim();
                payload
                    .parse::<i64>()
                    .map(ClientFrame::Answer)
                    .map_err(|_| FrameError::InvalidNumber {
                        field: "answer",
                        value: payload.to_string(),
                    })
            }
            _ => Ok(ClientFrame::Other(line.to_string())),
        }
    }

    /// Encode into a fresh buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(16);
        match self {
            ClientFrame::Answer(n) => put_line(&mut buf, prefix::ANSWER, &n.to_string()),
            ClientFrame::Other(line) => {
                buf.put_slice(single_line(line).as_bytes());
                buf.put_u8(LINE_TERMINATOR);
            }
        }
        buf.freeze()
    }
}

/// Check an answer against the option count of the current question.
///
/// Returns the 1-indexed option number on success.
pub fn validate_answer(answer: i64, option_count: usize) -> Result<usize, FrameError> {
    match usize::try_from(answer) {
        Ok(n) if (1..=option_count).contains(&n) => Ok(n),
        _ => Err(FrameError::OutOfRange {
            value: answer,
            max: option_count,
        }),
    }
}

fn put_line(buf: &mut BytesMut, prefix: &str, payload: &str) {
    buf.reserve(prefix.len() + payload.len() + 2);
    buf.put_slice(prefix.as_bytes());
    buf.put_u8(b':');
    buf.put_slice(payload.as_bytes());
    buf.put_u8(LINE_TERMINATOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_simple_frames() {
        assert_eq!(&ServerFrame::Total(3).encode()[..], b"TOTAL:3\n");
        assert_eq!(
            &ServerFrame::Question("2+2=?".into()).encode()[..],
            b"QUESTION:2+2=?\n"
        );
        assert_eq!(
            &ServerFrame::Score { score: 2, position: 3 }.encode()[..],
            b"SCORE:2/3\n"
        );
    }

    #[test]
    fn test_encode_results() {
        assert_eq!(
            &ServerFrame::Result(Verdict::Correct).encode()[..],
            b"RESULT:CORRECT\n"
        );
        assert_eq!(
            &ServerFrame::Result(Verdict::Incorrect { correct_option: 2 }).encode()[..],
            b"RESULT:INCORRECT:2\n"
        );
    }

    #[test]
    fn test_encode_options_block() {
        let frame = ServerFrame::Options(vec!["3".into(), "4".into(), "5".into()]);
        assert_eq!(&frame.encode()[..], b"OPTIONS:3\n3\n4\n5\n");
    }

    #[test]
    fn test_encode_flattens_embedded_newlines() {
        let frame = ServerFrame::Question("line one\nline two".into());
        assert_eq!(&frame.encode()[..], b"QUESTION:line one line two\n");
    }

    #[test]
    fn test_finished_summary() {
        assert_eq!(
            ServerFrame::finished(1, 1),
            ServerFrame::Finished("Your final score is 1 out of 1".into())
        );
        assert_eq!(
            &ServerFrame::finished(0, 0).encode()[..],
            b"FINISHED:Your final score is 0 out of 0\n"
        );
    }

    #[test]
    fn test_decode_answer() {
        assert_eq!(ClientFrame::decode("ANSWER:2"), Ok(ClientFrame::Answer(2)));
        assert_eq!(ClientFrame::decode("ANSWER: 7 "), Ok(ClientFrame::Answer(7)));
        assert_eq!(ClientFrame::decode("ANSWER:-1"), Ok(ClientFrame::Answer(-1)));
    }

    #[test]
    fn test_decode_answer_not_a_number() {
        let err = ClientFrame::decode("ANSWER:two").unwrap_err();
        assert!(matches!(err, FrameError::InvalidNumber { field: "answer", .. }));
        assert_eq!(err.to_string(), "Invalid answer format");
    }

    #[test]
    fn test_decode_other_lines() {
        assert_eq!(
            ClientFrame::decode("HELLO:there"),
            Ok(ClientFrame::Other("HELLO:there".into()))
        );
        assert_eq!(ClientFrame::decode(""), Ok(ClientFrame::Other(String::new())));
        // Prefix match is exact and case-sensitive
        assert_eq!(
            ClientFrame::decode("answer:1"),
            Ok(ClientFrame::Other("answer:1".into()))
        );
    }

    #[test]
    fn test_client_encode() {
        assert_eq!(&ClientFrame::Answer(3).encode()[..], b"ANSWER:3\n");
    }

    #[test]
    fn test_validate_answer_range() {
        assert_eq!(validate_answer(1, 3), Ok(1));
        assert_eq!(validate_answer(3, 3), Ok(3));
        assert!(matches!(
            validate_answer(0, 3),
            Err(FrameError::OutOfRange { value: 0, max: 3 })
        ));
        assert!(validate_answer(4, 3).is_err());
        assert!(validate_answer(-2, 3).is_err());
    }

    #[test]
    fn test_out_of_range_message() {
        let err = validate_answer(9, 3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Answer out of range: choose an option between 1 and 3"
        );
    }
}
