//! Client-side decoder for server frames.
//!
//! Most server frames are one line, but `OPTIONS:<n>` announces `n` raw
//! option lines that follow. The decoder is a small state machine:
//! - `Idle`: the next line is a prefixed frame
//! - `CollectingOptions`: still owed `remaining` option lines
//!
//! At end-of-stream, [`ServerFrameDecoder::finish`] yields a truncated
//! Options frame if a block was cut short.

use super::frame::{FrameError, ServerFrame, Verdict};
use super::wire_format::{prefix, split_frame, verdict};

/// Options reserved up front; the announced count comes from the peer.
const OPTIONS_PREALLOC: usize = 16;

#[derive(Debug, Clone)]
enum State {
    Idle,
    CollectingOptions { remaining: usize, options: Vec<String> },
}

/// Incremental decoder turning server lines into [`ServerFrame`]s.
#[derive(Debug)]
pub struct ServerFrameDecoder {
    state: State,
}

impl ServerFrameDecoder {
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Feed one line (terminator removed).
    ///
    /// Returns `Ok(None)` while an Options block is still being collected.
    pub fn push_line(&mut self, line: &str) -> Result<Option<ServerFrame>, FrameError> {
        match &mut self.state {
            State::CollectingOptions { remaining, options } => {
                options.push(line.to_string());
                *remaining -= 1;
                if *remaining == 0 {
                    let options = std::mem::take(options);
                    self.state = State::Idle;
                    return Ok(Some(ServerFrame::Options(options)));
                }
                Ok(None)
            }
            State::Idle => self.decode_prefixed(line),
        }
    }

    /// Flush state at end-of-stream.
    ///
    /// An interrupted Options block is returned with the options received so far.
    pub fn finish(&mut self) -> Option<ServerFrame> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::CollectingOptions { options, .. } => Some(ServerFrame::Options(options)),
            State::Idle => None,
        }
    }

    /// Whether the decoder is in the middle of an Options block.
    pub fn is_collecting(&self) -> bool {
        matches!(self.state, State::CollectingOptions { .. })
    }

    fn decode_prefixed(&mut self, line: &str) -> Result<Option<ServerFrame>, FrameError> {
        let (kind, payload) =
            split_frame(line).ok_or_else(|| FrameError::MissingSeparator(line.to_string()))?;

        let frame = match kind {
            prefix::TOTAL => ServerFrame::Total(parse_count("total", payload)?),
            prefix::QUESTION => ServerFrame::Question(payload.to_string()),
            prefix::OPTIONS => {
                let count = parse_count("options", payload)?;
                if count == 0 {
                    ServerFrame::Options(Vec::new())
                } else {
                    self.state = State::CollectingOptions {
                        remaining: count,
                        options: Vec::with_capacity(count.min(OPTIONS_PREALLOC)),
                    };
                    return Ok(None);
                }
            }
            prefix::RESULT => ServerFrame::Result(parse_verdict(payload)?),
            prefix::SCORE => {
                let (score, position) = payload
                    .split_once('/')
                    .ok_or_else(|| invalid("score", payload))?;
                ServerFrame::Score {
                    score: parse_count("score", score)?,
                    position: parse_count("score", position)?,
                }
            }
            prefix::FINISHED => ServerFrame::Finished(payload.to_string()),
            prefix::ERROR => ServerFrame::Error(payload.to_string()),
            other => return Err(FrameError::UnknownPrefix(other.to_string())),
        };
        Ok(Some(frame))
    }
}

impl Default for ServerFrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_verdict(payload: &str) -> Result<Verdict, FrameError> {
    if payload == verdict::CORRECT {
        return Ok(Verdict::Correct);
    }
    match split_frame(payload) {
        Some((verdict::INCORRECT, n)) => Ok(Verdict::Incorrect {
            correct_option: parse_count("result", n)?,
        }),
        _ => Err(invalid("result", payload)),
    }
}

fn parse_count(field: &'static str, value: &str) -> Result<usize, FrameError> {
    value.trim().parse().map_err(|_| invalid(field, value))
}

fn invalid(field: &'static str, value: &str) -> FrameError {
    FrameError::InvalidNumber {
        field,
        value: value.to_string(),
    }
}
