//! Protocol module - line wire format, framing, and frame types.
//!
//! This module implements the text protocol spoken between a quiz server
//! and its clients:
//! - `PREFIX:payload` line format and constants
//! - Line buffer for accumulating partial reads
//! - Typed server/client frames with encoding
//! - Client-side decoder for multi-line Options blocks

mod decoder;
mod frame;
mod line_buffer;
mod wire_format;

pub use decoder::ServerFrameDecoder;
pub use frame::{validate_answer, ClientFrame, FrameError, ServerFrame, Verdict};
pub use line_buffer::{LineBuffer, LineReader};
pub use wire_format::{
    prefix, single_line, split_frame, strip_cr, verdict, LINE_TERMINATOR, MAX_LINE_LENGTH,
    SEPARATOR,
};
