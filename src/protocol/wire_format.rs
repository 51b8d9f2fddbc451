//! Wire format constants for the line protocol.
//!
//! Every frame is a single `\n`-terminated text line of the form
//! `PREFIX:payload`. The only exception is the Options block, where the
//! `OPTIONS:<count>` line is followed by `count` raw option lines.
//!
//! ```text
//! server -> client          client -> server
//! TOTAL:3                   ANSWER:2
//! QUESTION:2+2=?
//! OPTIONS:3
//! 3
//! 4
//! 5
//! RESULT:CORRECT
//! SCORE:1/1
//! ```

/// Separator between frame prefix and payload.
pub const SEPARATOR: char = ':';

/// Line terminator written after every line.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Maximum accepted inbound line length in bytes (excluding the terminator).
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// Frame prefixes.
pub mod prefix {
    pub const TOTAL: &str = "TOTAL";
    pub const QUESTION: &str = "QUESTION";
    pub const OPTIONS: &str = "OPTIONS";
    pub const ANSWER: &str = "ANSWER";
    pub const RESULT: &str = "RESULT";
    pub const SCORE: &str = "SCORE";
    pub const FINISHED: &str = "FINISHED";
    pub const ERROR: &str = "ERROR";
}

/// Result payload keywords.
pub mod verdict {
    pub const CORRECT: &str = "CORRECT";
    pub const INCORRECT: &str = "INCORRECT";
}

/// Split a line into `(prefix, payload)` at the first separator.
///
/// Returns `None` if the line has no separator.
#[inline]
pub fn split_frame(line: &str) -> Option<(&str, &str)> {
    line.split_once(SEPARATOR)
}

/// Strip a single trailing `\r` left by CRLF peers.
#[inline]
pub fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Flatten embedded line breaks so a payload always stays on one line.
pub fn single_line(text: &str) -> String {
    if text.contains(['\n', '\r']) {
        text.replace(['\n', '\r'], " ")
    } else {
        text.to_string()
    }
}
