//! Control module - JSON status lines on stdout.
//!
//! The TCP listener is the data plane; stdout is a side channel for any
//! presentation layer that wants to follow the server without scraping logs.
//! Logs always go to stderr so stdout stays machine-readable.
//!
//! # Example
//!
//! ```ignore
//! use quizwire::control::{build_status_message, write_stdout_line};
//!
//! let msg = build_status_message(&server.status_report())?;
//! write_stdout_line(&msg)?;
//! ```

mod status;
mod stdio;

pub use status::{build_status_message, ServerStatus, StatusReport, PROTOCOL_VERSION};
pub use stdio::{write_stdout_json, write_stdout_line};
