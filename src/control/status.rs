//! Status message builder.
//!
//! A headless presentation layer learns about the server through one JSON
//! object per stdout line. The status message reports whether the listener
//! is running, where, and how many questions it serves.
//!
//! # Example
//!
//! ```
//! use quizwire::control::{build_status_message, ServerStatus, StatusReport};
//!
//! let report = StatusReport {
//!     status: ServerStatus::Running,
//!     address: Some("127.0.0.1:12345".into()),
//!     questions: 3,
//!     active_sessions: 0,
//! };
//! let json = build_status_message(&report).unwrap();
//! assert!(json.contains("\"status\":\"running\""));
//! ```

use serde::Serialize;
use serde_json::json;

use crate::error::Result;

/// Lifecycle state of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Running,
    Stopped,
}

/// Snapshot of the server for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: ServerStatus,
    pub address: Option<String>,
    pub questions: usize,
    pub active_sessions: usize,
}

/// Protocol version string.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Build the `$status` JSON line for a report.
pub fn build_status_message(report: &StatusReport) -> Result<String> {
    let msg = json!({
        "type": "$status",
        "status": report.status,
        "address": report.address,
        "questions": report.questions,
        "active_sessions": report.active_sessions,
        "version": PROTOCOL_VERSION
    });

    Ok(serde_json::to_string(&msg)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_fields() {
        let report = StatusReport {
            status: ServerStatus::Stopped,
            address: None,
            questions: 5,
            active_sessions: 2,
        };
        let json = build_status_message(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "$status");
        assert_eq!(value["status"], "stopped");
        assert!(value["address"].is_null());
        assert_eq!(value["questions"], 5);
        assert_eq!(value["active_sessions"], 2);
        assert_eq!(value["version"], PROTOCOL_VERSION);
    }

    #[test]
    fn test_status_message_single_line() {
        let report = StatusReport {
            status: ServerStatus::Running,
            address: Some("0.0.0.0:1".into()),
            questions: 1,
            active_sessions: 0,
        };
        assert!(!build_status_message(&report).unwrap().contains('\n'));
    }
}
