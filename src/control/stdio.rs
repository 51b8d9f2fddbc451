//! Line-at-a-time stdout output.
//!
//! stdout carries only JSON lines; tracing output goes to stderr. Each line is
//! assembled first and written with a single `write_all` under the stdout
//! lock, so lines from concurrent sessions never interleave.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;

/// Write `line` plus `\n` to stdout and flush.
pub fn write_stdout_line(line: &str) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    emit(&buf)
}

/// Serialize `value` as compact JSON and write it as one stdout line.
pub fn write_stdout_json<T: Serialize>(value: &T) -> Result<()> {
    let mut buf = serde_json::to_vec(value)?;
    buf.push(b'\n');
    emit(&buf)?;
    Ok(())
}

fn emit(buf: &[u8]) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(buf)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_stdout_line() {
        assert!(write_stdout_line(r#"{"type":"$status"}"#).is_ok());
    }

    #[test]
    fn test_write_stdout_json() {
        #[derive(Serialize)]
        struct Summary {
            questions: usize,
        }

        assert!(write_stdout_json(&Summary { questions: 3 }).is_ok());
    }
}
