// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch payload scanning: newline-delimited JSON event records.

use std::fmt;

use serde_json::Value;

/// JSON pointer to the ticket id list inside an event record.
pub const TICKETS_POINTER: &str = "/ext/android/tickets";

/// Lazy iterator over the newline-terminated lines of a batch payload.
///
/// Yields each line without its `\n` (and without a trailing `\r`). Bytes
/// after the last `\n` are not a complete record and are never yielded.
/// Clone the iterator to scan the same payload again.
#[derive(Debug, Clone)]
pub struct BatchLines<'a> {
    rest: &'a [u8],
}

impl<'a> BatchLines<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { rest: payload }
    }
}

impl<'a> Iterator for BatchLines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let end = self.rest.iter().position(|&b| b == b'\n')?;
        let line = &self.rest[..end];
        self.rest = &self.rest[end + 1..];
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}

/// Why a batch record could not be read.
#[derive(Debug)]
pub enum ParseErrorKind {
    InvalidJson(serde_json::Error),
    NotAnObject,
}

/// A batch record that is not a valid JSON object.
#[derive(Debug)]
pub struct ParseError {
    /// 1-based line number within the batch.
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::InvalidJson(e) => {
                write!(f, "batch record {}: invalid json: {e}", self.line)
            }
            ParseErrorKind::NotAnObject => {
                write!(f, "batch record {}: not a json object", self.line)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrorKind::InvalidJson(e) => Some(e),
            ParseErrorKind::NotAnObject => None,
        }
    }
}

/// One event of the batch.
#[derive(Debug, Clone)]
pub struct EventRecord {
    value: Value,
}

impl EventRecord {
    /// Parse one line. `line` is the 1-based position used in errors.
    pub fn parse(bytes: &[u8], line: usize) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ParseError { line, kind: ParseErrorKind::InvalidJson(e) })?;
        if !value.is_object() {
            return Err(ParseError { line, kind: ParseErrorKind::NotAnObject });
        }
        Ok(Self { value })
    }

    /// Ticket ids referenced by this event, in record order.
    ///
    /// A missing path, a non-array value, or non-string entries contribute
    /// nothing.
    pub fn tickets(&self) -> impl Iterator<Item = &str> {
        let list = self.value.pointer(TICKETS_POINTER).and_then(Value::as_array);
        list.into_iter().flatten().filter_map(Value::as_str)
    }
}

/// Parse every complete record of a batch. An empty line is a record too
/// and fails to parse.
pub fn records(payload: &[u8]) -> impl Iterator<Item = Result<EventRecord, ParseError>> + '_ {
    BatchLines::new(payload).enumerate().map(|(i, line)| EventRecord::parse(line, i + 1))
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
