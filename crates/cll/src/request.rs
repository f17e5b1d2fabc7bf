// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use bytes::Bytes;

use crate::batch::ParseError;

/// One outgoing batch upload.
///
/// Headers are an ordered, append-only list; duplicate names are allowed.
/// The batch payload is immutable.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    headers: Vec<(String, String)>,
    batch: Bytes,
}

impl UploadRequest {
    pub fn new(batch: Bytes) -> Self {
        Self { headers: Vec::new(), batch }
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value for `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    pub fn batch(&self) -> &[u8] {
        &self.batch
    }

    /// Cheap handle to the payload for sending.
    pub fn body(&self) -> Bytes {
        self.batch.clone()
    }
}

/// A stage the upload pipeline runs on every request.
pub trait UploadStep: Send + Sync {
    /// Prepare `request` before it is sent. An error aborts this upload.
    fn on_request(&self, request: &mut UploadRequest) -> Result<(), ParseError>;

    /// Called after the server rejected a send for authentication reasons.
    /// Returning `true` authorizes one more attempt.
    fn on_authentication_failed(&self) -> bool {
        false
    }
}
