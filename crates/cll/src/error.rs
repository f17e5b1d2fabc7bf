// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failed batch upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// A batch record was malformed; nothing was sent.
    Parse,
    /// The server rejected the credentials, including after one retry.
    Unauthorized,
    /// The server answered with a non-success, non-auth status.
    Rejected,
    /// The request never got a response.
    Transport,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "PARSE",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Rejected => "REJECTED",
            Self::Transport => "TRANSPORT",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether resubmitting the same batch later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport | Self::Rejected | Self::Unauthorized => true,
            Self::Parse | Self::Internal => false,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed upload: machine-readable code plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadError {
    pub code: ErrorCode,
    pub message: String,
}

impl UploadError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for UploadError {}

impl From<crate::batch::ParseError> for UploadError {
    fn from(e: crate::batch::ParseError) -> Self {
        Self::new(ErrorCode::Parse, e.to_string())
    }
}
