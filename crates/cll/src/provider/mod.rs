// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collaborators that mint credentials for the upload interceptor.
//!
//! Both traits are blocking and infallible from the caller's point of view:
//! an empty string is the only failure signal. Implementations log their own
//! failures.

pub mod http;
pub mod static_file;

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two long-lived session credentials attached to every upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionTokenKind {
    MsaDeviceTicket,
    XToken,
}

impl SessionTokenKind {
    pub const ALL: [SessionTokenKind; 2] = [Self::MsaDeviceTicket, Self::XToken];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MsaDeviceTicket => "msa_device_ticket",
            Self::XToken => "x_token",
        }
    }

    /// Request header that carries this token.
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::MsaDeviceTicket => "X-AuthMsaDeviceTicket",
            Self::XToken => "X-AuthXToken",
        }
    }
}

impl fmt::Display for SessionTokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of session tokens for an account.
pub trait IdentityProvider: Send + Sync {
    /// Fetch a session token of `kind` for `account_id`.
    ///
    /// `force` is set when the caller is re-authenticating after a rejected
    /// upload; implementations with their own cache should bypass it.
    /// Returns an empty string on failure.
    fn session_token(&self, account_id: &str, kind: SessionTokenKind, force: bool) -> String;
}

/// Resolves per-event ticket ids into tokens.
pub trait TicketResolver: Send + Sync {
    /// Returns an empty string on failure.
    fn resolve(&self, ticket_id: &str) -> String;
}
