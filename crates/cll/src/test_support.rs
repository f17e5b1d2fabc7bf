// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: recording collaborators and assertion helpers.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::provider::{IdentityProvider, SessionTokenKind, TicketResolver};

/// One recorded [`IdentityProvider::session_token`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokenCall {
    pub account_id: String,
    pub kind: SessionTokenKind,
    pub force: bool,
}

/// Identity provider with scripted tokens that records every call.
///
/// Tokens are looked up by `(account, kind)`; unknown pairs return empty.
/// Each returned token gets a `#n` generation suffix when `generations` is
/// enabled, so tests can tell a re-fetch from a cached value.
#[derive(Default)]
pub struct RecordingProvider {
    tokens: Mutex<HashMap<(String, SessionTokenKind), String>>,
    calls: Mutex<Vec<SessionTokenCall>>,
    generations: bool,
    delay: Option<Duration>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, account: &str, kind: SessionTokenKind, token: &str) -> Self {
        self.tokens.lock().insert((account.to_owned(), kind), token.to_owned());
        self
    }

    /// Tokens `msa-<account>` and `xt-<account>` for both kinds.
    pub fn with_account(self, account: &str) -> Self {
        self.with_token(account, SessionTokenKind::MsaDeviceTicket, &format!("msa-{account}"))
            .with_token(account, SessionTokenKind::XToken, &format!("xt-{account}"))
    }

    pub fn with_generations(mut self) -> Self {
        self.generations = true;
        self
    }

    /// Sleep inside every call, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change or remove (`""`) the token returned from now on.
    pub fn set_token(&self, account: &str, kind: SessionTokenKind, token: &str) {
        self.tokens.lock().insert((account.to_owned(), kind), token.to_owned());
    }

    pub fn calls(&self) -> Vec<SessionTokenCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, kind: SessionTokenKind) -> usize {
        self.calls.lock().iter().filter(|c| c.kind == kind).count()
    }
}

impl IdentityProvider for RecordingProvider {
    fn session_token(&self, account_id: &str, kind: SessionTokenKind, force: bool) -> String {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let generation = {
            let mut calls = self.calls.lock();
            calls.push(SessionTokenCall { account_id: account_id.to_owned(), kind, force });
            calls.iter().filter(|c| c.kind == kind && c.account_id == account_id).count()
        };
        let token =
            self.tokens.lock().get(&(account_id.to_owned(), kind)).cloned().unwrap_or_default();
        if token.is_empty() || !self.generations {
            token
        } else {
            format!("{token}#{generation}")
        }
    }
}

/// Ticket resolver with scripted answers that records every call.
#[derive(Default)]
pub struct RecordingResolver {
    tokens: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl RecordingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticket(mut self, ticket_id: &str, token: &str) -> Self {
        self.tokens.insert(ticket_id.to_owned(), token.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, ticket_id: &str) -> usize {
        self.calls.lock().iter().filter(|t| *t == ticket_id).count()
    }
}

impl TicketResolver for RecordingResolver {
    fn resolve(&self, ticket_id: &str) -> String {
        self.calls.lock().push(ticket_id.to_owned());
        self.tokens.get(ticket_id).cloned().unwrap_or_default()
    }
}

/// Build a newline-terminated batch from JSON values.
pub fn batch_of(records: &[serde_json::Value]) -> bytes::Bytes {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    bytes::Bytes::from(out)
}

/// An event record referencing `tickets`.
pub fn event_with_tickets(tickets: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "name": "Microsoft.Test.Event",
        "ext": { "android": { "tickets": tickets } },
    })
}

/// Assert that `$expr` is `Err` and its display contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
