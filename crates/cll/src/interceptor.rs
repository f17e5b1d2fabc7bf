// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upload authentication: session-token headers plus per-batch ticket
//! resolution.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::account::{AccountContext, SessionStatus};
use crate::batch::{self, ParseError};
use crate::provider::{IdentityProvider, SessionTokenKind, TicketResolver};
use crate::request::{UploadRequest, UploadStep};

/// Header carrying the resolved tickets of a batch.
pub const TICKETS_HEADER: &str = "X-Tickets";

/// Scheme tag prepended to every resolved ticket token.
pub const TICKET_SCHEME: &str = "x:";

/// A ticket resolved within the current request. `token` carries the
/// [`TICKET_SCHEME`] prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTicket<'a> {
    pub ticket_id: &'a str,
    pub token: &'a str,
}

/// Request-scoped ticket id to token map, ordered by ticket id.
///
/// Only successful resolutions are stored. Ids that failed are remembered
/// separately so they are not retried within the same batch.
#[derive(Debug, Default)]
pub struct TicketDedupMap {
    resolved: BTreeMap<String, String>,
    failed: HashSet<String>,
}

impl TicketDedupMap {
    /// Resolve `ticket_id` unless it was already seen in this batch.
    pub fn resolve_once(&mut self, ticket_id: &str, resolver: &dyn TicketResolver) {
        if self.resolved.contains_key(ticket_id) || self.failed.contains(ticket_id) {
            return;
        }
        let token = resolver.resolve(ticket_id);
        if token.is_empty() {
            warn!(ticket = %ticket_id, "ticket resolution failed, dropping");
            self.failed.insert(ticket_id.to_owned());
        } else {
            self.resolved.insert(ticket_id.to_owned(), format!("{TICKET_SCHEME}{token}"));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn get(&self, ticket_id: &str) -> Option<&str> {
        self.resolved.get(ticket_id).map(String::as_str)
    }

    /// Resolved tickets, ascending by id.
    pub fn entries(&self) -> impl Iterator<Item = ResolvedTicket<'_>> {
        self.resolved.iter().map(|(id, token)| ResolvedTicket { ticket_id: id, token })
    }

    /// Serialize as `"id"="token"` pairs joined by `;`, ascending by id.
    pub fn header_value(&self) -> String {
        self.entries()
            .map(|t| format!("\"{}\"=\"{}\"", t.ticket_id, t.token))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Attaches session tokens and resolved tickets to outgoing uploads, and
/// forces re-authentication when the server rejects one.
pub struct RequestAuthInterceptor {
    account: AccountContext,
    resolver: Arc<dyn TicketResolver>,
}

impl RequestAuthInterceptor {
    pub fn new(provider: Arc<dyn IdentityProvider>, resolver: Arc<dyn TicketResolver>) -> Self {
        Self { account: AccountContext::new(provider), resolver }
    }

    pub fn set_account(&self, account_id: impl Into<String>) {
        self.account.set_account(account_id);
    }

    pub fn refresh_tokens(&self, force: bool) {
        self.account.refresh_tokens(force);
    }

    pub fn status(&self) -> SessionStatus {
        self.account.status()
    }

    /// Authenticate `request` in place.
    ///
    /// Holds the session lock for the whole call, including every provider
    /// and resolver round-trip. Headers are only appended once the whole
    /// batch has been scanned; a bad record leaves `request` untouched.
    pub fn on_request(&self, request: &mut UploadRequest) -> Result<(), ParseError> {
        let mut tokens = self.account.lock();
        tokens.refresh(self.account.provider(), false);

        let mut headers = Vec::with_capacity(3);
        for kind in SessionTokenKind::ALL {
            if let Some(value) = tokens.slot(kind).value() {
                headers.push((kind.header_name(), value.to_owned()));
            }
        }

        let mut tickets = TicketDedupMap::default();
        for record in batch::records(request.batch()) {
            let record = record?;
            for ticket in record.tickets() {
                tickets.resolve_once(ticket, self.resolver.as_ref());
            }
        }
        if !tickets.is_empty() {
            headers.push((TICKETS_HEADER, tickets.header_value()));
        }
        drop(tokens);

        debug!(headers = headers.len(), tickets = tickets.len(), "upload request authenticated");
        for (name, value) in headers {
            request.push_header(name, value);
        }
        Ok(())
    }

    /// Force a session-token refresh after an authentication rejection and
    /// authorize one retry. Ticket state is request-scoped and is rebuilt by
    /// the retried [`on_request`](Self::on_request).
    pub fn on_authentication_failed(&self) -> bool {
        info!(account = %self.account.account_id(), "upload rejected, forcing token refresh");
        self.account.refresh_tokens(true);
        true
    }
}

impl UploadStep for RequestAuthInterceptor {
    fn on_request(&self, request: &mut UploadRequest) -> Result<(), ParseError> {
        RequestAuthInterceptor::on_request(self, request)
    }

    fn on_authentication_failed(&self) -> bool {
        RequestAuthInterceptor::on_authentication_failed(self)
    }
}

#[cfg(test)]
#[path = "interceptor_tests.rs"]
mod tests;
