// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity backend reached over HTTP.
//!
//! Uses a blocking client: callers run on the upload step's blocking thread
//! while holding the session lock. Must not be constructed or called from
//! inside an async context.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::provider::{IdentityProvider, SessionTokenKind, TicketResolver};

#[derive(Debug, Serialize)]
struct SessionTokenRequest<'a> {
    account_id: &'a str,
    kind: SessionTokenKind,
    force: bool,
}

#[derive(Debug, Serialize)]
struct TicketRequest<'a> {
    ticket_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

/// HTTP client for the identity backend.
pub struct HttpIdentityBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpIdentityBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        crate::tls::install_crypto_provider();
        let client =
            reqwest::blocking::Client::builder().timeout(timeout).build().unwrap_or_default();
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post_token<T: Serialize>(&self, path: &str, body: &T) -> anyhow::Result<String> {
        let resp = self.client.post(self.url(path)).json(body).send()?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            anyhow::bail!("{path} failed ({status}): {text}");
        }
        let token: TokenResponse = resp.json()?;
        Ok(token.token)
    }
}

impl IdentityProvider for HttpIdentityBackend {
    fn session_token(&self, account_id: &str, kind: SessionTokenKind, force: bool) -> String {
        let body = SessionTokenRequest { account_id, kind, force };
        match self.post_token("/v1/session-token", &body) {
            Ok(token) => token,
            Err(e) => {
                warn!(account = %account_id, %kind, err = %e, "session token request failed");
                String::new()
            }
        }
    }
}

impl TicketResolver for HttpIdentityBackend {
    fn resolve(&self, ticket_id: &str) -> String {
        match self.post_token("/v1/tickets/resolve", &TicketRequest { ticket_id }) {
            Ok(token) => token,
            Err(e) => {
                warn!(ticket = %ticket_id, err = %e, "ticket resolve request failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
