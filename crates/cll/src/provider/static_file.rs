// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed credentials loaded from a JSON file, for offline runs.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::provider::{IdentityProvider, SessionTokenKind, TicketResolver};

/// Session tokens for one account.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StaticAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msa_device_ticket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_token: Option<String>,
}

/// Credentials file contents. Anything missing resolves empty.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StaticCredentials {
    #[serde(default)]
    pub accounts: HashMap<String, StaticAccount>,
    #[serde(default)]
    pub tickets: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading credentials {}", path.display()))?;
        let creds: StaticCredentials = serde_json::from_str(&contents)
            .with_context(|| format!("parsing credentials {}", path.display()))?;
        Ok(creds)
    }
}

impl IdentityProvider for StaticCredentials {
    fn session_token(&self, account_id: &str, kind: SessionTokenKind, _force: bool) -> String {
        let Some(account) = self.accounts.get(account_id) else {
            return String::new();
        };
        let token = match kind {
            SessionTokenKind::MsaDeviceTicket => &account.msa_device_ticket,
            SessionTokenKind::XToken => &account.x_token,
        };
        token.clone().unwrap_or_default()
    }
}

impl TicketResolver for StaticCredentials {
    fn resolve(&self, ticket_id: &str) -> String {
        self.tickets.get(ticket_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "static_file_tests.rs"]
mod tests;
