// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active account and its cached session tokens.
//!
//! A single mutex guards the account id and both token slots. Public methods
//! take the lock; [`SessionTokens::refresh`] operates on an already-held
//! guard so the interceptor can refresh and read within one critical section.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::provider::{IdentityProvider, SessionTokenKind};

/// Cache state of one session token slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Unset,
    Cached,
}

/// One cached session token. An empty value means unset.
#[derive(Debug, Default, Clone)]
pub struct SessionTokenSlot {
    value: String,
}

impl SessionTokenSlot {
    pub fn state(&self) -> SlotState {
        if self.value.is_empty() {
            SlotState::Unset
        } else {
            SlotState::Cached
        }
    }

    /// Current value, or `None` while unset.
    pub fn value(&self) -> Option<&str> {
        if self.value.is_empty() {
            None
        } else {
            Some(&self.value)
        }
    }

    fn clear(&mut self) {
        self.value.clear();
    }
}

/// State guarded by the [`AccountContext`] lock.
#[derive(Debug, Default)]
pub(crate) struct SessionTokens {
    account_id: String,
    msa_device_ticket: SessionTokenSlot,
    x_token: SessionTokenSlot,
}

impl SessionTokens {
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn slot(&self, kind: SessionTokenKind) -> &SessionTokenSlot {
        match kind {
            SessionTokenKind::MsaDeviceTicket => &self.msa_device_ticket,
            SessionTokenKind::XToken => &self.x_token,
        }
    }

    fn slot_mut(&mut self, kind: SessionTokenKind) -> &mut SessionTokenSlot {
        match kind {
            SessionTokenKind::MsaDeviceTicket => &mut self.msa_device_ticket,
            SessionTokenKind::XToken => &mut self.x_token,
        }
    }

    /// Fill unset slots, or every slot when `force` is set.
    ///
    /// Slots are refreshed one after the other; a failure on the first does
    /// not skip the second. A failed fetch leaves the slot unset.
    pub(crate) fn refresh(&mut self, provider: &dyn IdentityProvider, force: bool) {
        for kind in SessionTokenKind::ALL {
            if !force && self.slot(kind).state() == SlotState::Cached {
                debug!(%kind, "session token cached");
                continue;
            }
            let value = provider.session_token(&self.account_id, kind, force);
            if value.is_empty() {
                warn!(account = %self.account_id, %kind, force, "session token fetch failed");
            } else {
                debug!(account = %self.account_id, %kind, force, "session token refreshed");
            }
            self.slot_mut(kind).value = value;
        }
    }

    fn reset(&mut self, account_id: String) {
        self.account_id = account_id;
        self.msa_device_ticket.clear();
        self.x_token.clear();
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            account_id: self.account_id.clone(),
            msa_device_ticket: self.msa_device_ticket.state(),
            x_token: self.x_token.state(),
        }
    }
}

/// Snapshot of the session cache, without token values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub account_id: String,
    pub msa_device_ticket: SlotState,
    pub x_token: SlotState,
}

/// The active account and its cached session tokens.
pub struct AccountContext {
    provider: Arc<dyn IdentityProvider>,
    tokens: Mutex<SessionTokens>,
}

impl AccountContext {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider, tokens: Mutex::new(SessionTokens::default()) }
    }

    /// Switch the active account. Both token slots are cleared; they are
    /// fetched again on next use.
    pub fn set_account(&self, account_id: impl Into<String>) {
        let account_id = account_id.into();
        debug!(account = %account_id, "account set, session tokens invalidated");
        self.tokens.lock().reset(account_id);
    }

    /// Refresh session tokens: unset slots only, or all slots when `force`.
    pub fn refresh_tokens(&self, force: bool) {
        let mut tokens = self.tokens.lock();
        tokens.refresh(self.provider.as_ref(), force);
    }

    pub fn account_id(&self) -> String {
        self.tokens.lock().account_id.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.tokens.lock().status()
    }

    pub(crate) fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    /// Hold the session lock for a multi-step operation.
    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionTokens> {
        self.tokens.lock()
    }
}

#[cfg(test)]
#[path = "account_tests.rs"]
mod tests;
