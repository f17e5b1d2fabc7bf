// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Install the ring-backed rustls provider for this process.
///
/// reqwest is built without a default TLS provider. Safe to call repeatedly;
/// later calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}
