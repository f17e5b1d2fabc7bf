// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cllauth: authentication for telemetry batch uploads.
//!
//! Caches session tokens for the active account, resolves per-event tickets
//! once per batch, and re-authenticates once when the upload endpoint
//! rejects a request.

pub mod account;
pub mod batch;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod provider;
pub mod request;
pub mod test_support;
pub mod tls;
pub mod upload;

use std::sync::Arc;

use bytes::Bytes;

use crate::config::{Config, ProviderSource};
use crate::interceptor::RequestAuthInterceptor;
use crate::provider::http::HttpIdentityBackend;
use crate::provider::static_file::StaticCredentials;
use crate::upload::UploadPipeline;

/// Result of uploading every configured batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub uploaded: usize,
    pub failed: usize,
}

/// Build the interceptor for the configured provider source.
///
/// Blocking: the HTTP backend owns a blocking client, so call this from a
/// blocking thread.
pub fn build_interceptor(config: &Config) -> anyhow::Result<RequestAuthInterceptor> {
    let interceptor = match config.provider_source()? {
        ProviderSource::Http(url) => {
            let backend = Arc::new(HttpIdentityBackend::new(url, config.timeout()));
            RequestAuthInterceptor::new(backend.clone(), backend)
        }
        ProviderSource::File(path) => {
            let creds = Arc::new(StaticCredentials::load(&path)?);
            RequestAuthInterceptor::new(creds.clone(), creds)
        }
    };
    interceptor.set_account(config.account.clone());
    Ok(interceptor)
}

/// Upload every batch file in `config`, one request each.
pub async fn run(config: Config) -> anyhow::Result<RunSummary> {
    let interceptor = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || build_interceptor(&config)).await??
    };
    let interceptor = Arc::new(interceptor);
    let pipeline = UploadPipeline::new(config.endpoint.clone(), interceptor.clone(), config.timeout());

    let mut summary = RunSummary::default();
    for path in &config.batches {
        let batch = match tokio::fs::read(path).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                tracing::error!(file = %path.display(), err = %e, "reading batch failed");
                summary.failed += 1;
                continue;
            }
        };
        match pipeline.upload(batch).await {
            Ok(receipt) => {
                tracing::info!(
                    file = %path.display(),
                    status = receipt.status,
                    attempts = receipt.attempts,
                    "upload complete"
                );
                summary.uploaded += 1;
            }
            Err(e) => {
                tracing::error!(file = %path.display(), code = %e.code, err = %e.message, "upload failed");
                summary.failed += 1;
            }
        }
    }

    let status = interceptor.status();
    tracing::debug!(
        account = %status.account_id,
        msa_device_ticket = ?status.msa_device_ticket,
        x_token = ?status.x_token,
        "session cache at exit"
    );
    Ok(summary)
}
