// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch upload transport with a single re-authentication retry.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;

use crate::error::{ErrorCode, UploadError};
use crate::request::{UploadRequest, UploadStep};

/// Content type of a newline-delimited JSON batch.
pub const BATCH_CONTENT_TYPE: &str = "application/x-json-stream";

/// Maximum send attempts per batch: the first plus one after re-auth.
const MAX_ATTEMPTS: u32 = 2;

/// Successful upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReceipt {
    pub status: u16,
    pub attempts: u32,
}

/// Sends batches to the telemetry endpoint through an [`UploadStep`].
pub struct UploadPipeline {
    endpoint: String,
    step: Arc<dyn UploadStep>,
    client: reqwest::Client,
}

impl UploadPipeline {
    pub fn new(endpoint: impl Into<String>, step: Arc<dyn UploadStep>, timeout: Duration) -> Self {
        crate::tls::install_crypto_provider();
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap_or_default();
        Self { endpoint: endpoint.into(), step, client }
    }

    /// Upload one batch.
    ///
    /// The request is rebuilt from scratch for every attempt so the retry
    /// carries freshly refreshed headers.
    pub async fn upload(&self, batch: Bytes) -> Result<UploadReceipt, UploadError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let request = self.prepare(batch.clone()).await?;
            let status = self.send(&request).await?;

            if status.is_success() {
                tracing::info!(status = status.as_u16(), attempts, "batch uploaded");
                return Ok(UploadReceipt { status: status.as_u16(), attempts });
            }
            if status != StatusCode::UNAUTHORIZED {
                tracing::warn!(status = status.as_u16(), "batch rejected");
                return Err(UploadError::new(
                    ErrorCode::Rejected,
                    format!("upload rejected with status {status}"),
                ));
            }
            if attempts >= MAX_ATTEMPTS || !self.reauthenticate().await? {
                return Err(UploadError::new(
                    ErrorCode::Unauthorized,
                    format!("upload unauthorized after {attempts} attempt(s)"),
                ));
            }
            tracing::debug!(attempts, "retrying upload after re-authentication");
        }
    }

    /// Run the upload step on a blocking thread; it may wait on the network.
    async fn prepare(&self, batch: Bytes) -> Result<UploadRequest, UploadError> {
        let step = Arc::clone(&self.step);
        let mut request = UploadRequest::new(batch);
        request.push_header("Content-Type", BATCH_CONTENT_TYPE);
        tokio::task::spawn_blocking(move || step.on_request(&mut request).map(|()| request))
            .await
            .map_err(|e| UploadError::new(ErrorCode::Internal, format!("upload step panicked: {e}")))?
            .map_err(|e| {
                tracing::warn!(err = %e, "batch aborted");
                UploadError::from(e)
            })
    }

    async fn reauthenticate(&self) -> Result<bool, UploadError> {
        let step = Arc::clone(&self.step);
        tokio::task::spawn_blocking(move || step.on_authentication_failed())
            .await
            .map_err(|e| UploadError::new(ErrorCode::Internal, format!("reauth panicked: {e}")))
    }

    async fn send(&self, request: &UploadRequest) -> Result<StatusCode, UploadError> {
        let mut req = self.client.post(&self.endpoint);
        for (name, value) in request.headers() {
            req = req.header(name.as_str(), value.as_str());
        }
        let resp = req.body(request.body()).send().await.map_err(|e| {
            tracing::warn!(err = %e, "upload send failed");
            UploadError::new(ErrorCode::Transport, e.to_string())
        })?;
        Ok(resp.status())
    }
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
