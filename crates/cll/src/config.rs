// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Where session tokens and tickets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSource {
    /// Identity backend base URL.
    Http(String),
    /// Static credentials JSON file.
    File(PathBuf),
}

/// Authenticated telemetry batch uploader.
#[derive(Debug, Clone, Parser)]
#[command(name = "cllauth", version, about)]
pub struct Config {
    /// Telemetry upload endpoint.
    #[arg(long, env = "CLL_ENDPOINT")]
    pub endpoint: String,

    /// Account id whose session tokens authenticate the uploads.
    #[arg(long, env = "CLL_ACCOUNT")]
    pub account: String,

    /// Identity backend base URL.
    #[arg(long, env = "CLL_IDENTITY_URL")]
    pub identity_url: Option<String>,

    /// Static credentials file (instead of an identity backend).
    #[arg(long, env = "CLL_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Per-request timeout in milliseconds, for uploads and identity calls.
    #[arg(long, env = "CLL_TIMEOUT_MS", default_value_t = 30000)]
    pub timeout_ms: u64,

    /// Log format (json or text).
    #[arg(long, env = "CLL_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CLL_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Batch files to upload, one request each.
    #[arg(required = false)]
    pub batches: Vec<PathBuf>,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.provider_source()?;
        if self.batches.is_empty() {
            anyhow::bail!("at least one batch file must be specified");
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("--timeout-ms must be positive");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    pub fn provider_source(&self) -> anyhow::Result<ProviderSource> {
        match (&self.identity_url, &self.credentials) {
            (Some(url), None) => Ok(ProviderSource::Http(url.clone())),
            (None, Some(path)) => Ok(ProviderSource::File(path.clone())),
            (Some(_), Some(_)) => {
                anyhow::bail!("cannot specify both --identity-url and --credentials")
            }
            (None, None) => anyhow::bail!("either --identity-url or --credentials must be specified"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
