// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use cllauth::config::Config;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    match cllauth::run(config).await {
        Ok(summary) if summary.failed == 0 => {}
        Ok(summary) => {
            error!(failed = summary.failed, uploaded = summary.uploaded, "some uploads failed");
            std::process::exit(1);
        }
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).init();
        }
    }
}
