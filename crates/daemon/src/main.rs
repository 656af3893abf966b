// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `nabd` entrypoint.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nab_daemon::lifecycle::{startup, Config, LifecycleError};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("nabd: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<u8, LifecycleError> {
    let config = Config::load()?;
    std::fs::create_dir_all(&config.state_dir)?;
    init_tracing(&config);

    let daemon = startup(&config).await?;
    info!(port = config.port, "nabd started");

    tokio::select! {
        _ = daemon.wait_shutdown() => info!("shutdown requested"),
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("interrupted"),
            Err(e) => error!(error = %e, "signal handler failed"),
        },
    }

    let code = daemon.exit_code();
    daemon.abort();
    info!(code, "nabd stopped");
    Ok(code)
}

fn init_tracing(config: &Config) {
    let file = tracing_appender::rolling::never(
        config.log_path.parent().unwrap_or(&config.state_dir),
        config
            .log_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "nabd.log".to_string()),
    );
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(nab_daemon::env::log_filter()))
        .with_writer(file)
        .with_ansi(false)
        .init();
}
