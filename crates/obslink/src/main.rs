mod cli;
mod commands;
mod error;

use std::time::Duration;

use clap::Parser;
use obslink_core::{ConnectionConfig, ConnectionState, ObsSession, ProtocolVersion};
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, GlobalOpts, Protocol};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("error: {err}");
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let timeout = cli.global.timeout;
    let session = ObsSession::new(build_config(&cli.global));
    session.initialize().await?;

    wait_until_ready(&session, timeout).await?;
    let result = commands::dispatch(cli.command, &session).await;
    session.shutdown().await;
    result
}

fn build_config(global: &GlobalOpts) -> ConnectionConfig {
    ConnectionConfig {
        host: global.host.clone(),
        port: global.port,
        password: global.password.clone().map(SecretString::from),
        protocol: match global.protocol {
            Protocol::V4 => ProtocolVersion::V4,
            Protocol::V5 => ProtocolVersion::V5,
        },
        verbose_logging: global.verbose > 0,
        ..ConnectionConfig::default()
    }
}

async fn wait_until_ready(session: &ObsSession, timeout_secs: u64) -> Result<(), CliError> {
    let mut state = session.state();
    let wait = state.wait_for(|s| *s == ConnectionState::Connected);
    match tokio::time::timeout(Duration::from_secs(timeout_secs), wait).await {
        Ok(Ok(_)) => Ok(()),
        _ => Err(CliError::ConnectTimeout(timeout_secs)),
    }
}
