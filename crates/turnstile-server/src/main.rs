//! Turnstile session service.
//!
//! ```text
//! turnstile-server --config turnstile.toml
//! RUST_LOG=turnstile=debug turnstile-server --bind 0.0.0.0:9000
//! ```
//!
//! Runs with an in-memory store until Ctrl-C, then shuts down gracefully.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use turnstile::prelude::*;

#[derive(Parser)]
#[command(name = "turnstile-server")]
#[command(about = "Credential issuance and session lifecycle service")]
#[command(version)]
struct Args {
    /// TOML settings file. Environment variables (TURNSTILE__SECTION__KEY)
    /// override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding `server.bind_addr`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "turnstile server failed");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` if set, `info` otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

async fn run(args: Args) -> Result<(), TurnstileError> {
    let settings = Settings::load(args.config.as_deref())?;
    tracing::debug!(?settings, "settings loaded");

    let mut builder = TurnstileServer::builder().settings(settings);
    if let Some(addr) = &args.bind {
        builder = builder.bind(addr);
    }
    let server = builder.build(Arc::new(MemoryStore::new())).await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run_until(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl-C; shutting down");
        return;
    }
    tracing::info!("Ctrl-C received");
}
