//! Serve policy requests
//!
//! With `--stdio` every line on stdin is one JSON request and every response
//! is written as one JSON line on stdout. Logs go to stderr.

use anyhow::{Result, bail};
use clap::Args;
use policyd_core::{Caller, PolicyService, PrivilegeTable};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::start_engine;
use crate::config::Overrides;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Read requests from stdin and write responses to stdout
    #[arg(long)]
    pub stdio: bool,

    /// Identity of the peer on the other end of the transport
    #[arg(long)]
    pub caller: String,
}

/// Run the serve command
pub async fn run(overrides: &Overrides, args: ServeArgs) -> Result<()> {
    if !args.stdio {
        bail!("No transport selected; pass --stdio");
    }

    let overrides = overrides.clone();
    let engine = tokio::task::spawn_blocking(move || start_engine(&overrides)).await??;

    let privileges = PrivilegeTable::from_config(&engine.config.privileges);
    let mut changes = engine.bus.subscribe();
    let service =
        Arc::new(PolicyService::new(Arc::new(engine.manager)).with_privileges(privileges));
    let caller = Caller::new(args.caller);

    let watcher = tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) => info!(
                    policy = %change.policy,
                    scope = %change.scope,
                    value = %change.value,
                    "Effective value changed"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Change watcher lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    info!(caller = %caller.identity, "Serving requests on stdio");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let service = Arc::clone(&service);
        let caller = caller.clone();
        let reply = tokio::task::spawn_blocking(move || service.handle_json(&caller, &line)).await?;

        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    watcher.abort();
    info!("Input closed, shutting down");
    Ok(())
}
