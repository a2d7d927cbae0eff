use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use scribe::audit::AuditLog;
use scribe::config::{Args, Config};
use scribe::context::ServerContext;
use scribe::role::RoleStore;
use scribe::snapshot::SnapshotWriter;
use scribe::{batch, transport};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::resolve(args)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_target(false)
        .init();

    let roles = RoleStore::new(config.role_file.clone());
    roles.validate()?;
    let audit = AuditLog::open(config.audit_file.clone())?;
    let snapshot = SnapshotWriter::new(config.snapshot_file.clone());
    let bind = config.bind.clone();

    let ctx = Arc::new(ServerContext::new(config, roles, audit, snapshot));

    let batch_ctx = Arc::clone(&ctx);
    tokio::spawn(async move {
        batch::run(batch_ctx).await;
    });

    let transport_ctx = Arc::clone(&ctx);
    let transport_bind = bind.clone();
    tokio::spawn(async move {
        if let Err(error) = transport::serve(transport_ctx, &transport_bind).await {
            tracing::error!(%error, "transport listener exited");
        }
    });

    operator_loop(&ctx).await
}

/// Reads operator commands from stdin. `QUIT` is refused while any
/// session is active; otherwise the server snapshots the document and
/// exits.
async fn operator_loop(ctx: &ServerContext) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "QUIT" => {
                if ctx.registry.has_active_sessions() {
                    println!("REFUSED active sessions remain");
                    continue;
                }
                let document = ctx.document.write().await;
                ctx.snapshot.write(&document)?;
                tracing::info!("shutting down on operator QUIT");
                return Ok(());
            }
            other if !other.is_empty() => {
                println!("UNKNOWN {other}");
            }
            _ => {}
        }
    }
    Ok(())
}
