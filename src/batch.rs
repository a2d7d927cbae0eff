//! Batch/commit loop: every `T` ms, drain the command queue,
//! apply each record against the current version under the document's
//! exclusive lock, commit once, format and log the delta, then
//! broadcast it to every active session.

use std::sync::Arc;
use std::time::Duration;

use crate::context::ServerContext;
use crate::edit;
use crate::error::{EditOutcome, RejectReason};
use crate::queue::QueuedCommand;

/// Run the batch loop until the process is torn down. Never returns
/// under normal operation — spawn it as its own task.
pub async fn run(ctx: Arc<ServerContext>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(ctx.config.interval_ms));
    // `interval` fires its first tick immediately; the loop's cadence is
    // sleep-then-drain, so consume that first immediate tick.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let records = ctx.queue.drain();
        if records.is_empty() {
            continue;
        }
        run_tick(&ctx, records).await;
    }
}

async fn run_tick(ctx: &ServerContext, records: Vec<QueuedCommand>) {
    let mut document = ctx.document.write().await;

    let mut lines = String::new();
    for record in &records {
        let outcome = dispatch_one(ctx, &mut document, record);
        lines.push_str(&format!(
            "EDIT {} {} {}\n",
            record.user, record.command_text, outcome
        ));
    }
    document.commit();
    let new_version = document.version();

    let delta = format!("VERSION {new_version}\n{lines}END\n");
    if let Err(error) = ctx.audit.append(&delta) {
        tracing::warn!(%error, "failed to append delta to audit log");
    }
    // Broadcast before releasing the document lock: otherwise a session
    // admitted between commit and broadcast bootstraps with a snapshot
    // that already reflects this version and then receives the same
    // version again as a delta.
    ctx.registry.broadcast(&delta);
    drop(document);
    tracing::debug!(
        version = new_version,
        processed = records.len(),
        "tick committed"
    );
}

fn dispatch_one(
    ctx: &ServerContext,
    document: &mut crate::document::Document,
    record: &QueuedCommand,
) -> EditOutcome {
    match ctx.registry.permission_of(&record.user) {
        Some(permission) if permission.can_write() => edit::apply(document, &record.command_text),
        _ => EditOutcome::Reject(RejectReason::Unauthorised),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::config::Config;
    use crate::role::RoleStore;
    use crate::snapshot::SnapshotWriter;
    use std::io::Write;

    fn test_context(roles: &str) -> (tempfile::TempDir, Arc<ServerContext>) {
        let dir = tempfile::tempdir().unwrap();
        let role_path = dir.path().join("roles.txt");
        let mut file = std::fs::File::create(&role_path).unwrap();
        write!(file, "{roles}").unwrap();

        let config = Config {
            interval_ms: 50,
            bind: "127.0.0.1:0".to_string(),
            role_file: role_path.clone(),
            snapshot_file: dir.path().join("doc.md"),
            audit_file: dir.path().join("audit.log"),
            session_capacity: 10,
            queue_capacity: None,
            log_level: "info".to_string(),
        };
        let ctx = ServerContext::new(
            config,
            RoleStore::new(role_path),
            AuditLog::open(dir.path().join("audit.log")).unwrap(),
            SnapshotWriter::new(dir.path().join("doc.md")),
        );
        (dir, Arc::new(ctx))
    }

    fn admit(ctx: &ServerContext, user: &str) {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        ctx.registry.admit(user, &ctx.roles, tx).unwrap();
    }

    #[tokio::test]
    async fn two_same_position_inserts_compose_and_bump_version_once() {
        let (_dir, ctx) = test_context("alice write\n");
        admit(&ctx, "alice");
        ctx.queue.enqueue("alice", "0 INSERT 0 World");
        ctx.queue.enqueue("alice", "0 INSERT 0 Hello ");
        let records = ctx.queue.drain();
        run_tick(&ctx, records).await;
        let document = ctx.document.read().await;
        assert_eq!(document.flatten_string(), "Hello World");
        assert_eq!(document.version(), 1);
    }

    #[tokio::test]
    async fn read_role_mutator_is_unauthorised_and_still_ticks() {
        let (_dir, ctx) = test_context("bob read\n");
        admit(&ctx, "bob");
        ctx.queue.enqueue("bob", "0 INSERT 0 X");
        let records = ctx.queue.drain();
        run_tick(&ctx, records).await;
        let document = ctx.document.read().await;
        assert_eq!(document.flatten_string(), "");
        assert_eq!(document.version(), 1);
        drop(document);
        let log = ctx.audit.read_all().unwrap();
        assert!(log.contains("Reject UNAUTHORISED"));
    }

    #[tokio::test]
    async fn stale_version_still_commits_the_tick() {
        let (_dir, ctx) = test_context("alice write\n");
        admit(&ctx, "alice");
        {
            let mut document = ctx.document.write().await;
            document.store().put_text(0, b"Hello").unwrap();
            document.commit();
        }
        ctx.queue.enqueue("alice", "0 INSERT 0 x");
        let records = ctx.queue.drain();
        run_tick(&ctx, records).await;
        let document = ctx.document.read().await;
        assert_eq!(document.flatten_string(), "Hello");
        assert_eq!(document.version(), 2);
        drop(document);
        assert!(ctx.audit.read_all().unwrap().contains("Reject OUTDATED_VERSION"));
    }

    #[tokio::test]
    async fn empty_tick_never_commits() {
        let (_dir, ctx) = test_context("alice write\n");
        let records = ctx.queue.drain();
        assert!(records.is_empty());
    }
}
