//! The explicit server context bundling every shared collaborator:
//! document, queue, registry, role store, audit log and snapshot writer,
//! plus the startup configuration. One `Arc<ServerContext>` is cloned
//! into the batch loop and every per-session transport task; no
//! process-wide statics are used anywhere in this crate.

use tokio::sync::RwLock;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::document::Document;
use crate::queue::CommandQueue;
use crate::role::RoleStore;
use crate::session::SessionRegistry;
use crate::snapshot::SnapshotWriter;

pub struct ServerContext {
    pub document: RwLock<Document>,
    pub queue: CommandQueue,
    pub registry: SessionRegistry,
    pub roles: RoleStore,
    pub audit: AuditLog,
    pub snapshot: SnapshotWriter,
    pub config: Config,
}

impl ServerContext {
    pub fn new(config: Config, roles: RoleStore, audit: AuditLog, snapshot: SnapshotWriter) -> Self {
        Self {
            document: RwLock::new(Document::new()),
            queue: match config.queue_capacity {
                Some(capacity) => CommandQueue::with_capacity(capacity),
                None => CommandQueue::new(),
            },
            registry: SessionRegistry::new(config.session_capacity),
            roles,
            audit,
            snapshot,
            config,
        }
    }
}
