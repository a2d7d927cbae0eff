//! Command queue: the FIFO every client's mutator commands land in
//! between submission and the next batch tick.
//!
//! Short critical sections over a plain collection, guarded by
//! `parking_lot::Mutex` rather than an async lock, since nothing here
//! holds the lock across an `.await`.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// One command as it sat on the wire, stamped with who sent it and when
/// it was accepted onto the queue (used for audit lines, not ordering —
/// queue position is the order of truth).
#[derive(Debug, Clone)]
pub struct QueuedCommand {
    pub user: String,
    pub command_text: String,
    pub received_at: DateTime<Utc>,
}

/// Bounded FIFO of accepted-but-not-yet-batched commands.
///
/// A `None` capacity means unbounded. Queue overflow is an accepted,
/// known weakness (silently drop the enqueue) rather than a condition
/// the caller must check for.
pub struct CommandQueue {
    records: Mutex<VecDeque<QueuedCommand>>,
    capacity: Option<usize>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
        }
    }

    /// Append a command. Silently drops it if the queue is at capacity —
    /// the submitting session is never told; its command simply never
    /// appears in a future broadcast.
    pub fn enqueue(&self, user: impl Into<String>, command_text: impl Into<String>) {
        let mut records = self.records.lock();
        if let Some(cap) = self.capacity {
            if records.len() >= cap {
                return;
            }
        }
        records.push_back(QueuedCommand {
            user: user.into(),
            command_text: command_text.into(),
            received_at: Utc::now(),
        });
    }

    /// Detach every queued command in FIFO order, leaving the queue
    /// empty. Called once per batch tick.
    pub fn drain(&self) -> Vec<QueuedCommand> {
        let mut records = self.records.lock();
        records.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}
