//! The versioned document: a [`crate::store::SegmentStore`] plus the
//! version counter that the edit API gates on.
//!
//! Version advancement is a decision the batch loop makes — if at least
//! one record was processed this tick, it commits — not something
//! [`Document::commit`] infers on its own. Even a tick whose single
//! command was rejected outright still commits and bumps the version.
//! [`crate::store::SegmentStore::commit`]'s own no-op-on-empty-working
//! rule only governs whether there is anything to promote in the arena;
//! it is orthogonal to whether the version ticks.

use crate::store::SegmentStore;

pub struct Document {
    store: SegmentStore,
    version: u64,
}

impl Document {
    pub fn new() -> Self {
        Self {
            store: SegmentStore::new(),
            version: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn store(&mut self) -> &mut SegmentStore {
        &mut self.store
    }

    /// Flattened committed text of the current version.
    pub fn flatten(&self) -> Vec<u8> {
        self.store.flatten()
    }

    pub fn flatten_string(&self) -> String {
        String::from_utf8_lossy(&self.flatten()).into_owned()
    }

    /// Promote pending edits and advance the version by exactly one.
    /// Call only when the batch loop has processed at least one record
    /// this tick.
    pub fn commit(&mut self) {
        self.store.commit();
        self.version += 1;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
