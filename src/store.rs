//! Segment store: two parallel index sequences over a shared arena,
//! supporting position-addressed insert/delete with pending-state tagging.
//!
//! Positions are *logical* — only non-`PendingInsert` segments of the
//! working layer contribute to the coordinate space a command addresses
//! (the "visible length" from the glossary). This lets many commands in
//! one batch share the coordinate system of the committed baseline.

use crate::segment::{Segment, SegmentId, SegmentState};

/// Why a store operation could not be carried out. Mirrors the subset of
/// `RejectReason` the store itself is responsible for raising; permission
/// and version checks happen a layer up, in [`crate::edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    InvalidPosition,
}

/// The committed/working segment-list pair for a single document.
pub struct SegmentStore {
    arena: Vec<Segment>,
    committed: Vec<SegmentId>,
    working: Vec<SegmentId>,
    /// Whether `working` has been seeded from `committed` for the in-flight
    /// version. Reset to `false` on every `commit`.
    seeded: bool,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            committed: Vec::new(),
            working: Vec::new(),
            seeded: false,
        }
    }

    fn alloc(&mut self, segment: Segment) -> SegmentId {
        let id = SegmentId(self.arena.len());
        self.arena.push(segment);
        id
    }

    fn seg(&self, id: SegmentId) -> &Segment {
        &self.arena[id.0]
    }

    fn seg_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.arena[id.0]
    }

    /// Clone every committed segment into `working` as `Committed`, if this
    /// is the first mutating call of the in-flight version.
    fn ensure_seeded(&mut self) {
        if self.seeded {
            return;
        }
        let committed_ids = self.committed.clone();
        let mut new_working = Vec::with_capacity(committed_ids.len());
        for id in committed_ids {
            let content = self.seg(id).content.clone();
            new_working.push(self.alloc(Segment::new(content, SegmentState::Committed)));
        }
        self.working = new_working;
        self.seeded = true;
    }

    /// Concatenation of committed segment contents, in order — the
    /// flattened text of the current version. Reads only the committed
    /// layer; safe under a document read lock even mid-batch.
    pub fn flatten(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for id in &self.committed {
            out.extend_from_slice(&self.seg(*id).content);
        }
        out
    }

    /// Sum of lengths of non-`PendingInsert` segments in `working` (or, if
    /// unseeded, of `committed`) — the coordinate space commands address.
    pub fn visible_length(&self) -> usize {
        if self.seeded {
            self.working
                .iter()
                .map(|id| self.seg(*id))
                .filter(|s| s.state != SegmentState::PendingInsert)
                .map(|s| s.length)
                .sum()
        } else {
            self.committed.iter().map(|id| self.seg(*id).length).sum()
        }
    }

    /// State of the segment covering logical position `pos`, or `None` if
    /// `pos` is the end-of-document boundary (covered by no segment).
    /// Used by the edit API to detect `DELETED_POSITION`.
    pub fn state_at(&mut self, pos: usize) -> Option<SegmentState> {
        self.ensure_seeded();
        let mut acc = 0usize;
        for id in &self.working {
            let seg = self.seg(*id);
            if seg.state == SegmentState::PendingInsert {
                continue;
            }
            if acc <= pos && pos < acc + seg.length {
                return Some(seg.state);
            }
            acc += seg.length;
        }
        None
    }

    /// Split `working[index]` at byte `offset`, in place, so that
    /// `working[index]` becomes the prefix and a new `working[index + 1]`
    /// holds the suffix. Both halves inherit the original segment's state.
    /// No-op if `offset` is `0` or the segment's full length.
    fn split_working_at(&mut self, index: usize, offset: usize) {
        let id = self.working[index];
        let seg = self.seg(id);
        if offset == 0 || offset == seg.length {
            return;
        }
        let (left, right) = seg.split_at(offset);
        let left_id = self.alloc(left);
        let right_id = self.alloc(right);
        self.working[index] = left_id;
        self.working.insert(index + 1, right_id);
    }

    /// Locate the working-list index at which a new segment should be
    /// inserted for logical position `pos`. `stop_before_pending_insert`
    /// selects the tie-break: `true` (`add_text`) lands before any
    /// existing pending inserts already sitting at `pos`; `false`
    /// (`put_text`) lands after them.
    fn locate_insertion_index(
        &mut self,
        pos: usize,
        stop_before_pending_insert: bool,
    ) -> Result<usize, StoreError> {
        self.ensure_seeded();
        let mut acc = 0usize;
        let mut i = 0usize;
        while i < self.working.len() {
            let id = self.working[i];
            let seg = self.seg(id);
            if seg.state == SegmentState::PendingInsert {
                if acc == pos && stop_before_pending_insert {
                    return Ok(i);
                }
                i += 1;
                continue;
            }
            let len = seg.length;
            if acc == pos {
                return Ok(i);
            }
            if acc < pos && pos < acc + len {
                self.split_working_at(i, pos - acc);
                return Ok(i + 1);
            }
            acc += len;
            i += 1;
        }
        if acc == pos {
            Ok(self.working.len())
        } else {
            Err(StoreError::InvalidPosition)
        }
    }

    fn insert_at(
        &mut self,
        pos: usize,
        text: &[u8],
        stop_before_pending_insert: bool,
    ) -> Result<(), StoreError> {
        let index = self.locate_insertion_index(pos, stop_before_pending_insert)?;
        let id = self.alloc(Segment::new(text.to_vec(), SegmentState::PendingInsert));
        self.working.insert(index, id);
        Ok(())
    }

    /// Insert `s` at `pos`. Newer inserts land *after* existing pending
    /// inserts already at `pos` within this batch — used for the closing
    /// half of a wrapped range, so repeated wraps in one batch nest with
    /// the newest closing marker outermost.
    pub fn put_text(&mut self, pos: usize, s: &[u8]) -> Result<(), StoreError> {
        self.insert_at(pos, s, false)
    }

    /// Insert `s` at `pos`, landing *before* any existing pending inserts
    /// already at `pos`. This is the composition rule for plain text and
    /// every single-position marker: the most recently submitted insert
    /// ends up leftmost at that position.
    pub fn add_text(&mut self, pos: usize, s: &[u8]) -> Result<(), StoreError> {
        self.insert_at(pos, s, true)
    }

    /// Delete `len` visible bytes starting at `pos`. A `len` that overruns
    /// the visible tail deletes to the end rather than erroring.
    pub fn delete_range(&mut self, pos: usize, len: usize) -> Result<(), StoreError> {
        self.ensure_seeded();
        if pos > self.visible_length() {
            return Err(StoreError::InvalidPosition);
        }
        if len == 0 {
            return Ok(());
        }

        // Phase 1: walk to the first segment at-or-after `pos`, splitting
        // the boundary segment if `pos` falls strictly inside it.
        let mut acc = 0usize;
        let mut i = 0usize;
        while i < self.working.len() {
            let id = self.working[i];
            let seg = self.seg(id);
            if seg.state == SegmentState::PendingInsert {
                i += 1;
                continue;
            }
            if acc == pos {
                break;
            }
            let seglen = seg.length;
            if acc < pos && pos < acc + seglen {
                self.split_working_at(i, pos - acc);
                i += 1;
                break;
            }
            acc += seglen;
            i += 1;
        }

        // Phase 2: consume `remaining` visible bytes forward from `i`,
        // skipping (not touching) any `PendingInsert` segments in the way.
        let mut remaining = len;
        while remaining > 0 && i < self.working.len() {
            let id = self.working[i];
            let state = self.seg(id).state;
            if state == SegmentState::PendingInsert {
                i += 1;
                continue;
            }
            let seglen = self.seg(id).length;
            if seglen <= remaining {
                self.seg_mut(id).state = SegmentState::PendingDelete;
                remaining -= seglen;
                i += 1;
            } else {
                self.split_working_at(i, remaining);
                self.seg_mut(self.working[i]).state = SegmentState::PendingDelete;
                remaining = 0;
            }
        }
        Ok(())
    }

    /// Promote `working` to `committed`: drop every `PendingDelete`
    /// segment, rewrite every `PendingInsert` to `Committed`, clear
    /// `working`. No-op if `working` was never touched this version.
    pub fn commit(&mut self) {
        if !self.seeded {
            return;
        }
        let working = std::mem::take(&mut self.working);
        let mut new_committed = Vec::with_capacity(working.len());
        for id in working {
            match self.seg(id).state {
                SegmentState::PendingDelete => {}
                SegmentState::PendingInsert => {
                    self.seg_mut(id).state = SegmentState::Committed;
                    new_committed.push(id);
                }
                SegmentState::Committed => new_committed.push(id),
            }
        }
        self.committed = new_committed;
        self.seeded = false;
    }
}

impl Default for SegmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(store: &SegmentStore) -> String {
        String::from_utf8(store.flatten()).unwrap()
    }

    #[test]
    fn insert_into_empty_document() {
        let mut store = SegmentStore::new();
        // Plain-insert composition uses add_text: each new insert lands
        // before whatever pending insert already sits at that position.
        store.add_text(0, b"World").unwrap();
        store.add_text(0, b"Hello ").unwrap();
        store.commit();
        assert_eq!(flat(&store), "Hello World");
    }

    #[test]
    fn delete_shrinks_committed_text() {
        let mut store = SegmentStore::new();
        store.put_text(0, b"Hello World").unwrap();
        store.commit();
        store.delete_range(5, 6).unwrap();
        store.commit();
        assert_eq!(flat(&store), "Hello");
    }

    #[test]
    fn delete_len_overrunning_tail_deletes_to_end() {
        let mut store = SegmentStore::new();
        store.put_text(0, b"Hello").unwrap();
        store.commit();
        store.delete_range(2, 1000).unwrap();
        store.commit();
        assert_eq!(flat(&store), "He");
    }

    #[test]
    fn insert_out_of_range_is_invalid_position() {
        let mut store = SegmentStore::new();
        store.put_text(0, b"Hi").unwrap();
        store.commit();
        assert_eq!(store.put_text(10, b"x"), Err(StoreError::InvalidPosition));
    }

    #[test]
    fn pending_insert_invisible_to_position_arithmetic() {
        let mut store = SegmentStore::new();
        store.put_text(0, b"Hello").unwrap();
        store.commit();
        // Two successive inserts at the same pos, same baseline coordinate.
        store.put_text(5, b" World").unwrap();
        store.put_text(5, b"!").unwrap();
        store.commit();
        // put_text lands *after* existing pending inserts at the same pos,
        // so submission order is preserved: " World" then "!".
        assert_eq!(flat(&store), "Hello World!");
    }

    #[test]
    fn add_text_lands_before_existing_pending_insert_at_same_point() {
        let mut store = SegmentStore::new();
        store.put_text(0, b"text").unwrap();
        store.commit();
        store.put_text(0, b"[inner]").unwrap();
        store.add_text(0, b"[outer]").unwrap();
        store.commit();
        assert_eq!(flat(&store), "[outer][inner]text");
    }

    #[test]
    fn split_preserves_state_of_both_halves() {
        let mut store = SegmentStore::new();
        store.put_text(0, b"HelloWorld").unwrap();
        store.commit();
        store.delete_range(3, 0).unwrap(); // force ensure_seeded
        store.put_text(5, b"-").unwrap();
        store.commit();
        assert_eq!(flat(&store), "Hello-World");
    }

    #[test]
    fn commit_with_no_touched_working_is_noop() {
        let mut store = SegmentStore::new();
        store.put_text(0, b"Hello").unwrap();
        store.commit();
        let before = store.flatten();
        store.commit();
        assert_eq!(store.flatten(), before);
    }

    #[test]
    fn deleted_segment_state_reports_pending_delete() {
        let mut store = SegmentStore::new();
        store.put_text(0, b"Hello World").unwrap();
        store.commit();
        store.delete_range(0, 5).unwrap();
        assert_eq!(store.state_at(0), Some(SegmentState::PendingDelete));
        assert_eq!(store.state_at(6), Some(SegmentState::Committed));
    }
}
