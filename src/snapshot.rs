//! Snapshot writer: the flattened committed document, overwritten at a
//! fixed path on every session disconnect and on shutdown. Concurrent
//! disconnects must serialize through the document lock rather than
//! racing on the file.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::document::Document;

pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Overwrite the snapshot file with `document`'s flattened text.
    /// Callers must hold the document's write lock so two concurrent
    /// callers can't interleave their writes to the same file.
    pub fn write(&self, document: &Document) -> Result<()> {
        std::fs::write(&self.path, document.flatten())
            .with_context(|| format!("writing snapshot {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_overwrites_with_current_flatten() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("doc.md"));
        let mut doc = Document::new();
        doc.store().put_text(0, b"hello").unwrap();
        doc.commit();
        writer.write(&doc).unwrap();
        assert_eq!(std::fs::read(dir.path().join("doc.md")).unwrap(), b"hello");

        doc.store().put_text(5, b" world").unwrap();
        doc.commit();
        writer.write(&doc).unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("doc.md")).unwrap(),
            b"hello world"
        );
    }
}
