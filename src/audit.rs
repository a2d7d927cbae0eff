//! Append-only audit log: every delta ever broadcast, concatenated in
//! order. Backs the `LOG?` query.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening audit log {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Append `delta` verbatim. Delta text already ends in `\n` (the
    /// `END\n` terminator), so no extra separator is added.
    pub fn append(&self, delta: &str) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        file.write_all(delta.as_bytes())
            .with_context(|| format!("appending to audit log {}", self.path.display()))
    }

    /// The full log contents, for `LOG?` — the concatenation of every
    /// delta record ever produced.
    pub fn read_all(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading audit log {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::open(dir.path().join("audit.log")).unwrap();
        log.append("VERSION 1\nEDIT alice INSERT 0 x SUCCESS\nEND\n")
            .unwrap();
        log.append("VERSION 2\nEDIT bob DEL 0 1 SUCCESS\nEND\n")
            .unwrap();
        let all = log.read_all().unwrap();
        assert_eq!(
            all,
            "VERSION 1\nEDIT alice INSERT 0 x SUCCESS\nEND\nVERSION 2\nEDIT bob DEL 0 1 SUCCESS\nEND\n"
        );
    }

    #[test]
    fn opening_existing_log_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        {
            let log = AuditLog::open(&path).unwrap();
            log.append("VERSION 1\nEND\n").unwrap();
        }
        let log = AuditLog::open(&path).unwrap();
        log.append("VERSION 2\nEND\n").unwrap();
        assert_eq!(log.read_all().unwrap(), "VERSION 1\nEND\nVERSION 2\nEND\n");
    }
}
