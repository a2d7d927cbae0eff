//! Role store: a read-only, line-oriented text file mapping user names to
//! permissions, re-read on every authentication attempt rather than
//! cached — the server never needs to observe an edit to the file while
//! running, so there is nothing to invalidate.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// A user's write capability, parsed from the `role` column of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    pub fn can_write(self) -> bool {
        matches!(self, Permission::Write)
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "write" => Some(Permission::Write),
            "read" => Some(Permission::Read),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Permission::Read => "read",
            Permission::Write => "write",
        };
        write!(f, "{token}")
    }
}

/// Handle to the on-disk role file. Holds only a path — every lookup
/// re-reads and re-parses the file, so an operator editing it takes
/// effect on the very next login.
pub struct RoleStore {
    path: PathBuf,
}

impl RoleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Look up `user`'s permission. `None` if the name is unlisted or the
    /// file entry is malformed — both are treated as `UNAUTHORISED` by
    /// the caller.
    pub fn lookup(&self, user: &str) -> Option<Permission> {
        let table = Self::load(&self.path).ok()?;
        table.get(user).copied()
    }

    fn load(path: &Path) -> Result<HashMap<String, Permission>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading role store {}", path.display()))?;
        let mut table = HashMap::new();
        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let name = parts
                .next()
                .with_context(|| format!("role store line {}: missing name", lineno + 1))?;
            let role = parts
                .next()
                .with_context(|| format!("role store line {}: missing role", lineno + 1))?;
            let permission = Permission::parse(role)
                .with_context(|| format!("role store line {}: unknown role {role:?}", lineno + 1))?;
            table.insert(name.to_string(), permission);
        }
        Ok(table)
    }

    /// Validate the store is readable and well-formed at startup, so a
    /// typo is caught before the first client connects rather than
    /// silently locking everyone out.
    pub fn validate(&self) -> Result<()> {
        let table = Self::load(&self.path)?;
        if table.is_empty() {
            bail!("role store {} has no entries", self.path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_with(contents: &str) -> (tempfile::TempDir, RoleStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roles.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{contents}").unwrap();
        (dir, RoleStore::new(path))
    }

    #[test]
    fn lookup_parses_write_and_read_roles() {
        let (_dir, store) = store_with("alice write\nbob read\n");
        assert_eq!(store.lookup("alice"), Some(Permission::Write));
        assert_eq!(store.lookup("bob"), Some(Permission::Read));
    }

    #[test]
    fn lookup_unlisted_user_is_none() {
        let (_dir, store) = store_with("alice write\n");
        assert_eq!(store.lookup("carol"), None);
    }

    #[test]
    fn reloads_file_contents_on_every_lookup() {
        let (dir, store) = store_with("alice write\n");
        assert_eq!(store.lookup("alice"), Some(Permission::Write));
        std::fs::write(dir.path().join("roles.txt"), "alice read\n").unwrap();
        assert_eq!(store.lookup("alice"), Some(Permission::Read));
    }

    #[test]
    fn validate_rejects_empty_store() {
        let (_dir, store) = store_with("");
        assert!(store.validate().is_err());
    }
}
