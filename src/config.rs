//! Startup configuration.
//!
//! Startup takes a single positional argument, the broadcast interval
//! in milliseconds. Everything else the external-interface shims need
//! (bind address, role file, snapshot path, audit log path, session
//! capacity, log level) has to come from *somewhere* — `clap::Parser`
//! derives the CLI the way the rest of the ecosystem does it, with an
//! optional TOML overlay for the fields an operator would rather not
//! repeat on every invocation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "scribe-server", about = "Server-mediated collaborative Markdown editor")]
pub struct Args {
    /// Broadcast interval in milliseconds — how often the batch loop ticks.
    pub interval_ms: u64,

    /// Address to bind the client-facing TCP listener on.
    #[arg(long)]
    pub bind: Option<String>,

    /// Path to the line-oriented role store (`name SP role` per line).
    #[arg(long)]
    pub role_file: Option<PathBuf>,

    /// Path the flattened document is snapshotted to on disconnect/shutdown.
    #[arg(long)]
    pub snapshot_file: Option<PathBuf>,

    /// Path the append-only audit log is written to.
    #[arg(long)]
    pub audit_file: Option<PathBuf>,

    /// Maximum number of concurrently admitted sessions.
    #[arg(long)]
    pub session_capacity: Option<usize>,

    /// Queue capacity before further enqueues are silently dropped.
    /// Unbounded if unset.
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Optional TOML file overlaying any of the above.
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Tracing filter directive, e.g. `info` or `scribe=debug`.
    #[arg(long)]
    pub log_level: Option<String>,
}

/// The TOML overlay shape — every field optional, filling in whatever
/// the operator didn't pass as a flag.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    bind: Option<String>,
    role_file: Option<PathBuf>,
    snapshot_file: Option<PathBuf>,
    audit_file: Option<PathBuf>,
    session_capacity: Option<usize>,
    queue_capacity: Option<usize>,
    log_level: Option<String>,
}

/// Fully resolved configuration: an explicit CLI flag always wins; a
/// `config_file` overlay value is used only for a flag the operator
/// left unset; a hardcoded default fills whatever neither supplied —
/// see `Config::resolve`.
#[derive(Debug, Clone)]
pub struct Config {
    pub interval_ms: u64,
    pub bind: String,
    pub role_file: PathBuf,
    pub snapshot_file: PathBuf,
    pub audit_file: PathBuf,
    pub session_capacity: usize,
    pub queue_capacity: Option<usize>,
    pub log_level: String,
}

impl Config {
    pub fn resolve(args: Args) -> Result<Self> {
        let overlay = match &args.config_file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => ConfigFile::default(),
        };
        Ok(Self {
            interval_ms: args.interval_ms,
            bind: args.bind.or(overlay.bind).unwrap_or_else(|| "0.0.0.0:7878".to_string()),
            role_file: args
                .role_file
                .or(overlay.role_file)
                .unwrap_or_else(|| PathBuf::from("roles.txt")),
            snapshot_file: args
                .snapshot_file
                .or(overlay.snapshot_file)
                .unwrap_or_else(|| PathBuf::from("doc.md")),
            audit_file: args
                .audit_file
                .or(overlay.audit_file)
                .unwrap_or_else(|| PathBuf::from("audit.log")),
            session_capacity: args.session_capacity.or(overlay.session_capacity).unwrap_or(100),
            queue_capacity: args.queue_capacity.or(overlay.queue_capacity),
            log_level: args.log_level.or(overlay.log_level).unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn resolve_without_config_file_uses_cli_defaults() {
        let args = Args::parse_from(["scribe-server", "250"]);
        let config = Config::resolve(args).unwrap();
        assert_eq!(config.interval_ms, 250);
        assert_eq!(config.bind, "0.0.0.0:7878");
        assert_eq!(config.session_capacity, 100);
    }

    #[test]
    fn config_file_overlay_fills_in_unset_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("scribe.toml");
        std::fs::write(&config_path, "bind = \"127.0.0.1:9000\"\nsession_capacity = 5\n").unwrap();
        let args = Args::parse_from([
            "scribe-server",
            "250",
            "--config-file",
            config_path.to_str().unwrap(),
        ]);
        let config = Config::resolve(args).unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.session_capacity, 5);
    }

    #[test]
    fn explicit_flag_wins_over_config_file_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("scribe.toml");
        std::fs::write(&config_path, "bind = \"127.0.0.1:9000\"\n").unwrap();
        let args = Args::parse_from([
            "scribe-server",
            "250",
            "--bind",
            "10.0.0.1:1234",
            "--config-file",
            config_path.to_str().unwrap(),
        ]);
        let config = Config::resolve(args).unwrap();
        assert_eq!(config.bind, "10.0.0.1:1234");
    }
}
