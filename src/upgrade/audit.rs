//! JSON-lines audit trail. Every event of one invocation carries the same
//! `run` stamp so interleaved runs can be told apart afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::upgrade::paths::UpgradePaths;
use crate::upgrade::util::now_epoch_secs;

pub const AUDIT_FILE: &str = "upgrade-audit.log";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub run: String,
    pub phase: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    run: String,
}

impl AuditLog {
    pub fn new(paths: &UpgradePaths, run: impl Into<String>) -> Self {
        Self {
            path: paths.logs_dir.join(AUDIT_FILE),
            run: run.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, phase: &str, status: &str, message: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let event = AuditEvent {
            at_epoch_secs: now_epoch_secs()?,
            run: self.run.clone(),
            phase: phase.to_string(),
            status: status.to_string(),
            message: message.to_string(),
        };

        let line = format!("{}\n", serde_json::to_string(&event)?);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Audit writes never abort a migration.
pub fn record(log: Option<&AuditLog>, phase: &str, status: &str, message: &str) {
    let Some(log) = log else {
        return;
    };
    if let Err(err) = log.append(phase, status, message) {
        eprintln!("burst-upgrade audit warning: {err:#}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn paths_in(root: &Path) -> UpgradePaths {
        UpgradePaths {
            upgrade_home: root.to_path_buf(),
            logs_dir: root.join("logs"),
            scratch_root: root.join("scratch"),
            config_file: root.join("upgrade.toml"),
        }
    }

    #[test]
    fn events_share_the_run_stamp() {
        let tmp = tempdir().expect("tempdir");
        let log = AuditLog::new(&paths_in(tmp.path()), "2024.03.07_14.05.09");
        record(Some(&log), "plan", "ok", "source=/opt/db");
        record(Some(&log), "settings", "fixed", "config/burst/settings.xml: sortbyposition");

        let raw = fs::read_to_string(log.path()).expect("audit log");
        let events = raw
            .lines()
            .map(|line| serde_json::from_str::<AuditEvent>(line).expect("event"))
            .collect::<Vec<_>>();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.run == "2024.03.07_14.05.09"));
        assert_eq!(events[1].phase, "settings");
        assert_eq!(events[1].status, "fixed");
    }

    #[test]
    fn record_without_log_is_a_no_op() {
        record(None, "plan", "ok", "nothing written");
    }
}
