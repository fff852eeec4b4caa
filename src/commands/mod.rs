pub mod migrate_copy;
pub mod migrate_scripts;
pub mod plan;
pub mod update_now;

use anyhow::Result;
use serde::Serialize;

use crate::upgrade::config::{self, UpgradeConfig};
use crate::upgrade::orchestrator::MigrationReport;
use crate::upgrade::paths::{UpgradePaths, resolve_paths};
use crate::upgrade::plan::MigrationPlan;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }

    pub fn merge(&mut self, mut other: CommandReport) {
        self.ok &= other.ok;
        self.details.append(&mut other.details);
        self.issues.append(&mut other.issues);
    }
}

/// Resolved paths and config, plus notes about the environment.
pub fn load_context() -> Result<(UpgradePaths, UpgradeConfig, CommandReport)> {
    let paths = resolve_paths()?;
    let cfg = config::load_config(&paths)?;

    let mut notes = CommandReport::new("config");
    if paths.config_file.exists() {
        notes.detail(format!("config_file={}", paths.config_file.display()));
    }
    for key in config::unknown_env_keys() {
        notes.detail(format!("config note: unknown env {key} is ignored"));
    }
    Ok((paths, cfg, notes))
}

pub fn describe_plan(report: &mut CommandReport, plan: &MigrationPlan) {
    report.detail(format!("mode={}", plan.mode.as_str()));
    report.detail(format!("source={}", plan.source_directory.display()));
    if let Some(target) = &plan.target_directory {
        report.detail(format!("target={}", target.display()));
    }
    if !plan.source_version.is_empty() {
        report.detail(format!("source_version={}", plan.source_version));
    }
    report.detail(format!("server_variant={}", plan.is_server_variant));
    for note in &plan.notes {
        report.detail(format!("note: {note}"));
    }
}

pub fn describe_migration(report: &mut CommandReport, migration: &MigrationReport) {
    if let Some(message) = &migration.error_message {
        report.issue(message.clone());
        return;
    }
    for path in &migration.settings_migrated {
        report.detail(format!("settings migrated: {path}"));
    }
    for path in &migration.settings_copied {
        report.detail(format!("settings copied: {path}"));
    }
    for path in &migration.scripts_migrated {
        report.detail(format!("script migrated: {path}"));
    }
    for path in &migration.templates_copied {
        report.detail(format!("template copied: {path}"));
    }
    for path in &migration.files_copied {
        report.detail(format!("copied: {path}"));
    }
    for skipped in &migration.skipped {
        report.detail(format!("skipped {skipped}"));
    }
    if !migration.warnings.is_empty() {
        report.detail(format!("integrity_warnings={}", migration.warnings.len()));
    }
    if let Some(archive) = &migration.backup_archive {
        report.detail(format!("backup={}", archive.display()));
    }
    if let Some(digest) = &migration.backup_sha256 {
        report.detail(format!("backup_sha256={digest}"));
    }
    if let Some(entries) = migration.backup_entries {
        report.detail(format!("backup_entries={entries}"));
    }
}
