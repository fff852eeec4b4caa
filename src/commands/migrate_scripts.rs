use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, describe_migration, load_context};
use crate::upgrade::orchestrator::Orchestrator;
use crate::upgrade::storage::LocalStorage;

#[derive(Debug, Clone)]
pub struct MigrateScriptsOptions {
    pub from: PathBuf,
    pub to: PathBuf,
    pub legacy_version: Option<String>,
}

pub fn run(opts: &MigrateScriptsOptions) -> Result<CommandReport> {
    let (paths, cfg, notes) = load_context()?;
    let mut report = CommandReport::new("migrate-scripts");
    report.merge(notes);

    if !opts.from.is_dir() {
        report.issue(format!("script folder not found: {}", opts.from.display()));
        return Ok(report);
    }

    let storage = LocalStorage::new(cfg.download.request_timeout_secs);
    let orchestrator = Orchestrator::new(&storage, &cfg)?.with_paths(&paths);
    let migration =
        orchestrator.migrate_script_batch(&opts.from, &opts.to, opts.legacy_version.as_deref())?;

    describe_migration(&mut report, &migration);
    report.detail(format!("scripts_migrated={}", migration.scripts_migrated.len()));
    Ok(report)
}
