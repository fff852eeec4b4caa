use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, describe_migration, describe_plan, load_context};
use crate::upgrade::mem_storage::MemStorage;
use crate::upgrade::orchestrator::Orchestrator;
use crate::upgrade::plan::{CopyOptions, MigrationPlan, Mode};
use crate::upgrade::storage::LocalStorage;

#[derive(Debug, Clone)]
pub struct MigrateCopyOptions {
    pub from: PathBuf,
    pub to: PathBuf,
    pub copy_options: CopyOptions,
    pub dry_run: bool,
}

pub fn run(opts: &MigrateCopyOptions) -> Result<CommandReport> {
    let (paths, cfg, notes) = load_context()?;
    let mut report = CommandReport::new("migrate-copy");
    report.merge(notes);

    let local = LocalStorage::new(cfg.download.request_timeout_secs);
    let mut plan = MigrationPlan::new(Mode::CopyToNew, opts.from.clone());
    plan.target_directory = Some(opts.to.clone());
    plan.copy_options = opts.copy_options;

    if opts.dry_run {
        let mem = MemStorage::new();
        let mirrored = mem.mirror_from(&local, &opts.from)? + mem.mirror_from(&local, &opts.to)?;
        report.detail(format!("dry_run=true mirrored_files={mirrored}"));

        let orchestrator = Orchestrator::new(&mem, &cfg)?.with_paths(&paths);
        let migration = orchestrator.copy_to_new(&mut plan)?;
        describe_plan(&mut report, &plan);
        describe_migration(&mut report, &migration);
        for path in mem.written_paths() {
            report.detail(format!("would write {}", path.display()));
        }
        return Ok(report);
    }

    let orchestrator = Orchestrator::new(&local, &cfg)?.with_paths(&paths);
    let migration = orchestrator.copy_to_new(&mut plan)?;
    describe_plan(&mut report, &plan);
    describe_migration(&mut report, &migration);
    Ok(report)
}
