use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, describe_migration, describe_plan, load_context};
use crate::upgrade::orchestrator::Orchestrator;
use crate::upgrade::plan::{CopyOptions, LicenseInfo, MigrationPlan, Mode};
use crate::upgrade::storage::LocalStorage;
use crate::upgrade::util::now_formatted;

#[derive(Debug, Clone, Default)]
pub struct UpdateNowOptions {
    pub install_dir: PathBuf,
    pub server: bool,
    pub product_version: Option<String>,
    pub license: LicenseInfo,
    pub copy_options: CopyOptions,
    pub keep_scratch: bool,
}

pub fn run(opts: &UpdateNowOptions) -> Result<CommandReport> {
    let (paths, mut cfg, notes) = load_context()?;
    let mut report = CommandReport::new("update-now");
    report.merge(notes);
    cfg.workspace.keep_scratch |= opts.keep_scratch;

    let mut plan = MigrationPlan::new(Mode::ReplaceLive, opts.install_dir.clone());
    plan.is_server_variant = opts.server;
    plan.copy_options = opts.copy_options;
    plan.license_info = opts.license.clone();
    plan.product_info.name = cfg.product.name.clone();
    plan.product_info.is_server_version = opts.server;
    if let Some(version) = &opts.product_version {
        plan.product_info.version = version.clone();
    }

    let storage = LocalStorage::new(cfg.download.request_timeout_secs);
    let orchestrator = Orchestrator::new(&storage, &cfg)?.with_paths(&paths);
    let migration = orchestrator.replace_live(&mut plan, &now_formatted())?;

    describe_plan(&mut report, &plan);
    describe_migration(&mut report, &migration);
    if let Some(scratch) = migration
        .scratch_dir
        .as_ref()
        .filter(|_| cfg.workspace.keep_scratch)
    {
        report.detail(format!("scratch kept at {}", scratch.display()));
    }
    Ok(report)
}
