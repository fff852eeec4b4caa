use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, describe_plan, load_context};
use crate::upgrade::orchestrator::Orchestrator;
use crate::upgrade::plan::{MigrationPlan, Mode};
use crate::upgrade::storage::LocalStorage;

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub from: PathBuf,
    pub mode: Mode,
    pub server: bool,
}

pub fn run(opts: &PlanOptions) -> Result<CommandReport> {
    let (paths, cfg, notes) = load_context()?;
    let mut report = CommandReport::new("plan");
    report.merge(notes);

    let storage = LocalStorage::new(cfg.download.request_timeout_secs);
    let orchestrator = Orchestrator::new(&storage, &cfg)?.with_paths(&paths);

    let mut plan = MigrationPlan::new(opts.mode, opts.from.clone());
    plan.is_server_variant = opts.server;
    orchestrator.plan(&mut plan);

    if let Some(message) = &plan.error_message {
        report.issue(message.clone());
        return Ok(report);
    }

    describe_plan(&mut report, &plan);
    for found in &plan.discovered_config_files {
        report.detail(format!("config: {}", found.relative));
    }
    for found in &plan.discovered_script_files {
        report.detail(format!("script: {}", found.relative));
    }
    for found in &plan.discovered_template_folders {
        report.detail(format!("template: {}", found.relative));
    }
    report.detail(format!(
        "discovered configs={} scripts={} templates={}",
        plan.discovered_config_files.len(),
        plan.discovered_script_files.len(),
        plan.discovered_template_folders.len()
    ));
    Ok(report)
}
