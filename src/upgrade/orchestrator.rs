//! Drives one migration run over a [`Storage`] backend, in either
//! copy-to-new or replace-live mode.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::UpgradeError;
use crate::upgrade::audit::{self, AuditLog};
use crate::upgrade::config::UpgradeConfig;
use crate::upgrade::discovery;
use crate::upgrade::layout;
use crate::upgrade::paths::UpgradePaths;
use crate::upgrade::plan::{CopyOptions, MigrationPlan, Mode};
use crate::upgrade::script::{self, ScriptMigrator};
use crate::upgrade::settings_migration;
use crate::upgrade::settings_tree::SettingsTree;
use crate::upgrade::storage::Storage;
use crate::upgrade::util::{file_name_of, now_formatted};
use crate::upgrade::warn::{self, IntegrityWarning};

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub mode: Option<Mode>,
    pub destination: PathBuf,
    pub error_message: Option<String>,
    pub settings_migrated: Vec<String>,
    pub settings_copied: Vec<String>,
    pub scripts_migrated: Vec<String>,
    pub templates_copied: Vec<String>,
    pub files_copied: Vec<String>,
    pub skipped: Vec<String>,
    pub warnings: Vec<IntegrityWarning>,
    pub backup_archive: Option<PathBuf>,
    pub backup_sha256: Option<String>,
    pub backup_entries: Option<usize>,
    pub scratch_dir: Option<PathBuf>,
}

impl MigrationReport {
    fn new(mode: Mode, destination: PathBuf) -> Self {
        Self {
            mode: Some(mode),
            destination,
            ..Self::default()
        }
    }

    pub fn ok(&self) -> bool {
        self.error_message.is_none()
    }

    fn warn_all(&mut self, warnings: Vec<IntegrityWarning>) {
        for warning in &warnings {
            warn::emit(warning);
        }
        self.warnings.extend(warnings);
    }
}

/// Re-roots a discovered path onto another copy of the same tree.
fn rebase(path: &Path, from_root: &Path, to_root: &Path) -> PathBuf {
    match path.strip_prefix(from_root) {
        Ok(relative) if relative.as_os_str().is_empty() => to_root.to_path_buf(),
        Ok(relative) => to_root.join(relative),
        Err(_) => path.to_path_buf(),
    }
}

fn bundle_file_name(url: &str) -> String {
    url.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or("bundle.zip")
        .to_string()
}

pub fn backup_archive_name(product: &str, server: bool, version: &str, stamp: &str) -> String {
    let variant = if server { "-server" } else { "" };
    let version = if version.trim().is_empty() {
        "unknown"
    } else {
        version.trim()
    };
    format!("{}{variant}-{version}-{stamp}.zip", product.to_lowercase())
}

pub struct Orchestrator<'a> {
    storage: &'a dyn Storage,
    config: &'a UpgradeConfig,
    audit_log: Option<AuditLog>,
    scratch_root: PathBuf,
    scripts: ScriptMigrator,
}

impl<'a> Orchestrator<'a> {
    pub fn new(storage: &'a dyn Storage, config: &'a UpgradeConfig) -> Result<Self> {
        Ok(Self {
            storage,
            config,
            audit_log: None,
            scratch_root: std::env::temp_dir().join("upg-db"),
            scripts: ScriptMigrator::new()?,
        })
    }

    /// Audit events go to `paths.logs_dir`; the scratch workspace is
    /// allocated under `paths.scratch_root`.
    pub fn with_paths(mut self, paths: &UpgradePaths) -> Self {
        self.audit_log = Some(AuditLog::new(paths, now_formatted()));
        self.scratch_root = paths.scratch_root.clone();
        self
    }

    pub fn with_scratch_root(mut self, scratch_root: PathBuf) -> Self {
        self.scratch_root = scratch_root;
        self
    }

    fn audit(&self, phase: &str, status: &str, message: &str) {
        audit::record(self.audit_log.as_ref(), phase, status, message);
    }

    /// Discovery only. The plan's error message is set when the source is
    /// not an installation.
    pub fn plan(&self, plan: &mut MigrationPlan) {
        discovery::discover(self.storage, plan, &self.config.product);
        match &plan.error_message {
            Some(message) => self.audit("plan", "error", message),
            None => self.audit(
                "plan",
                "ok",
                &format!(
                    "source={} version={} configs={} scripts={} templates={}",
                    plan.source_directory.display(),
                    plan.source_version,
                    plan.discovered_config_files.len(),
                    plan.discovered_script_files.len(),
                    plan.discovered_template_folders.len()
                ),
            ),
        }
    }

    pub fn copy_to_new(&self, plan: &mut MigrationPlan) -> Result<MigrationReport> {
        let Some(target) = plan.target_directory.clone() else {
            bail!("copy-to-new requires a destination installation");
        };
        let mut report = MigrationReport::new(Mode::CopyToNew, target.clone());

        self.plan(plan);
        if let Some(message) = &plan.error_message {
            report.error_message = Some(message.clone());
            return Ok(report);
        }

        let source = plan.source_directory.clone();
        self.migrate_into(plan, &source, &target, &mut report)?;
        Ok(report)
    }

    /// Downloads the newest bundle, migrates the live installation into it
    /// and replaces the live tree. The pre-migration snapshot is archived
    /// before anything live is removed.
    pub fn replace_live(&self, plan: &mut MigrationPlan, stamp: &str) -> Result<MigrationReport> {
        let live = plan.source_directory.clone();
        let mut report = MigrationReport::new(Mode::ReplaceLive, live.clone());

        self.plan(plan);
        if let Some(message) = &plan.error_message {
            report.error_message = Some(message.clone());
            return Ok(report);
        }

        let product = &self.config.product;
        let server = plan.is_server_variant;
        let home = if server {
            live.parent().map(Path::to_path_buf).unwrap_or_else(|| live.clone())
        } else {
            live.clone()
        };
        if self.scratch_root.starts_with(&home) {
            bail!(
                "scratch workspace {} must not live inside the installation {}",
                self.scratch_root.display(),
                home.display()
            );
        }

        let scratch = self.allocate_scratch(stamp);
        report.scratch_dir = Some(scratch.clone());
        let to_side = scratch.join("to");
        let from_side = scratch.join("from");

        let url = if server {
            &self.config.download.server_url
        } else {
            &self.config.download.desktop_url
        };
        let bundle = scratch.join("download").join(bundle_file_name(url));
        self.storage.download(url, &bundle)?;
        self.storage
            .extract_archive(&bundle, &to_side)
            .with_context(|| format!("failed to unpack release bundle from {url}"))?;
        let top = self.bundle_top_folder(&to_side);
        let new_install = if server {
            top.join(layout::SERVER_SUBDIR)
        } else {
            top.clone()
        };
        self.audit("download", "ok", &format!("url={url} top={}", top.display()));

        let snapshot_home = from_side.join(&product.name);
        self.storage.copy(&home, &snapshot_home)?;
        let snapshot_install = rebase(&live, &home, &snapshot_home);
        self.audit("snapshot", "ok", &snapshot_home.display().to_string());

        self.migrate_into(plan, &snapshot_install, &new_install, &mut report)?;

        let version = if plan.product_info.version.trim().is_empty() {
            plan.source_version.clone()
        } else {
            plan.product_info.version.clone()
        };
        let archive_name = backup_archive_name(&product.name, server, &version, stamp);
        let staged_archive = scratch.join(&archive_name);
        self.storage.write_archive(&snapshot_home, &staged_archive)?;
        let digest = self.storage.file_sha256(&staged_archive)?;

        // the running executable stays; the bundle's copy is left in scratch
        let live_exe = live.join(&product.main_executable);
        let bundle_exe = rebase(&live_exe, &home, &top);
        let final_archive = live.join(layout::BACKUP_DIR).join(&archive_name);
        let replaced = self
            .clear_except(&home, &live_exe)
            .and_then(|()| self.copy_except(&top, &home, &bundle_exe))
            .and_then(|()| self.storage.rename(&staged_archive, &final_archive));
        if let Err(err) = replaced {
            let err = err.context(format!(
                "failed to replace {}; the pre-upgrade backup is kept at {}",
                home.display(),
                staged_archive.display()
            ));
            self.audit("replace", "error", &format!("{err:#}"));
            return Err(err);
        }
        self.audit("replace", "ok", &home.display().to_string());

        match self.storage.list_archive(&final_archive) {
            Ok(names) => report.backup_entries = Some(names.len()),
            Err(err) => report.skipped.push(format!("backup listing: {err:#}")),
        }
        self.audit(
            "backup",
            "ok",
            &format!("archive={} sha256={digest}", final_archive.display()),
        );
        report.backup_archive = Some(final_archive);
        report.backup_sha256 = Some(digest);

        if self.config.workspace.keep_scratch {
            self.audit("cleanup", "skipped", &scratch.display().to_string());
        } else {
            match self.storage.remove(&scratch) {
                Ok(()) => self.audit("cleanup", "ok", &scratch.display().to_string()),
                Err(err) => report.skipped.push(format!("scratch cleanup: {err:#}")),
            }
        }

        Ok(report)
    }

    /// Empties `dir` except for `keep`, descending only into the
    /// directories on the way to it.
    fn clear_except(&self, dir: &Path, keep: &Path) -> Result<()> {
        for entry in self.storage.list_dir(dir)? {
            if entry.path == keep {
                continue;
            }
            if entry.is_dir && keep.starts_with(&entry.path) {
                self.clear_except(&entry.path, keep)?;
            } else {
                self.storage.remove(&entry.path)?;
            }
        }
        Ok(())
    }

    fn copy_except(&self, from: &Path, to: &Path, skip: &Path) -> Result<()> {
        for entry in self.storage.list_dir(from)? {
            if entry.path == skip {
                continue;
            }
            let dest = to.join(&entry.name);
            if entry.is_dir && skip.starts_with(&entry.path) {
                self.storage.create_dir_all(&dest)?;
                self.copy_except(&entry.path, &dest, skip)?;
            } else {
                self.storage.copy(&entry.path, &dest)?;
            }
        }
        Ok(())
    }

    /// Unreadable or non-UTF-8 files are recorded as skipped and the run
    /// goes on without them.
    fn read_text_asset(
        &self,
        path: &Path,
        label: &str,
        phase: &str,
        report: &mut MigrationReport,
    ) -> Option<String> {
        match self.storage.read_to_string(path) {
            Ok(text) => Some(text),
            Err(err) => {
                self.audit(phase, "error", &format!("{label}: {err:#}"));
                report.skipped.push(format!("{label}: {err:#}"));
                None
            }
        }
    }

    /// Migrates every `.groovy` file directly under `from_dir` into the
    /// installation's scripts tree, nested under `legacy_version` when set.
    pub fn migrate_script_batch(
        &self,
        from_dir: &Path,
        install_root: &Path,
        legacy_version: Option<&str>,
    ) -> Result<MigrationReport> {
        let mut report = MigrationReport::new(Mode::CopyToNew, install_root.to_path_buf());
        for entry in self.storage.list_dir(from_dir)? {
            let is_script = !entry.is_dir
                && entry
                    .path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(layout::SCRIPT_EXTENSION));
            if !is_script {
                continue;
            }
            let Some(text) = self.read_text_asset(&entry.path, &entry.name, "scripts", &mut report)
            else {
                continue;
            };
            let migrated = self.scripts.migrate(&text, &entry.name);
            let dest = script::destination_path_for(install_root, &entry.name, legacy_version);
            self.storage.write(&dest, migrated.text.as_bytes())?;
            report.warn_all(migrated.warnings);
            report.scripts_migrated.push(dest.display().to_string());
        }
        self.audit(
            "scripts",
            "ok",
            &format!("batch={} migrated={}", from_dir.display(), report.scripts_migrated.len()),
        );
        Ok(report)
    }

    fn allocate_scratch(&self, stamp: &str) -> PathBuf {
        let base = self.scratch_root.join(stamp);
        if !self.storage.exists(&base) {
            return base;
        }
        let mut suffix = 1;
        loop {
            let candidate = self.scratch_root.join(format!("{stamp}-{suffix}"));
            if !self.storage.exists(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    fn bundle_top_folder(&self, to_side: &Path) -> PathBuf {
        let product = &self.config.product.name;
        self.storage
            .list_dir(to_side)
            .ok()
            .and_then(|entries| {
                entries
                    .into_iter()
                    .find(|entry| entry.is_dir && entry.name.starts_with(product.as_str()))
            })
            .map(|entry| entry.path)
            .unwrap_or_else(|| to_side.join(product))
    }

    fn load_canonical(&self, dest: &Path) -> Result<SettingsTree> {
        let path = dest.join(layout::canonical_settings_path());
        let text = self
            .storage
            .read_to_string(&path)
            .map_err(|_| UpgradeError::MissingDefaults { path: path.clone() })?;
        let tree = SettingsTree::parse(&text).map_err(|err| UpgradeError::InvalidSettings {
            path: path.clone(),
            reason: format!("{err:#}"),
        })?;
        Ok(tree)
    }

    fn migrate_into(
        &self,
        plan: &MigrationPlan,
        source: &Path,
        dest: &Path,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let canonical = self.load_canonical(dest)?;

        self.migrate_settings_files(plan, source, dest, &canonical, report)?;
        self.copy_first_found(
            source,
            dest,
            layout::INTERNAL_PROPERTIES_FILE,
            "internal properties",
            report,
        )?;
        self.migrate_scripts(plan, source, dest, report)?;
        self.copy_templates(plan, source, dest, report)?;
        self.copy_optional_folders(plan.copy_options, source, dest, report);
        if plan.copy_options.license {
            self.copy_first_found(source, dest, layout::LICENSE_FILE, "license", report)?;
        }
        Ok(())
    }

    fn migrate_settings_files(
        &self,
        plan: &MigrationPlan,
        source: &Path,
        dest: &Path,
        canonical: &SettingsTree,
        report: &mut MigrationReport,
    ) -> Result<()> {
        for found in &plan.discovered_config_files {
            let from = rebase(&found.path, &plan.source_directory, source);
            let to = dest.join(layout::CONFIG_DIR).join(&found.relative);
            let label = format!("{}/{}", layout::CONFIG_DIR, found.relative);
            let Some(text) = self.read_text_asset(&from, &label, "settings", report) else {
                continue;
            };

            // other product XML living under config/ is carried over as is
            if matches!(SettingsTree::parse(&text), Ok(tree) if tree.settings().is_none()) {
                self.storage.write(&to, text.as_bytes())?;
                report.settings_copied.push(label);
                continue;
            }

            match settings_migration::migrate_settings(&text, canonical, &found.name, &label) {
                Ok(migrated) => {
                    self.storage.write(&to, migrated.to_xml().as_bytes())?;
                    if !migrated.fixed_paths.is_empty() {
                        self.audit(
                            "settings",
                            "fixed",
                            &format!("{label}: {}", migrated.fixed_paths.join(",")),
                        );
                    }
                    report.warn_all(migrated.warnings);
                    report.settings_migrated.push(label);
                }
                Err(err) => {
                    self.audit("settings", "error", &format!("{err:#}"));
                    report.skipped.push(format!("{label}: {err:#}"));
                }
            }
        }
        self.audit(
            "settings",
            "ok",
            &format!(
                "migrated={} copied={}",
                report.settings_migrated.len(),
                report.settings_copied.len()
            ),
        );
        Ok(())
    }

    fn migrate_scripts(
        &self,
        plan: &MigrationPlan,
        source: &Path,
        dest: &Path,
        report: &mut MigrationReport,
    ) -> Result<()> {
        for found in &plan.discovered_script_files {
            let from = rebase(&found.path, &plan.source_directory, source);
            let label = format!("{}/{}", layout::SCRIPTS_BURST_DIR, found.relative);
            let Some(text) = self.read_text_asset(&from, &label, "scripts", report) else {
                continue;
            };
            let migrated = self.scripts.migrate(&text, &label);
            let to = script::destination_path_for(dest, &found.relative, None);
            self.storage.write(&to, migrated.text.as_bytes())?;
            report.warn_all(migrated.warnings);
            report.scripts_migrated.push(label);
        }
        self.audit(
            "scripts",
            "ok",
            &format!("migrated={}", report.scripts_migrated.len()),
        );
        Ok(())
    }

    fn copy_templates(
        &self,
        plan: &MigrationPlan,
        source: &Path,
        dest: &Path,
        report: &mut MigrationReport,
    ) -> Result<()> {
        for found in &plan.discovered_template_folders {
            let from = rebase(&found.path, &plan.source_directory, source);
            let to = dest.join(layout::TEMPLATES_DIR).join(&found.relative);
            self.storage.copy(&from, &to)?;
            report
                .templates_copied
                .push(format!("{}/{}", layout::TEMPLATES_DIR, found.relative));
        }
        self.audit(
            "templates",
            "ok",
            &format!("copied={}", report.templates_copied.len()),
        );
        Ok(())
    }

    fn copy_optional_folders(
        &self,
        options: CopyOptions,
        source: &Path,
        dest: &Path,
        report: &mut MigrationReport,
    ) {
        let folders = [
            (options.output, layout::OUTPUT_DIR),
            (options.logs, layout::LOGS_DIR),
            (options.quarantine, layout::QUARANTINE_DIR),
            (options.backup, layout::BACKUP_DIR),
        ];
        for (enabled, folder) in folders {
            if !enabled {
                continue;
            }
            let from = source.join(folder);
            if !self.storage.is_dir(&from) {
                report.skipped.push(format!("{folder}: not present in source"));
                continue;
            }
            match self.storage.copy(&from, &dest.join(folder)) {
                Ok(()) => report.files_copied.push(folder.to_string()),
                Err(err) => {
                    self.audit("optional-copy", "error", &format!("{folder}: {err:#}"));
                    report.skipped.push(format!("{folder}: {err:#}"));
                }
            }
        }
        self.audit(
            "optional-copy",
            "ok",
            &format!("copied={}", report.files_copied.join(",")),
        );
    }

    /// Internal files moved from `config/burst/internal` to
    /// `config/_internal`; the current location wins when both exist.
    fn copy_first_found(
        &self,
        source: &Path,
        dest: &Path,
        file_name: &str,
        what: &str,
        report: &mut MigrationReport,
    ) -> Result<()> {
        let candidates = [
            source.join(layout::INTERNAL_DIR).join(file_name),
            source.join(layout::LEGACY_INTERNAL_DIR).join(file_name),
        ];
        let Some(from) = candidates.iter().find(|path| self.storage.exists(path)) else {
            report.skipped.push(format!("{what}: not present in source"));
            return Ok(());
        };
        let to = dest.join(layout::INTERNAL_DIR).join(file_name);
        self.storage.copy(from, &to)?;
        report
            .files_copied
            .push(format!("{}/{}", layout::INTERNAL_DIR, file_name_of(&to)));
        Ok(())
    }
}
