//! Read-only discovery pass over a source installation.

use std::path::{Path, PathBuf};

use crate::error::UpgradeError;
use crate::upgrade::config::ProductConfig;
use crate::upgrade::layout;
use crate::upgrade::plan::{DiscoveredAsset, MigrationPlan};
use crate::upgrade::settings_tree::SettingsTree;
use crate::upgrade::storage::Storage;
use crate::upgrade::util::{file_name_of, slash_path};

pub fn installation_marker(source: &Path, product: &ProductConfig) -> PathBuf {
    source.join(&product.main_executable)
}

pub fn check_installation(
    storage: &dyn Storage,
    source: &Path,
    product: &ProductConfig,
) -> Result<(), UpgradeError> {
    if storage.exists(&installation_marker(source, product)) {
        return Ok(());
    }
    Err(UpgradeError::MissingInstallation {
        marker: product.main_executable.clone(),
        path: source.to_path_buf(),
    })
}

fn is_excluded(relative: &str, excluded: &[&str]) -> bool {
    excluded
        .iter()
        .any(|prefix| relative == *prefix || relative.starts_with(&format!("{prefix}/")))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}

fn asset(path: PathBuf, base: &Path) -> DiscoveredAsset {
    let relative = slash_path(path.strip_prefix(base).unwrap_or(&path));
    DiscoveredAsset {
        name: file_name_of(&path),
        path,
        relative,
    }
}

/// Files under `base` with `extension`, minus the excluded subtrees.
fn walk_assets(
    storage: &dyn Storage,
    base: &Path,
    extension: &str,
    excluded: &[&str],
) -> anyhow::Result<Vec<DiscoveredAsset>> {
    if !storage.is_dir(base) {
        return Ok(Vec::new());
    }
    Ok(storage
        .walk_files(base)?
        .into_iter()
        .filter(|path| has_extension(path, extension))
        .map(|path| asset(path, base))
        .filter(|found| !is_excluded(&found.relative, excluded))
        .collect())
}

pub fn discover_config_files(
    storage: &dyn Storage,
    source: &Path,
) -> anyhow::Result<Vec<DiscoveredAsset>> {
    walk_assets(
        storage,
        &source.join(layout::CONFIG_DIR),
        "xml",
        layout::CONFIG_EXCLUDED,
    )
}

/// Customized scripts only: empty placeholder scripts are skipped.
pub fn discover_script_files(
    storage: &dyn Storage,
    source: &Path,
) -> anyhow::Result<Vec<DiscoveredAsset>> {
    let candidates = walk_assets(
        storage,
        &source.join(layout::SCRIPTS_BURST_DIR),
        layout::SCRIPT_EXTENSION,
        layout::SCRIPTS_EXCLUDED,
    )?;
    let mut out = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let bytes = storage.read(&candidate.path)?;
        if bytes.iter().any(|b| !b.is_ascii_whitespace()) {
            out.push(candidate);
        }
    }
    Ok(out)
}

pub fn discover_template_folders(
    storage: &dyn Storage,
    source: &Path,
) -> anyhow::Result<Vec<DiscoveredAsset>> {
    let base = source.join(layout::TEMPLATES_DIR);
    if !storage.is_dir(&base) {
        return Ok(Vec::new());
    }
    Ok(storage
        .list_dir(&base)?
        .into_iter()
        .filter(|entry| entry.is_dir && !layout::BUILTIN_TEMPLATES.contains(&entry.name.as_str()))
        .map(|entry| asset(entry.path, &base))
        .collect())
}

/// `settings.version` of the main profile, when readable.
pub fn read_source_version(storage: &dyn Storage, source: &Path) -> anyhow::Result<String> {
    let path = source.join(layout::main_settings_path());
    let text = storage.read_to_string(&path)?;
    let tree = SettingsTree::parse(&text).map_err(|err| UpgradeError::InvalidSettings {
        path: path.clone(),
        reason: format!("{err:#}"),
    })?;
    Ok(tree
        .settings()
        .and_then(|s| s.leaf(&["version"]))
        .unwrap_or_default()
        .to_string())
}

/// Populates the plan's discovered lists and source version. A missing
/// installation marker is recorded as the plan's error message and
/// nothing else is read.
pub fn discover(storage: &dyn Storage, plan: &mut MigrationPlan, product: &ProductConfig) {
    let source = plan.source_directory.clone();
    if let Err(err) = check_installation(storage, &source, product) {
        plan.abort(err.to_string());
        return;
    }

    match read_source_version(storage, &source) {
        Ok(version) => plan.source_version = version,
        Err(err) => plan.note(format!("source version unknown: {err:#}")),
    }

    match discover_config_files(storage, &source) {
        Ok(found) => plan.discovered_config_files = found,
        Err(err) => plan.note(format!("config discovery failed: {err:#}")),
    }
    match discover_script_files(storage, &source) {
        Ok(found) => plan.discovered_script_files = found,
        Err(err) => plan.note(format!("script discovery failed: {err:#}")),
    }
    match discover_template_folders(storage, &source) {
        Ok(found) => plan.discovered_template_folders = found,
        Err(err) => plan.note(format!("template discovery failed: {err:#}")),
    }
}
