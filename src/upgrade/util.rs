use anyhow::Result;
use chrono::Local;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Local wall-clock stamp used for scratch workspaces and backup names,
/// e.g. `2024.03.07_14.05.09`.
pub fn now_formatted() -> String {
    Local::now().format("%Y.%m.%d_%H.%M.%S").to_string()
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Forward-slash rendering of a relative path, the form zip entries use.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}
