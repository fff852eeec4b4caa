use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::UpgradeError;
use crate::upgrade::paths::UpgradePaths;

include!(concat!(env!("OUT_DIR"), "/upgrade_env_allowlist.rs"));

const ENV_PREFIX: &str = "BURST_UPGRADE_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub name: String,
    pub main_executable: String,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: "DocumentBurster".to_string(),
            main_executable: "DocumentBurster.exe".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub desktop_url: String,
    pub server_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    600
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            desktop_url: "https://s3.amazonaws.com/documentburster/newest/documentburster.zip"
                .to_string(),
            server_url:
                "https://s3.amazonaws.com/documentburster/newest/documentburster-server.zip"
                    .to_string(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub keep_scratch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpgradeConfig {
    pub product: ProductConfig,
    pub download: DownloadConfig,
    pub workspace: WorkspaceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialUpgradeConfig {
    product: Option<ProductConfig>,
    download: Option<DownloadConfig>,
    workspace: Option<WorkspaceConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &UpgradeConfig) -> Result<()> {
    if cfg.product.name.trim().is_empty() {
        return Err(UpgradeError::InvalidConfig("product name cannot be empty".into()).into());
    }
    let exe = cfg.product.main_executable.trim();
    if exe.is_empty() || exe.contains('/') || exe.contains('\\') {
        return Err(UpgradeError::InvalidConfig(
            "main executable must be a bare file name".into(),
        )
        .into());
    }
    if cfg.download.desktop_url.trim().is_empty() || cfg.download.server_url.trim().is_empty() {
        return Err(UpgradeError::InvalidConfig("download urls cannot be empty".into()).into());
    }
    if cfg.download.request_timeout_secs == 0 {
        return Err(UpgradeError::InvalidConfig(
            "download request timeout must be >= 1 second".into(),
        )
        .into());
    }
    Ok(())
}

fn merge_file_config(base: &mut UpgradeConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path).map_err(|err| {
        UpgradeError::InvalidConfig(format!("failed to read {}: {err}", path.display()))
    })?;
    let parsed: PartialUpgradeConfig = toml::from_str(&raw).map_err(|err| {
        UpgradeError::InvalidConfig(format!("failed to parse {}: {err}", path.display()))
    })?;
    if let Some(product) = parsed.product {
        base.product = product;
    }
    if let Some(download) = parsed.download {
        base.download = download;
    }
    if let Some(workspace) = parsed.workspace {
        base.workspace = workspace;
    }
    Ok(())
}

pub fn load_config(paths: &UpgradePaths) -> Result<UpgradeConfig> {
    let mut cfg = UpgradeConfig::default();
    merge_file_config(&mut cfg, &paths.config_file)?;

    cfg.product.name = env_or_string("BURST_UPGRADE_PRODUCT", &cfg.product.name);
    cfg.product.main_executable =
        env_or_string("BURST_UPGRADE_MAIN_EXECUTABLE", &cfg.product.main_executable);
    cfg.download.desktop_url =
        env_or_string("BURST_UPGRADE_DOWNLOAD_URL", &cfg.download.desktop_url);
    cfg.download.server_url =
        env_or_string("BURST_UPGRADE_SERVER_DOWNLOAD_URL", &cfg.download.server_url);
    cfg.download.request_timeout_secs = env_or_u64(
        "BURST_UPGRADE_DOWNLOAD_TIMEOUT_SECS",
        cfg.download.request_timeout_secs,
    );
    cfg.workspace.keep_scratch =
        env_or_bool("BURST_UPGRADE_KEEP_SCRATCH", cfg.workspace.keep_scratch);

    validate(&cfg)?;
    Ok(cfg)
}

/// Environment variables that carry the upgrade prefix but are not read anywhere.
pub fn unknown_env_keys() -> Vec<String> {
    let mut out = env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with(ENV_PREFIX))
        .filter(|key| !GENERATED_UPGRADE_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect::<Vec<_>>();
    out.sort();
    out
}
