use anyhow::Result;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct UpgradePaths {
    pub upgrade_home: PathBuf,
    pub logs_dir: PathBuf,
    pub scratch_root: PathBuf,
    pub config_file: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<UpgradePaths> {
    let upgrade_home = match env::var("BURST_UPGRADE_HOME") {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => required_home_dir()?.join(".burst-upgrade"),
    };

    let logs_dir = env_or_default_path("BURST_UPGRADE_LOGS_DIR", upgrade_home.join("logs"));
    let scratch_root =
        env_or_default_path("BURST_UPGRADE_SCRATCH_DIR", env::temp_dir().join("upg-db"));
    let config_file =
        env_or_default_path("BURST_UPGRADE_CONFIG", upgrade_home.join("upgrade.toml"));

    Ok(UpgradePaths {
        upgrade_home,
        logs_dir,
        scratch_root,
        config_file,
    })
}
