use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Migrate an existing installation into a separate destination.
    CopyToNew,
    /// Download the newest release and migrate the live installation in place.
    ReplaceLive,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::CopyToNew => "copy-to-new",
            Mode::ReplaceLive => "replace-live",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LicenseInfo {
    pub latest_version: String,
    pub key: String,
    pub customer_email: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductInfo {
    pub name: String,
    pub version: String,
    pub is_server_version: bool,
    pub platform: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CopyOptions {
    pub license: bool,
    pub output: bool,
    pub logs: bool,
    pub quarantine: bool,
    pub backup: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            license: true,
            output: false,
            logs: false,
            quarantine: false,
            backup: false,
        }
    }
}

/// A discovered file or folder. `relative` is the slash path below the
/// asset's base directory and is reused for the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredAsset {
    pub name: String,
    pub path: PathBuf,
    pub relative: String,
}

/// One migration request, populated by discovery and consumed by the
/// orchestrator. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    pub mode: Mode,
    pub source_directory: PathBuf,
    pub target_directory: Option<PathBuf>,
    pub source_version: String,
    pub is_server_variant: bool,
    pub is_windows_host: bool,
    pub license_info: LicenseInfo,
    pub product_info: ProductInfo,
    pub copy_options: CopyOptions,
    pub discovered_config_files: Vec<DiscoveredAsset>,
    pub discovered_script_files: Vec<DiscoveredAsset>,
    pub discovered_template_folders: Vec<DiscoveredAsset>,
    pub error_message: Option<String>,
    pub notes: Vec<String>,
}

impl MigrationPlan {
    pub fn new(mode: Mode, source_directory: PathBuf) -> Self {
        Self {
            mode,
            source_directory,
            target_directory: None,
            source_version: String::new(),
            is_server_variant: false,
            is_windows_host: cfg!(windows),
            license_info: LicenseInfo::default(),
            product_info: ProductInfo {
                platform: std::env::consts::OS.to_string(),
                ..ProductInfo::default()
            },
            copy_options: CopyOptions::default(),
            discovered_config_files: Vec::new(),
            discovered_script_files: Vec::new(),
            discovered_template_folders: Vec::new(),
            error_message: None,
            notes: Vec::new(),
        }
    }

    /// A recorded precondition failure means nothing may be written.
    pub fn is_aborted(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn abort(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }
}
