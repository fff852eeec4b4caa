use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("{marker} was not found in the {} selected location; select an existing installation folder", path.display())]
    MissingInstallation { marker: String, path: PathBuf },
    #[error("canonical default settings missing or unreadable: {}", path.display())]
    MissingDefaults { path: PathBuf },
    #[error("settings file {} is not valid: {reason}", path.display())]
    InvalidSettings { path: PathBuf, reason: String },
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },
}

impl UpgradeError {
    pub fn code(&self) -> UpgradeErrorCode {
        match self {
            Self::MissingInstallation { .. } => UpgradeErrorCode::E001MissingInstallation,
            Self::MissingDefaults { .. } => UpgradeErrorCode::E002MissingDefaults,
            Self::InvalidSettings { .. } => UpgradeErrorCode::E003InvalidSettings,
            Self::InvalidConfig(_) => UpgradeErrorCode::E004ConfigInvalid,
            Self::Download { .. } => UpgradeErrorCode::E005DownloadFailed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeErrorCode {
    E001MissingInstallation,
    E002MissingDefaults,
    E003InvalidSettings,
    E004ConfigInvalid,
    E005DownloadFailed,
}

impl UpgradeErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001MissingInstallation => "E001_MISSING_INSTALLATION",
            Self::E002MissingDefaults => "E002_MISSING_DEFAULTS",
            Self::E003InvalidSettings => "E003_INVALID_SETTINGS",
            Self::E004ConfigInvalid => "E004_CONFIG_INVALID",
            Self::E005DownloadFailed => "E005_DOWNLOAD_FAILED",
        }
    }
}
