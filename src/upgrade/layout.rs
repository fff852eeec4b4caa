//! Directory conventions of an installation. Other parts of the product
//! depend on these names, so they must not drift.

pub const CONFIG_DIR: &str = "config";
pub const DEFAULTS_DIR: &str = "config/_defaults";
pub const INTERNAL_DIR: &str = "config/_internal";
pub const BURST_CONFIG_DIR: &str = "config/burst";
pub const LEGACY_INTERNAL_DIR: &str = "config/burst/internal";

/// Subtrees under `config/` never migrated as profiles.
pub const CONFIG_EXCLUDED: &[&str] = &["_internal", "_defaults", "burst/internal", "burst/default"];

pub const SCRIPTS_BURST_DIR: &str = "scripts/burst";
pub const SCRIPTS_EXCLUDED: &[&str] = &["internal", "samples"];
pub const SCRIPT_EXTENSION: &str = "groovy";

pub const TEMPLATES_DIR: &str = "templates";
pub const BUILTIN_TEMPLATES: &[&str] = &["html-basic-example", "html-mobile-responsive-emails"];

pub const OUTPUT_DIR: &str = "output";
pub const LOGS_DIR: &str = "logs";
pub const QUARANTINE_DIR: &str = "quarantine";
pub const BACKUP_DIR: &str = "backup";

pub const SETTINGS_FILE: &str = "settings.xml";
pub const LICENSE_FILE: &str = "license.xml";
pub const INTERNAL_PROPERTIES_FILE: &str = "documentburster.properties";

/// Server bundles nest the installation one level down.
pub const SERVER_SUBDIR: &str = "server";

/// `config/burst/settings.xml`, the file `sourceVersion` is read from.
pub fn main_settings_path() -> String {
    format!("{BURST_CONFIG_DIR}/{SETTINGS_FILE}")
}

/// Canonical defaults for a profile: `config/_defaults/settings.xml`.
pub fn canonical_settings_path() -> String {
    format!("{DEFAULTS_DIR}/{SETTINGS_FILE}")
}
