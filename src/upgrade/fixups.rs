//! Hard-coded corrections applied after generic reconciliation, for the
//! cases where carrying the legacy value over is wrong.
//!
//! Every rule only writes when the value actually differs, so a second
//! pass over an already-fixed tree reports no changes.

use crate::upgrade::settings_tree::{Node, SettingsTree};

pub const LEGACY_DEFAULT_USER_VARIABLES: &str = "10";
pub const DEFAULT_USER_VARIABLES: &str = "20";

const BARE_UPLOAD_COMMAND: &str = "ftp://";
const LEGACY_EXTENSION_TOKEN: &str = "${input_document_extension}";
const OUTPUT_EXTENSION_TOKEN: &str = "${output_type_extension}";

/// Environment-specific or deprecated settings never carried across
/// versions. `None` resets to the canonical value.
pub const FORCED_VALUES: &[(&[&str], Option<&str>)] = &[
    (&["qualityassurance", "emailserver", "port"], None),
    (&["sortbyposition"], None),
    (&["emailserver", "useconn"], Some("false")),
    (&["emailserver", "conncode"], Some("")),
];

fn set_if_different(settings: &mut Node, path: &[&str], value: &str, changed: &mut Vec<String>) {
    if settings.leaf(path) == Some(value) {
        return;
    }
    if settings.set_leaf(path, value) {
        changed.push(path.join("."));
    }
}

/// Applies the correction table to `migrated` and returns the dotted
/// settings paths that changed.
pub fn apply_fixups(
    migrated: &mut SettingsTree,
    previous: &SettingsTree,
    canonical: &SettingsTree,
) -> Vec<String> {
    let mut changed = Vec::new();
    let previous = previous.settings();
    let canonical = canonical.settings();
    let Some(settings) = migrated.settings_mut() else {
        return changed;
    };

    let legacy_count = previous
        .and_then(|p| p.leaf(&["numberofuservariables"]))
        .map(str::trim);
    if legacy_count == Some(LEGACY_DEFAULT_USER_VARIABLES) {
        set_if_different(
            settings,
            &["numberofuservariables"],
            DEFAULT_USER_VARIABLES,
            &mut changed,
        );
    }

    // single "send email" flag from before sendfiles became a branch
    if let Some(flag) = previous.and_then(|p| p.leaf(&["sendfiles"])) {
        set_if_different(settings, &["sendfiles", "email"], flag.trim(), &mut changed);
    }

    if settings.leaf(&["uploadsettings", "ftpcommand"]).map(str::trim) == Some(BARE_UPLOAD_COMMAND) {
        set_if_different(settings, &["uploadsettings", "ftpcommand"], "", &mut changed);
    }

    let renamed_extension = settings
        .leaf(&["burstfilename"])
        .filter(|name| name.contains(LEGACY_EXTENSION_TOKEN))
        .map(|name| name.replace(LEGACY_EXTENSION_TOKEN, OUTPUT_EXTENSION_TOKEN));
    if let Some(name) = renamed_extension {
        set_if_different(settings, &["burstfilename"], &name, &mut changed);
    }

    for &(path, forced) in FORCED_VALUES {
        let value = match forced {
            Some(value) => Some(value),
            None => canonical.and_then(|c| c.leaf(path)),
        };
        if let Some(value) = value {
            set_if_different(settings, path, value, &mut changed);
        }
    }

    changed
}
