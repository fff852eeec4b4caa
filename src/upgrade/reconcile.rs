//! Leaf-by-leaf reconciliation of an arbitrarily old settings tree against
//! the canonical defaults of the current release.
//!
//! The result always has the canonical key set: the walk follows the
//! canonical tree and only overwrites existing leaves. Leaf values are XML
//! text on both sides and are carried over verbatim as text; a previous
//! position holding a branch where canonical holds a leaf is treated as a
//! structural change.

use crate::upgrade::settings_tree::{Node, SettingsTree};
use crate::upgrade::tokens;

/// Leaves whose values are message bodies and keep their line breaks.
pub const MESSAGE_BODY_KEYS: &[&str] = &["text", "html", "subject"];

/// The main profile keeps the canonical template name.
pub const MAIN_SETTINGS_FILE: &str = "settings.xml";

const VERSION_KEY: &str = "version";
const TEMPLATE_KEY: &str = "template";

/// Number of user variable slots declared by the legacy file.
pub fn number_of_user_variables(previous: &SettingsTree) -> usize {
    previous
        .settings()
        .and_then(|s| s.leaf(&["numberofuservariables"]))
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(0)
}

fn previous_leaf<'a>(previous: &'a Node, path: &[String]) -> Option<&'a str> {
    previous.get(path).and_then(Node::as_leaf)
}

pub fn post_process_value(key: &str, value: &str, number_of_user_variables: usize) -> String {
    if value.is_empty() {
        return String::new();
    }

    let mut out = value.to_string();
    if !MESSAGE_BODY_KEYS.contains(&key) {
        out = tokens::strip_line_breaks(&out);
        out = tokens::strip_whitespace_before_delimiters(&out);
    }
    out = tokens::migrate_builtin_tokens(&out);
    tokens::migrate_user_variables(&out, number_of_user_variables)
}

pub fn reconcile(
    previous: &SettingsTree,
    canonical: &SettingsTree,
    number_of_user_variables: usize,
    file_name: &str,
) -> SettingsTree {
    let mut migrated = canonical.clone();

    for path in canonical.root.leaf_paths() {
        let Some(key) = path.last() else {
            continue;
        };
        if key == VERSION_KEY {
            continue;
        }

        match previous_leaf(&previous.root, &path) {
            Some(value) => {
                let value = post_process_value(key, value, number_of_user_variables);
                migrated.root.set_leaf(&path, value);
            }
            None => {
                if key == TEMPLATE_KEY && file_name != MAIN_SETTINGS_FILE {
                    migrated.root.set_leaf(&path, file_name);
                }
            }
        }
    }

    migrated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::fixtures;
    use crate::upgrade::settings_tree::keyset_mismatches;

    fn parse(text: &str) -> SettingsTree {
        SettingsTree::parse(text).expect("parse fixture")
    }

    #[test]
    fn migrated_tree_has_canonical_key_set() {
        let canonical = parse(fixtures::CANONICAL_SETTINGS);
        for (name, text) in fixtures::legacy_fixtures() {
            let normalized = crate::upgrade::tag_rename::normalize(text, name);
            let previous = parse(&normalized.text);
            let migrated = reconcile(
                &previous,
                &canonical,
                number_of_user_variables(&previous),
                name,
            );
            assert!(
                keyset_mismatches(&migrated.root, &canonical.root).is_empty(),
                "{name}: {:?}",
                keyset_mismatches(&migrated.root, &canonical.root)
            );
        }
    }

    #[test]
    fn version_is_never_copied() {
        let canonical = parse(fixtures::CANONICAL_SETTINGS);
        let previous = parse(fixtures::LEGACY_CUSTOM_SETTINGS);
        let migrated = reconcile(&previous, &canonical, 10, "custom.xml");
        assert_eq!(
            migrated.settings().and_then(|s| s.leaf(&["version"])),
            canonical.settings().and_then(|s| s.leaf(&["version"]))
        );
    }

    #[test]
    fn moved_template_takes_file_name() {
        let canonical = parse(fixtures::CANONICAL_SETTINGS);
        let previous = parse("<documentburster><settings><burstfilename>x</burstfilename></settings></documentburster>");
        let migrated = reconcile(&previous, &canonical, 0, "00-settings-5.1.xml");
        assert_eq!(
            migrated.settings().and_then(|s| s.leaf(&["template"])),
            Some("00-settings-5.1.xml")
        );

        let main = reconcile(&previous, &canonical, 0, MAIN_SETTINGS_FILE);
        assert_eq!(
            main.settings().and_then(|s| s.leaf(&["template"])),
            canonical.settings().and_then(|s| s.leaf(&["template"]))
        );
    }

    #[test]
    fn message_bodies_keep_line_breaks_other_values_do_not() {
        assert_eq!(
            post_process_value("text", "hello\r\n\r\n$var1$", 2),
            "hello\r\n\r\n${var1}"
        );
        assert_eq!(
            post_process_value("outputfolder", "output/\r\n$burst_token$", 0),
            "output/${burst_token}"
        );
    }

    #[test]
    fn user_variable_markers_are_fully_migrated() {
        let n = 20;
        for i in 0..n {
            let legacy = tokens::legacy_user_variable(i);
            let value = format!("prefix {legacy} suffix");
            let migrated = post_process_value("subject", &value, n);
            assert!(!migrated.contains(&legacy), "{migrated}");
            assert!(migrated.contains(&tokens::template_user_variable(i)));
        }
    }

    #[test]
    fn branch_where_leaf_expected_keeps_canonical_default() {
        let canonical = parse(fixtures::CANONICAL_SETTINGS);
        let previous = parse(
            "<documentburster><settings><htmlemail><flag>true</flag></htmlemail></settings></documentburster>",
        );
        let migrated = reconcile(&previous, &canonical, 0, "x.xml");
        assert_eq!(
            migrated.settings().and_then(|s| s.leaf(&["htmlemail"])),
            canonical.settings().and_then(|s| s.leaf(&["htmlemail"]))
        );
    }
}
