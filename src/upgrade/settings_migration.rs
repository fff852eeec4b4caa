use anyhow::{Context, Result};

use crate::upgrade::fixups;
use crate::upgrade::reconcile;
use crate::upgrade::settings_tree::{SettingsTree, keyset_mismatches};
use crate::upgrade::tag_rename;
use crate::upgrade::warn::{self, IntegrityWarning};

#[derive(Debug, Clone)]
pub struct SettingsMigration {
    pub tree: SettingsTree,
    pub fixed_paths: Vec<String>,
    pub warnings: Vec<IntegrityWarning>,
}

impl SettingsMigration {
    pub fn to_xml(&self) -> String {
        self.tree.to_xml()
    }
}

/// Runs one legacy settings file through rename, reconciliation and
/// fixups. `file_name` drives the template fallback; `file_label` only
/// names the file in warnings.
pub fn migrate_settings(
    previous_xml: &str,
    canonical: &SettingsTree,
    file_name: &str,
    file_label: &str,
) -> Result<SettingsMigration> {
    let normalized = tag_rename::normalize(previous_xml, file_label);
    let mut warnings = normalized.warnings;

    let previous = SettingsTree::parse(&normalized.text)
        .with_context(|| format!("failed to parse settings {file_label}"))?;
    let user_variables = reconcile::number_of_user_variables(&previous);

    let mut tree = reconcile::reconcile(&previous, canonical, user_variables, file_name);
    let fixed_paths = fixups::apply_fixups(&mut tree, &previous, canonical);

    for path in keyset_mismatches(&tree.root, &canonical.root) {
        warnings.push(IntegrityWarning::new(
            warn::KEYSET_MISMATCH,
            "settings-keyset",
            file_label,
            path,
            "key-not-in-both-trees",
        ));
    }

    Ok(SettingsMigration {
        tree,
        fixed_paths,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::fixtures;
    use crate::upgrade::settings_tree::Node;

    fn canonical() -> SettingsTree {
        SettingsTree::parse(fixtures::CANONICAL_SETTINGS).expect("canonical fixture")
    }

    /// Dotted settings paths whose values differ from canonical.
    fn deviations(migrated: &SettingsTree, canonical: &SettingsTree) -> Vec<(String, String)> {
        let migrated_settings = migrated.settings().expect("settings");
        let canonical_settings = canonical.settings().expect("settings");
        canonical_settings
            .leaf_paths()
            .into_iter()
            .filter_map(|path| {
                let value = migrated_settings.leaf(&path)?;
                (Some(value) != canonical_settings.leaf(&path))
                    .then(|| (path.join("."), value.to_string()))
            })
            .collect()
    }

    #[test]
    fn oldest_uncustomized_profile_matches_defaults() {
        let canonical = canonical();
        let out = migrate_settings(
            fixtures::LEGACY_51_SETTINGS,
            &canonical,
            "00-settings-5.1.xml",
            "burst/00-settings-5.1.xml",
        )
        .expect("migrate");

        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(
            deviations(&out.tree, &canonical),
            vec![
                ("template".to_string(), "00-settings-5.1.xml".to_string()),
                ("htmlemail".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn customized_profile_keeps_only_its_customizations() {
        let canonical = canonical();
        let out = migrate_settings(
            fixtures::LEGACY_CUSTOM_SETTINGS,
            &canonical,
            "10-settings-6.1-custom.xml",
            "burst/10-settings-6.1-custom.xml",
        )
        .expect("migrate");

        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(
            deviations(&out.tree, &canonical),
            vec![
                (
                    "burstfilename".to_string(),
                    "custom-${var0}.${output_type_extension}".to_string()
                ),
                ("outputfolder".to_string(), "custom-output path".to_string()),
                (
                    "emailsettings.subject".to_string(),
                    "custom subject ${var0}".to_string()
                ),
            ]
        );
    }

    #[test]
    fn every_fixture_keeps_canonical_keys_and_fixups_settle() {
        let canonical = canonical();
        for (name, text) in fixtures::legacy_fixtures() {
            let out = migrate_settings(text, &canonical, name, name).expect("migrate");
            assert!(out.warnings.is_empty(), "{name}: {:?}", out.warnings);

            let previous = SettingsTree::parse(&tag_rename::normalize(text, name).text).expect("parse");
            let mut again = out.tree.clone();
            assert!(fixups::apply_fixups(&mut again, &previous, &canonical).is_empty());
            assert_eq!(again, out.tree);
        }
    }

    #[test]
    fn repeated_elements_follow_canonical_length() {
        let canonical = SettingsTree::parse(
            "<documentburster><settings><version>1</version><tags><tag>a</tag><tag>b</tag></tags></settings></documentburster>",
        )
        .expect("parse");
        let out = migrate_settings(
            "<documentburster><settings><tags><tag>x</tag><tag>y</tag><tag>z</tag></tags></settings></documentburster>",
            &canonical,
            "p.xml",
            "p.xml",
        )
        .expect("migrate");
        let tags = out.tree.settings().and_then(|s| s.get(&["tags", "tag"]));
        assert_eq!(
            tags,
            Some(&Node::List(vec![
                Node::Leaf("x".to_string()),
                Node::Leaf("y".to_string())
            ]))
        );
    }

    #[test]
    fn malformed_settings_fail_with_file_context() {
        let err = migrate_settings("<documentburster><settings>", &canonical(), "bad.xml", "burst/bad.xml")
            .expect_err("malformed");
        assert!(format!("{err:#}").contains("burst/bad.xml"));
    }
}
