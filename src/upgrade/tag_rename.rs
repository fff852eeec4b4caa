//! Textual renames of legacy settings containers, applied before parsing.
//!
//! A renamed container moves every descendant key path at once, which the
//! per-leaf reconciliation cannot follow, so these run on the raw text.

use crate::upgrade::warn::{self, IntegrityWarning};

#[derive(Debug, Clone, Copy)]
pub struct TagRename {
    pub from: &'static str,
    pub to: &'static str,
    /// Text that must be gone after the rename.
    pub absent: &'static str,
}

pub const TAG_RENAMES: &[TagRename] = &[
    TagRename {
        from: "defaultmessage",
        to: "emailsettings",
        absent: "defaultmessage",
    },
    TagRename {
        from: "defaultftp",
        to: "uploadsettings",
        absent: "defaultftp",
    },
    TagRename {
        from: "url",
        to: "ftpcommand",
        absent: "<url",
    },
];

#[derive(Debug, Clone)]
pub struct NormalizedSettings {
    pub text: String,
    pub warnings: Vec<IntegrityWarning>,
}

fn rename_element(text: &str, from: &str, to: &str) -> String {
    text.replace(&format!("<{from}>"), &format!("<{to}>"))
        .replace(&format!("</{from}>"), &format!("</{to}>"))
        .replace(&format!("<{from}/>"), &format!("<{to}/>"))
}

pub fn normalize(raw_xml: &str, file_label: &str) -> NormalizedSettings {
    let mut text = raw_xml.to_string();
    let mut warnings = Vec::new();

    for rename in TAG_RENAMES {
        text = rename_element(&text, rename.from, rename.to);

        if text.contains(rename.absent) {
            warnings.push(IntegrityWarning::new(
                warn::TAG_NOT_EXPECTED,
                "settings-rename",
                file_label,
                rename.absent,
                "legacy-tag-still-present",
            ));
        }
        if !text.contains(rename.to) {
            warnings.push(IntegrityWarning::new(
                warn::TAG_NOT_FOUND,
                "settings-rename",
                file_label,
                rename.to,
                "current-tag-not-found",
            ));
        }
    }

    NormalizedSettings { text, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_all_legacy_containers() {
        let raw = "<documentburster><settings><defaultmessage><to>a</to></defaultmessage>\
                   <defaultftp><url>ftp://host</url></defaultftp></settings></documentburster>";
        let out = normalize(raw, "legacy.xml");
        assert!(out.text.contains("<emailsettings><to>a</to></emailsettings>"));
        assert!(out.text.contains("<uploadsettings><ftpcommand>ftp://host</ftpcommand></uploadsettings>"));
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn current_file_passes_through_unchanged() {
        let raw = "<documentburster><settings><emailsettings><to/></emailsettings>\
                   <uploadsettings><ftpcommand/></uploadsettings></settings></documentburster>";
        let out = normalize(raw, "current.xml");
        assert_eq!(out.text, raw);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn leftover_legacy_tag_is_reported_without_failing() {
        // attribute-carrying tags are not matched by the textual rename
        let raw = "<r><settings><defaultmessage id=\"1\"><to/></defaultmessage>\
                   <uploadsettings><ftpcommand/></uploadsettings></settings></r>";
        let out = normalize(raw, "odd.xml");
        let codes = out.warnings.iter().map(|w| w.code).collect::<Vec<_>>();
        assert!(codes.contains(&warn::TAG_NOT_EXPECTED));
        assert!(out.warnings.iter().all(|w| w.file == "odd.xml"));
    }
}
