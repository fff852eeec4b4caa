//! Ordered rewrite rules for customized automation scripts.
//!
//! The scripts come from a closed set of shipped samples and their
//! customized copies, so an ordered table of literal and regex rewrites is
//! enough. New rules go into the tables; the control flow never changes.

use anyhow::{Context, Result};
use regex::{NoExpand, Regex};
use std::path::{Path, PathBuf};

use crate::upgrade::layout;
use crate::upgrade::warn::{self, IntegrityWarning};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Namespace,
    MemberRename,
    Dependencies,
    CallPattern,
    TokenSyntax,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "script-namespace",
            Self::MemberRename => "script-member",
            Self::Dependencies => "script-dependency",
            Self::CallPattern => "script-call",
            Self::TokenSyntax => "script-token",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    Literal(&'static str),
    Regex(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub stage: Stage,
    pub from: Pattern,
    pub to: &'static str,
    /// The rule is skipped when the script already contains this text.
    pub unless_contains: Option<&'static str>,
    /// When the rule fired, `to` must be present afterwards.
    pub expect_replacement: bool,
    /// `to` must also be present whenever the script contains this text,
    /// whether or not the rule fired.
    pub expect_if_contains: Option<&'static str>,
}

const fn literal(stage: Stage, from: &'static str, to: &'static str) -> Rule {
    Rule {
        stage,
        from: Pattern::Literal(from),
        to,
        unless_contains: None,
        expect_replacement: false,
        expect_if_contains: None,
    }
}

const fn regex(stage: Stage, from: &'static str, to: &'static str) -> Rule {
    Rule {
        stage,
        from: Pattern::Regex(from),
        to,
        unless_contains: None,
        expect_replacement: false,
        expect_if_contains: None,
    }
}

pub const PDFBOX_VERSION: &str = "2.0.20";

pub const SCRIPT_RULES: &[Rule] = &[
    literal(Stage::Namespace, "import com.smartwish", "import com.sourcekraft"),
    literal(
        Stage::Namespace,
        "org.apache.commons.vfs.tasks",
        "org.apache.commons.vfs2.tasks",
    ),
    literal(Stage::MemberRename, "extractFilePath", "extractedFilePath"),
    literal(
        Stage::Dependencies,
        ";lib/burst/commons-logging-1.1.1.jar",
        ";lib/burst/jcl-over-slf4j-1.7.30.jar;lib/burst/slf4j-api-1.7.30.jar",
    ),
    literal(Stage::Dependencies, "jcl-over-slf4j-1.7.5.jar", "jcl-over-slf4j-1.7.30.jar"),
    literal(Stage::Dependencies, "slf4j-api-1.7.5.jar", "slf4j-api-1.7.30.jar"),
    literal(
        Stage::Dependencies,
        "lib/burst/pdfbox-1.0.0.jar",
        "lib/burst/pdfbox-2.0.20.jar;lib/burst/pdfbox-tools-2.0.20.jar",
    ),
    literal(
        Stage::Dependencies,
        "lib/burst/pdfbox-1.8.2.jar",
        "lib/burst/pdfbox-2.0.20.jar;lib/burst/pdfbox-tools-2.0.20.jar",
    ),
    literal(Stage::Dependencies, "pdfbox-1.0.0.jar", "pdfbox-2.0.20.jar"),
    literal(Stage::Dependencies, "pdfbox-1.8.2.jar", "pdfbox-2.0.20.jar"),
    literal(Stage::Dependencies, "jempbox-1.0.0.jar", "xmpbox-2.0.20.jar"),
    literal(Stage::Dependencies, "jempbox-1.8.2.jar", "xmpbox-2.0.20.jar"),
    literal(Stage::Dependencies, "fontbox-1.0.0.jar", "fontbox-2.0.20.jar"),
    literal(Stage::Dependencies, "fontbox-1.8.2.jar", "fontbox-2.0.20.jar"),
    literal(Stage::Dependencies, "bcmail-jdk15-1.44.jar", "bcmail-jdk15-1.46.jar"),
    literal(Stage::Dependencies, "bcprov-jdk15-1.44.jar", "bcprov-jdk15-1.46.jar"),
    // stamp overlay takes the input document first
    regex(
        Stage::CallPattern,
        r#"samples/[sS]tamp\.pdf \\"\$inputFile\\" \\"\$inputFile\\""#,
        r#"\"$inputFile\" samples/Stamp.pdf \"$inputFile\""#,
    ),
    Rule {
        stage: Stage::CallPattern,
        from: Pattern::Regex(r"\.Overlay \$overlayOptions"),
        to: ".OverlayPDF ${overlayOptions}",
        unless_contains: None,
        expect_replacement: true,
        expect_if_contains: Some(".Overlay $"),
    },
    Rule {
        stage: Stage::CallPattern,
        from: Pattern::Regex(r"-cp \$pdfBoxClassPath org\.apache\.pdfbox\."),
        to: "-cp ${pdfBoxClassPath} org.apache.pdfbox.tools.",
        unless_contains: Some("org.apache.pdfbox.tools."),
        expect_replacement: true,
        expect_if_contains: None,
    },
    // unwrap values needlessly coerced to strings
    literal(Stage::TokenSyntax, r#"String.valueOf("${token}")"#, r#""${token}""#),
    literal(
        Stage::TokenSyntax,
        r#"String.valueOf("${emailAddress}")"#,
        r#""${emailAddress}""#,
    ),
    literal(
        Stage::TokenSyntax,
        r#"String.valueOf("${firstName}")"#,
        r#""${firstName}""#,
    ),
    literal(
        Stage::TokenSyntax,
        r#"String.valueOf("${lastName}")"#,
        r#""${lastName}""#,
    ),
    literal(
        Stage::TokenSyntax,
        "${employeeRow.employee_id}",
        "$employeeRow.employee_id",
    ),
    literal(Stage::TokenSyntax, "$var0$", "${var0}"),
    literal(Stage::TokenSyntax, "$var1$", "${var1}"),
    literal(Stage::TokenSyntax, "$var2$", "${var2}"),
    literal(Stage::TokenSyntax, "$var3$", "${var3}"),
];

/// Legacy `$identifier` markers rewritten to `${identifier}`. Longer names
/// precede their prefixes (`hostName` before `host`).
pub const LEGACY_SCRIPT_TOKENS: &[&str] = &[
    "hostName",
    "tempFilePath",
    "curlOptions",
    "userName",
    "password",
    "absolutePath",
    "destDir",
    "sharedLocationPath",
    "uploadFilePath",
    "execOptions",
    "inputFile",
    "pdfBoxClassPath",
    "encryptOptions",
    "extractedFilePath",
    "stampedFilePath",
    "overlayOptions",
    "printOptions",
    "numberedFilePath",
    "host",
    "port",
    "user",
    "subject",
    "from",
    "to",
    "message",
    "ssl",
    "enableStartTLS",
    "mergedFileName",
];

#[derive(Debug, Clone)]
pub struct ScriptMigration {
    pub text: String,
    pub warnings: Vec<IntegrityWarning>,
}

pub struct ScriptMigrator {
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    stage: Stage,
    matcher: Matcher,
    to: String,
    unless_contains: Option<&'static str>,
    expect_replacement: bool,
    expect_if_contains: Option<&'static str>,
}

enum Matcher {
    Literal(&'static str),
    Regex(Regex),
}

impl Matcher {
    fn compile(pattern: Pattern) -> Result<Self> {
        Ok(match pattern {
            Pattern::Literal(needle) => Matcher::Literal(needle),
            Pattern::Regex(source) => Matcher::Regex(
                Regex::new(source)
                    .with_context(|| format!("invalid script rule pattern {source}"))?,
            ),
        })
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Literal(needle) => text.contains(needle),
            Matcher::Regex(re) => re.is_match(text),
        }
    }

    fn replace_all(&self, text: &str, to: &str) -> String {
        match self {
            Matcher::Literal(needle) => text.replace(needle, to),
            Matcher::Regex(re) => re.replace_all(text, NoExpand(to)).into_owned(),
        }
    }

    fn describe(&self) -> &str {
        match self {
            Matcher::Literal(needle) => needle,
            Matcher::Regex(re) => re.as_str(),
        }
    }
}

fn token_rule(name: &str) -> Result<CompiledRule> {
    let source = format!(r"\${name}\b");
    let re = Regex::new(&source).with_context(|| format!("invalid token pattern {source}"))?;
    Ok(CompiledRule {
        stage: Stage::TokenSyntax,
        matcher: Matcher::Regex(re),
        to: format!("${{{name}}}"),
        unless_contains: None,
        expect_replacement: false,
        expect_if_contains: None,
    })
}

impl ScriptMigrator {
    pub fn new() -> Result<Self> {
        let mut rules = Vec::with_capacity(SCRIPT_RULES.len() + LEGACY_SCRIPT_TOKENS.len());
        for rule in SCRIPT_RULES {
            rules.push(CompiledRule {
                stage: rule.stage,
                matcher: Matcher::compile(rule.from)?,
                to: rule.to.to_string(),
                unless_contains: rule.unless_contains,
                expect_replacement: rule.expect_replacement,
                expect_if_contains: rule.expect_if_contains,
            });
        }

        // identifier markers go right before the token-syntax rules so the
        // rewritten call patterns above are covered too
        let token_at = rules
            .iter()
            .position(|c| c.stage == Stage::TokenSyntax)
            .unwrap_or(rules.len());
        let token_rules = LEGACY_SCRIPT_TOKENS
            .iter()
            .map(|name| token_rule(name))
            .collect::<Result<Vec<_>>>()?;
        rules.splice(token_at..token_at, token_rules);

        Ok(Self { rules })
    }

    pub fn migrate(&self, script_text: &str, file_label: &str) -> ScriptMigration {
        let mut text = script_text.to_string();
        let mut warnings = Vec::new();

        for rule in &self.rules {
            if rule.unless_contains.is_some_and(|marker| text.contains(marker)) {
                continue;
            }
            let fired = rule.matcher.is_match(&text);
            if fired {
                text = rule.matcher.replace_all(&text, &rule.to);
            }

            if rule.matcher.is_match(&text) {
                warnings.push(IntegrityWarning::new(
                    warn::SCRIPT_PATTERN_REMAINS,
                    rule.stage.as_str(),
                    file_label,
                    rule.matcher.describe(),
                    "legacy-pattern-still-present",
                ));
            }
            let expected = (fired && rule.expect_replacement)
                || rule.expect_if_contains.is_some_and(|marker| text.contains(marker));
            if expected && !text.contains(&rule.to) {
                warnings.push(IntegrityWarning::new(
                    warn::SCRIPT_PATTERN_MISSING,
                    rule.stage.as_str(),
                    file_label,
                    &rule.to,
                    "current-pattern-not-found",
                ));
            }
        }

        ScriptMigration { text, warnings }
    }
}

/// Where a migrated script lands inside an installation. Batch runs over
/// historical samples nest them under their legacy version.
pub fn destination_path_for(
    installation_root: &Path,
    file_name: &str,
    legacy_version_label: Option<&str>,
) -> PathBuf {
    let scripts = installation_root.join(layout::SCRIPTS_BURST_DIR);
    match legacy_version_label.filter(|label| !label.trim().is_empty()) {
        Some(label) => scripts.join(label.trim()).join(file_name),
        None => scripts.join(file_name),
    }
}
