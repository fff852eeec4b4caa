use serde::Serialize;

/// Non-fatal migration-integrity finding. The run always continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityWarning {
    pub code: &'static str,
    pub stage: &'static str,
    pub file: String,
    pub pattern: String,
    pub reason: &'static str,
}

impl IntegrityWarning {
    pub fn new(
        code: &'static str,
        stage: &'static str,
        file: impl Into<String>,
        pattern: impl Into<String>,
        reason: &'static str,
    ) -> Self {
        Self {
            code,
            stage,
            file: file.into(),
            pattern: pattern.into(),
            reason,
        }
    }
}

pub const TAG_NOT_EXPECTED: &str = "TAG_NOT_EXPECTED";
pub const TAG_NOT_FOUND: &str = "TAG_NOT_FOUND";
pub const SCRIPT_PATTERN_REMAINS: &str = "SCRIPT_PATTERN_REMAINS";
pub const SCRIPT_PATTERN_MISSING: &str = "SCRIPT_PATTERN_MISSING";
pub const KEYSET_MISMATCH: &str = "KEYSET_MISMATCH";

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_ascii_graphic() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn render(warning: &IntegrityWarning) -> String {
    format!(
        "BURST_WARN code={} stage={} file={} pattern={} reason={}",
        sanitize_value(warning.code),
        sanitize_value(warning.stage),
        sanitize_value(&warning.file),
        sanitize_value(&warning.pattern),
        sanitize_value(warning.reason),
    )
}

pub fn emit(warning: &IntegrityWarning) {
    eprintln!("{}", render(warning));
}
