//! Legacy `$name$` marker syntax found in settings values and its
//! `${name}` template equivalent.

/// Built-in variables, applied in order. Longer date patterns come after
/// the shorter ones they do not overlap with.
pub const LEGACY_BUILTIN_TOKENS: &[(&str, &str)] = &[
    ("$burst_token$", "${burst_token}"),
    ("$input_document_extension$", "${input_document_extension}"),
    ("$input_document_name$", "${input_document_name}"),
    ("$burst_index$", "${burst_index}"),
    ("$now_default_date$", "${now_default_date}"),
    ("$now_short_date$", "${now_short_date}"),
    ("$now_medium_date$", "${now_medium_date}"),
    ("$now_long_date$", "${now_long_date}"),
    ("$now_full_date$", "${now_full_date}"),
    ("$now_quarter$", "${now_quarter}"),
    ("$extracted_file_path$", "${extracted_file_path}"),
    (
        "$extracted_file_paths_after_splitting_2nd_time$",
        "${extracted_file_paths_after_splitting_2nd_time}",
    ),
    ("$now;format=\"yyyy.MM.dd\"$", "${now?string[\"yyyy.MM.dd\"]}"),
    (
        "$now;format=\"yyyy.MM.dd_HH.mm.ss\"$",
        "${now?string[\"yyyy.MM.dd_HH.mm.ss.SSS\"]}",
    ),
    (
        "$now;format=\"yyyy.MM.dd_HH.mm.ss.SSS\"$",
        "${now?string[\"yyyy.MM.dd_HH.mm.ss.SSS\"]}",
    ),
    (
        "_stats-$num_pages$pages-$num_files_extracted$extracted-$num_files_distributed$distributed.log",
        "_stats-${stats_info}.log",
    ),
];

pub fn legacy_user_variable(index: usize) -> String {
    format!("$var{index}$")
}

pub fn template_user_variable(index: usize) -> String {
    format!("${{var{index}}}")
}

pub fn migrate_builtin_tokens(value: &str) -> String {
    let mut out = value.to_string();
    for (legacy, template) in LEGACY_BUILTIN_TOKENS {
        if out.contains(legacy) {
            out = out.replace(legacy, template);
        }
    }
    out
}

pub fn migrate_user_variables(value: &str, number_of_user_variables: usize) -> String {
    let mut out = value.to_string();
    for index in 0..number_of_user_variables {
        let legacy = legacy_user_variable(index);
        if out.contains(&legacy) {
            out = out.replace(&legacy, &template_user_variable(index));
        }
    }
    out
}

/// Removes line breaks entirely.
pub fn strip_line_breaks(value: &str) -> String {
    value.replace("\r\n", "").replace(['\n', '\r'], "")
}

/// Removes whitespace that sits before a later `$` marker delimiter.
/// Text after the last delimiter is left alone, so folder paths with
/// spaces keep them.
pub fn strip_whitespace_before_delimiters(value: &str) -> String {
    let Some(last) = value.rfind('$') else {
        return value.to_string();
    };
    let (head, tail) = value.split_at(last);
    let mut out: String = head.chars().filter(|c| !c.is_whitespace()).collect();
    out.push_str(tail);
    out
}
