use regex::Regex;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Quoted `"BURST_UPGRADE_*"` literals. The bare prefix constant ends with
/// `_` and is not a key.
const KEY_PATTERN: &str = r#""(BURST_UPGRADE_[A-Z0-9_]*[A-Z0-9])""#;

fn rust_sources(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

fn env_keys(sources: &[PathBuf], pattern: &Regex) -> BTreeSet<String> {
    sources
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .flat_map(|content| {
            pattern
                .captures_iter(&content)
                .map(|caps| caps[1].to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn write_allowlist(keys: &BTreeSet<String>) -> std::io::Result<()> {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let generated = Path::new(&out_dir).join("upgrade_env_allowlist.rs");
    let mut f = fs::File::create(generated)?;
    writeln!(f, "pub const GENERATED_UPGRADE_ENV_ALLOWLIST: &[&str] = &[")?;
    for key in keys {
        writeln!(f, "    {key:?},")?;
    }
    writeln!(f, "];")?;
    Ok(())
}

fn main() {
    let pattern = Regex::new(KEY_PATTERN).expect("env key pattern compiles");
    let sources = rust_sources(Path::new("src")).expect("failed to scan src for env keys");
    write_allowlist(&env_keys(&sources, &pattern))
        .expect("failed to generate BURST_UPGRADE env allowlist");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");
}
