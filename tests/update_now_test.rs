use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

const CANONICAL: &str = "<documentburster><settings><version>9.9.9</version><template>My Reports</template><emailserver><host>Email Server Host</host></emailserver></settings></documentburster>";
const LEGACY: &str = "<documentburster><settings><version>8.7.2</version><template>My Reports</template><emailserver><host>smtp.acme.test</host></emailserver></settings></documentburster>";

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, text).expect("write");
}

fn release_bundle(path: &Path) {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let files = [
        ("DocumentBurster/DocumentBurster.exe", "new-exe"),
        ("DocumentBurster/config/_defaults/settings.xml", CANONICAL),
        ("DocumentBurster/config/burst/settings.xml", CANONICAL),
        ("DocumentBurster/lib/new.jar", "jar"),
    ];
    for (name, text) in files {
        writer.start_file(name, options).expect("start entry");
        writer.write_all(text.as_bytes()).expect("write entry");
    }
    let bytes = writer.finish().expect("finish bundle").into_inner();
    fs::write(path, bytes).expect("write bundle");
}

#[test]
fn update_now_replaces_live_install_and_keeps_backup() {
    let tmp = tempdir().expect("tempdir");
    let live = tmp.path().join("DocumentBurster");
    write(&live, "DocumentBurster.exe", "old-exe");
    write(&live, "config/burst/settings.xml", LEGACY);
    write(&live, "lib/old.jar", "old");
    write(&live, "scripts/burst/endBursting.groovy", "println \"$inputFile\"\n");

    let bundle = tmp.path().join("documentburster.zip");
    release_bundle(&bundle);

    assert_cmd::cargo::cargo_bin_cmd!("burst-upgrade")
        .current_dir(tmp.path())
        .env("BURST_UPGRADE_HOME", tmp.path().join("home"))
        .env("BURST_UPGRADE_SCRATCH_DIR", tmp.path().join("scratch"))
        .env("BURST_UPGRADE_LOGS_DIR", tmp.path().join("home/logs"))
        .env("BURST_UPGRADE_DOWNLOAD_URL", format!("file://{}", bundle.display()))
        .arg("update-now")
        .arg("--install-dir")
        .arg(&live)
        .args(["--product-version", "8.7.2"])
        .assert()
        .success();

    let settings = fs::read_to_string(live.join("config/burst/settings.xml")).expect("settings");
    assert!(settings.contains("<version>9.9.9</version>"));
    assert!(settings.contains("<host>smtp.acme.test</host>"));
    assert_eq!(fs::read_to_string(live.join("lib/new.jar")).expect("jar"), "jar");
    assert!(!live.join("lib/old.jar").exists());
    assert_eq!(
        fs::read_to_string(live.join("DocumentBurster.exe")).expect("exe"),
        "old-exe"
    );
    let script = fs::read_to_string(live.join("scripts/burst/endBursting.groovy")).expect("script");
    assert!(script.contains("${inputFile}"));

    let backups = fs::read_dir(live.join("backup"))
        .expect("backup dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    assert_eq!(backups.len(), 1);
    assert!(backups[0].starts_with("documentburster-8.7.2-"));
    assert!(backups[0].ends_with(".zip"));

    let archive = fs::File::open(live.join("backup").join(&backups[0])).expect("open backup");
    let zip = zip::ZipArchive::new(archive).expect("read backup");
    let names = zip.file_names().map(str::to_string).collect::<Vec<_>>();
    assert!(names.iter().any(|name| name == "DocumentBurster/lib/old.jar"));

    let scratch = tmp.path().join("scratch");
    let leftovers = fs::read_dir(&scratch).map(|dir| dir.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[test]
fn update_now_rejects_a_folder_without_the_main_executable() {
    let tmp = tempdir().expect("tempdir");
    let live = tmp.path().join("NotAnInstall");
    write(&live, "config/burst/settings.xml", LEGACY);

    assert_cmd::cargo::cargo_bin_cmd!("burst-upgrade")
        .current_dir(tmp.path())
        .env("BURST_UPGRADE_HOME", tmp.path().join("home"))
        .env("BURST_UPGRADE_SCRATCH_DIR", tmp.path().join("scratch"))
        .env("BURST_UPGRADE_DOWNLOAD_URL", "file:///nonexistent/documentburster.zip")
        .arg("update-now")
        .arg("--install-dir")
        .arg(&live)
        .assert()
        .failure()
        .stdout(predicates::str::contains("DocumentBurster.exe"));

    assert_eq!(
        fs::read_to_string(live.join("config/burst/settings.xml")).expect("settings"),
        LEGACY
    );
}
