use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CANONICAL: &str = "<documentburster><settings><version>9.9.9</version><template>My Reports</template><htmlemail>true</htmlemail><numberofuservariables>20</numberofuservariables><emailserver><host>Email Server Host</host><useconn>false</useconn><conncode/></emailserver></settings></documentburster>";
const LEGACY: &str = "<documentburster><settings><version>5.1</version><template>My Reports</template><htmlemail>false</htmlemail><numberofuservariables>10</numberofuservariables><emailserver><host>smtp.acme.test</host></emailserver></settings></documentburster>";

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, text).expect("write");
}

fn seed_installs(root: &Path) {
    let old = root.join("old");
    write(&old, "DocumentBurster.exe", "old");
    write(&old, "config/burst/settings.xml", LEGACY);
    write(&old, "config/burst/internal/license.xml", "<license>k</license>");
    write(&old, "scripts/burst/endBursting.groovy", "println \"$inputFile\"\n");
    write(&old, "templates/invoices/index.html", "<p>x</p>");

    let new = root.join("new");
    write(&new, "DocumentBurster.exe", "new");
    write(&new, "config/_defaults/settings.xml", CANONICAL);
    write(&new, "config/burst/settings.xml", CANONICAL);
}

fn command(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("burst-upgrade");
    cmd.current_dir(root)
        .env("BURST_UPGRADE_HOME", root.join("home"))
        .env("BURST_UPGRADE_SCRATCH_DIR", root.join("scratch"))
        .env("BURST_UPGRADE_LOGS_DIR", root.join("home/logs"));
    cmd
}

#[test]
fn migrate_copy_carries_settings_scripts_and_templates() {
    let tmp = tempdir().expect("tempdir");
    seed_installs(tmp.path());

    command(tmp.path())
        .arg("migrate-copy")
        .arg("--from")
        .arg(tmp.path().join("old"))
        .arg("--to")
        .arg(tmp.path().join("new"))
        .assert()
        .success();

    let new = tmp.path().join("new");
    let settings = fs::read_to_string(new.join("config/burst/settings.xml")).expect("settings");
    assert!(settings.contains("<version>9.9.9</version>"));
    assert!(settings.contains("<host>smtp.acme.test</host>"));
    assert!(settings.contains("<numberofuservariables>20</numberofuservariables>"));
    assert!(settings.contains("<htmlemail>false</htmlemail>"));

    let script = fs::read_to_string(new.join("scripts/burst/endBursting.groovy")).expect("script");
    assert!(script.contains("${inputFile}"));
    assert_eq!(
        fs::read_to_string(new.join("templates/invoices/index.html")).expect("template"),
        "<p>x</p>"
    );
    assert_eq!(
        fs::read_to_string(new.join("config/_internal/license.xml")).expect("license"),
        "<license>k</license>"
    );

    let audit = fs::read_to_string(tmp.path().join("home/logs/upgrade-audit.log")).expect("audit log");
    assert!(audit.contains("\"phase\":\"settings\""));
}

#[test]
fn dry_run_leaves_destination_untouched() {
    let tmp = tempdir().expect("tempdir");
    seed_installs(tmp.path());

    command(tmp.path())
        .arg("migrate-copy")
        .arg("--from")
        .arg(tmp.path().join("old"))
        .arg("--to")
        .arg(tmp.path().join("new"))
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicates::str::contains("would write"));

    let settings =
        fs::read_to_string(tmp.path().join("new/config/burst/settings.xml")).expect("settings");
    assert_eq!(settings, CANONICAL);
    assert!(!tmp.path().join("new/scripts").exists());
}

#[test]
fn migrate_copy_fails_when_source_is_not_an_installation() {
    let tmp = tempdir().expect("tempdir");
    seed_installs(tmp.path());
    fs::remove_file(tmp.path().join("old/DocumentBurster.exe")).expect("remove marker");

    command(tmp.path())
        .arg("--json")
        .arg("migrate-copy")
        .arg("--from")
        .arg(tmp.path().join("old"))
        .arg("--to")
        .arg(tmp.path().join("new"))
        .assert()
        .failure()
        .stdout(predicates::str::contains("DocumentBurster.exe"));

    assert!(!tmp.path().join("new/scripts").exists());
}

#[test]
fn plan_lists_discovered_assets() {
    let tmp = tempdir().expect("tempdir");
    seed_installs(tmp.path());

    command(tmp.path())
        .arg("plan")
        .arg("--from")
        .arg(tmp.path().join("old"))
        .assert()
        .success()
        .stdout(predicates::str::contains("source_version=5.1"))
        .stdout(predicates::str::contains("template: invoices"));
}
