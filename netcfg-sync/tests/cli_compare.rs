use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("fixtures")
        .join(path)
}

fn netcfg_sync() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("netcfg-sync"));
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn identical_files_are_unchanged() {
    netcfg_sync()
        .arg("compare")
        .arg(fixture("asa/target/fw1"))
        .arg(fixture("asa/target/fw1"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("comp: device unchanged"));
}

#[test]
fn quiet_suppresses_compare_info() {
    netcfg_sync()
        .arg("compare")
        .arg("--quiet")
        .arg(fixture("asa/target/fw1"))
        .arg(fixture("asa/target/fw1"))
        .assert()
        .success()
        .stderr(predicate::str::contains("comp:").not());
}

#[test]
fn model_is_required_without_info_file() {
    let dir = tempdir().expect("tempdir");
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, "route outside 0.0.0.0 0.0.0.0 10.1.1.1\n").expect("write");
    fs::write(&b, "route outside 0.0.0.0 0.0.0.0 10.1.1.2\n").expect("write");

    netcfg_sync()
        .arg("compare")
        .arg(&a)
        .arg(&b)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "ERROR>>> Can't determine device model",
        ));

    netcfg_sync()
        .arg("compare")
        .arg(&a)
        .arg(&b)
        .args(["--model", "asa"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "no route outside 0.0.0.0 0.0.0.0 10.1.1.1\\N route outside 0.0.0.0 0.0.0.0 10.1.1.2",
        ));
}

#[test]
fn settings_provide_default_model_and_tuning() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("settings.toml");
    fs::write(
        &settings,
        "default_model = \"IOS\"\n[tuning]\nacl_insert_limit = 0\n",
    )
    .expect("write settings");
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let acl = "interface Gi1\n ip address 10.1.1.1 255.255.255.0\n ip access-group a in\n\
               ip access-list extended a\n permit ip host 10.0.0.1 any\n";
    fs::write(&a, acl).expect("write");
    fs::write(&b, format!("{acl} permit ip host 10.0.0.2 any\n")).expect("write");

    netcfg_sync()
        .arg("--settings")
        .arg(&settings)
        .arg("compare")
        .arg(&a)
        .arg(&b)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "ERROR>>> Can't insert more than 0 ACL lines at once",
        ));
}

#[test]
fn unreadable_settings_file_is_error() {
    let dir = tempdir().expect("tempdir");
    netcfg_sync()
        .arg("--settings")
        .arg(dir.path().join("missing.toml"))
        .arg("grammar")
        .arg("--model")
        .arg("asa")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR>>> failed to read settings"));
}
