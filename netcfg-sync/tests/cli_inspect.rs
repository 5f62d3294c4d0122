use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("fixtures")
        .join(path)
}

fn netcfg_sync() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("netcfg-sync"))
}

#[test]
fn inspect_shows_normalized_objects_with_references() {
    netcfg_sync()
        .arg("inspect")
        .arg(fixture("asa/device.cfg"))
        .args(["--model", "asa", "--prefix", "access-list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("== access-list\n[outside_in]\n"))
        .stdout(predicate::str::contains(
            "access-list outside_in extended permit tcp object-group g1 host 10.9.9.9 eq 80",
        ))
        .stdout(predicate::str::contains("-> object-group g1"))
        .stdout(predicate::str::contains("== route").not());
}

#[test]
fn inspect_json_lists_objects() {
    let output = netcfg_sync()
        .arg("inspect")
        .arg(fixture("asa/target/fw1"))
        .args(["--prefix", "object-group", "--format", "json"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(v[0]["name"], "g1");
    assert_eq!(v[0]["lines"].as_array().map(Vec::len), Some(4));
}

#[test]
fn grammar_lists_descriptors() {
    netcfg_sync()
        .args(["grammar", "--model", "ios"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ip access-list extended $NAME"))
        .stdout(predicate::str::contains(
            "ip access-group $REF in -> ip access-list extended",
        ));
}

#[test]
fn unknown_model_is_rejected() {
    netcfg_sync()
        .args(["grammar", "--model", "junos"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown device model"));
}
