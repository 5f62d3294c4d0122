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
fn asa_diff_reads_all_target_files() {
    netcfg_sync()
        .arg("diff")
        .arg(fixture("asa/device.cfg"))
        .arg(fixture("asa/target/fw1"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "object-group network g1\nnetwork-object host 10.1.1.3\n",
        ))
        .stdout(predicate::str::contains(
            "access-list outside_in line 1 extended permit ip host 2001:db8::1 any6",
        ))
        .stdout(predicate::str::contains(
            "access-list outside_in line 3 extended permit tcp any4 host 10.9.9.8 eq 22",
        ))
        .stdout(predicate::str::contains(
            "no route outside 0.0.0.0 0.0.0.0 10.0.0.1 1\\N route outside 0.0.0.0 0.0.0.0 10.0.0.2",
        ))
        .stderr(predicate::str::contains(
            "Interface 'inside' on device is not known by target",
        ))
        .stderr(predicate::str::contains("comp: *** device changed ***"));
}

#[test]
fn ios_diff_shows_notes_when_verbose() {
    netcfg_sync()
        .arg("-v")
        .arg("diff")
        .arg(fixture("ios/device.cfg"))
        .arg(fixture("ios/target/rt1"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ip access-list resequence in_gi1 10000 10000\n\
             ip access-list extended in_gi1\n\
             20001 permit tcp host 10.2.2.3 host 10.1.1.9 eq 22\n\
             ip access-list resequence in_gi1 10 10\n",
        ))
        .stdout(predicate::str::contains("ip route 10.5.0.0 255.255.0.0 10.1.1.253"))
        .stderr(predicate::str::contains("Leaving VRF mgmt untouched"))
        .stderr(predicate::str::contains("added=3 removed=0 mode=2"));
}

#[test]
fn json_output_has_all_parts() {
    let output = netcfg_sync()
        .arg("diff")
        .arg(fixture("ios/device.cfg"))
        .arg(fixture("ios/target/rt1"))
        .arg("--format")
        .arg("json")
        .arg("--quiet")
        .output()
        .expect("run");
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(v["changes"].as_array().map(Vec::len), Some(5));
    assert_eq!(v["notes"][0], "Leaving VRF mgmt untouched");
    assert!(!String::from_utf8_lossy(&output.stderr).contains("comp:"));
}

#[test]
fn bad_raw_file_is_reported_with_name() {
    let dir = tempdir().expect("tempdir");
    let device = dir.path().join("device.cfg");
    fs::write(&device, "hostname fw1\n").expect("write device");
    fs::write(dir.path().join("fw1.raw"), "bogus command\n").expect("write raw");

    netcfg_sync()
        .arg("diff")
        .arg(&device)
        .arg(dir.path().join("fw1"))
        .arg("--model")
        .arg("asa")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ERROR>>> While reading fw1.raw: "))
        .stderr(predicate::str::contains(">>bogus command<<"));
}

#[test]
fn missing_device_file_is_error() {
    let dir = tempdir().expect("tempdir");
    netcfg_sync()
        .arg("diff")
        .arg(dir.path().join("nothing"))
        .arg(fixture("asa/target/fw1"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR>>> Can't read"));
}

#[test]
fn unknown_target_interface_fails() {
    let dir = tempdir().expect("tempdir");
    let device = dir.path().join("device.cfg");
    let target = dir.path().join("fw1");
    fs::write(&device, "interface Ethernet0/0\n nameif outside\n").expect("write device");
    fs::write(
        &target,
        "access-list a extended deny ip any4 any4\naccess-group a in interface dmz\n",
    )
    .expect("write target");

    netcfg_sync()
        .args(["diff", "--model", "ASA"])
        .arg(&device)
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "ERROR>>> Interface 'dmz' from target not known on device",
        ));
}
