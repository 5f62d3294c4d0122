use std::path::PathBuf;

use netcfg_diff_core::{parse, parse_config, reconcile, Configuration, DiffError, Model};
use pretty_assertions::assert_eq;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("fixtures")
        .join(path)
}

fn ios(text: &str) -> Configuration {
    let grammar = Model::Ios.grammar().expect("grammar");
    parse(&grammar, text, false).expect("parse")
}

fn load(path: &str) -> Configuration {
    let grammar = Model::Ios.grammar().expect("grammar");
    let data = std::fs::read(fixture(path)).expect("read fixture");
    parse_config(&grammar, &data, path).expect("parse fixture")
}

const DEVICE_ACL: &str = "interface Gi1\n \
                          ip address 10.1.1.1 255.255.255.0\n \
                          ip access-group a in\n\
                          ip access-list extended a\n \
                          permit ip host 10.0.0.1 any\n \
                          permit ip host 10.0.0.2 any\n \
                          permit ip host 10.0.0.3 any\n \
                          deny ip any any\n";

#[test]
fn device_config_is_idempotent() {
    let r = reconcile(load("ios/device.cfg"), load("ios/device.cfg"), Model::Ios)
        .expect("reconcile");
    assert!(!r.has_changes(), "{:?}", r.changes);
    assert!(r.warnings.is_empty());
}

#[test]
fn target_file_is_transferred() {
    let r = reconcile(load("ios/device.cfg"), load("ios/target/rt1"), Model::Ios)
        .expect("reconcile");
    assert_eq!(
        r.changes,
        vec![
            "ip access-list resequence in_gi1 10000 10000",
            "ip access-list extended in_gi1",
            "20001 permit tcp host 10.2.2.3 host 10.1.1.9 eq 22",
            "ip access-list resequence in_gi1 10 10",
            "ip route 10.5.0.0 255.255.0.0 10.1.1.253",
        ]
    );
    assert_eq!(r.notes, vec!["Leaving VRF mgmt untouched"]);
}

#[test]
fn reordered_lines_inside_block_are_unchanged() {
    let target = "interface Gi1\n \
                  ip address 10.1.1.1 255.255.255.0\n \
                  ip access-group a in\n\
                  ip access-list extended a\n \
                  permit ip host 10.0.0.3 any\n \
                  permit ip host 10.0.0.1 any\n \
                  permit ip host 10.0.0.2 any\n \
                  deny ip any any\n";
    let r = reconcile(ios(DEVICE_ACL), ios(target), Model::Ios).expect("reconcile");
    assert!(r.changes.is_empty(), "{:?}", r.changes);
}

#[test]
fn deny_line_stays_inside_original_block_order() {
    let target = "interface Gi1\n \
                  ip address 10.1.1.1 255.255.255.0\n \
                  ip access-group a in\n\
                  ip access-list extended a\n \
                  permit ip host 10.0.0.1 any\n \
                  deny ip host 10.0.0.9 any\n \
                  permit ip host 10.0.0.2 any\n \
                  permit ip host 10.0.0.3 any\n \
                  deny ip any any\n";
    let r = reconcile(ios(DEVICE_ACL), ios(target), Model::Ios).expect("reconcile");
    assert_eq!(
        r.changes,
        vec![
            "ip access-list resequence a 10000 10000",
            "ip access-list extended a",
            "10001 deny ip host 10.0.0.9 any",
            "ip access-list resequence a 10 10",
        ]
    );
}

#[test]
fn removed_acl_line_is_deleted_by_number() {
    let target = "interface Gi1\n \
                  ip address 10.1.1.1 255.255.255.0\n \
                  ip access-group a in\n\
                  ip access-list extended a\n \
                  permit ip host 10.0.0.1 any\n \
                  permit ip host 10.0.0.3 any\n \
                  deny ip any any\n";
    let r = reconcile(ios(DEVICE_ACL), ios(target), Model::Ios).expect("reconcile");
    assert_eq!(
        r.changes,
        vec![
            "ip access-list resequence a 10000 10000",
            "ip access-list extended a",
            "no 20000",
            "ip access-list resequence a 10 10",
        ]
    );
}

#[test]
fn changed_log_attribute_is_moved_inside_acl_mode() {
    let device = "ip access-list extended a\n \
                  10 permit ip host 10.0.0.1 any\n \
                  20 permit ip host 10.0.0.2 any\n \
                  30 deny ip any any\n";
    let target = "ip access-list extended a\n \
                  permit ip host 10.0.0.1 any\n \
                  permit ip host 10.0.0.2 any log\n \
                  deny ip any any\n";
    let r = reconcile(ios(device), ios(target), Model::Ios).expect("reconcile");
    assert_eq!(
        r.changes,
        vec![
            "ip access-list resequence a 10000 10000",
            "ip access-list extended a",
            "no 20000\n20001 permit ip host 10.0.0.2 any log",
            "ip access-list resequence a 10 10",
        ]
    );
}

#[test]
fn too_many_lines_for_keyspace() {
    let mut target = String::from(
        "interface Gi1\n ip address 10.1.1.1 255.255.255.0\n ip access-group a in\n\
         ip access-list extended a\n permit ip host 10.0.0.1 any\n",
    );
    for i in 0..3 {
        target.push_str(&format!(" deny ip host 10.9.9.{i} any\n"));
    }
    target.push_str(" permit ip host 10.0.0.2 any\n permit ip host 10.0.0.3 any\n deny ip any any\n");
    let tuning = netcfg_diff_core::Tuning {
        acl_insert_limit: 2,
        ..Default::default()
    };
    let err = netcfg_diff_core::reconcile_with(ios(DEVICE_ACL), ios(&target), Model::Ios, &tuning)
        .unwrap_err();
    assert_eq!(err, DiffError::KeyspaceExceeded { limit: 2 });
}

#[test]
fn default_route_is_replaced_atomically() {
    let r = reconcile(
        ios("ip route 0.0.0.0 0.0.0.0 10.1.1.1\n"),
        ios("ip route 0.0.0.0 0.0.0.0 10.1.1.2\n"),
        Model::Ios,
    )
    .expect("reconcile");
    assert_eq!(
        r.changes,
        vec!["no ip route 0.0.0.0 0.0.0.0 10.1.1.1\nip route 0.0.0.0 0.0.0.0 10.1.1.2"]
    );
}

#[test]
fn missing_ipv6_routing_is_left_untouched() {
    let r = reconcile(
        ios("ip route 10.0.0.0 255.0.0.0 10.1.1.1\nipv6 route 2001:db8::/32 2001:db8:1::1\n"),
        ios("ip route 10.0.0.0 255.0.0.0 10.1.1.1\n"),
        Model::Ios,
    )
    .expect("reconcile");
    assert!(r.changes.is_empty(), "{:?}", r.changes);
    assert_eq!(r.notes, vec!["No ipv6 routing specified, leaving untouched"]);
}
