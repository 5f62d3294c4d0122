use std::path::PathBuf;

use netcfg_diff_core::{merge_into, parse, parse_config, reconcile, Configuration, Model};
use pretty_assertions::assert_eq;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("fixtures")
        .join(path)
}

fn asa(text: &str) -> Configuration {
    let grammar = Model::Asa.grammar().expect("grammar");
    parse(&grammar, text, false).expect("parse")
}

fn load(path: &str) -> Configuration {
    let grammar = Model::Asa.grammar().expect("grammar");
    let data = std::fs::read(fixture(path)).expect("read fixture");
    parse_config(&grammar, &data, path).expect("parse fixture")
}

fn changes(device: &str, target: &str) -> Vec<String> {
    reconcile(asa(device), asa(target), Model::Asa)
        .expect("reconcile")
        .changes
}

#[test]
fn device_config_is_idempotent() {
    let r = reconcile(load("asa/device.cfg"), load("asa/device.cfg"), Model::Asa)
        .expect("reconcile");
    assert!(!r.has_changes(), "{:?}", r.changes);
}

#[test]
fn merged_target_files_are_transferred() {
    let mut target = load("asa/target/fw1");
    merge_into(&mut target, load("asa/target/ipv6/fw1")).expect("merge ipv6");
    let warnings = merge_into(&mut target, load("asa/target/fw1.raw")).expect("merge raw");
    assert!(warnings.is_empty());

    let r = reconcile(load("asa/device.cfg"), target, Model::Asa).expect("reconcile");
    assert_eq!(
        r.changes,
        vec![
            "object-group network g1",
            "network-object host 10.1.1.3",
            "access-list outside_in line 1 extended permit ip host 2001:db8::1 any6",
            "access-list outside_in line 3 extended permit tcp any4 host 10.9.9.8 eq 22",
            "no route outside 0.0.0.0 0.0.0.0 10.0.0.1 1\nroute outside 0.0.0.0 0.0.0.0 10.0.0.2",
        ]
    );
    assert_eq!(
        r.warnings,
        vec!["Interface 'inside' on device is not known by target"]
    );
}

#[test]
fn default_route_is_replaced_atomically() {
    assert_eq!(
        changes(
            "route outside 0.0.0.0 0.0.0.0 10.1.1.1\n",
            "route outside 0.0.0.0 0.0.0.0 10.1.1.2\n",
        ),
        vec!["no route outside 0.0.0.0 0.0.0.0 10.1.1.1\nroute outside 0.0.0.0 0.0.0.0 10.1.1.2"]
    );
}

#[test]
fn acl_line_is_removed_by_line_number() {
    assert_eq!(
        changes(
            "access-list a1 extended permit ip host 10.1.1.1 any4\n\
             access-list a1 extended permit ip host 10.1.1.2 any4\n\
             access-list a1 extended deny ip any4 any4\n\
             access-group a1 in interface outside\n",
            "access-list a1 extended permit ip host 10.1.1.1 any4\n\
             access-list a1 extended deny ip any4 any4\n\
             access-group a1 in interface outside\n",
        ),
        vec!["no access-list a1 line 2 extended permit ip host 10.1.1.2 any4"]
    );
}

#[test]
fn changed_log_attribute_moves_line_in_one_change() {
    assert_eq!(
        changes(
            "access-list a1 extended permit ip host 10.1.1.1 any4\n\
             access-list a1 extended deny ip any4 any4\n\
             access-group a1 in interface outside\n",
            "access-list a1 extended permit ip host 10.1.1.1 any4 log\n\
             access-list a1 extended deny ip any4 any4\n\
             access-group a1 in interface outside\n",
        ),
        vec![
            "no access-list a1 line 1 extended permit ip host 10.1.1.1 any4\n\
             access-list a1 line 1 extended permit ip host 10.1.1.1 any4 log"
        ]
    );
}

#[test]
fn new_object_group_is_added_before_referencing_line() {
    assert_eq!(
        changes(
            "access-list a1 extended permit ip host 10.1.1.1 any4\n\
             access-list a1 extended deny ip any4 any4\n\
             access-group a1 in interface outside\n",
            "object-group network g2\n \
             network-object 10.2.0.0 255.255.0.0\n\
             access-list a1 extended permit ip host 10.1.1.1 any4\n\
             access-list a1 extended permit ip object-group g2 any4\n\
             access-list a1 extended deny ip any4 any4\n\
             access-group a1 in interface outside\n",
        ),
        vec![
            "object-group network g2-DRC-0",
            "network-object 10.2.0.0 255.255.0.0",
            "access-list a1 line 2 extended permit ip object-group g2-DRC-0 any4",
        ]
    );
}

#[test]
fn replaced_acl_is_cleared_after_use() {
    assert_eq!(
        changes(
            "object-group network g1\n \
             network-object host 10.1.1.1\n\
             access-list a1 extended permit ip object-group g1 any4\n\
             access-group a1 in interface outside\n",
            "access-list a2 extended permit tcp any4 any4 eq 443\n\
             access-group a2 in interface outside\n",
        ),
        vec![
            "access-list a2-DRC-0 extended permit tcp any4 any4 eq 443",
            "access-group a2-DRC-0 in interface outside",
            "clear configure access-list a1",
            "no object-group network g1",
        ]
    );
}

#[test]
fn symbolic_and_numeric_ports_are_equal() {
    assert!(changes(
        "access-list a1 extended permit tcp any4 host 10.1.1.1 eq https\n\
         access-group a1 in interface outside\n",
        "access-list a1 extended permit tcp any4 host 10.1.1.1 eq 443\n\
         access-group a1 in interface outside\n",
    )
    .is_empty());
}

#[test]
fn unknown_target_interface_aborts() {
    let err = reconcile(
        asa("interface Ethernet0/0\n nameif outside\n"),
        asa("access-list a extended deny ip any4 any4\naccess-group a in interface dmz\n"),
        Model::Asa,
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Interface 'dmz' from target not known on device"
    );
}
