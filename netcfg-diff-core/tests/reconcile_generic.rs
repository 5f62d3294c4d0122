//! Reconciliation with a small custom grammar.

use std::sync::Arc;

use netcfg_diff_core::{parse, reconcile, DiffError, Grammar, Model};
use pretty_assertions::assert_eq;

const GRAMMAR: &str = "
a $NAME $b
b $NAME $c
c $NAME *

[SIMPLE_OBJ]
pool $NAME *

[ANCHOR]
use $a
lease $pool
";

const CYCLE_GRAMMAR: &str = "
a $NAME $b
b $NAME $a

[ANCHOR]
use $a
";

fn run(device: &str, target: &str) -> Result<Vec<String>, DiffError> {
    run_with(GRAMMAR, device, target)
}

fn run_with(grammar: &str, device: &str, target: &str) -> Result<Vec<String>, DiffError> {
    let grammar = Arc::new(Grammar::compile(grammar).expect("grammar"));
    let a = parse(&grammar, device, false).expect("device");
    let b = parse(&grammar, target, false).expect("target");
    reconcile(a, b, Model::Asa).map(|r| r.changes)
}

#[test]
fn unused_chain_is_deleted_from_top_to_bottom() {
    let changes = run("c c1 x\nb b1 c1\na a1 b1\nuse a1\n", "").expect("reconcile");
    assert_eq!(
        changes,
        vec!["no use a1", "no a a1 b1", "no b b1 c1", "no c c1 x"]
    );
}

#[test]
fn chain_is_transferred_from_bottom_to_top() {
    let changes = run("", "c c1 x\nb b1 c1\na a1 b1\nuse a1\n").expect("reconcile");
    assert_eq!(
        changes,
        vec![
            "c c1-DRC-0 x",
            "b b1-DRC-0 c1-DRC-0",
            "a a1-DRC-0 b1-DRC-0",
            "use a1-DRC-0",
        ]
    );
}

#[test]
fn changed_end_of_chain_is_referenced_by_new_name() {
    let changes = run(
        "c c1 x\nb b1 c1\na a1 b1\nuse a1\n",
        "c c1 y\nb b1 c1\na a1 b1\nuse a1\n",
    )
    .expect("reconcile");
    assert_eq!(changes, vec!["c c1-DRC-0 y", "b b1 c1-DRC-0", "no c c1 x"]);
}

#[test]
fn mutually_referencing_objects_cant_be_deleted() {
    let err = run_with(CYCLE_GRAMMAR, "a a1 b1\nb b1 a1\nuse a1\n", "").unwrap_err();
    assert_eq!(
        err,
        DiffError::ReferenceCycle {
            objects: vec!["a a1".to_string(), "b b1".to_string()]
        }
    );
}

#[test]
fn simple_object_is_found_by_content() {
    let changes = run(
        "pool p1 10.0.0.1-10.0.0.9\npool p2 10.9.9.1-10.9.9.9\nlease p2\n",
        "pool t 10.0.0.1-10.0.0.9\nlease t\n",
    )
    .expect("reconcile");
    assert_eq!(changes, vec!["lease p1", "no pool p2 10.9.9.1-10.9.9.9"]);
}

#[test]
fn identical_configs_give_no_changes() {
    let cfg = "c c1 x\nb b1 c1\na a1 b1\nuse a1\npool p 1\nlease p\n";
    assert!(run(cfg, cfg).expect("reconcile").is_empty());
}
