//! Integration tests for edge, traversal and delete commands

#![allow(deprecated)]

use predicates::prelude::*;

mod common;
use common::{init_workspace, run_ok, taxon_cmd};

fn seed(dir: &std::path::Path) {
    for name in ["Alpha", "Beta", "Gamma"] {
        run_ok(dir, &["resolve", name]);
    }
    run_ok(dir, &["edge", "add", "Alpha", "Beta"]);
    run_ok(dir, &["edge", "add", "Beta", "Gamma"]);
}

#[test]
fn test_edge_add_is_idempotent() {
    let temp = init_workspace();
    seed(temp.path());

    let again = run_ok(temp.path(), &["edge", "add", "alpha", "beta"]);
    assert!(again.contains("already exists"));
}

#[test]
fn test_cycle_is_rejected_with_path() {
    let temp = init_workspace();
    seed(temp.path());

    taxon_cmd()
        .current_dir(temp.path())
        .args(["edge", "add", "Gamma", "Alpha"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Edge would create a cycle: 1 -> 2 -> 3 -> 1"))
        .stderr(predicate::str::contains("edge remove"));

    let check = run_ok(temp.path(), &["edge", "check", "Gamma", "Alpha"]);
    assert!(check.contains("Would create a cycle: Alpha -> Beta -> Gamma -> Alpha"));

    let ok = run_ok(temp.path(), &["edge", "check", "Alpha", "Gamma"]);
    assert!(ok.contains("OK"));
}

#[test]
fn test_self_reference_is_rejected() {
    let temp = init_workspace();
    run_ok(temp.path(), &["resolve", "Alpha"]);

    taxon_cmd()
        .current_dir(temp.path())
        .args(["edge", "add", "Alpha", "alpha"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("cannot be its own parent"));
}

#[test]
fn test_edge_by_numeric_id() {
    let temp = init_workspace();
    run_ok(temp.path(), &["resolve", "Alpha"]);
    run_ok(temp.path(), &["resolve", "Beta"]);

    let added = run_ok(temp.path(), &["edge", "add", "1", "#2"]);
    assert!(added.contains("Added Alpha -> Beta"));
}

#[test]
fn test_traversals_and_tree() {
    let temp = init_workspace();
    seed(temp.path());

    let ancestors = run_ok(temp.path(), &["ancestors", "Gamma"]);
    assert!(ancestors.contains("Alpha"));
    assert!(ancestors.contains("Beta"));

    let descendants = run_ok(temp.path(), &["descendants", "Alpha"]);
    assert_eq!(descendants.lines().count(), 2);

    let children = run_ok(temp.path(), &["children", "Alpha"]);
    assert!(children.contains("Beta"));
    assert!(!children.contains("Gamma"));

    let tree = run_ok(temp.path(), &["tree"]);
    assert_eq!(tree, "Alpha\n  Beta\n    Gamma\n");
}

#[test]
fn test_delete_blocked_by_children() {
    let temp = init_workspace();
    seed(temp.path());

    taxon_cmd()
        .current_dir(temp.path())
        .args(["delete", "Beta"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("still has 1 child tag(s)"));

    run_ok(temp.path(), &["edge", "remove", "Beta", "Gamma"]);
    let deleted = run_ok(temp.path(), &["delete", "Beta"]);
    assert!(deleted.contains("Deleted Beta"));

    let children = run_ok(temp.path(), &["children", "Alpha"]);
    assert!(children.contains("No tags found"));
}

#[test]
fn test_unknown_tag_is_not_found() {
    let temp = init_workspace();

    taxon_cmd()
        .current_dir(temp.path())
        .args(["parents", "Nothing"])
        .assert()
        .code(3);
}
