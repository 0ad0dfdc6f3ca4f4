// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use loom_core::{GraphError, Vec2};

#[test]
fn links_connect_matching_types_in_either_order() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();

    // Endpoints may come in target-first order.
    c.add_link("Add_1.a", "Add.result", true).unwrap();
    assert!(c.graph().has_link("Add.result", "Add_1.a"));

    // Re-adding the same link is a no-op.
    c.add_link("Add.result", "Add_1.a", true).unwrap();
    assert_eq!(c.graph().links().len(), 1);
}

#[test]
fn type_mismatch_is_rejected() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.AddInt", Vec2::ZERO, "", true).unwrap();
    let err = c.add_link("Add.result", "AddInt.a", true).unwrap_err();
    assert!(matches!(err, GraphError::CannotLink { .. }));
}

#[test]
fn two_outputs_cannot_link() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    let err = c.add_link("Add.result", "Add_1.result", true).unwrap_err();
    assert!(matches!(err, GraphError::CannotLink { .. }));
}

#[test]
fn input_pins_keep_at_most_one_incoming_link() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "first", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "second", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "sink", true).unwrap();

    c.add_link("first.result", "sink.a", true).unwrap();
    c.add_link("second.result", "sink.a", true).unwrap();
    assert!(!c.graph().has_link("first.result", "sink.a"));
    assert!(c.graph().has_link("second.result", "sink.a"));
}

#[test]
fn linking_a_sub_pin_breaks_the_parent_link() {
    let mut c = common::controller();
    c.add_unit_node("math.AddVector", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.AddVector", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();

    c.add_link("AddVector.result", "AddVector_1.a", true).unwrap();
    c.add_link("Add.result", "AddVector_1.a.x", true).unwrap();
    assert!(!c.graph().has_link("AddVector.result", "AddVector_1.a"));
    assert!(c.graph().has_link("Add.result", "AddVector_1.a.x"));
}

#[test]
fn an_execute_source_keeps_one_outgoing_link() {
    let mut c = common::controller();
    c.add_unit_node("app.Tick", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("debug.PrintFloat", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("debug.PrintFloat", Vec2::ZERO, "", true).unwrap();

    c.add_link("Tick.execute", "PrintFloat.execute", true).unwrap();
    c.add_link("Tick.execute", "PrintFloat_1.execute", true).unwrap();
    assert!(!c.graph().has_link("Tick.execute", "PrintFloat.execute"));
    assert!(c.graph().has_link("Tick.execute", "PrintFloat_1.execute"));
}

#[test]
fn execute_only_links_to_execute() {
    let mut c = common::controller();
    c.add_unit_node("app.Tick", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("debug.PrintFloat", Vec2::ZERO, "", true).unwrap();
    let err = c.add_link("Tick.execute", "PrintFloat.value", true).unwrap_err();
    assert!(matches!(err, GraphError::CannotLink { .. }));
}

#[test]
fn cycles_are_rejected_and_rolled_back() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();

    let err = c.add_link("Add_1.result", "Add.a", true).unwrap_err();
    assert!(matches!(err, GraphError::CannotLink { .. }));
    assert_eq!(c.graph().links().len(), 1);
}

#[test]
fn break_link_requires_the_exact_link() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();

    let err = c.break_link("Add.result", "Add_1.b", true).unwrap_err();
    assert!(matches!(err, GraphError::LinkNotFound { .. }));
    c.break_link("Add.result", "Add_1.a", true).unwrap();
    assert!(c.graph().links().is_empty());
}

#[test]
fn link_errors_name_both_endpoints() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();

    let err = c.break_link("Add.result", "Add_1.a", true).unwrap_err();
    assert_eq!(err.to_string(), "cannot find link 'Add.result' -> 'Add_1.a'");
    let err = c.add_link("Add.a", "Add_1.b", true).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot link 'Add.a' to 'Add_1.b': neither pin provides an output"
    );
}

#[test]
fn break_all_links_covers_sub_pins() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.AddVector", Vec2::ZERO, "", true).unwrap();

    c.add_link("Add.result", "AddVector.a.x", true).unwrap();
    c.add_link("Add_1.result", "AddVector.a.y", true).unwrap();
    let broken = c.break_all_links("AddVector.a", true, true).unwrap();
    assert_eq!(broken, 2);
    assert!(c.graph().links().is_empty());
}

#[test]
fn binding_and_links_stay_exclusive() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();

    c.bind_pin_to_variable("Add_1.a", "speed", "float", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();
    assert!(c.graph().find_pin("Add_1.a").unwrap().bound_variable().is_none());

    c.bind_pin_to_variable("Add_1.a", "speed", "float", true).unwrap();
    assert!(!c.graph().has_link("Add.result", "Add_1.a"));
    assert_eq!(
        c.graph().find_pin("Add_1.a").unwrap().bound_variable(),
        Some("speed")
    );
}

#[test]
fn binding_checks_type_compatibility() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    let err = c
        .bind_pin_to_variable("Add.a", "count", "int", true)
        .unwrap_err();
    assert!(matches!(err, GraphError::IncompatibleBinding { .. }));
}
