// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use loom_core::{Controller, GraphError, GraphTarget, NodeKind, Vec2, ENTRY_NODE, RETURN_NODE};
use loom_schema::{PinDirection, EXECUTE_TYPE};

fn enter_function(c: &mut Controller, function: &str) {
    c.set_graph_target(GraphTarget::Library);
    c.push_graph(function, false).unwrap();
}

#[test]
fn mutable_functions_thread_execute_through_the_interface() {
    let mut c = common::controller();
    let function = c.add_function_to_library("Scale", true, true).unwrap();
    assert_eq!(function, "Scale");

    let definition = c.library_graph().find_node("Scale").unwrap();
    assert_eq!(definition.find_pin("execute").unwrap().ty(), EXECUTE_TYPE);
    let body = definition.contained_graph().unwrap();
    assert!(body.find_node(ENTRY_NODE).unwrap().find_pin("execute").is_some());
    assert!(body.find_node(RETURN_NODE).unwrap().find_pin("execute").is_some());
}

#[test]
fn graph_editing_is_forbidden_at_the_library_root() {
    let mut c = common::controller();
    c.set_graph_target(GraphTarget::Library);
    let err = c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap_err();
    assert!(matches!(err, GraphError::ForbiddenInLibrary(_)));
}

#[test]
fn exposed_pins_mirror_onto_entry_return_and_references() {
    let mut c = common::controller();
    c.add_function_to_library("Scale", true, true).unwrap();
    c.add_function_reference("Scale", Vec2::ZERO, "", true).unwrap();

    enter_function(&mut c, "Scale");
    let pin = c
        .add_exposed_pin("amount", PinDirection::Input, "float", "1.0", true)
        .unwrap();
    assert_eq!(pin, "amount");

    // Input pins mirror as entry outputs; outputs as return inputs.
    let entry_pin = c.graph().find_pin("Entry.amount").unwrap();
    assert_eq!(entry_pin.direction(), PinDirection::Output);
    let out = c
        .add_exposed_pin("scaled", PinDirection::Output, "float", "", true)
        .unwrap();
    assert_eq!(
        c.graph().find_pin(&format!("{RETURN_NODE}.{out}")).unwrap().direction(),
        PinDirection::Input
    );

    let reference = c.root_graph().find_node("Scale").unwrap();
    assert_eq!(reference.find_pin("amount").unwrap().default_value(), "1.0");
    assert!(reference.find_pin("scaled").is_some());
}

#[test]
fn renaming_an_exposed_pin_follows_body_links_and_references() {
    let mut c = common::controller();
    c.add_function_to_library("Scale", true, true).unwrap();
    c.add_function_reference("Scale", Vec2::ZERO, "", true).unwrap();

    enter_function(&mut c, "Scale");
    c.add_exposed_pin("amount", PinDirection::Input, "float", "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Entry.amount", "Add.a", true).unwrap();

    let renamed = c.rename_exposed_pin("amount", "factor", true).unwrap();
    assert_eq!(renamed, "factor");
    assert!(c.graph().has_link("Entry.factor", "Add.a"));
    assert!(c.root_graph().find_node("Scale").unwrap().find_pin("factor").is_some());
    assert!(c.root_graph().find_node("Scale").unwrap().find_pin("amount").is_none());
}

#[test]
fn removing_an_exposed_pin_breaks_links_everywhere() {
    let mut c = common::controller();
    c.add_function_to_library("Scale", true, true).unwrap();
    c.add_function_reference("Scale", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();

    enter_function(&mut c, "Scale");
    c.add_exposed_pin("amount", PinDirection::Input, "float", "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Entry.amount", "Add.a", true).unwrap();

    c.set_graph_target(GraphTarget::Root);
    c.add_link("Add.result", "Scale.amount", true).unwrap();

    enter_function(&mut c, "Scale");
    c.remove_exposed_pin("amount", true).unwrap();
    assert!(c.graph().links().is_empty());
    assert!(c.root_graph().links().is_empty());
    assert!(c.root_graph().find_node("Scale").unwrap().find_pin("amount").is_none());
}

#[test]
fn removing_a_definition_invalidates_its_references() {
    let mut c = common::controller();
    c.add_function_to_library("Scale", true, true).unwrap();
    c.add_function_reference("Scale", Vec2::ZERO, "", true).unwrap();

    c.remove_function_from_library("Scale", true).unwrap();
    assert!(c.library_graph().find_node("Scale").is_none());
    assert_eq!(
        c.root_graph().find_node("Scale").unwrap().kind(),
        &NodeKind::FunctionReference { definition: None }
    );

    // An unresolved reference cannot be expanded.
    let err = c.expand_node("Scale", true).unwrap_err();
    assert!(matches!(err, GraphError::WrongNodeKind { .. }));
}

#[test]
fn function_references_expand_from_the_definition_body() {
    let mut c = common::controller();
    c.add_function_to_library("Offset", false, true).unwrap();
    enter_function(&mut c, "Offset");
    c.add_exposed_pin("value", PinDirection::Input, "float", "", true).unwrap();
    c.add_exposed_pin("result", PinDirection::Output, "float", "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Entry.value", "Add.a", true).unwrap();
    c.add_link("Add.result", "Return.result", true).unwrap();

    c.set_graph_target(GraphTarget::Root);
    c.add_function_reference("Offset", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "Feed", true).unwrap();
    c.add_link("Feed.result", "Offset.value", true).unwrap();

    let expanded = c.expand_node("Offset", true).unwrap();
    assert_eq!(expanded, vec!["Add"]);
    assert!(c.graph().has_link("Feed.result", "Add.a"));
    // The definition itself is untouched.
    assert!(c.library_graph().find_node("Offset").is_some());
}

#[test]
fn promote_collapse_to_function_and_back() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "X", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "A", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "Y", true).unwrap();
    c.add_link("X.result", "A.a", true).unwrap();
    c.add_link("A.result", "Y.a", true).unwrap();
    c.collapse_nodes(&["A"], "Inner", true).unwrap();

    let function = c.promote_collapse_to_function("Inner", true).unwrap();
    assert_eq!(function, "Inner");
    assert!(c.library_graph().find_node("Inner").is_some());
    let reference = c.graph().find_node("Inner").unwrap();
    assert_eq!(
        reference.kind(),
        &NodeKind::FunctionReference {
            definition: Some("Inner".to_owned())
        }
    );
    assert!(c.graph().has_link("X.result", "Inner.a"));
    assert!(c.graph().has_link("Inner.result", "Y.a"));

    let collapse = c.promote_function_to_collapse("Inner", true).unwrap();
    assert!(matches!(
        c.graph().find_node(&collapse).unwrap().kind(),
        NodeKind::Collapse { .. }
    ));
    assert!(c.graph().has_link("X.result", &format!("{collapse}.a")));
    assert!(c.graph().has_link(&format!("{collapse}.result"), "Y.a"));
}

#[test]
fn exposed_pins_work_on_plain_collapse_nodes_too() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "A", true).unwrap();
    c.collapse_nodes(&["A"], "Inner", true).unwrap();

    c.push_graph("Inner", true).unwrap();
    c.add_exposed_pin("extra", PinDirection::Input, "float", "2.0", true).unwrap();
    c.add_link("Entry.extra", "A.b", true).unwrap();
    c.pop_graph(true).unwrap();

    let collapse = c.graph().find_node("Inner").unwrap();
    assert_eq!(collapse.find_pin("extra").unwrap().default_value(), "2.0");
}
