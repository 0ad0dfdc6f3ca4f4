// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use std::rc::Rc;

use loom_core::{Controller, PinRedirectMap, Vec2};
use loom_schema::{OperationDesc, PinDecl, PinDirection};

/// The same catalog after a schema change: `math.Add` lost its `result`
/// pin in favor of `output`, and `math.AddInt` is gone entirely.
fn changed_catalog_controller() -> Controller {
    let mut registry = common::catalog();
    registry.unregister_operation("math.AddInt").unwrap();
    registry.unregister_operation("math.Add").unwrap();
    let pin = |name: &str, direction: PinDirection| PinDecl {
        name: name.to_owned(),
        direction,
        ty: "float".to_owned(),
        default: String::new(),
    };
    registry
        .register_operation(OperationDesc {
            name: "math.Add".to_owned(),
            pins: vec![
                pin("a", PinDirection::Input),
                pin("b", PinDirection::Input),
                pin("output", PinDirection::Output),
            ],
            is_event: false,
        })
        .unwrap();
    Controller::new(Rc::new(registry))
}

fn linked_pair() -> Controller {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::new(100.0, 0.0), "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();
    c.set_pin_default("Add.b", "4.0", true, false).unwrap();
    c
}

#[test]
fn import_into_the_same_graph_renames_and_remaps() {
    let mut c = linked_pair();
    let text = c.export_nodes_to_text(&["Add", "Add_1"]).unwrap();
    assert!(c.can_import_nodes_from_text(&text));

    let imported = c
        .import_nodes_from_text(&text, Vec2::new(50.0, 50.0), true)
        .unwrap();
    assert_eq!(imported.len(), 2);
    assert!(c.graph().has_link(
        &format!("{}.result", imported[0]),
        &format!("{}.a", imported[1])
    ));
    assert_eq!(
        c.get_pin_default(&format!("{}.b", imported[0])).unwrap(),
        "4.0"
    );
    let pasted = c.graph().find_node(&imported[0]).unwrap();
    assert_eq!(pasted.position(), Vec2::new(50.0, 50.0));
}

#[test]
fn export_captures_only_links_among_the_named_nodes() {
    let mut c = linked_pair();
    c.add_unit_node("math.Add", Vec2::ZERO, "Outside", true).unwrap();
    c.add_link("Add_1.result", "Outside.a", true).unwrap();

    let text = c.export_nodes_to_text(&["Add", "Add_1"]).unwrap();
    let mut fresh = common::controller();
    let imported = fresh.import_nodes_from_text(&text, Vec2::ZERO, true).unwrap();
    assert_eq!(imported, vec!["Add", "Add_1"]);
    assert_eq!(fresh.graph().links().len(), 1);
}

#[test]
fn selection_export_matches_node_export() {
    let mut c = linked_pair();
    c.set_node_selection(&["Add", "Add_1"], true).unwrap();
    assert_eq!(
        c.export_selection_to_text().unwrap(),
        c.export_nodes_to_text(&["Add", "Add_1"]).unwrap()
    );
}

#[test]
fn garbage_text_does_not_import() {
    let mut c = common::controller();
    assert!(!c.can_import_nodes_from_text("not a clip"));
    assert!(c.import_nodes_from_text("not a clip", Vec2::ZERO, true).is_err());
}

#[test]
fn unknown_operations_are_skipped_on_import() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.AddInt", Vec2::ZERO, "", true).unwrap();
    let text = c.export_nodes_to_text(&["Add", "AddInt"]).unwrap();

    let mut changed = changed_catalog_controller();
    assert!(!changed.can_import_nodes_from_text(&text));
    let imported = changed.import_nodes_from_text(&text, Vec2::ZERO, true).unwrap();
    assert_eq!(imported, vec!["Add"]);
}

#[test]
fn import_survives_undo() {
    let mut c = linked_pair();
    let text = c.export_nodes_to_text(&["Add", "Add_1"]).unwrap();
    let imported = c.import_nodes_from_text(&text, Vec2::ZERO, true).unwrap();

    assert!(c.undo().unwrap());
    for name in &imported {
        assert!(!c.graph().contains_node(name));
    }
    assert!(c.redo().unwrap());
    assert!(c.graph().contains_node(&imported[1]));
}

#[test]
fn repopulate_rebuilds_pins_from_the_new_schema() {
    let mut c = linked_pair();
    let text = c.export_nodes_to_text(&["Add", "Add_1"]).unwrap();

    let mut changed = changed_catalog_controller();
    changed.import_nodes_from_text(&text, Vec2::ZERO, true).unwrap();
    assert!(changed.graph().has_link("Add.result", "Add_1.a"));

    let mut redirects = PinRedirectMap::new();
    redirects.insert("result", "output");
    changed.repopulate_node_pins("Add", &redirects, true).unwrap();
    changed.repopulate_node_pins("Add_1", &redirects, true).unwrap();

    let node = changed.graph().find_node("Add").unwrap();
    assert!(node.find_pin("result").is_none());
    assert!(node.find_pin("output").is_some());
    // The default carried over and the link followed the redirect.
    assert_eq!(changed.get_pin_default("Add.b").unwrap(), "4.0");
    assert!(changed.graph().has_link("Add.output", "Add_1.a"));
}

#[test]
fn repopulate_drops_links_whose_pin_vanished() {
    let mut c = linked_pair();
    let text = c.export_nodes_to_text(&["Add", "Add_1"]).unwrap();

    let mut changed = changed_catalog_controller();
    changed.import_nodes_from_text(&text, Vec2::ZERO, true).unwrap();

    // Without a redirect the old `result` endpoint has nowhere to go.
    changed
        .repopulate_node_pins("Add", &PinRedirectMap::new(), true)
        .unwrap();
    assert!(changed.graph().links().is_empty());
}
