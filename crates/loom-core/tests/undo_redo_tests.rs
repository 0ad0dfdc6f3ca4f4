// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use loom_core::{GraphError, Vec2};

#[test]
fn add_node_round_trips() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    assert!(c.can_undo());

    assert!(c.undo().unwrap());
    assert!(!c.graph().contains_node("Add"));
    assert!(c.can_redo());

    assert!(c.redo().unwrap());
    assert!(c.graph().contains_node("Add"));
}

#[test]
fn undo_on_an_empty_stack_reports_false() {
    let mut c = common::controller();
    assert!(!c.can_undo());
    assert!(!c.undo().unwrap());
    assert!(!c.redo().unwrap());
}

#[test]
fn remove_node_undo_restores_links_and_state() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();
    c.set_pin_default("Add_1.b", "4.0", true, false).unwrap();

    c.remove_node("Add_1", true).unwrap();
    assert!(c.undo().unwrap());
    assert!(c.graph().has_link("Add.result", "Add_1.a"));
    assert_eq!(c.get_pin_default("Add_1.b").unwrap(), "4.0");
}

#[test]
fn link_undo_restores_the_displaced_link() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "first", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "second", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "sink", true).unwrap();
    c.add_link("first.result", "sink.a", true).unwrap();

    // The second link displaces the first; one undo brings it back.
    c.add_link("second.result", "sink.a", true).unwrap();
    assert!(c.undo().unwrap());
    assert!(c.graph().has_link("first.result", "sink.a"));
    assert!(!c.graph().has_link("second.result", "sink.a"));
}

#[test]
fn a_new_action_clears_the_redo_stack() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    assert!(c.undo().unwrap());
    c.add_unit_node("math.AddInt", Vec2::ZERO, "", true).unwrap();
    assert!(!c.can_redo());
}

#[test]
fn brackets_undo_as_one_step() {
    let mut c = common::controller();
    c.open_undo_bracket("Build Pair");
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();
    c.close_undo_bracket().unwrap();

    assert!(c.undo().unwrap());
    assert!(c.graph().node_names().is_empty());
    assert!(!c.can_undo());

    assert!(c.redo().unwrap());
    assert!(c.graph().has_link("Add.result", "Add_1.a"));
}

#[test]
fn cancel_bracket_rolls_everything_back() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();

    c.open_undo_bracket("Abandoned");
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();
    c.cancel_undo_bracket().unwrap();

    assert_eq!(c.graph().node_names(), vec!["Add"]);
    assert!(c.graph().links().is_empty());

    assert_eq!(c.close_undo_bracket().unwrap_err(), GraphError::BracketMismatch);
}

#[test]
fn merged_moves_collapse_to_one_undo_step() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::new(1.0, 1.0), "", true).unwrap();
    c.set_node_position("Add", Vec2::new(10.0, 0.0), true, true).unwrap();
    c.set_node_position("Add", Vec2::new(20.0, 0.0), true, true).unwrap();
    c.set_node_position("Add", Vec2::new(30.0, 0.0), true, true).unwrap();

    assert!(c.undo().unwrap());
    assert_eq!(
        c.graph().find_node("Add").unwrap().position(),
        Vec2::new(1.0, 1.0)
    );
}

#[test]
fn merged_default_edits_collapse_to_one_undo_step() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.set_pin_default("Add.a", "1.0", true, true).unwrap();
    c.set_pin_default("Add.a", "2.0", true, true).unwrap();
    c.set_pin_default("Add.a", "3.0", true, true).unwrap();

    assert!(c.undo().unwrap());
    assert_eq!(c.get_pin_default("Add.a").unwrap(), "0.0");
}

#[test]
fn array_resize_round_trips_through_undo() {
    let mut c = common::controller();
    c.add_unit_node("array.Sum", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Sum.values.2", true).unwrap();

    c.set_array_pin_size("Sum.values", 0, "", true).unwrap();
    assert!(c.undo().unwrap());
    assert_eq!(c.graph().find_pin("Sum.values").unwrap().sub_pins().len(), 3);
    assert!(c.graph().has_link("Add.result", "Sum.values.2"));
}

#[test]
fn rename_round_trips_through_undo() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();

    c.rename_node("Add", "Source", true).unwrap();
    assert!(c.undo().unwrap());
    assert!(c.graph().has_link("Add.result", "Add_1.a"));
    assert!(c.redo().unwrap());
    assert!(c.graph().has_link("Source.result", "Add_1.a"));
}

#[test]
fn binding_undo_restores_the_broken_link() {
    let mut c = common::controller();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();

    c.bind_pin_to_variable("Add_1.a", "speed", "float", true).unwrap();
    assert!(c.undo().unwrap());
    assert!(c.graph().has_link("Add.result", "Add_1.a"));
    assert!(c.graph().find_pin("Add_1.a").unwrap().bound_variable().is_none());
}
