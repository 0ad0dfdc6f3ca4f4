// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use loom_core::{GraphError, NodeKind, Vec2};

#[test]
fn prototype_nodes_start_untyped() {
    let mut c = common::controller();
    let name = c
        .add_prototype_node("add(a,b,result)", Vec2::ZERO, "", true)
        .unwrap();
    assert_eq!(name, "add");
    let node = c.graph().find_node("add").unwrap();
    assert_eq!(
        node.kind(),
        &NodeKind::Prototype {
            notation: "add(a,b,result)".to_owned()
        }
    );
    assert!(node.pins().iter().all(|pin| pin.ty().is_empty()));
}

#[test]
fn unknown_notation_is_rejected() {
    let mut c = common::controller();
    let err = c
        .add_prototype_node("sub(a,b,result)", Vec2::ZERO, "", true)
        .unwrap_err();
    assert_eq!(err, GraphError::UnknownPrototype("sub(a,b,result)".to_owned()));
}

#[test]
fn one_float_link_resolves_to_the_float_overload() {
    let mut c = common::controller();
    c.add_prototype_node("add(a,b,result)", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();

    c.add_link("Add.result", "add.a", true).unwrap();
    let node = c.graph().find_node("add").unwrap();
    assert_eq!(
        node.kind(),
        &NodeKind::Unit {
            operation: "math.Add".to_owned()
        }
    );
    // The resolved node keeps its name and the link that resolved it.
    assert!(c.graph().has_link("Add.result", "add.a"));
    assert_eq!(node.find_pin("b").unwrap().ty(), "float");
}

#[test]
fn an_int_link_picks_the_int_overload() {
    let mut c = common::controller();
    c.add_prototype_node("add(a,b,result)", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.AddInt", Vec2::ZERO, "", true).unwrap();

    c.add_link("AddInt.result", "add.a", true).unwrap();
    assert_eq!(
        c.graph().find_node("add").unwrap().kind(),
        &NodeKind::Unit {
            operation: "math.AddInt".to_owned()
        }
    );
}

#[test]
fn unsupported_types_do_not_link() {
    let mut c = common::controller();
    c.add_prototype_node("add(a,b,result)", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("app.Tick", Vec2::ZERO, "", true).unwrap();
    let err = c.add_link("Tick.execute", "add.a", true).unwrap_err();
    assert!(matches!(err, GraphError::CannotLink { .. }));
}

#[test]
fn resolution_ripples_through_prototype_chains() {
    let mut c = common::controller();
    c.add_prototype_node("add(a,b,result)", Vec2::ZERO, "left", true).unwrap();
    c.add_prototype_node("add(a,b,result)", Vec2::ZERO, "right", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();

    // Two unresolved pins cannot carry a link yet.
    let err = c.add_link("left.result", "right.a", true).unwrap_err();
    assert!(matches!(err, GraphError::CannotLink { .. }));

    // A concrete feed resolves the first prototype, and linking onward
    // carries the concrete type into the second.
    c.add_link("Add.result", "left.a", true).unwrap();
    assert_eq!(
        c.graph().find_node("left").unwrap().kind(),
        &NodeKind::Unit {
            operation: "math.Add".to_owned()
        }
    );

    c.add_link("left.result", "right.a", true).unwrap();
    assert_eq!(
        c.graph().find_node("right").unwrap().kind(),
        &NodeKind::Unit {
            operation: "math.Add".to_owned()
        }
    );
    assert!(c.graph().has_link("left.result", "right.a"));
}

#[test]
fn resolution_undoes_back_to_the_prototype() {
    let mut c = common::controller();
    c.add_prototype_node("add(a,b,result)", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "add.a", true).unwrap();

    assert!(c.undo().unwrap());
    let node = c.graph().find_node("add").unwrap();
    assert_eq!(
        node.kind(),
        &NodeKind::Prototype {
            notation: "add(a,b,result)".to_owned()
        }
    );
    assert!(node.pins().iter().all(|pin| pin.ty().is_empty()));
    assert!(c.graph().links().is_empty());

    assert!(c.redo().unwrap());
    assert_eq!(
        c.graph().find_node("add").unwrap().kind(),
        &NodeKind::Unit {
            operation: "math.Add".to_owned()
        }
    );
}

#[test]
fn vector_links_resolve_the_aggregate_overload_with_sub_pins() {
    let mut c = common::controller();
    c.add_prototype_node("add(a,b,result)", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.AddVector", Vec2::ZERO, "", true).unwrap();

    c.add_link("AddVector.result", "add.a", true).unwrap();
    let node = c.graph().find_node("add").unwrap();
    assert_eq!(
        node.kind(),
        &NodeKind::Unit {
            operation: "math.AddVector".to_owned()
        }
    );
    assert_eq!(node.find_pin("b").unwrap().sub_pins().len(), 2);
    assert_eq!(node.find_pin("b").unwrap().default_value(), "(x=0.0,y=1.0)");
}
