// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use loom_core::{Controller, GraphNotice, NoticeKind, Vec2};
use loom_schema::{
    AggregateDesc, OperationDesc, PrototypeDesc, SchemaRegistry, TypeCatalog,
};

fn observed() -> (Controller, Rc<RefCell<Vec<GraphNotice>>>) {
    let mut c = common::controller();
    let seen: Rc<RefCell<Vec<GraphNotice>>> = Rc::default();
    let sink = Rc::clone(&seen);
    c.subscribe(Box::new(move |notice| sink.borrow_mut().push(notice.clone())));
    (c, seen)
}

fn kinds(seen: &RefCell<Vec<GraphNotice>>) -> Vec<NoticeKind> {
    seen.borrow().iter().map(|notice| notice.kind).collect()
}

#[test]
fn every_mutation_emits_one_notice() {
    let (mut c, seen) = observed();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();
    c.break_link("Add.result", "Add_1.a", true).unwrap();
    c.remove_node("Add_1", true).unwrap();

    let kinds = kinds(&seen);
    assert_eq!(
        kinds,
        vec![
            NoticeKind::NodeAdded,
            NoticeKind::NodeAdded,
            NoticeKind::LinkAdded,
            NoticeKind::LinkRemoved,
            NoticeKind::NodeRemoved,
        ]
    );
    assert_eq!(seen.borrow()[2].subject, "Add.result -> Add_1.a");
}

#[test]
fn displaced_links_notify_their_removal() {
    let (mut c, seen) = observed();
    c.add_unit_node("math.Add", Vec2::ZERO, "first", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "second", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "sink", true).unwrap();
    c.add_link("first.result", "sink.a", true).unwrap();
    seen.borrow_mut().clear();

    c.add_link("second.result", "sink.a", true).unwrap();
    let kinds = kinds(&seen);
    assert_eq!(kinds, vec![NoticeKind::LinkRemoved, NoticeKind::LinkAdded]);
}

#[test]
fn suspended_observers_miss_changes_until_resent() {
    let (mut c, seen) = observed();
    c.suspend_notifications(true);
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_link("Add.result", "Add_1.a", true).unwrap();
    assert!(seen.borrow().is_empty());

    c.suspend_notifications(false);
    c.resend_all_notifications();
    let kinds = kinds(&seen);
    assert_eq!(
        kinds,
        vec![
            NoticeKind::GraphChanged,
            NoticeKind::NodeAdded,
            NoticeKind::NodeAdded,
            NoticeKind::LinkAdded,
        ]
    );
}

#[test]
fn undo_notifies_the_inverse_changes() {
    let (mut c, seen) = observed();
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    seen.borrow_mut().clear();

    c.undo().unwrap();
    assert_eq!(kinds(&seen), vec![NoticeKind::NodeRemoved]);
    c.redo().unwrap();
    assert_eq!(
        kinds(&seen),
        vec![NoticeKind::NodeRemoved, NoticeKind::NodeAdded]
    );
}

/// A catalog that can lose an operation mid-session, as after a schema
/// reload.
struct ReloadableCatalog {
    before: SchemaRegistry,
    after: SchemaRegistry,
    reloaded: Cell<bool>,
}

impl TypeCatalog for ReloadableCatalog {
    fn find_operation(&self, name: &str) -> Option<&OperationDesc> {
        if self.reloaded.get() {
            self.after.find_operation(name)
        } else {
            self.before.find_operation(name)
        }
    }

    fn find_aggregate(&self, type_name: &str) -> Option<&AggregateDesc> {
        self.before.find_aggregate(type_name)
    }

    fn canonical_default(&self, type_name: &str, override_text: &str) -> String {
        self.before.canonical_default(type_name, override_text)
    }

    fn find_prototype(&self, notation: &str) -> Option<&PrototypeDesc> {
        self.before.find_prototype(notation)
    }
}

#[test]
fn stale_nodes_are_swept_without_undo() {
    let mut after = common::catalog();
    after.unregister_operation("math.AddInt").unwrap();
    let catalog = Rc::new(ReloadableCatalog {
        before: common::catalog(),
        after,
        reloaded: Cell::new(false),
    });

    let mut c = Controller::new(Rc::clone(&catalog) as Rc<dyn TypeCatalog>);
    c.add_unit_node("math.Add", Vec2::ZERO, "", true).unwrap();
    c.add_unit_node("math.AddInt", Vec2::ZERO, "stale", false).unwrap();

    catalog.reloaded.set(true);
    let removed = c.remove_stale_nodes();
    assert_eq!(removed, 1);
    assert!(!c.graph().contains_node("stale"));
    assert!(c.graph().contains_node("Add"));
    // The sweep is not undoable; the next undo is the last real edit.
    assert!(c.undo().unwrap());
    assert!(!c.graph().contains_node("Add"));
}
