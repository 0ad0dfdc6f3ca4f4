// SPDX-License-Identifier: Apache-2.0
//! Link operations.
//!
//! `add_link` enforces the structural invariants up front: directions and
//! types must agree, input pins keep at most one incoming link (links on the
//! target, its sub-pins and its ancestors are broken first), an execute
//! source keeps at most one outgoing link, bindings and links stay
//! exclusive, and the data-flow graph stays acyclic.

use rustc_hash::FxHashSet;

use crate::action::Action;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::link::Link;
use crate::node::NodeKind;
use crate::notify::NoticeKind;
use crate::pin::{parent_path, split_node_and_pin};

use super::Controller;

impl Controller {
    /// Links an output pin to an input pin, breaking whatever the
    /// invariants require first and resolving prototype nodes on both ends
    /// afterwards. Accepts the endpoints in either order.
    pub fn add_link(
        &mut self,
        source: &str,
        target: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let (source, target) = self.orient_link(source, target)?;
        self.can_link(&source, &target)?;
        if self.graph().has_link(&source, &target) {
            return Ok(());
        }
        self.begin_action(setup_undo, "Add Link");
        let result = (|| {
            if self.require_pin(&source)?.is_execute() {
                let outgoing = self.graph().links_from(&source, false);
                for link in outgoing {
                    self.break_link(&link.source, &link.target, setup_undo)?;
                }
            }
            self.break_links_covering(&target, setup_undo)?;
            self.unbind_covering(&target, setup_undo)?;
            self.record(setup_undo, Action::AddLink {
                source: source.clone(),
                target: target.clone(),
            });
            self.apply_add_link(&source, &target)?;
            if setup_undo {
                self.expand_ancestors(&source, setup_undo)?;
                self.expand_ancestors(&target, setup_undo)?;
            }
            self.resolve_prototypes_after_link(&source, &target, setup_undo)
        })();
        match result {
            Ok(()) => {
                self.end_action(setup_undo);
                Ok(())
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// Breaks one exact link.
    pub fn break_link(
        &mut self,
        source: &str,
        target: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        if !self.graph().has_link(source, target) {
            return Err(GraphError::LinkNotFound {
                source_pin: source.to_owned(),
                target_pin: target.to_owned(),
            });
        }
        self.record(setup_undo, Action::BreakLink {
            source: source.to_owned(),
            target: target.to_owned(),
        });
        self.apply_break_link(source, target)
    }

    /// Breaks all links on one side of a pin and its sub-pins. Returns the
    /// number of links broken.
    pub fn break_all_links(
        &mut self,
        path: &str,
        as_input: bool,
        setup_undo: bool,
    ) -> Result<usize, GraphError> {
        self.require_pin(path)?;
        let links = if as_input {
            self.graph().links_into(path, true)
        } else {
            self.graph().links_from(path, true)
        };
        if links.is_empty() {
            return Ok(0);
        }
        self.begin_action(setup_undo, "Break Links");
        for link in &links {
            if let Err(error) = self.break_link(&link.source, &link.target, setup_undo) {
                self.cancel_action(setup_undo);
                return Err(error);
            }
        }
        self.end_action(setup_undo);
        Ok(links.len())
    }

    /// Breaks incoming links on the pin, its descendants and its ancestors.
    /// An input pin is fed by at most one place across its whole subtree.
    fn break_links_covering(&mut self, target: &str, setup_undo: bool) -> Result<(), GraphError> {
        let mut doomed = self.graph().links_into(target, true);
        let mut ancestor = parent_path(target).map(str::to_owned);
        while let Some(path) = ancestor {
            if split_node_and_pin(&path).is_none() {
                break;
            }
            doomed.extend(self.graph().links_into(&path, false));
            ancestor = parent_path(&path).map(str::to_owned);
        }
        for link in doomed {
            self.break_link(&link.source, &link.target, setup_undo)?;
        }
        Ok(())
    }

    /// Removes a variable binding on the target's root pin, if any.
    fn unbind_covering(&mut self, target: &str, setup_undo: bool) -> Result<(), GraphError> {
        let Some((node, pin_path)) = split_node_and_pin(target) else {
            return Err(GraphError::PinNotFound(target.to_owned()));
        };
        let root_segment = pin_path.split('.').next().unwrap_or(pin_path);
        let root = format!("{node}.{root_segment}");
        if self.require_pin(&root)?.bound_variable().is_some() {
            self.unbind_pin_from_variable(&root, setup_undo)?;
        }
        Ok(())
    }

    fn expand_ancestors(&mut self, path: &str, setup_undo: bool) -> Result<(), GraphError> {
        let mut ancestor = parent_path(path).map(str::to_owned);
        while let Some(current) = ancestor {
            if split_node_and_pin(&current).is_none() {
                break;
            }
            self.set_pin_expansion(&current, true, setup_undo)?;
            ancestor = parent_path(&current).map(str::to_owned);
        }
        Ok(())
    }

    /// Reorders the endpoints so the output comes first, when the given
    /// order is backwards but unambiguous.
    fn orient_link(&self, a: &str, b: &str) -> Result<(String, String), GraphError> {
        let pin_a = self.require_pin(a)?;
        let pin_b = self.require_pin(b)?;
        if pin_a.direction().provides_outgoing() {
            return Ok((a.to_owned(), b.to_owned()));
        }
        if pin_b.direction().provides_outgoing() && pin_a.direction().accepts_incoming() {
            return Ok((b.to_owned(), a.to_owned()));
        }
        Err(GraphError::CannotLink {
            source_pin: a.to_owned(),
            target_pin: b.to_owned(),
            reason: "neither pin provides an output".to_owned(),
        })
    }

    fn can_link(&self, source: &str, target: &str) -> Result<(), GraphError> {
        let fail = |reason: &str| GraphError::CannotLink {
            source_pin: source.to_owned(),
            target_pin: target.to_owned(),
            reason: reason.to_owned(),
        };
        let (source_node, _) =
            split_node_and_pin(source).ok_or_else(|| GraphError::PinNotFound(source.to_owned()))?;
        let (target_node, _) =
            split_node_and_pin(target).ok_or_else(|| GraphError::PinNotFound(target.to_owned()))?;
        if source == target {
            return Err(fail("a pin cannot link to itself"));
        }
        if source_node == target_node {
            return Err(fail("a node cannot link to itself"));
        }
        let source_pin = self.require_pin(source)?;
        let target_pin = self.require_pin(target)?;
        if !source_pin.direction().provides_outgoing() {
            return Err(fail("source pin is not an output"));
        }
        if !target_pin.direction().accepts_incoming() {
            return Err(fail("target pin is not an input"));
        }
        if source_pin.is_execute() != target_pin.is_execute() {
            return Err(fail("execute pins only link to execute pins"));
        }
        let source_ty = source_pin.ty();
        let target_ty = target_pin.ty();
        match (source_ty.is_empty(), target_ty.is_empty()) {
            (false, false) => {
                if source_ty != target_ty {
                    return Err(fail("pin types do not match"));
                }
            }
            (true, false) => self.check_prototype_accepts(source, target_ty, &fail)?,
            (false, true) => self.check_prototype_accepts(target, source_ty, &fail)?,
            (true, true) => {
                return Err(fail("cannot link two unresolved pins"));
            }
        }
        if reaches(self.graph(), target_node, source_node) {
            return Err(fail("link would create a cycle"));
        }
        Ok(())
    }

    /// Whether the prototype node owning the untyped pin at `path` still has
    /// an overload giving that pin the type `ty`.
    fn check_prototype_accepts(
        &self,
        path: &str,
        ty: &str,
        fail: &impl Fn(&str) -> GraphError,
    ) -> Result<(), GraphError> {
        let (node_name, pin_name) =
            split_node_and_pin(path).ok_or_else(|| GraphError::PinNotFound(path.to_owned()))?;
        let node = self.require_node(node_name)?;
        let NodeKind::Prototype { notation } = node.kind() else {
            return Err(fail("pin has no type"));
        };
        let Some(desc) = self.catalog().find_prototype(notation) else {
            return Err(fail("unknown prototype"));
        };
        let known = self.known_prototype_types(node_name);
        if !desc.supports_type(pin_name, ty, &known) {
            return Err(fail("no overload supports this type"));
        }
        Ok(())
    }
}

/// Whether `to` is reachable from `from` following links downstream.
fn reaches(graph: &Graph, from: &str, to: &str) -> bool {
    let mut stack = vec![from.to_owned()];
    let mut visited = FxHashSet::default();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        for link in graph.links() {
            if let Some((source_node, _)) = split_node_and_pin(&link.source) {
                if source_node == current {
                    if let Some((target_node, _)) = split_node_and_pin(&link.target) {
                        stack.push(target_node.to_owned());
                    }
                }
            }
        }
    }
    false
}

impl Controller {
    pub(crate) fn apply_add_link(&mut self, source: &str, target: &str) -> Result<(), GraphError> {
        if self.graph().find_pin(source).is_none() {
            return Err(GraphError::PinNotFound(source.to_owned()));
        }
        if self.graph().find_pin(target).is_none() {
            return Err(GraphError::PinNotFound(target.to_owned()));
        }
        let link = Link::new(source, target);
        let display = link.display();
        self.graph_mut()?.add_link_record(link);
        self.notify(NoticeKind::LinkAdded, display);
        Ok(())
    }

    pub(crate) fn apply_break_link(
        &mut self,
        source: &str,
        target: &str,
    ) -> Result<(), GraphError> {
        if !self.graph_mut()?.remove_link_record(source, target) {
            return Err(GraphError::LinkNotFound {
                source_pin: source.to_owned(),
                target_pin: target.to_owned(),
            });
        }
        self.notify(
            NoticeKind::LinkRemoved,
            format!("{source} -> {target}"),
        );
        Ok(())
    }
}
