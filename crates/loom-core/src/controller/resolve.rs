// SPDX-License-Identifier: Apache-2.0
//! Prototype resolution.
//!
//! After every new link, both endpoint nodes are given a chance to narrow
//! their overload set. A prototype pin adopts the concrete type of a linked
//! neighbor when some overload still supports it; once exactly one overload
//! remains, the prototype node is swapped in place for a unit node of the
//! concrete operation, keeping its name, position, links, defaults and pin
//! state. Resolution then ripples to linked neighbors. A shared visited set
//! bounds the traversal, so prototype chains resolve in one pass and cycles
//! terminate.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use loom_schema::PrototypeResolution;

use crate::action::Action;
use crate::error::GraphError;
use crate::node::{Node, NodeKind};
use crate::notify::NoticeKind;
use crate::pin::{split_node_and_pin, Pin};
use crate::pintree::{apply_default, build_pin, build_pins_for_operation};

use super::Controller;

impl Controller {
    /// Concrete types already carried by a prototype node's root pins.
    pub(crate) fn known_prototype_types(&self, node_name: &str) -> BTreeMap<String, String> {
        let mut known = BTreeMap::new();
        if let Some(node) = self.graph().find_node(node_name) {
            for pin in node.pins() {
                if !pin.ty().is_empty() {
                    known.insert(pin.name().to_owned(), pin.ty().to_owned());
                }
            }
        }
        known
    }

    pub(crate) fn resolve_prototypes_after_link(
        &mut self,
        source: &str,
        target: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let mut visited = FxHashSet::default();
        for path in [source, target] {
            if let Some((node, _)) = split_node_and_pin(path) {
                let node = node.to_owned();
                self.potentially_resolve_prototype(&node, &mut visited, setup_undo)?;
            }
        }
        Ok(())
    }

    fn potentially_resolve_prototype(
        &mut self,
        name: &str,
        visited: &mut FxHashSet<String>,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        if !visited.insert(name.to_owned()) {
            return Ok(());
        }
        let Some(node) = self.graph().find_node(name) else {
            return Ok(());
        };
        let NodeKind::Prototype { notation } = node.kind() else {
            return Ok(());
        };
        let notation = notation.clone();
        let catalog = self.catalog_handle();
        let Some(desc) = catalog.find_prototype(&notation) else {
            return Ok(());
        };

        // Adopt types from linked neighbors onto untyped pins.
        let mut adoptions: Vec<(String, String)> = Vec::new();
        {
            let node = self.require_node(name)?;
            let known = self.known_prototype_types(name);
            for pin in node.pins() {
                if !pin.ty().is_empty() {
                    continue;
                }
                let path = format!("{name}.{}", pin.name());
                let mut neighbor_ty: Option<String> = None;
                for link in self.graph().links() {
                    let other = if link.source == path {
                        &link.target
                    } else if link.target == path {
                        &link.source
                    } else {
                        continue;
                    };
                    if let Some(other_pin) = self.graph().find_pin(other) {
                        if !other_pin.ty().is_empty() {
                            neighbor_ty = Some(other_pin.ty().to_owned());
                            break;
                        }
                    }
                }
                if let Some(ty) = neighbor_ty {
                    if desc.supports_type(pin.name(), &ty, &known) {
                        adoptions.push((pin.name().to_owned(), ty));
                    }
                }
            }
        }
        for (pin_name, ty) in adoptions {
            self.adopt_pin_type(name, &pin_name, &ty, setup_undo)?;
        }

        // Narrow the overload set.
        let known = self.known_prototype_types(name);
        match catalog.resolve_prototype(&notation, &known) {
            PrototypeResolution::Resolved(operation) => {
                self.resolve_into_operation(name, &operation, setup_undo)?;
            }
            PrototypeResolution::Partial(forced) => {
                for (pin_name, ty) in forced {
                    if !known.contains_key(&pin_name) {
                        self.adopt_pin_type(name, &pin_name, &ty, setup_undo)?;
                    }
                }
            }
            PrototypeResolution::Unresolved => {}
        }

        // Ripple to linked neighbors.
        let mut neighbors: Vec<String> = Vec::new();
        for link in self.graph().links_touching_node(name) {
            for endpoint in [&link.source, &link.target] {
                if let Some((other, _)) = split_node_and_pin(endpoint) {
                    if other != name && !neighbors.iter().any(|n| n == other) {
                        neighbors.push(other.to_owned());
                    }
                }
            }
        }
        for neighbor in neighbors {
            self.potentially_resolve_prototype(&neighbor, visited, setup_undo)?;
        }
        Ok(())
    }

    /// Gives a concrete type to one untyped root pin of a prototype node.
    fn adopt_pin_type(
        &mut self,
        node: &str,
        pin_name: &str,
        ty: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let path = format!("{node}.{pin_name}");
        let old = self.require_pin(&path)?.clone();
        if old.ty() == ty {
            return Ok(());
        }
        let catalog = self.catalog_handle();
        let new = build_pin(catalog.as_ref(), pin_name, old.direction(), ty, "");
        self.record(setup_undo, Action::ReplacePin {
            pin: path.clone(),
            old: Box::new(old),
            new: Box::new(new.clone()),
        });
        self.apply_replace_pin(&path, new)
    }

    /// Swaps a fully narrowed prototype node for a unit node of the
    /// resolved operation.
    fn resolve_into_operation(
        &mut self,
        name: &str,
        operation: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let catalog = self.catalog_handle();
        let desc = catalog
            .find_operation(operation)
            .ok_or_else(|| GraphError::UnknownOperation(operation.to_owned()))?;
        let old = self.require_node(name)?.clone();
        let mut replacement = Node::new(
            name,
            NodeKind::Unit {
                operation: operation.to_owned(),
            },
        );
        replacement.set_position(old.position());
        let mut pins = build_pins_for_operation(catalog.as_ref(), desc);
        for pin in &mut pins {
            carry_pin_state(catalog.as_ref(), pin, &old);
        }
        *replacement.pins_mut() = pins;
        self.record(setup_undo, Action::ReplaceNode {
            old: Box::new(old),
            new: Box::new(replacement.clone()),
        });
        self.apply_replace_node(replacement)
    }

    pub(crate) fn apply_replace_node(&mut self, replacement: Node) -> Result<(), GraphError> {
        let name = replacement.name().to_owned();
        let old = self.require_node(&name)?.clone();
        if let NodeKind::FunctionReference {
            definition: Some(definition),
        } = old.kind()
        {
            let definition = definition.clone();
            let location = self.current_location(&name);
            self.library_mut().unregister_reference(&definition, &location);
        }
        if let NodeKind::FunctionReference {
            definition: Some(definition),
        } = replacement.kind()
        {
            let definition = definition.clone();
            let location = self.current_location(&name);
            self.library_mut().register_reference(&definition, location);
        }
        if !self.graph_mut()?.replace_node(replacement) {
            return Err(GraphError::NodeNotFound(name));
        }
        self.notify(NoticeKind::NodeReplaced, name);
        Ok(())
    }
}

/// Carries defaults, expansion and watch flags over from the prototype's
/// pin of the same name, when the types agree.
fn carry_pin_state(catalog: &dyn loom_schema::TypeCatalog, pin: &mut Pin, old: &Node) {
    let Some(previous) = old.find_pin(pin.name()) else {
        return;
    };
    if previous.ty() != pin.ty() {
        return;
    }
    if !pin.is_execute() && !pin.ty().is_empty() {
        apply_default(catalog, pin, &previous.default_value());
    }
    pin.set_expanded(previous.is_expanded());
    pin.set_watched(previous.is_watched());
}
