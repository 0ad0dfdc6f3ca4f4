// SPDX-License-Identifier: Apache-2.0
//! Injected nodes.
//!
//! An injected node is a unit node spliced invisibly onto a pin: the pin's
//! value passes through the node's input/output pin pair without any links
//! in the graph. The node is owned by the pin's
//! [`InjectionInfo`](crate::pin::InjectionInfo) while injected; ejecting
//! moves it back into the graph and rewires the pass-through explicitly.

use crate::action::Action;
use crate::error::GraphError;
use crate::node::{Node, NodeKind};
use crate::notify::NoticeKind;
use crate::pin::{split_node_and_pin, InjectionInfo};
use crate::pintree::build_pins_for_operation;

use super::{sanitize_name, unique_in, Controller};

impl Controller {
    /// Splices a unit node of `operation` onto a pin. The named input and
    /// output pins of the operation must both carry the host pin's type.
    /// Returns the injected node's name.
    pub fn add_injected_node(
        &mut self,
        pin_path: &str,
        as_input: bool,
        operation: &str,
        input_pin: &str,
        output_pin: &str,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("inject a node")?;
        let host = self.require_pin(pin_path)?;
        if host.is_execute() || host.ty().is_empty() {
            return Err(GraphError::StructuralConflict(format!(
                "pin '{pin_path}' cannot host an injected node"
            )));
        }
        let host_ty = host.ty().to_owned();
        let catalog = self.catalog_handle();
        let desc = catalog
            .find_operation(operation)
            .ok_or_else(|| GraphError::UnknownOperation(operation.to_owned()))?;
        let pins = build_pins_for_operation(catalog.as_ref(), desc);
        let desired = if name.is_empty() {
            desc.name.rsplit('.').next().unwrap_or(&desc.name)
        } else {
            name
        };
        let mut node = Node::new(
            self.injected_node_name(desired),
            NodeKind::Unit {
                operation: operation.to_owned(),
            },
        );
        *node.pins_mut() = pins;
        check_passthrough_pin(&node, input_pin, &host_ty, true)?;
        check_passthrough_pin(&node, output_pin, &host_ty, false)?;
        let node_name = node.name().to_owned();
        let injection = InjectionInfo {
            node,
            input_pin: input_pin.to_owned(),
            output_pin: output_pin.to_owned(),
            injected_as_input: as_input,
        };
        self.record(setup_undo, Action::AddInjection {
            pin: pin_path.to_owned(),
            injection: Box::new(injection.clone()),
        });
        self.apply_add_injection(pin_path, injection)?;
        Ok(node_name)
    }

    /// Moves the most recently injected node of a pin back into the graph,
    /// rewiring the pass-through as real links. Returns the node's name in
    /// the graph.
    pub fn eject_injected_node(
        &mut self,
        pin_path: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("eject a node")?;
        let host = self.require_pin(pin_path)?;
        let index = host
            .injections()
            .len()
            .checked_sub(1)
            .ok_or_else(|| GraphError::StructuralConflict(format!(
                "pin '{pin_path}' has no injected node"
            )))?;
        let host_position = split_node_and_pin(pin_path)
            .and_then(|(node, _)| self.graph().find_node(node))
            .map(Node::position)
            .unwrap_or_default();
        self.begin_action(setup_undo, "Eject Node");
        let result = (|| {
            let injection = {
                let removed = self.apply_remove_injection(pin_path)?;
                self.record(setup_undo, Action::RemoveInjection {
                    pin: pin_path.to_owned(),
                    index,
                    injection: Box::new(removed.clone()),
                });
                removed
            };
            let mut node = injection.node;
            node.set_name(self.unique_node_name(node.name()));
            node.set_position(host_position);
            let node_name = self.finish_add(node, setup_undo)?;
            let through_in = format!("{node_name}.{}", injection.input_pin);
            let through_out = format!("{node_name}.{}", injection.output_pin);
            if injection.injected_as_input {
                let incoming = self.graph().links_into(pin_path, false);
                for link in incoming {
                    self.break_link(&link.source, &link.target, setup_undo)?;
                    self.add_link(&link.source, &through_in, setup_undo)?;
                }
                self.add_link(&through_out, pin_path, setup_undo)?;
            } else {
                let outgoing = self.graph().links_from(pin_path, false);
                for link in outgoing {
                    self.break_link(&link.source, &link.target, setup_undo)?;
                    self.add_link(&through_out, &link.target, setup_undo)?;
                }
                self.add_link(pin_path, &through_in, setup_undo)?;
            }
            Ok(node_name)
        })();
        match result {
            Ok(name) => {
                self.end_action(setup_undo);
                Ok(name)
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// A name unique against the graph and every node already injected on
    /// the current graph's pins.
    fn injected_node_name(&self, desired: &str) -> String {
        let base = sanitize_name(desired);
        unique_in(&base, |candidate| {
            if self.graph().contains_node(candidate) {
                return true;
            }
            let mut taken = false;
            for node in self.graph().nodes() {
                node.for_each_pin(&mut |_, pin| {
                    for injection in pin.injections() {
                        if injection.node.name() == candidate {
                            taken = true;
                        }
                    }
                });
            }
            taken
        })
    }

    // ----- apply layer ----------------------------------------------------

    pub(crate) fn apply_add_injection(
        &mut self,
        pin_path: &str,
        injection: InjectionInfo,
    ) -> Result<(), GraphError> {
        let subject = format!("{pin_path} <- {}", injection.node.name());
        let pin = self
            .graph_mut()?
            .find_pin_mut(pin_path)
            .ok_or_else(|| GraphError::PinNotFound(pin_path.to_owned()))?;
        pin.injections_mut().push(injection);
        self.notify(NoticeKind::InjectionAdded, subject);
        Ok(())
    }

    pub(crate) fn apply_remove_injection(
        &mut self,
        pin_path: &str,
    ) -> Result<InjectionInfo, GraphError> {
        let injection = {
            let pin = self
                .graph_mut()?
                .find_pin_mut(pin_path)
                .ok_or_else(|| GraphError::PinNotFound(pin_path.to_owned()))?;
            pin.injections_mut().pop().ok_or_else(|| {
                GraphError::StructuralConflict(format!("pin '{pin_path}' has no injected node"))
            })?
        };
        let subject = format!("{pin_path} <- {}", injection.node.name());
        self.notify(NoticeKind::InjectionRemoved, subject);
        Ok(injection)
    }
}

/// Checks that a pass-through endpoint exists on the injected node, faces
/// the right way and carries the host pin's type.
fn check_passthrough_pin(
    node: &Node,
    pin_name: &str,
    host_ty: &str,
    as_input: bool,
) -> Result<(), GraphError> {
    let pin = node
        .find_pin(pin_name)
        .ok_or_else(|| GraphError::PinNotFound(format!("{}.{pin_name}", node.name())))?;
    let facing_ok = if as_input {
        pin.direction().accepts_incoming()
    } else {
        pin.direction().provides_outgoing()
    };
    if !facing_ok || pin.ty() != host_ty {
        return Err(GraphError::StructuralConflict(format!(
            "pin '{pin_name}' of '{}' cannot pass through type '{host_ty}'",
            node.name()
        )));
    }
    Ok(())
}
