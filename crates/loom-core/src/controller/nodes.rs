// SPDX-License-Identifier: Apache-2.0
//! Node-level operations: factories, removal, rename, selection, geometry.

use loom_schema::{array_type_of, PinDirection, EXECUTE_TYPE};

use crate::action::Action;
use crate::error::GraphError;
use crate::graph::{Graph, GraphKind};
use crate::link::Link;
use crate::node::{Node, NodeKind, Vec2};
use crate::notify::NoticeKind;
use crate::pin::{split_node_and_pin, Pin};
use crate::pintree::{build_pin, build_pins_for_operation, PinRedirectMap};
use crate::report::Severity;

use super::{sanitize_name, unique_in, Controller};

impl Controller {
    /// Adds a unit node instantiating a catalog operation. Returns the node
    /// name actually used.
    pub fn add_unit_node(
        &mut self,
        operation: &str,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add a unit node")?;
        let catalog = self.catalog_handle();
        let desc = catalog
            .find_operation(operation)
            .ok_or_else(|| GraphError::UnknownOperation(operation.to_owned()))?;
        if desc.is_event {
            if self.graph().kind() != GraphKind::Root {
                return Err(GraphError::EventOutsideTopLevel(operation.to_owned()));
            }
            let duplicate = self.graph().nodes().iter().any(|node| {
                matches!(node.kind(), NodeKind::Unit { operation: existing } if existing == operation)
            });
            if duplicate {
                return Err(GraphError::StructuralConflict(format!(
                    "event '{operation}' is already present in this graph"
                )));
            }
        }
        let desired = if name.is_empty() {
            desc.name.rsplit('.').next().unwrap_or(&desc.name)
        } else {
            name
        };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(
            &node_name,
            NodeKind::Unit {
                operation: operation.to_owned(),
            },
        );
        node.set_position(position);
        *node.pins_mut() = build_pins_for_operation(catalog.as_ref(), desc);
        self.finish_add(node, setup_undo)
    }

    /// Adds a getter or setter node for a variable.
    pub fn add_variable_node(
        &mut self,
        variable: &str,
        ty: &str,
        is_getter: bool,
        default: &str,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add a variable node")?;
        if ty.is_empty() || ty == EXECUTE_TYPE {
            return Err(GraphError::UnknownType(ty.to_owned()));
        }
        let catalog = self.catalog_handle();
        let desired = if name.is_empty() { variable } else { name };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(
            &node_name,
            NodeKind::Variable {
                variable: variable.to_owned(),
                ty: ty.to_owned(),
                is_getter,
            },
        );
        node.set_position(position);
        if is_getter {
            node.pins_mut().push(build_pin(
                catalog.as_ref(),
                "value",
                PinDirection::Output,
                ty,
                default,
            ));
        } else {
            node.pins_mut().push(build_pin(
                catalog.as_ref(),
                "execute",
                PinDirection::Io,
                EXECUTE_TYPE,
                "",
            ));
            node.pins_mut().push(build_pin(
                catalog.as_ref(),
                "value",
                PinDirection::Input,
                ty,
                default,
            ));
        }
        self.finish_add(node, setup_undo)
    }

    /// Adds an input or output parameter node. Parameters live in the
    /// top-level graph only.
    pub fn add_parameter_node(
        &mut self,
        parameter: &str,
        ty: &str,
        is_input: bool,
        default: &str,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        if self.graph().kind() != GraphKind::Root {
            return Err(GraphError::StructuralConflict(
                "parameters are only allowed in the top-level graph".to_owned(),
            ));
        }
        if ty.is_empty() || ty == EXECUTE_TYPE {
            return Err(GraphError::UnknownType(ty.to_owned()));
        }
        let catalog = self.catalog_handle();
        let desired = if name.is_empty() { parameter } else { name };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(
            &node_name,
            NodeKind::Parameter {
                parameter: parameter.to_owned(),
                ty: ty.to_owned(),
                is_input,
            },
        );
        node.set_position(position);
        let direction = if is_input {
            PinDirection::Output
        } else {
            PinDirection::Input
        };
        node.pins_mut()
            .push(build_pin(catalog.as_ref(), "value", direction, ty, default));
        self.finish_add(node, setup_undo)
    }

    /// Adds a comment node.
    pub fn add_comment_node(
        &mut self,
        text: &str,
        position: Vec2,
        size: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add a comment node")?;
        let desired = if name.is_empty() { "Comment" } else { name };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(
            &node_name,
            NodeKind::Comment {
                text: text.to_owned(),
            },
        );
        node.set_position(position);
        node.set_size(size);
        self.finish_add(node, setup_undo)
    }

    /// Adds a free-floating reroute node with a single `value` pin.
    pub fn add_free_reroute_node(
        &mut self,
        show_as_full_node: bool,
        ty: &str,
        default: &str,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add a reroute node")?;
        if ty.is_empty() || ty == EXECUTE_TYPE {
            return Err(GraphError::UnknownType(ty.to_owned()));
        }
        let catalog = self.catalog_handle();
        let desired = if name.is_empty() { "Reroute" } else { name };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(&node_name, NodeKind::Reroute { show_as_full_node });
        node.set_position(position);
        node.pins_mut().push(build_pin(
            catalog.as_ref(),
            "value",
            PinDirection::Io,
            ty,
            default,
        ));
        self.finish_add(node, setup_undo)
    }

    /// Splices a reroute node into an existing link.
    pub fn add_reroute_node_on_link(
        &mut self,
        source: &str,
        target: &str,
        show_as_full_node: bool,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        if !self.graph().has_link(source, target) {
            return Err(GraphError::LinkNotFound {
                source_pin: source.to_owned(),
                target_pin: target.to_owned(),
            });
        }
        let source_pin = self.require_pin(source)?;
        let ty = source_pin.ty().to_owned();
        let default = source_pin.default_value();
        self.begin_action(setup_undo, "Add Reroute On Link");
        let result = (|| {
            let reroute =
                self.add_free_reroute_node(show_as_full_node, &ty, &default, position, name, setup_undo)?;
            self.break_link(source, target, setup_undo)?;
            let value = format!("{reroute}.value");
            self.add_link(source, &value, setup_undo)?;
            self.add_link(&value, target, setup_undo)?;
            Ok(reroute)
        })();
        match result {
            Ok(reroute) => {
                self.end_action(setup_undo);
                Ok(reroute)
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// Attaches a reroute node to one side of a pin, moving the pin's
    /// existing links onto the reroute.
    pub fn add_reroute_node_on_pin(
        &mut self,
        pin_path: &str,
        as_input: bool,
        show_as_full_node: bool,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        let pin = self.require_pin(pin_path)?;
        let ty = pin.ty().to_owned();
        let default = pin.default_value();
        if ty.is_empty() || ty == EXECUTE_TYPE {
            return Err(GraphError::UnknownType(ty));
        }
        self.begin_action(setup_undo, "Add Reroute On Pin");
        let result = (|| {
            let reroute =
                self.add_free_reroute_node(show_as_full_node, &ty, &default, position, name, setup_undo)?;
            let value = format!("{reroute}.value");
            if as_input {
                let incoming = self.graph().links_into(pin_path, false);
                for link in incoming {
                    self.break_link(&link.source, &link.target, setup_undo)?;
                    self.add_link(&link.source, &value, setup_undo)?;
                }
                self.add_link(&value, pin_path, setup_undo)?;
            } else {
                let outgoing = self.graph().links_from(pin_path, false);
                for link in outgoing {
                    self.break_link(&link.source, &link.target, setup_undo)?;
                    self.add_link(&value, &link.target, setup_undo)?;
                }
                self.add_link(pin_path, &value, setup_undo)?;
            }
            Ok(reroute)
        })();
        match result {
            Ok(reroute) => {
                self.end_action(setup_undo);
                Ok(reroute)
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// Adds a branch node splitting control flow on a condition.
    pub fn add_branch_node(
        &mut self,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add a branch node")?;
        let catalog = self.catalog_handle();
        let desired = if name.is_empty() { "Branch" } else { name };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(&node_name, NodeKind::Branch);
        node.set_position(position);
        let pins = node.pins_mut();
        pins.push(build_pin(catalog.as_ref(), "execute", PinDirection::Io, EXECUTE_TYPE, ""));
        pins.push(build_pin(catalog.as_ref(), "condition", PinDirection::Input, "bool", "false"));
        pins.push(build_pin(catalog.as_ref(), "true", PinDirection::Output, EXECUTE_TYPE, ""));
        pins.push(build_pin(catalog.as_ref(), "false", PinDirection::Output, EXECUTE_TYPE, ""));
        self.finish_add(node, setup_undo)
    }

    /// Adds an if node selecting between two values of `ty`.
    pub fn add_if_node(
        &mut self,
        ty: &str,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add an if node")?;
        if ty.is_empty() || ty == EXECUTE_TYPE {
            return Err(GraphError::UnknownType(ty.to_owned()));
        }
        let catalog = self.catalog_handle();
        let desired = if name.is_empty() { "If" } else { name };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(&node_name, NodeKind::If);
        node.set_position(position);
        let pins = node.pins_mut();
        pins.push(build_pin(catalog.as_ref(), "condition", PinDirection::Input, "bool", "false"));
        pins.push(build_pin(catalog.as_ref(), "true", PinDirection::Input, ty, ""));
        pins.push(build_pin(catalog.as_ref(), "false", PinDirection::Input, ty, ""));
        pins.push(build_pin(catalog.as_ref(), "result", PinDirection::Output, ty, ""));
        self.finish_add(node, setup_undo)
    }

    /// Adds a select node picking a value of `ty` from an array by index.
    pub fn add_select_node(
        &mut self,
        ty: &str,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add a select node")?;
        if ty.is_empty() || ty == EXECUTE_TYPE {
            return Err(GraphError::UnknownType(ty.to_owned()));
        }
        let catalog = self.catalog_handle();
        let desired = if name.is_empty() { "Select" } else { name };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(&node_name, NodeKind::Select);
        node.set_position(position);
        let zero = catalog.canonical_default(ty, "");
        let values_default = format!("({zero},{zero})");
        let pins = node.pins_mut();
        pins.push(build_pin(catalog.as_ref(), "index", PinDirection::Input, "int", "0"));
        pins.push(build_pin(
            catalog.as_ref(),
            "values",
            PinDirection::Input,
            &array_type_of(ty),
            &values_default,
        ));
        pins.push(build_pin(catalog.as_ref(), "result", PinDirection::Output, ty, ""));
        self.finish_add(node, setup_undo)
    }

    /// Adds an enum constant node exposing the chosen value and its index.
    pub fn add_enum_node(
        &mut self,
        enum_type: &str,
        default: &str,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add an enum node")?;
        if enum_type.is_empty() || enum_type == EXECUTE_TYPE {
            return Err(GraphError::UnknownType(enum_type.to_owned()));
        }
        let catalog = self.catalog_handle();
        let desired = if name.is_empty() {
            enum_type.rsplit('.').next().unwrap_or(enum_type)
        } else {
            name
        };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(
            &node_name,
            NodeKind::Enum {
                enum_type: enum_type.to_owned(),
            },
        );
        node.set_position(position);
        let pins = node.pins_mut();
        pins.push(build_pin(catalog.as_ref(), "value", PinDirection::Input, enum_type, default));
        pins.push(build_pin(catalog.as_ref(), "index", PinDirection::Output, "int", "0"));
        self.finish_add(node, setup_undo)
    }

    /// Adds an unresolved prototype node. Its pins start untyped and take
    /// types as links are made.
    pub fn add_prototype_node(
        &mut self,
        notation: &str,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add a prototype node")?;
        let catalog = self.catalog_handle();
        let desc = catalog
            .find_prototype(notation)
            .ok_or_else(|| GraphError::UnknownPrototype(notation.to_owned()))?;
        let desired = if name.is_empty() { &desc.name } else { name };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(
            &node_name,
            NodeKind::Prototype {
                notation: notation.to_owned(),
            },
        );
        node.set_position(position);
        for (pin_name, direction) in &desc.pins {
            node.pins_mut().push(Pin::new(pin_name, *direction, ""));
        }
        self.finish_add(node, setup_undo)
    }

    pub(crate) fn finish_add(
        &mut self,
        node: Node,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        let name = node.name().to_owned();
        self.record(setup_undo, Action::AddNode {
            node: Box::new(node.clone()),
        });
        self.install_node(node)?;
        Ok(name)
    }

    /// Removes a node, breaking its links first. Removing a library
    /// function definition invalidates all of its references.
    pub fn remove_node(&mut self, name: &str, setup_undo: bool) -> Result<(), GraphError> {
        let node = self.require_node(name)?;
        if node.is_entry_or_return() {
            return Err(GraphError::ProtectedNode(name.to_owned()));
        }
        let was_selected = self.graph().selection().iter().any(|s| s == name);
        let is_library_def = self.graph().is_library() && node.contained_graph().is_some();
        self.begin_action(setup_undo, "Remove Node");
        let result = (|| {
            if is_library_def {
                self.invalidate_references_of(name, setup_undo)?;
            }
            let links = self.graph().links_touching_node(name);
            for link in links {
                self.record(setup_undo, Action::BreakLink {
                    source: link.source.clone(),
                    target: link.target.clone(),
                });
                self.apply_break_link(&link.source, &link.target)?;
            }
            if was_selected {
                self.record(setup_undo, Action::Select {
                    node: name.to_owned(),
                    selected: false,
                });
                self.apply_select(name, false);
            }
            let removed = self.require_node(name)?.clone();
            self.record(setup_undo, Action::RemoveNode {
                node: Box::new(removed),
            });
            self.uninstall_node(name).map(|_| ())
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

    /// Removes several nodes as one undoable step.
    pub fn remove_nodes(&mut self, names: &[&str], setup_undo: bool) -> Result<(), GraphError> {
        self.begin_action(setup_undo, "Remove Nodes");
        for name in names {
            if let Err(error) = self.remove_node(name, setup_undo) {
                self.cancel_action(setup_undo);
                return Err(error);
            }
        }
        self.end_action(setup_undo);
        Ok(())
    }

    /// Renames a node, keeping links and selection intact. Returns the name
    /// actually used after sanitizing and uniquifying.
    pub fn rename_node(
        &mut self,
        old: &str,
        new: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.require_node(old)?;
        let sanitized = sanitize_name(new);
        if sanitized == old {
            return Ok(sanitized);
        }
        let new_name = unique_in(&sanitized, |candidate| self.graph().contains_node(candidate));
        self.record(setup_undo, Action::RenameNode {
            old: old.to_owned(),
            new: new_name.clone(),
        });
        self.apply_rename(old, &new_name)?;
        Ok(new_name)
    }

    /// Rebuilds a unit node's pins from its operation's current schema,
    /// carrying state and links across. `redirects` maps old pin paths to
    /// new ones for fields the schema renamed; links whose pin vanished
    /// from the new shape are dropped with a warning.
    pub fn repopulate_node_pins(
        &mut self,
        name: &str,
        redirects: &PinRedirectMap,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let old = self.require_node(name)?.clone();
        let NodeKind::Unit { operation } = old.kind() else {
            return Err(GraphError::WrongNodeKind {
                node: name.to_owned(),
                expected: "unit",
            });
        };
        let catalog = self.catalog_handle();
        let desc = catalog
            .find_operation(operation)
            .ok_or_else(|| GraphError::UnknownOperation(operation.clone()))?;
        let mut replacement = old.clone();
        *replacement.pins_mut() = build_pins_for_operation(catalog.as_ref(), desc);
        old.for_each_pin(&mut |path, pin| {
            let new_path = redirects.redirect(path);
            if let Some(target) = replacement.find_pin_mut(&new_path) {
                if target.ty() == pin.ty() {
                    if target.sub_pins().is_empty() && pin.sub_pins().is_empty() {
                        target.set_leaf_default(pin.default_value());
                    }
                    target.set_expanded(pin.is_expanded());
                    target.set_watched(pin.is_watched());
                    target.set_bound_variable(pin.bound_variable().map(str::to_owned));
                }
            }
        });
        self.begin_action(setup_undo, "Repopulate Pins");
        let result = (|| {
            let mut rewired: Vec<Link> = Vec::new();
            for link in self.graph().links_touching_node(name) {
                let (new_source, source_ok) =
                    redirect_endpoint(&link.source, name, redirects, &replacement);
                let (new_target, target_ok) =
                    redirect_endpoint(&link.target, name, redirects, &replacement);
                if source_ok && target_ok && new_source == link.source && new_target == link.target
                {
                    continue;
                }
                self.break_link(&link.source, &link.target, setup_undo)?;
                if source_ok && target_ok {
                    rewired.push(Link::new(&new_source, &new_target));
                } else {
                    self.report(
                        Severity::Warning,
                        format!(
                            "dropping link {}: its pin vanished from the new shape",
                            link.display()
                        ),
                    );
                }
            }
            self.record(setup_undo, Action::ReplaceNode {
                old: Box::new(old),
                new: Box::new(replacement.clone()),
            });
            self.apply_replace_node(replacement)?;
            for link in rewired {
                if let Err(error) = self.add_link(&link.source, &link.target, setup_undo) {
                    self.report(
                        Severity::Warning,
                        format!("dropping link {}: {error}", link.display()),
                    );
                }
            }
            Ok(())
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

    /// Selects or deselects a node.
    pub fn select_node(
        &mut self,
        name: &str,
        selected: bool,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        self.require_node(name)?;
        let currently = self.graph().selection().iter().any(|s| s == name);
        if currently == selected {
            return Ok(());
        }
        self.record(setup_undo, Action::Select {
            node: name.to_owned(),
            selected,
        });
        self.apply_select(name, selected);
        Ok(())
    }

    /// Replaces the selection with the given nodes.
    pub fn set_node_selection(
        &mut self,
        names: &[&str],
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        for name in names {
            self.require_node(name)?;
        }
        self.begin_action(setup_undo, "Set Selection");
        let current = self.graph().selection().to_vec();
        for selected in current {
            if !names.contains(&selected.as_str()) {
                self.record(setup_undo, Action::Select {
                    node: selected.clone(),
                    selected: false,
                });
                self.apply_select(&selected, false);
            }
        }
        for name in names {
            let currently = self.graph().selection().iter().any(|s| s == name);
            if !currently {
                self.record(setup_undo, Action::Select {
                    node: (*name).to_owned(),
                    selected: true,
                });
                self.apply_select(name, true);
            }
        }
        self.end_action(setup_undo);
        Ok(())
    }

    /// Clears the selection.
    pub fn clear_node_selection(&mut self, setup_undo: bool) -> Result<(), GraphError> {
        self.set_node_selection(&[], setup_undo)
    }

    /// Moves a node. Consecutive moves of the same node merge into one
    /// undo step when `merge_undo` is set.
    pub fn set_node_position(
        &mut self,
        name: &str,
        position: Vec2,
        setup_undo: bool,
        merge_undo: bool,
    ) -> Result<(), GraphError> {
        let old = self.require_node(name)?.position();
        if old == position {
            return Ok(());
        }
        let action = Action::SetPosition {
            node: name.to_owned(),
            old,
            new: position,
        };
        if merge_undo {
            self.record_merged(setup_undo, action);
        } else {
            self.record(setup_undo, action);
        }
        self.apply_position(name, position)
    }

    /// Resizes a node (comments). Merges like
    /// [`set_node_position`](Self::set_node_position).
    pub fn set_node_size(
        &mut self,
        name: &str,
        size: Vec2,
        setup_undo: bool,
        merge_undo: bool,
    ) -> Result<(), GraphError> {
        let old = self.require_node(name)?.size();
        if old == size {
            return Ok(());
        }
        let action = Action::SetSize {
            node: name.to_owned(),
            old,
            new: size,
        };
        if merge_undo {
            self.record_merged(setup_undo, action);
        } else {
            self.record(setup_undo, action);
        }
        self.apply_size(name, size)
    }

    /// Changes the text of a comment node.
    pub fn set_comment_text(
        &mut self,
        name: &str,
        text: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let node = self.require_node(name)?;
        let NodeKind::Comment { text: old } = node.kind() else {
            return Err(GraphError::WrongNodeKind {
                node: name.to_owned(),
                expected: "comment",
            });
        };
        if old == text {
            return Ok(());
        }
        self.record(setup_undo, Action::SetCommentText {
            node: name.to_owned(),
            old: old.clone(),
            new: text.to_owned(),
        });
        self.apply_comment_text(name, text)
    }

    /// Toggles a reroute node between full and compact display. Cosmetic;
    /// the notice is suppressed during undo/redo replay.
    pub fn set_reroute_compactness(
        &mut self,
        name: &str,
        show_as_full_node: bool,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let node = self.require_node(name)?;
        let NodeKind::Reroute { show_as_full_node: old } = node.kind() else {
            return Err(GraphError::WrongNodeKind {
                node: name.to_owned(),
                expected: "reroute",
            });
        };
        if *old == show_as_full_node {
            return Ok(());
        }
        self.record(setup_undo, Action::SetRerouteCompactness {
            node: name.to_owned(),
            old: *old,
            new: show_as_full_node,
        });
        self.apply_reroute_compactness(name, show_as_full_node)
    }

    /// Renames a variable everywhere: getter/setter nodes and pin bindings
    /// across the whole model. Returns the number of touched places.
    pub fn rename_variable(
        &mut self,
        old: &str,
        new: &str,
        setup_undo: bool,
    ) -> Result<usize, GraphError> {
        let count = self.apply_rename_variable(old, new)?;
        if count > 0 {
            self.record(setup_undo, Action::RenameVariable {
                old: old.to_owned(),
                new: new.to_owned(),
            });
        }
        Ok(count)
    }

    /// Renames a parameter everywhere. Returns the number of touched nodes.
    pub fn rename_parameter(
        &mut self,
        old: &str,
        new: &str,
        setup_undo: bool,
    ) -> Result<usize, GraphError> {
        let count = self.apply_rename_parameter(old, new)?;
        if count > 0 {
            self.record(setup_undo, Action::RenameParameter {
                old: old.to_owned(),
                new: new.to_owned(),
            });
        }
        Ok(count)
    }

    // ----- apply layer ----------------------------------------------------

    pub(crate) fn install_node(&mut self, node: Node) -> Result<(), GraphError> {
        let name = node.name().to_owned();
        if let NodeKind::FunctionReference {
            definition: Some(definition),
        } = node.kind()
        {
            let definition = definition.clone();
            let location = self.current_location(&name);
            self.library_mut().register_reference(&definition, location);
        }
        let is_library_def = self.graph().is_library() && node.contained_graph().is_some();
        self.graph_mut()?.add_node(node);
        self.notify(NoticeKind::NodeAdded, name.clone());
        if is_library_def {
            self.notify(NoticeKind::FunctionAdded, name);
        }
        Ok(())
    }

    pub(crate) fn uninstall_node(&mut self, name: &str) -> Result<Node, GraphError> {
        let is_library_def = self.graph().is_library()
            && self
                .graph()
                .find_node(name)
                .is_some_and(|node| node.contained_graph().is_some());
        let node = self
            .graph_mut()?
            .remove_node(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_owned()))?;
        if let NodeKind::FunctionReference {
            definition: Some(definition),
        } = node.kind()
        {
            let definition = definition.clone();
            let location = self.current_location(name);
            self.library_mut().unregister_reference(&definition, &location);
        }
        self.notify(NoticeKind::NodeRemoved, name);
        if is_library_def {
            self.notify(NoticeKind::FunctionRemoved, name);
        }
        Ok(node)
    }

    pub(crate) fn apply_rename(&mut self, old: &str, new: &str) -> Result<(), GraphError> {
        let graph = self.graph_mut()?;
        if !graph.rename_node(old, new) {
            return Err(GraphError::NodeNotFound(old.to_owned()));
        }
        let is_library_def =
            graph.is_library() && graph.find_node(new).is_some_and(|n| n.contained_graph().is_some());
        self.notify(NoticeKind::NodeRenamed, format!("{old} -> {new}"));
        if is_library_def {
            self.library_mut().rename_reference_key(old, new);
            let locations = self.library_graph().references_of(new).to_vec();
            for location in locations {
                if let Ok(graph) = self.frame_graph_mut(&location.frame) {
                    if let Some(node) = graph.find_node_mut(&location.node) {
                        if let NodeKind::FunctionReference { definition } = node.kind_mut() {
                            *definition = Some(new.to_owned());
                        }
                    }
                }
            }
            self.notify(NoticeKind::FunctionReferencesRefreshed, new);
        }
        Ok(())
    }

    pub(crate) fn apply_select(&mut self, name: &str, selected: bool) {
        let Ok(graph) = self.graph_mut() else {
            return;
        };
        let currently = graph.selection().iter().any(|s| s == name);
        if selected && !currently {
            graph.selection_mut().push(name.to_owned());
            self.notify(NoticeKind::NodeSelected, name);
        } else if !selected && currently {
            graph.selection_mut().retain(|s| s != name);
            self.notify(NoticeKind::NodeDeselected, name);
        }
    }

    pub(crate) fn apply_position(&mut self, name: &str, position: Vec2) -> Result<(), GraphError> {
        self.graph_mut()?
            .find_node_mut(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_owned()))?
            .set_position(position);
        self.notify(NoticeKind::NodePositionChanged, name);
        Ok(())
    }

    pub(crate) fn apply_size(&mut self, name: &str, size: Vec2) -> Result<(), GraphError> {
        self.graph_mut()?
            .find_node_mut(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_owned()))?
            .set_size(size);
        self.notify(NoticeKind::NodeSizeChanged, name);
        Ok(())
    }

    pub(crate) fn apply_comment_text(&mut self, name: &str, text: &str) -> Result<(), GraphError> {
        let node = self
            .graph_mut()?
            .find_node_mut(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_owned()))?;
        if let NodeKind::Comment { text: current } = node.kind_mut() {
            text.clone_into(current);
        }
        self.notify(NoticeKind::CommentTextChanged, name);
        Ok(())
    }

    pub(crate) fn apply_reroute_compactness(
        &mut self,
        name: &str,
        full: bool,
    ) -> Result<(), GraphError> {
        let node = self
            .graph_mut()?
            .find_node_mut(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_owned()))?;
        if let NodeKind::Reroute { show_as_full_node } = node.kind_mut() {
            *show_as_full_node = full;
        }
        self.notify(NoticeKind::RerouteCompactnessChanged, name);
        Ok(())
    }

    pub(crate) fn apply_rename_variable(
        &mut self,
        old: &str,
        new: &str,
    ) -> Result<usize, GraphError> {
        let mut count = rename_variable_in(&mut self.root, old, new);
        count += rename_variable_in(self.library_mut(), old, new);
        if count > 0 {
            self.notify(NoticeKind::VariableRenamed, format!("{old} -> {new}"));
        }
        Ok(count)
    }

    pub(crate) fn apply_rename_parameter(
        &mut self,
        old: &str,
        new: &str,
    ) -> Result<usize, GraphError> {
        let mut count = 0;
        for node in self.root.nodes() {
            if matches!(node.kind(), NodeKind::Parameter { parameter, .. } if parameter == old) {
                count += 1;
            }
        }
        if count == 0 {
            return Ok(0);
        }
        let names = self.root.node_names();
        for name in names {
            if let Some(node) = self.root.find_node_mut(&name) {
                if let NodeKind::Parameter { parameter, .. } = node.kind_mut() {
                    if parameter == old {
                        new.clone_into(parameter);
                    }
                }
            }
        }
        self.notify(NoticeKind::ParameterRenamed, format!("{old} -> {new}"));
        Ok(count)
    }
}

/// Redirects one link endpoint through the map when it belongs to the
/// repopulated node, and checks the redirected pin exists in the new shape.
fn redirect_endpoint(
    path: &str,
    node: &str,
    redirects: &PinRedirectMap,
    shape: &Node,
) -> (String, bool) {
    match split_node_and_pin(path) {
        Some((owner, rest)) if owner == node => {
            let new_rest = redirects.redirect(rest);
            let exists = shape.find_pin(&new_rest).is_some();
            (format!("{node}.{new_rest}"), exists)
        }
        _ => (path.to_owned(), true),
    }
}

/// Rewrites variable nodes and pin bindings in a graph and all contained
/// graphs. Returns the number of touched places.
fn rename_variable_in(graph: &mut Graph, old: &str, new: &str) -> usize {
    let mut count = 0;
    let names = graph.node_names();
    for name in names {
        let Some(node) = graph.find_node_mut(&name) else {
            continue;
        };
        if let NodeKind::Variable { variable, .. } = node.kind_mut() {
            if variable == old {
                new.clone_into(variable);
                count += 1;
            }
        }
        count += rename_bindings_in_pins(node.pins_mut(), old, new);
        if let Some(contained) = node.contained_graph_mut() {
            count += rename_variable_in(contained, old, new);
        }
    }
    count
}

fn rename_bindings_in_pins(pins: &mut [Pin], old: &str, new: &str) -> usize {
    let mut count = 0;
    for pin in pins.iter_mut() {
        if let Some(bound) = pin.bound_variable() {
            if bound == old {
                pin.set_bound_variable(Some(new.to_owned()));
                count += 1;
            } else if let Some(rest) = bound.strip_prefix(old) {
                if rest.starts_with('.') {
                    pin.set_bound_variable(Some(format!("{new}{rest}")));
                    count += 1;
                }
            }
        }
        count += rename_bindings_in_pins(pin.sub_pins_mut(), old, new);
    }
    count
}
