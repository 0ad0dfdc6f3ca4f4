// SPDX-License-Identifier: Apache-2.0
//! Function library operations: definitions, references, exposed pins and
//! promotion between collapse nodes and functions.
//!
//! A function definition is a collapse node living in the library graph.
//! Reference nodes mirror the definition's interface pins; the library keeps
//! a registry of reference locations so interface changes and definition
//! renames propagate. Removing a definition does not remove its references;
//! they stay behind unresolved.

use loom_schema::{PinDirection, EXECUTE_TYPE};

use crate::action::Action;
use crate::error::GraphError;
use crate::graph::{Graph, GraphFrame, GraphKind, GraphTarget};
use crate::node::{Node, NodeKind, Vec2};
use crate::notify::NoticeKind;
use crate::pin::Pin;
use crate::pintree::build_pin;

use super::{sanitize_name, unique_in, Controller};

/// Fixed name of the entry node inside a contained graph.
pub const ENTRY_NODE: &str = "Entry";
/// Fixed name of the return node inside a contained graph.
pub const RETURN_NODE: &str = "Return";

impl Controller {
    /// Creates an empty function definition in the library. Mutable
    /// functions get an execute pin threaded through entry and return.
    pub fn add_function_to_library(
        &mut self,
        name: &str,
        mutable: bool,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        let library_frame = GraphFrame::root_of(GraphTarget::Library);
        self.with_frame(library_frame, setup_undo, |controller| {
            let node_name = controller.unique_node_name(if name.is_empty() {
                "Function"
            } else {
                name
            });
            let node = new_function_definition(&node_name, mutable);
            controller.finish_add(node, setup_undo)
        })
    }

    /// Removes a function definition from the library. Its references stay
    /// behind unresolved.
    pub fn remove_function_from_library(
        &mut self,
        name: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let library_frame = GraphFrame::root_of(GraphTarget::Library);
        self.with_frame(library_frame, setup_undo, |controller| {
            let node = controller.require_node(name)?;
            if node.contained_graph().is_none() {
                return Err(GraphError::WrongNodeKind {
                    node: name.to_owned(),
                    expected: "function definition",
                });
            }
            controller.remove_node(name, setup_undo)
        })
    }

    /// Places a reference to a library function into the current graph.
    pub fn add_function_reference(
        &mut self,
        function: &str,
        position: Vec2,
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("add a function reference")?;
        let definition = self
            .library_graph()
            .find_node(function)
            .ok_or_else(|| GraphError::NodeNotFound(function.to_owned()))?;
        if definition.contained_graph().is_none() {
            return Err(GraphError::WrongNodeKind {
                node: function.to_owned(),
                expected: "function definition",
            });
        }
        let interface = definition.pins().to_vec();
        let desired = if name.is_empty() { function } else { name };
        let node_name = self.unique_node_name(desired);
        let mut node = Node::new(
            &node_name,
            NodeKind::FunctionReference {
                definition: Some(function.to_owned()),
            },
        );
        node.set_position(position);
        *node.pins_mut() = interface;
        self.finish_add(node, setup_undo)
    }

    /// Adds an exposed pin to the collapse node or function whose body is
    /// the current graph, mirroring it onto entry/return nodes and every
    /// reference. Returns the pin name actually used.
    pub fn add_exposed_pin(
        &mut self,
        name: &str,
        direction: PinDirection,
        ty: &str,
        default: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        let (host, _) = self.exposed_pin_host()?;
        if ty.is_empty() {
            return Err(GraphError::UnknownType(ty.to_owned()));
        }
        let host_node = self.host_node(&host)?;
        let sanitized = sanitize_name(if name.is_empty() { "value" } else { name });
        let pin_name = unique_in(&sanitized, |candidate| {
            host_node.pins().iter().any(|pin| pin.name() == candidate)
        });
        let catalog = self.catalog_handle();
        let direction = if ty == EXECUTE_TYPE {
            PinDirection::Io
        } else {
            direction
        };
        let pin = build_pin(catalog.as_ref(), &pin_name, direction, ty, default);
        self.record(setup_undo, Action::AddExposedPin {
            node: host.clone(),
            pin: Box::new(pin.clone()),
        });
        self.apply_add_exposed_pin(&host, pin, None)?;
        Ok(pin_name)
    }

    /// Removes an exposed pin, breaking every link that touched it in the
    /// body, on the host node and on every reference.
    pub fn remove_exposed_pin(&mut self, name: &str, setup_undo: bool) -> Result<(), GraphError> {
        let (host, parent_frame) = self.exposed_pin_host()?;
        let host_node = self.host_node(&host)?;
        let index = host_node
            .pins()
            .iter()
            .position(|pin| pin.name() == name)
            .ok_or_else(|| GraphError::PinNotFound(format!("{host}.{name}")))?;
        let pin = host_node.pins()[index].clone();
        self.begin_action(setup_undo, "Remove Exposed Pin");
        let result = (|| {
            for interface_node in [ENTRY_NODE, RETURN_NODE] {
                let path = format!("{interface_node}.{name}");
                if self.graph().find_pin(&path).is_some() {
                    self.break_all_links(&path, true, setup_undo)?;
                    self.break_all_links(&path, false, setup_undo)?;
                }
            }
            let mut outer = vec![(parent_frame.clone(), host.clone())];
            if is_library_root(&parent_frame) {
                for location in self.library_graph().references_of(&host).to_vec() {
                    outer.push((location.frame, location.node));
                }
            }
            for (frame, node) in outer {
                let path = format!("{node}.{name}");
                self.with_frame(frame, setup_undo, |controller| {
                    if controller.graph().find_pin(&path).is_some() {
                        controller.break_all_links(&path, true, setup_undo)?;
                        controller.break_all_links(&path, false, setup_undo)?;
                    }
                    Ok(())
                })?;
            }
            self.record(setup_undo, Action::RemoveExposedPin {
                node: host.clone(),
                index,
                pin: Box::new(pin),
            });
            self.apply_remove_exposed_pin(&host, name).map(|_| ())
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

    /// Renames an exposed pin everywhere it is mirrored. Returns the name
    /// actually used.
    pub fn rename_exposed_pin(
        &mut self,
        old: &str,
        new: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        let (host, _) = self.exposed_pin_host()?;
        let host_node = self.host_node(&host)?;
        if !host_node.pins().iter().any(|pin| pin.name() == old) {
            return Err(GraphError::PinNotFound(format!("{host}.{old}")));
        }
        let sanitized = sanitize_name(new);
        if sanitized == old {
            return Ok(sanitized);
        }
        let new_name = unique_in(&sanitized, |candidate| {
            host_node.pins().iter().any(|pin| pin.name() == candidate)
        });
        self.record(setup_undo, Action::RenameExposedPin {
            node: host.clone(),
            old: old.to_owned(),
            new: new_name.clone(),
        });
        self.apply_rename_exposed_pin(&host, old, &new_name)?;
        Ok(new_name)
    }

    /// Moves a collapse node of the current graph into the library as a
    /// function definition and replaces the node with a reference to it.
    /// Returns the function name.
    pub fn promote_collapse_to_function(
        &mut self,
        node_name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("promote a collapse node")?;
        let node = self.require_node(node_name)?;
        let Some(contained) = node.contained_graph() else {
            return Err(GraphError::WrongNodeKind {
                node: node_name.to_owned(),
                expected: "collapse",
            });
        };
        let contained = contained.clone();
        let interface = node.pins().to_vec();
        let position = node.position();
        let links = self.graph().links_touching_node(node_name);
        self.begin_action(setup_undo, "Promote To Function");
        let result = (|| {
            let library_frame = GraphFrame::root_of(GraphTarget::Library);
            let function = self.with_frame(library_frame, setup_undo, |controller| {
                let function = controller.unique_node_name(node_name);
                let mut definition = Node::new(
                    &function,
                    NodeKind::Collapse {
                        graph: contained.clone(),
                    },
                );
                *definition.pins_mut() = interface.clone();
                controller.finish_add(definition, setup_undo)?;
                Ok(function)
            })?;
            self.remove_node(node_name, setup_undo)?;
            let reference = self.add_function_reference(&function, position, node_name, setup_undo)?;
            self.rewire(&links, node_name, &reference, setup_undo)?;
            Ok(function)
        })();
        match result {
            Ok(function) => {
                self.end_action(setup_undo);
                Ok(function)
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// Replaces a function reference with a local collapse node holding a
    /// copy of the definition's body. Returns the collapse node name.
    pub fn promote_function_to_collapse(
        &mut self,
        reference_name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("promote a function reference")?;
        let node = self.require_node(reference_name)?;
        let NodeKind::FunctionReference {
            definition: Some(function),
        } = node.kind()
        else {
            return Err(GraphError::WrongNodeKind {
                node: reference_name.to_owned(),
                expected: "resolved function reference",
            });
        };
        let function = function.clone();
        let position = node.position();
        let definition = self
            .library_graph()
            .find_node(&function)
            .ok_or_else(|| GraphError::NodeNotFound(function.clone()))?;
        let contained = definition
            .contained_graph()
            .ok_or_else(|| GraphError::WrongNodeKind {
                node: function.clone(),
                expected: "function definition",
            })?
            .clone();
        let interface = definition.pins().to_vec();
        let links = self.graph().links_touching_node(reference_name);
        self.begin_action(setup_undo, "Promote To Collapse Node");
        let result = (|| {
            self.remove_node(reference_name, setup_undo)?;
            let mut collapse = Node::new(reference_name, NodeKind::Collapse { graph: contained });
            collapse.set_position(position);
            *collapse.pins_mut() = interface;
            let collapse_name = self.finish_add(collapse, setup_undo)?;
            self.rewire(&links, reference_name, &collapse_name, setup_undo)?;
            Ok(collapse_name)
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

    fn rewire(
        &mut self,
        links: &[crate::link::Link],
        old_node: &str,
        new_node: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        for link in links {
            let source = swap_node_prefix(&link.source, old_node, new_node);
            let target = swap_node_prefix(&link.target, old_node, new_node);
            self.add_link(&source, &target, setup_undo)?;
        }
        Ok(())
    }

    /// The collapse node whose body is the current graph, with the frame of
    /// the graph that owns it.
    fn exposed_pin_host(&self) -> Result<(String, GraphFrame), GraphError> {
        let frame = self.current_frame();
        let Some((host, parent_path)) = frame.path.split_last() else {
            return Err(GraphError::StructuralConflict(
                "exposed pins require a contained graph".to_owned(),
            ));
        };
        let parent = GraphFrame {
            target: frame.target,
            path: parent_path.to_vec(),
        };
        Ok((host.clone(), parent))
    }

    fn host_node(&self, host: &str) -> Result<&Node, GraphError> {
        let (_, parent) = self.exposed_pin_host()?;
        self.resolve_frame(&parent)
            .and_then(|graph| graph.find_node(host))
            .ok_or_else(|| GraphError::NodeNotFound(host.to_owned()))
    }

    pub(crate) fn invalidate_references_of(
        &mut self,
        definition: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let locations = self.library_graph().references_of(definition).to_vec();
        for location in locations {
            let Some(old) = self
                .resolve_frame(&location.frame)
                .and_then(|graph| graph.find_node(&location.node))
                .cloned()
            else {
                continue;
            };
            let mut invalidated = old.clone();
            if let NodeKind::FunctionReference { definition } = invalidated.kind_mut() {
                *definition = None;
            }
            self.with_frame(location.frame, setup_undo, |controller| {
                controller.record(setup_undo, Action::ReplaceNode {
                    old: Box::new(old),
                    new: Box::new(invalidated.clone()),
                });
                controller.apply_replace_node(invalidated)
            })?;
        }
        Ok(())
    }

    // ----- apply layer ----------------------------------------------------

    pub(crate) fn apply_add_exposed_pin(
        &mut self,
        host: &str,
        pin: Pin,
        index: Option<usize>,
    ) -> Result<(), GraphError> {
        let (_, parent_frame) = self.exposed_pin_host()?;
        let pin_name = pin.name().to_owned();
        {
            let graph = self.frame_graph_mut(&parent_frame)?;
            let node = graph
                .find_node_mut(host)
                .ok_or_else(|| GraphError::NodeNotFound(host.to_owned()))?;
            let at = index.unwrap_or(node.pins().len()).min(node.pins().len());
            node.pins_mut().insert(at, pin.clone());
        }
        self.refresh_mirrors(host, &parent_frame)?;
        self.notify(NoticeKind::PinAdded, format!("{host}.{pin_name}"));
        Ok(())
    }

    pub(crate) fn apply_remove_exposed_pin(
        &mut self,
        host: &str,
        pin_name: &str,
    ) -> Result<(usize, Pin), GraphError> {
        let (_, parent_frame) = self.exposed_pin_host()?;
        let removed = {
            let graph = self.frame_graph_mut(&parent_frame)?;
            let node = graph
                .find_node_mut(host)
                .ok_or_else(|| GraphError::NodeNotFound(host.to_owned()))?;
            let index = node
                .pins()
                .iter()
                .position(|pin| pin.name() == pin_name)
                .ok_or_else(|| GraphError::PinNotFound(format!("{host}.{pin_name}")))?;
            (index, node.pins_mut().remove(index))
        };
        self.refresh_mirrors(host, &parent_frame)?;
        self.notify(NoticeKind::PinRemoved, format!("{host}.{pin_name}"));
        Ok(removed)
    }

    pub(crate) fn apply_rename_exposed_pin(
        &mut self,
        host: &str,
        old: &str,
        new: &str,
    ) -> Result<(), GraphError> {
        let (_, parent_frame) = self.exposed_pin_host()?;
        let mut hosts = vec![(parent_frame.clone(), host.to_owned())];
        if is_library_root(&parent_frame) {
            for location in self.library_graph().references_of(host).to_vec() {
                hosts.push((location.frame, location.node));
            }
        }
        for (frame, node_name) in hosts {
            if let Ok(graph) = self.frame_graph_mut(&frame) {
                if let Some(node) = graph.find_node_mut(&node_name) {
                    if let Some(pin) = node.pins_mut().iter_mut().find(|pin| pin.name() == old) {
                        pin.set_name(new);
                    }
                }
                graph.rewrite_pin_paths(
                    &format!("{node_name}.{old}"),
                    &format!("{node_name}.{new}"),
                );
            }
        }
        // Mirror the rename into the body before rebuilding entry/return
        // pins, so links follow.
        let body = self.graph_mut()?;
        for interface_node in [ENTRY_NODE, RETURN_NODE] {
            body.rewrite_pin_paths(
                &format!("{interface_node}.{old}"),
                &format!("{interface_node}.{new}"),
            );
        }
        self.refresh_mirrors(host, &parent_frame)?;
        self.notify(
            NoticeKind::PinRenamed,
            format!("{host}.{old} -> {host}.{new}"),
        );
        Ok(())
    }

    /// Rebuilds entry/return pins from the host's interface and refreshes
    /// the pins of every reference.
    fn refresh_mirrors(&mut self, host: &str, parent_frame: &GraphFrame) -> Result<(), GraphError> {
        let interface = {
            let graph = self
                .resolve_frame(parent_frame)
                .ok_or_else(|| GraphError::NodeNotFound(host.to_owned()))?;
            graph
                .find_node(host)
                .ok_or_else(|| GraphError::NodeNotFound(host.to_owned()))?
                .pins()
                .to_vec()
        };
        let body = self.graph_mut()?;
        refresh_interface_nodes(body, &interface);
        if is_library_root(parent_frame) {
            for location in self.library_graph().references_of(host).to_vec() {
                if let Ok(graph) = self.frame_graph_mut(&location.frame) {
                    if let Some(node) = graph.find_node_mut(&location.node) {
                        *node.pins_mut() = interface.clone();
                    }
                }
            }
            let host = host.to_owned();
            self.notify(NoticeKind::FunctionReferencesRefreshed, host);
        }
        Ok(())
    }
}

fn is_library_root(frame: &GraphFrame) -> bool {
    frame.target == GraphTarget::Library && frame.path.is_empty()
}

fn swap_node_prefix(path: &str, old_node: &str, new_node: &str) -> String {
    path.strip_prefix(old_node)
        .filter(|rest| rest.starts_with('.'))
        .map_or_else(|| path.to_owned(), |rest| format!("{new_node}{rest}"))
}

/// Builds a fresh function definition node with entry/return nodes inside.
fn new_function_definition(name: &str, mutable: bool) -> Node {
    let mut contained = Graph::new(GraphKind::Contained);
    contained.add_node(Node::new(ENTRY_NODE, NodeKind::Entry));
    contained.add_node(Node::new(RETURN_NODE, NodeKind::Return));
    let mut node = Node::new(name, NodeKind::Collapse { graph: contained });
    if mutable {
        node.pins_mut()
            .push(Pin::new("execute", PinDirection::Io, EXECUTE_TYPE));
    }
    refresh_interface_in_node(&mut node);
    node
}

fn refresh_interface_in_node(node: &mut Node) {
    let interface = node.pins().to_vec();
    if let Some(contained) = node.contained_graph_mut() {
        refresh_interface_nodes(contained, &interface);
    }
}

/// Rebuilds the pins of the entry and return nodes of a body from the
/// host's interface pins. Inputs mirror as entry outputs, outputs as return
/// inputs; execute pins thread through both.
pub(crate) fn refresh_interface_nodes(body: &mut Graph, interface: &[Pin]) {
    let entry_pins: Vec<Pin> = interface.iter().filter_map(entry_mirror).collect();
    let return_pins: Vec<Pin> = interface.iter().filter_map(return_mirror).collect();
    if let Some(entry) = body.find_node_mut(ENTRY_NODE) {
        *entry.pins_mut() = entry_pins;
    }
    if let Some(ret) = body.find_node_mut(RETURN_NODE) {
        *ret.pins_mut() = return_pins;
    }
}

fn entry_mirror(pin: &Pin) -> Option<Pin> {
    let mut mirrored = pin.clone();
    if pin.is_execute() {
        mirrored.set_direction(PinDirection::Io);
    } else if pin.direction().accepts_incoming() {
        mirrored.set_direction(PinDirection::Output);
    } else {
        return None;
    }
    Some(mirrored)
}

fn return_mirror(pin: &Pin) -> Option<Pin> {
    let mut mirrored = pin.clone();
    if pin.is_execute() {
        mirrored.set_direction(PinDirection::Io);
    } else if pin.direction().provides_outgoing() {
        mirrored.set_direction(PinDirection::Input);
    } else {
        return None;
    }
    Some(mirrored)
}
