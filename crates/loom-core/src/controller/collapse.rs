// SPDX-License-Identifier: Apache-2.0
//! Collapsing nodes into a subgraph and expanding one back out.
//!
//! Both operations are composed entirely from the recorded primitives
//! (add/remove node, add/break link, set default), so their undo replays
//! exactly and needs no bespoke inverse. Collapse exposes one pin per
//! boundary pin crossed by a link; data links may cross at sub-pin depth,
//! in which case expansion splices a reroute node to fan the value back
//! out.

use rustc_hash::FxHashSet;

use loom_schema::{PinDirection, EXECUTE_TYPE};

use crate::error::GraphError;
use crate::graph::{Graph, GraphKind};
use crate::link::Link;
use crate::node::{Node, NodeKind, Vec2};
use crate::pin::{path_is_or_descends, split_node_and_pin, Pin};

use super::library::{refresh_interface_nodes, ENTRY_NODE, RETURN_NODE};
use super::{unique_in, Controller};

impl Controller {
    /// Collapses a set of nodes of the current graph into a new collapse
    /// node. Links crossing the boundary become exposed pins wired through
    /// entry/return nodes. Returns the collapse node's name.
    #[allow(clippy::too_many_lines)]
    pub fn collapse_nodes(
        &mut self,
        names: &[&str],
        name: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.forbid_library("collapse nodes")?;
        let members = self.collapsible_members(names)?;
        let member_set: FxHashSet<&str> = members.iter().map(Node::name).collect();
        let node_in_set = |path: &str| {
            split_node_and_pin(path).is_some_and(|(node, _)| member_set.contains(node))
        };

        let mut internal = Vec::new();
        let mut incoming = Vec::new();
        let mut outgoing = Vec::new();
        for link in self.graph().links() {
            match (node_in_set(&link.source), node_in_set(&link.target)) {
                (true, true) => internal.push(link.clone()),
                (false, true) => incoming.push(link.clone()),
                (true, false) => outgoing.push(link.clone()),
                (false, false) => {}
            }
        }
        check_execute_boundary(self.graph(), &internal, &incoming, &outgoing)?;

        // One exposed pin per boundary pin, keyed by the inner pin path.
        let has_execute = members.iter().any(Node::is_mutable);
        let mut exposed: Vec<Pin> = Vec::new();
        if has_execute {
            exposed.push(Pin::new("execute", PinDirection::Io, EXECUTE_TYPE));
        }
        let mut input_map: Vec<(String, String)> = Vec::new();
        let mut output_map: Vec<(String, String)> = Vec::new();
        for link in &incoming {
            let pin = self
                .graph()
                .find_pin(&link.target)
                .ok_or_else(|| GraphError::PinNotFound(link.target.clone()))?;
            if pin.is_execute() {
                input_map.push((link.target.clone(), "execute".to_owned()));
                continue;
            }
            let exposed_name = expose_boundary_pin(&mut exposed, pin, PinDirection::Input);
            input_map.push((link.target.clone(), exposed_name));
        }
        for link in &outgoing {
            if let Some((_, existing)) = output_map.iter().find(|(inner, _)| inner == &link.source)
            {
                output_map.push((link.source.clone(), existing.clone()));
                continue;
            }
            let pin = self
                .graph()
                .find_pin(&link.source)
                .ok_or_else(|| GraphError::PinNotFound(link.source.clone()))?;
            if pin.is_execute() {
                output_map.push((link.source.clone(), "execute".to_owned()));
                continue;
            }
            let exposed_name = expose_boundary_pin(&mut exposed, pin, PinDirection::Output);
            output_map.push((link.source.clone(), exposed_name));
        }

        let centroid = members
            .iter()
            .fold(Vec2::ZERO, |sum, node| sum + node.position());
        #[allow(clippy::cast_precision_loss)]
        let count = members.len() as f32;
        let position = Vec2::new(centroid.x / count, centroid.y / count);
        let mut contained = Graph::new(GraphKind::Contained);
        contained.add_node(Node::new(ENTRY_NODE, NodeKind::Entry));
        contained.add_node(Node::new(RETURN_NODE, NodeKind::Return));
        refresh_interface_nodes(&mut contained, &exposed);
        let desired = if name.is_empty() { "Collapsed" } else { name };
        let collapse_name = self.unique_node_name(desired);
        let mut collapse = Node::new(&collapse_name, NodeKind::Collapse { graph: contained });
        collapse.set_position(position);
        *collapse.pins_mut() = exposed;

        self.begin_action(setup_undo, "Collapse Nodes");
        let result = (|| {
            let collapse_name = self.finish_add(collapse, setup_undo)?;
            for member in &members {
                self.remove_node(member.name(), setup_undo)?;
            }
            let frame = self.current_frame().child(&collapse_name);
            self.with_frame(frame, setup_undo, |controller| {
                // Entry/Return occupy their names, so a member may come
                // back renamed; links follow the rename.
                let mut inner_map: Vec<(String, String)> = Vec::new();
                for member in &members {
                    let mut clone = member.clone();
                    clone.set_name(controller.unique_node_name(member.name()));
                    let new_name = controller.finish_add(clone, setup_undo)?;
                    inner_map.push((member.name().to_owned(), new_name));
                }
                let remap = |path: &str| remap_node(path, &inner_map);
                for link in &internal {
                    controller.add_link(&remap(&link.source), &remap(&link.target), setup_undo)?;
                }
                for (inner, exposed_name) in &input_map {
                    controller.add_link(
                        &format!("{ENTRY_NODE}.{exposed_name}"),
                        &remap(inner),
                        setup_undo,
                    )?;
                }
                let mut wired: FxHashSet<&str> = FxHashSet::default();
                for (inner, exposed_name) in &output_map {
                    if wired.insert(inner.as_str()) {
                        controller.add_link(
                            &remap(inner),
                            &format!("{RETURN_NODE}.{exposed_name}"),
                            setup_undo,
                        )?;
                    }
                }
                Ok(())
            })?;
            for (link, (_, exposed_name)) in incoming.iter().zip(&input_map) {
                self.add_link(
                    &link.source,
                    &format!("{collapse_name}.{exposed_name}"),
                    setup_undo,
                )?;
            }
            for (link, (_, exposed_name)) in outgoing.iter().zip(&output_map) {
                self.add_link(
                    &format!("{collapse_name}.{exposed_name}"),
                    &link.target,
                    setup_undo,
                )?;
            }
            Ok(collapse_name)
        })();
        match result {
            Ok(collapse_name) => {
                self.end_action(setup_undo);
                Ok(collapse_name)
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// Expands a collapse node (or a function reference's definition body)
    /// in place, rewiring the boundary. Returns the names of the nodes
    /// added to the current graph.
    #[allow(clippy::too_many_lines)]
    pub fn expand_node(
        &mut self,
        name: &str,
        setup_undo: bool,
    ) -> Result<Vec<String>, GraphError> {
        self.forbid_library("expand a node")?;
        let node = self.require_node(name)?;
        let (body, interface) = match node.kind() {
            NodeKind::Collapse { graph } => (graph.clone(), node.pins().to_vec()),
            NodeKind::FunctionReference {
                definition: Some(function),
            } => {
                let definition = self
                    .library_graph()
                    .find_node(function)
                    .ok_or_else(|| GraphError::NodeNotFound(function.clone()))?;
                let graph = definition
                    .contained_graph()
                    .ok_or_else(|| GraphError::WrongNodeKind {
                        node: function.clone(),
                        expected: "function definition",
                    })?;
                (graph.clone(), definition.pins().to_vec())
            }
            _ => {
                return Err(GraphError::WrongNodeKind {
                    node: name.to_owned(),
                    expected: "collapse or function reference",
                })
            }
        };
        let position = node.position();
        let outer_links = self.graph().links_touching_node(name);

        self.begin_action(setup_undo, "Expand Node");
        let result = (|| {
            self.remove_node(name, setup_undo)?;

            // Transfer the body nodes, tracking renames.
            let mut name_map: Vec<(String, String)> = Vec::new();
            let mut added: Vec<String> = Vec::new();
            for inner in body.nodes() {
                if inner.is_entry_or_return() {
                    continue;
                }
                let mut clone = inner.clone();
                clone.set_name(self.unique_node_name(inner.name()));
                clone.set_position(position + inner.position());
                let new_name = self.finish_add(clone, setup_undo)?;
                name_map.push((inner.name().to_owned(), new_name.clone()));
                added.push(new_name);
            }
            let remap = |path: &str| remap_node(path, &name_map);
            for link in body.links() {
                let source_boundary = first_segment_is(&link.source, ENTRY_NODE)
                    || first_segment_is(&link.source, RETURN_NODE);
                let target_boundary = first_segment_is(&link.target, ENTRY_NODE)
                    || first_segment_is(&link.target, RETURN_NODE);
                if source_boundary || target_boundary {
                    continue;
                }
                self.add_link(&remap(&link.source), &remap(&link.target), setup_undo)?;
            }

            // Rewire each exposed pin's boundary.
            for pin in &interface {
                let pin_root = pin.name();
                let outer_in: Vec<Link> = outer_links
                    .iter()
                    .filter(|link| path_is_or_descends(&link.target, &format!("{name}.{pin_root}")))
                    .cloned()
                    .collect();
                let outer_out: Vec<Link> = outer_links
                    .iter()
                    .filter(|link| path_is_or_descends(&link.source, &format!("{name}.{pin_root}")))
                    .cloned()
                    .collect();
                let inner_out = body.links_from(&format!("{ENTRY_NODE}.{pin_root}"), true);
                let inner_in = body.links_into(&format!("{RETURN_NODE}.{pin_root}"), true);

                if pin.direction().accepts_incoming() || pin.is_execute() {
                    self.expand_input_boundary(
                        name, pin, &outer_in, &inner_out, &remap, &mut added, setup_undo,
                    )?;
                }
                if pin.direction().provides_outgoing() && !pin.is_execute() {
                    self.expand_output_boundary(
                        name, pin, &outer_out, &inner_in, &remap, &mut added, setup_undo,
                    )?;
                } else if pin.is_execute() {
                    // Execute flow continues from the return side.
                    for outer in &outer_out {
                        if let Some(link) = inner_in.first() {
                            self.add_link(&remap(&link.source), &outer.target, setup_undo)?;
                        }
                    }
                }
            }
            Ok(added)
        })();
        match result {
            Ok(added) => {
                self.end_action(setup_undo);
                Ok(added)
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// Wires the input side of one exposed pin: outer feeds matched to
    /// inner consumers by sub-path, through a reroute node when the depths
    /// disagree, with the exposed default applied to unfed consumers.
    #[allow(clippy::too_many_arguments)]
    fn expand_input_boundary(
        &mut self,
        host: &str,
        pin: &Pin,
        outer_in: &[Link],
        inner_out: &[Link],
        remap: &impl Fn(&str) -> String,
        added: &mut Vec<String>,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        if inner_out.is_empty() {
            return Ok(());
        }
        if pin.is_execute() {
            for link in inner_out {
                if let Some(outer) = outer_in.first() {
                    self.add_link(&outer.source, &remap(&link.target), setup_undo)?;
                }
            }
            return Ok(());
        }
        let outer_subs: Vec<String> = outer_in
            .iter()
            .map(|link| sub_path_of(&link.target, host, pin.name()))
            .collect();
        let inner_subs: Vec<String> = inner_out
            .iter()
            .map(|link| sub_path_of(&link.source, ENTRY_NODE, pin.name()))
            .collect();
        if outer_in.is_empty() {
            // No feed: the exposed default becomes the consumers' default.
            for (link, sub) in inner_out.iter().zip(&inner_subs) {
                let value = value_at_sub_path(pin, sub);
                self.set_pin_default(&remap(&link.target), &value, setup_undo, false)?;
            }
            return Ok(());
        }
        let aligned = inner_subs
            .iter()
            .all(|sub| outer_subs.iter().any(|outer| outer == sub))
            && outer_subs
                .iter()
                .all(|sub| inner_subs.iter().any(|inner| inner == sub));
        if aligned {
            for (link, sub) in inner_out.iter().zip(&inner_subs) {
                if let Some(index) = outer_subs.iter().position(|outer| outer == sub) {
                    self.add_link(&outer_in[index].source, &remap(&link.target), setup_undo)?;
                }
            }
            return Ok(());
        }
        // Depths disagree: splice a reroute node carrying the full value.
        let reroute = self.add_free_reroute_node(
            false,
            pin.ty(),
            &pin.default_value(),
            Vec2::ZERO,
            "",
            setup_undo,
        )?;
        added.push(reroute.clone());
        for (link, sub) in outer_in.iter().zip(&outer_subs) {
            self.add_link(&link.source, &reroute_path(&reroute, sub), setup_undo)?;
        }
        for (link, sub) in inner_out.iter().zip(&inner_subs) {
            self.add_link(&reroute_path(&reroute, sub), &remap(&link.target), setup_undo)?;
        }
        Ok(())
    }

    /// Wires the output side of one exposed pin, mirroring
    /// [`expand_input_boundary`](Self::expand_input_boundary).
    #[allow(clippy::too_many_arguments)]
    fn expand_output_boundary(
        &mut self,
        host: &str,
        pin: &Pin,
        outer_out: &[Link],
        inner_in: &[Link],
        remap: &impl Fn(&str) -> String,
        added: &mut Vec<String>,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        if outer_out.is_empty() || inner_in.is_empty() {
            return Ok(());
        }
        let outer_subs: Vec<String> = outer_out
            .iter()
            .map(|link| sub_path_of(&link.source, host, pin.name()))
            .collect();
        let inner_subs: Vec<String> = inner_in
            .iter()
            .map(|link| sub_path_of(&link.target, RETURN_NODE, pin.name()))
            .collect();
        let aligned = outer_subs
            .iter()
            .all(|sub| inner_subs.iter().any(|inner| inner == sub));
        if aligned {
            for (outer, sub) in outer_out.iter().zip(&outer_subs) {
                if let Some(index) = inner_subs.iter().position(|inner| inner == sub) {
                    self.add_link(&remap(&inner_in[index].source), &outer.target, setup_undo)?;
                }
            }
            return Ok(());
        }
        let reroute = self.add_free_reroute_node(
            false,
            pin.ty(),
            &pin.default_value(),
            Vec2::ZERO,
            "",
            setup_undo,
        )?;
        added.push(reroute.clone());
        for (link, sub) in inner_in.iter().zip(&inner_subs) {
            self.add_link(&remap(&link.source), &reroute_path(&reroute, sub), setup_undo)?;
        }
        for (link, sub) in outer_out.iter().zip(&outer_subs) {
            self.add_link(&reroute_path(&reroute, sub), &link.target, setup_undo)?;
        }
        Ok(())
    }

    /// The nodes eligible for collapsing: existing, not entry/return, not
    /// event nodes. Fails when nothing remains.
    fn collapsible_members(&self, names: &[&str]) -> Result<Vec<Node>, GraphError> {
        let mut members: Vec<Node> = Vec::new();
        for name in names {
            let Some(node) = self.graph().find_node(name) else {
                continue;
            };
            if node.is_entry_or_return() {
                continue;
            }
            if let NodeKind::Unit { operation } = node.kind() {
                let is_event = self
                    .catalog()
                    .find_operation(operation)
                    .is_some_and(|desc| desc.is_event);
                if is_event {
                    continue;
                }
            }
            if members.iter().all(|member| member.name() != node.name()) {
                members.push(node.clone());
            }
        }
        if members.is_empty() {
            return Err(GraphError::NothingToCollapse);
        }
        Ok(members)
    }
}

/// Appends a boundary pin clone to the exposed set, stripped of bindings
/// and injections, and returns its exposed name.
fn expose_boundary_pin(exposed: &mut Vec<Pin>, inner: &Pin, direction: PinDirection) -> String {
    let name = unique_in(inner.name(), |candidate| {
        exposed.iter().any(|pin| pin.name() == candidate)
    });
    let mut pin = inner.clone();
    pin.set_name(&name);
    pin.set_direction(direction);
    pin.set_bound_variable(None);
    pin.injections_mut().clear();
    exposed.push(pin);
    name
}

/// Execute flow may cross the collapse boundary in at most one place per
/// direction, and when it crosses both ways the two crossings must sit on
/// one chain through the selection.
fn check_execute_boundary(
    graph: &Graph,
    internal: &[Link],
    incoming: &[Link],
    outgoing: &[Link],
) -> Result<(), GraphError> {
    let entry = sole_execute_crossing(graph, incoming, true)?;
    let exit = sole_execute_crossing(graph, outgoing, false)?;
    let (Some(entry), Some(exit)) = (entry, exit) else {
        return Ok(());
    };
    let Some((exit_node, _)) = split_node_and_pin(exit) else {
        return Ok(());
    };

    // Walk backward from the exit crossing over the selection's execute
    // links, collecting every execute pin the chain runs through.
    let mut pending = vec![exit_node.to_owned()];
    let mut visited: FxHashSet<String> = FxHashSet::default();
    let mut chain_pins: FxHashSet<String> = FxHashSet::default();
    while let Some(node_name) = pending.pop() {
        if !visited.insert(node_name.clone()) {
            continue;
        }
        if let Some(node) = graph.find_node(&node_name) {
            for pin in node.pins() {
                if pin.is_execute() && pin.direction().accepts_incoming() {
                    chain_pins.insert(format!("{node_name}.{}", pin.name()));
                }
            }
        }
        for link in internal {
            if !first_segment_is(&link.target, &node_name) {
                continue;
            }
            if !graph.find_pin(&link.target).is_some_and(Pin::is_execute) {
                continue;
            }
            if let Some((source_node, _)) = split_node_and_pin(&link.source) {
                pending.push(source_node.to_owned());
            }
        }
    }
    if !chain_pins.contains(entry) {
        return Err(GraphError::StructuralConflict(
            "incoming execute flow does not join the outgoing execute chain".to_owned(),
        ));
    }
    Ok(())
}

/// The single execute pin crossed by these boundary links, if any.
fn sole_execute_crossing<'a>(
    graph: &Graph,
    boundary: &'a [Link],
    incoming: bool,
) -> Result<Option<&'a str>, GraphError> {
    let mut seen: Option<&str> = None;
    for link in boundary {
        let inner = if incoming { &link.target } else { &link.source };
        let is_execute = graph.find_pin(inner).is_some_and(Pin::is_execute);
        if !is_execute {
            continue;
        }
        match seen {
            None => seen = Some(inner),
            Some(existing) if existing == inner.as_str() => {}
            Some(_) => {
                return Err(GraphError::StructuralConflict(
                    "execute flow crosses the collapse boundary in more than one place".to_owned(),
                ));
            }
        }
    }
    Ok(seen)
}

fn first_segment_is(path: &str, node: &str) -> bool {
    split_node_and_pin(path).is_some_and(|(head, _)| head == node)
}

/// Rewrites the node segment of a pin path through the rename map.
fn remap_node(path: &str, name_map: &[(String, String)]) -> String {
    let Some((node, rest)) = split_node_and_pin(path) else {
        return path.to_owned();
    };
    name_map
        .iter()
        .find(|(old, _)| old == node)
        .map_or_else(|| path.to_owned(), |(_, new)| format!("{new}.{rest}"))
}

/// The sub-path of a boundary endpoint below its exposed pin root; empty
/// for the root itself. `"Host.pin.x.y"` -> `"x.y"`.
fn sub_path_of(path: &str, node: &str, pin_root: &str) -> String {
    let prefix = format!("{node}.{pin_root}");
    path.strip_prefix(&prefix)
        .map_or(String::new(), |rest| rest.trim_start_matches('.').to_owned())
}

fn reroute_path(reroute: &str, sub: &str) -> String {
    if sub.is_empty() {
        format!("{reroute}.value")
    } else {
        format!("{reroute}.value.{sub}")
    }
}

/// The default value fragment of a pin at a sub-path below it.
fn value_at_sub_path(pin: &Pin, sub: &str) -> String {
    if sub.is_empty() {
        return pin.default_value();
    }
    pin.find_sub_pin(sub)
        .map_or_else(String::new, Pin::default_value)
}
