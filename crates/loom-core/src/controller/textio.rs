// SPDX-License-Identifier: Apache-2.0
//! Copy/paste through the portable text form.
//!
//! Export captures node clones and the links among them as a
//! [`GraphClip`](crate::snapshot::GraphClip). Import replays the clip into
//! the current graph under fresh names, dropping what no longer resolves
//! (unknown operations, vanished link endpoints) with a warning instead of
//! failing the whole paste.

use crate::error::GraphError;
use crate::node::{Node, NodeKind, Vec2};
use crate::pin::split_node_and_pin;
use crate::report::Severity;
use crate::snapshot::GraphClip;

use super::Controller;

impl Controller {
    /// Serializes the named nodes of the current graph, and the links among
    /// them, to text. Unknown names are ignored.
    pub fn export_nodes_to_text(&self, names: &[&str]) -> Result<String, GraphError> {
        let mut nodes: Vec<Node> = Vec::new();
        for name in names {
            if let Some(node) = self.graph().find_node(name) {
                if nodes.iter().all(|captured| captured.name() != node.name()) {
                    nodes.push(node.clone());
                }
            }
        }
        let captured = |path: &str| {
            split_node_and_pin(path)
                .is_some_and(|(node, _)| nodes.iter().any(|captured| captured.name() == node))
        };
        let links = self
            .graph()
            .links()
            .iter()
            .filter(|link| captured(&link.source) && captured(&link.target))
            .cloned()
            .collect();
        GraphClip { nodes, links }.to_text()
    }

    /// Serializes the current selection to text.
    pub fn export_selection_to_text(&self) -> Result<String, GraphError> {
        let selection = self.graph().selection().to_vec();
        let names: Vec<&str> = selection.iter().map(String::as_str).collect();
        self.export_nodes_to_text(&names)
    }

    /// Whether the text parses as a clip whose unit operations all resolve
    /// against the catalog.
    #[must_use]
    pub fn can_import_nodes_from_text(&self, text: &str) -> bool {
        GraphClip::from_text(text).is_ok_and(|clip| {
            clip.nodes.iter().all(|node| match node.kind() {
                NodeKind::Unit { operation } => self.catalog().find_operation(operation).is_some(),
                _ => true,
            })
        })
    }

    /// Imports a clip into the current graph at an offset, renaming nodes
    /// to stay unique. Nodes whose operation vanished from the catalog are
    /// skipped, function references whose definition is gone import
    /// unresolved, and links with a missing endpoint are dropped; each case
    /// is reported as a warning. Returns the names of the imported nodes.
    pub fn import_nodes_from_text(
        &mut self,
        text: &str,
        offset: Vec2,
        setup_undo: bool,
    ) -> Result<Vec<String>, GraphError> {
        self.forbid_library("import nodes")?;
        let clip = GraphClip::from_text(text)?;
        self.begin_action(setup_undo, "Import Nodes");
        let result = (|| {
            let mut name_map: Vec<(String, String)> = Vec::new();
            let mut imported: Vec<String> = Vec::new();
            for node in &clip.nodes {
                let mut node = node.clone();
                match node.kind() {
                    NodeKind::Entry | NodeKind::Return => {
                        self.report(
                            Severity::Warning,
                            format!("skipping '{}': entry and return nodes cannot be pasted", node.name()),
                        );
                        continue;
                    }
                    NodeKind::Unit { operation } => {
                        if self.catalog().find_operation(operation).is_none() {
                            self.report(
                                Severity::Warning,
                                format!(
                                    "skipping '{}': unknown operation '{operation}'",
                                    node.name()
                                ),
                            );
                            continue;
                        }
                    }
                    NodeKind::FunctionReference {
                        definition: Some(function),
                    } => {
                        if self.library_graph().find_node(function).is_none() {
                            self.report(
                                Severity::Warning,
                                format!(
                                    "importing '{}' unresolved: function '{function}' is gone",
                                    node.name()
                                ),
                            );
                            if let NodeKind::FunctionReference { definition } = node.kind_mut() {
                                *definition = None;
                            }
                        }
                    }
                    _ => {}
                }
                let original = node.name().to_owned();
                node.set_name(self.unique_node_name(&original));
                node.set_position(node.position() + offset);
                let new_name = self.finish_add(node, setup_undo)?;
                name_map.push((original, new_name.clone()));
                imported.push(new_name);
            }
            for link in &clip.links {
                let (Some(source), Some(target)) = (
                    remap_endpoint(&link.source, &name_map),
                    remap_endpoint(&link.target, &name_map),
                ) else {
                    continue;
                };
                if let Err(error) = self.add_link(&source, &target, setup_undo) {
                    self.report(
                        Severity::Warning,
                        format!("dropping pasted link {source} -> {target}: {error}"),
                    );
                }
            }
            Ok(imported)
        })();
        match result {
            Ok(imported) => {
                self.end_action(setup_undo);
                Ok(imported)
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }
}

fn remap_endpoint(path: &str, name_map: &[(String, String)]) -> Option<String> {
    let (node, rest) = split_node_and_pin(path)?;
    name_map
        .iter()
        .find(|(old, _)| old == node)
        .map(|(_, new)| format!("{new}.{rest}"))
}
