// SPDX-License-Identifier: Apache-2.0
//! Graphs, graph frames and the function reference registry.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::link::Link;
use crate::node::Node;
use crate::pin::{path_is_or_descends, split_node_and_pin, Pin};

/// Which root graph a frame path starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphTarget {
    /// The model's top-level graph.
    Root,
    /// The function library graph.
    Library,
}

/// Address of a graph: a root plus the chain of collapse node names leading
/// into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFrame {
    /// Root graph the path starts from.
    pub target: GraphTarget,
    /// Collapse node names, outermost first. Empty addresses the root
    /// itself.
    pub path: Vec<String>,
}

impl GraphFrame {
    /// Frame addressing a root graph directly.
    #[must_use]
    pub fn root_of(target: GraphTarget) -> Self {
        Self {
            target,
            path: Vec::new(),
        }
    }

    /// Frame one level deeper, inside `node`.
    #[must_use]
    pub fn child(&self, node: &str) -> Self {
        let mut path = self.path.clone();
        path.push(node.to_owned());
        Self {
            target: self.target,
            path,
        }
    }
}

/// Address of a node anywhere in the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLocation {
    /// Graph the node lives in.
    pub frame: GraphFrame,
    /// Node name within that graph.
    pub node: String,
}

/// Role of a graph in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphKind {
    /// The top-level graph; the only place event nodes may live.
    Root,
    /// A graph contained inside a collapse node.
    Contained,
    /// The function library; holds only function definition nodes.
    FunctionLibrary,
}

/// A graph: nodes, links, a selection, and (for libraries) the registry of
/// references to its function definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphData")]
pub struct Graph {
    kind: GraphKind,
    nodes: Vec<Node>,
    links: Vec<Link>,
    selection: Vec<String>,
    #[serde(skip)]
    node_index: FxHashMap<String, usize>,
    /// Definition name to locations of reference nodes, library graphs only.
    #[serde(skip)]
    function_references: BTreeMap<String, Vec<NodeLocation>>,
}

impl Graph {
    /// Creates an empty graph of the given kind.
    #[must_use]
    pub fn new(kind: GraphKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            links: Vec::new(),
            selection: Vec::new(),
            node_index: FxHashMap::default(),
            function_references: BTreeMap::new(),
        }
    }

    /// The graph's role.
    #[must_use]
    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// Whether this is the function library graph.
    #[must_use]
    pub fn is_library(&self) -> bool {
        self.kind == GraphKind::FunctionLibrary
    }

    /// Nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Finds a node by name.
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.node_index
            .get(name)
            .and_then(|&index| self.nodes.get(index))
    }

    pub(crate) fn find_node_mut(&mut self, name: &str) -> Option<&mut Node> {
        let index = *self.node_index.get(name)?;
        self.nodes.get_mut(index)
    }

    /// Whether a node with this name exists.
    #[must_use]
    pub fn contains_node(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    /// Node names in insertion order.
    #[must_use]
    pub fn node_names(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.name().to_owned()).collect()
    }

    pub(crate) fn add_node(&mut self, node: Node) {
        self.node_index.insert(node.name().to_owned(), self.nodes.len());
        self.nodes.push(node);
    }

    pub(crate) fn remove_node(&mut self, name: &str) -> Option<Node> {
        let index = self.node_index.remove(name)?;
        let node = self.nodes.remove(index);
        self.rebuild_index();
        self.selection.retain(|selected| selected != name);
        Some(node)
    }

    pub(crate) fn rename_node(&mut self, old: &str, new: &str) -> bool {
        let Some(index) = self.node_index.remove(old) else {
            return false;
        };
        self.nodes[index].set_name(new);
        self.node_index.insert(new.to_owned(), index);
        for selected in &mut self.selection {
            if selected == old {
                *selected = new.to_owned();
            }
        }
        self.rewrite_pin_paths(old, new);
        true
    }

    /// Swaps a node for another with the same name, keeping its position in
    /// the node list.
    pub(crate) fn replace_node(&mut self, node: Node) -> bool {
        let Some(&index) = self.node_index.get(node.name()) else {
            return false;
        };
        self.nodes[index] = node;
        true
    }

    fn rebuild_index(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.name().to_owned(), index))
            .collect();
    }

    /// Rewrites link endpoints under `old_prefix` to `new_prefix`. Used for
    /// node renames (`"Old"` -> `"New"`) and array element re-indexing
    /// (`"A.values.2"` -> `"A.values.1"`).
    pub(crate) fn rewrite_pin_paths(&mut self, old_prefix: &str, new_prefix: &str) {
        for link in &mut self.links {
            for endpoint in [&mut link.source, &mut link.target] {
                if path_is_or_descends(endpoint, old_prefix) {
                    let rest = &endpoint[old_prefix.len()..];
                    *endpoint = format!("{new_prefix}{rest}");
                }
            }
        }
    }

    /// Finds a pin by `Node.Pin.Sub` path.
    #[must_use]
    pub fn find_pin(&self, path: &str) -> Option<&Pin> {
        let (node, pin_path) = split_node_and_pin(path)?;
        self.find_node(node)?.find_pin(pin_path)
    }

    pub(crate) fn find_pin_mut(&mut self, path: &str) -> Option<&mut Pin> {
        let (node, pin_path) = split_node_and_pin(path)?;
        self.find_node_mut(node)?.find_pin_mut(pin_path)
    }

    /// Links in insertion order.
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Whether a link with these exact endpoints exists.
    #[must_use]
    pub fn has_link(&self, source: &str, target: &str) -> bool {
        self.links
            .iter()
            .any(|link| link.source == source && link.target == target)
    }

    pub(crate) fn add_link_record(&mut self, link: Link) {
        self.links.push(link);
    }

    pub(crate) fn remove_link_record(&mut self, source: &str, target: &str) -> bool {
        let before = self.links.len();
        self.links
            .retain(|link| !(link.source == source && link.target == target));
        self.links.len() != before
    }

    /// Links ending at `path`; with `recursive`, also links ending at any
    /// descendant pin.
    #[must_use]
    pub fn links_into(&self, path: &str, recursive: bool) -> Vec<Link> {
        self.links
            .iter()
            .filter(|link| {
                if recursive {
                    path_is_or_descends(&link.target, path)
                } else {
                    link.target == path
                }
            })
            .cloned()
            .collect()
    }

    /// Links starting at `path`; with `recursive`, also links starting at
    /// any descendant pin.
    #[must_use]
    pub fn links_from(&self, path: &str, recursive: bool) -> Vec<Link> {
        self.links
            .iter()
            .filter(|link| {
                if recursive {
                    path_is_or_descends(&link.source, path)
                } else {
                    link.source == path
                }
            })
            .cloned()
            .collect()
    }

    /// All links with either endpoint on `node`.
    #[must_use]
    pub fn links_touching_node(&self, node: &str) -> Vec<Link> {
        self.links
            .iter()
            .filter(|link| {
                path_is_or_descends(&link.source, node) || path_is_or_descends(&link.target, node)
            })
            .cloned()
            .collect()
    }

    /// Currently selected node names, in selection order.
    #[must_use]
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub(crate) fn selection_mut(&mut self) -> &mut Vec<String> {
        &mut self.selection
    }

    /// Locations of reference nodes for a library function definition.
    #[must_use]
    pub fn references_of(&self, definition: &str) -> &[NodeLocation] {
        self.function_references
            .get(definition)
            .map_or(&[], Vec::as_slice)
    }

    pub(crate) fn register_reference(&mut self, definition: &str, location: NodeLocation) {
        let entries = self
            .function_references
            .entry(definition.to_owned())
            .or_default();
        if !entries.contains(&location) {
            entries.push(location);
        }
    }

    pub(crate) fn unregister_reference(&mut self, definition: &str, location: &NodeLocation) {
        if let Some(entries) = self.function_references.get_mut(definition) {
            entries.retain(|entry| entry != location);
            if entries.is_empty() {
                self.function_references.remove(definition);
            }
        }
    }

    pub(crate) fn take_references(&mut self, definition: &str) -> Vec<NodeLocation> {
        self.function_references.remove(definition).unwrap_or_default()
    }

    pub(crate) fn rename_reference_key(&mut self, old: &str, new: &str) {
        if let Some(entries) = self.function_references.remove(old) {
            self.function_references.insert(new.to_owned(), entries);
        }
    }
}

/// Serialized shape of a graph; the node index is rebuilt on load.
#[derive(Deserialize)]
struct GraphData {
    kind: GraphKind,
    nodes: Vec<Node>,
    links: Vec<Link>,
    #[serde(default)]
    selection: Vec<String>,
}

impl From<GraphData> for Graph {
    fn from(data: GraphData) -> Self {
        let mut graph = Self::new(data.kind);
        for node in data.nodes {
            graph.add_node(node);
        }
        graph.links = data.links;
        graph.selection = data.selection;
        graph
    }
}
