// SPDX-License-Identifier: Apache-2.0
//! Nodes and node kinds.

use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::pin::Pin;

/// 2D editor coordinate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Vec2 {
    /// Origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a coordinate.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// What a node is, with per-kind payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Instance of a typed operation from the catalog.
    Unit {
        /// Catalog operation name.
        operation: String,
    },
    /// Getter or setter for a named variable.
    Variable {
        /// Variable name.
        variable: String,
        /// Variable type name.
        ty: String,
        /// Getter exposes the value; setter consumes it on an execute chain.
        is_getter: bool,
    },
    /// Input or output parameter of the graph.
    Parameter {
        /// Parameter name.
        parameter: String,
        /// Parameter type name.
        ty: String,
        /// Input parameters expose a value pin; outputs consume one.
        is_input: bool,
    },
    /// Free-floating annotation.
    Comment {
        /// Comment text.
        text: String,
    },
    /// Pass-through value pin pair, cosmetic only.
    Reroute {
        /// Whether the editor draws the full pin tree or a compact dot.
        show_as_full_node: bool,
    },
    /// Control-flow split on a boolean condition.
    Branch,
    /// Value selection between two inputs on a condition.
    If,
    /// Value selection from an array by index.
    Select,
    /// Constant of an enumeration type with its index exposed.
    Enum {
        /// Enumeration type name.
        enum_type: String,
    },
    /// Unresolved polymorphic operation.
    Prototype {
        /// Prototype notation, e.g. `"add(a,b,result)"`.
        notation: String,
    },
    /// Subgraph container; owns a contained graph with entry/return nodes.
    Collapse {
        /// The contained graph.
        graph: Graph,
    },
    /// Instance of a function defined in the function library.
    FunctionReference {
        /// Name of the definition in the library, if still resolved.
        definition: Option<String>,
    },
    /// Source of a contained graph's inputs.
    Entry,
    /// Sink of a contained graph's outputs.
    Return,
}

/// A node in a graph: a name, a kind, editor geometry and a pin tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    position: Vec2,
    size: Vec2,
    kind: NodeKind,
    pins: Vec<Pin>,
}

impl Node {
    /// Creates a node with no pins at the origin.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            position: Vec2::ZERO,
            size: Vec2::ZERO,
            kind,
            pins: Vec::new(),
        }
    }

    /// Node name, unique within its graph.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Editor position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Editor size (comment nodes).
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub(crate) fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    /// The node's kind and payload.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Top-level pins in declaration order.
    #[must_use]
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub(crate) fn pins_mut(&mut self) -> &mut Vec<Pin> {
        &mut self.pins
    }

    /// Finds a pin by dot-separated path relative to this node.
    #[must_use]
    pub fn find_pin(&self, path: &str) -> Option<&Pin> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let pin = self.pins.iter().find(|pin| pin.name() == head)?;
        match rest {
            Some(rest) => pin.find_sub_pin(rest),
            None => Some(pin),
        }
    }

    pub(crate) fn find_pin_mut(&mut self, path: &str) -> Option<&mut Pin> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let pin = self.pins.iter_mut().find(|pin| pin.name() == head)?;
        match rest {
            Some(rest) => pin.find_sub_pin_mut(rest),
            None => Some(pin),
        }
    }

    /// Visits every pin of the node depth-first with its path relative to
    /// the node.
    pub fn for_each_pin<'a>(&'a self, visitor: &mut impl FnMut(&str, &'a Pin)) {
        fn walk<'a>(prefix: &str, pin: &'a Pin, visitor: &mut impl FnMut(&str, &'a Pin)) {
            let path = if prefix.is_empty() {
                pin.name().to_owned()
            } else {
                format!("{prefix}.{}", pin.name())
            };
            visitor(&path, pin);
            for sub in pin.sub_pins() {
                walk(&path, sub, visitor);
            }
        }
        for pin in &self.pins {
            walk("", pin, visitor);
        }
    }

    /// Whether the node participates in control flow (owns an execute pin).
    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.pins.iter().any(Pin::is_execute)
    }

    /// The contained graph, for collapse nodes.
    #[must_use]
    pub fn contained_graph(&self) -> Option<&Graph> {
        match &self.kind {
            NodeKind::Collapse { graph } => Some(graph),
            _ => None,
        }
    }

    pub(crate) fn contained_graph_mut(&mut self) -> Option<&mut Graph> {
        match &mut self.kind {
            NodeKind::Collapse { graph } => Some(graph),
            _ => None,
        }
    }

    /// Whether the node is an entry or return node of a contained graph.
    #[must_use]
    pub fn is_entry_or_return(&self) -> bool {
        matches!(self.kind, NodeKind::Entry | NodeKind::Return)
    }
}
