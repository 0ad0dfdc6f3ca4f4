// SPDX-License-Identifier: Apache-2.0
//! Pins and pin paths.
//!
//! Pins form a tree under their node: an aggregate pin owns one sub-pin per
//! field, an array pin one sub-pin per element named by index. Elements are
//! addressed by dot-separated paths (`Node.Pin.Sub`); every reference between
//! graph elements is such a path, so the model is a strict ownership tree
//! with no back-edges.

use serde::{Deserialize, Serialize};

use loom_schema::{is_array_type, join_elements, join_fields, PinDirection, EXECUTE_TYPE};

use crate::node::Node;

/// Splits a `Node.Pin.Sub` path into the node name and the pin path within
/// the node.
#[must_use]
pub fn split_node_and_pin(path: &str) -> Option<(&str, &str)> {
    path.split_once('.')
}

/// The parent path of a pin path, if any (`"A.b.c"` -> `"A.b"`).
#[must_use]
pub fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('.').map(|(parent, _)| parent)
}

/// The last segment of a path (`"A.b.c"` -> `"c"`).
#[must_use]
pub fn last_segment(path: &str) -> &str {
    path.rsplit_once('.').map_or(path, |(_, last)| last)
}

/// Joins two path fragments with a dot.
#[must_use]
pub fn join_path(left: &str, right: &str) -> String {
    format!("{left}.{right}")
}

/// Whether `path` equals `prefix` or descends from it.
#[must_use]
pub fn path_is_or_descends(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'.')
}

/// A node spliced invisibly onto a pin.
///
/// The injected node is owned here, not by the graph, and participates in no
/// links while injected. Ejecting moves it back into the graph and rewires
/// it explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionInfo {
    /// The spliced node.
    pub node: Node,
    /// Name of the injected node's input pin carrying the spliced value.
    pub input_pin: String,
    /// Name of the injected node's output pin carrying the spliced value.
    pub output_pin: String,
    /// Whether the node is spliced on the input side of the host pin.
    pub injected_as_input: bool,
}

/// One pin of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    name: String,
    direction: PinDirection,
    ty: String,
    /// Leaf default text; pins with sub-pins reconstruct theirs on demand.
    default: String,
    expanded: bool,
    watched: bool,
    bound_variable: Option<String>,
    injections: Vec<InjectionInfo>,
    sub_pins: Vec<Pin>,
}

impl Pin {
    /// Creates a leaf pin with no default.
    #[must_use]
    pub fn new(name: impl Into<String>, direction: PinDirection, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction,
            ty: ty.into(),
            default: String::new(),
            expanded: false,
            watched: false,
            bound_variable: None,
            injections: Vec::new(),
            sub_pins: Vec::new(),
        }
    }

    /// Pin name, unique among its siblings.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Pin direction.
    #[must_use]
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub(crate) fn set_direction(&mut self, direction: PinDirection) {
        self.direction = direction;
    }

    /// Type name; empty while an enclosing prototype pin is unresolved.
    #[must_use]
    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub(crate) fn set_ty(&mut self, ty: impl Into<String>) {
        self.ty = ty.into();
    }

    /// Whether this is the control-flow marker type.
    #[must_use]
    pub fn is_execute(&self) -> bool {
        self.ty == EXECUTE_TYPE
    }

    /// Whether this pin carries an array type.
    #[must_use]
    pub fn is_array(&self) -> bool {
        is_array_type(&self.ty)
    }

    /// Current default value text. Pins with sub-pins assemble it from the
    /// children, so it is always consistent with the tree.
    #[must_use]
    pub fn default_value(&self) -> String {
        if self.is_array() {
            // An emptied array has no elements left to compose from; a
            // folded one still carries its text.
            if self.sub_pins.is_empty() {
                if self.default.is_empty() {
                    return "()".to_owned();
                }
                return self.default.clone();
            }
            let values: Vec<String> = self.sub_pins.iter().map(Pin::default_value).collect();
            return join_elements(values.iter().map(String::as_str));
        }
        if self.sub_pins.is_empty() {
            return self.default.clone();
        }
        let fields: Vec<(String, String)> = self
            .sub_pins
            .iter()
            .map(|sub| (sub.name.clone(), sub.default_value()))
            .collect();
        join_fields(fields.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }

    pub(crate) fn set_leaf_default(&mut self, default: impl Into<String>) {
        self.default = default.into();
    }

    /// Whether the pin is expanded in the UI.
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub(crate) fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    /// Whether the pin's value is watched during execution.
    #[must_use]
    pub fn is_watched(&self) -> bool {
        self.watched
    }

    pub(crate) fn set_watched(&mut self, watched: bool) {
        self.watched = watched;
    }

    /// The variable path this pin is bound to, if any.
    #[must_use]
    pub fn bound_variable(&self) -> Option<&str> {
        self.bound_variable.as_deref()
    }

    pub(crate) fn set_bound_variable(&mut self, variable: Option<String>) {
        self.bound_variable = variable;
    }

    /// Nodes spliced onto this pin, in splice order.
    #[must_use]
    pub fn injections(&self) -> &[InjectionInfo] {
        &self.injections
    }

    pub(crate) fn injections_mut(&mut self) -> &mut Vec<InjectionInfo> {
        &mut self.injections
    }

    /// Sub-pins in declaration (or element) order.
    #[must_use]
    pub fn sub_pins(&self) -> &[Pin] {
        &self.sub_pins
    }

    pub(crate) fn sub_pins_mut(&mut self) -> &mut Vec<Pin> {
        &mut self.sub_pins
    }

    /// Finds a descendant by dot-separated path relative to this pin.
    #[must_use]
    pub fn find_sub_pin(&self, path: &str) -> Option<&Pin> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let sub = self.sub_pins.iter().find(|sub| sub.name == head)?;
        match rest {
            Some(rest) => sub.find_sub_pin(rest),
            None => Some(sub),
        }
    }

    pub(crate) fn find_sub_pin_mut(&mut self, path: &str) -> Option<&mut Pin> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let sub = self.sub_pins.iter_mut().find(|sub| sub.name == head)?;
        match rest {
            Some(rest) => sub.find_sub_pin_mut(rest),
            None => Some(sub),
        }
    }

    /// Visits this pin and all descendants depth-first.
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a Pin)) {
        visitor(self);
        for sub in &self.sub_pins {
            sub.visit(visitor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_helpers() {
        assert_eq!(split_node_and_pin("A.b.c"), Some(("A", "b.c")));
        assert_eq!(split_node_and_pin("A"), None);
        assert_eq!(parent_path("A.b.c"), Some("A.b"));
        assert_eq!(parent_path("A"), None);
        assert_eq!(last_segment("A.b.c"), "c");
        assert!(path_is_or_descends("A.b.c", "A.b"));
        assert!(path_is_or_descends("A.b", "A.b"));
        assert!(!path_is_or_descends("A.bb", "A.b"));
    }

    #[test]
    fn composite_default_is_assembled_from_children() {
        let mut pin = Pin::new("value", PinDirection::Input, "Vector");
        let mut x = Pin::new("x", PinDirection::Input, "float");
        x.set_leaf_default("1.0");
        let mut y = Pin::new("y", PinDirection::Input, "float");
        y.set_leaf_default("2.0");
        pin.sub_pins_mut().extend([x, y]);
        assert_eq!(pin.default_value(), "(x=1.0,y=2.0)");

        let mut array = Pin::new("values", PinDirection::Input, "float[]");
        let mut first = Pin::new("0", PinDirection::Input, "float");
        first.set_leaf_default("3.0");
        array.sub_pins_mut().push(first);
        assert_eq!(array.default_value(), "(3.0)");
    }
}
