// SPDX-License-Identifier: Apache-2.0
//! The undo/redo action stack.
//!
//! Every primitive mutation records one [`Action`] carrying enough state to
//! apply it in either direction. Compound operations (collapse, expand,
//! array resize, user brackets) nest their primitives inside a
//! [`Action::Composite`]; undoing a composite applies the inverse of its
//! children in reverse order. Graph switches are recorded too, so replay
//! always addresses the graph a primitive was recorded against.

use crate::graph::GraphFrame;
use crate::node::{Node, Vec2};
use crate::pin::{InjectionInfo, Pin};

/// One recorded, invertible mutation.
#[derive(Debug, Clone)]
pub enum Action {
    /// A titled sequence of child actions, applied in order and undone in
    /// reverse.
    Composite {
        /// Title shown in undo history.
        title: String,
        /// Child actions in application order.
        actions: Vec<Action>,
    },
    /// A node was added; carries the full node for re-adding.
    AddNode {
        /// The added node.
        node: Box<Node>,
    },
    /// A node was removed; carries the full node for restoring.
    RemoveNode {
        /// The removed node.
        node: Box<Node>,
    },
    /// A node was renamed.
    RenameNode {
        /// Previous name.
        old: String,
        /// New name.
        new: String,
    },
    /// A node's selection flag changed.
    Select {
        /// Node name.
        node: String,
        /// New selection state.
        selected: bool,
    },
    /// A node moved.
    SetPosition {
        /// Node name.
        node: String,
        /// Previous position.
        old: Vec2,
        /// New position.
        new: Vec2,
    },
    /// A node was resized.
    SetSize {
        /// Node name.
        node: String,
        /// Previous size.
        old: Vec2,
        /// New size.
        new: Vec2,
    },
    /// A comment node's text changed.
    SetCommentText {
        /// Node name.
        node: String,
        /// Previous text.
        old: String,
        /// New text.
        new: String,
    },
    /// A reroute node's display mode changed.
    SetRerouteCompactness {
        /// Node name.
        node: String,
        /// Previous full-node flag.
        old: bool,
        /// New full-node flag.
        new: bool,
    },
    /// A pin's default value changed.
    SetPinDefault {
        /// Pin path.
        pin: String,
        /// Previous default.
        old: String,
        /// New default.
        new: String,
    },
    /// A pin's expansion flag changed.
    SetPinExpansion {
        /// Pin path.
        pin: String,
        /// Previous flag.
        old: bool,
        /// New flag.
        new: bool,
    },
    /// A pin's watch flag changed.
    SetPinWatched {
        /// Pin path.
        pin: String,
        /// Previous flag.
        old: bool,
        /// New flag.
        new: bool,
    },
    /// A pin was bound to or unbound from a variable.
    BindPin {
        /// Pin path.
        pin: String,
        /// Previous binding.
        old: Option<String>,
        /// New binding.
        new: Option<String>,
    },
    /// A link was added.
    AddLink {
        /// Source pin path.
        source: String,
        /// Target pin path.
        target: String,
    },
    /// A link was broken.
    BreakLink {
        /// Source pin path.
        source: String,
        /// Target pin path.
        target: String,
    },
    /// An array element pin was inserted.
    InsertArrayElement {
        /// Array pin path.
        array: String,
        /// Insertion index.
        index: usize,
        /// The inserted element subtree.
        element: Box<Pin>,
    },
    /// An array element pin was removed.
    RemoveArrayElement {
        /// Array pin path.
        array: String,
        /// Removal index.
        index: usize,
        /// The removed element subtree.
        element: Box<Pin>,
    },
    /// A pin changed type in place (prototype resolution), keeping its
    /// links.
    ReplacePin {
        /// Pin path.
        pin: String,
        /// Pin subtree before the change.
        old: Box<Pin>,
        /// Pin subtree after the change.
        new: Box<Pin>,
    },
    /// A node was swapped for another with the same name and compatible
    /// pins (prototype resolved to a concrete operation), keeping its links.
    ReplaceNode {
        /// Node before the swap.
        old: Box<Node>,
        /// Node after the swap.
        new: Box<Node>,
    },
    /// An exposed pin was added to a collapse node (and mirrored onto its
    /// entry/return nodes and references).
    AddExposedPin {
        /// Collapse node name.
        node: String,
        /// The exposed pin.
        pin: Box<Pin>,
    },
    /// An exposed pin was removed from a collapse node.
    RemoveExposedPin {
        /// Collapse node name.
        node: String,
        /// Index the pin held in the node's pin list.
        index: usize,
        /// The removed pin subtree.
        pin: Box<Pin>,
    },
    /// An exposed pin was renamed.
    RenameExposedPin {
        /// Collapse node name.
        node: String,
        /// Previous pin name.
        old: String,
        /// New pin name.
        new: String,
    },
    /// A node was spliced onto a pin.
    AddInjection {
        /// Host pin path.
        pin: String,
        /// The injection.
        injection: Box<InjectionInfo>,
    },
    /// A spliced node was taken off a pin.
    RemoveInjection {
        /// Host pin path.
        pin: String,
        /// Index in the pin's injection list.
        index: usize,
        /// The removed injection.
        injection: Box<InjectionInfo>,
    },
    /// Every variable node and binding under one name moved to another.
    RenameVariable {
        /// Previous variable name.
        old: String,
        /// New variable name.
        new: String,
    },
    /// Every parameter node under one name moved to another.
    RenameParameter {
        /// Previous parameter name.
        old: String,
        /// New parameter name.
        new: String,
    },
    /// The controller descended into a contained graph.
    PushGraph {
        /// The frame pushed.
        frame: GraphFrame,
    },
    /// The controller ascended out of a contained graph.
    PopGraph {
        /// The frame popped.
        frame: GraphFrame,
    },
}

impl Action {
    /// Tries to merge `newer` into `self` for continuous gestures (drags,
    /// slider edits). Returns `false` when the actions do not target the
    /// same property of the same subject.
    pub fn merge(&mut self, newer: &Self) -> bool {
        match (self, newer) {
            (
                Self::SetPosition { node, new, .. },
                Self::SetPosition {
                    node: other,
                    new: newest,
                    ..
                },
            ) if node == other => {
                *new = *newest;
                true
            }
            (
                Self::SetSize { node, new, .. },
                Self::SetSize {
                    node: other,
                    new: newest,
                    ..
                },
            ) if node == other => {
                *new = *newest;
                true
            }
            (
                Self::SetPinDefault { pin, new, .. },
                Self::SetPinDefault {
                    pin: other,
                    new: newest,
                    ..
                },
            ) if pin == other => {
                newest.clone_into(new);
                true
            }
            _ => false,
        }
    }
}

/// Undo and redo stacks with support for nested composite brackets.
#[derive(Debug, Default)]
pub struct ActionStack {
    undo: Vec<Action>,
    redo: Vec<Action>,
    open: Vec<(String, Vec<Action>)>,
    applying: bool,
}

impl ActionStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an undo or redo is currently being applied. Recording is
    /// suppressed while this holds.
    #[must_use]
    pub fn is_applying(&self) -> bool {
        self.applying
    }

    pub(crate) fn set_applying(&mut self, applying: bool) {
        self.applying = applying;
    }

    /// Number of nested composites currently open.
    #[must_use]
    pub fn open_depth(&self) -> usize {
        self.open.len()
    }

    /// Opens a composite; subsequent records nest under it.
    pub fn begin(&mut self, title: &str) {
        if self.applying {
            return;
        }
        self.open.push((title.to_owned(), Vec::new()));
    }

    /// Records one action into the innermost open composite, or onto the
    /// undo stack. Recording a new action discards the redo stack.
    pub fn record(&mut self, action: Action) {
        if self.applying {
            return;
        }
        match self.open.last_mut() {
            Some((_, actions)) => actions.push(action),
            None => {
                self.redo.clear();
                self.undo.push(action);
            }
        }
    }

    /// Like [`record`](Self::record), but first tries to merge into the
    /// previous action.
    pub fn record_merged(&mut self, action: Action) {
        if self.applying {
            return;
        }
        let slot = match self.open.last_mut() {
            Some((_, actions)) => actions.last_mut(),
            None => self.undo.last_mut(),
        };
        if let Some(previous) = slot {
            if previous.merge(&action) {
                return;
            }
        }
        self.record(action);
    }

    /// Closes the innermost composite. An empty composite is discarded; a
    /// composite with exactly one child collapses to that child.
    pub fn end(&mut self) {
        if self.applying {
            return;
        }
        let Some((title, mut actions)) = self.open.pop() else {
            return;
        };
        match actions.len() {
            0 => {}
            1 => {
                if let Some(only) = actions.pop() {
                    self.record(only);
                }
            }
            _ => self.record(Action::Composite { title, actions }),
        }
    }

    /// Abandons the innermost composite, returning its recorded actions so
    /// the caller can apply their inverses.
    pub fn cancel(&mut self) -> Option<Vec<Action>> {
        self.open.pop().map(|(_, actions)| actions)
    }

    /// Whether an undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty() && self.open.is_empty()
    }

    /// Whether a redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty() && self.open.is_empty()
    }

    pub(crate) fn pop_undo(&mut self) -> Option<Action> {
        if self.open.is_empty() {
            self.undo.pop()
        } else {
            None
        }
    }

    pub(crate) fn pop_redo(&mut self) -> Option<Action> {
        if self.open.is_empty() {
            self.redo.pop()
        } else {
            None
        }
    }

    pub(crate) fn push_undone(&mut self, action: Action) {
        self.redo.push(action);
    }

    pub(crate) fn push_redone(&mut self, action: Action) {
        self.undo.push(action);
    }
}
