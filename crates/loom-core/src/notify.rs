// SPDX-License-Identifier: Apache-2.0
//! Change notifications.
//!
//! Every observable mutation emits exactly one notice per semantic change.
//! Subjects are path strings relative to the graph the controller had
//! current when the change happened: node names, `Node.Pin.Sub` pin paths,
//! or `Source -> Target` for links.

/// Kind of a graph change notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The controller switched to a different current graph, or asked
    /// observers to rebuild everything from scratch.
    GraphChanged,
    /// A node was added; subject is the node name.
    NodeAdded,
    /// A node was removed; subject is the node name.
    NodeRemoved,
    /// A node was renamed; subject is `Old -> New`.
    NodeRenamed,
    /// A node was selected; subject is the node name.
    NodeSelected,
    /// A node was deselected; subject is the node name.
    NodeDeselected,
    /// A node moved; subject is the node name.
    NodePositionChanged,
    /// A node was resized; subject is the node name.
    NodeSizeChanged,
    /// A comment node's text changed; subject is the node name.
    CommentTextChanged,
    /// A reroute node toggled between full and compact display; subject is
    /// the node name. Suppressed while undo or redo is being applied.
    RerouteCompactnessChanged,
    /// A pin appeared (array element, exposed pin); subject is the pin path.
    PinAdded,
    /// A pin disappeared; subject is the pin path.
    PinRemoved,
    /// A pin was renamed; subject is `Old -> New` of pin paths.
    PinRenamed,
    /// A pin's type changed (prototype resolution); subject is the pin path.
    PinTypeChanged,
    /// A pin was expanded or collapsed in the UI; subject is the pin path.
    PinExpansionChanged,
    /// A pin's watch flag toggled; subject is the pin path.
    PinWatchedChanged,
    /// A pin's default value changed; subject is the pin path.
    PinDefaultValueChanged,
    /// An array pin's element count changed; subject is the array pin path.
    PinArraySizeChanged,
    /// A pin was bound to or unbound from a variable; subject is the pin
    /// path.
    PinBoundVariableChanged,
    /// A node was swapped in place for another with the same name, keeping
    /// its links (prototype resolution); subject is the node name.
    NodeReplaced,
    /// A node was spliced onto a pin; subject is the pin path.
    InjectionAdded,
    /// A spliced node was taken off a pin; subject is the pin path.
    InjectionRemoved,
    /// A link was made; subject is `Source -> Target`.
    LinkAdded,
    /// A link was broken; subject is `Source -> Target`.
    LinkRemoved,
    /// A compound operation started; subject is its title.
    BracketOpened,
    /// A compound operation finished; subject is its title.
    BracketClosed,
    /// A compound operation was cancelled and rolled back; subject is its
    /// title.
    BracketCancelled,
    /// A function definition was added to the library; subject is the
    /// function name.
    FunctionAdded,
    /// A function definition was removed from the library; subject is the
    /// function name.
    FunctionRemoved,
    /// A function definition changed shape and its references were
    /// refreshed; subject is the function name.
    FunctionReferencesRefreshed,
    /// The text of a variable node's variable changed; subject is
    /// `Old -> New`.
    VariableRenamed,
    /// A parameter was renamed across the graph; subject is `Old -> New`.
    ParameterRenamed,
}

/// One change notice delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNotice {
    /// What changed.
    pub kind: NoticeKind,
    /// Path of the changed element, relative to the current graph.
    pub subject: String,
}

/// Observer callback invoked for every notice.
pub type NoticeObserver = Box<dyn FnMut(&GraphNotice)>;
