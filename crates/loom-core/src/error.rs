// SPDX-License-Identifier: Apache-2.0
//! Error taxonomy of the graph controller.
//!
//! Usage errors leave the graph untouched. Structural conflicts abort
//! mid-operation and are unwound through the action stack's cancel path, so
//! the caller observes an unchanged graph either way.

use thiserror::Error;

/// Errors surfaced by the controller's mutation API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// No node with this name exists in the current graph.
    #[error("cannot find node '{0}'")]
    NodeNotFound(String),
    /// No pin exists at this path in the current graph.
    #[error("cannot find pin '{0}'")]
    PinNotFound(String),
    /// No link connects these two pins.
    ///
    /// The endpoint fields avoid the name `source`, which thiserror
    /// reserves for error chaining.
    #[error("cannot find link '{source_pin}' -> '{target_pin}'")]
    LinkNotFound {
        /// Source pin path.
        source_pin: String,
        /// Target pin path.
        target_pin: String,
    },
    /// The two pins cannot be linked.
    #[error("cannot link '{source_pin}' to '{target_pin}': {reason}")]
    CannotLink {
        /// Source pin path.
        source_pin: String,
        /// Target pin path.
        target_pin: String,
        /// Human-readable reason.
        reason: String,
    },
    /// The pin is not an array.
    #[error("pin '{0}' is not an array")]
    NotAnArray(String),
    /// The pin is not an element of an array.
    #[error("pin '{0}' is not an array element")]
    NotAnArrayElement(String),
    /// The operation is not allowed while a function library is the current
    /// graph.
    #[error("cannot {0} in a function library graph")]
    ForbiddenInLibrary(String),
    /// Event operations may only be placed in a top-level graph.
    #[error("event operation '{0}' is only allowed in a top-level graph")]
    EventOutsideTopLevel(String),
    /// The catalog knows no operation with this name.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
    /// The catalog knows no prototype with this notation.
    #[error("unknown prototype '{0}'")]
    UnknownPrototype(String),
    /// The catalog knows no aggregate with this type name.
    #[error("unknown aggregate type '{0}'")]
    UnknownType(String),
    /// Entry and return nodes of a function body cannot be removed.
    #[error("node '{0}' is protected and cannot be removed")]
    ProtectedNode(String),
    /// The mutation would violate a structural invariant; everything already
    /// applied has been rolled back.
    #[error("structural conflict: {0}")]
    StructuralConflict(String),
    /// The variable's type does not match the pin's type.
    #[error(
        "cannot bind pin '{pin}' ({pin_type}) to variable '{variable}' ({variable_type})"
    )]
    IncompatibleBinding {
        /// Pin path.
        pin: String,
        /// Pin type name.
        pin_type: String,
        /// Variable path.
        variable: String,
        /// Variable type name.
        variable_type: String,
    },
    /// The node is not of the kind the operation requires.
    #[error("node '{node}' is not a {expected} node")]
    WrongNodeKind {
        /// Node name.
        node: String,
        /// Expected kind, e.g. "collapse" or "function reference".
        expected: &'static str,
    },
    /// The portable text form could not be parsed.
    #[error("cannot parse portable text: {0}")]
    MalformedText(String),
    /// `close_undo_bracket`/`cancel_undo_bracket` without a matching open.
    #[error("no undo bracket is open")]
    BracketMismatch,
    /// The selection to collapse is empty after filtering.
    #[error("no nodes to collapse")]
    NothingToCollapse,
}
