// SPDX-License-Identifier: Apache-2.0
//! Type-name notation and pin directions.
//!
//! Types are addressed by plain names. Primitives are lower-case (`bool`,
//! `int`, `float`, `string`, `name`), aggregates are registered names
//! (`Vector`), and arrays append `[]` to their element type (`float[]`,
//! `Vector[]`). The empty string means "no type yet" and only appears on
//! unresolved prototype pins.

use serde::{Deserialize, Serialize};

/// The control-flow marker type. Pins of this type carry execution order
/// rather than a value; they are never unfolded and never carry defaults.
pub const EXECUTE_TYPE: &str = "execute";

/// Returns `true` when `type_name` denotes an array.
#[must_use]
pub fn is_array_type(type_name: &str) -> bool {
    type_name.ends_with("[]")
}

/// Returns the element type of an array type, or `None` for non-arrays.
#[must_use]
pub fn array_element_type(type_name: &str) -> Option<&str> {
    type_name.strip_suffix("[]")
}

/// Returns the array type with `element` as its element type.
#[must_use]
pub fn array_type_of(element: &str) -> String {
    format!("{element}[]")
}

/// Direction of a pin relative to its owning node.
///
/// `Io` pins act as both: they accept one incoming link and may fan out.
/// `Hidden` pins exist structurally but are never linked or shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    /// Consumes a value; at most one incoming link.
    Input,
    /// Produces a value; any number of outgoing links.
    Output,
    /// Mutable context flowing through the node (input and output at once).
    Io,
    /// Structural only; excluded from linking and display.
    Hidden,
    /// Display only; excluded from linking.
    Visible,
}

impl PinDirection {
    /// Whether a link may terminate at a pin of this direction.
    #[must_use]
    pub fn accepts_incoming(self) -> bool {
        matches!(self, Self::Input | Self::Io)
    }

    /// Whether a link may originate from a pin of this direction.
    #[must_use]
    pub fn provides_outgoing(self) -> bool {
        matches!(self, Self::Output | Self::Io)
    }
}
