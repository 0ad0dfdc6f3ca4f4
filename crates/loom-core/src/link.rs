// SPDX-License-Identifier: Apache-2.0
//! Links between pins.

use serde::{Deserialize, Serialize};

/// A directed link between two pin paths of the same graph.
///
/// Paths are stored relative to the owning graph (`Node.Pin.Sub`); renaming
/// a node or re-indexing an array element rewrites them in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Path of the output pin the value flows from.
    pub source: String,
    /// Path of the input pin the value flows to.
    pub target: String,
}

impl Link {
    /// Creates a link record.
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// `"Source -> Target"`, the notice subject and display form.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} -> {}", self.source, self.target)
    }
}
