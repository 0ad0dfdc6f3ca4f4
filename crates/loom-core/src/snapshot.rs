// SPDX-License-Identifier: Apache-2.0
//! Portable text form.
//!
//! A clip is a set of nodes plus the links among them, serialized as JSON.
//! The same shape backs copy/paste between graphs and the collapse/expand
//! transfer of nodes into and out of contained graphs. Injected nodes travel
//! inside their host pin, so a clip is always self-contained.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::link::Link;
use crate::node::Node;

/// A set of nodes and the links among them, in portable text form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphClip {
    /// Captured nodes, in capture order.
    pub nodes: Vec<Node>,
    /// Links whose both endpoints are on captured nodes.
    pub links: Vec<Link>,
}

impl GraphClip {
    /// Serializes the clip to text.
    pub fn to_text(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self)
            .map_err(|error| GraphError::MalformedText(error.to_string()))
    }

    /// Parses a clip from text.
    pub fn from_text(text: &str) -> Result<Self, GraphError> {
        serde_json::from_str(text).map_err(|error| GraphError::MalformedText(error.to_string()))
    }
}
