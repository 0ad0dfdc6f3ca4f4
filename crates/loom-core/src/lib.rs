// SPDX-License-Identifier: Apache-2.0
//! loom-core: a transactional node-graph editing model.
//!
//! The model is a strict ownership tree: a [`Controller`] owns a top-level
//! [`Graph`] and a function library graph, graphs own [`Node`]s, nodes own
//! [`Pin`] trees, and every reference between elements is a dot-separated
//! path string. All mutation goes through the controller, which validates
//! against a [`TypeCatalog`](loom_schema::TypeCatalog), records invertible
//! actions for undo/redo, and notifies observers of every change.

mod action;
mod controller;
mod error;
mod graph;
mod link;
mod node;
mod notify;
mod pin;
mod pintree;
mod report;
mod snapshot;

pub use action::Action;
pub use controller::{Controller, ENTRY_NODE, RETURN_NODE};
pub use error::GraphError;
pub use graph::{Graph, GraphFrame, GraphKind, GraphTarget, NodeLocation};
pub use link::Link;
pub use node::{Node, NodeKind, Vec2};
pub use notify::{GraphNotice, NoticeKind, NoticeObserver};
pub use pin::{
    join_path, last_segment, parent_path, path_is_or_descends, split_node_and_pin, InjectionInfo,
    Pin,
};
pub use pintree::{build_pin, build_pins_for_operation, PinRedirectMap};
pub use report::{NullReporter, Reporter, Severity, TracingReporter};
pub use snapshot::GraphClip;
