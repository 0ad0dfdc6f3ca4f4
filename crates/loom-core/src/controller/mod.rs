// SPDX-License-Identifier: Apache-2.0
//! The graph controller.
//!
//! All mutations of the model go through the controller: it validates,
//! applies, records undo actions and emits notifications. The controller
//! owns the top-level graph and the function library, and keeps a stack of
//! graph frames addressing the graph mutations currently apply to.
//!
//! Every public operation takes a `setup_undo` flag mirroring how a host
//! editor scopes transactions: with the flag set, the operation records an
//! invertible [`Action`](crate::action::Action) (or a composite of them)
//! onto the undo stack.

mod collapse;
mod injection;
mod library;
mod links;
mod nodes;
mod pins;
mod resolve;
mod textio;

pub use library::{ENTRY_NODE, RETURN_NODE};

use std::rc::Rc;

use loom_schema::TypeCatalog;

use crate::action::{Action, ActionStack};
use crate::error::GraphError;
use crate::graph::{Graph, GraphFrame, GraphKind, GraphTarget, NodeLocation};
use crate::node::Node;
use crate::notify::{GraphNotice, NoticeKind, NoticeObserver};
use crate::pin::Pin;
use crate::report::{Reporter, Severity, TracingReporter};

/// Transactional editor for a node graph and its function library.
pub struct Controller {
    catalog: Rc<dyn TypeCatalog>,
    root: Graph,
    library: Graph,
    frames: Vec<GraphFrame>,
    stack: ActionStack,
    reporter: Box<dyn Reporter>,
    observers: Vec<NoticeObserver>,
    notifications_suspended: bool,
    compactness_suppressed: bool,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("frames", &self.frames)
            .field("nodes", &self.graph().node_names())
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates a controller over an empty top-level graph and an empty
    /// function library.
    #[must_use]
    pub fn new(catalog: Rc<dyn TypeCatalog>) -> Self {
        Self {
            catalog,
            root: Graph::new(GraphKind::Root),
            library: Graph::new(GraphKind::FunctionLibrary),
            frames: vec![GraphFrame::root_of(GraphTarget::Root)],
            stack: ActionStack::new(),
            reporter: Box::new(TracingReporter),
            observers: Vec::new(),
            notifications_suspended: false,
            compactness_suppressed: false,
        }
    }

    /// Replaces the diagnostic sink.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The catalog this controller validates against.
    #[must_use]
    pub fn catalog(&self) -> &dyn TypeCatalog {
        self.catalog.as_ref()
    }

    pub(crate) fn catalog_handle(&self) -> Rc<dyn TypeCatalog> {
        Rc::clone(&self.catalog)
    }

    // ----- graph frames ---------------------------------------------------

    /// The frame of the current graph.
    #[must_use]
    pub fn current_frame(&self) -> GraphFrame {
        self.frames
            .last()
            .cloned()
            .unwrap_or_else(|| GraphFrame::root_of(GraphTarget::Root))
    }

    /// The current graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        let frame = self.current_frame();
        Self::resolve_frame_in(&self.root, &self.library, &frame).unwrap_or(&self.root)
    }

    /// The top-level graph.
    #[must_use]
    pub fn root_graph(&self) -> &Graph {
        &self.root
    }

    /// The function library graph.
    #[must_use]
    pub fn library_graph(&self) -> &Graph {
        &self.library
    }

    /// Resolves a frame to its graph, if its collapse chain still exists.
    #[must_use]
    pub fn resolve_frame(&self, frame: &GraphFrame) -> Option<&Graph> {
        Self::resolve_frame_in(&self.root, &self.library, frame)
    }

    fn resolve_frame_in<'a>(
        root: &'a Graph,
        library: &'a Graph,
        frame: &GraphFrame,
    ) -> Option<&'a Graph> {
        let mut graph = match frame.target {
            GraphTarget::Root => root,
            GraphTarget::Library => library,
        };
        for node in &frame.path {
            graph = graph.find_node(node)?.contained_graph()?;
        }
        Some(graph)
    }

    pub(crate) fn graph_mut(&mut self) -> Result<&mut Graph, GraphError> {
        let frame = self.current_frame();
        self.frame_graph_mut(&frame)
    }

    pub(crate) fn frame_graph_mut(
        &mut self,
        frame: &GraphFrame,
    ) -> Result<&mut Graph, GraphError> {
        let mut graph = match frame.target {
            GraphTarget::Root => &mut self.root,
            GraphTarget::Library => &mut self.library,
        };
        for node in &frame.path {
            graph = graph
                .find_node_mut(node)
                .and_then(Node::contained_graph_mut)
                .ok_or_else(|| GraphError::NodeNotFound(node.clone()))?;
        }
        Ok(graph)
    }

    pub(crate) fn library_mut(&mut self) -> &mut Graph {
        &mut self.library
    }

    /// Makes a root graph current, clearing the frame stack.
    pub fn set_graph_target(&mut self, target: GraphTarget) {
        self.frames = vec![GraphFrame::root_of(target)];
        self.notify(NoticeKind::GraphChanged, "");
    }

    /// Descends into the contained graph of a collapse node of the current
    /// graph.
    pub fn push_graph(&mut self, node: &str, setup_undo: bool) -> Result<(), GraphError> {
        let found = self
            .graph()
            .find_node(node)
            .ok_or_else(|| GraphError::NodeNotFound(node.to_owned()))?;
        if found.contained_graph().is_none() {
            return Err(GraphError::WrongNodeKind {
                node: node.to_owned(),
                expected: "collapse",
            });
        }
        let frame = self.current_frame().child(node);
        self.record(setup_undo, Action::PushGraph {
            frame: frame.clone(),
        });
        self.frames.push(frame);
        self.notify(NoticeKind::GraphChanged, "");
        Ok(())
    }

    /// Ascends out of the current contained graph. A no-op at a root.
    pub fn pop_graph(&mut self, setup_undo: bool) -> Option<GraphFrame> {
        if self.frames.len() <= 1 {
            return None;
        }
        let frame = self.frames.pop()?;
        self.record(setup_undo, Action::PopGraph {
            frame: frame.clone(),
        });
        self.notify(NoticeKind::GraphChanged, "");
        Some(frame)
    }

    /// Runs `f` with `frame` temporarily current, bracketed by recorded
    /// graph switches so undo replays in the right graph.
    pub(crate) fn with_frame<R>(
        &mut self,
        frame: GraphFrame,
        setup_undo: bool,
        f: impl FnOnce(&mut Self) -> Result<R, GraphError>,
    ) -> Result<R, GraphError> {
        self.record(setup_undo, Action::PushGraph {
            frame: frame.clone(),
        });
        self.frames.push(frame.clone());
        let result = f(self);
        self.frames.pop();
        self.record(setup_undo, Action::PopGraph { frame });
        result
    }

    // ----- notifications --------------------------------------------------

    /// Registers a change observer.
    pub fn subscribe(&mut self, observer: NoticeObserver) {
        self.observers.push(observer);
    }

    /// Suspends or resumes delivery of notices. Changes made while
    /// suspended are not replayed; call
    /// [`resend_all_notifications`](Self::resend_all_notifications) to let
    /// observers rebuild.
    pub fn suspend_notifications(&mut self, suspended: bool) {
        self.notifications_suspended = suspended;
    }

    /// Replays the full state of the current graph as notices so an
    /// observer can rebuild its mirror from scratch.
    pub fn resend_all_notifications(&mut self) {
        self.notify(NoticeKind::GraphChanged, "");
        let nodes = self.graph().node_names();
        for node in nodes {
            self.notify(NoticeKind::NodeAdded, node);
        }
        let links: Vec<String> = self.graph().links().iter().map(crate::link::Link::display).collect();
        for link in links {
            self.notify(NoticeKind::LinkAdded, link);
        }
        let selection = self.graph().selection().to_vec();
        for node in selection {
            self.notify(NoticeKind::NodeSelected, node);
        }
    }

    pub(crate) fn notify(&mut self, kind: NoticeKind, subject: impl Into<String>) {
        if self.notifications_suspended {
            return;
        }
        if kind == NoticeKind::RerouteCompactnessChanged && self.compactness_suppressed {
            return;
        }
        let notice = GraphNotice {
            kind,
            subject: subject.into(),
        };
        for observer in &mut self.observers {
            observer(&notice);
        }
    }

    pub(crate) fn report(&mut self, severity: Severity, message: impl AsRef<str>) {
        self.reporter.report(severity, message.as_ref());
    }

    // ----- undo / redo ----------------------------------------------------

    /// Whether an undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    /// Whether a redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    /// Undoes the most recent action. Returns `false` when the undo stack
    /// is empty.
    pub fn undo(&mut self) -> Result<bool, GraphError> {
        let Some(action) = self.stack.pop_undo() else {
            return Ok(false);
        };
        let result = self.replay(&action, true);
        self.stack.push_undone(action);
        result.map(|()| true)
    }

    /// Redoes the most recently undone action. Returns `false` when the
    /// redo stack is empty.
    pub fn redo(&mut self) -> Result<bool, GraphError> {
        let Some(action) = self.stack.pop_redo() else {
            return Ok(false);
        };
        let result = self.replay(&action, false);
        self.stack.push_redone(action);
        result.map(|()| true)
    }

    fn replay(&mut self, action: &Action, undo: bool) -> Result<(), GraphError> {
        self.stack.set_applying(true);
        self.compactness_suppressed = true;
        let result = self.apply_action(action, undo);
        self.compactness_suppressed = false;
        self.stack.set_applying(false);
        result
    }

    /// Opens a user-level undo bracket; everything recorded until the
    /// matching close undoes as one step.
    pub fn open_undo_bracket(&mut self, title: &str) {
        self.stack.begin(title);
        self.notify(NoticeKind::BracketOpened, title);
    }

    /// Closes the innermost undo bracket.
    pub fn close_undo_bracket(&mut self) -> Result<(), GraphError> {
        if self.stack.open_depth() == 0 {
            return Err(GraphError::BracketMismatch);
        }
        self.stack.end();
        self.notify(NoticeKind::BracketClosed, "");
        Ok(())
    }

    /// Cancels the innermost undo bracket, rolling back everything recorded
    /// inside it.
    pub fn cancel_undo_bracket(&mut self) -> Result<(), GraphError> {
        let Some(actions) = self.stack.cancel() else {
            return Err(GraphError::BracketMismatch);
        };
        self.stack.set_applying(true);
        self.compactness_suppressed = true;
        let mut result = Ok(());
        for action in actions.iter().rev() {
            result = self.apply_action(action, true);
            if result.is_err() {
                break;
            }
        }
        self.compactness_suppressed = false;
        self.stack.set_applying(false);
        self.notify(NoticeKind::BracketCancelled, "");
        result
    }

    pub(crate) fn record(&mut self, setup_undo: bool, action: Action) {
        if setup_undo {
            self.stack.record(action);
        }
    }

    pub(crate) fn record_merged(&mut self, setup_undo: bool, action: Action) {
        if setup_undo {
            self.stack.record_merged(action);
        }
    }

    pub(crate) fn begin_action(&mut self, setup_undo: bool, title: &str) {
        if setup_undo {
            self.stack.begin(title);
        }
    }

    pub(crate) fn end_action(&mut self, setup_undo: bool) {
        if setup_undo {
            self.stack.end();
        }
    }

    /// Rolls back a half-applied operation: everything recorded since the
    /// matching `begin_action` is inverse-applied and discarded.
    pub(crate) fn cancel_action(&mut self, setup_undo: bool) {
        if !setup_undo {
            return;
        }
        let Some(actions) = self.stack.cancel() else {
            return;
        };
        self.stack.set_applying(true);
        self.compactness_suppressed = true;
        for action in actions.iter().rev() {
            if self.apply_action(action, true).is_err() {
                break;
            }
        }
        self.compactness_suppressed = false;
        self.stack.set_applying(false);
    }

    /// Applies `action` forward, or its inverse with `undo` set.
    #[allow(clippy::too_many_lines)]
    fn apply_action(&mut self, action: &Action, undo: bool) -> Result<(), GraphError> {
        match action {
            Action::Composite { actions, .. } => {
                if undo {
                    for child in actions.iter().rev() {
                        self.apply_action(child, true)?;
                    }
                } else {
                    for child in actions {
                        self.apply_action(child, false)?;
                    }
                }
                Ok(())
            }
            Action::AddNode { node } => {
                if undo {
                    self.uninstall_node(node.name()).map(|_| ())
                } else {
                    self.install_node((**node).clone())
                }
            }
            Action::RemoveNode { node } => {
                if undo {
                    self.install_node((**node).clone())
                } else {
                    self.uninstall_node(node.name()).map(|_| ())
                }
            }
            Action::RenameNode { old, new } => {
                if undo {
                    self.apply_rename(new, old)
                } else {
                    self.apply_rename(old, new)
                }
            }
            Action::Select { node, selected } => {
                self.apply_select(node, *selected != undo);
                Ok(())
            }
            Action::SetPosition { node, old, new } => {
                self.apply_position(node, if undo { *old } else { *new })
            }
            Action::SetSize { node, old, new } => {
                self.apply_size(node, if undo { *old } else { *new })
            }
            Action::SetCommentText { node, old, new } => {
                self.apply_comment_text(node, if undo { old } else { new })
            }
            Action::SetRerouteCompactness { node, old, new } => {
                self.apply_reroute_compactness(node, if undo { *old } else { *new })
            }
            Action::SetPinDefault { pin, old, new } => {
                self.apply_pin_default(pin, if undo { old } else { new })
            }
            Action::SetPinExpansion { pin, old, new } => {
                self.apply_pin_expansion(pin, if undo { *old } else { *new })
            }
            Action::SetPinWatched { pin, old, new } => {
                self.apply_pin_watched(pin, if undo { *old } else { *new })
            }
            Action::BindPin { pin, old, new } => {
                self.apply_bind(pin, if undo { old.clone() } else { new.clone() })
            }
            Action::AddLink { source, target } => {
                if undo {
                    self.apply_break_link(source, target)
                } else {
                    self.apply_add_link(source, target)
                }
            }
            Action::BreakLink { source, target } => {
                if undo {
                    self.apply_add_link(source, target)
                } else {
                    self.apply_break_link(source, target)
                }
            }
            Action::InsertArrayElement {
                array,
                index,
                element,
            } => {
                if undo {
                    self.apply_remove_element(array, *index).map(|_| ())
                } else {
                    self.apply_insert_element(array, *index, (**element).clone())
                }
            }
            Action::RemoveArrayElement {
                array,
                index,
                element,
            } => {
                if undo {
                    self.apply_insert_element(array, *index, (**element).clone())
                } else {
                    self.apply_remove_element(array, *index).map(|_| ())
                }
            }
            Action::ReplacePin { pin, old, new } => {
                let replacement = if undo { old } else { new };
                self.apply_replace_pin(pin, (**replacement).clone())
            }
            Action::ReplaceNode { old, new } => {
                let replacement = if undo { old } else { new };
                self.apply_replace_node((**replacement).clone())
            }
            Action::AddExposedPin { node, pin } => {
                if undo {
                    self.apply_remove_exposed_pin(node, pin.name()).map(|_| ())
                } else {
                    self.apply_add_exposed_pin(node, (**pin).clone(), None)
                }
            }
            Action::RemoveExposedPin { node, index, pin } => {
                if undo {
                    self.apply_add_exposed_pin(node, (**pin).clone(), Some(*index))
                } else {
                    self.apply_remove_exposed_pin(node, pin.name()).map(|_| ())
                }
            }
            Action::RenameExposedPin { node, old, new } => {
                if undo {
                    self.apply_rename_exposed_pin(node, new, old)
                } else {
                    self.apply_rename_exposed_pin(node, old, new)
                }
            }
            Action::AddInjection { pin, injection } => {
                if undo {
                    self.apply_remove_injection(pin).map(|_| ())
                } else {
                    self.apply_add_injection(pin, (**injection).clone())
                }
            }
            Action::RemoveInjection { pin, injection, .. } => {
                if undo {
                    self.apply_add_injection(pin, (**injection).clone())
                } else {
                    self.apply_remove_injection(pin).map(|_| ())
                }
            }
            Action::RenameVariable { old, new } => {
                if undo {
                    self.apply_rename_variable(new, old).map(|_| ())
                } else {
                    self.apply_rename_variable(old, new).map(|_| ())
                }
            }
            Action::RenameParameter { old, new } => {
                if undo {
                    self.apply_rename_parameter(new, old).map(|_| ())
                } else {
                    self.apply_rename_parameter(old, new).map(|_| ())
                }
            }
            Action::PushGraph { frame } => {
                if undo {
                    self.frames.pop();
                } else {
                    self.frames.push(frame.clone());
                }
                self.notify(NoticeKind::GraphChanged, "");
                Ok(())
            }
            Action::PopGraph { frame } => {
                if undo {
                    self.frames.push(frame.clone());
                } else {
                    self.frames.pop();
                }
                self.notify(NoticeKind::GraphChanged, "");
                Ok(())
            }
        }
    }

    // ----- shared helpers -------------------------------------------------

    /// Sanitizes a desired name and makes it unique in the current graph by
    /// counting up a `_N` suffix.
    pub(crate) fn unique_node_name(&self, desired: &str) -> String {
        let base = sanitize_name(desired);
        unique_in(&base, |candidate| self.graph().contains_node(candidate))
    }

    pub(crate) fn require_node(&self, name: &str) -> Result<&Node, GraphError> {
        self.graph()
            .find_node(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_owned()))
    }

    pub(crate) fn require_pin(&self, path: &str) -> Result<&Pin, GraphError> {
        self.graph()
            .find_pin(path)
            .ok_or_else(|| GraphError::PinNotFound(path.to_owned()))
    }

    pub(crate) fn forbid_library(&self, what: &str) -> Result<(), GraphError> {
        if self.graph().is_library() {
            return Err(GraphError::ForbiddenInLibrary(what.to_owned()));
        }
        Ok(())
    }

    pub(crate) fn current_location(&self, node: &str) -> NodeLocation {
        NodeLocation {
            frame: self.current_frame(),
            node: node.to_owned(),
        }
    }

    // ----- housekeeping ---------------------------------------------------

    /// Removes unit nodes of the current graph whose operation no longer
    /// exists in the catalog. Not undoable; reported per removed node.
    pub fn remove_stale_nodes(&mut self) -> usize {
        let stale: Vec<String> = self
            .graph()
            .nodes()
            .iter()
            .filter(|node| match node.kind() {
                crate::node::NodeKind::Unit { operation } => {
                    self.catalog.find_operation(operation).is_none()
                }
                _ => false,
            })
            .map(|node| node.name().to_owned())
            .collect();
        for name in &stale {
            self.report(
                Severity::Warning,
                format!("removing stale node '{name}': operation vanished from the catalog"),
            );
            if self.remove_node(name, false).is_err() {
                continue;
            }
        }
        stale.len()
    }
}

/// Replaces characters outside `[A-Za-z0-9_]` and falls back to `"Node"`
/// for empty names.
pub(crate) fn sanitize_name(desired: &str) -> String {
    let cleaned: String = desired
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "Node".to_owned()
    } else {
        cleaned
    }
}

/// Counts up a `_N` suffix until `taken` rejects the candidate.
pub(crate) fn unique_in(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_owned();
    }
    let stem = match base.rsplit_once('_') {
        Some((stem, digits)) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            stem
        }
        _ => base,
    };
    let mut counter = 1_usize;
    loop {
        let candidate = format!("{stem}_{counter}");
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
