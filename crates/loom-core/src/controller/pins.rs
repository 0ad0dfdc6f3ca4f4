// SPDX-License-Identifier: Apache-2.0
//! Pin-level operations: defaults, expansion, watches, bindings and array
//! element mutation.
//!
//! Array elements are named by index; inserting or removing an element
//! renumbers the later siblings and rewrites the affected link paths, so an
//! element's links follow it as it shifts.

use loom_schema::{array_element_type, split_default_value};

use crate::action::Action;
use crate::error::GraphError;
use crate::notify::NoticeKind;
use crate::pin::{last_segment, parent_path, split_node_and_pin, Pin};
use crate::pintree::{apply_default, build_pin};

use super::Controller;

impl Controller {
    /// The current default value text of a pin.
    pub fn get_pin_default(&self, path: &str) -> Result<String, GraphError> {
        Ok(self.require_pin(path)?.default_value())
    }

    /// Sets a pin's default value. Composite pins distribute the value over
    /// their sub-pins; array pins whose element count changes are rebuilt,
    /// breaking links on vanished elements.
    pub fn set_pin_default(
        &mut self,
        path: &str,
        value: &str,
        setup_undo: bool,
        merge_undo: bool,
    ) -> Result<(), GraphError> {
        let pin = self.require_pin(path)?;
        if pin.is_execute() {
            return Err(GraphError::StructuralConflict(format!(
                "execute pin '{path}' carries no value"
            )));
        }
        if pin.ty().is_empty() {
            return Err(GraphError::StructuralConflict(format!(
                "unresolved pin '{path}' carries no value"
            )));
        }
        let old = pin.default_value();
        let rebuilds = pin.is_array()
            && pin.direction().accepts_incoming()
            && split_default_value(value).len() != pin.sub_pins().len();
        if !rebuilds {
            // No bracket here: a bare record lets consecutive edits of the
            // same pin merge into one undo step.
            self.apply_pin_default(path, value)?;
            let new = self.require_pin(path)?.default_value();
            if new != old {
                let action = Action::SetPinDefault {
                    pin: path.to_owned(),
                    old,
                    new,
                };
                if merge_undo {
                    self.record_merged(setup_undo, action);
                } else {
                    self.record(setup_undo, action);
                }
            }
            return Ok(());
        }
        self.begin_action(setup_undo, "Set Pin Default");
        let result = (|| {
            self.break_all_links(path, true, setup_undo)?;
            self.break_all_links(path, false, setup_undo)?;
            self.apply_pin_default(path, value)?;
            let new = self.require_pin(path)?.default_value();
            if new != old {
                self.record(setup_undo, Action::SetPinDefault {
                    pin: path.to_owned(),
                    old,
                    new,
                });
            }
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.end_action(setup_undo);
                Ok(())
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// Resets a pin to the canonical zero value of its type.
    pub fn reset_pin_default(&mut self, path: &str, setup_undo: bool) -> Result<(), GraphError> {
        let ty = self.require_pin(path)?.ty().to_owned();
        let zero = self.catalog().canonical_default(&ty, "");
        self.set_pin_default(path, &zero, setup_undo, false)
    }

    /// Expands or collapses a pin in the UI. A no-op for pins without
    /// sub-pins.
    pub fn set_pin_expansion(
        &mut self,
        path: &str,
        expanded: bool,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let pin = self.require_pin(path)?;
        if pin.sub_pins().is_empty() || pin.is_expanded() == expanded {
            return Ok(());
        }
        self.record(setup_undo, Action::SetPinExpansion {
            pin: path.to_owned(),
            old: pin.is_expanded(),
            new: expanded,
        });
        self.apply_pin_expansion(path, expanded)
    }

    /// Marks or unmarks a pin's value to be watched during execution.
    pub fn set_pin_watched(
        &mut self,
        path: &str,
        watched: bool,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let pin = self.require_pin(path)?;
        if pin.is_watched() == watched {
            return Ok(());
        }
        self.record(setup_undo, Action::SetPinWatched {
            pin: path.to_owned(),
            old: pin.is_watched(),
            new: watched,
        });
        self.apply_pin_watched(path, watched)
    }

    /// Binds an input pin directly to a variable (or a sub-path into one),
    /// breaking any incoming links first. Binding and links are exclusive.
    pub fn bind_pin_to_variable(
        &mut self,
        path: &str,
        variable: &str,
        variable_type: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let pin = self.require_pin(path)?;
        if !pin.direction().accepts_incoming() || pin.is_execute() {
            return Err(GraphError::StructuralConflict(format!(
                "pin '{path}' cannot take a binding"
            )));
        }
        if !self.catalog().is_compatible(pin.ty(), variable_type) {
            return Err(GraphError::IncompatibleBinding {
                pin: path.to_owned(),
                pin_type: pin.ty().to_owned(),
                variable: variable.to_owned(),
                variable_type: variable_type.to_owned(),
            });
        }
        let old = pin.bound_variable().map(str::to_owned);
        if old.as_deref() == Some(variable) {
            return Ok(());
        }
        self.begin_action(setup_undo, "Bind Pin");
        let result = (|| {
            self.break_all_links(path, true, setup_undo)?;
            self.record(setup_undo, Action::BindPin {
                pin: path.to_owned(),
                old: old.clone(),
                new: Some(variable.to_owned()),
            });
            self.apply_bind(path, Some(variable.to_owned()))
        })();
        match result {
            Ok(()) => {
                self.end_action(setup_undo);
                Ok(())
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// Removes a pin's variable binding.
    pub fn unbind_pin_from_variable(
        &mut self,
        path: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let pin = self.require_pin(path)?;
        let Some(old) = pin.bound_variable().map(str::to_owned) else {
            return Ok(());
        };
        self.record(setup_undo, Action::BindPin {
            pin: path.to_owned(),
            old: Some(old),
            new: None,
        });
        self.apply_bind(path, None)
    }

    /// Inserts an element into an array pin. `index` of `None` appends.
    /// Returns the path of the new element.
    pub fn insert_array_pin(
        &mut self,
        array_path: &str,
        index: Option<usize>,
        default: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        let pin = self.require_pin(array_path)?;
        let element_ty = array_element_type(pin.ty())
            .ok_or_else(|| GraphError::NotAnArray(array_path.to_owned()))?
            .to_owned();
        let len = pin.sub_pins().len();
        let index = index.unwrap_or(len).min(len);
        let direction = pin.direction();
        let catalog = self.catalog_handle();
        let element = build_pin(
            catalog.as_ref(),
            &index.to_string(),
            direction,
            &element_ty,
            default,
        );
        self.record(setup_undo, Action::InsertArrayElement {
            array: array_path.to_owned(),
            index,
            element: Box::new(element.clone()),
        });
        self.apply_insert_element(array_path, index, element)?;
        Ok(format!("{array_path}.{index}"))
    }

    /// Appends an element to an array pin.
    pub fn add_array_pin(
        &mut self,
        array_path: &str,
        default: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        self.insert_array_pin(array_path, None, default, setup_undo)
    }

    /// Inserts a copy of an array element right after it.
    pub fn duplicate_array_pin(
        &mut self,
        element_path: &str,
        setup_undo: bool,
    ) -> Result<String, GraphError> {
        let (array_path, index) = self.array_element_of(element_path)?;
        let default = self.require_pin(element_path)?.default_value();
        self.insert_array_pin(&array_path, Some(index + 1), &default, setup_undo)
    }

    /// Removes an array element, breaking its links and renumbering later
    /// elements down.
    pub fn remove_array_pin(
        &mut self,
        element_path: &str,
        setup_undo: bool,
    ) -> Result<(), GraphError> {
        let (array_path, index) = self.array_element_of(element_path)?;
        self.begin_action(setup_undo, "Remove Array Pin");
        let result = (|| {
            self.break_all_links(element_path, true, setup_undo)?;
            self.break_all_links(element_path, false, setup_undo)?;
            let element = self.require_pin(element_path)?.clone();
            self.record(setup_undo, Action::RemoveArrayElement {
                array: array_path.clone(),
                index,
                element: Box::new(element),
            });
            self.apply_remove_element(&array_path, index).map(|_| ())
        })();
        match result {
            Ok(()) => {
                self.end_action(setup_undo);
                Ok(())
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    /// Removes all elements of an array pin.
    pub fn clear_array_pin(&mut self, array_path: &str, setup_undo: bool) -> Result<(), GraphError> {
        let pin = self.require_pin(array_path)?;
        if !pin.is_array() {
            return Err(GraphError::NotAnArray(array_path.to_owned()));
        }
        let len = pin.sub_pins().len();
        self.begin_action(setup_undo, "Clear Array Pin");
        for index in (0..len).rev() {
            let element_path = format!("{array_path}.{index}");
            if let Err(error) = self.remove_array_pin(&element_path, setup_undo) {
                self.cancel_action(setup_undo);
                return Err(error);
            }
        }
        self.end_action(setup_undo);
        Ok(())
    }

    /// Grows or shrinks an array pin to `size` elements as one undoable
    /// step. New elements take `default`, or the last element's value when
    /// `default` is empty. Returns `false` when the size is unchanged.
    pub fn set_array_pin_size(
        &mut self,
        array_path: &str,
        size: usize,
        default: &str,
        setup_undo: bool,
    ) -> Result<bool, GraphError> {
        let pin = self.require_pin(array_path)?;
        if !pin.is_array() {
            return Err(GraphError::NotAnArray(array_path.to_owned()));
        }
        let len = pin.sub_pins().len();
        if len == size {
            return Ok(false);
        }
        let template = if default.is_empty() {
            pin.sub_pins().last().map(Pin::default_value).unwrap_or_default()
        } else {
            default.to_owned()
        };
        self.begin_action(setup_undo, "Set Array Pin Size");
        let result = (|| {
            if size > len {
                for _ in len..size {
                    self.add_array_pin(array_path, &template, setup_undo)?;
                }
            } else {
                for index in (size..len).rev() {
                    let element_path = format!("{array_path}.{index}");
                    self.remove_array_pin(&element_path, setup_undo)?;
                }
            }
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.end_action(setup_undo);
                Ok(true)
            }
            Err(error) => {
                self.cancel_action(setup_undo);
                Err(error)
            }
        }
    }

    fn array_element_of(&self, element_path: &str) -> Result<(String, usize), GraphError> {
        let array_path = parent_path(element_path)
            .ok_or_else(|| GraphError::NotAnArrayElement(element_path.to_owned()))?;
        let array = self
            .graph()
            .find_pin(array_path)
            .filter(|pin| pin.is_array())
            .ok_or_else(|| GraphError::NotAnArrayElement(element_path.to_owned()))?;
        let index: usize = last_segment(element_path)
            .parse()
            .map_err(|_| GraphError::NotAnArrayElement(element_path.to_owned()))?;
        if index >= array.sub_pins().len() {
            return Err(GraphError::PinNotFound(element_path.to_owned()));
        }
        Ok((array_path.to_owned(), index))
    }

    // ----- apply layer ----------------------------------------------------

    pub(crate) fn apply_pin_default(&mut self, path: &str, value: &str) -> Result<(), GraphError> {
        let catalog = self.catalog_handle();
        let pin = self
            .graph_mut()?
            .find_pin_mut(path)
            .ok_or_else(|| GraphError::PinNotFound(path.to_owned()))?;
        apply_default(catalog.as_ref(), pin, value);
        self.notify(NoticeKind::PinDefaultValueChanged, path);
        Ok(())
    }

    pub(crate) fn apply_pin_expansion(
        &mut self,
        path: &str,
        expanded: bool,
    ) -> Result<(), GraphError> {
        self.graph_mut()?
            .find_pin_mut(path)
            .ok_or_else(|| GraphError::PinNotFound(path.to_owned()))?
            .set_expanded(expanded);
        self.notify(NoticeKind::PinExpansionChanged, path);
        Ok(())
    }

    pub(crate) fn apply_pin_watched(
        &mut self,
        path: &str,
        watched: bool,
    ) -> Result<(), GraphError> {
        self.graph_mut()?
            .find_pin_mut(path)
            .ok_or_else(|| GraphError::PinNotFound(path.to_owned()))?
            .set_watched(watched);
        self.notify(NoticeKind::PinWatchedChanged, path);
        Ok(())
    }

    pub(crate) fn apply_bind(
        &mut self,
        path: &str,
        variable: Option<String>,
    ) -> Result<(), GraphError> {
        self.graph_mut()?
            .find_pin_mut(path)
            .ok_or_else(|| GraphError::PinNotFound(path.to_owned()))?
            .set_bound_variable(variable);
        self.notify(NoticeKind::PinBoundVariableChanged, path);
        Ok(())
    }

    pub(crate) fn apply_insert_element(
        &mut self,
        array_path: &str,
        index: usize,
        mut element: Pin,
    ) -> Result<(), GraphError> {
        let graph = self.graph_mut()?;
        let len = graph
            .find_pin(array_path)
            .filter(|pin| pin.is_array())
            .ok_or_else(|| GraphError::NotAnArray(array_path.to_owned()))?
            .sub_pins()
            .len();
        let index = index.min(len);
        // Shift later elements up, highest first, links following along.
        for i in (index..len).rev() {
            graph.rewrite_pin_paths(
                &format!("{array_path}.{i}"),
                &format!("{array_path}.{}", i + 1),
            );
        }
        let array = graph
            .find_pin_mut(array_path)
            .ok_or_else(|| GraphError::PinNotFound(array_path.to_owned()))?;
        for (i, sub) in array.sub_pins_mut().iter_mut().enumerate().skip(index) {
            sub.set_name((i + 1).to_string());
        }
        element.set_name(index.to_string());
        array.sub_pins_mut().insert(index, element);
        self.notify(NoticeKind::PinAdded, format!("{array_path}.{index}"));
        self.notify(NoticeKind::PinArraySizeChanged, array_path);
        Ok(())
    }

    pub(crate) fn apply_remove_element(
        &mut self,
        array_path: &str,
        index: usize,
    ) -> Result<Pin, GraphError> {
        let graph = self.graph_mut()?;
        let array = graph
            .find_pin_mut(array_path)
            .filter(|pin| pin.is_array())
            .ok_or_else(|| GraphError::NotAnArray(array_path.to_owned()))?;
        let len = array.sub_pins().len();
        if index >= len {
            return Err(GraphError::PinNotFound(format!("{array_path}.{index}")));
        }
        let element = array.sub_pins_mut().remove(index);
        for (i, sub) in array.sub_pins_mut().iter_mut().enumerate().skip(index) {
            sub.set_name(i.to_string());
        }
        // Shift later elements down, lowest first.
        for i in index + 1..len {
            graph.rewrite_pin_paths(
                &format!("{array_path}.{i}"),
                &format!("{array_path}.{}", i - 1),
            );
        }
        self.notify(NoticeKind::PinRemoved, format!("{array_path}.{index}"));
        self.notify(NoticeKind::PinArraySizeChanged, array_path);
        Ok(element)
    }

    pub(crate) fn apply_replace_pin(
        &mut self,
        path: &str,
        replacement: Pin,
    ) -> Result<(), GraphError> {
        let (node_name, pin_path) = split_node_and_pin(path)
            .ok_or_else(|| GraphError::PinNotFound(path.to_owned()))?;
        let node_name = node_name.to_owned();
        let pin_path = pin_path.to_owned();
        let graph = self.graph_mut()?;
        let node = graph
            .find_node_mut(&node_name)
            .ok_or_else(|| GraphError::NodeNotFound(node_name.clone()))?;
        let slot = match parent_path(&pin_path) {
            None => node
                .pins_mut()
                .iter_mut()
                .find(|pin| pin.name() == pin_path),
            Some(parent) => node
                .find_pin_mut(parent)
                .and_then(|pin| {
                    let name = last_segment(&pin_path);
                    pin.sub_pins_mut().iter_mut().find(|sub| sub.name() == name)
                }),
        };
        let slot = slot.ok_or_else(|| GraphError::PinNotFound(path.to_owned()))?;
        *slot = replacement;
        self.notify(NoticeKind::PinTypeChanged, path);
        Ok(())
    }
}
