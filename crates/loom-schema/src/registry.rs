// SPDX-License-Identifier: Apache-2.0
//! Descriptors and the schema registry.
//!
//! The registry is plain data: aggregates with ordered field lists,
//! operations with ordered pin declarations, and prototype (overload) sets.
//! It implements [`TypeCatalog`], the narrow contract the graph controller
//! consumes. The controller never mutates the catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::{join_fields, split_fields};
use crate::types::{is_array_type, PinDirection, EXECUTE_TYPE};

/// One field of an aggregate type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDesc {
    /// Field name, unique within the aggregate.
    pub name: String,
    /// Field type name (primitive, aggregate, or array).
    pub ty: String,
    /// Declared default fragment; empty means the type's zero value.
    pub default: String,
}

/// Schema of an aggregate (struct-like) type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDesc {
    /// Registered type name.
    pub name: String,
    /// Ordered fields.
    pub fields: Vec<FieldDesc>,
    /// Whether pins of this type unfold into one child pin per field.
    /// Opaque/class-like aggregates set this to `false`.
    pub expandable: bool,
}

/// Declaration of one pin on an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinDecl {
    /// Pin name, unique within the operation.
    pub name: String,
    /// Pin direction.
    pub direction: PinDirection,
    /// Pin type name.
    pub ty: String,
    /// Declared default; empty means the type's zero value.
    pub default: String,
}

/// Descriptor of a callable typed operation backing a unit node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDesc {
    /// Operation name, unique within the registry.
    pub name: String,
    /// Ordered pin declarations.
    pub pins: Vec<PinDecl>,
    /// Event roots may only be placed in a top-level graph.
    pub is_event: bool,
}

impl OperationDesc {
    /// Whether the operation participates in control flow (owns an
    /// execute-typed pin).
    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.pins.iter().any(|pin| pin.ty == EXECUTE_TYPE)
    }

    /// Finds a pin declaration by name.
    #[must_use]
    pub fn find_pin(&self, name: &str) -> Option<&PinDecl> {
        self.pins.iter().find(|pin| pin.name == name)
    }
}

/// One concrete specialization of a prototype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverloadDesc {
    /// The concrete operation instantiated when this overload is chosen.
    pub operation: String,
    /// Pin name to concrete type, for every declared prototype pin.
    pub types: BTreeMap<String, String>,
}

/// Descriptor of a polymorphic operation with several type specializations.
///
/// Prototype pins start untyped; the notation (`"add(a,b,result)"`) names
/// them in order. Resolution narrows the overload set with every concrete
/// type learned from connected links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrototypeDesc {
    /// Unique notation, e.g. `"add(a,b,result)"`.
    pub notation: String,
    /// Display/instantiation name, e.g. `"add"`.
    pub name: String,
    /// Ordered pin names and directions.
    pub pins: Vec<(String, PinDirection)>,
    /// All concrete specializations.
    pub overloads: Vec<OverloadDesc>,
}

impl PrototypeDesc {
    /// Whether `pin` could still carry `ty` in at least one overload that is
    /// consistent with `known` types on the other pins.
    #[must_use]
    pub fn supports_type(&self, pin: &str, ty: &str, known: &BTreeMap<String, String>) -> bool {
        self.overloads
            .iter()
            .filter(|overload| overload_matches(overload, known))
            .any(|overload| overload.types.get(pin).is_some_and(|t| t == ty))
    }
}

fn overload_matches(overload: &OverloadDesc, known: &BTreeMap<String, String>) -> bool {
    known
        .iter()
        .all(|(pin, ty)| overload.types.get(pin).is_some_and(|t| t == ty))
}

/// Outcome of prototype resolution against a partial type assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrototypeResolution {
    /// Exactly one overload remains; the named operation replaces the node.
    Resolved(String),
    /// Several overloads remain; the map carries pins whose type is already
    /// forced (identical across all remaining overloads).
    Partial(BTreeMap<String, String>),
    /// No overload is consistent with the assignment.
    Unresolved,
}

/// Errors when populating a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An aggregate with this name is already registered.
    #[error("duplicate aggregate type: {0}")]
    DuplicateAggregate(String),
    /// An operation with this name is already registered.
    #[error("duplicate operation: {0}")]
    DuplicateOperation(String),
    /// A prototype with this notation is already registered.
    #[error("duplicate prototype notation: {0}")]
    DuplicatePrototype(String),
}

/// The capability contract the graph controller consumes.
pub trait TypeCatalog {
    /// Looks up an operation descriptor by name.
    fn find_operation(&self, name: &str) -> Option<&OperationDesc>;

    /// Looks up an aggregate schema by type name.
    fn find_aggregate(&self, type_name: &str) -> Option<&AggregateDesc>;

    /// Whether pins of `type_name` unfold into child pins. Arrays unfold per
    /// element; aggregates unfold when their schema says so; the execute
    /// marker type never unfolds.
    fn is_expandable(&self, type_name: &str) -> bool {
        if type_name == EXECUTE_TYPE {
            return false;
        }
        if is_array_type(type_name) {
            return true;
        }
        self.find_aggregate(type_name)
            .is_some_and(|aggregate| aggregate.expandable)
    }

    /// Computes the canonical textual default for `type_name`: the zero
    /// value of the type with `override_text` fragments merged over it
    /// (construct, then import the override, then export).
    fn canonical_default(&self, type_name: &str, override_text: &str) -> String;

    /// Whether a value of `variable_type` may bind to a pin of `pin_type`.
    fn is_compatible(&self, pin_type: &str, variable_type: &str) -> bool {
        !pin_type.is_empty() && pin_type == variable_type
    }

    /// Looks up a prototype descriptor by notation.
    fn find_prototype(&self, notation: &str) -> Option<&PrototypeDesc>;

    /// Resolves a prototype against a partial pin-type assignment.
    fn resolve_prototype(
        &self,
        notation: &str,
        types: &BTreeMap<String, String>,
    ) -> PrototypeResolution {
        let Some(prototype) = self.find_prototype(notation) else {
            return PrototypeResolution::Unresolved;
        };
        let remaining: Vec<&OverloadDesc> = prototype
            .overloads
            .iter()
            .filter(|overload| overload_matches(overload, types))
            .collect();
        match remaining.as_slice() {
            [] => PrototypeResolution::Unresolved,
            [only] => PrototypeResolution::Resolved(only.operation.clone()),
            several => {
                // A pin's type is forced when every remaining overload agrees.
                let mut forced = BTreeMap::new();
                for (pin, _) in &prototype.pins {
                    let mut candidates = several
                        .iter()
                        .filter_map(|overload| overload.types.get(pin));
                    if let Some(first) = candidates.next() {
                        if candidates.all(|ty| ty == first) {
                            forced.insert(pin.clone(), first.clone());
                        }
                    }
                }
                PrototypeResolution::Partial(forced)
            }
        }
    }
}

/// Plain-data implementation of [`TypeCatalog`].
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    aggregates: BTreeMap<String, AggregateDesc>,
    operations: BTreeMap<String, OperationDesc>,
    prototypes: BTreeMap<String, PrototypeDesc>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an aggregate schema.
    pub fn register_aggregate(&mut self, aggregate: AggregateDesc) -> Result<(), RegistryError> {
        if self.aggregates.contains_key(&aggregate.name) {
            return Err(RegistryError::DuplicateAggregate(aggregate.name));
        }
        self.aggregates.insert(aggregate.name.clone(), aggregate);
        Ok(())
    }

    /// Registers an operation.
    pub fn register_operation(&mut self, operation: OperationDesc) -> Result<(), RegistryError> {
        if self.operations.contains_key(&operation.name) {
            return Err(RegistryError::DuplicateOperation(operation.name));
        }
        self.operations.insert(operation.name.clone(), operation);
        Ok(())
    }

    /// Registers a prototype.
    pub fn register_prototype(&mut self, prototype: PrototypeDesc) -> Result<(), RegistryError> {
        if self.prototypes.contains_key(&prototype.notation) {
            return Err(RegistryError::DuplicatePrototype(prototype.notation));
        }
        self.prototypes.insert(prototype.notation.clone(), prototype);
        Ok(())
    }

    /// Removes an operation, e.g. to model a vanished schema after reload.
    pub fn unregister_operation(&mut self, name: &str) -> Option<OperationDesc> {
        self.operations.remove(name)
    }

    /// Iterates registered operations in name order.
    pub fn iter_operations(&self) -> impl Iterator<Item = &OperationDesc> {
        self.operations.values()
    }
}

impl TypeCatalog for SchemaRegistry {
    fn find_operation(&self, name: &str) -> Option<&OperationDesc> {
        self.operations.get(name)
    }

    fn find_aggregate(&self, type_name: &str) -> Option<&AggregateDesc> {
        self.aggregates.get(type_name)
    }

    fn canonical_default(&self, type_name: &str, override_text: &str) -> String {
        if type_name == EXECUTE_TYPE || type_name.is_empty() {
            return String::new();
        }
        if is_array_type(type_name) {
            // Arrays have no implicit elements; the override is authoritative.
            return if override_text.is_empty() {
                "()".to_owned()
            } else {
                override_text.to_owned()
            };
        }
        if let Some(aggregate) = self.aggregates.get(type_name) {
            let overrides: BTreeMap<String, String> =
                split_fields(override_text).into_iter().collect();
            let fields: Vec<(String, String)> = aggregate
                .fields
                .iter()
                .map(|field| {
                    let value = overrides
                        .get(&field.name)
                        .map_or_else(|| self.canonical_default(&field.ty, &field.default), Clone::clone);
                    (field.name.clone(), value)
                })
                .collect();
            return join_fields(fields.iter().map(|(n, v)| (n.as_str(), v.as_str())));
        }
        if !override_text.is_empty() {
            return override_text.to_owned();
        }
        match type_name {
            "bool" => "false".to_owned(),
            "int" => "0".to_owned(),
            "float" => "0.0".to_owned(),
            _ => String::new(),
        }
    }

    fn find_prototype(&self, notation: &str) -> Option<&PrototypeDesc> {
        self.prototypes.get(notation)
    }
}
