// SPDX-License-Identifier: Apache-2.0
//! loom-schema: the type catalog consumed by the loom graph controller.
//!
//! This crate owns the type-name notation (`float`, `float[]`, aggregate
//! names), the field schemas of aggregate types, the descriptors of callable
//! operations and of polymorphic prototype operations, and the textual
//! default-value codec. The graph controller in `loom-core` depends only on
//! the [`TypeCatalog`] contract; [`SchemaRegistry`] is the plain-data
//! implementation of it.

mod registry;
mod text;
mod types;

/// Aggregate/operation/prototype descriptors and the registry implementing
/// the catalog contract.
pub use registry::{
    AggregateDesc, FieldDesc, OperationDesc, OverloadDesc, PinDecl, PrototypeDesc,
    PrototypeResolution, RegistryError, SchemaRegistry, TypeCatalog,
};
/// Default-value text codec helpers.
pub use text::{join_elements, join_fields, split_default_value, split_fields};
/// Type-name notation helpers and well-known type names.
pub use types::{array_element_type, array_type_of, is_array_type, PinDirection, EXECUTE_TYPE};
