// SPDX-License-Identifier: Apache-2.0
//! Pin tree construction from catalog schemas.
//!
//! A pin's subtree is a pure function of its type, direction and default
//! text: expandable aggregates unfold into one sub-pin per field, arrays
//! into one sub-pin per default element. Everything that creates pins (node
//! instantiation, array mutation, prototype resolution, exposed pins) goes
//! through here so the tree invariants hold by construction.

use rustc_hash::FxHashMap;

use loom_schema::{
    array_element_type, split_default_value, split_fields, OperationDesc, PinDirection,
    TypeCatalog, EXECUTE_TYPE,
};

use crate::pin::Pin;

/// Builds one pin with its full subtree.
#[must_use]
pub fn build_pin(
    catalog: &dyn TypeCatalog,
    name: &str,
    direction: PinDirection,
    ty: &str,
    default: &str,
) -> Pin {
    let mut pin = Pin::new(name, direction, ty);
    if ty.is_empty() || ty == EXECUTE_TYPE {
        return pin;
    }
    if let Some(element_ty) = array_element_type(ty) {
        let canonical = catalog.canonical_default(ty, default);
        // Only arrays feeding into the node unfold; output arrays keep
        // their default as text.
        if !direction.accepts_incoming() {
            pin.set_leaf_default(canonical);
            return pin;
        }
        for (index, fragment) in split_default_value(&canonical).into_iter().enumerate() {
            pin.sub_pins_mut().push(build_pin(
                catalog,
                &index.to_string(),
                direction,
                element_ty,
                &fragment,
            ));
        }
        return pin;
    }
    if let Some(aggregate) = catalog.find_aggregate(ty) {
        if aggregate.expandable {
            let canonical = catalog.canonical_default(ty, default);
            let values: FxHashMap<String, String> =
                split_fields(&canonical).into_iter().collect();
            // The schema is cloned up front; `catalog` stays borrowed by the
            // recursion below.
            let fields = aggregate.fields.clone();
            for field in fields {
                let value = values.get(&field.name).map_or("", String::as_str);
                pin.sub_pins_mut()
                    .push(build_pin(catalog, &field.name, direction, &field.ty, value));
            }
            return pin;
        }
    }
    pin.set_leaf_default(catalog.canonical_default(ty, default));
    pin
}

/// Builds the pin list for a catalog operation.
#[must_use]
pub fn build_pins_for_operation(catalog: &dyn TypeCatalog, operation: &OperationDesc) -> Vec<Pin> {
    operation
        .pins
        .iter()
        .map(|decl| build_pin(catalog, &decl.name, decl.direction, &decl.ty, &decl.default))
        .collect()
}

/// Applies new default text onto an existing pin tree without disturbing
/// expansion or watch flags where the shape is unchanged. Array pins whose
/// element count differs are rebuilt.
pub fn apply_default(catalog: &dyn TypeCatalog, pin: &mut Pin, text: &str) {
    if pin.is_array() {
        if !pin.direction().accepts_incoming() {
            pin.set_leaf_default(catalog.canonical_default(pin.ty(), text));
            return;
        }
        let fragments = split_default_value(text);
        if fragments.len() == pin.sub_pins().len() {
            for (sub, fragment) in pin.sub_pins_mut().iter_mut().zip(fragments) {
                apply_default(catalog, sub, &fragment);
            }
        } else {
            let rebuilt = build_pin(catalog, pin.name(), pin.direction(), pin.ty(), text);
            *pin.sub_pins_mut() = rebuilt.sub_pins().to_vec();
        }
        return;
    }
    if pin.sub_pins().is_empty() {
        pin.set_leaf_default(catalog.canonical_default(pin.ty(), text));
        return;
    }
    for (field, value) in split_fields(text) {
        if let Some(sub) = pin.find_sub_pin_mut(&field) {
            apply_default(catalog, sub, &value);
        }
    }
}

/// Maps pin paths of a node's previous shape onto its new shape.
///
/// Consumers register exact redirects (`"output"` -> `"result"`); lookups
/// fall back to the longest redirected prefix so sub-pin state and links
/// survive a parent pin's rename.
#[derive(Debug, Default, Clone)]
pub struct PinRedirectMap {
    map: FxHashMap<String, String>,
}

impl PinRedirectMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a redirect from an old pin path to a new one, both relative
    /// to the node.
    pub fn insert(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.map.insert(old.into(), new.into());
    }

    /// Redirects a path, following the longest matching prefix. Unmapped
    /// paths come back unchanged.
    #[must_use]
    pub fn redirect(&self, path: &str) -> String {
        if let Some(new) = self.map.get(path) {
            return new.clone();
        }
        let mut prefix = path;
        while let Some((parent, _)) = prefix.rsplit_once('.') {
            if let Some(new) = self.map.get(parent) {
                let rest = &path[parent.len()..];
                return format!("{new}{rest}");
            }
            prefix = parent;
        }
        path.to_owned()
    }

    /// Whether no redirects are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use loom_schema::{AggregateDesc, FieldDesc, SchemaRegistry};

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register_aggregate(AggregateDesc {
                name: "Vector".to_owned(),
                fields: vec![
                    FieldDesc {
                        name: "x".to_owned(),
                        ty: "float".to_owned(),
                        default: String::new(),
                    },
                    FieldDesc {
                        name: "y".to_owned(),
                        ty: "float".to_owned(),
                        default: String::new(),
                    },
                ],
                expandable: true,
            })
            .unwrap();
        registry
    }

    #[test]
    fn aggregate_pin_unfolds_with_defaults() {
        let registry = registry();
        let pin = build_pin(
            &registry,
            "value",
            PinDirection::Input,
            "Vector",
            "(y=3.0)",
        );
        assert_eq!(pin.sub_pins().len(), 2);
        assert_eq!(pin.default_value(), "(x=0.0,y=3.0)");
    }

    #[test]
    fn array_pin_unfolds_per_element() {
        let registry = registry();
        let pin = build_pin(
            &registry,
            "values",
            PinDirection::Input,
            "float[]",
            "(1.0,2.0,3.0)",
        );
        let names: Vec<&str> = pin.sub_pins().iter().map(Pin::name).collect();
        assert_eq!(names, ["0", "1", "2"]);
        assert_eq!(pin.default_value(), "(1.0,2.0,3.0)");
    }

    #[test]
    fn output_array_stays_folded() {
        let registry = registry();
        let pin = build_pin(
            &registry,
            "sum",
            PinDirection::Output,
            "float[]",
            "(1.0,2.0)",
        );
        assert!(pin.sub_pins().is_empty());
        assert_eq!(pin.default_value(), "(1.0,2.0)");
    }

    #[test]
    fn redirect_follows_longest_prefix() {
        let mut map = PinRedirectMap::new();
        map.insert("output", "result");
        assert_eq!(map.redirect("output"), "result");
        assert_eq!(map.redirect("output.x"), "result.x");
        assert_eq!(map.redirect("other"), "other");
    }
}
