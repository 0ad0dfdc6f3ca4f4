// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use std::rc::Rc;

use loom_core::Controller;
use loom_schema::{
    AggregateDesc, FieldDesc, OperationDesc, OverloadDesc, PinDecl, PinDirection, PrototypeDesc,
    SchemaRegistry, EXECUTE_TYPE,
};

fn pin(name: &str, direction: PinDirection, ty: &str, default: &str) -> PinDecl {
    PinDecl {
        name: name.to_owned(),
        direction,
        ty: ty.to_owned(),
        default: default.to_owned(),
    }
}

fn binary_op(name: &str, ty: &str) -> OperationDesc {
    OperationDesc {
        name: name.to_owned(),
        pins: vec![
            pin("a", PinDirection::Input, ty, ""),
            pin("b", PinDirection::Input, ty, ""),
            pin("result", PinDirection::Output, ty, ""),
        ],
        is_event: false,
    }
}

/// A small but representative catalog: float/int/Vector arithmetic, one
/// mutable operation, one event, one array consumer, and a polymorphic
/// `add` prototype over the three arithmetic operations.
pub fn catalog() -> SchemaRegistry {
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
                    default: "1.0".to_owned(),
                },
            ],
            expandable: true,
        })
        .unwrap();
    registry.register_operation(binary_op("math.Add", "float")).unwrap();
    registry.register_operation(binary_op("math.AddInt", "int")).unwrap();
    registry
        .register_operation(binary_op("math.AddVector", "Vector"))
        .unwrap();
    registry
        .register_operation(OperationDesc {
            name: "debug.PrintFloat".to_owned(),
            pins: vec![
                pin("execute", PinDirection::Io, EXECUTE_TYPE, ""),
                pin("value", PinDirection::Input, "float", ""),
            ],
            is_event: false,
        })
        .unwrap();
    registry
        .register_operation(OperationDesc {
            name: "app.Tick".to_owned(),
            pins: vec![pin("execute", PinDirection::Output, EXECUTE_TYPE, "")],
            is_event: true,
        })
        .unwrap();
    registry
        .register_operation(OperationDesc {
            name: "array.Sum".to_owned(),
            pins: vec![
                pin("values", PinDirection::Input, "float[]", "(0.0,0.0,0.0)"),
                pin("sum", PinDirection::Output, "float", ""),
            ],
            is_event: false,
        })
        .unwrap();
    let overload = |operation: &str, ty: &str| OverloadDesc {
        operation: operation.to_owned(),
        types: [
            ("a".to_owned(), ty.to_owned()),
            ("b".to_owned(), ty.to_owned()),
            ("result".to_owned(), ty.to_owned()),
        ]
        .into_iter()
        .collect(),
    };
    registry
        .register_prototype(PrototypeDesc {
            notation: "add(a,b,result)".to_owned(),
            name: "add".to_owned(),
            pins: vec![
                ("a".to_owned(), PinDirection::Input),
                ("b".to_owned(), PinDirection::Input),
                ("result".to_owned(), PinDirection::Output),
            ],
            overloads: vec![
                overload("math.Add", "float"),
                overload("math.AddInt", "int"),
                overload("math.AddVector", "Vector"),
            ],
        })
        .unwrap();
    registry
}

pub fn controller() -> Controller {
    Controller::new(Rc::new(catalog()))
}
