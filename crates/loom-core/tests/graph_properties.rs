// SPDX-License-Identifier: Apache-2.0

#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
mod common;

use std::collections::BTreeSet;

use loom_core::Vec2;
use proptest::prelude::*;

const OPERATIONS: [&str; 3] = ["math.Add", "math.AddInt", "math.AddVector"];

proptest! {
    /// Node names stay unique no matter what names are requested, and
    /// undoing everything leaves the graph empty.
    #[test]
    fn names_stay_unique_and_undo_drains_to_empty(
        adds in prop::collection::vec((0usize..3, "[a-zA-Z_]{0,6}"), 1..20)
    ) {
        let mut c = common::controller();
        for (op, name) in &adds {
            c.add_unit_node(OPERATIONS[*op], Vec2::ZERO, name, true).unwrap();
        }
        let names = c.graph().node_names();
        let unique: BTreeSet<&String> = names.iter().collect();
        prop_assert_eq!(names.len(), adds.len());
        prop_assert_eq!(unique.len(), names.len());

        while c.undo().unwrap() {}
        prop_assert!(c.graph().node_names().is_empty());
        prop_assert!(!c.can_undo());
    }

    /// However links are thrown at the graph, every input pin ends up fed
    /// by at most one link and no link connects a node to itself.
    #[test]
    fn input_pins_stay_single_fed(
        attempts in prop::collection::vec((0usize..5, 0usize..5, prop::bool::ANY), 0..30)
    ) {
        let mut c = common::controller();
        for i in 0..5 {
            c.add_unit_node("math.Add", Vec2::ZERO, &format!("n{i}"), true).unwrap();
        }
        for (source, target, use_a) in attempts {
            let pin = if use_a { "a" } else { "b" };
            let _unused = c.add_link(
                &format!("n{source}.result"),
                &format!("n{target}.{pin}"),
                true,
            );
        }
        let links = c.graph().links();
        let mut targets = BTreeSet::new();
        for link in links {
            prop_assert!(targets.insert(link.target.clone()), "doubly fed: {}", link.target);
            let source_node = link.source.split('.').next().unwrap();
            let target_node = link.target.split('.').next().unwrap();
            prop_assert_ne!(source_node, target_node);
        }
    }

    /// Undo and redo are inverses over a random editing run: redoing
    /// everything reproduces the same link set.
    #[test]
    fn redo_reproduces_the_run(
        attempts in prop::collection::vec((0usize..4, 0usize..4), 0..15)
    ) {
        let mut c = common::controller();
        for i in 0..4 {
            c.add_unit_node("math.Add", Vec2::ZERO, &format!("n{i}"), true).unwrap();
        }
        for (source, target) in attempts {
            let _unused = c.add_link(
                &format!("n{source}.result"),
                &format!("n{target}.a"),
                true,
            );
        }
        let final_links = c.graph().links().to_vec();

        while c.undo().unwrap() {}
        prop_assert!(c.graph().links().is_empty());
        while c.redo().unwrap() {}
        prop_assert_eq!(c.graph().links(), final_links.as_slice());
    }
}
