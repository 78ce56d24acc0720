//! Ordering and expansion properties.

use proptest::prelude::*;
use serde_json::json;

use csvbind::builder::ordering::{compare, select};
use csvbind::builder::CompositeExpander;
use csvbind::{kinds, BuildCase, Directive, DirectiveCatalog, DirectiveNode, KindId};

fn directive(order: i32, name: &str) -> Directive {
    Directive::new(KindId::new(format!("prop::{}", name))).with_order(order)
}

/// Distinct (order, name) keys, plus a shuffled copy.
fn keyed_lists() -> impl Strategy<Value = (Vec<(i32, String)>, Vec<(i32, String)>)> {
    prop::collection::vec((-5i32..5, "[A-D][a-c]{0,2}"), 0..12)
        .prop_map(|mut keys| {
            keys.sort();
            keys.dedup();
            keys
        })
        .prop_flat_map(|keys| (Just(keys.clone()), Just(keys).prop_shuffle()))
}

fn build(keys: &[(i32, String)]) -> Vec<Directive> {
    keys.iter().map(|(order, name)| directive(*order, name)).collect()
}

fn primitive() -> impl Strategy<Value = Directive> {
    (0usize..5, -20i32..20, 1usize..30).prop_map(|(pick, order, size)| {
        let d = match pick {
            0 => kinds::trim(),
            1 => kinds::upper(),
            2 => kinds::length_max(size),
            3 => kinds::left_pad(size),
            _ => kinds::pattern("^[0-9]+$"),
        };
        d.with_order(order)
    })
}

proptest! {
    #[test]
    fn prop_selection_is_sorted((keys, _) in keyed_lists()) {
        let selected = select(&build(&keys), BuildCase::Read, &[]);
        for pair in selected.windows(2) {
            prop_assert_ne!(compare(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
            prop_assert!(
                pair[0].order() < pair[1].order()
                    || (pair[0].order() == pair[1].order()
                        && pair[0].kind().as_str() < pair[1].kind().as_str())
            );
        }
    }

    #[test]
    fn prop_declaration_order_does_not_matter((keys, shuffled) in keyed_lists()) {
        for case in [BuildCase::Read, BuildCase::Write] {
            prop_assert_eq!(
                select(&build(&keys), case, &[]),
                select(&build(&shuffled), case, &[])
            );
        }
    }

    #[test]
    fn prop_case_filtering(cases in prop::collection::vec(0u8..3, 0..10)) {
        let list: Vec<Directive> = cases
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let d = directive(i as i32, "Case");
                match c {
                    0 => d.on(BuildCase::Read),
                    1 => d.on(BuildCase::Write),
                    _ => d,
                }
            })
            .collect();

        let read = select(&list, BuildCase::Read, &[]);
        let write = select(&list, BuildCase::Write, &[]);
        prop_assert!(read.iter().all(|d| d.cases().len() != 1 || d.applies_to(BuildCase::Read)));
        prop_assert!(write.iter().all(|d| d.cases().len() != 1 || d.applies_to(BuildCase::Write)));
        prop_assert_eq!(read.len(), cases.iter().filter(|c| **c != 1).count());
        prop_assert_eq!(write.len(), cases.iter().filter(|c| **c != 0).count());
    }

    #[test]
    fn prop_primitive_expansion_is_identity(list in prop::collection::vec(primitive(), 0..8)) {
        let catalog = DirectiveCatalog::standard();
        let nodes: Vec<DirectiveNode> = list.iter().cloned().map(DirectiveNode::from).collect();
        let expanded = CompositeExpander::new(&catalog, 8).expand(&nodes).unwrap();
        prop_assert_eq!(expanded, list);
    }

    #[test]
    fn prop_composite_replaced_by_components(
        before in prop::collection::vec(primitive(), 0..4),
        after in prop::collection::vec(primitive(), 0..4),
        size in 1usize..40,
    ) {
        let catalog = DirectiveCatalog::standard();
        let mut nodes: Vec<DirectiveNode> =
            before.iter().cloned().map(DirectiveNode::from).collect();
        nodes.push(kinds::fixed_size(size).with_attr("pad_char", "0").into());
        nodes.extend(after.iter().cloned().map(DirectiveNode::from));

        let expanded = CompositeExpander::new(&catalog, 8).expand(&nodes).unwrap();
        prop_assert_eq!(expanded.len(), before.len() + after.len() + 2);
        prop_assert!(expanded.iter().all(|d| *d.kind() != kinds::FIXED_SIZE));
        prop_assert_eq!(&expanded[..before.len()], &before[..]);
        prop_assert_eq!(&expanded[before.len() + 2..], &after[..]);

        let pad = &expanded[before.len()];
        prop_assert_eq!(pad.kind(), &kinds::MULTI_PAD);
        prop_assert_eq!(pad.order(), 1000);
        prop_assert_eq!(pad.attr("size"), Some(&json!(size)));
        prop_assert_eq!(pad.attr("pad_char"), Some(&json!("0")));

        let trim = &expanded[before.len() + 1];
        prop_assert_eq!(trim.kind(), &kinds::ONE_SIDE_TRIM);
        prop_assert_eq!(trim.order(), 0);
        prop_assert_eq!(trim.attr("trim_char"), Some(&json!("0")));
    }
}
