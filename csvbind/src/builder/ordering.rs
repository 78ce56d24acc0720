//! Case/group filtering and deterministic ordering of directives.

use std::cmp::Ordering;

use crate::directive::{kinds, BuildCase, Directive, Group};

/// Order used for sorting. The presence check always sorts first.
pub fn effective_order(directive: &Directive) -> i32 {
    if *directive.kind() == kinds::REQUIRE {
        i32::MIN
    } else {
        directive.order()
    }
}

/// Effective order, then fully qualified kind name.
///
/// Equal directives keep their list position when sorted with a stable sort.
pub fn compare(a: &Directive, b: &Directive) -> Ordering {
    effective_order(a)
        .cmp(&effective_order(b))
        .then_with(|| a.kind().as_str().cmp(b.kind().as_str()))
}

/// Whether a directive is active for the given groups.
///
/// An empty active set stands for the default group.
pub fn matches_groups(directive: &Directive, active: &[Group]) -> bool {
    let groups = directive.groups();
    if groups.is_empty() {
        return true;
    }
    if active.is_empty() {
        return groups.iter().any(Group::is_default);
    }
    active.iter().any(|g| groups.contains(g))
}

/// Directives applying to `case` and `active`, in pipeline order.
pub fn select(directives: &[Directive], case: BuildCase, active: &[Group]) -> Vec<Directive> {
    let mut selected: Vec<Directive> = directives
        .iter()
        .filter(|d| d.applies_to(case) && matches_groups(d, active))
        .cloned()
        .collect();
    selected.sort_by(compare);
    selected
}
