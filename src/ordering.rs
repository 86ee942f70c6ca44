//! Ordering policy shared by hooks and metadata extractors.
//!
//! Higher declared order runs first; ties break on the registered id so the
//! run order is reproducible across runs. Types that do not override
//! [`HookOrder::order`] get the default order of 0.

use std::cmp::Ordering;

/// Priority annotation carried by every hook and extractor.
pub trait HookOrder {
    /// Declared order. Higher sorts first.
    fn order(&self) -> i32 {
        0
    }

    /// Stable identifier used for the deterministic tie-break and for
    /// exclusion-by-name filtering.
    fn id(&self) -> &str;
}

/// The comparator underlying every pipeline: descending by order, then
/// ascending by id. Equal order and equal id compare equal, keeping the
/// order total even for pathological registrations.
pub fn compare_order(
    left_order: i32,
    left_id: &str,
    right_order: i32,
    right_id: &str,
) -> Ordering {
    right_order
        .cmp(&left_order)
        .then_with(|| left_id.cmp(right_id))
}

/// [`compare_order`] over two ordered instances.
pub fn hook_order(left: &dyn HookOrder, right: &dyn HookOrder) -> Ordering {
    compare_order(left.order(), left.id(), right.order(), right.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        order: i32,
        id: &'static str,
    }

    impl HookOrder for Named {
        fn order(&self) -> i32 {
            self.order
        }

        fn id(&self) -> &str {
            self.id
        }
    }

    struct Unannotated;

    impl HookOrder for Unannotated {
        fn id(&self) -> &str {
            "Unannotated"
        }
    }

    #[test]
    fn higher_order_sorts_first_ties_break_on_id() {
        let mut items: Vec<Box<dyn HookOrder>> = vec![
            Box::new(Named { order: 10, id: "B" }),
            Box::new(Named { order: 10, id: "A" }),
            Box::new(Named { order: -5, id: "C" }),
        ];
        items.sort_by(|a, b| hook_order(a.as_ref(), b.as_ref()));
        let ids: Vec<&str> = items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn missing_order_defaults_to_zero() {
        let mut items: Vec<Box<dyn HookOrder>> = vec![
            Box::new(Unannotated),
            Box::new(Named { order: 1, id: "Z" }),
            Box::new(Named { order: -1, id: "A" }),
        ];
        items.sort_by(|a, b| hook_order(a.as_ref(), b.as_ref()));
        let ids: Vec<&str> = items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["Z", "Unannotated", "A"]);
    }

    #[test]
    fn identical_order_and_id_compare_equal() {
        let a = Named { order: 3, id: "X" };
        let b = Named { order: 3, id: "X" };
        assert_eq!(hook_order(&a, &b), Ordering::Equal);
    }
}
