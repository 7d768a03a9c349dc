#![allow(non_snake_case)]

use super::*;
use bundleworks_core::properties::SERVICE_RANKING;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeSet;

fn reference(id: u64, ranking: i64) -> ServiceReference {
    let mut properties = Properties::new();
    properties.insert(SERVICE_RANKING.into(), json!(ranking));
    properties.insert(OBJECTCLASS.into(), json!(["sample::Greeting"]));
    ServiceReference::new(id, 1, properties)
}

#[test]
fn ServiceReference___higher_ranking___is_better() {
    let low = reference(1, 0);
    let high = reference(2, 5);

    assert!(high.is_better_than(&low));
    assert!(!low.is_better_than(&high));
}

#[test]
fn ServiceReference___equal_ranking___lower_id_is_better() {
    let first = reference(3, 1);
    let second = reference(4, 1);

    assert!(first.is_better_than(&second));
}

#[test]
fn ServiceReference___sorted_set___iterates_best_first() {
    let set: BTreeSet<_> = [reference(1, 0), reference(2, 10), reference(3, 10), reference(4, -1)]
        .into_iter()
        .collect();

    let ids: Vec<u64> = set.iter().map(ServiceReference::id).collect();

    assert_eq!(ids, vec![2, 3, 1, 4]);
}

#[test]
fn ServiceReference___interfaces___reads_objectclass() {
    let r = reference(1, 0);

    assert_eq!(r.interfaces(), vec!["sample::Greeting"]);
    assert!(r.has_interface("sample::Greeting"));
    assert!(!r.has_interface("sample::Other"));
}

#[test]
fn ServiceReference___clone___is_equal() {
    let r = reference(9, 3);

    assert_eq!(r.clone(), r);
}

proptest! {
    #[test]
    fn ServiceReference___ordering___is_rank_then_id(
        a_id in 1u64..1000, a_rank in -50i64..50,
        b_id in 1u64..1000, b_rank in -50i64..50,
    ) {
        prop_assume!(a_id != b_id);
        let a = reference(a_id, a_rank);
        let b = reference(b_id, b_rank);

        let expected = a_rank > b_rank || (a_rank == b_rank && a_id < b_id);

        prop_assert_eq!(a.is_better_than(&b), expected);
        prop_assert_eq!(b.is_better_than(&a), !expected);
    }
}
