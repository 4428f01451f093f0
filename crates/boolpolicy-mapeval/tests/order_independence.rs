//! Property tests: map evaluation does not depend on entry order.

use boolpolicy_mapeval::{conjunction, disjunction, should_contain, should_not_contain, MapMatcher};
use proptest::prelude::*;

fn arb_entries() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-c]{1,2}", "[x-z]{0,2}"), 0..8)
}

fn arb_query() -> impl Strategy<Value = String> {
    let constraint = ("[a-c]{0,2}", "[x-z]{0,2}", any::<bool>()).prop_map(|(k, v, negated)| {
        if negated {
            should_not_contain(&k, &v)
        } else {
            should_contain(&k, &v)
        }
    });
    prop::collection::vec(prop::collection::vec(constraint, 1..4).prop_map(|c| conjunction(c)), 1..3)
        .prop_map(|g| disjunction(g))
}

proptest! {
    #[test]
    fn reversed_entries_give_same_answer(query in arb_query(), entries in arb_entries()) {
        let matcher = MapMatcher::compile(&query).unwrap();
        let forward = matcher.matches(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let backward = matcher.matches(entries.iter().rev().map(|(k, v)| (k.as_str(), v.as_str())));
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn json_and_pair_evaluation_agree(query in arb_query(), entries in arb_entries()) {
        let matcher = MapMatcher::compile(&query).unwrap();
        let object: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        // Duplicate keys collapse in the object, so compare against its own entries.
        let pairs: Vec<(String, String)> = object
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
            .collect();
        prop_assert_eq!(
            matcher.matches_json(&serde_json::Value::Object(object)),
            matcher.matches(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        );
    }
}
