use super::{BalancedTree, TreeError};

use proptest::prelude::*;
use std::collections::BTreeMap;

fn assert_matches_model(t: &BalancedTree, m: &BTreeMap<i32, String>) {
    t.check_consistency();
    let got: Vec<(i32, &str)> = t.iter().collect();
    let expected: Vec<(i32, &str)> = m.iter().map(|(k, v)| (*k, v.as_str())).collect();
    assert_eq!(got, expected, "tree entries must match the model");
    assert_eq!(t.min_key(), m.keys().next().copied());
    assert_eq!(t.max_key(), m.keys().next_back().copied());
}

#[derive(Clone, Debug)]
enum Op {
    Insert(i32, u16),
    Delete(i32),
    Search(i32),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    // A narrow key space keeps duplicate inserts and hits on delete frequent.
    let key = 0i32..512;
    let op = prop_oneof![
        50 => (key.clone(), any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
        30 => key.clone().prop_map(Op::Delete),
        20 => key.prop_map(Op::Search),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn keys_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::btree_set(-10_000i32..10_000, 1..=300).prop_map(|set| set.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t = BalancedTree::new();
        let mut m: BTreeMap<i32, String> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let got = t.insert(key, value.to_string());
                    if m.contains_key(&key) {
                        prop_assert_eq!(got, Err(TreeError::DuplicateKey(key)));
                    } else {
                        prop_assert!(got.is_ok());
                        m.insert(key, value.to_string());
                    }
                }
                Op::Delete(key) => {
                    let got = t.delete(key);
                    match m.remove(&key) {
                        Some(_) => prop_assert!(got.is_ok()),
                        None => prop_assert_eq!(got, Err(TreeError::KeyNotFound(key))),
                    }
                }
                Op::Search(key) => {
                    prop_assert_eq!(t.search(key), m.get(&key).map(String::as_str));
                }
            }

            prop_assert_eq!(t.len(), m.len());
            prop_assert!(t.is_avl());
        }

        assert_matches_model(&t, &m);
    }

    #[test]
    fn prop_split_partitions(keys in keys_strategy(), pick in any::<prop::sample::Index>()) {
        let at = keys[pick.index(keys.len())];
        let t: BalancedTree = keys.iter().map(|k| (*k, k.to_string())).collect();

        let (smaller, larger) = t.split(at).unwrap();
        let smaller_model: BTreeMap<i32, String> =
            keys.iter().filter(|k| **k < at).map(|k| (*k, k.to_string())).collect();
        let larger_model: BTreeMap<i32, String> =
            keys.iter().filter(|k| **k > at).map(|k| (*k, k.to_string())).collect();

        assert_matches_model(&smaller, &smaller_model);
        assert_matches_model(&larger, &larger_model);
    }

    #[test]
    fn prop_join_concatenates(
        low in keys_strategy(),
        high in prop::collection::btree_set(20_001i32..30_000, 0..=300),
    ) {
        let mut t: BalancedTree = low.iter().map(|k| (*k, k.to_string())).collect();
        let other: BalancedTree = high.iter().map(|k| (*k, k.to_string())).collect();
        let expected_complexity = (t.height() - other.height()).unsigned_abs() as usize + 1;

        let complexity = t.join(20_000, "20000", other).unwrap();
        prop_assert_eq!(complexity, expected_complexity);

        let model: BTreeMap<i32, String> = low
            .iter()
            .copied()
            .chain(std::iter::once(20_000))
            .chain(high.iter().copied())
            .map(|k| (k, k.to_string()))
            .collect();
        assert_matches_model(&t, &model);
    }
}
