use super::*;

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

type WeakHamt = Hamt<(u16, u64), First, fn(&u16, usize) -> u64, DefaultEquivalence>;

/// Collides keys heavily in the first rounds so that merges and collapses
/// cross round boundaries.
fn weak_hash(key: &u16, round: usize) -> u64 {
    match round {
        0 => (*key % 4) as u64,
        1 => (*key % 64) as u64,
        _ => *key as u64,
    }
}

#[derive(Clone, Debug)]
enum Op<K, V> {
    Insert(K, V),
    Remove(K),
    Get(K),
    Snapshot,
}

fn ops_strategy<K: Strategy + Clone>(key: K) -> impl Strategy<Value = Vec<Op<K::Value, u64>>>
where
    K::Value: Clone,
{
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        20 => key.prop_map(Op::Get),
        5 => Just(Op::Snapshot),
    ];

    prop::collection::vec(op, 0..=500)
}

fn byte_key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    prop::collection::vec(0u8..8, 0..=6)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn hamt_equivalence(ops in ops_strategy(0u16..512)) {
        let mut hamt = WeakHamt::with_strategy(First, weak_hash, DefaultEquivalence);
        let mut oracle = HashMap::new();
        let mut snapshots = vec![];

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    hamt = hamt.insert((key, value)).0;
                    oracle.insert(key, value);
                }
                Op::Remove(key) => {
                    let old = hamt.clone();

                    hamt = hamt.remove(&key);

                    prop_assert_eq!(
                        hamt.ptr_eq(&old),
                        oracle.remove(&key).is_none()
                    );
                }
                Op::Get(key) => {
                    prop_assert_eq!(
                        hamt.get(&key).map(|(_, value)| *value),
                        oracle.get(&key).copied()
                    );
                }
                Op::Snapshot => snapshots.push((hamt.clone(), oracle.clone())),
            }

            prop_assert_eq!(hamt.len(), oracle.len());
            prop_assert_eq!(hamt.entry_count(), oracle.len());
            prop_assert!(hamt.is_normal());
        }

        for (hamt, oracle) in snapshots {
            prop_assert_eq!(hamt.len(), oracle.len());

            for (key, value) in &oracle {
                prop_assert_eq!(hamt.get(key), Some(&(*key, *value)));
            }
        }
    }

    #[test]
    fn map_equivalence(ops in ops_strategy(any::<u16>())) {
        let mut map = Map::new();
        let mut oracle = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    map = map.insert(key, value);
                    oracle.insert(key, value);
                }
                Op::Remove(key) => {
                    map = map.remove(&key);
                    oracle.remove(&key);
                }
                Op::Get(key) => {
                    prop_assert_eq!(map.get(&key), oracle.get(&key));
                }
                Op::Snapshot => {}
            }

            prop_assert_eq!(map.len(), oracle.len());
        }

        prop_assert_eq!(map, oracle.into_iter().collect::<Map<_, _>>());
    }

    #[test]
    fn prefix_trie_equivalence(ops in ops_strategy(byte_key_strategy())) {
        let mut trie = PrefixTrie::new();
        let mut oracle = BTreeMap::new();
        let mut snapshots = vec![];

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    trie = trie.insert(&key, value);
                    oracle.insert(key, value);
                }
                Op::Remove(key) => {
                    let old = trie.clone();

                    trie = trie.remove(&key);

                    prop_assert_eq!(
                        trie.ptr_eq(&old),
                        oracle.remove(&key).is_none()
                    );
                }
                Op::Get(key) => {
                    prop_assert_eq!(trie.get(&key), oracle.get(&key));
                    prop_assert_eq!(
                        trie.find_prefix(&key),
                        (0..=key.len())
                            .filter_map(|length| oracle.get(&key[..length]))
                            .collect::<Vec<_>>()
                    );
                }
                Op::Snapshot => snapshots.push((trie.clone(), oracle.clone())),
            }

            prop_assert_eq!(trie.len(), oracle.len());
            prop_assert_eq!(trie.is_empty(), oracle.is_empty());
        }

        for (trie, oracle) in snapshots {
            let entries = trie.iter().map(|(key, value)| (key, *value)).collect::<Vec<_>>();

            prop_assert_eq!(entries, oracle.into_iter().collect::<Vec<_>>());
        }
    }
}
