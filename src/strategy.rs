//! Construction-time configuration of bitmap tries.
//!
//! A trie never looks at its elements directly. It asks a [`KeyExtractor`]
//! for the key of each stored value, a [`RoundHasher`] for hash codes of keys
//! and a [`KeyEquivalence`] whether two keys are the same.

use crate::utilities::hash_key;
use std::hash::Hash;

/// Extracts a key from a stored value.
pub trait KeyExtractor<T> {
    type Key: ?Sized;

    fn key<'a>(&self, value: &'a T) -> &'a Self::Key;
}

/// Hash function family indexed by round numbers.
///
/// Codes of different rounds for the same key should be independent. A trie
/// consumes a code 6 bits at a time and asks for the code of the next round
/// once every usable bit is consumed, so two distinct keys must eventually
/// get different codes.
pub trait RoundHasher<K: ?Sized> {
    fn hash(&self, key: &K, round: usize) -> u64;
}

/// Equality of keys.
pub trait KeyEquivalence<K: ?Sized> {
    fn equivalent(&self, one: &K, other: &K) -> bool;
}

/// Uses a whole value as its key.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<T> KeyExtractor<T> for Identity {
    type Key = T;

    fn key<'a>(&self, value: &'a T) -> &'a T {
        value
    }
}

/// Uses the first element of a pair as its key.
#[derive(Clone, Copy, Debug, Default)]
pub struct First;

impl<K, V> KeyExtractor<(K, V)> for First {
    type Key = K;

    fn key<'a>(&self, (key, _): &'a (K, V)) -> &'a K {
        key
    }
}

/// SipHash of a key followed by a round number.
#[derive(Clone, Copy, Debug, Default)]
pub struct SipRoundHasher;

impl<K: Hash + ?Sized> RoundHasher<K> for SipRoundHasher {
    fn hash(&self, key: &K, round: usize) -> u64 {
        hash_key(key, round)
    }
}

impl<K: ?Sized, F: Fn(&K, usize) -> u64> RoundHasher<K> for F {
    fn hash(&self, key: &K, round: usize) -> u64 {
        self(key, round)
    }
}

/// Equality of keys by [`Eq`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultEquivalence;

impl<K: Eq + ?Sized> KeyEquivalence<K> for DefaultEquivalence {
    fn equivalent(&self, one: &K, other: &K) -> bool {
        one == other
    }
}

impl<K: ?Sized, F: Fn(&K, &K) -> bool> KeyEquivalence<K> for F {
    fn equivalent(&self, one: &K, other: &K) -> bool {
        self(one, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_keys() {
        assert_eq!(Identity.key(&42), &42);
        assert_eq!(First.key(&("foo", 42)), &"foo");
    }

    #[test]
    fn hash_with_closure() {
        let hasher = |key: &u64, round: usize| key + round as u64;

        assert_eq!(hasher.hash(&1u64, 0), 1);
        assert_eq!(hasher.hash(&1u64, 2), 3);
    }

    #[test]
    fn hash_with_sip() {
        assert_eq!(
            RoundHasher::<str>::hash(&SipRoundHasher, "foo", 0),
            hash_key("foo", 0)
        );
        assert_ne!(
            RoundHasher::<str>::hash(&SipRoundHasher, "foo", 0),
            RoundHasher::<str>::hash(&SipRoundHasher, "foo", 1)
        );
    }

    #[test]
    fn compare_keys() {
        assert!(DefaultEquivalence.equivalent(&1, &1));
        assert!(!DefaultEquivalence.equivalent(&1, &2));

        let case_insensitive = |one: &String, other: &String| one.eq_ignore_ascii_case(other);

        assert!(case_insensitive.equivalent(&String::from("Foo"), &String::from("fOO")));
    }
}
