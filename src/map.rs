use crate::{
    error::Error,
    hamt::{Hamt, HamtIterator},
    strategy::{DefaultEquivalence, First, KeyEquivalence, RoundHasher, SipRoundHasher},
};
use std::{
    borrow::Borrow,
    fmt::{self, Debug, Display, Formatter, Write},
    sync::Arc,
};

/// Map data structure of HAMT.
///
/// Note that every method does not modify the original map but creates a new
/// one if necessary.
pub struct Map<K, V, H = SipRoundHasher, E = DefaultEquivalence> {
    hamt: Hamt<(K, V), First, H, E>,
}

impl<K, V> Map<K, V> {
    /// Creates a new map.
    pub fn new() -> Self {
        Self::with_hasher_and_equivalence(SipRoundHasher, DefaultEquivalence)
    }
}

impl<K, V, H> Map<K, V, H> {
    /// Creates a new map with a hash function family.
    pub fn with_hasher(hasher: H) -> Self {
        Self::with_hasher_and_equivalence(hasher, DefaultEquivalence)
    }
}

impl<K, V, H, E> Map<K, V, H, E> {
    /// Creates a new map with a hash function family and key equality.
    pub fn with_hasher_and_equivalence(hasher: H, equivalence: E) -> Self {
        Self {
            hamt: Hamt::with_strategy(First, hasher, equivalence),
        }
    }

    /// Sets hash rounds allowed for colliding keys. `None` rehashes
    /// indefinitely.
    #[must_use]
    pub fn with_max_rounds(&self, max_rounds: Option<usize>) -> Self
    where
        H: Clone,
        E: Clone,
    {
        Self {
            hamt: self.hamt.with_max_rounds(max_rounds),
        }
    }

    /// Returns a size of a map.
    pub fn len(&self) -> usize {
        self.hamt.len()
    }

    /// Returns true if a map is empty.
    pub fn is_empty(&self) -> bool {
        self.hamt.is_empty()
    }

    /// Returns true if two maps are the same version.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.hamt.ptr_eq(&other.hamt)
    }

    /// Returns an empty map with the same hasher and key equality.
    #[must_use]
    pub fn clear(&self) -> Self {
        Self {
            hamt: self.hamt.clear(),
        }
    }

    /// Returns key-value pairs in a map.
    pub fn iter(&self) -> MapIterator<'_, K, V> {
        self.into_iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Visits every key-value pair.
    pub fn for_each(&self, mut callback: impl FnMut(&K, &V)) {
        self.hamt.for_each(|(key, value)| callback(key, value))
    }

    /// Writes a node structure in the Graphviz dot language.
    pub fn to_dot(&self, writer: &mut impl Write) -> fmt::Result
    where
        K: Display,
    {
        self.hamt.to_dot(writer)
    }
}

impl<K, V, H: RoundHasher<K>, E: KeyEquivalence<K>> Map<K, V, H, E> {
    /// Finds a value of a key.
    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        self.hamt.get(key).map(|(_, value)| value)
    }

    /// Finds a stored key and its value.
    pub fn get_key_value<Q: ?Sized>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        self.hamt.get(key).map(|(key, value)| (key, value))
    }

    /// Checks if a key is contained in a map.
    pub fn contains_key<Q: ?Sized>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        self.hamt.find(key).is_some()
    }

    /// Inserts a key-value pair into a map.
    ///
    /// The same version is returned if an equal value is already stored for
    /// the key.
    ///
    /// # Panics
    ///
    /// Panics if the key keeps colliding with another one through every
    /// allowed hash round.
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self
    where
        V: PartialEq,
    {
        self.insert_and_get(key, value).0
    }

    /// Inserts a key-value pair and returns the stored pair with a new map.
    ///
    /// # Panics
    ///
    /// Panics if the key keeps colliding with another one through every
    /// allowed hash round.
    #[must_use]
    pub fn insert_and_get(&self, key: K, value: V) -> (Self, Arc<(K, V)>)
    where
        V: PartialEq,
    {
        match self.try_insert(key, value) {
            Ok(result) => result,
            Err(error) => panic!("{error}"),
        }
    }

    /// Inserts a key-value pair or returns an error on exhaustion of hash
    /// rounds.
    pub fn try_insert(&self, key: K, value: V) -> Result<(Self, Arc<(K, V)>), Error>
    where
        V: PartialEq,
    {
        let (hamt, stored) = self
            .hamt
            .try_insert_with((key, value), |(_, old), (_, new)| old == new)?;

        Ok((Self { hamt }, stored))
    }

    /// Inserts a key-value pair replacing any existing one without
    /// comparing values.
    ///
    /// # Panics
    ///
    /// Panics if the key keeps colliding with another one through every
    /// allowed hash round.
    #[must_use]
    pub fn replace(&self, key: K, value: V) -> Self {
        Self {
            hamt: self.hamt.insert((key, value)).0,
        }
    }

    /// Removes a key from a map if any.
    ///
    /// The same version is returned if the key is absent.
    #[must_use]
    pub fn remove<Q: ?Sized>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        Self {
            hamt: self.hamt.remove(key),
        }
    }

    /// Extends a map with an iterator of key-value pairs.
    #[must_use]
    pub fn extend(&self, iterator: impl IntoIterator<Item = (K, V)>) -> Self
    where
        V: PartialEq,
    {
        let mut map = self.clone();

        for (key, value) in iterator {
            map = map.insert(key, value);
        }

        map
    }
}

impl<K, V, H, E> Clone for Map<K, V, H, E> {
    fn clone(&self) -> Self {
        Self {
            hamt: self.hamt.clone(),
        }
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug, V: Debug, H, E> Debug for Map<K, V, H, E> {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V: PartialEq, H: RoundHasher<K>, E: KeyEquivalence<K>> PartialEq for Map<K, V, H, E> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K, V: Eq, H: RoundHasher<K>, E: KeyEquivalence<K>> Eq for Map<K, V, H, E> {}

impl<K, V: PartialEq> FromIterator<(K, V)> for Map<K, V>
where
    SipRoundHasher: RoundHasher<K>,
    DefaultEquivalence: KeyEquivalence<K>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iterator: I) -> Self {
        Self::new().extend(iterator)
    }
}

pub struct MapIterator<'a, K: 'a, V: 'a>(HamtIterator<'a, (K, V)>);

impl<'a, K, V> Iterator for MapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, value)| (key, value))
    }
}

impl<'a, K, V, H, E> IntoIterator for &'a Map<K, V, H, E> {
    type IntoIter = MapIterator<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        MapIterator(self.hamt.iter())
    }
}
