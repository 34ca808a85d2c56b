use crate::{
    error::Error,
    hamt::{Hamt, HamtIterator},
    strategy::{DefaultEquivalence, Identity, KeyEquivalence, RoundHasher, SipRoundHasher},
};
use std::{
    borrow::Borrow,
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

/// Set data structure of HAMT.
///
/// Note that every method does not modify the original set but creates a new
/// one if necessary.
pub struct Set<T, H = SipRoundHasher, E = DefaultEquivalence> {
    hamt: Hamt<T, Identity, H, E>,
}

impl<T> Set<T> {
    /// Creates a new set.
    pub fn new() -> Self {
        Self::with_hasher_and_equivalence(SipRoundHasher, DefaultEquivalence)
    }
}

impl<T, H> Set<T, H> {
    /// Creates a new set with a hash function family.
    pub fn with_hasher(hasher: H) -> Self {
        Self::with_hasher_and_equivalence(hasher, DefaultEquivalence)
    }
}

impl<T, H, E> Set<T, H, E> {
    /// Creates a new set with a hash function family and value equality.
    pub fn with_hasher_and_equivalence(hasher: H, equivalence: E) -> Self {
        Self {
            hamt: Hamt::with_strategy(Identity, hasher, equivalence),
        }
    }

    /// Sets hash rounds allowed for colliding values. `None` rehashes
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

    /// Returns a size of a set.
    pub fn len(&self) -> usize {
        self.hamt.len()
    }

    /// Returns true if a set is empty.
    pub fn is_empty(&self) -> bool {
        self.hamt.is_empty()
    }

    /// Returns true if two sets are the same version.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.hamt.ptr_eq(&other.hamt)
    }

    /// Returns values in a set.
    pub fn iter(&self) -> SetIterator<'_, T> {
        self.into_iter()
    }

    /// Visits every value.
    pub fn for_each(&self, callback: impl FnMut(&T)) {
        self.hamt.for_each(callback)
    }
}

impl<T, H: RoundHasher<T>, E: KeyEquivalence<T>> Set<T, H, E> {
    /// Checks if a value is contained in a set.
    pub fn contains<Q: ?Sized>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        self.hamt.find(value).is_some()
    }

    /// Finds a stored value equal to a given one.
    pub fn get<Q: ?Sized>(&self, value: &Q) -> Option<&Arc<T>>
    where
        T: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        self.hamt.find(value)
    }

    /// Inserts a value into a set.
    ///
    /// The same version is returned if an equal value is already stored.
    ///
    /// # Panics
    ///
    /// Panics if the value keeps colliding with another one through every
    /// allowed hash round.
    #[must_use]
    pub fn insert(&self, value: T) -> Self {
        match self.try_insert(value) {
            Ok((set, _)) => set,
            Err(error) => panic!("{error}"),
        }
    }

    /// Inserts a value or returns an error on exhaustion of hash rounds.
    ///
    /// The stored value is an equal one already in the set if any.
    pub fn try_insert(&self, value: T) -> Result<(Self, Arc<T>), Error> {
        let (hamt, stored) = self.hamt.try_insert_with(value, |_, _| true)?;

        Ok((Self { hamt }, stored))
    }

    /// Inserts a value into a set replacing an equal one if any.
    ///
    /// # Panics
    ///
    /// Panics if the value keeps colliding with another one through every
    /// allowed hash round.
    #[must_use]
    pub fn replace(&self, value: T) -> Self {
        Self {
            hamt: self.hamt.insert(value).0,
        }
    }

    /// Removes a value from a set if any.
    ///
    /// The same version is returned if the value is absent.
    #[must_use]
    pub fn remove<Q: ?Sized>(&self, value: &Q) -> Self
    where
        T: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        Self {
            hamt: self.hamt.remove(value),
        }
    }

    /// Extends a set with an iterator of values.
    #[must_use]
    pub fn extend(&self, iterator: impl IntoIterator<Item = T>) -> Self {
        let mut set = self.clone();

        for value in iterator {
            set = set.insert(value);
        }

        set
    }
}

impl<T: Clone, H: RoundHasher<T>, E: KeyEquivalence<T>> Set<T, H, E> {
    /// Calculate intersection of two sets.
    pub fn intersection(&self, other: &Self) -> Self {
        self.filter(|value| other.contains(value))
    }

    /// Calculate difference of two sets.
    pub fn difference(&self, other: &Self) -> Self {
        self.filter(|value| !other.contains(value))
    }

    /// Calculate union of two sets.
    pub fn union(&self, other: &Self) -> Self {
        let (small, large) = if self.len() < other.len() {
            (self, other)
        } else {
            (other, self)
        };

        large.extend(small.difference(large).iter().cloned())
    }

    fn filter(&self, predicate: impl Fn(&T) -> bool) -> Self {
        Self {
            hamt: self.hamt.clear(),
        }
        .extend(self.iter().filter(|&value| predicate(value)).cloned())
    }
}

impl<T, H, E> Clone for Set<T, H, E> {
    fn clone(&self) -> Self {
        Self {
            hamt: self.hamt.clone(),
        }
    }
}

impl<T> Default for Set<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug, H, E> Debug for Set<T, H, E> {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

impl<T, H: RoundHasher<T>, E: KeyEquivalence<T>> PartialEq for Set<T, H, E> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|value| other.contains(value))
    }
}

impl<T, H: RoundHasher<T>, E: KeyEquivalence<T>> Eq for Set<T, H, E> {}

impl<T> FromIterator<T> for Set<T>
where
    SipRoundHasher: RoundHasher<T>,
    DefaultEquivalence: KeyEquivalence<T>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iterator: I) -> Self {
        Self::new().extend(iterator)
    }
}

pub struct SetIterator<'a, T: 'a>(HamtIterator<'a, T>);

impl<'a, T> Iterator for SetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl<'a, T, H, E> IntoIterator for &'a Set<T, H, E> {
    type IntoIter = SetIterator<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        SetIterator(self.hamt.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::Set;
    use rand::{random, rng, seq::SliceRandom};
    use std::{sync::Arc, thread::spawn};

    const ITERATION_COUNT: usize = 1 << 12;

    #[test]
    fn new() {
        Set::<u8>::new();
    }

    #[test]
    fn insert() {
        let set = Set::new();

        assert_eq!(set.len(), 0);
        assert_eq!(set.insert(0).len(), 1);
        assert_eq!(set.insert(0).insert(0).len(), 1);
        assert_eq!(set.insert(0).insert(1).len(), 2);
    }

    #[test]
    fn insert_many_in_order() {
        let mut set = Set::new();

        for index in 0..ITERATION_COUNT {
            set = set.insert(index);
            assert_eq!(set.len(), index + 1);
        }
    }

    #[test]
    fn remove() {
        let set = Set::new();

        assert_eq!(set.insert(0).remove(&0), set);
        assert_eq!(set.insert(0).remove(&1), set.insert(0));
        assert_eq!(set.insert(0).insert(1).remove(&0), set.insert(1));
        assert_eq!(set.insert(0).insert(1).remove(&1), set.insert(0));
        assert_eq!(set.insert(0).insert(1).remove(&2), set.insert(0).insert(1));
    }

    #[test]
    fn remove_absent_value() {
        let set = Set::new().insert(0);

        assert!(set.remove(&1).ptr_eq(&set));
    }

    #[test]
    fn insert_remove_many() {
        let mut set = Set::<i16>::new();

        for _ in 0..ITERATION_COUNT {
            let value = random();
            let size = set.len();
            let found = set.contains(&value);

            if random() {
                set = set.insert(value);

                assert_eq!(set.len(), if found { size } else { size + 1 });
                assert!(set.contains(&value));
            } else {
                set = set.remove(&value);

                assert_eq!(set.len(), if found { size - 1 } else { size });
                assert!(!set.contains(&value));
            }
        }
    }

    #[test]
    fn contains() {
        let set = Set::new();

        assert!(set.insert(0).contains(&0));
        assert!(!set.insert(0).contains(&1));
        assert!(!set.insert(1).contains(&0));
        assert!(set.insert(0).insert(1).contains(&0));
        assert!(!set.insert(0).insert(1).contains(&2));
    }

    #[test]
    fn contains_borrowed() {
        assert!(Set::<String>::new()
            .insert("foo".to_string())
            .contains("foo"));
    }

    #[test]
    fn replace_equal_value() {
        #[derive(Debug)]
        struct Item {
            key: u32,
            payload: &'static str,
        }

        let set = Set::with_hasher_and_equivalence(
            |item: &Item, round: usize| crate::utilities::hash_key(&item.key, round),
            |one: &Item, other: &Item| one.key == other.key,
        );
        let item = |payload| Item { key: 1, payload };
        let set = set.insert(item("foo"));
        let (other, stored) = set.try_insert(item("bar")).unwrap();

        assert!(other.ptr_eq(&set));
        assert_eq!(stored.payload, "foo");

        let other = set.replace(item("bar"));

        assert_eq!(other.len(), 1);
        assert_eq!(other.get(&item("baz")).unwrap().payload, "bar");
        assert_eq!(set.get(&item("baz")).unwrap().payload, "foo");
    }

    #[test]
    fn insert_existing_value() {
        let set = Set::new().insert(7u32);

        assert!(set.insert(7).ptr_eq(&set));
        assert!(set.insert(7).insert(7).ptr_eq(&set));
        assert!(!set.insert(8).ptr_eq(&set));
        assert!(!set.replace(7).ptr_eq(&set));
        assert_eq!(set.replace(7), set);
    }

    #[test]
    fn intersection() {
        assert_eq!(
            Set::new().insert(42).intersection(&Set::new().insert(42)),
            Set::new().insert(42)
        );
        assert_eq!(Set::new().insert(42).intersection(&Set::new()), Set::new());
        assert_eq!(
            Set::new()
                .insert(1)
                .insert(2)
                .insert(3)
                .insert(4)
                .intersection(&Set::new().insert(1).insert(3)),
            Set::new().insert(1).insert(3)
        );
    }

    #[test]
    fn difference() {
        assert_eq!(
            Set::new().insert(42).difference(&Set::new().insert(42)),
            Set::new()
        );
        assert_eq!(
            Set::new().insert(42).difference(&Set::new()),
            Set::new().insert(42)
        );
        assert_eq!(
            Set::new()
                .insert(1)
                .insert(2)
                .insert(3)
                .insert(4)
                .difference(&Set::new().insert(1).insert(3)),
            Set::new().insert(2).insert(4)
        );
    }

    #[test]
    fn union() {
        assert_eq!(
            Set::new().insert(1).union(&Set::new().insert(2).insert(3)),
            Set::new().insert(1).insert(2).insert(3)
        );
        assert_eq!(Set::<u8>::new().union(&Set::new()), Set::new());
    }

    #[test]
    fn equality() {
        for _ in 0..8 {
            let mut sets: [Set<i16>; 2] = [Set::new(), Set::new()];
            let mut inserted_values: Vec<i16> = (0..ITERATION_COUNT).map(|_| random()).collect();
            let mut deleted_values: Vec<i16> = (0..ITERATION_COUNT).map(|_| random()).collect();

            for set in sets.iter_mut() {
                inserted_values.shuffle(&mut rng());
                deleted_values.shuffle(&mut rng());

                for value in &inserted_values {
                    *set = set.insert(*value);
                }

                for value in &deleted_values {
                    *set = set.remove(value);
                }
            }

            assert_eq!(sets[0], sets[1]);
        }
    }

    #[test]
    fn send_and_sync() {
        let set: Set<usize> = Set::new();
        spawn(move || set);

        let set: Set<String> = Set::new();
        spawn(move || set);
    }

    #[test]
    fn extend() {
        assert_eq!(Set::<usize>::new().insert(0), Set::new().extend([0]));
    }

    mod into_iterator {
        use super::*;

        #[test]
        fn iterate_borrowed() {
            for _ in &Set::<usize>::new() {}
        }

        #[test]
        fn for_each() {
            let set = Set::new().extend(0..10usize);
            let mut sum = 0;

            set.for_each(|value| sum += value);

            assert_eq!(sum, 45);
            assert_eq!(set.iter().sum::<usize>(), 45);
        }
    }

    mod from_iterator {
        use super::*;

        #[test]
        fn collect_empty() {
            assert_eq!(Set::<usize>::new(), [].into_iter().collect());
        }

        #[test]
        fn collect_one_element() {
            assert_eq!(Set::<usize>::new().insert(0), [0].into_iter().collect());
        }

        #[test]
        fn collect_with_reversed_order() {
            assert_eq!(
                Set::<usize>::new().insert(0).insert(1),
                [1, 0].into_iter().collect()
            );
        }

        #[test]
        fn collect_duplicate_values() {
            assert_eq!(Set::<usize>::new().insert(0), [0, 0].into_iter().collect());
        }

        #[test]
        fn collect_many_elements() {
            let values = (0..100).collect::<Vec<_>>();
            let mut set = Set::<usize>::new();

            for &value in &values {
                set = set.insert(value);
            }

            assert_eq!(set, values.into_iter().collect());
        }
    }
}
