use crate::{
    bitmap::Bitmap,
    error::Error,
    strategy::{KeyEquivalence, KeyExtractor, RoundHasher},
    utilities::{hash_field, hash_round, inserted, is_round_boundary, removed, replaced},
};
use log::{trace, warn};
use std::{
    borrow::Borrow,
    fmt::{self, Debug, Display, Formatter, Write},
    slice,
    sync::Arc,
};

/// Hash rounds allowed for colliding keys unless configured otherwise.
pub const DEFAULT_MAX_ROUNDS: usize = 64;

#[derive(Debug)]
enum Entry<T> {
    Leaf(Arc<T>),
    Node(Arc<Node<T>>),
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Leaf(leaf) => Self::Leaf(leaf.clone()),
            Self::Node(node) => Self::Node(node.clone()),
        }
    }
}

impl<T> Entry<T> {
    fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Leaf(one), Self::Leaf(other)) => Arc::ptr_eq(one, other),
            (Self::Node(one), Self::Node(other)) => Arc::ptr_eq(one, other),
            _ => false,
        }
    }
}

/// Branch node whose `n`th entry corresponds to the `n`th set bit of its
/// bitmap.
#[derive(Debug)]
struct Node<T> {
    bitmap: Bitmap,
    entries: Box<[Entry<T>]>,
}

impl<T> Node<T> {
    fn new() -> Self {
        Self {
            bitmap: Bitmap::new(),
            entries: Default::default(),
        }
    }

    fn singleton(bits: u8, entry: Entry<T>) -> Self {
        Self {
            bitmap: Bitmap::new().set(bits),
            entries: Box::new([entry]),
        }
    }

    fn pair(one_bits: u8, one: Entry<T>, other_bits: u8, other: Entry<T>) -> Self {
        debug_assert_ne!(one_bits, other_bits);

        Self {
            bitmap: Bitmap::new().set(one_bits).set(other_bits),
            entries: Box::new(if one_bits < other_bits {
                [one, other]
            } else {
                [other, one]
            }),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, bits: u8) -> Option<&Entry<T>> {
        self.bitmap
            .get(bits)
            .then(|| &self.entries[self.bitmap.index(bits)])
    }

    fn set(self: &Arc<Self>, bits: u8, entry: Entry<T>) -> Arc<Self> {
        let index = self.bitmap.index(bits);

        if !self.bitmap.get(bits) {
            Self {
                bitmap: self.bitmap.set(bits),
                entries: inserted(&self.entries, index, entry),
            }
            .into()
        } else if self.entries[index].ptr_eq(&entry) {
            self.clone()
        } else {
            Self {
                bitmap: self.bitmap,
                entries: replaced(&self.entries, index, entry),
            }
            .into()
        }
    }

    fn clear(self: &Arc<Self>, bits: u8) -> Arc<Self> {
        if self.bitmap.get(bits) {
            Self {
                bitmap: self.bitmap.unset(bits),
                entries: removed(&self.entries, self.bitmap.index(bits)),
            }
            .into()
        } else {
            self.clone()
        }
    }
}

#[derive(Debug)]
struct Context<X, H, E> {
    extractor: X,
    hasher: H,
    equivalence: E,
    max_rounds: Option<usize>,
}

impl<X, H, E> Context<X, H, E> {
    fn check_round(&self, round: usize) -> Result<(), Error> {
        match self.max_rounds {
            Some(rounds) if round >= rounds => {
                warn!("hash codes of distinct keys still collide after {rounds} rounds");
                Err(Error::HashExhausted { rounds })
            }
            _ => Ok(()),
        }
    }
}

struct Insertion<T> {
    stored: Arc<T>,
    replaced: bool,
}

/// Persistent bitmap trie of values keyed through a [`KeyExtractor`].
///
/// Every update returns a new trie and leaves the original one untouched.
/// Sub-trees not on an updated path are shared between the two.
pub struct Hamt<T, X, H, E> {
    root: Arc<Node<T>>,
    size: usize,
    context: Arc<Context<X, H, E>>,
}

impl<T, X, H, E> Clone for Hamt<T, X, H, E> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            size: self.size,
            context: self.context.clone(),
        }
    }
}

impl<T, X: Default, H: Default, E: Default> Default for Hamt<T, X, H, E> {
    fn default() -> Self {
        Self::with_strategy(X::default(), H::default(), E::default())
    }
}

impl<T, X, H, E> Hamt<T, X, H, E> {
    pub fn with_strategy(extractor: X, hasher: H, equivalence: E) -> Self {
        Self {
            root: Node::new().into(),
            size: 0,
            context: Context {
                extractor,
                hasher,
                equivalence,
                max_rounds: Some(DEFAULT_MAX_ROUNDS),
            }
            .into(),
        }
    }

    /// Sets hash rounds allowed for colliding keys. `None` rehashes
    /// indefinitely.
    #[must_use]
    pub fn with_max_rounds(&self, max_rounds: Option<usize>) -> Self
    where
        X: Clone,
        H: Clone,
        E: Clone,
    {
        Self {
            root: self.root.clone(),
            size: self.size,
            context: Context {
                extractor: self.context.extractor.clone(),
                hasher: self.context.hasher.clone(),
                equivalence: self.context.equivalence.clone(),
                max_rounds,
            }
            .into(),
        }
    }

    pub fn max_rounds(&self) -> Option<usize> {
        self.context.max_rounds
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Checks if two tries are the same version.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// Returns an empty trie with the same configuration.
    #[must_use]
    pub fn clear(&self) -> Self {
        Self {
            root: Node::new().into(),
            size: 0,
            context: self.context.clone(),
        }
    }

    pub fn iter(&self) -> HamtIterator<'_, T> {
        HamtIterator(vec![self.root.entries.iter()])
    }

    /// Visits every value in ascending order of bits at each level.
    pub fn for_each(&self, mut callback: impl FnMut(&T)) {
        Self::for_each_in(&self.root, &mut callback);
    }

    fn for_each_in(node: &Node<T>, callback: &mut impl FnMut(&T)) {
        for entry in node.entries.iter() {
            match entry {
                Entry::Leaf(leaf) => callback(&**leaf),
                Entry::Node(node) => Self::for_each_in(node, callback),
            }
        }
    }
}

impl<T, X: KeyExtractor<T>, H, E> Hamt<T, X, H, E> {
    fn matches<Q: ?Sized>(&self, key: &Q, value: &T) -> bool
    where
        X::Key: Borrow<Q>,
        E: KeyEquivalence<Q>,
    {
        self.context
            .equivalence
            .equivalent(key, self.context.extractor.key(value).borrow())
    }

    /// Finds a stored value by its key.
    pub fn find<Q: ?Sized>(&self, key: &Q) -> Option<&Arc<T>>
    where
        X::Key: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        let mut node = &self.root;
        let mut hash = self.context.hasher.hash(key, 0);
        let mut level = 0;

        loop {
            match node.get(hash_field(hash, level))? {
                Entry::Leaf(leaf) => return self.matches(key, leaf).then_some(leaf),
                Entry::Node(child) => {
                    node = child;
                    level += 1;

                    if is_round_boundary(level) {
                        hash = self.context.hasher.hash(key, hash_round(level));
                    }
                }
            }
        }
    }

    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&T>
    where
        X::Key: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        self.find(key).map(|leaf| &**leaf)
    }

    /// Removes a value by its key.
    ///
    /// The same version is returned if the key is absent.
    #[must_use]
    pub fn remove<Q: ?Sized>(&self, key: &Q) -> Self
    where
        X::Key: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        self.remove_entry(key)
            .map(|(hamt, _)| hamt)
            .unwrap_or_else(|| self.clone())
    }

    /// Removes a value by its key and returns it with a new trie.
    pub fn remove_entry<Q: ?Sized>(&self, key: &Q) -> Option<(Self, Arc<T>)>
    where
        X::Key: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        let mut path = vec![];
        let mut node = &self.root;
        let mut hash = self.context.hasher.hash(key, 0);
        let mut level = 0;

        let (last, bits, leaf) = loop {
            let bits = hash_field(hash, level);

            match node.get(bits)? {
                Entry::Leaf(leaf) => {
                    if !self.matches(key, leaf) {
                        return None;
                    }

                    break (node, bits, leaf.clone());
                }
                Entry::Node(child) => {
                    path.push((node, bits));
                    node = child;
                    level += 1;

                    if is_round_boundary(level) {
                        hash = self.context.hasher.hash(key, hash_round(level));
                    }
                }
            }
        };

        let Some((mut parent, mut parent_bits)) = path.pop() else {
            return Some((self.with_root(last.clear(bits), self.size - 1), leaf));
        };

        // A replacement of the last node in its parent. `None` drops the slot.
        let entry = match last.len() {
            1 => None,
            2 => match &last.entries[1 - last.bitmap.index(bits)] {
                Entry::Leaf(sibling) => Some(Entry::Leaf(sibling.clone())),
                Entry::Node(_) => Some(Entry::Node(last.clear(bits))),
            },
            _ => Some(Entry::Node(last.clear(bits))),
        };

        if !matches!(entry, Some(Entry::Node(_))) {
            // Skip pass-through nodes left by merges of colliding keys.
            while parent.len() == 1 {
                let Some(ancestor) = path.pop() else {
                    break;
                };

                (parent, parent_bits) = ancestor;
            }
        }

        let mut node = match entry {
            Some(entry) => parent.set(parent_bits, entry),
            None => parent.clear(parent_bits),
        };

        while let Some((ancestor, bits)) = path.pop() {
            node = ancestor.set(bits, Entry::Node(node));
        }

        Some((self.with_root(node, self.size - 1), leaf))
    }

    fn with_root(&self, root: Arc<Node<T>>, size: usize) -> Self {
        Self {
            root,
            size,
            context: self.context.clone(),
        }
    }

    /// Writes a node structure in the Graphviz dot language.
    pub fn to_dot(&self, writer: &mut impl Write) -> fmt::Result
    where
        X::Key: Display,
    {
        writeln!(writer, "digraph {{")?;
        writeln!(
            writer,
            "graph [pad=\"0.5\", nodesep=\"0.5\", ranksep=\"2\"];"
        )?;
        writeln!(writer, "node [shape=plain]")?;
        writeln!(writer, "rankdir=LR;")?;
        writeln!(writer)?;
        self.write_dot_node(&self.root, writer)?;
        writeln!(writer, "}}")
    }

    fn write_dot_node(&self, node: &Arc<Node<T>>, writer: &mut impl Write) -> Result<String, fmt::Error>
    where
        X::Key: Display,
    {
        let name = format!("node_{:p}", Arc::as_ptr(node));

        writeln!(writer, "{name} [label=<")?;
        writeln!(
            writer,
            "  <table border=\"0\" cellborder=\"1\" cellspacing=\"0\">"
        )?;
        writeln!(writer, "    <tr><td><b><i>{name}</i></b></td></tr>")?;

        for bits in node.bitmap.iter() {
            writeln!(writer, "    <tr><td port=\"{bits}\">{bits}</td></tr>")?;
        }

        writeln!(writer, "  </table>>];")?;

        for (bits, entry) in node.bitmap.iter().zip(node.entries.iter()) {
            let child = match entry {
                Entry::Leaf(leaf) => format!("\"leaf_{}\"", self.context.extractor.key(leaf)),
                Entry::Node(child) => self.write_dot_node(child, writer)?,
            };

            writeln!(writer, "    {name}:{bits} -> {child}")?;
        }

        Ok(name)
    }
}

impl<T, X, H, E> Hamt<T, X, H, E>
where
    X: KeyExtractor<T>,
    H: RoundHasher<X::Key>,
    E: KeyEquivalence<X::Key>,
{
    /// Inserts a value and returns a new trie with the stored value.
    ///
    /// A value of an existing key is replaced unless `unchanged` holds for
    /// the old and new values, in which case the same version and the old
    /// value are returned.
    pub fn try_insert_with(
        &self,
        value: T,
        unchanged: impl Fn(&T, &T) -> bool,
    ) -> Result<(Self, Arc<T>), Error> {
        let leaf = Arc::new(value);
        let hash = self.context.hasher.hash(self.context.extractor.key(&leaf), 0);
        let (root, insertion) = self.insert_leaf(&self.root, leaf, hash, 0, &unchanged)?;

        Ok((
            self.with_root(
                root,
                self.size + if insertion.replaced { 0 } else { 1 },
            ),
            insertion.stored,
        ))
    }

    pub fn try_insert(&self, value: T) -> Result<(Self, Arc<T>), Error> {
        self.try_insert_with(value, |_, _| false)
    }

    /// Inserts a value, replacing a value of the same key if any.
    ///
    /// # Panics
    ///
    /// Panics if the key still collides with another one after the maximum
    /// number of hash rounds.
    #[must_use]
    pub fn insert(&self, value: T) -> (Self, Arc<T>) {
        match self.try_insert(value) {
            Ok(result) => result,
            Err(error) => panic!("{error}"),
        }
    }

    fn insert_leaf(
        &self,
        node: &Arc<Node<T>>,
        leaf: Arc<T>,
        hash: u64,
        level: usize,
        unchanged: &impl Fn(&T, &T) -> bool,
    ) -> Result<(Arc<Node<T>>, Insertion<T>), Error> {
        let context = &*self.context;
        let bits = hash_field(hash, level);

        match node.get(bits) {
            None => Ok((
                node.set(bits, Entry::Leaf(leaf.clone())),
                Insertion {
                    stored: leaf,
                    replaced: false,
                },
            )),
            Some(Entry::Node(child)) => {
                let level = level + 1;
                let hash = if is_round_boundary(level) {
                    context
                        .hasher
                        .hash(context.extractor.key(&leaf), hash_round(level))
                } else {
                    hash
                };
                let (child, insertion) = self.insert_leaf(child, leaf, hash, level, unchanged)?;

                Ok((node.set(bits, Entry::Node(child)), insertion))
            }
            Some(Entry::Leaf(old)) => {
                let key = context.extractor.key(&leaf);

                if context.equivalence.equivalent(key, context.extractor.key(old)) {
                    return Ok(if unchanged(&**old, &*leaf) {
                        (
                            node.clone(),
                            Insertion {
                                stored: old.clone(),
                                replaced: true,
                            },
                        )
                    } else {
                        (
                            node.set(bits, Entry::Leaf(leaf.clone())),
                            Insertion {
                                stored: leaf,
                                replaced: true,
                            },
                        )
                    });
                }

                let level = level + 1;
                let round = hash_round(level);
                context.check_round(round)?;

                let old_hash = context.hasher.hash(context.extractor.key(old), round);
                let hash = if is_round_boundary(level) {
                    context.hasher.hash(key, round)
                } else {
                    hash
                };
                let child = self.merge(old.clone(), old_hash, leaf.clone(), hash, level)?;

                Ok((
                    node.set(bits, Entry::Node(child.into())),
                    Insertion {
                        stored: leaf,
                        replaced: false,
                    },
                ))
            }
        }
    }

    /// Builds a sub-trie of two leaves with distinct keys. Leaves sharing
    /// bits at a level get a chain of single-entry nodes above them.
    fn merge(
        &self,
        one: Arc<T>,
        mut one_hash: u64,
        other: Arc<T>,
        mut other_hash: u64,
        mut level: usize,
    ) -> Result<Node<T>, Error> {
        let context = &*self.context;
        let mut shared = vec![];

        loop {
            let one_bits = hash_field(one_hash, level);
            let other_bits = hash_field(other_hash, level);

            if one_bits != other_bits {
                let mut node = Node::pair(one_bits, Entry::Leaf(one), other_bits, Entry::Leaf(other));

                for bits in shared.into_iter().rev() {
                    node = Node::singleton(bits, Entry::Node(node.into()));
                }

                return Ok(node);
            }

            shared.push(one_bits);
            level += 1;

            if is_round_boundary(level) {
                let round = hash_round(level);

                trace!("rehashing colliding keys in round {round}");
                context.check_round(round)?;

                one_hash = context.hasher.hash(context.extractor.key(&one), round);
                other_hash = context.hasher.hash(context.extractor.key(&other), round);
            }
        }
    }
}

impl<T: Debug, X, H, E> Debug for Hamt<T, X, H, E> {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

#[derive(Debug)]
pub struct HamtIterator<'a, T>(Vec<slice::Iter<'a, Entry<T>>>);

impl<'a, T> Iterator for HamtIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.0.last_mut()?.next() {
                None => {
                    self.0.pop();
                }
                Some(Entry::Leaf(leaf)) => return Some(&**leaf),
                Some(Entry::Node(node)) => self.0.push(node.entries.iter()),
            }
        }
    }
}

impl<'a, T, X, H, E> IntoIterator for &'a Hamt<T, X, H, E> {
    type IntoIter = HamtIterator<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
impl<T, X: KeyExtractor<T>, H, E> Hamt<T, X, H, E> {
    pub(crate) fn entry_count(&self) -> usize {
        fn count<T>(node: &Node<T>) -> usize {
            node.entries
                .iter()
                .map(|entry| match entry {
                    Entry::Leaf(_) => 1,
                    Entry::Node(node) => count(node),
                })
                .sum()
        }

        count(&self.root)
    }

    pub(crate) fn is_normal(&self) -> bool {
        fn check<T>(node: &Node<T>, root: bool) -> bool {
            node.len() == node.bitmap.size()
                && (root || node.len() > 1 || matches!(&*node.entries, [Entry::Node(_)]))
                && node.entries.iter().all(|entry| match entry {
                    Entry::Leaf(_) => true,
                    Entry::Node(node) => check(node, false),
                })
        }

        check(&self.root, true)
    }

    /// Returns a number of nodes above a leaf of a key excluding the root.
    fn depth<Q: ?Sized>(&self, key: &Q) -> Option<usize>
    where
        X::Key: Borrow<Q>,
        H: RoundHasher<Q>,
        E: KeyEquivalence<Q>,
    {
        self.find(key)?;

        let mut node = &self.root;
        let mut hash = self.context.hasher.hash(key, 0);
        let mut level = 0;

        while let Some(Entry::Node(child)) = node.get(hash_field(hash, level)) {
            node = child;
            level += 1;

            if is_round_boundary(level) {
                hash = self.context.hasher.hash(key, hash_round(level));
            }
        }

        Some(level)
    }
}
