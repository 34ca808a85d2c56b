use crate::{
    bitmap::ByteBitmap,
    utilities::{inserted, removed, replaced},
};
use std::{
    fmt::{self, Debug, Formatter, Write},
    mem,
    sync::Arc,
};

#[derive(Debug)]
struct Node<V> {
    value: Option<Arc<V>>,
    bitmap: ByteBitmap,
    children: Box<[Arc<Node<V>>]>,
}

impl<V> Node<V> {
    fn leaf(value: Arc<V>) -> Self {
        Self {
            value: Some(value),
            bitmap: ByteBitmap::new(),
            children: Default::default(),
        }
    }

    fn branch(byte: u8, child: Arc<Self>) -> Self {
        Self {
            value: None,
            bitmap: ByteBitmap::new().set(byte),
            children: Box::new([child]),
        }
    }

    fn child(&self, byte: u8) -> Option<&Arc<Self>> {
        self.bitmap
            .get(byte)
            .then(|| &self.children[self.bitmap.index(byte)])
    }

    fn with_value(&self, value: Option<Arc<V>>) -> Self {
        Self {
            value,
            bitmap: self.bitmap,
            children: self.children.clone(),
        }
    }

    fn set(&self, byte: u8, child: Arc<Self>) -> Self {
        let index = self.bitmap.index(byte);

        Self {
            value: self.value.clone(),
            bitmap: self.bitmap.set(byte),
            children: if self.bitmap.get(byte) {
                replaced(&self.children, index, child)
            } else {
                inserted(&self.children, index, child)
            },
        }
    }

    fn clear(&self, byte: u8) -> Self {
        Self {
            value: self.value.clone(),
            bitmap: self.bitmap.unset(byte),
            children: removed(&self.children, self.bitmap.index(byte)),
        }
    }
}

impl<V> Drop for Node<V> {
    fn drop(&mut self) {
        let mut children = mem::take(&mut self.children).into_vec();

        while let Some(child) = children.pop() {
            if let Ok(mut node) = Arc::try_unwrap(child) {
                children.extend(mem::take(&mut node.children).into_vec());
            }
        }
    }
}

/// Persistent trie keyed by byte sequences.
///
/// Note that every method does not modify the original trie but creates a new
/// one if necessary.
pub struct PrefixTrie<V> {
    root: Option<Arc<Node<V>>>,
    size: usize,
}

impl<V> PrefixTrie<V> {
    /// Creates a new trie.
    pub const fn new() -> Self {
        Self {
            root: None,
            size: 0,
        }
    }

    /// Returns a number of keys in a trie.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if a trie is empty.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns true if two tries are the same version.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(one), Some(other)) => Arc::ptr_eq(one, other),
            (None, None) => true,
            _ => false,
        }
    }

    /// Finds a value of a key.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        let mut node = self.root.as_deref()?;

        for &byte in key.as_ref() {
            node = node.child(byte)?;
        }

        node.value.as_deref()
    }

    /// Checks if a key is contained in a trie.
    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.get(key).is_some()
    }

    /// Finds values of all keys that are prefixes of a given key from the
    /// shortest to the longest.
    pub fn find_prefix(&self, key: impl AsRef<[u8]>) -> Vec<&V> {
        self.prefixes(key.as_ref())
            .into_iter()
            .map(|(_, value)| value)
            .collect()
    }

    /// Finds a value of the longest key that is a prefix of a given key
    /// together with the key's length.
    pub fn longest_prefix(&self, key: impl AsRef<[u8]>) -> Option<(usize, &V)> {
        self.prefixes(key.as_ref()).pop()
    }

    fn prefixes(&self, key: &[u8]) -> Vec<(usize, &V)> {
        let mut prefixes = vec![];
        let mut node = self.root.as_deref();

        for depth in 0..=key.len() {
            let Some(current) = node else {
                break;
            };

            if let Some(value) = &current.value {
                prefixes.push((depth, &**value));
            }

            node = key
                .get(depth)
                .and_then(|&byte| current.child(byte))
                .map(|child| &**child);
        }

        prefixes
    }

    /// Inserts a key-value pair into a trie replacing an existing value if
    /// any.
    #[must_use]
    pub fn insert(&self, key: impl AsRef<[u8]>, value: V) -> Self {
        let key = key.as_ref();
        let mut path = vec![];
        let mut node = self.root.as_ref();

        while let (Some(current), Some(&byte)) = (node, key.get(path.len())) {
            path.push((current, byte));
            node = current.child(byte);
        }

        let value = Arc::new(value);
        let (mut child, replaced) = match node {
            Some(node) => (Arc::new(node.with_value(Some(value))), node.value.is_some()),
            None => (
                key[path.len()..]
                    .iter()
                    .rev()
                    .fold(Arc::new(Node::leaf(value)), |child, &byte| {
                        Arc::new(Node::branch(byte, child))
                    }),
                false,
            ),
        };

        while let Some((parent, byte)) = path.pop() {
            child = Arc::new(parent.set(byte, child));
        }

        Self {
            root: Some(child),
            size: self.size + if replaced { 0 } else { 1 },
        }
    }

    /// Removes a key from a trie if any.
    ///
    /// The same version is returned if the key is absent.
    #[must_use]
    pub fn remove(&self, key: impl AsRef<[u8]>) -> Self {
        let Some(mut node) = self.root.as_ref() else {
            return self.clone();
        };
        let mut path = vec![];

        for &byte in key.as_ref() {
            let Some(child) = node.child(byte) else {
                return self.clone();
            };

            path.push((node, byte));
            node = child;
        }

        if node.value.is_none() {
            return self.clone();
        }

        // `None` prunes a node with neither a value nor children.
        let mut child = (!node.bitmap.is_empty()).then(|| Arc::new(node.with_value(None)));

        while let Some((parent, byte)) = path.pop() {
            child = match child {
                Some(child) => Some(Arc::new(parent.set(byte, child))),
                None if parent.value.is_none() && parent.bitmap.size() == 1 => None,
                None => Some(Arc::new(parent.clear(byte))),
            };
        }

        Self {
            root: child,
            size: self.size - 1,
        }
    }

    /// Returns keys and values in lexicographic order of keys.
    pub fn iter(&self) -> PrefixTrieIterator<'_, V> {
        self.into_iter()
    }

    /// Writes a node structure in the Graphviz dot language.
    pub fn to_dot(&self, writer: &mut impl Write) -> fmt::Result {
        writeln!(writer, "digraph G {{")?;

        let mut nodes = self.root.iter().collect::<Vec<_>>();

        while let Some(node) = nodes.pop() {
            let name = format!("node_{:p}", Arc::as_ptr(node));

            if node.value.is_some() {
                writeln!(writer, "{name} [style=filled, fillcolor=red];")?;
            }

            for (byte, child) in node.bitmap.iter().zip(node.children.iter()) {
                writeln!(
                    writer,
                    "{name} -> node_{:p} [ label=\"{}\" ];",
                    Arc::as_ptr(child),
                    std::ascii::escape_default(byte)
                )?;
                nodes.push(child);
            }
        }

        writeln!(writer, "}}")
    }
}

impl<V> Clone for PrefixTrie<V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            size: self.size,
        }
    }
}

impl<V> Default for PrefixTrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Debug> Debug for PrefixTrie<V> {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter
            .debug_map()
            .entries(
                self.iter()
                    .map(|(key, value)| (String::from_utf8_lossy(&key).into_owned(), value)),
            )
            .finish()
    }
}

impl<V: PartialEq> PartialEq for PrefixTrie<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<V: Eq> Eq for PrefixTrie<V> {}

impl<K: AsRef<[u8]>, V> FromIterator<(K, V)> for PrefixTrie<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iterator: I) -> Self {
        iterator
            .into_iter()
            .fold(Self::new(), |trie, (key, value)| trie.insert(key, value))
    }
}

pub struct PrefixTrieIterator<'a, V>(Vec<(Vec<u8>, &'a Node<V>)>);

impl<'a, V> Iterator for PrefixTrieIterator<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, node) = self.0.pop()?;

            let children = node.bitmap.iter().zip(node.children.iter()).collect::<Vec<_>>();

            for (byte, child) in children.into_iter().rev() {
                let mut key = key.clone();
                key.push(byte);
                self.0.push((key, child));
            }

            if let Some(value) = &node.value {
                return Some((key, value));
            }
        }
    }
}

impl<'a, V> IntoIterator for &'a PrefixTrie<V> {
    type IntoIter = PrefixTrieIterator<'a, V>;
    type Item = (Vec<u8>, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        PrefixTrieIterator(
            self.root
                .iter()
                .map(|root| (vec![], &**root))
                .collect(),
        )
    }
}
