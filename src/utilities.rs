use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// Bits of a hash consumed per trie level.
pub const BITS_PER_LEVEL: usize = 6;

/// Levels after which a new hash round is requested.
pub const PERIOD: usize = u64::BITS as usize / BITS_PER_LEVEL;

pub fn hash_key(key: &(impl Hash + ?Sized), round: usize) -> u64 {
    let mut hasher = DefaultHasher::new();

    key.hash(&mut hasher);
    round.hash(&mut hasher);

    hasher.finish()
}

pub fn hash_field(hash: u64, level: usize) -> u8 {
    ((hash >> (BITS_PER_LEVEL * (level % PERIOD))) & 0b111111) as u8
}

pub fn hash_round(level: usize) -> usize {
    level / PERIOD
}

pub fn is_round_boundary(level: usize) -> bool {
    level % PERIOD == 0
}

pub fn inserted<T: Clone>(elements: &[T], index: usize, element: T) -> Box<[T]> {
    let mut vector = Vec::with_capacity(elements.len() + 1);

    vector.extend_from_slice(&elements[..index]);
    vector.push(element);
    vector.extend_from_slice(&elements[index..]);

    vector.into_boxed_slice()
}

pub fn removed<T: Clone>(elements: &[T], index: usize) -> Box<[T]> {
    let mut vector = Vec::with_capacity(elements.len() - 1);

    vector.extend_from_slice(&elements[..index]);
    vector.extend_from_slice(&elements[index + 1..]);

    vector.into_boxed_slice()
}

pub fn replaced<T: Clone>(elements: &[T], index: usize, element: T) -> Box<[T]> {
    let mut vector = elements.to_vec();

    vector[index] = element;

    vector.into_boxed_slice()
}
