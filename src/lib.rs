//! Bitmap tries whose sub-trees can be shared over threads.
//!
//! Hash-Array Mapped Trie (HAMT) is a data structure popular as a map (a.k.a.
//! associative array or dictionary) or set. Its immutable variant is adopted
//! widely by functional programming languages like Scala and Clojure to
//! implement immutable and memory-efficient associative arrays and sets.
//!
//! This crate provides a HAMT with 64-way branches, where hash codes are
//! recomputed with a round number whenever their bits run out, and a
//! byte-indexed prefix trie with 256-way branches. Every update returns a new
//! version sharing unchanged sub-trees with the old one.

mod bitmap;
mod error;
mod hamt;
mod map;
mod prefix_trie;
#[cfg(test)]
mod proptests;
mod set;
mod strategy;
mod utilities;

pub use error::Error;
pub use hamt::{Hamt, HamtIterator, DEFAULT_MAX_ROUNDS};
pub use map::{Map, MapIterator};
pub use prefix_trie::{PrefixTrie, PrefixTrieIterator};
pub use set::{Set, SetIterator};
pub use strategy::{
    DefaultEquivalence, First, Identity, KeyEquivalence, KeyExtractor, RoundHasher,
    SipRoundHasher,
};
