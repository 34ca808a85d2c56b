/// Errors of trie operations.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// Two distinct keys kept colliding through every allowed hash round.
    #[error("hash codes of distinct keys still collide after {rounds} rounds")]
    HashExhausted { rounds: usize },
}
