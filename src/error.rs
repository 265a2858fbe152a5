use thiserror::Error;

/// Addressing failures raised by the string store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("offset {offset} is outside the store (total length {total})")]
    OffsetOutOfRange { offset: usize, total: usize },

    #[error("range {offset}+{length} runs past the end of token {token}")]
    SpansTokenBoundary {
        offset: usize,
        length: usize,
        token: usize,
    },

    #[error("no token with index {0}")]
    UnknownToken(usize),
}

/// Failures of the read-only queries on a [`crate::Tree`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("no node with index {0} in this tree")]
    UnknownNode(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reasons an insertion was refused or aborted. A failed insertion never
/// leaves a trace in the tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    #[error("cannot insert an empty string")]
    Empty,

    #[error("character {ch:?} at position {position} is not part of the tree's alphabet")]
    OutOfAlphabet { ch: char, position: usize },

    /// The suffix starting at `offset` would end inside the tree or run past
    /// an existing leaf. Strings must end with a terminator that occurs
    /// nowhere else.
    #[error("suffix at offset {offset} is not terminated: it is a proper prefix of, or extends, another suffix")]
    Unterminated { offset: usize },

    #[error("builder is bound to a different tree")]
    ForeignTree,

    #[error("internal consistency failure: {0}")]
    Inconsistent(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InsertError {
    /// True for failures that point at a bug or a corrupted tree rather than
    /// at the caller's input.
    pub fn is_internal(&self) -> bool {
        matches!(self, InsertError::Inconsistent(_) | InsertError::Store(_))
    }
}

pub type Result<T> = std::result::Result<T, InsertError>;
