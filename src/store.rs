use std::collections::HashMap;

use crate::error::StoreError;

pub type TokenIndex = usize;

/// One inserted string and where it sits in the global offset space.
#[derive(Debug)]
struct Token {
    text: Box<[char]>,
    start: usize,
    multiplicity: usize,
}

impl Token {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Outcome of [`StringStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    /// The text was appended under a new index.
    Fresh(TokenIndex),
    /// Identical text was already stored under this index.
    Duplicate(TokenIndex),
}

impl Stored {
    pub fn index(self) -> TokenIndex {
        match self {
            Stored::Fresh(index) | Stored::Duplicate(index) => index,
        }
    }
}

/// Append-only collection of strings addressed by one cumulative offset space.
///
/// Offset `o` names the character at position `o - start(t)` of the token `t`
/// whose range contains it. Tokens are kept apart in memory; nothing is ever
/// concatenated, and no query crosses from one token into the next.
#[derive(Debug, Default)]
pub struct StringStore {
    tokens: Vec<Token>,
    lookup: HashMap<String, TokenIndex>,
    total: usize,
}

impl StringStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` unless it is already present.
    pub fn insert(&mut self, text: &str) -> Stored {
        if let Some(&index) = self.lookup.get(text) {
            self.tokens[index].multiplicity += 1;
            return Stored::Duplicate(index);
        }
        let chars: Box<[char]> = text.chars().collect();
        let index = self.tokens.len();
        let start = self.total;
        self.total += chars.len();
        self.tokens.push(Token {
            text: chars,
            start,
            multiplicity: 1,
        });
        self.lookup.insert(text.to_owned(), index);
        Stored::Fresh(index)
    }

    /// Undo the most recent fresh insertion.
    pub(crate) fn pop_last(&mut self) {
        if let Some(token) = self.tokens.pop() {
            self.total = token.start;
            let text: String = token.text.iter().collect();
            self.lookup.remove(&text);
        }
    }

    /// Number of stored tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn total_length(&self) -> usize {
        self.total
    }

    /// How many times the token was handed to [`StringStore::insert`].
    pub fn multiplicity(&self, index: TokenIndex) -> Result<usize, StoreError> {
        self.tokens
            .get(index)
            .map(|token| token.multiplicity)
            .ok_or(StoreError::UnknownToken(index))
    }

    pub fn token(&self, index: TokenIndex) -> Result<&[char], StoreError> {
        self.tokens
            .get(index)
            .map(|token| &*token.text)
            .ok_or(StoreError::UnknownToken(index))
    }

    pub fn start_offset(&self, index: TokenIndex) -> Result<usize, StoreError> {
        self.tokens
            .get(index)
            .map(|token| token.start)
            .ok_or(StoreError::UnknownToken(index))
    }

    pub fn token_index_at(&self, offset: usize) -> Result<TokenIndex, StoreError> {
        let index = self.tokens.partition_point(|token| token.end() <= offset);
        if index == self.tokens.len() {
            return Err(StoreError::OffsetOutOfRange {
                offset,
                total: self.total,
            });
        }
        Ok(index)
    }

    pub fn char_at(&self, offset: usize) -> Result<char, StoreError> {
        let token = &self.tokens[self.token_index_at(offset)?];
        Ok(token.text[offset - token.start])
    }

    /// Borrow `length` characters starting at `offset`. The range must stay
    /// inside the token owning `offset`.
    pub fn slice(&self, offset: usize, length: usize) -> Result<&[char], StoreError> {
        let index = self.token_index_at(offset)?;
        let token = &self.tokens[index];
        let local = offset - token.start;
        if local + length > token.text.len() {
            return Err(StoreError::SpansTokenBoundary {
                offset,
                length,
                token: index,
            });
        }
        Ok(&token.text[local..local + length])
    }

    pub fn substring(&self, offset: usize, length: usize) -> Result<String, StoreError> {
        Ok(self.slice(offset, length)?.iter().collect())
    }

    /// The rest of the owning token from `offset` on.
    pub fn substring_to_end(&self, offset: usize) -> Result<String, StoreError> {
        let token = &self.tokens[self.token_index_at(offset)?];
        Ok(token.text[offset - token.start..].iter().collect())
    }

    /// Count how many characters of `pattern[pattern_pos..]` match the stored
    /// text from `offset` on, stopping after `max_length` characters, at the
    /// end of the pattern, or at the end of the owning token.
    pub fn longest_common_extension(
        &self,
        pattern: &[char],
        pattern_pos: usize,
        offset: usize,
        max_length: usize,
    ) -> Result<usize, StoreError> {
        let token = &self.tokens[self.token_index_at(offset)?];
        let stored = &token.text[offset - token.start..];
        let pattern = pattern.get(pattern_pos..).unwrap_or(&[]);
        Ok(pattern
            .iter()
            .zip(stored)
            .take(max_length)
            .take_while(|(a, b)| a == b)
            .count())
    }
}
