//! Character Vocabulary
//!
//! Maps each distinct character of a corpus to a token index. Indices are
//! assigned in sorted character order, so the same corpus always yields the
//! same vocabulary.
//!
//! ```rust
//! use char_rnn::CharVocab;
//!
//! let vocab = CharVocab::from_text("hello");
//! assert_eq!(vocab.size(), 4); // e, h, l, o
//! let ids = vocab.encode("hole")?;
//! assert_eq!(vocab.decode(&ids)?, "hole");
//! # Ok::<(), char_rnn::RnnError>(())
//! ```

use crate::error::{Result, RnnError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Serialized as the plain list of characters; the lookup table is rebuilt
/// on load.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "Vec<char>", into = "Vec<char>")]
pub struct CharVocab {
    chars: Vec<char>,
    index: HashMap<char, usize>,
}

impl From<Vec<char>> for CharVocab {
    fn from(chars: Vec<char>) -> Self {
        Self::from_chars(chars)
    }
}

impl From<CharVocab> for Vec<char> {
    fn from(vocab: CharVocab) -> Self {
        vocab.chars
    }
}

impl CharVocab {
    pub fn from_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect::<BTreeSet<_>>().into_iter().collect();
        Self::from_chars(chars)
    }

    fn from_chars(chars: Vec<char>) -> Self {
        let index = chars.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self { chars, index }
    }

    /// Number of distinct tokens (the model's `input_size`)
    pub fn size(&self) -> usize {
        self.chars.len()
    }

    pub fn encode(&self, text: &str) -> Result<Vec<usize>> {
        text.chars()
            .map(|c| self.index.get(&c).copied().ok_or(RnnError::UnknownToken(c)))
            .collect()
    }

    pub fn decode(&self, ids: &[usize]) -> Result<String> {
        ids.iter()
            .map(|&id| {
                self.chars.get(id).copied().ok_or(RnnError::IndexOutOfRange {
                    index: id,
                    size: self.chars.len(),
                })
            })
            .collect()
    }
}
