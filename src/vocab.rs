use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tag vocabulary: a bidirectional index <-> label-string table. The number
/// of entries is the tag count `K` that sizes every potential matrix.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TagVocab {
    v: Vec<String>,
    m: HashMap<String, usize>,
}

impl From<Vec<String>> for TagVocab {
    fn from(value: Vec<String>) -> Self {
        let m = value
            .iter()
            .enumerate()
            .map(|(i, s)| (s.to_string(), i))
            .collect();
        Self { v: value, m }
    }
}

impl TagVocab {
    pub fn new(v: &[String]) -> Self {
        Self::from(v.to_vec())
    }

    /// Number of distinct tags (`K`). Sentinels are not part of the vocabulary.
    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    /// Label string for a tag index. Out-of-range indices are an error, there
    /// is no fallback label.
    pub fn label(&self, id: usize) -> Result<&str> {
        self.v.get(id).map(|x| x.as_str()).ok_or(Error::UnknownTag {
            index: id,
            len: self.v.len(),
        })
    }

    pub fn id(&self, s: &str) -> Option<usize> {
        self.m.get(s).copied()
    }

    pub fn find_or_insert(&mut self, key: &str) -> usize {
        if self.m.contains_key(key) {
            return self.m[key];
        }
        let idx = self.v.len();
        self.m.insert(key.to_string(), idx);
        self.v.push(key.to_string());
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_str() {
        let mut vocab = TagVocab::default();
        for (s, id) in [
            ("NOUN", 0),
            ("VERB", 1),
            ("ADJ", 2),
            ("DET", 3),
            ("ADJ", 2),
            ("VERB", 1),
            ("NOUN", 0),
            ("ADV", 4),
        ] {
            assert_eq!(id, vocab.find_or_insert(s), "{} != {}", s, id);
        }
    }

    #[test]
    fn find_by_id() {
        let mut vocab = TagVocab::default();
        vocab.find_or_insert("NOUN");
        vocab.find_or_insert("VERB");
        assert_eq!(vocab.label(0).unwrap(), "NOUN");
        assert_eq!(vocab.label(1).unwrap(), "VERB");
        assert!(matches!(
            vocab.label(2),
            Err(Error::UnknownTag { index: 2, len: 2 })
        ));
    }
}
