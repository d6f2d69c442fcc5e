// ============================================================
// Layer 4 — Character Vocabulary
// ============================================================
// The synthesis network attends over the characters of the
// transcription, one-hot encoded. The vocabulary is the sorted
// set of every character seen in the corpus; its size is the
// width of the attention window vector.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharVocab {
    chars: Vec<char>,
    #[serde(skip)]
    index: HashMap<char, usize>,
}

impl CharVocab {
    /// Build from every transcription in the corpus
    pub fn build<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let chars: BTreeSet<char> = texts.into_iter().flat_map(str::chars).collect();
        Self::from_chars(chars.into_iter().collect())
    }

    pub fn from_chars(chars: Vec<char>) -> Self {
        let index = chars.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self { chars, index }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn id_of(&self, c: char) -> Option<usize> {
        // `index` is not serialised; fall back to a scan after a reload
        self.index
            .get(&c)
            .copied()
            .or_else(|| self.chars.iter().position(|&x| x == c))
    }

    /// Character ids for `text`. Characters outside the vocabulary are dropped.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        text.chars().filter_map(|c| self.id_of(c)).collect()
    }

    pub fn decode(&self, ids: &[usize]) -> String {
        ids.iter().filter_map(|&i| self.chars.get(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocab_is_sorted_and_unique() {
        let v = CharVocab::build(["bca", "aab"]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.encode("abc"), vec![0, 1, 2]);
    }

    #[test]
    fn test_unknown_characters_are_skipped() {
        let v = CharVocab::build(["ab"]);
        assert_eq!(v.encode("a?b"), vec![0, 1]);
    }

    #[test]
    fn test_lookup_survives_json_round_trip() {
        let v = CharVocab::build(["hello"]);
        let reloaded: CharVocab = serde_json::from_str(&serde_json::to_string(&v).unwrap()).unwrap();
        assert_eq!(reloaded.encode("hole"), v.encode("hole"));
        assert_eq!(reloaded.decode(&v.encode("hole")), "hole");
    }
}
