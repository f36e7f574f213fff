// ABOUTME: Text matching helpers for food names: word tokens, phrase containment, trigrams
// ABOUTME: Word similarity mirrors trigram word_similarity scoring used for fuzzy food search
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Text matching for food names
//!
//! Trigrams follow the usual convention: each word is lowercased, padded with
//! two leading spaces and one trailing space, and split into 3-character windows.
//! `word_similarity(query, text)` is the best Jaccard overlap between the query's
//! trigrams and the trigrams of any contiguous run of words in `text`.

use std::collections::BTreeSet;

/// Lowercase alphanumeric word tokens
#[must_use]
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `phrase` occurs in `text` as a run of whole words
///
/// A trailing plural `s`/`es` on the last word of `text` still matches.
#[must_use]
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    let haystack = tokens(text);
    let needle = tokens(phrase);
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| {
        window
            .iter()
            .zip(&needle)
            .all(|(word, wanted)| word_matches(word, wanted))
    })
}

fn word_matches(word: &str, wanted: &str) -> bool {
    word == wanted
        || word
            .strip_prefix(wanted)
            .is_some_and(|suffix| suffix == "s" || suffix == "es")
}

/// Trigram set for a string, word by word
#[must_use]
pub fn trigrams(text: &str) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    for word in tokens(text) {
        let padded: Vec<char> = format!("  {word} ").chars().collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }
    set
}

/// Jaccard similarity between two trigram sets
#[must_use]
pub fn set_similarity(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

/// Whole-string trigram similarity
#[must_use]
pub fn similarity(left: &str, right: &str) -> f64 {
    set_similarity(&trigrams(left), &trigrams(right))
}

/// Best similarity between `query` and any contiguous run of words in `text`
#[must_use]
pub fn word_similarity(query: &str, text: &str) -> f64 {
    let query_trigrams = trigrams(query);
    if query_trigrams.is_empty() {
        return 0.0;
    }
    let words = tokens(text);
    let mut best = 0.0_f64;
    for start in 0..words.len() {
        for end in start + 1..=words.len() {
            let span = words[start..end].join(" ");
            best = best.max(set_similarity(&query_trigrams, &trigrams(&span)));
            if best >= 1.0 {
                return best;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigrams_padding() {
        let set = trigrams("Cat");
        let expected: BTreeSet<String> = ["  c", " ca", "cat", "at "]
            .iter()
            .map(|s| (*s).to_owned())
            .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_word_similarity_prefers_matching_span() {
        let exact = word_similarity("chicken", "Chicken, broilers or fryers, breast");
        assert!((exact - 1.0).abs() < f64::EPSILON);

        let misspelled = word_similarity("chiken", "Chicken, breast, roasted");
        assert!(misspelled > 0.3, "got {misspelled}");

        let unrelated = word_similarity("salmon", "Broccoli, raw");
        assert!(unrelated < 0.1, "got {unrelated}");
    }

    #[test]
    fn test_contains_phrase_respects_word_boundaries() {
        assert!(contains_phrase("Brown rice, cooked", "rice"));
        assert!(contains_phrase("two large eggs", "egg"));
        assert!(!contains_phrase("eggplant parmesan", "egg"));
        assert!(!contains_phrase("cornstarch slurry", "corn"));
        assert!(contains_phrase("extra virgin olive oil", "olive oil"));
    }
}
