//! Tokenization and stopword handling shared by the keyword similarity fallback
//! and the topic/keyword extraction.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// English function words plus news boilerplate
    pub static ref STOP_WORDS: HashSet<&'static str> = [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
        "of", "with", "by", "from", "as", "is", "was", "are", "were", "been",
        "be", "have", "has", "had", "do", "does", "did", "will", "would",
        "could", "should", "may", "might", "must", "shall", "can", "need",
        "this", "that", "these", "those", "it", "its", "they", "them", "their",
        "he", "she", "him", "her", "his", "hers", "we", "us", "our", "you", "your",
        "what", "which", "who", "whom", "whose", "when", "where", "why", "how",
        "all", "each", "every", "both", "few", "more", "most", "other", "some",
        "such", "no", "nor", "not", "only", "own", "same", "so", "than", "too",
        "very", "just", "also", "now", "here", "there", "then", "once", "new",
        "says", "said", "say", "after", "before", "over", "under", "again",
        "further", "into", "through", "during", "above", "below", "between",
        "about", "against", "news", "report", "reports", "latest", "update",
    ]
    .into_iter()
    .collect();

    static ref WORD_3: Regex = Regex::new(r"\b[a-zA-Z]{3,}\b").unwrap();
    static ref WORD_4: Regex = Regex::new(r"\b[A-Za-z]{4,}\b").unwrap();
    static ref PROPER_NOUN: Regex = Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").unwrap();
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word.to_lowercase().as_str())
}

/// Lowercase alphabetic runs of length >= 3 with stopwords removed, in text order.
pub fn content_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_3
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(*w))
        .map(str::to_string)
        .collect()
}

/// Distinct content tokens, the vocabulary compared by Jaccard similarity.
pub fn token_set(text: &str) -> HashSet<String> {
    content_tokens(text).into_iter().collect()
}

/// Words of length >= 4, case preserved, stopwords removed.
pub fn significant_words(text: &str) -> Vec<&str> {
    WORD_4
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|w| !is_stop_word(w))
        .collect()
}

/// Runs of capitalized words ("Boris Johnson", "Tokyo").
pub fn proper_noun_phrases(text: &str) -> Vec<&str> {
    PROPER_NOUN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Count occurrences and sort by frequency descending. Ties keep first-seen order.
pub fn rank_by_frequency<I, S>(items: I) -> Vec<(S, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut order: Vec<(S, usize)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in items {
        match positions.get(item.as_ref()) {
            Some(&pos) => order[pos].1 += 1,
            None => {
                positions.insert(item.as_ref().to_string(), order.len());
                order.push((item, 1));
            }
        }
    }

    // sort_by is stable
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
