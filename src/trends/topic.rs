//! Topic labels and keyword lists for a cluster of articles

use crate::models::Article;
use crate::text::{
    char_prefix, content_tokens, is_stop_word, proper_noun_phrases, rank_by_frequency,
    significant_words,
};

/// Shortest label accepted from the proper-noun and frequent-word strategies
pub const MIN_TOPIC_CHARS: usize = 6;

/// Characters of body text that feed keyword extraction
pub const BODY_PREVIEW_CHARS: usize = 300;

const FALLBACK_TOPIC: &str = "General News";

/// Label a cluster from its headlines.
///
/// Tries, in order: the one or two most frequent capitalized phrases, the three
/// most frequent long words, then the first five words of the first headline.
pub fn topic_name(headlines: &[&str]) -> String {
    if let Some(topic) = proper_noun_topic(headlines) {
        return topic;
    }
    if let Some(topic) = frequent_word_topic(headlines) {
        return topic;
    }

    let first_words: Vec<&str> = headlines
        .first()
        .map(|h| h.split_whitespace().take(5).collect())
        .unwrap_or_default();
    if first_words.is_empty() {
        FALLBACK_TOPIC.to_string()
    } else {
        first_words.join(" ")
    }
}

fn proper_noun_topic(headlines: &[&str]) -> Option<String> {
    let phrases = headlines.iter().flat_map(|h| proper_noun_phrases(h));
    let mut ranked: Vec<(&str, usize)> = rank_by_frequency(phrases)
        .into_iter()
        .filter(|(phrase, _)| phrase.len() > 2 && !is_stop_word(phrase))
        .collect();

    // Frequency first, then the longer phrase; stable for full ties
    ranked.sort_by(|a, b| (b.1, b.0.len()).cmp(&(a.1, a.0.len())));

    let topic = ranked
        .iter()
        .take(2)
        .map(|(phrase, _)| *phrase)
        .collect::<Vec<_>>()
        .join(" ");
    long_enough(topic)
}

fn frequent_word_topic(headlines: &[&str]) -> Option<String> {
    let words = headlines.iter().flat_map(|h| significant_words(h));
    let topic = rank_by_frequency(words)
        .into_iter()
        .take(3)
        .map(|(word, _)| word)
        .collect::<Vec<_>>()
        .join(" ");
    long_enough(topic)
}

fn long_enough(topic: String) -> Option<String> {
    (topic.chars().count() >= MIN_TOPIC_CHARS).then_some(topic)
}

/// Most frequent content words across headlines and body previews.
pub fn extract_keywords(articles: &[&Article], top_n: usize) -> Vec<String> {
    let combined = articles
        .iter()
        .map(|a| format!("{} {}", a.heading, char_prefix(&a.body, BODY_PREVIEW_CHARS)))
        .collect::<Vec<_>>()
        .join(" ");

    rank_by_frequency(content_tokens(&combined))
        .into_iter()
        .take(top_n)
        .map(|(word, _)| word)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_from_proper_nouns() {
        let topic = topic_name(&[
            "Putin warns of military action",
            "Russia threatens new sanctions",
            "Putin issues warning to NATO",
        ]);
        assert_eq!(topic, "Putin Russia");
    }

    #[test]
    fn test_topic_prefers_longer_phrase_on_equal_frequency() {
        let topic = topic_name(&["Storm hits New Orleans", "Storm damage in New Orleans"]);
        // "New Orleans" x2 and "Storm" x2: the longer phrase leads
        assert_eq!(topic, "New Orleans Storm");
    }

    #[test]
    fn test_phrases_do_not_span_headlines() {
        // Joined into one text, "Putin Moscow Responds" would read as a single phrase
        let topic = topic_name(&["Talks with Putin", "Moscow Responds"]);
        assert_eq!(topic, "Moscow Responds Talks");
    }

    #[test]
    fn test_topic_falls_back_to_frequent_words() {
        // "The" is the only capitalized word; "again" is a stopword
        let topic = topic_name(&["The markets rally again", "markets close higher"]);
        assert_eq!(topic, "markets rally close");
    }

    #[test]
    fn test_topic_falls_back_to_first_headline() {
        assert_eq!(topic_name(&["Up by 3%", "Down 2"]), "Up by 3%");
        assert_eq!(topic_name(&[]), "General News");
    }

    #[test]
    fn test_extract_keywords() {
        let a = Article::new("Putin warns NATO", "Putin spoke in Moscow about NATO expansion.");
        let b = Article::new("NATO responds to Putin", "Alliance officials said the warning...");
        let keywords = extract_keywords(&[&a, &b], 3);
        assert_eq!(keywords, vec!["putin", "nato", "warns"]);
    }

    #[test]
    fn test_keywords_only_read_body_preview() {
        let body = format!("{} uranium", "x".repeat(BODY_PREVIEW_CHARS));
        let a = Article::new("Energy policy", body);
        let keywords = extract_keywords(&[&a], 10);
        assert!(!keywords.contains(&"uranium".to_string()));
        assert!(keywords.contains(&"energy".to_string()));
    }
}
