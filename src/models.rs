//! Article and trend records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::similarity::SimilarityMode;

/// A scraped article as produced by the scraper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Opaque identifier, absent until the article has been stored
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub heading: String,

    #[serde(default, alias = "story")]
    pub body: String,

    #[serde(default)]
    pub source_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<DateTime<Utc>>,

    #[serde(default, alias = "publish_date", skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: None,
            heading: heading.into(),
            body: body.into(),
            source_name: String::new(),
            location: None,
            scraped_at: None,
            published_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_scraped_at(mut self, scraped_at: DateTime<Utc>) -> Self {
        self.scraped_at = Some(scraped_at);
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Scrape time, or publish time when the scraper did not stamp one
    pub fn seen_at(&self) -> Option<DateTime<Utc>> {
        self.scraped_at.or(self.published_at)
    }

    /// Text used for duplicate detection and stored embeddings
    pub fn full_text(&self) -> String {
        if self.body.trim().is_empty() {
            self.heading.clone()
        } else {
            format!("{}\n{}", self.heading, self.body)
        }
    }
}

/// A group of articles covering the same event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trend {
    pub topic: String,
    pub article_count: usize,
    /// Most frequent first
    pub keywords: Vec<String>,
    pub articles: Vec<Article>,
    pub article_ids: Vec<String>,
    /// Mean pairwise similarity among members, rounded to 3 decimals
    pub avg_similarity: f32,
    pub sources: BTreeSet<String>,
    pub first_seen: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
    pub similarity_mode: SimilarityMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_deserializes_scraper_field_names() {
        let json = r#"{
            "_id": "abc",
            "heading": "Flooding closes highway",
            "story": "Heavy rain overnight...",
            "source_name": "Daily Wire Service",
            "publish_date": "2026-10-01T08:00:00Z"
        }"#;

        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.id.as_deref(), Some("abc"));
        assert_eq!(article.body, "Heavy rain overnight...");
        assert!(article.scraped_at.is_none());
        assert_eq!(article.seen_at(), article.published_at);
    }

    #[test]
    fn test_full_text_without_body() {
        let article = Article::new("Only a heading", "   ");
        assert_eq!(article.full_text(), "Only a heading");

        let article = Article::new("Heading", "Body");
        assert_eq!(article.full_text(), "Heading\nBody");
    }
}
