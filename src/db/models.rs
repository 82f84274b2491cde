//! Database models

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::repository::StoreError;
use crate::embedding::blob_to_embedding;
use crate::models::Article;
use crate::similarity::SimilarityMode;

/// Fixed-width UTC timestamp used in every TEXT time column
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", raw, e)))
}

/// Article record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: String,
    pub heading: String,
    pub body: String,
    pub source_name: String,
    pub location: Option<String>,
    pub scraped_at: String,
    pub published_at: Option<String>,
    pub embedding: Option<Vec<u8>>,
}

impl ArticleRow {
    pub fn into_article(self) -> Result<Article, StoreError> {
        let published_at = self.published_at.as_deref().map(parse_timestamp).transpose()?;
        Ok(Article {
            id: Some(self.id),
            heading: self.heading,
            body: self.body,
            source_name: self.source_name,
            location: self.location,
            scraped_at: Some(parse_timestamp(&self.scraped_at)?),
            published_at,
        })
    }

    pub fn decode_embedding(&self) -> Result<Option<Vec<f32>>, StoreError> {
        self.embedding
            .as_deref()
            .map(|blob| blob_to_embedding(blob).map_err(|e| StoreError::Corrupt(e.to_string())))
            .transpose()
    }
}

/// Trend record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendRow {
    pub id: String,
    pub topic: String,
    pub article_count: i64,
    pub keywords_json: String,
    pub article_ids_json: String,
    pub sources_json: String,
    pub avg_similarity: f64,
    pub similarity_mode: String,
    pub first_seen: String,
    pub last_seen: String,
}

/// A persisted trend. Member articles are referenced by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTrend {
    pub id: String,
    pub topic: String,
    pub article_count: usize,
    pub keywords: Vec<String>,
    pub article_ids: Vec<String>,
    pub sources: BTreeSet<String>,
    pub avg_similarity: f32,
    pub similarity_mode: SimilarityMode,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl TryFrom<TrendRow> for StoredTrend {
    type Error = StoreError;

    fn try_from(row: TrendRow) -> Result<Self, Self::Error> {
        let similarity_mode = match row.similarity_mode.as_str() {
            "vector" => SimilarityMode::Vector,
            "jaccard" => SimilarityMode::Jaccard,
            other => {
                return Err(StoreError::Corrupt(format!(
                    "unknown similarity mode: {}",
                    other
                )))
            }
        };

        Ok(Self {
            id: row.id,
            topic: row.topic,
            article_count: usize::try_from(row.article_count).unwrap_or(0),
            keywords: serde_json::from_str(&row.keywords_json)?,
            article_ids: serde_json::from_str(&row.article_ids_json)?,
            sources: serde_json::from_str(&row.sources_json)?,
            avg_similarity: row.avg_similarity as f32,
            similarity_mode,
            first_seen: parse_timestamp(&row.first_seen)?,
            last_seen: parse_timestamp(&row.last_seen)?,
        })
    }
}
