//! Article store over SQLite

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::migrations::INIT_SCHEMA;
use super::models::{format_timestamp, ArticleRow, StoredTrend, TrendRow};
use crate::dedup::{CorpusEntry, CorpusReader};
use crate::embedding::{embedding_to_blob, Embedding};
use crate::models::{Article, Trend};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

const ARTICLE_COLUMNS: &str =
    "id, heading, body, source_name, location, scraped_at, published_at, embedding";

/// Persistent articles and trends
pub struct ArticleStore {
    pool: SqlitePool,
}

impl ArticleStore {
    /// Open (or create) a database file
    pub async fn new(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // One connection that never closes, or the database goes with it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(INIT_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(())
    }

    // ========================================================================
    // Article operations
    // ========================================================================

    /// Store an article with the embedding computed when it was scraped.
    ///
    /// Articles without an id get a fresh UUID; a missing `scraped_at` is stamped now.
    pub async fn insert_article(
        &self,
        article: &Article,
        embedding: Option<&[f32]>,
    ) -> Result<String, StoreError> {
        let id = article_id(article);
        insert_article_with(&self.pool, &id, article, embedding).await?;
        tracing::debug!("Stored article {}: {}", id, article.heading);
        Ok(id)
    }

    /// Store a batch in one transaction. Returns the number of rows written.
    pub async fn insert_articles(
        &self,
        articles: &[(Article, Option<Embedding>)],
    ) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        for (article, embedding) in articles {
            let id = article_id(article);
            insert_article_with(&mut *tx, &id, article, embedding.as_deref()).await?;
        }
        tx.commit().await?;

        tracing::info!("Stored {} articles", articles.len());
        Ok(articles.len())
    }

    pub async fn get_article(&self, id: &str) -> Result<Article, StoreError> {
        sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles WHERE id = ?",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Article not found: {}", id)))?
        .into_article()
    }

    /// Heading and body as stored, joined the same way embeddings were computed
    pub async fn get_article_text(&self, id: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT heading, body FROM articles WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(heading, body)| Article::new(heading, body).full_text()))
    }

    /// Articles scraped within the last `hours`, newest first
    pub async fn get_recent_articles(&self, hours: u32) -> Result<Vec<Article>, StoreError> {
        let cutoff = format_timestamp(Utc::now() - Duration::hours(i64::from(hours)));
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles WHERE scraped_at >= ? ORDER BY scraped_at DESC",
            ARTICLE_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!("Retrieved {} articles from last {} hours", rows.len(), hours);
        rows.into_iter().map(ArticleRow::into_article).collect()
    }

    /// Embedded articles scraped within the window, oldest first
    pub async fn fetch_recent_vectors(
        &self,
        window_hours: u32,
    ) -> Result<Vec<CorpusEntry>, StoreError> {
        let cutoff = format_timestamp(Utc::now() - Duration::hours(i64::from(window_hours)));
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {} FROM articles WHERE scraped_at >= ? AND embedding IS NOT NULL \
             ORDER BY scraped_at ASC",
            ARTICLE_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        // Rows that fail to decode are skipped
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            let embedding = match row.decode_embedding() {
                Ok(Some(embedding)) => embedding,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Skipping article {} in duplicate window: {}", id, e);
                    continue;
                }
            };
            let article = match row.into_article() {
                Ok(article) => article,
                Err(e) => {
                    tracing::warn!("Skipping article {} in duplicate window: {}", id, e);
                    continue;
                }
            };
            entries.push(CorpusEntry {
                article_id: article.id,
                heading: article.heading,
                embedding,
                scraped_at: article.scraped_at.unwrap_or_else(Utc::now),
            });
        }

        Ok(entries)
    }

    /// Delete articles scraped more than `days` ago
    pub async fn delete_old_articles(&self, days: u32) -> Result<u64, StoreError> {
        let cutoff = format_timestamp(Utc::now() - Duration::days(i64::from(days)));
        let deleted = sqlx::query("DELETE FROM articles WHERE scraped_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!("Deleted {} articles older than {} days", deleted, days);
        Ok(deleted)
    }

    // ========================================================================
    // Trend operations
    // ========================================================================

    /// Insert or update the trend for a topic.
    ///
    /// An existing topic keeps its id and `first_seen`; keywords, similarity and
    /// `last_seen` are replaced, and article ids and sources are merged.
    pub async fn save_trend(&self, trend: &Trend) -> Result<String, StoreError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, TrendRow>("SELECT * FROM trends WHERE topic = ?")
            .bind(&trend.topic)
            .fetch_optional(&mut *tx)
            .await?
            .map(StoredTrend::try_from)
            .transpose()?;

        let (id, first_seen, mut article_ids, mut sources, previous_count) = match existing {
            Some(stored) => (
                stored.id,
                stored.first_seen,
                stored.article_ids,
                stored.sources,
                stored.article_count,
            ),
            None => (
                uuid::Uuid::new_v4().to_string(),
                trend.first_seen,
                Vec::new(),
                Default::default(),
                0,
            ),
        };

        for article_id in &trend.article_ids {
            if !article_ids.contains(article_id) {
                article_ids.push(article_id.clone());
            }
        }
        sources.extend(trend.sources.iter().cloned());
        let article_count = previous_count.max(article_ids.len()).max(trend.article_count);

        sqlx::query(
            r#"
            INSERT INTO trends (id, topic, article_count, keywords_json, article_ids_json,
                                sources_json, avg_similarity, similarity_mode, first_seen, last_seen)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(topic) DO UPDATE SET
                article_count = excluded.article_count,
                keywords_json = excluded.keywords_json,
                article_ids_json = excluded.article_ids_json,
                sources_json = excluded.sources_json,
                avg_similarity = excluded.avg_similarity,
                similarity_mode = excluded.similarity_mode,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(&id)
        .bind(&trend.topic)
        .bind(article_count as i64)
        .bind(serde_json::to_string(&trend.keywords)?)
        .bind(serde_json::to_string(&article_ids)?)
        .bind(serde_json::to_string(&sources)?)
        .bind(f64::from(trend.avg_similarity))
        .bind(trend.similarity_mode.to_string())
        .bind(format_timestamp(first_seen))
        .bind(format_timestamp(trend.detected_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Trends seen within the last `hours` with at least `min_articles`, largest first
    pub async fn get_active_trends(
        &self,
        hours: u32,
        min_articles: usize,
    ) -> Result<Vec<StoredTrend>, StoreError> {
        let cutoff = format_timestamp(Utc::now() - Duration::hours(i64::from(hours)));
        let rows = sqlx::query_as::<_, TrendRow>(
            "SELECT * FROM trends WHERE last_seen >= ? AND article_count >= ? \
             ORDER BY article_count DESC, last_seen DESC",
        )
        .bind(cutoff)
        .bind(min_articles as i64)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!("Retrieved {} active trends", rows.len());
        rows.into_iter().map(StoredTrend::try_from).collect()
    }

    /// Close the database connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CorpusReader for ArticleStore {
    async fn fetch_recent_vectors(&self, window_hours: u32) -> anyhow::Result<Vec<CorpusEntry>> {
        Ok(ArticleStore::fetch_recent_vectors(self, window_hours).await?)
    }
}

fn article_id(article: &Article) -> String {
    article
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

async fn insert_article_with<'e, E>(
    executor: E,
    id: &str,
    article: &Article,
    embedding: Option<&[f32]>,
) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO articles
            (id, heading, body, source_name, location, scraped_at, published_at, embedding, embedding_dim)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&article.heading)
    .bind(&article.body)
    .bind(&article.source_name)
    .bind(&article.location)
    .bind(format_timestamp(article.scraped_at.unwrap_or_else(Utc::now)))
    .bind(article.published_at.map(format_timestamp))
    .bind(embedding.map(embedding_to_blob))
    .bind(embedding.map(|e| e.len() as i64))
    .execute(executor)
    .await?;

    Ok(())
}
