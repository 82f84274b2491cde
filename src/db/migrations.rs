//! Database migrations

/// SQL for creating the database schema
///
/// Timestamps are RFC 3339 UTC strings with a fixed width (microseconds, `Z`),
/// so string comparison orders them chronologically.
pub const INIT_SCHEMA: &str = r#"
-- Scraped articles with the embedding computed at scrape time
CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    heading TEXT NOT NULL,
    body TEXT NOT NULL DEFAULT '',
    source_name TEXT NOT NULL DEFAULT '',
    location TEXT,
    scraped_at TEXT NOT NULL,
    published_at TEXT,
    embedding BLOB,
    embedding_dim INTEGER
);

-- Detected trends, one row per topic
CREATE TABLE IF NOT EXISTS trends (
    id TEXT PRIMARY KEY,
    topic TEXT NOT NULL UNIQUE,
    article_count INTEGER NOT NULL DEFAULT 0,
    keywords_json TEXT NOT NULL DEFAULT '[]',
    article_ids_json TEXT NOT NULL DEFAULT '[]',
    sources_json TEXT NOT NULL DEFAULT '[]',
    avg_similarity REAL NOT NULL DEFAULT 0,
    similarity_mode TEXT NOT NULL,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_scraped ON articles(scraped_at DESC);
CREATE INDEX IF NOT EXISTS idx_trends_last_seen ON trends(last_seen DESC);
CREATE INDEX IF NOT EXISTS idx_trends_count ON trends(article_count DESC);
"#;
