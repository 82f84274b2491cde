//! Database module for SQLite persistence

mod migrations;
mod models;
mod repository;

pub use models::{format_timestamp, parse_timestamp, ArticleRow, StoredTrend, TrendRow};
pub use repository::{ArticleStore, StoreError};
