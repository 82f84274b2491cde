//! trendwatch - trend detection and duplicate filtering for scraped news
//!
//! Reads article batches as JSON (an array of scraper records) and writes
//! results as JSON to stdout. Logs go to stderr.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trendwatch::{
    config::AppConfig,
    logging::{self, LogOptions},
    Article, ArticleStore, CorpusEntry, DuplicateDetector, InMemoryCorpus, SimilarityMode,
    TrendDetector, Vectorizer,
};

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Detect trending topics in a batch of articles
    Trends {
        /// JSON file with an array of articles
        #[arg(long)]
        input: PathBuf,
        /// Number of trends to return
        #[arg(long)]
        top_n: Option<usize>,
        /// Minimum articles to form a trend
        #[arg(long)]
        min_cluster_size: Option<usize>,
        /// Similarity threshold for grouping (0..1), applied to the active similarity mode
        #[arg(long)]
        threshold: Option<f32>,
        /// Persist detected trends to the database
        #[arg(long)]
        save: bool,
    },
    /// Store new articles, skipping near-duplicates of recent ones
    Ingest {
        /// JSON file with an array of articles
        #[arg(long)]
        input: PathBuf,
    },
    /// Check whether a text duplicates a recently stored article
    Dedup {
        /// Text to check
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        /// File whose contents to check
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// List articles related to one article of a batch
    Related {
        /// JSON file with an array of articles
        #[arg(long)]
        input: PathBuf,
        /// Position of the target article in the batch
        #[arg(long)]
        index: usize,
        /// Maximum related articles to return
        #[arg(long, default_value_t = 5)]
        top_n: usize,
        /// Minimum similarity to count as related
        #[arg(long, default_value_t = 0.3_f32)]
        min_similarity: f32,
    },
}

#[derive(Parser, Debug)]
#[command(name = "trendwatch")]
#[command(author = "MadKoding")]
#[command(version)]
#[command(about = "Trend detection and duplicate filtering for scraped news", long_about = None)]
struct Args {
    /// Configuration file path (overrides defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path (default: ~/.local/share/trendwatch/trendwatch.db)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Use keyword similarity without loading an embedding model
    #[arg(long, global = true)]
    no_embeddings: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also log to a file (default: ~/.local/share/trendwatch/trendwatch.log)
    #[arg(long, global = true)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Serialize)]
struct IngestSummary {
    stored: usize,
    duplicates: usize,
}

#[derive(Serialize)]
struct RelatedArticle {
    heading: String,
    source_name: String,
    similarity: f32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;

    logging::init_logging(LogOptions {
        verbose: args.verbose || config.debug,
        log_file: args.log_file.clone(),
    })?;

    // Apply CLI overrides
    if args.no_embeddings {
        config.embedding.enabled = false;
    }
    if let Some(path) = args.db_path {
        config.database_path = Some(path);
    }
    if let Command::Trends {
        top_n,
        min_cluster_size,
        ..
    } = &args.command
    {
        if let Some(top_n) = top_n {
            config.trends.top_n = *top_n;
        }
        if let Some(min_size) = min_cluster_size {
            config.trends.min_cluster_size = *min_size;
        }
    }

    config.validate()?;

    let vectorizer = Arc::new(Vectorizer::from_config(&config.embedding));

    // The similarity mode is only known once the model has loaded (or failed to)
    if let Command::Trends {
        threshold: Some(threshold),
        ..
    } = &args.command
    {
        let mode = SimilarityMode::for_vectorizer(&vectorizer);
        config.trends = config.trends.with_threshold_for(mode, *threshold);
        config.validate()?;
    }

    match args.command {
        Command::Trends { input, save, .. } => {
            let articles = read_articles(&input)?;
            let detector = TrendDetector::new(vectorizer, config.trends);
            let trends = detector.detect(&articles);

            if save {
                let store = open_store(&config).await?;
                for trend in &trends {
                    let id = store.save_trend(trend).await?;
                    tracing::debug!("Saved trend '{}' as {}", trend.topic, id);
                }
                store.close().await;
            }

            println!("{}", serde_json::to_string_pretty(&trends)?);
        }
        Command::Ingest { input } => {
            let articles = read_articles(&input)?;
            let store = open_store(&config).await?;
            let summary = ingest(&store, vectorizer, &config, articles).await?;
            store.close().await;

            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Dedup { text, file } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {:?}", path))?,
                (None, None) => bail!("Either --text or --file is required"),
            };

            let store = open_store(&config).await?;
            let detector = DuplicateDetector::new(vectorizer, config.dedup);
            let duplicate = detector
                .check(&text, &store, config.dedup.similarity_threshold)
                .await;
            store.close().await;

            println!("{}", duplicate);
        }
        Command::Related {
            input,
            index,
            top_n,
            min_similarity,
        } => {
            let mut pool = read_articles(&input)?;
            if index >= pool.len() {
                bail!("Index {} out of range for {} articles", index, pool.len());
            }
            let target = pool.remove(index);

            let detector = TrendDetector::new(vectorizer, config.trends);
            let related: Vec<RelatedArticle> = detector
                .related(&target, &pool, top_n, min_similarity)
                .into_iter()
                .map(|(article, similarity)| RelatedArticle {
                    heading: article.heading,
                    source_name: article.source_name,
                    similarity,
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&related)?);
        }
    }

    Ok(())
}

/// Check each article against the stored window and the batch accepted so far,
/// then store the new ones with their embeddings in one transaction.
///
/// Batch-mates are windowed against the batch's own latest scrape time.
async fn ingest(
    store: &ArticleStore,
    vectorizer: Arc<Vectorizer>,
    config: &AppConfig,
    articles: Vec<Article>,
) -> anyhow::Result<IngestSummary> {
    let threshold = config.dedup.similarity_threshold;
    let detector = DuplicateDetector::new(vectorizer.clone(), config.dedup);
    let batch = InMemoryCorpus::for_batch(&articles);
    let mut accepted = Vec::new();
    let mut duplicates = 0;

    if !detector.is_enabled() {
        tracing::warn!("Duplicate detection disabled: no embedding model loaded");
    }

    for mut article in articles {
        let text = article.full_text();
        let duplicate = match detector.check_match(&text, store, threshold).await {
            Some(hit) => Some(hit),
            None => detector.check_match(&text, &batch, threshold).await,
        };

        if let Some(hit) = duplicate {
            tracing::info!(
                "Skipping duplicate of '{}' (similarity {:.2}): {}",
                hit.heading,
                hit.similarity,
                article.heading
            );
            duplicates += 1;
            continue;
        }

        let scraped_at = *article.scraped_at.get_or_insert_with(Utc::now);
        let embedding = vectorizer.vectorize(&text).ok();
        if let Some(embedding) = &embedding {
            batch.push(CorpusEntry {
                article_id: article.id.clone(),
                heading: article.heading.clone(),
                embedding: embedding.clone(),
                scraped_at,
            });
        }
        accepted.push((article, embedding));
    }

    let stored = store.insert_articles(&accepted).await?;
    Ok(IngestSummary { stored, duplicates })
}

async fn open_store(config: &AppConfig) -> anyhow::Result<ArticleStore> {
    let db_path = config.database_path();
    tracing::info!("Opening database at {:?}", db_path);
    ArticleStore::new(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {:?}", db_path))
}

fn read_articles(path: &Path) -> anyhow::Result<Vec<Article>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let articles: Vec<Article> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse articles from {:?}", path))?;
    tracing::info!("Loaded {} articles from {:?}", articles.len(), path);
    Ok(articles)
}
