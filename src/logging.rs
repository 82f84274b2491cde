use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How the process-wide subscriber is set up
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Debug output for this crate
    pub verbose: bool,
    /// Also append to a log file (`None` for the default location)
    pub log_file: Option<Option<PathBuf>>,
}

/// Install the global tracing subscriber.
///
/// Console output goes to stderr so stdout stays clean for JSON results.
/// `RUST_LOG` overrides the default filter.
pub fn init_logging(options: LogOptions) -> anyhow::Result<()> {
    let filter = if options.verbose {
        "trendwatch=debug,info"
    } else {
        "trendwatch=info,warn"
    };

    let file_layer = match &options.log_file {
        Some(path) => {
            let path = path.clone().unwrap_or_else(default_log_path);
            let file = open_log_file(&path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Open the log file for appending and write a session start marker
fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "\n=== trendwatch session started at {} ===\n", timestamp)?;

    Ok(file)
}

/// Get the log file path
pub fn default_log_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("trendwatch").join("trendwatch.log")
    } else {
        PathBuf::from("trendwatch.log")
    }
}
