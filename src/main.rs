//! Chat history importer CLI - main entry point
//!
//! Usage:
//!   tg_history_import --input result.json --chat-id -1001234567890 --category History
//!   tg_history_import --dry-run --dump records.json

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tg_history_import::commands::{self, RunOptions};
use tg_history_import::{ConfigOverrides, ImportConfig};

#[derive(Parser, Debug)]
#[command(name = "tg_history_import")]
#[command(about = "Import media messages from a Telegram chat export into the media library")]
#[command(version)]
struct Args {
    /// YAML config file (defaults to ./import.yml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Telegram export JSON file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Import endpoint URL (e.g. https://worker.example.dev/api/import)
    #[arg(long, env = "IMPORT_ENDPOINT")]
    endpoint: Option<String>,

    /// Value sent in the Authorization header
    #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Target chat ID (group IDs are negative, e.g. -1001234567890)
    #[arg(long, allow_hyphen_values = true)]
    chat_id: Option<i64>,

    /// Category the imported media is filed under
    #[arg(long)]
    category: Option<String>,

    /// Records per request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Pause after each request, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Per-request timeout, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Extract only, do not upload
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Save extracted records to this JSON file
    #[arg(long)]
    dump: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint: self.endpoint.clone(),
            admin_secret: self.secret.clone(),
            input: self.input.clone(),
            chat_id: self.chat_id,
            category: self.category.clone(),
            batch_size: self.batch_size,
            delay_ms: self.delay_ms,
            timeout_secs: self.timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (.env is read by ImportConfig::load)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("tg_history_import=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = ImportConfig::load(args.config.as_deref())?;
    config.apply(args.overrides());

    let options = RunOptions {
        dry_run: args.dry_run,
        dump: args.dump.clone(),
    };
    let summary = commands::import_run(&config, options).await?;

    let stats = summary.extraction;
    println!(
        "\n📊 Messages scanned: {}, media found: {}, skipped: {}",
        stats.scanned,
        stats.emitted,
        stats.skipped()
    );

    match summary.upload {
        None if stats.emitted == 0 => {
            println!("⚠️ No media found, nothing uploaded (0 records)")
        }
        None => println!("📝 Dry run, nothing uploaded"),
        Some(report) => {
            println!(
                "🚀 Uploaded {} / {} records in {} requests",
                report.uploaded_records, report.total_records, report.batches_attempted
            );
            if report.failed_batches.is_empty() {
                println!("🎉 Done!");
            } else {
                println!(
                    "❌ {} batches failed ({} records)",
                    report.failed_batches.len(),
                    report.failed_records()
                );
            }
        }
    }

    Ok(())
}
