//! Utilibill command-line interface.
//!
//! Subcommands:
//! - `extract` - process a directory of utility-bill PDFs into a CSV
//! - `score` - compare an extracted CSV against a ground-truth CSV
//! - `cache clear` - drop all cached parsed text

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use utilibill::{
    compare_files, pdf_files, render, write_records_csv, DocumentPipeline, ExtractionConfig,
    ParsedTextCache, PdfTextParser, ProviderConfig,
};

#[derive(Parser)]
#[command(name = "utilibill", version, about = "Structured data extraction from utility bills")]
struct Cli {
    /// Path to a utilibill.toml config file (default: discover upward)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract billing records from every PDF in a directory
    Extract {
        /// Directory containing the PDF documents
        documents_dir: PathBuf,

        /// Output CSV path
        #[arg(short, long, default_value = "output/extracted_data.csv")]
        output: PathBuf,
    },

    /// Compare an extracted CSV against a ground-truth CSV
    Score {
        /// Ground-truth CSV path
        ground_truth: PathBuf,

        /// Extracted-data CSV path
        extracted: PathBuf,
    },

    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove all cached parsed text
    Clear,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ExtractionConfig> {
    match path {
        Some(path) => ExtractionConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(ExtractionConfig::discover()?.unwrap_or_default()),
    }
}

async fn run_extract(
    config: ExtractionConfig,
    documents_dir: PathBuf,
    output: PathBuf,
) -> anyhow::Result<()> {
    // Credentials are resolved and validated before any document is touched.
    let provider = ProviderConfig::from_env().context("structured-generation provider")?;
    let model = provider.build_model()?;
    tracing::info!("using {:?} provider with model {}", provider.provider, provider.model);

    let files = pdf_files(&documents_dir)?;
    if files.is_empty() {
        println!("No PDF documents found in {}. Nothing to do.", documents_dir.display());
        return Ok(());
    }
    println!("Found {} documents to process.", files.len());

    let start = Instant::now();
    let pipeline = DocumentPipeline::new(Arc::new(PdfTextParser::new()), model, config);
    let outcome = pipeline.process_batch(&files).await;

    for failure in &outcome.failures {
        eprintln!("!! {}: {}", failure.path.display(), failure.error);
    }

    if outcome.records.is_empty() {
        println!("Extraction finished, but no records were extracted. No CSV written.");
    } else {
        write_records_csv(&output, &outcome.records)?;
        println!(
            "Saved {} records to {}",
            outcome.records.len(),
            output.display()
        );
    }

    println!("Finished in {:.2} seconds.", start.elapsed().as_secs_f64());
    Ok(())
}

fn run_score(ground_truth: PathBuf, extracted: PathBuf) -> anyhow::Result<()> {
    let report = compare_files(&ground_truth, &extracted)?;
    print!("{}", render(&report));
    Ok(())
}

fn run_cache_clear(config: ExtractionConfig) -> anyhow::Result<()> {
    let cache = ParsedTextCache::new(&config.cache_dir);
    let (removed, bytes) = cache.clear()?;
    println!(
        "Removed {} cache entries ({} bytes) from {}",
        removed,
        bytes,
        cache.cache_dir().display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Extract {
            documents_dir,
            output,
        } => run_extract(config, documents_dir, output).await,
        Command::Score {
            ground_truth,
            extracted,
        } => run_score(ground_truth, extracted),
        Command::Cache { action } => match action {
            CacheAction::Clear => run_cache_clear(config),
        },
    }
}
