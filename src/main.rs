mod catalog;
mod crawler;
mod output;
mod parser;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crawler::Crawler;
use parser::page::Page;
use settings::Settings;

const FIRST_COLLECTION: u32 = 1;
const LAST_COLLECTION: u32 = 53;

#[derive(Parser)]
#[command(
    name = "kobita_scraper",
    about = "Poem scraper for rabindra-rachanabali.nltr.org with line/stanza tagging"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a range of collections and write JSON + text output
    Scrape {
        /// First collection id
        #[arg(long, default_value_t = FIRST_COLLECTION)]
        from: u32,
        /// Last collection id (inclusive)
        #[arg(long, default_value_t = LAST_COLLECTION)]
        to: u32,
        /// Output file stem inside the output directory
        #[arg(short, long, default_value = "rabindra_poems")]
        output: String,
    },
    /// Scrape a single collection
    Collection {
        id: u32,
        /// Output file stem (default: collection_<id>)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Scrape one poem (following its pages) and print it
    Poem {
        url: String,
        /// Collapse stanza markers as the serializers do
        #[arg(long)]
        stanzas: bool,
    },
    /// Run the extractor over saved HTML pages
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Collapse stanza markers as the serializers do
        #[arg(long)]
        stanzas: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape { from, to, output } => {
            if from > to {
                anyhow::bail!("--from ({}) must not exceed --to ({})", from, to);
            }
            let settings = Settings::load()?;
            let out_dir = PathBuf::from(&settings.output_dir);
            let crawler = Crawler::new(settings)?;

            println!("Scraping collections {}..={}...", from, to);
            let (poems, stats) = crawler.scrape_range(from, to).await;
            println!(
                "Done: {} poems from {} collections ({} poem errors, {} collection errors).",
                stats.poems, stats.collections, stats.failed_poems, stats.failed_collections
            );
            if poems.is_empty() {
                println!("No poems found. Check the site structure.");
                return Ok(());
            }
            save(&poems, &out_dir, &output)
        }
        Commands::Collection { id, output } => {
            let settings = Settings::load()?;
            let out_dir = PathBuf::from(&settings.output_dir);
            let crawler = Crawler::new(settings)?;

            let (poems, failed) = crawler.scrape_collection(id).await?;
            println!("Scraped {} poems ({} errors).", poems.len(), failed);
            if poems.is_empty() {
                return Ok(());
            }
            let stem = output.unwrap_or_else(|| format!("collection_{}", id));
            save(&poems, &out_dir, &stem)
        }
        Commands::Poem { url, stanzas } => {
            let crawler = Crawler::new(Settings::load()?)?;
            let paged = crawler.scrape_pages(&url).await?;
            if paged.content.is_empty() {
                println!("No poem content found at {}", url);
                return Ok(());
            }
            println!("{}", present(&paged.content, stanzas));
            println!("\n({} page(s))", paged.total_pages);
            Ok(())
        }
        Commands::Extract { files, stanzas } => extract_files(&files, stanzas),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn save(poems: &[output::Poem], dir: &Path, stem: &str) -> anyhow::Result<()> {
    let (json, text) = output::save_poems(poems, dir, stem)?;
    println!("Saved {} poems to {} and {}", poems.len(), json.display(), text.display());
    Ok(())
}

fn present(content: &str, stanzas: bool) -> String {
    if stanzas {
        parser::stanza::collapse_stanza_markers(content)
    } else {
        content.to_string()
    }
}

/// Extraction is pure, so saved pages are processed in parallel.
fn extract_files(files: &[PathBuf], stanzas: bool) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let results: Vec<(&PathBuf, anyhow::Result<String>)> = files
        .par_iter()
        .map(|path| {
            let extracted = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))
                .map(|html| parser::process_page(&Page::parse(&html)));
            pb.inc(1);
            (path, extracted)
        })
        .collect();
    pb.finish_and_clear();

    let mut failed = 0usize;
    for (path, extracted) in results {
        match extracted {
            Ok(content) if content.is_empty() => {
                println!("== {} (no poem found)", path.display());
            }
            Ok(content) => {
                println!("== {}", path.display());
                println!("{}", present(&content, stanzas));
            }
            Err(e) => {
                failed += 1;
                tracing::warn!("{:#}", e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files could not be read", failed, files.len());
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
