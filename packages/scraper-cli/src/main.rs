//! `scrape` - pull a table of records out of a web page or text file.
//!
//! ```text
//! scrape --url https://example.com/listings --field title --field price --backend gemini-flash
//! scrape --input page.html --html --field title,price --format json --no-save
//! cat notes.txt | scrape --field name,email
//! ```

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use extraction::{
    BackendConfig, BackendKind, ExtractionConfig, ExtractionResult, Extractor, FieldSpec,
    HttpFetcher, MarkdownNormalizer, Normalizer, Scraper,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scrape")]
#[command(about = "Extract a table of records from a page using an LLM backend")]
struct Cli {
    /// Page to fetch and extract from
    #[arg(long, conflicts_with = "input")]
    url: Option<String>,

    /// Text file to extract from ("-" or omitted reads stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Treat file or stdin input as HTML and normalize it first
    #[arg(long)]
    html: bool,

    /// Field to extract; repeat or separate with commas
    #[arg(short, long = "field", value_delimiter = ',', required = true)]
    fields: Vec<String>,

    /// Backend to use: gpt-4, gpt-4o or gemini-flash
    #[arg(short, long, default_value = "gpt-4")]
    backend: BackendKind,

    /// Token budget per chunk
    #[arg(long, default_value_t = extraction::DEFAULT_MAX_TOKENS_PER_CHUNK)]
    max_tokens: usize,

    /// Chunk calls in flight at once
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Deadline per backend call, in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Directory for the timestamped CSV
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// How to print the result
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Print only, do not write a CSV file
    #[arg(long)]
    no_save: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for the table
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,extraction=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let fields = FieldSpec::new(&cli.fields).context("Invalid field list")?;
    let config = ExtractionConfig::new()
        .with_max_tokens_per_chunk(cli.max_tokens)
        .with_concurrency(cli.concurrency)
        .with_call_timeout(Duration::from_secs(cli.timeout_secs));

    let backends = BackendConfig::from_env().context("Failed to load backend configuration")?;
    let extractor = Extractor::from_config(&backends, cli.backend, config)
        .with_context(|| format!("Cannot use backend {}", cli.backend))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling extraction");
            on_interrupt.cancel();
        }
    });

    let result = run(&cli, extractor, &fields, &cancel)
        .await
        .context("Extraction failed")?;

    info!(
        backend = %cli.backend,
        chunks = result.report.chunks,
        records = result.report.records,
        call_failures = result.report.call_failures(),
        parse_failures = result.report.parse_failures(),
        "Done"
    );

    print_table(&result, cli.format)?;

    if result.table.is_empty() {
        warn!("No records found");
    }
    if !cli.no_save {
        let path = result
            .table
            .save_timestamped_csv(&cli.output_dir)
            .with_context(|| format!("Failed to save CSV in {}", cli.output_dir.display()))?;
        info!(path = %path.display(), "Saved CSV");
    }

    Ok(())
}

async fn run(
    cli: &Cli,
    extractor: Extractor,
    fields: &FieldSpec,
    cancel: &CancellationToken,
) -> Result<ExtractionResult> {
    if let Some(url) = &cli.url {
        let fetcher = HttpFetcher::new().context("Failed to create HTTP fetcher")?;
        let scraper = Scraper::new(Arc::new(fetcher), Arc::new(MarkdownNormalizer), extractor);
        return Ok(scraper.scrape(url, fields.iter(), cancel).await?);
    }

    let raw = read_input(cli.input.as_deref())?;
    let text = if cli.html {
        MarkdownNormalizer.normalize(&raw)
    } else {
        raw
    };
    Ok(extractor.extract_fields(&text, fields, cancel).await?)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read {}", p.display())),
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn print_table(result: &ExtractionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", result.table),
        OutputFormat::Csv => result.table.write_csv(io::stdout().lock())?,
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result.table.to_json())?),
    }
    Ok(())
}
