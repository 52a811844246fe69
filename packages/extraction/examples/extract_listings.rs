//! Extract listings from inline text with a real backend.
//!
//! ```text
//! OPENAI_API_KEY=sk-... cargo run -p extraction --example extract_listings
//! GEMINI_API_KEY=... cargo run -p extraction --example extract_listings -- gemini-flash
//! ```

use extraction::{BackendConfig, BackendKind, ExtractionConfig, Extractor};

const PAGE: &str = "\
# Apartments for rent

- Sunny 2BR in Midtown, $2,400/mo, available March 1. Call 555-0101.
- Studio near Riverside Park, $1,150/mo, utilities included.
- 3BR townhouse with garage, $3,100/mo, pets allowed.
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let kind: BackendKind = std::env::args()
        .nth(1)
        .as_deref()
        .unwrap_or("gpt-4")
        .parse()?;

    let backends = BackendConfig::from_env()?;
    let extractor = Extractor::from_config(&backends, kind, ExtractionConfig::default())?;

    let result = extractor
        .extract(PAGE, ["title", "price", "availability"])
        .await?;

    println!("{}", result.table);
    println!(
        "{} records from {} chunk(s), {} failed",
        result.report.records,
        result.report.chunks,
        result.report.failures.len()
    );

    Ok(())
}
