//! dnb-meta lookup tool
//!
//! Command-line front end: looks up a book on the Deutsche
//! Nationalbibliothek by ISBN, IDN, title or author and prints the
//! normalized records as JSON.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dnb_meta::{config::AppConfig, services::Services, SearchRequest};

#[derive(Parser, Debug)]
#[command(
    name = "dnb-meta",
    about = "Look up book metadata on the Deutsche Nationalbibliothek",
    version
)]
struct Args {
    /// ISBN-10 or ISBN-13
    #[arg(long)]
    isbn: Option<String>,

    /// DNB record identifier (IDN)
    #[arg(long)]
    idn: Option<String>,

    /// Book title
    #[arg(long)]
    title: Option<String>,

    /// Author name (repeatable)
    #[arg(long = "author")]
    authors: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("dnb_meta={}", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let services = Services::new(&config)?;

    let request = SearchRequest {
        title: args.title,
        authors: args.authors,
        idn: args.idn,
        isbn: args.isbn,
    };

    let results = services.metadata.identify(&request).await?;
    for book in &results {
        println!("{}", serde_json::to_string_pretty(book)?);
    }

    Ok(())
}
