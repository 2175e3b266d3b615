//! mathroute command-line front-end.
//!
//! Routes one question and prints the result as JSON on stdout. Logs go to
//! stderr, filtered by `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mathroute::{InMemoryKnowledgeBase, Router, RouterConfig};

/// Answer a math question through the routing cascade
#[derive(Parser)]
#[command(name = "mathroute")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Answer a math question through the routing cascade")]
#[command(long_about = None)]
struct Cli {
    /// Router configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Knowledge base entries (JSON array)
    #[arg(long)]
    kb: Option<PathBuf>,

    /// Print the full route trace alongside the result
    #[arg(long)]
    trace: bool,

    /// The question; multiple words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    question: Vec<String>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_router(cli: &Cli) -> Result<Router> {
    let config = match &cli.config {
        Some(path) => RouterConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RouterConfig::default(),
    };
    let mut builder = Router::builder().config(config);
    if let Some(path) = &cli.kb {
        let kb = InMemoryKnowledgeBase::load(path)
            .with_context(|| format!("loading knowledge base {}", path.display()))?;
        builder = builder.knowledge_base(Arc::new(kb));
    }
    builder.build().context("building router")
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let question = cli.question.join(" ");
    if question.trim().is_empty() {
        bail!("question is empty");
    }

    let router = build_router(&cli)?;
    let json = if cli.trace {
        serde_json::to_string_pretty(&router.route_with_trace(&question))?
    } else {
        serde_json::to_string_pretty(&router.route(&question))?
    };
    println!("{json}");
    Ok(())
}
