use anyhow::Result;
use clap::{Parser, Subcommand};
use phrasedex_core::persist::{load_index, save_index, IndexPaths};
use phrasedex_core::{Analyzer, AnalyzerConfig, InvertedIndex, PhraseQuery, QueryExpr, SearchOptions, Searcher, StatsReporter};
use phrasedex_indexer::corpus::index_corpus;
use phrasedex_indexer::display::render_hits;
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "phrasedex")]
#[command(about = "Build a positional inverted index and run phrase queries against it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a file or directory tree, appending to an existing index
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Drop English stopwords (new indexes only)
        #[arg(long, default_value_t = false)]
        stopwords: bool,
        /// Apply English stemming (new indexes only)
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Print per-document term statistics after the build
        #[arg(long, default_value_t = false)]
        stats: bool,
    },
    /// Run a query string: words, "quoted phrases" and "phrases"~slop
    Search {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Run a phrase query built from individual terms
    Phrase {
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long, default_value_t = 0)]
        slop: u32,
        #[arg(required = true)]
        terms: Vec<String>,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Print term and document frequencies for every live document
    Stats {
        #[arg(long, default_value = "./index")]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, index, stopwords, stem, stats } => {
            let config = AnalyzerConfig { stopwords, stem, ..Default::default() };
            build(&input, &index, config, stats)
        }
        Commands::Search { index, query, limit } => {
            let searcher = open_searcher(&index)?;
            let expr = searcher.parse(&query)?;
            tracing::info!(query = %query, "searching using query parser");
            let results = searcher.evaluate(&expr, &SearchOptions { limit });
            println!("{}", render_hits(&expr, &results));
            Ok(())
        }
        Commands::Phrase { index, slop, terms, limit } => {
            let searcher = open_searcher(&index)?;
            let tokens = searcher.snapshot().analyzer().tokenize(&terms.join(" "));
            let expr = QueryExpr::Phrase(PhraseQuery::from_tokens(tokens).with_slop(slop));
            let results = searcher.evaluate(&expr, &SearchOptions { limit });
            println!("{}", render_hits(&expr, &results));
            Ok(())
        }
        Commands::Stats { index } => {
            print_stats(&IndexPaths::new(&index))
        }
    }
}

fn build(input: &str, output: &str, config: AnalyzerConfig, stats: bool) -> Result<()> {
    let paths = IndexPaths::new(output);
    let mut index = if paths.exists() {
        let existing = load_index(&paths)?;
        if existing.analyzer().config() != &config {
            tracing::warn!("index exists, keeping its analyzer settings");
        }
        tracing::info!(output, num_docs = existing.num_docs(), "appending to existing index");
        existing
    } else {
        InvertedIndex::with_analyzer(Analyzer::new(config))
    };

    let summary = index_corpus(&mut index, Path::new(input))?;
    tracing::info!(indexed = summary.indexed, skipped = summary.skipped, "ingested documents");

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into());
    let meta = save_index(&paths, &index, &created_at)?;
    tracing::info!(output, num_docs = meta.num_docs, num_live_docs = meta.num_live_docs, num_terms = meta.num_terms, "index build complete");

    if stats {
        print_stats(&paths)?;
    }
    Ok(())
}

fn open_searcher(index: &str) -> Result<Searcher> {
    let index = load_index(&IndexPaths::new(index))?;
    Ok(Searcher::new(index.open_snapshot()))
}

fn print_stats(paths: &IndexPaths) -> Result<()> {
    let index = load_index(paths)?;
    for doc in StatsReporter::report(&index.open_snapshot()) {
        println!("{doc}");
    }
    Ok(())
}
