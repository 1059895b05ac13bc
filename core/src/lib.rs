pub mod error;
pub mod index;
pub mod persist;
pub mod postings;
pub mod query;
pub mod search;
pub mod stats;
pub mod tokenizer;

pub use error::{Error, Result};
pub use index::{InvertedIndex, SharedIndex, Snapshot};
pub use postings::{Document, Posting, PostingsList, TermVector};
pub use query::{PhraseQuery, QueryExpr, QueryParser};
pub use search::{Hit, SearchOptions, SearchResults, Searcher};
pub use stats::{DocumentStats, StatsReporter, TermStats};
pub use tokenizer::{Analyzer, AnalyzerConfig, Token};

pub type TermId = u32;
pub type DocId = u32;
