use phrasedex_core::{QueryExpr, SearchResults};
use std::fmt::Write;

const DASHES: &str = "-------------------------------------------";
const DOTS: &str = "...........................................";

/// Render results the way the search commands print them.
pub fn render_hits(expr: &QueryExpr, results: &SearchResults) -> String {
    let kind = match expr {
        QueryExpr::Term(_) => "term",
        QueryExpr::Phrase(_) => "phrase",
        QueryExpr::Or(_) => "or",
    };
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(out, "{DASHES}");
    let _ = writeln!(out, "Type of query: {kind}");
    let _ = writeln!(out, "Query: {expr}");
    let _ = writeln!(out, "Number of hits: {}", results.total_hits);
    let _ = writeln!(out, "{DOTS}");
    for hit in &results.hits {
        let _ = writeln!(out, "Matched Path {} (doc {}, score {})", hit.path, hit.doc_id, hit.score);
    }
    let _ = write!(out, "{DASHES}");
    out
}
