use crate::index::Snapshot;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    pub term: String,
    /// Live documents containing the term.
    pub doc_frequency: u32,
    /// Occurrences of the term across live documents.
    pub total_term_frequency: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub doc_id: DocId,
    pub path: String,
    pub terms: Vec<TermStats>,
}

const RULE: &str = "==================================================================================";

impl fmt::Display for DocumentStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Doc name {}", self.path)?;
        writeln!(f, "{:<45}{:<10}{:<10}", "term", "docFreq", "termFreq")?;
        writeln!(f, "{RULE}")?;
        for t in &self.terms {
            writeln!(f, "{:<45}{:<10}{:<10}", t.term, t.doc_frequency, t.total_term_frequency)?;
        }
        write!(f, "{RULE}")
    }
}

pub struct StatsReporter;

impl StatsReporter {
    /// Per-term frequencies for every live document, in doc id order.
    pub fn report(snapshot: &Snapshot) -> Vec<DocumentStats> {
        snapshot
            .live_documents()
            .filter_map(|doc| {
                let terms = snapshot.term_frequency_stats(doc.id).ok()?;
                Some(DocumentStats { doc_id: doc.id, path: doc.path.clone(), terms })
            })
            .collect()
    }
}
