use crate::error::{Error, Result};
use crate::postings::{Document, Posting, PostingsBuilder, PostingsList, TermVector};
use crate::stats::TermStats;
use crate::tokenizer::{Analyzer, Token};
use crate::{DocId, TermId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

/// Arena storage shared by the writer and every snapshot opened from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Segment {
    dictionary: HashMap<String, TermId>,
    terms: Vec<String>,          // indexed by TermId
    postings: Vec<PostingsList>, // indexed by TermId
    docs: Vec<Document>,         // indexed by DocId
    doc_terms: Vec<Vec<TermId>>, // indexed by DocId, first-occurrence order
    live_by_path: HashMap<String, DocId>,
}

impl Segment {
    fn add_or_update(&mut self, path: &str, tokens: Vec<Token>) -> DocId {
        if let Some(old) = self.live_by_path.remove(path) {
            self.docs[old as usize].live = false;
            tracing::debug!(path, old_doc_id = old, "replacing document");
        }

        let doc_id = self.docs.len() as DocId;
        let (doc, vector) = PostingsBuilder::build_document(doc_id, path, tokens);
        let mut term_ids = Vec::with_capacity(vector.len());
        for (term, positions) in vector.into_entries() {
            let tid = match self.dictionary.get(&term) {
                Some(&tid) => tid,
                None => {
                    let tid = self.terms.len() as TermId;
                    self.dictionary.insert(term.clone(), tid);
                    self.terms.push(term);
                    self.postings.push(PostingsList::default());
                    tid
                }
            };
            self.postings[tid as usize].push(Posting { doc_id, positions });
            term_ids.push(tid);
        }

        tracing::debug!(path, doc_id, num_terms = term_ids.len(), "indexed document");
        self.docs.push(doc);
        self.doc_terms.push(term_ids);
        self.live_by_path.insert(path.to_string(), doc_id);
        doc_id
    }

    fn delete(&mut self, path: &str) -> bool {
        match self.live_by_path.remove(path) {
            Some(doc_id) => {
                self.docs[doc_id as usize].live = false;
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_live(&self, doc_id: DocId) -> bool {
        self.docs.get(doc_id as usize).map_or(false, |d| d.live)
    }

    fn live_doc_id(&self, doc_id: DocId) -> Result<usize> {
        if self.is_live(doc_id) {
            Ok(doc_id as usize)
        } else {
            Err(Error::NotFound(doc_id))
        }
    }

    fn postings(&self, term: &str) -> Option<&PostingsList> {
        self.dictionary.get(term).map(|&tid| &self.postings[tid as usize])
    }

    fn live_postings<'a>(&'a self, list: &'a PostingsList) -> impl Iterator<Item = &'a Posting> + 'a {
        list.iter().filter(move |p| self.is_live(p.doc_id))
    }

    fn list_stats(&self, list: &PostingsList) -> (u32, u64) {
        self.live_postings(list).fold((0, 0), |(df, ttf), p| (df + 1, ttf + p.term_frequency() as u64))
    }

    fn term_frequency_stats(&self, doc_id: DocId) -> Result<Vec<TermStats>> {
        let idx = self.live_doc_id(doc_id)?;
        Ok(self.doc_terms[idx]
            .iter()
            .map(|&tid| {
                let (doc_frequency, total_term_frequency) = self.list_stats(&self.postings[tid as usize]);
                TermStats { term: self.terms[tid as usize].clone(), doc_frequency, total_term_frequency }
            })
            .collect())
    }

    fn term_vector(&self, doc_id: DocId) -> Result<TermVector> {
        let idx = self.live_doc_id(doc_id)?;
        let entries = self.doc_terms[idx]
            .iter()
            .filter_map(|&tid| {
                let posting = self.postings[tid as usize].get(doc_id)?;
                Some((self.terms[tid as usize].clone(), posting.positions.clone()))
            })
            .collect();
        Ok(TermVector::from_entries(entries))
    }
}

/// Single-writer index. Build it document by document, then call
/// [`InvertedIndex::open_snapshot`] to get a frozen view for queries.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    segment: Arc<Segment>,
    analyzer: Analyzer,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analyzer(analyzer: Analyzer) -> Self {
        Self { segment: Arc::default(), analyzer }
    }

    pub(crate) fn from_parts(segment: Segment, analyzer: Analyzer) -> Self {
        Self { segment: Arc::new(segment), analyzer }
    }

    pub(crate) fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Append a document. A live document with the same path is tombstoned
    /// first; its postings stay in place and are filtered by readers.
    pub fn add_or_update_document(&mut self, path: &str, tokens: Vec<Token>) -> DocId {
        // Copies the arena only while a snapshot still holds the old one.
        Arc::make_mut(&mut self.segment).add_or_update(path, tokens)
    }

    /// Read UTF-8 content from `reader`, tokenize it and add it under `path`.
    /// Invalid byte sequences decode to U+FFFD. On a read failure the index
    /// is left untouched.
    pub fn index_reader<R: Read>(&mut self, path: &str, reader: R) -> Result<DocId> {
        let content = read_lossy(path, reader)?;
        let tokens = self.analyzer.tokenize(&content);
        Ok(self.add_or_update_document(path, tokens))
    }

    /// Tombstone the live document stored under `path`, if any.
    pub fn delete_document(&mut self, path: &str) -> bool {
        if !self.segment.live_by_path.contains_key(path) {
            return false;
        }
        Arc::make_mut(&mut self.segment).delete(path)
    }

    pub fn open_snapshot(&self) -> Snapshot {
        Snapshot { segment: Arc::clone(&self.segment), analyzer: self.analyzer.clone() }
    }

    pub fn term_frequency_stats(&self, doc_id: DocId) -> Result<Vec<TermStats>> {
        self.segment.term_frequency_stats(doc_id)
    }

    pub fn num_docs(&self) -> usize {
        self.segment.docs.len()
    }

    pub fn num_live_docs(&self) -> usize {
        self.segment.live_by_path.len()
    }

    pub fn num_terms(&self) -> usize {
        self.segment.terms.len()
    }
}

/// Immutable point-in-time view of an [`InvertedIndex`]. Cheap to clone and
/// safe to share across threads.
#[derive(Debug, Clone)]
pub struct Snapshot {
    segment: Arc<Segment>,
    analyzer: Analyzer,
}

impl Snapshot {
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Documents ever added, dead ones included.
    pub fn num_docs(&self) -> usize {
        self.segment.docs.len()
    }

    pub fn num_live_docs(&self) -> usize {
        self.segment.live_by_path.len()
    }

    pub fn num_terms(&self) -> usize {
        self.segment.terms.len()
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.segment.docs.get(doc_id as usize)
    }

    pub fn is_live(&self, doc_id: DocId) -> bool {
        self.segment.is_live(doc_id)
    }

    pub fn live_documents(&self) -> impl Iterator<Item = &Document> {
        self.segment.docs.iter().filter(|d| d.live)
    }

    /// Raw postings for `term`; may reference dead documents.
    pub fn postings(&self, term: &str) -> Option<&PostingsList> {
        self.segment.postings(term)
    }

    /// Live postings for `term`.
    pub fn live_postings<'a>(&'a self, term: &str) -> impl Iterator<Item = &'a Posting> + 'a {
        let segment = &*self.segment;
        segment
            .postings(term)
            .into_iter()
            .flat_map(move |list| segment.live_postings(list))
    }

    pub fn doc_frequency(&self, term: &str) -> u32 {
        self.segment.postings(term).map_or(0, |l| self.segment.list_stats(l).0)
    }

    pub fn total_term_frequency(&self, term: &str) -> u64 {
        self.segment.postings(term).map_or(0, |l| self.segment.list_stats(l).1)
    }

    pub fn term_frequency_stats(&self, doc_id: DocId) -> Result<Vec<TermStats>> {
        self.segment.term_frequency_stats(doc_id)
    }

    pub fn term_vector(&self, doc_id: DocId) -> Result<TermVector> {
        self.segment.term_vector(doc_id)
    }
}

/// Writer guarded by a mutex so several producers can feed one index.
/// Content is read and tokenized outside the lock; only the merge is serialized.
#[derive(Debug, Default)]
pub struct SharedIndex {
    inner: Mutex<InvertedIndex>,
    analyzer: Analyzer,
}

impl SharedIndex {
    pub fn new(index: InvertedIndex) -> Self {
        let analyzer = index.analyzer().clone();
        Self { inner: Mutex::new(index), analyzer }
    }

    pub fn add_or_update_document(&self, path: &str, tokens: Vec<Token>) -> DocId {
        self.inner.lock().add_or_update_document(path, tokens)
    }

    pub fn index_reader<R: Read>(&self, path: &str, reader: R) -> Result<DocId> {
        let content = read_lossy(path, reader)?;
        let tokens = self.analyzer.tokenize(&content);
        Ok(self.add_or_update_document(path, tokens))
    }

    pub fn delete_document(&self, path: &str) -> bool {
        self.inner.lock().delete_document(path)
    }

    pub fn open_snapshot(&self) -> Snapshot {
        self.inner.lock().open_snapshot()
    }

    pub fn into_inner(self) -> InvertedIndex {
        self.inner.into_inner()
    }
}

fn read_lossy<R: Read>(path: &str, mut reader: R) -> Result<String> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|e| Error::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
