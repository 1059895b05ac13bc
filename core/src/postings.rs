use crate::tokenizer::Token;
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub path: String,
    /// Cleared when the document is replaced or deleted; readers skip dead docs.
    pub live: bool,
}

/// One term's occurrences within one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub positions: Vec<u32>, // strictly increasing
}

impl Posting {
    pub fn term_frequency(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// Postings for a single term, ascending by doc id with no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingsList {
    postings: Vec<Posting>,
}

impl PostingsList {
    pub(crate) fn push(&mut self, posting: Posting) {
        debug_assert!(self.postings.last().map_or(true, |p| p.doc_id < posting.doc_id));
        self.postings.push(posting);
    }

    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|i| &self.postings[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    pub fn as_slice(&self) -> &[Posting] {
        &self.postings
    }

    /// Number of postings, dead documents included.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

/// Per-document term -> positions mapping, in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermVector {
    entries: Vec<(String, Vec<u32>)>,
}

impl TermVector {
    pub(crate) fn from_entries(entries: Vec<(String, Vec<u32>)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, term: &str) -> Option<&[u32]> {
        self.entries.iter().find(|(t, _)| t == term).map(|(_, p)| p.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.entries.iter().map(|(t, p)| (t.as_str(), p.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Vec<u32>)> {
        self.entries
    }
}

pub struct PostingsBuilder;

impl PostingsBuilder {
    /// Group a document's tokens by term. Positions arrive ascending from the
    /// tokenizer, so each list is accumulated in order rather than sorted.
    pub fn build_document(doc_id: DocId, path: &str, tokens: Vec<Token>) -> (Document, TermVector) {
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut entries: Vec<(String, Vec<u32>)> = Vec::new();
        for token in tokens {
            match slots.get(&token.text) {
                Some(&slot) => {
                    let positions = &mut entries[slot].1;
                    debug_assert!(positions.last().map_or(true, |&p| p < token.position));
                    positions.push(token.position);
                }
                None => {
                    slots.insert(token.text.clone(), entries.len());
                    entries.push((token.text, vec![token.position]));
                }
            }
        }
        let doc = Document { id: doc_id, path: path.to_string(), live: true };
        (doc, TermVector::from_entries(entries))
    }
}
