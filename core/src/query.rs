//! Query expressions and the query-string parser.
//!
//! Grammar, whitespace separated clauses combined with an implicit OR:
//!
//! ```text
//! query  := clause (WS clause)*
//! clause := phrase | term | "OR"
//! phrase := '"' term (WS term)* '"' ('~' slop)?
//! ```

use crate::error::{Error, Result};
use crate::tokenizer::{Analyzer, Token};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryExpr {
    Term(String),
    Phrase(PhraseQuery),
    Or(Vec<QueryExpr>),
}

/// Ordered terms that must appear near each other.
///
/// `offsets` hold each term's position within the phrase; consecutive
/// offsets give the expected gap between matched positions. `slop` bounds
/// the summed deviation from those gaps: 0 means the exact sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPhraseQuery")]
pub struct PhraseQuery {
    terms: Vec<String>,
    offsets: Vec<u32>,
    slop: u32,
}

/// Unchecked wire form; omitted offsets mean adjacent terms.
#[derive(Deserialize)]
struct RawPhraseQuery {
    terms: Vec<String>,
    #[serde(default)]
    offsets: Option<Vec<u32>>,
    #[serde(default)]
    slop: u32,
}

impl TryFrom<RawPhraseQuery> for PhraseQuery {
    type Error = String;

    fn try_from(raw: RawPhraseQuery) -> std::result::Result<Self, Self::Error> {
        let Some(offsets) = raw.offsets else {
            return Ok(PhraseQuery::new(raw.terms).with_slop(raw.slop));
        };
        if offsets.len() != raw.terms.len() {
            return Err(format!("{} terms but {} offsets", raw.terms.len(), offsets.len()));
        }
        if offsets.windows(2).any(|w| w[0] >= w[1]) {
            return Err("phrase offsets must be strictly increasing".to_string());
        }
        Ok(Self { terms: raw.terms, offsets, slop: raw.slop })
    }
}

impl PhraseQuery {
    /// Phrase of adjacent terms. Terms are used verbatim, so they should
    /// already be normalized the way the index was.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<String> = terms.into_iter().map(Into::into).collect();
        let offsets = (0..terms.len() as u32).collect();
        Self { terms, offsets, slop: 0 }
    }

    /// Phrase from analyzed tokens, keeping the gaps left by dropped words.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let base = tokens.first().map_or(0, |t| t.position);
        let (terms, offsets): (Vec<String>, Vec<u32>) = tokens.into_iter().map(|t| (t.text, t.position - base)).unzip();
        Self { terms, offsets, slop: 0 }
    }

    pub fn with_slop(mut self, slop: u32) -> Self {
        self.slop = slop;
        self
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn slop(&self) -> u32 {
        self.slop
    }
}

impl fmt::Display for PhraseQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.terms.join(" "))?;
        if self.slop > 0 {
            write!(f, "~{}", self.slop)?;
        }
        Ok(())
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpr::Term(t) => f.write_str(t),
            QueryExpr::Phrase(p) => write!(f, "{p}"),
            QueryExpr::Or(subs) => {
                for (i, sub) in subs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{sub}")?;
                }
                Ok(())
            }
        }
    }
}

/// Stateless parser; query words go through the same analyzer as documents.
#[derive(Debug, Clone, Default)]
pub struct QueryParser {
    analyzer: Analyzer,
}

impl QueryParser {
    pub fn new(analyzer: Analyzer) -> Self {
        Self { analyzer }
    }

    pub fn parse(&self, text: &str) -> Result<QueryExpr> {
        let mut clauses = Vec::new();
        let mut chars = text.char_indices().peekable();

        while let Some(&(start, ch)) = chars.peek() {
            if ch.is_whitespace() {
                chars.next();
                continue;
            }
            match ch {
                '"' => {
                    chars.next();
                    let body = read_phrase_body(text, start, &mut chars)?;
                    let slop = match chars.peek() {
                        Some(&(_, '~')) => read_slop(text, &mut chars)?,
                        _ => 0,
                    };
                    clauses.extend(self.phrase_clause(body, slop));
                }
                '~' => return Err(Error::syntax("slop must follow a phrase", start)),
                _ => {
                    let end = read_word(text, &mut chars);
                    if let Some(&(tilde, '~')) = chars.peek() {
                        return Err(Error::syntax("slop must follow a phrase", tilde));
                    }
                    let word = &text[start..end];
                    if word == "OR" {
                        continue;
                    }
                    clauses.extend(self.analyzer.tokenize(word).into_iter().map(|t| QueryExpr::Term(t.text)));
                }
            }
        }

        if clauses.len() == 1 {
            Ok(clauses.remove(0))
        } else {
            Ok(QueryExpr::Or(clauses))
        }
    }

    fn phrase_clause(&self, body: &str, slop: u32) -> Option<QueryExpr> {
        let mut tokens = self.analyzer.tokenize(body);
        match tokens.len() {
            0 => None,
            1 => tokens.pop().map(|t| QueryExpr::Term(t.text)),
            _ => Some(QueryExpr::Phrase(PhraseQuery::from_tokens(tokens).with_slop(slop))),
        }
    }
}

/// Parse with the default analyzer.
pub fn parse(text: &str) -> Result<QueryExpr> {
    QueryParser::default().parse(text)
}

/// Consume up to and including the closing quote; returns the text between quotes.
fn read_phrase_body<'a>(text: &'a str, open: usize, chars: &mut Peekable<CharIndices<'_>>) -> Result<&'a str> {
    for (i, c) in chars.by_ref() {
        if c == '"' {
            return Ok(&text[open + 1..i]);
        }
    }
    Err(Error::syntax("unterminated phrase", open))
}

fn read_slop(text: &str, chars: &mut Peekable<CharIndices<'_>>) -> Result<u32> {
    let (tilde, _) = chars.next().ok_or_else(|| Error::syntax("expected slop", text.len()))?;
    let end = read_word(text, chars);
    let digits = &text[tilde + 1..end];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::syntax(format!("slop must be a non-negative integer, got {digits:?}"), tilde + 1));
    }
    digits
        .parse()
        .map_err(|_| Error::syntax(format!("slop {digits} is out of range"), tilde + 1))
}

/// Advance past a bare word; returns the byte offset where it ends.
fn read_word(text: &str, chars: &mut Peekable<CharIndices<'_>>) -> usize {
    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() || c == '"' || c == '~' {
            return i;
        }
        chars.next();
    }
    text.len()
}
