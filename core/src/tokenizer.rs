use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{M}\p{N}]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// A normalized term and its ordinal in the document's token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub lowercase: bool,
    /// NFKC normalization before splitting, so "ﬁ" and "fi" index alike.
    pub unicode_normalize: bool,
    /// Drop English stopwords. Dropped words still consume a position.
    pub stopwords: bool,
    pub stem: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { lowercase: true, unicode_normalize: true, stopwords: false, stem: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Split text into tokens on non-alphanumeric boundaries.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut normalized = if self.config.unicode_normalize {
            text.nfkc().collect::<String>()
        } else {
            text.to_string()
        };
        if self.config.lowercase {
            normalized = normalized.to_lowercase();
        }

        let mut tokens = Vec::new();
        for (pos, mat) in RE.find_iter(&normalized).enumerate() {
            let word = mat.as_str();
            if self.config.stopwords && is_stopword(word) {
                continue;
            }
            let text = if self.config.stem {
                STEMMER.stem(word).into_owned()
            } else {
                word.to_string()
            };
            tokens.push(Token { text, position: pos as u32 });
        }
        tokens
    }
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Tokenize with the default analyzer: NFKC, lowercase, no stopwords, no stemming.
pub fn tokenize(text: &str) -> Vec<Token> {
    Analyzer::default().tokenize(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn basic_tokenize() {
        let t = tokenize("The quick, brown fox!");
        assert_eq!(words(&t), vec!["the", "quick", "brown", "fox"]);
        assert_eq!(t.iter().map(|t| t.position).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_and_punctuation_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ,.;!? -- ").is_empty());
    }

    #[test]
    fn splits_apostrophes_and_keeps_digits() {
        let t = tokenize("runner's route66");
        assert_eq!(words(&t), vec!["runner", "s", "route66"]);
    }

    #[test]
    fn combining_marks_stay_inside_words() {
        let t = tokenize("नमस्ते दुनिया, हिन्दी");
        assert_eq!(words(&t), vec!["नमस्ते", "दुनिया", "हिन्दी"]);
        // decomposed accents without a precomposed form
        assert_eq!(words(&tokenize("x\u{0301}y z")), vec!["x\u{0301}y", "z"]);
    }

    #[test]
    fn stopwords_leave_position_gaps() {
        let analyzer = Analyzer::new(AnalyzerConfig { stopwords: true, ..Default::default() });
        let t = analyzer.tokenize("the quick and the dead");
        assert_eq!(words(&t), vec!["quick", "dead"]);
        assert_eq!(t[0].position, 1);
        assert_eq!(t[1].position, 4);
    }

    #[test]
    fn stemming_is_opt_in() {
        let analyzer = Analyzer::new(AnalyzerConfig { stem: true, ..Default::default() });
        assert_eq!(words(&analyzer.tokenize("Running")), vec!["run"]);
        assert_eq!(words(&tokenize("Running")), vec!["running"]);
    }

    #[test]
    fn deterministic() {
        let text = "Hamburger steak, french fries; hamburger.";
        assert_eq!(tokenize(text), tokenize(text));
    }
}
