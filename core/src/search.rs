use crate::error::Result;
use crate::index::Snapshot;
use crate::postings::PostingsList;
use crate::query::{PhraseQuery, QueryExpr, QueryParser};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize { 100 }

impl Default for SearchOptions {
    fn default() -> Self {
        Self { limit: default_limit() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub doc_id: DocId,
    pub path: String,
    pub score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matching live documents before truncation to the limit.
    pub total_hits: usize,
    pub hits: Vec<Hit>,
}

/// Evaluate `expr` against a snapshot.
///
/// Scoring: a term scores its frequency in the document, a phrase scores 1
/// per matching document, and `Or` sums the scores of its branches. Hits are
/// ordered by descending score, then ascending doc id.
pub fn evaluate(snapshot: &Snapshot, expr: &QueryExpr, options: &SearchOptions) -> SearchResults {
    let scores = score_expr(snapshot, expr);
    let mut scored: Vec<(DocId, u32)> = scores.into_iter().collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let total_hits = scored.len();

    let hits = scored
        .into_iter()
        .take(options.limit)
        .filter_map(|(doc_id, score)| {
            let doc = snapshot.document(doc_id)?;
            Some(Hit { doc_id, path: doc.path.clone(), score })
        })
        .collect();
    SearchResults { total_hits, hits }
}

fn score_expr(snapshot: &Snapshot, expr: &QueryExpr) -> HashMap<DocId, u32> {
    match expr {
        QueryExpr::Term(term) => snapshot
            .live_postings(term)
            .map(|p| (p.doc_id, p.term_frequency()))
            .collect(),
        QueryExpr::Phrase(phrase) => phrase_matches(snapshot, phrase).into_iter().map(|d| (d, 1)).collect(),
        QueryExpr::Or(subs) => {
            let mut acc: HashMap<DocId, u32> = HashMap::new();
            for sub in subs {
                for (doc_id, score) in score_expr(snapshot, sub) {
                    let slot = acc.entry(doc_id).or_insert(0);
                    *slot = slot.saturating_add(score);
                }
            }
            acc
        }
    }
}

/// Live documents containing `phrase` within its slop.
pub fn phrase_matches(snapshot: &Snapshot, phrase: &PhraseQuery) -> Vec<DocId> {
    let terms = phrase.terms();
    if terms.is_empty() {
        return Vec::new();
    }
    let mut lists: Vec<&PostingsList> = Vec::with_capacity(terms.len());
    for term in terms {
        match snapshot.postings(term) {
            Some(list) => lists.push(list),
            None => return Vec::new(),
        }
    }

    // a term repeated in the phrase needs that many distinct positions
    let needed: Vec<usize> = terms.iter().map(|t| terms.iter().filter(|u| *u == t).count()).collect();

    let mut matched = Vec::new();
    for doc_id in intersect_doc_ids(&lists) {
        if !snapshot.is_live(doc_id) {
            continue;
        }
        let positions: Vec<&[u32]> = lists
            .iter()
            .filter_map(|l| l.get(doc_id).map(|p| p.positions.as_slice()))
            .collect();
        if positions.iter().zip(&needed).any(|(p, &n)| p.len() < n) {
            continue;
        }
        if min_deviation(&positions, phrase.offsets(), phrase.slop()).is_some() {
            matched.push(doc_id);
        }
    }
    matched
}

/// Doc ids present in every list. Lists are ascending, so the shortest one
/// drives and the others advance cursors monotonically.
fn intersect_doc_ids(lists: &[&PostingsList]) -> Vec<DocId> {
    let Some(shortest) = (0..lists.len()).min_by_key(|&i| lists[i].len()) else {
        return Vec::new();
    };
    let mut cursors = vec![0usize; lists.len()];
    let mut out = Vec::new();

    'candidates: for posting in lists[shortest].iter() {
        let doc_id = posting.doc_id;
        for (i, list) in lists.iter().enumerate() {
            if i == shortest {
                continue;
            }
            let postings = list.as_slice();
            let cursor = &mut cursors[i];
            while *cursor < postings.len() && postings[*cursor].doc_id < doc_id {
                *cursor += 1;
            }
            match postings.get(*cursor) {
                None => break 'candidates,
                Some(p) if p.doc_id != doc_id => continue 'candidates,
                Some(_) => {}
            }
        }
        out.push(doc_id);
    }
    out
}

/// Smallest total gap deviation over assignments of one distinct position
/// per phrase term, or `None` when every assignment exceeds `slop`.
///
/// `positions[i]` are the ascending positions of the i-th phrase term in one
/// document and `offsets[i]` its position within the phrase.
pub(crate) fn min_deviation(positions: &[&[u32]], offsets: &[u32], slop: u32) -> Option<u32> {
    if positions.is_empty() || positions.len() != offsets.len() {
        return None;
    }
    if slop == 0 {
        return exact_match(positions, offsets).then_some(0);
    }
    sloppy_match(positions, offsets, slop)
}

/// k-way merge over the position lists shifted back by each term's phrase
/// offset: a common value is a phrase start.
fn exact_match(positions: &[&[u32]], offsets: &[u32]) -> bool {
    let mut cursors = vec![0usize; positions.len()];
    let mut target: u32 = 0;
    loop {
        let mut aligned = true;
        for (i, list) in positions.iter().enumerate() {
            let offset = offsets[i];
            let cursor = &mut cursors[i];
            // positions before the offset cannot start a phrase
            while *cursor < list.len() && (list[*cursor] < offset || list[*cursor] - offset < target) {
                *cursor += 1;
            }
            let Some(&p) = list.get(*cursor) else {
                return false;
            };
            let start = p - offset;
            if start > target {
                target = start;
                aligned = false;
            }
        }
        if aligned {
            return true;
        }
    }
}

/// Cheapest way to reach one position of a phrase term: the accumulated
/// deviation and the index of the chosen position of the previous term.
#[derive(Debug, Clone, Copy)]
struct Step {
    cost: u32,
    prev: usize,
}

/// Layered search over (term, position) states. Each state keeps only its
/// cheapest predecessor whose path does not already use the position, so
/// the work is bounded by terms x positions x slop window x phrase length.
fn sloppy_match(positions: &[&[u32]], offsets: &[u32], slop: u32) -> Option<u32> {
    let slop = i64::from(slop);
    let mut layers: Vec<Vec<Option<Step>>> = Vec::with_capacity(positions.len());
    layers.push(vec![Some(Step { cost: 0, prev: 0 }); positions[0].len()]);

    for i in 1..positions.len() {
        let gap = i64::from(offsets[i]) - i64::from(offsets[i - 1]);
        let before = positions[i - 1];
        let reachable = &layers[i - 1];
        let mut layer = Vec::with_capacity(positions[i].len());

        for &p in positions[i] {
            let target = i64::from(p) - gap;
            let from = before.partition_point(|&q| i64::from(q) < target - slop);
            let mut best: Option<Step> = None;
            for (j, &q) in before.iter().enumerate().skip(from) {
                if i64::from(q) > target + slop {
                    break;
                }
                let Some(step) = reachable[j] else { continue };
                let cost = i64::from(step.cost) + (i64::from(q) - target).abs();
                if cost > slop || best.is_some_and(|b| i64::from(b.cost) <= cost) {
                    continue;
                }
                if path_uses(&layers, positions, i - 1, j, p) {
                    continue;
                }
                best = Some(Step { cost: cost as u32, prev: j });
            }
            layer.push(best);
        }

        if layer.iter().all(Option::is_none) {
            return None;
        }
        layers.push(layer);
    }

    layers.last()?.iter().flatten().map(|s| s.cost).min()
}

/// Whether the path ending at `positions[term][index]` already holds `position`.
fn path_uses(
    layers: &[Vec<Option<Step>>],
    positions: &[&[u32]],
    mut term: usize,
    mut index: usize,
    position: u32,
) -> bool {
    loop {
        if positions[term][index] == position {
            return true;
        }
        if term == 0 {
            return false;
        }
        match layers[term][index] {
            Some(step) => index = step.prev,
            None => return false,
        }
        term -= 1;
    }
}

/// A snapshot paired with the parser matching its analyzer.
#[derive(Debug, Clone)]
pub struct Searcher {
    snapshot: Snapshot,
    parser: QueryParser,
}

impl Searcher {
    pub fn new(snapshot: Snapshot) -> Self {
        let parser = QueryParser::new(snapshot.analyzer().clone());
        Self { snapshot, parser }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn parse(&self, query: &str) -> Result<QueryExpr> {
        self.parser.parse(query)
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        let expr = self.parse(query)?;
        tracing::debug!(%expr, "evaluating query");
        Ok(self.evaluate(&expr, options))
    }

    pub fn evaluate(&self, expr: &QueryExpr, options: &SearchOptions) -> SearchResults {
        evaluate(&self.snapshot, expr, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InvertedIndex;
    use crate::tokenizer::tokenize;

    fn snapshot(docs: &[&str]) -> Snapshot {
        let mut index = InvertedIndex::new();
        for (i, text) in docs.iter().enumerate() {
            index.add_or_update_document(&format!("doc{i}"), tokenize(text));
        }
        index.open_snapshot()
    }

    fn ids(results: &SearchResults) -> Vec<DocId> {
        results.hits.iter().map(|h| h.doc_id).collect()
    }

    fn phrase(terms: &[&str], slop: u32) -> QueryExpr {
        QueryExpr::Phrase(PhraseQuery::new(terms.iter().copied()).with_slop(slop))
    }

    #[test]
    fn term_scores_by_frequency() {
        let snap = snapshot(&["fox", "fox fox", "hen"]);
        let res = evaluate(&snap, &QueryExpr::Term("fox".into()), &SearchOptions::default());
        assert_eq!(ids(&res), vec![1, 0]);
        assert_eq!(res.hits[0].score, 2);
        assert_eq!(res.hits[0].path, "doc1");
    }

    #[test]
    fn or_sums_branch_scores() {
        let snap = snapshot(&["the quick brown fox", "the lazy fox"]);
        let expr = QueryExpr::Or(vec![QueryExpr::Term("fox".into()), QueryExpr::Term("lazy".into())]);
        let res = evaluate(&snap, &expr, &SearchOptions::default());
        assert_eq!(ids(&res), vec![1, 0]);
        assert_eq!(res.hits.iter().map(|h| h.score).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn ties_break_on_doc_id_and_limit_truncates() {
        let snap = snapshot(&["a", "a", "a"]);
        let res = evaluate(&snap, &QueryExpr::Term("a".into()), &SearchOptions { limit: 2 });
        assert_eq!(res.total_hits, 3);
        assert_eq!(ids(&res), vec![0, 1]);
    }

    #[test]
    fn sloppy_phrase_example() {
        let snap = snapshot(&["the quick brown fox", "the lazy fox"]);
        let opts = SearchOptions::default();
        assert!(ids(&evaluate(&snap, &phrase(&["quick", "fox"], 0), &opts)).is_empty());
        assert_eq!(ids(&evaluate(&snap, &phrase(&["quick", "fox"], 1), &opts)), vec![0]);
        assert_eq!(evaluate(&snap, &phrase(&["quick", "fox"], 1), &opts).hits[0].score, 1);
    }

    #[test]
    fn exact_phrase_needs_contiguous_order() {
        let snap = snapshot(&["french fries", "fries french", "french cut fries", "french fries french fries"]);
        let res = evaluate(&snap, &phrase(&["french", "fries"], 0), &SearchOptions::default());
        assert_eq!(ids(&res), vec![0, 3]);
    }

    #[test]
    fn reversed_pair_costs_two() {
        let snap = snapshot(&["steak hamburger"]);
        let opts = SearchOptions::default();
        assert!(evaluate(&snap, &phrase(&["hamburger", "steak"], 1), &opts).hits.is_empty());
        assert_eq!(ids(&evaluate(&snap, &phrase(&["hamburger", "steak"], 2), &opts)), vec![0]);
    }

    #[test]
    fn repeated_terms_need_distinct_positions() {
        let snap = snapshot(&["fox", "fox fox"]);
        let opts = SearchOptions::default();
        assert_eq!(ids(&evaluate(&snap, &phrase(&["fox", "fox"], 0), &opts)), vec![1]);
        assert_eq!(ids(&evaluate(&snap, &phrase(&["fox", "fox"], 5), &opts)), vec![1]);
    }

    #[test]
    fn phrase_repeating_a_term_more_than_the_document_never_matches() {
        let doc = vec!["a"; 12].join(" ");
        let snap = snapshot(&[doc.as_str()]);
        assert!(phrase_matches(&snap, &PhraseQuery::new(vec!["a"; 13]).with_slop(200)).is_empty());
        assert_eq!(phrase_matches(&snap, &PhraseQuery::new(vec!["a"; 12]).with_slop(200)), vec![0]);
    }

    #[test]
    fn long_repeated_phrase_with_wide_slop_finishes() {
        // thirty a's, thirty fillers, then b at position 60
        let doc = format!("{} {} b", vec!["a"; 30].join(" "), vec!["c"; 30].join(" "));
        let snap = snapshot(&[doc.as_str()]);
        let mut terms = vec!["a"; 10];
        terms.push("b");
        // b is expected right after the tenth a, but sits at least 21 words too far
        assert!(phrase_matches(&snap, &PhraseQuery::new(terms.clone()).with_slop(20)).is_empty());
        assert_eq!(phrase_matches(&snap, &PhraseQuery::new(terms.clone()).with_slop(30)), vec![0]);
        assert_eq!(phrase_matches(&snap, &PhraseQuery::new(terms).with_slop(200)), vec![0]);
    }

    #[test]
    fn sloppy_match_keeps_repeated_positions_distinct() {
        let a: &[u32] = &[0, 5];
        // the second a wants position 1; the nearest free one is 5
        assert_eq!(min_deviation(&[a, a], &[0, 1], 10), Some(4));
        let single: &[u32] = &[3];
        assert_eq!(min_deviation(&[single, single], &[0, 1], 10), None);
    }

    #[test]
    fn missing_term_short_circuits() {
        let snap = snapshot(&["the quick brown fox"]);
        assert!(phrase_matches(&snap, &PhraseQuery::new(["quick", "zebra"]).with_slop(10)).is_empty());
    }

    #[test]
    fn dead_documents_never_match() {
        let mut index = InvertedIndex::new();
        index.add_or_update_document("a", tokenize("quick fox"));
        index.add_or_update_document("a", tokenize("slow turtle"));
        let snap = index.open_snapshot();
        let opts = SearchOptions::default();
        assert!(evaluate(&snap, &QueryExpr::Term("fox".into()), &opts).hits.is_empty());
        assert!(evaluate(&snap, &phrase(&["quick", "fox"], 0), &opts).hits.is_empty());
    }

    #[test]
    fn min_deviation_reports_smallest_cost() {
        let a: &[u32] = &[0, 10];
        let b: &[u32] = &[3, 12];
        // best is 10 -> 12, one extra word in between
        assert_eq!(min_deviation(&[a, b], &[0, 1], 5), Some(1));
        assert_eq!(min_deviation(&[a, b], &[0, 1], 0), None);

        // 0 _ 2 _ 4 deviates by one at each gap
        let x: &[u32] = &[0];
        let y: &[u32] = &[2];
        let z: &[u32] = &[4];
        assert_eq!(min_deviation(&[x, y, z], &[0, 1, 2], 2), Some(2));
        assert_eq!(min_deviation(&[x, y, z], &[0, 1, 2], 1), None);
    }

    #[test]
    fn exact_match_honours_offsets() {
        let quick: &[u32] = &[1];
        let fox_far: &[u32] = &[3];
        let fox_near: &[u32] = &[2];
        // fox expected two positions after quick
        assert_eq!(min_deviation(&[quick, fox_far], &[0, 2], 0), Some(0));
        assert_eq!(min_deviation(&[quick, fox_near], &[0, 2], 0), None);
        assert_eq!(min_deviation(&[quick, fox_near], &[0, 2], 1), Some(1));
    }

    #[test]
    fn searcher_parses_with_index_analyzer() {
        let snap = snapshot(&["Hamburger and steak", "hamburger steak"]);
        let searcher = Searcher::new(snap);
        let opts = SearchOptions::default();
        assert_eq!(ids(&searcher.search("\"hamburger steak\"", &opts).unwrap()), vec![1]);
        assert_eq!(ids(&searcher.search("\"HAMBURGER steak\"~1", &opts).unwrap()), vec![0, 1]);
        assert!(searcher.search("\"hamburger", &opts).is_err());
    }
}
