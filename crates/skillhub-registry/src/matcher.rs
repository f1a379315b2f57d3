//! Trigger matching of free-text queries against `load_when` phrases.

// Precision loss from usize->f32 is acceptable for match scoring
#![allow(clippy::cast_precision_loss)]

use skillhub_types::{Document, ExtensionRef};

use crate::registry::Registry;

/// Weight applied to word-level (non-substring) matches
const FUZZY_WEIGHT: f32 = 0.8;
/// Shortest word that may match by prefix
const MIN_FUZZY_WORD: usize = 3;

/// A document whose triggers matched a query
#[derive(Debug, Clone)]
pub struct TriggerMatch<'a> {
    /// The matched document
    pub document: &'a Document,
    /// Match score; 1.0 is an exact phrase match
    pub score: f32,
    /// The trigger phrase that scored highest
    pub phrase: &'a str,
}

/// Matches queries against document trigger phrases
#[derive(Debug, Default, Clone, Copy)]
pub struct TriggerMatcher {
    /// Minimum score for a match to be returned
    min_score: f32,
}

impl TriggerMatcher {
    /// Create a matcher that returns every match
    #[must_use]
    pub const fn new() -> Self {
        Self { min_score: 0.0 }
    }

    /// Set the minimum score for returned matches
    #[must_use]
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score.max(0.0);
        self
    }

    /// Find documents whose triggers match the query.
    ///
    /// Ordered by score (highest first), then cheaper `context_cost`, then
    /// name. Documents without triggers never match.
    #[must_use]
    pub fn find<'a>(&self, query: &str, registry: &'a Registry) -> Vec<TriggerMatch<'a>> {
        let query = normalize(query);
        if query.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<TriggerMatch<'a>> = registry
            .iter()
            .filter(|doc| doc.has_triggers())
            .filter_map(|doc| Self::best_phrase(doc, &query))
            .filter(|m| m.score >= self.min_score)
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.document.context_cost.cmp(&b.document.context_cost))
                .then_with(|| a.document.name.cmp(&b.document.name))
        });

        matches
    }

    fn best_phrase<'a>(doc: &'a Document, query: &str) -> Option<TriggerMatch<'a>> {
        doc.load_when
            .iter()
            .filter_map(|phrase| {
                score_phrase(&normalize(phrase), query).map(|score| TriggerMatch {
                    document: doc,
                    score,
                    phrase: phrase.as_str(),
                })
            })
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Lowercase, trim and collapse internal whitespace
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Score a normalized phrase against a normalized query.
///
/// - phrase inside query: phrase length / query length
/// - query inside phrase: query length / phrase length
/// - every phrase word prefix-matches a query word: covered length / query
///   length, weighted down
fn score_phrase(phrase: &str, query: &str) -> Option<f32> {
    if phrase.is_empty() {
        return None;
    }

    let phrase_len = phrase.chars().count() as f32;
    let query_len = query.chars().count() as f32;

    if query.contains(phrase) {
        return Some(phrase_len / query_len);
    }
    if phrase.contains(query) {
        return Some(query_len / phrase_len);
    }

    let query_words: Vec<&str> = query.split(' ').collect();
    let mut covered = 0usize;
    for word in phrase.split(' ') {
        let hit = query_words
            .iter()
            .filter(|q| word_match(word, q))
            .map(|q| word.chars().count().min(q.chars().count()))
            .max()?;
        covered += hit;
    }

    Some(FUZZY_WEIGHT * (covered as f32 / query_len).min(1.0))
}

fn word_match(a: &str, b: &str) -> bool {
    let shorter = a.chars().count().min(b.chars().count());
    a == b || (shorter >= MIN_FUZZY_WORD && (a.starts_with(b) || b.starts_with(a)))
}

/// Whether the query names an extension by stem or file name
#[must_use]
pub fn names_extension(query: &str, ext: &ExtensionRef) -> bool {
    let query = normalize(query);
    let stem = ext.name.to_lowercase();
    let file = ext.file_name().map(str::to_lowercase);

    query
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .map(|token| token.trim_end_matches('.'))
        .any(|token| token == stem || file.as_deref() == Some(token))
}
