use chrono::Weekday;
use strsim::jaro_winkler;

use crate::catalog::{Catalog, MenuItem};
use crate::matcher::text::{base_name, parse_mention, split_mentions};
use crate::matcher::{AmbiguityGroup, MatchInput, MatchOutcome, MatchStrategy, ResolvedMention};

/// Minimum Jaro-Winkler similarity for a phrase/base-name pair to count
/// as a match. Substring containment always counts.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Deterministic matcher: normalization + conjunction splitting + quantity
/// extraction + Jaro-Winkler search over catalog base names.
///
/// Decision rule per mention: zero matches are discarded silently (the
/// rest of the message still resolves), exactly one match resolves
/// directly, two or more become an ambiguity group keyed by the
/// normalized phrase.
pub struct FuzzyProductMatcher {
    threshold: f64,
}

impl Default for FuzzyProductMatcher {
    fn default() -> Self {
        Self { threshold: SIMILARITY_THRESHOLD }
    }
}

impl FuzzyProductMatcher {
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn candidates<'c>(&self, phrase: &str, items: &[&'c MenuItem]) -> Vec<&'c MenuItem> {
        items
            .iter()
            .filter(|item| {
                let base = base_name(&item.name);
                if base.is_empty() {
                    return false;
                }
                base.contains(phrase) || phrase.contains(&base) || jaro_winkler(phrase, &base) >= self.threshold
            })
            .copied()
            .collect()
    }
}

impl MatchStrategy for FuzzyProductMatcher {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn resolve(&self, input: &MatchInput<'_>, catalog: &Catalog, day: Weekday) -> MatchOutcome {
        let available = catalog.items_available_on(day);
        let mut outcome = MatchOutcome::default();

        for mention in split_mentions(input.text) {
            let (quantity, phrase) = parse_mention(&mention);
            if phrase.is_empty() {
                continue;
            }

            let candidates = self.candidates(&phrase, &available);
            match candidates.len() {
                0 => continue,
                1 => {
                    let item = candidates[0];
                    match outcome.resolved.iter_mut().find(|r| r.item.id == item.id) {
                        Some(existing) => existing.quantity += quantity,
                        None => outcome.resolved.push(ResolvedMention {
                            item: item.clone(),
                            quantity,
                            preselected: Vec::new(),
                        }),
                    }
                }
                _ => outcome.merge_ambiguity(AmbiguityGroup {
                    phrase_key: phrase.clone(),
                    literal: mention,
                    quantity,
                    candidates: candidates.into_iter().cloned().collect(),
                }),
            }
        }

        outcome
    }
}
