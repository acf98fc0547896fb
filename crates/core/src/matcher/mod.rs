pub mod ai;
pub mod fuzzy;
pub mod text;

use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, MenuItem, Question};
use crate::domain::cart::SelectedQuestion;
use crate::intent::IntentItem;

pub use ai::AiAssistedMatcher;
pub use fuzzy::FuzzyProductMatcher;

/// A free-text mention resolved to exactly one menu item. `preselected`
/// carries customization answers the customer named in the same sentence;
/// the item only skips its question walk when every required question is
/// already satisfied (see [`required_questions_satisfied`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMention {
    pub item: MenuItem,
    pub quantity: u32,
    #[serde(default)]
    pub preselected: Vec<SelectedQuestion>,
}

/// Candidates that all plausibly match one customer phrase, pending
/// disambiguation by number or clarifying text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmbiguityGroup {
    /// Normalized phrase; the grouping key.
    pub phrase_key: String,
    /// The literal phrase as the customer typed it.
    pub literal: String,
    pub quantity: u32,
    pub candidates: Vec<MenuItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub resolved: Vec<ResolvedMention>,
    /// Keyed by normalized phrase so repeated ambiguous mentions merge
    /// deterministically, independent of iteration order.
    pub ambiguities: BTreeMap<String, AmbiguityGroup>,
}

impl MatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.ambiguities.is_empty()
    }

    pub fn merge_ambiguity(&mut self, group: AmbiguityGroup) {
        self.ambiguities
            .entry(group.phrase_key.clone())
            .and_modify(|existing| existing.quantity += group.quantity)
            .or_insert(group);
    }
}

#[derive(Clone, Debug, Default)]
pub struct MatchInput<'a> {
    pub text: &'a str,
    pub intent_items: &'a [IntentItem],
}

/// One matching strategy. Strategies are independently testable and tried
/// in a fixed order by [`MatcherStack`].
pub trait MatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, input: &MatchInput<'_>, catalog: &Catalog, day: Weekday) -> MatchOutcome;
}

/// Deterministic fuzzy matching first, AI-assisted mapping second; the
/// first strategy producing any outcome wins the turn.
pub struct MatcherStack {
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl Default for MatcherStack {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(FuzzyProductMatcher::default()),
                Box::new(AiAssistedMatcher::default()),
            ],
        }
    }
}

impl MatcherStack {
    pub fn new(strategies: Vec<Box<dyn MatchStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, input: &MatchInput<'_>, catalog: &Catalog, day: Weekday) -> MatchOutcome {
        for strategy in &self.strategies {
            let outcome = strategy.resolve(input, catalog, day);
            if !outcome.is_empty() {
                tracing::debug!(
                    strategy = strategy.name(),
                    resolved = outcome.resolved.len(),
                    ambiguous = outcome.ambiguities.len(),
                    "product mentions resolved"
                );
                return outcome;
            }
        }
        MatchOutcome::default()
    }
}

/// True when every required question (`min_required > 0`) of `item` is
/// satisfied by `preselected`.
pub fn required_questions_satisfied(item: &MenuItem, preselected: &[SelectedQuestion]) -> bool {
    item.questions.iter().filter(|question| question.is_required()).all(|question| {
        answered_count(question, preselected) >= question.min_required
    })
}

fn answered_count(question: &Question, preselected: &[SelectedQuestion]) -> u32 {
    preselected
        .iter()
        .filter(|selection| selection.question_id == question.id)
        .flat_map(|selection| selection.answers.iter())
        .map(|answer| answer.quantity)
        .sum()
}
