use chrono::Weekday;

use crate::catalog::{Catalog, MenuItem};
use crate::domain::cart::{SelectedAnswer, SelectedQuestion};
use crate::matcher::text::{base_name, normalize};
use crate::matcher::{
    AmbiguityGroup, FuzzyProductMatcher, MatchInput, MatchOutcome, MatchStrategy, ResolvedMention,
};

/// AI-assisted matcher: maps the classifier's extracted items onto the
/// catalog, including customization answers the customer named explicitly
/// in the same sentence ("com parmesão e bife grelhado"). Falls back to
/// nothing when the classifier extracted no items, letting the
/// deterministic strategy's outcome stand.
#[derive(Default)]
pub struct AiAssistedMatcher {
    fuzzy: FuzzyProductMatcher,
}

impl MatchStrategy for AiAssistedMatcher {
    fn name(&self) -> &'static str {
        "ai-assisted"
    }

    fn resolve(&self, input: &MatchInput<'_>, catalog: &Catalog, day: Weekday) -> MatchOutcome {
        let available = catalog.items_available_on(day);
        let mut outcome = MatchOutcome::default();

        for intent_item in input.intent_items {
            let phrase = base_name(&intent_item.name);
            if phrase.is_empty() {
                continue;
            }

            let candidates = self.fuzzy.candidates(&phrase, &available);
            match candidates.len() {
                0 => continue,
                1 => {
                    let item = candidates[0];
                    let preselected = map_named_answers(item, &intent_item.answers);
                    let quantity = intent_item.quantity.max(1);
                    match outcome.resolved.iter_mut().find(|r| r.item.id == item.id) {
                        Some(existing) => {
                            existing.quantity += quantity;
                            merge_selections(&mut existing.preselected, preselected);
                        }
                        None => outcome.resolved.push(ResolvedMention {
                            item: item.clone(),
                            quantity,
                            preselected,
                        }),
                    }
                }
                _ => outcome.merge_ambiguity(AmbiguityGroup {
                    phrase_key: phrase,
                    literal: intent_item.name.clone(),
                    quantity: intent_item.quantity.max(1),
                    candidates: candidates.into_iter().cloned().collect(),
                }),
            }
        }

        outcome
    }
}

/// Duplicate extractions of the same item merge like repeated text
/// mentions do: quantities sum and named answers accumulate.
fn merge_selections(existing: &mut Vec<SelectedQuestion>, incoming: Vec<SelectedQuestion>) {
    for selection in incoming {
        match existing.iter_mut().find(|s| s.question_id == selection.question_id) {
            Some(present) => {
                for answer in selection.answers {
                    match present.answers.iter_mut().find(|a| a.answer_id == answer.answer_id) {
                        Some(known) => known.quantity += answer.quantity,
                        None => present.answers.push(answer),
                    }
                }
            }
            None => existing.push(selection),
        }
    }
}

/// Maps explicitly named options onto the item's question answers. An
/// option counts only when it matches exactly one answer across the
/// item's questions.
fn map_named_answers(item: &MenuItem, named: &[String]) -> Vec<SelectedQuestion> {
    let mut selections: Vec<SelectedQuestion> = Vec::new();

    for option in named {
        let needle = normalize(option);
        if needle.is_empty() {
            continue;
        }

        let mut hits = Vec::new();
        for question in &item.questions {
            for answer in &question.answers {
                let answer_name = normalize(&answer.name);
                // "com parmesão" names the "Parmesão" answer; containment
                // is checked both ways.
                if answer_name.contains(&needle) || needle.contains(&answer_name) {
                    hits.push((question, answer));
                }
            }
        }
        let [(question, answer)] = hits.as_slice() else {
            continue;
        };

        let selected = SelectedAnswer {
            answer_id: answer.id.clone(),
            name: answer.name.clone(),
            surcharge: answer.surcharge_or_zero(),
            quantity: 1,
        };
        match selections.iter_mut().find(|s| s.question_id == question.id) {
            Some(existing) => existing.answers.push(selected),
            None => selections.push(SelectedQuestion {
                question_id: question.id.clone(),
                name: question.name.clone(),
                answers: vec![selected],
            }),
        }
    }

    selections
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;
    use rust_decimal::Decimal;

    use crate::catalog::{
        Answer, AnswerId, Catalog, Category, CategoryId, MenuItem, MenuItemId, Question,
        QuestionId, QuestionKind,
    };
    use crate::intent::IntentItem;
    use crate::matcher::{required_questions_satisfied, MatchInput, MatchStrategy};

    use super::AiAssistedMatcher;

    fn marmitex() -> MenuItem {
        MenuItem {
            id: MenuItemId("marmitex-medio".to_owned()),
            name: "Marmitex Médio".to_owned(),
            description: None,
            base_price: Decimal::new(2200, 2),
            available_on: Default::default(),
            questions: vec![
                Question {
                    id: QuestionId("carne".to_owned()),
                    name: "Escolha a carne".to_owned(),
                    kind: QuestionKind::SingleSelect,
                    min_required: 1,
                    max_allowed: 1,
                    answers: vec![
                        Answer {
                            id: AnswerId("bife".to_owned()),
                            name: "Bife Grelhado".to_owned(),
                            surcharge: None,
                            max_quantity: None,
                        },
                        Answer {
                            id: AnswerId("frango".to_owned()),
                            name: "Frango Assado".to_owned(),
                            surcharge: None,
                            max_quantity: None,
                        },
                    ],
                },
                Question {
                    id: QuestionId("adicionais".to_owned()),
                    name: "Adicionais".to_owned(),
                    kind: QuestionKind::MultiSelect,
                    min_required: 0,
                    max_allowed: 3,
                    answers: vec![Answer {
                        id: AnswerId("parmesao".to_owned()),
                        name: "Parmesão".to_owned(),
                        surcharge: Some(Decimal::new(400, 2)),
                        max_quantity: Some(2),
                    }],
                },
            ],
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![Category {
            id: CategoryId("pratos".to_owned()),
            name: "Pratos".to_owned(),
            items: vec![marmitex()],
        }])
    }

    fn resolve(items: &[IntentItem]) -> crate::matcher::MatchOutcome {
        AiAssistedMatcher::default().resolve(
            &MatchInput { text: "", intent_items: items },
            &catalog(),
            Weekday::Mon,
        )
    }

    #[test]
    fn named_answers_preselect_and_satisfy_required_questions() {
        let outcome = resolve(&[IntentItem {
            name: "marmitex".to_owned(),
            quantity: 1,
            answers: vec!["com parmesão".to_owned(), "bife grelhado".to_owned()],
        }]);

        assert_eq!(outcome.resolved.len(), 1);
        let mention = &outcome.resolved[0];
        assert_eq!(mention.preselected.len(), 2);
        assert!(required_questions_satisfied(&mention.item, &mention.preselected));
    }

    #[test]
    fn partially_named_answers_leave_required_question_open() {
        let outcome = resolve(&[IntentItem {
            name: "marmitex".to_owned(),
            quantity: 1,
            answers: vec!["com parmesão".to_owned()],
        }]);

        let mention = &outcome.resolved[0];
        // Only the optional "Adicionais" question was named; the required
        // meat question is still open, so the item cannot skip the walk.
        assert!(!required_questions_satisfied(&mention.item, &mention.preselected));
    }

    #[test]
    fn ambiguous_named_option_is_ignored() {
        // "grelhado" alone is unambiguous here, but "a" matches nothing
        // and an empty option is dropped.
        let outcome = resolve(&[IntentItem {
            name: "marmitex".to_owned(),
            quantity: 2,
            answers: vec!["".to_owned(), "grelhado".to_owned()],
        }]);

        let mention = &outcome.resolved[0];
        assert_eq!(mention.quantity, 2);
        assert_eq!(mention.preselected.len(), 1);
        assert_eq!(mention.preselected[0].answers[0].name, "Bife Grelhado");
    }

    #[test]
    fn duplicate_intent_items_merge_with_summed_quantity() {
        let outcome = resolve(&[
            IntentItem {
                name: "marmitex".to_owned(),
                quantity: 1,
                answers: vec!["com parmesão".to_owned()],
            },
            IntentItem { name: "marmitex".to_owned(), quantity: 2, answers: Vec::new() },
        ]);

        assert_eq!(outcome.resolved.len(), 1);
        assert_eq!(outcome.resolved[0].quantity, 3);
        assert_eq!(outcome.resolved[0].preselected.len(), 1);
    }

    #[test]
    fn no_intent_items_produces_empty_outcome() {
        let outcome = resolve(&[]);
        assert!(outcome.is_empty());
    }
}
