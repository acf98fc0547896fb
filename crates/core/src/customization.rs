//! Per-product customization walk: one question per outbound message,
//! strictly sequential, never advancing on invalid input.

use serde::{Deserialize, Serialize};

use crate::catalog::{AnswerId, MenuItem, Question, QuestionKind};
use crate::domain::cart::{CartItem, SelectedAnswer, SelectedQuestion};
use crate::matcher::text::normalize;

/// The state of one product instance being configured. Serialized into
/// the conversation document between turns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomizationSession {
    pub item: MenuItem,
    pub quantity: u32,
    pub question_index: usize,
    pub selections: Vec<SelectedQuestion>,
}

/// One customer reply inside the walk.
#[derive(Clone, Debug, PartialEq)]
pub enum AnswerInput<'a> {
    /// Free text; resolved via the single-match keyword shortcut.
    Text(&'a str),
    /// A structured pick (list reply), with the quantity chosen for it.
    Answer { answer_id: AnswerId, quantity: u32 },
    /// One AI-assisted multi-answer extraction, applied atomically.
    Extracted(Vec<(AnswerId, u32)>),
    /// "That's all" on a multi-select question.
    Done,
    /// Explicit skip; only valid when the question is optional.
    Skip,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    /// Present (or keep presenting) this question.
    Ask(Question),
    /// Invalid input; restate the same question with the reason.
    Reprompt { question: Question, reason: String },
    /// All questions answered; the fully-priced cart item is ready.
    Complete(CartItem),
}

impl CustomizationSession {
    /// A quantity of zero means the customer has not said how many yet;
    /// the completed cart item keeps the zero for the quantity question.
    pub fn new(item: MenuItem, quantity: u32, preselected: Vec<SelectedQuestion>) -> Self {
        Self { item, quantity, question_index: 0, selections: preselected }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.item.questions.get(self.question_index)
    }

    /// Entry outcome when the walk starts: skips questions already
    /// satisfied by preselected answers and asks the first open one.
    pub fn first_prompt(&mut self) -> StepOutcome {
        self.skip_satisfied();
        match self.current_question() {
            Some(question) => StepOutcome::Ask(question.clone()),
            None => StepOutcome::Complete(self.build_cart_item()),
        }
    }

    pub fn apply(&mut self, input: AnswerInput<'_>) -> StepOutcome {
        let Some(question) = self.current_question().cloned() else {
            return StepOutcome::Complete(self.build_cart_item());
        };

        match question.kind {
            QuestionKind::SingleSelect => self.apply_single(&question, input),
            QuestionKind::MultiSelect => self.apply_multi(&question, input),
        }
    }

    fn apply_single(&mut self, question: &Question, input: AnswerInput<'_>) -> StepOutcome {
        let picked = match input {
            AnswerInput::Answer { answer_id, .. } => question.answer(&answer_id).cloned(),
            AnswerInput::Extracted(list) => match list.as_slice() {
                [(answer_id, _)] => question.answer(answer_id).cloned(),
                _ => None,
            },
            AnswerInput::Text(text) => keyword_shortcut(question, text),
            AnswerInput::Skip | AnswerInput::Done => {
                if question.min_required == 0 {
                    return self.advance();
                }
                None
            }
        };

        match picked {
            Some(answer) => {
                self.record(question, &answer, 1);
                self.advance()
            }
            None => StepOutcome::Reprompt {
                question: question.clone(),
                reason: format!("Escolha uma das opções de \"{}\".", question.name),
            },
        }
    }

    fn apply_multi(&mut self, question: &Question, input: AnswerInput<'_>) -> StepOutcome {
        match input {
            AnswerInput::Answer { answer_id, quantity } => {
                let Some(answer) = question.answer(&answer_id).cloned() else {
                    return self.range_reprompt(question);
                };
                let quantity = quantity.max(1).min(answer.max_quantity.unwrap_or(u32::MAX));
                if self.answered_count(&question.id) + quantity > question.max_allowed {
                    return self.range_reprompt(question);
                }
                self.record(question, &answer, quantity);
                if self.answered_count(&question.id) >= question.max_allowed {
                    return self.advance();
                }
                StepOutcome::Ask(question.clone())
            }
            AnswerInput::Extracted(list) => {
                let before = self.selections.clone();
                for (answer_id, quantity) in &list {
                    let Some(answer) = question.answer(answer_id).cloned() else {
                        continue;
                    };
                    let quantity = (*quantity).max(1).min(answer.max_quantity.unwrap_or(u32::MAX));
                    self.record(question, &answer, quantity);
                }
                let count = self.answered_count(&question.id);
                if count >= question.min_required && count <= question.max_allowed {
                    return self.advance();
                }
                // Atomic: an extraction outside the valid range is
                // discarded entirely, never partially applied.
                self.selections = before;
                self.range_reprompt(question)
            }
            AnswerInput::Text(text) => match keyword_shortcut(question, text) {
                Some(answer) => self.apply_multi(
                    question,
                    AnswerInput::Answer { answer_id: answer.id, quantity: 1 },
                ),
                None => self.range_reprompt(question),
            },
            AnswerInput::Done => {
                if self.answered_count(&question.id) >= question.min_required {
                    self.advance()
                } else {
                    self.range_reprompt(question)
                }
            }
            AnswerInput::Skip => {
                if question.min_required == 0 {
                    self.advance()
                } else {
                    self.range_reprompt(question)
                }
            }
        }
    }

    fn advance(&mut self) -> StepOutcome {
        self.question_index += 1;
        self.skip_satisfied();
        match self.current_question() {
            Some(question) => StepOutcome::Ask(question.clone()),
            None => StepOutcome::Complete(self.build_cart_item()),
        }
    }

    fn skip_satisfied(&mut self) {
        while let Some(question) = self.current_question() {
            let satisfied = question.min_required > 0
                && self.answered_count(&question.id) >= question.min_required;
            if satisfied {
                self.question_index += 1;
            } else {
                break;
            }
        }
    }

    fn answered_count(&self, question_id: &crate::catalog::QuestionId) -> u32 {
        self.selections
            .iter()
            .filter(|selection| &selection.question_id == question_id)
            .flat_map(|selection| selection.answers.iter())
            .map(|answer| answer.quantity)
            .sum()
    }

    fn record(&mut self, question: &Question, answer: &crate::catalog::Answer, quantity: u32) {
        let selected = SelectedAnswer {
            answer_id: answer.id.clone(),
            name: answer.name.clone(),
            surcharge: answer.surcharge_or_zero(),
            quantity,
        };
        match self.selections.iter_mut().find(|s| s.question_id == question.id) {
            Some(existing) => match existing.answers.iter_mut().find(|a| a.answer_id == answer.id)
            {
                Some(present) => present.quantity += quantity,
                None => existing.answers.push(selected),
            },
            None => self.selections.push(SelectedQuestion {
                question_id: question.id.clone(),
                name: question.name.clone(),
                answers: vec![selected],
            }),
        }
    }

    fn range_reprompt(&self, question: &Question) -> StepOutcome {
        StepOutcome::Reprompt {
            question: question.clone(),
            reason: format!(
                "Escolha entre {} e {} opções de \"{}\".",
                question.min_required, question.max_allowed, question.name
            ),
        }
    }

    fn build_cart_item(&self) -> CartItem {
        let mut item = CartItem::from_menu_item(&self.item, self.quantity);
        item.selections = self.selections.clone();
        item
    }
}

/// Single-match keyword shortcut: the customer's phrase auto-selects an
/// answer when it matches exactly one offered answer name. This is the
/// fallback path when the AI-assisted extraction returns nothing
/// confident.
pub fn keyword_shortcut(question: &Question, text: &str) -> Option<crate::catalog::Answer> {
    let needle = normalize(text);
    if needle.is_empty() {
        return None;
    }
    let mut hits = question.answers.iter().filter(|answer| {
        let name = normalize(&answer.name);
        name.contains(&needle) || needle.contains(&name)
    });
    let first = hits.next()?;
    if hits.next().is_some() {
        return None;
    }
    Some(first.clone())
}
