use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{AnswerId, MenuItem, MenuItemId, QuestionId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedAnswer {
    pub answer_id: AnswerId,
    pub name: String,
    pub surcharge: Decimal,
    pub quantity: u32,
}

impl SelectedAnswer {
    pub fn surcharge_total(&self) -> Decimal {
        self.surcharge * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectedQuestion {
    pub question_id: QuestionId,
    pub name: String,
    pub answers: Vec<SelectedAnswer>,
}

/// A cart line. Snapshots the menu item's identity and base price at match
/// time; catalog edits after that never reach an open cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub base_price: Decimal,
    pub quantity: u32,
    pub selections: Vec<SelectedQuestion>,
}

impl CartItem {
    /// A quantity of zero is allowed here: it marks a line still waiting
    /// on the quantity question and never reaches an order draft.
    pub fn from_menu_item(item: &MenuItem, quantity: u32) -> Self {
        Self {
            menu_item_id: item.id.clone(),
            name: item.name.clone(),
            base_price: item.base_price,
            quantity,
            selections: Vec::new(),
        }
    }

    /// Effective unit price. Always recomputed from the current selection
    /// set; never cached.
    pub fn unit_price(&self) -> Decimal {
        let surcharges: Decimal = self
            .selections
            .iter()
            .flat_map(|question| question.answers.iter())
            .map(SelectedAnswer::surcharge_total)
            .sum();
        self.base_price + surcharges
    }

    pub fn total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity)
    }
}
