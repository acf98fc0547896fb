use chrono::Weekday;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuItemId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnswerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

/// One selectable option of a customization question. `surcharge` is added
/// to the item's unit price, multiplied by the quantity chosen for this
/// answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub name: String,
    #[serde(default)]
    pub surcharge: Option<Decimal>,
    #[serde(default)]
    pub max_quantity: Option<u32>,
}

impl Answer {
    pub fn surcharge_or_zero(&self) -> Decimal {
        self.surcharge.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleSelect,
    MultiSelect,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub name: String,
    pub kind: QuestionKind,
    /// Minimum number of accepted answers before the question may advance.
    /// Zero means the question is optional and a skip option is offered.
    pub min_required: u32,
    pub max_allowed: u32,
    pub answers: Vec<Answer>,
}

impl Question {
    pub fn answer(&self, id: &AnswerId) -> Option<&Answer> {
        self.answers.iter().find(|answer| &answer.id == id)
    }

    pub fn is_required(&self) -> bool {
        self.min_required > 0
    }
}

/// Weekday availability flags, indexed Monday..Sunday.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayAvailability(pub [bool; 7]);

impl Default for WeekdayAvailability {
    fn default() -> Self {
        Self([true; 7])
    }
}

impl WeekdayAvailability {
    pub fn all_days() -> Self {
        Self::default()
    }

    pub fn only(days: &[Weekday]) -> Self {
        let mut flags = [false; 7];
        for day in days {
            flags[day.num_days_from_monday() as usize] = true;
        }
        Self(flags)
    }

    pub fn allows(&self, day: Weekday) -> bool {
        self.0[day.num_days_from_monday() as usize]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_price: Decimal,
    #[serde(default)]
    pub available_on: WeekdayAvailability,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl MenuItem {
    pub fn has_questions(&self) -> bool {
        !self.questions.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub items: Vec<MenuItem>,
}

/// The store's menu as configured. Cart items snapshot the menu item at
/// match time, so later catalog edits never mutate an open cart.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

impl Catalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn items(&self) -> impl Iterator<Item = &MenuItem> {
        self.categories.iter().flat_map(|category| category.items.iter())
    }

    pub fn items_available_on(&self, day: Weekday) -> Vec<&MenuItem> {
        self.items().filter(|item| item.available_on.allows(day)).collect()
    }

    pub fn find_item(&self, id: &MenuItemId) -> Option<&MenuItem> {
        self.items().find(|item| &item.id == id)
    }

    pub fn find_category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| &category.id == id)
    }

    /// Serializes the menu for the classifier's user context: names,
    /// prices, and every question/answer with its surcharge, so the model
    /// can quote exact amounts back to the customer.
    pub fn serialize_for_prompt(&self, day: Weekday) -> String {
        let mut out = String::new();
        for category in &self.categories {
            let items = category
                .items
                .iter()
                .filter(|item| item.available_on.allows(day))
                .collect::<Vec<_>>();
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("## {}\n", category.name));
            for item in items {
                out.push_str(&format!("- {} — R$ {}\n", item.name, format_price(item.base_price)));
                if let Some(description) = &item.description {
                    out.push_str(&format!("  {description}\n"));
                }
                for question in &item.questions {
                    out.push_str(&format!(
                        "  * {} (escolha {}..{}):\n",
                        question.name, question.min_required, question.max_allowed
                    ));
                    for answer in &question.answers {
                        match answer.surcharge {
                            Some(price) if price > Decimal::ZERO => out.push_str(&format!(
                                "    - {} (+R$ {})\n",
                                answer.name,
                                format_price(price)
                            )),
                            _ => out.push_str(&format!("    - {}\n", answer.name)),
                        }
                    }
                }
            }
        }
        out
    }
}

/// Brazilian-style price rendering: decimal comma, two places.
pub fn format_price(value: Decimal) -> String {
    format!("{:.2}", value).replace('.', ",")
}
