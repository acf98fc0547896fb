use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::format_price;
use crate::domain::cart::CartItem;
use crate::domain::conversation::DeliveryKind;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

/// Order totals derived from the current cart. Recomputed on every
/// mutation; a stale total is a correctness bug, not a cosmetic one.
pub fn order_totals(items: &[CartItem], delivery: DeliveryKind, delivery_fee: Decimal) -> OrderTotals {
    let subtotal: Decimal = items.iter().map(CartItem::total).sum();
    let delivery_fee = match delivery {
        DeliveryKind::Delivery => delivery_fee,
        DeliveryKind::Pickup => Decimal::ZERO,
    };
    OrderTotals { subtotal, delivery_fee, total: subtotal + delivery_fee }
}

/// Human-readable cart summary, regenerated in full after every cart
/// mutation.
pub fn render_summary(items: &[CartItem], totals: &OrderTotals) -> String {
    let mut out = String::from("*Resumo do pedido*\n");
    for item in items {
        out.push_str(&format!(
            "{}x {} — R$ {}\n",
            item.quantity,
            item.name,
            format_price(item.total())
        ));
        for question in &item.selections {
            for answer in &question.answers {
                if answer.surcharge > Decimal::ZERO {
                    out.push_str(&format!(
                        "   • {}x {} (+R$ {})\n",
                        answer.quantity,
                        answer.name,
                        format_price(answer.surcharge_total())
                    ));
                } else {
                    out.push_str(&format!("   • {}x {}\n", answer.quantity, answer.name));
                }
            }
        }
    }
    out.push_str(&format!("\nSubtotal: R$ {}\n", format_price(totals.subtotal)));
    if totals.delivery_fee > Decimal::ZERO {
        out.push_str(&format!("Entrega: R$ {}\n", format_price(totals.delivery_fee)));
    } else {
        out.push_str("Entrega: grátis\n");
    }
    out.push_str(&format!("*Total: R$ {}*", format_price(totals.total)));
    out
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::catalog::{AnswerId, MenuItemId, QuestionId};
    use crate::domain::cart::{CartItem, SelectedAnswer, SelectedQuestion};
    use crate::domain::conversation::DeliveryKind;

    use super::{order_totals, render_summary};

    fn cart() -> Vec<CartItem> {
        vec![
            CartItem {
                menu_item_id: MenuItemId("marmitex-medio".to_owned()),
                name: "Marmitex Médio".to_owned(),
                base_price: Decimal::new(2200, 2),
                quantity: 1,
                selections: vec![SelectedQuestion {
                    question_id: QuestionId("adicionais".to_owned()),
                    name: "Adicionais".to_owned(),
                    answers: vec![SelectedAnswer {
                        answer_id: AnswerId("parmesao".to_owned()),
                        name: "Parmesão".to_owned(),
                        surcharge: Decimal::new(400, 2),
                        quantity: 1,
                    }],
                }],
            },
            CartItem {
                menu_item_id: MenuItemId("guarana-lata".to_owned()),
                name: "Guaraná Lata".to_owned(),
                base_price: Decimal::new(600, 2),
                quantity: 2,
                selections: Vec::new(),
            },
        ]
    }

    #[test]
    fn totals_add_delivery_fee_for_delivery() {
        let totals = order_totals(&cart(), DeliveryKind::Delivery, Decimal::new(800, 2));
        // (22 + 4)*1 + 6*2 = 38.00, + 8.00 delivery
        assert_eq!(totals.subtotal, Decimal::new(3800, 2));
        assert_eq!(totals.total, Decimal::new(4600, 2));
    }

    #[test]
    fn pickup_zeroes_the_delivery_fee() {
        let totals = order_totals(&cart(), DeliveryKind::Pickup, Decimal::new(800, 2));
        assert_eq!(totals.delivery_fee, Decimal::ZERO);
        assert_eq!(totals.total, totals.subtotal);
    }

    #[test]
    fn totals_recompute_after_cart_mutation() {
        let mut items = cart();
        let before = order_totals(&items, DeliveryKind::Pickup, Decimal::ZERO);
        items[1].quantity = 3;
        let after = order_totals(&items, DeliveryKind::Pickup, Decimal::ZERO);
        assert_eq!(after.subtotal - before.subtotal, Decimal::new(600, 2));
    }

    #[test]
    fn summary_lists_items_fees_and_total() {
        let items = cart();
        let totals = order_totals(&items, DeliveryKind::Delivery, Decimal::new(800, 2));
        let summary = render_summary(&items, &totals);
        assert!(summary.contains("1x Marmitex Médio — R$ 26,00"));
        assert!(summary.contains("2x Guaraná Lata — R$ 12,00"));
        assert!(summary.contains("1x Parmesão (+R$ 4,00)"));
        assert!(summary.contains("Entrega: R$ 8,00"));
        assert!(summary.contains("*Total: R$ 46,00*"));
    }
}
