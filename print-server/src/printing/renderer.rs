//! Receipt renderer
//!
//! Renders a [`ReceiptRequest`] into ESC/POS bytes for thermal printers.
//! Items are grouped by category and the groups ordered through the
//! [`CategoryOrderingTable`]; item order inside a group is kept as given.

use std::collections::HashMap;
use std::sync::Arc;

use crab_printer::{CodePage, CutMode, EscPosBuilder};
use rust_decimal::Decimal;

use super::ordering::CategoryOrderingTable;
use super::types::{Audience, PaymentSummary, ReceiptLine, ReceiptRequest};

/// Receipt renderer
///
/// Pure and total: every request, including one without lines, renders to a
/// valid command stream.
#[derive(Debug, Clone)]
pub struct ReceiptRenderer {
    width: usize,
    code_page: CodePage,
    feed_lines: u8,
    ordering: Arc<CategoryOrderingTable>,
}

impl ReceiptRenderer {
    /// Create a new renderer
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(
        width: usize,
        code_page: CodePage,
        feed_lines: u8,
        ordering: Arc<CategoryOrderingTable>,
    ) -> Self {
        Self {
            width,
            code_page,
            feed_lines,
            ordering,
        }
    }

    pub fn ordering(&self) -> &CategoryOrderingTable {
        &self.ordering
    }

    /// Render a receipt to ESC/POS bytes in the configured code page
    pub fn render(&self, receipt: &ReceiptRequest) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.width, self.code_page);

        self.render_header(&mut b, receipt);

        let cut = receipt.cut.unwrap_or_default();
        if receipt.lines.is_empty() {
            b.cut(cut);
            return b.build();
        }

        for (heading, items) in self.group_by_category(&receipt.lines) {
            self.render_category(&mut b, receipt, &heading, &items);
        }

        if receipt.audience == Audience::Customer {
            self.render_totals(&mut b, receipt);
        }

        self.render_footer(&mut b, receipt, cut);

        b.build()
    }

    fn render_header(&self, b: &mut EscPosBuilder, receipt: &ReceiptRequest) {
        let title = receipt
            .header
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(receipt.audience.default_header());

        b.center();
        b.double_size();
        b.bold();
        b.line(&printable(title));
        b.bold_off();
        b.reset_size();

        if let Some(sub) = receipt.subheader.as_deref()
            && !sub.is_empty()
        {
            b.line(&printable(sub));
        }

        b.left();
        b.sep_double();
    }

    /// Group lines by category and order the groups by sort key
    ///
    /// Groups keep their first-appearance order among equal keys.
    fn group_by_category<'a>(&self, lines: &'a [ReceiptLine]) -> Vec<(String, Vec<&'a ReceiptLine>)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(u32, String, Vec<&ReceiptLine>)> = Vec::new();

        for line in lines {
            let slot = *index.entry(line.category_id.as_str()).or_insert_with(|| {
                let name = line.category_name.as_deref();
                groups.push((
                    self.ordering.sort_key(&line.category_id, name),
                    self.ordering.heading(&line.category_id, name),
                    Vec::new(),
                ));
                groups.len() - 1
            });
            groups[slot].2.push(line);
        }

        // Stable: equal keys stay in first-appearance order
        groups.sort_by_key(|(key, _, _)| *key);

        groups
            .into_iter()
            .map(|(_, heading, items)| (heading, items))
            .collect()
    }

    fn render_category(
        &self,
        b: &mut EscPosBuilder,
        receipt: &ReceiptRequest,
        heading: &str,
        items: &[&ReceiptLine],
    ) {
        b.bold();
        b.underline();
        b.line(&printable(&heading.to_uppercase()));
        b.underline_off();
        b.bold_off();

        for item in items {
            match receipt.audience {
                Audience::Kitchen => self.render_kitchen_item(b, item, receipt.show_prices),
                Audience::Customer => self.render_customer_item(b, item),
            }
        }

        b.newline();
    }

    fn render_kitchen_item(&self, b: &mut EscPosBuilder, item: &ReceiptLine, show_prices: bool) {
        let label = format!("{}x {}", item.quantity, printable(&item.name.to_uppercase()));

        b.double_height();
        if show_prices {
            b.line_lr(&label, &format_money(item.line_total()));
        } else {
            b.line(&label);
        }
        b.reset_size();

        for m in &item.modifiers {
            let text = format!("   - {}", printable(m.name()));
            if show_prices && m.price_delta() != 0 {
                b.line_lr(&text, &format_delta(m.price_delta()));
            } else {
                b.line(&text);
            }
        }
    }

    fn render_customer_item(&self, b: &mut EscPosBuilder, item: &ReceiptLine) {
        b.line_lr(
            &format!("{}x {}", item.quantity, printable(&item.name)),
            &format_money(item.line_total()),
        );

        if item.quantity > 1 {
            b.line(&format!("   @ {}", format_money(item.unit_price)));
        }

        for m in &item.modifiers {
            let text = format!("   + {}", printable(m.name()));
            if m.price_delta() != 0 {
                b.line_lr(&text, &format_delta(m.price_delta()));
            } else {
                b.line(&text);
            }
        }
    }

    fn render_totals(&self, b: &mut EscPosBuilder, receipt: &ReceiptRequest) {
        let subtotal = subtotal(&receipt.lines);

        b.sep_single();
        b.line_lr("Subtotal", &format_money(subtotal));

        if let Some(payment) = &receipt.payment {
            self.render_payment(b, subtotal, payment);
        }
    }

    fn render_payment(&self, b: &mut EscPosBuilder, subtotal: i64, payment: &PaymentSummary) {
        if payment.tip != 0 {
            b.line_lr("Tip", &format_money(payment.tip));
        }

        b.bold();
        b.line_lr("Total", &format_money(subtotal.saturating_add(payment.tip)));
        b.bold_off();

        b.sep_single();
        b.line_lr("Payment", &printable(&payment.method));
        b.line_lr("Tendered", &format_money(payment.amount_tendered));

        if payment.change_given > 0 {
            b.line_lr("Change:", &format_money(payment.change_given));
        }
    }

    fn render_footer(&self, b: &mut EscPosBuilder, receipt: &ReceiptRequest, cut: CutMode) {
        if let Some(footer) = receipt.footer.as_deref()
            && !footer.is_empty()
        {
            b.newline();
            b.center();
            b.line(&printable(footer));
            b.left();
        }

        b.feed(receipt.feed_lines.unwrap_or(self.feed_lines));
        b.cut(cut);
    }
}

impl Default for ReceiptRenderer {
    fn default() -> Self {
        Self::new(48, CodePage::default(), 3, Arc::default())
    }
}

/// Sum of line totals in minor units
pub fn subtotal(lines: &[ReceiptLine]) -> i64 {
    lines
        .iter()
        .fold(0i64, |acc, line| acc.saturating_add(line.line_total()))
}

/// Caller text without control characters, so it cannot inject printer commands
fn printable(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// Minor units to a two-decimal string (`1250` → `12.50`)
fn format_money(minor: i64) -> String {
    Decimal::new(minor, 2).to_string()
}

fn format_delta(minor: i64) -> String {
    if minor > 0 {
        format!("+{}", format_money(minor))
    } else {
        format_money(minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printing::types::Modifier;

    const PARTIAL_CUT: [u8; 3] = [0x1D, 0x56, 0x01];
    const FULL_CUT: [u8; 3] = [0x1D, 0x56, 0x00];

    fn line(name: &str, quantity: u32, unit_price: i64, category: &str) -> ReceiptLine {
        ReceiptLine {
            name: name.to_string(),
            quantity,
            unit_price,
            modifiers: vec![],
            category_id: category.to_string(),
            category_name: None,
        }
    }

    fn renderer(pairs: &[(&str, u32)]) -> ReceiptRenderer {
        ReceiptRenderer::new(
            48,
            CodePage::Wpc1252,
            3,
            Arc::new(CategoryOrderingTable::from_pairs(pairs.iter().copied())),
        )
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    fn pos(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("{needle:?} missing from receipt:\n{haystack}"))
    }

    #[test]
    fn test_kitchen_ticket_orders_categories_and_hides_prices() {
        let r = renderer(&[("Starter", 1), ("Beverage", 4)]);
        let receipt = ReceiptRequest::new(
            Audience::Kitchen,
            vec![
                line("Coffee", 2, 250, "Beverage"),
                line("Salad", 1, 800, "Starter"),
            ],
        );

        let data = r.render(&receipt);
        let s = text(&data);

        assert!(data.starts_with(&[0x1B, 0x40]));
        assert!(data.ends_with(&PARTIAL_CUT));
        assert!(s.contains("KITCHEN ORDER"));
        assert!(pos(&s, "1x SALAD") < pos(&s, "2x COFFEE"));
        assert!(pos(&s, "STARTER") < pos(&s, "BEVERAGE"));
        assert!(!s.contains("2.50"));
        assert!(!s.contains("Subtotal"));
    }

    #[test]
    fn test_categories_follow_sort_key_not_input_order() {
        let r = renderer(&[("Dessert", 3), ("Main", 2), ("Starter", 1)]);
        let receipt = ReceiptRequest::new(
            Audience::Kitchen,
            vec![
                line("Cake", 1, 0, "Dessert"),
                line("Steak", 1, 0, "Main"),
                line("Soup", 1, 0, "Starter"),
            ],
        );

        let s = text(&r.render(&receipt));
        assert!(pos(&s, "SOUP") < pos(&s, "STEAK"));
        assert!(pos(&s, "STEAK") < pos(&s, "CAKE"));
    }

    #[test]
    fn test_unknown_categories_last_in_first_appearance_order() {
        let r = renderer(&[("Main", 2)]);
        let grouped: Vec<(String, Vec<String>)> = r
            .group_by_category(&[
                line("Tea", 1, 0, "Drinks"),
                line("Fries", 1, 0, "Sides"),
                line("Burger", 1, 0, "Main"),
                line("Cola", 1, 0, "Drinks"),
            ])
            .into_iter()
            .map(|(h, items)| (h, items.iter().map(|i| i.name.clone()).collect()))
            .collect();

        assert_eq!(
            grouped,
            vec![
                ("Main".to_string(), vec!["Burger".to_string()]),
                ("Drinks".to_string(), vec!["Tea".to_string(), "Cola".to_string()]),
                ("Sides".to_string(), vec!["Fries".to_string()]),
            ]
        );
    }

    #[test]
    fn test_kitchen_prices_on_request_and_modifiers() {
        let r = renderer(&[]);
        let mut item = line("Burger", 1, 1200, "main");
        item.modifiers = vec![
            Modifier::Plain("no onion".into()),
            Modifier::Priced {
                name: "bacon".into(),
                price_delta: 150,
            },
        ];
        let mut receipt = ReceiptRequest::new(Audience::Kitchen, vec![item]);

        let hidden = text(&r.render(&receipt));
        assert!(hidden.contains("   - no onion"));
        assert!(hidden.contains("   - bacon"));
        assert!(!hidden.contains("13.50"));

        receipt.show_prices = true;
        let shown = text(&r.render(&receipt));
        assert!(shown.contains("13.50"));
        assert!(shown.contains("+1.50"));
        assert!(!shown.contains("Subtotal"));
    }

    #[test]
    fn test_control_bytes_in_caller_text_are_dropped() {
        let r = renderer(&[]);
        let mut item = line("Burger\x1D\x56\x00", 1, 1200, "main");
        item.modifiers = vec![Modifier::Plain("\x1B@extra\r\ncheese".into())];
        let mut receipt = ReceiptRequest::new(Audience::Kitchen, vec![item]);
        receipt.footer = Some("thanks\x07".into());

        let data = r.render(&receipt);
        let s = text(&data);

        assert!(!data.windows(3).any(|w| w == FULL_CUT));
        assert_eq!(data.windows(2).filter(|w| *w == [0x1B, 0x40]).count(), 1);
        assert!(!data.contains(&0x07));
        assert!(s.contains("1x BURGERV"));
        assert!(s.contains("   - @extracheese"));
        assert!(s.contains("thanks"));
    }

    #[test]
    fn test_customer_receipt_with_payment() {
        let r = renderer(&[("Starter", 1), ("Beverage", 4)]);
        let mut receipt = ReceiptRequest::new(
            Audience::Customer,
            vec![
                line("Coffee", 2, 250, "Beverage"),
                line("Salad", 1, 800, "Starter"),
            ],
        );
        receipt.payment = Some(PaymentSummary {
            method: "Cash".into(),
            tip: 0,
            amount_tendered: 2000,
            change_given: 700,
        });

        let s = text(&r.render(&receipt));

        assert!(s.contains("RECEIPT"));
        assert_eq!(subtotal(&receipt.lines), 1300);
        assert!(s.contains(&format!("Subtotal{}13.00", " ".repeat(48 - 8 - 5))));
        assert!(s.contains("Cash"));
        assert!(s.contains("20.00"));
        assert!(pos(&s, "Subtotal") < pos(&s, "Change:"));
        assert!(s.contains("7.00"));
        assert!(pos(&s, "Salad") < pos(&s, "Coffee"));
    }

    #[test]
    fn test_customer_receipt_without_change() {
        let r = renderer(&[]);
        let mut receipt = ReceiptRequest::new(Audience::Customer, vec![line("Tea", 1, 300, "d")]);
        receipt.payment = Some(PaymentSummary {
            method: "Card".into(),
            tip: 50,
            amount_tendered: 350,
            change_given: 0,
        });

        let s = text(&r.render(&receipt));
        assert!(s.contains("Tip"));
        assert!(s.contains("3.50"));
        assert!(!s.contains("Change:"));
    }

    #[test]
    fn test_empty_receipt_is_header_then_cut() {
        let r = renderer(&[]);
        let mut receipt = ReceiptRequest::new(Audience::Kitchen, vec![]);
        receipt.header = Some("TABLE 12".into());
        receipt.cut = Some(CutMode::Full);

        let data = r.render(&receipt);
        let s = text(&data);

        assert!(s.contains("TABLE 12"));
        assert!(!s.contains("KITCHEN ORDER"));
        assert!(data.ends_with(&[b'\n', FULL_CUT[0], FULL_CUT[1], FULL_CUT[2]]));
    }

    #[test]
    fn test_no_cut_and_feed_override() {
        let r = renderer(&[]);
        let mut receipt = ReceiptRequest::new(Audience::Kitchen, vec![line("Soup", 1, 0, "s")]);
        receipt.cut = Some(CutMode::None);
        receipt.feed_lines = Some(5);

        let data = r.render(&receipt);
        assert!(data.ends_with(&[0x1B, 0x64, 5]));
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(format_money(1250), "12.50");
        assert_eq!(format_money(5), "0.05");
        assert_eq!(format_money(-300), "-3.00");
        assert_eq!(format_delta(150), "+1.50");
        assert_eq!(format_delta(-150), "-1.50");
    }
}
