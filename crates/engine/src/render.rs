//! Reply construction: keyboards, the customer card and the totals block.

use crate::callback::Callback;
use crate::layout::{Month, SheetLayout};
use crate::locator::Totals;
use crate::messages;
use crate::money::{amount_or_zero, format_money};
use crate::record::{
    Cell, Identity, Snapshot, COL_BERDI, COL_NAME, COL_NOMINAL, COL_PHONE, COL_QOLDIQ, COL_SUMMA,
};

/// How the transport should interpret the reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Plain,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self { label: label.into(), data: data.into() }
    }
}

pub type Keyboard = Vec<Vec<Button>>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub mode: ParseMode,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: None, mode: ParseMode::Html }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// One button per customer, one per row.
pub fn customer_keyboard(snapshot: &Snapshot, edit: bool) -> Keyboard {
    snapshot
        .identities()
        .map(|(index, id)| vec![Button::new(id.to_string(), Callback::customer(edit, &id, index))])
        .collect()
}

pub fn year_keyboard(layout: &SheetLayout) -> Keyboard {
    vec![layout
        .years()
        .map(|y| Button::new(y.to_string(), Callback::EditYear(y.to_string()).encode()))
        .collect()]
}

/// Months three to a row.
pub fn month_keyboard() -> Keyboard {
    Month::ALL
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .map(|m| Button::new(m.name(), Callback::EditMonth(m.name().to_string()).encode()))
                .collect()
        })
        .collect()
}

pub fn totals(t: &Totals) -> String {
    format!(
        "<pre> 📊 Umumiy natijalar:\n\n💰 Summa: {}\n✅ Berdi: {}\n💸 Qoldiq: {}\n📊 Nominal Sum: {} </pre>",
        format_money(t.summa),
        format_money(t.berdi),
        format_money(t.qoldiq),
        format_money(t.nominal),
    )
}

/// The detail card for one customer row.
pub fn detail(row: &[Cell], layout: &SheetLayout) -> String {
    let money = |col: usize| row.get(col).map(amount_or_zero).unwrap_or(0.0);
    let text = |col: usize| escape_html(&row.get(col).map(Cell::to_string).unwrap_or_default());

    let summa = money(COL_SUMMA);
    let nominal = money(COL_NOMINAL);
    let mut out = format!(
        "📌 Name: {}\n📱 Phone: {}\n💰 Summa: {}\n✅ Berdi: {}\n💸 Qoldiq: {}\n📊 Nominal Sum: {}\n🤑 Foyda: {}\n\n",
        text(COL_NAME),
        text(COL_PHONE),
        format_money(summa),
        format_money(money(COL_BERDI)),
        format_money(money(COL_QOLDIQ)),
        format_money(nominal),
        format_money(summa - nominal),
    );

    out.push_str("📅 Payments:\n<pre>");
    for year in layout.years() {
        out.push_str(&format!("--------------{year}--------------\n"));
        for month in Month::ALL {
            let value = layout
                .payment_column(year, month)
                .map(|c| money(c.offset()))
                .unwrap_or(0.0);
            let line = format!("📅 {:<9}: {:>9}\n", month.name(), format_money(value));
            out.push_str(&escape_html(&line));
        }
    }
    out.push_str("</pre>");
    out
}

/// Card for `identity`, or the not-found text.
pub fn detail_for(snapshot: &Snapshot, layout: &SheetLayout, identity: &Identity) -> String {
    snapshot
        .records()
        .find(|(_, row)| identity.matches(row))
        .map(|(_, row)| detail(row, layout))
        .unwrap_or_else(|| messages::NOT_FOUND.to_string())
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
