//! Display shaping for report and listing pages.

use crate::db::Purchase;
use crate::db::report::{PivotReport, RowKind, SummaryRow};
use serde::Serialize;

/// A rendered table: every cell is already formatted text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<String>,
    /// Synthesized rows (totals, percentages) are highlighted.
    pub emphasis: bool,
}

pub const PURCHASE_HEADERS: [&str; 13] = [
    "Purchase ID",
    "Item Name",
    "Item Quantity",
    "Unit",
    "Vendor",
    "Stage",
    "Category",
    "Date",
    "Purchase Amount",
    "Mode of Payment",
    "Paid Amount",
    "Paid By",
    "Notes",
];

pub fn purchases_table(purchases: &[Purchase], currency: &str) -> ReportTable {
    let rows = purchases
        .iter()
        .map(|p| TableRow {
            cells: vec![
                p.purchase_id.to_string(),
                p.item_name.clone(),
                format_quantity(p.item_qty),
                p.unit.clone().unwrap_or_default(),
                p.vendor.clone(),
                p.stage.clone(),
                p.category.clone(),
                p.date.format("%Y-%m-%d").to_string(),
                format_currency(currency, p.purchase_amount),
                p.mode_of_payment.clone(),
                format_currency(currency, p.paid_amount),
                p.paid_by.clone().unwrap_or_default(),
                p.notes.clone().unwrap_or_default(),
            ],
            emphasis: false,
        })
        .collect();
    ReportTable {
        headers: PURCHASE_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows,
    }
}

pub fn summary_table(group_title: &str, rows: &[SummaryRow], currency: &str) -> ReportTable {
    ReportTable {
        headers: vec![
            group_title.to_string(),
            "Purchase Amount".to_string(),
            "Paid Amount".to_string(),
            "Balance".to_string(),
            "Percentage".to_string(),
        ],
        rows: rows
            .iter()
            .map(|r| TableRow {
                cells: vec![
                    display_label(r.kind, &r.label),
                    format_currency(currency, r.purchase_total),
                    format_currency(currency, r.paid_total),
                    format_currency(currency, r.balance),
                    format_percentage(r.percentage),
                ],
                emphasis: r.kind != RowKind::Group,
            })
            .collect(),
    }
}

pub fn pivot_table(report: &PivotReport, currency: &str) -> ReportTable {
    let mut headers = vec![report.rows_by.title().to_string()];
    headers.extend(report.column_labels.iter().map(|l| title_case(l)));
    headers.push("Total".to_string());

    let rows = report
        .rows
        .iter()
        .map(|r| {
            let fmt = |v: f64| match r.kind {
                RowKind::Percentage => format_percentage(v),
                _ => format_currency(currency, v),
            };
            let mut cells = vec![display_label(r.kind, &r.label)];
            cells.extend(r.cells.iter().map(|v| fmt(*v)));
            cells.push(fmt(r.total));
            TableRow {
                cells,
                emphasis: r.kind != RowKind::Group,
            }
        })
        .collect();

    ReportTable { headers, rows }
}

fn display_label(kind: RowKind, label: &str) -> String {
    match kind {
        RowKind::Group => title_case(label),
        _ => label.to_string(),
    }
}

/// Upper-case the first letter of each alphabetic run, lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// `-₹12,345.60` style: symbol, thousands separators, two decimals.
pub fn format_currency(symbol: &str, value: f64) -> String {
    let cents = (value * 100.0).round();
    let negative = cents < 0.0;
    let cents = cents.abs() as u64;
    let (whole, frac) = (cents / 100, cents % 100);
    let sign = if negative { "-" } else { "" };
    format!("{sign}{symbol}{}.{frac:02}", group_thousands(whole))
}

pub fn format_percentage(value: f64) -> String {
    let v = if value.abs() < 0.005 { 0.0 } else { value };
    format!("{v:.2}%")
}

fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
