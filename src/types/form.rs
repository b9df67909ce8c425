use crate::db::NewPurchase;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const QTY_RANGE: (f64, f64) = (0.0, 1_000_000.0);
pub const AMOUNT_RANGE: (f64, f64) = (-10_000.0, 1_000_000.0);

pub const MANDATORY_MESSAGE: &str = "All fields are mandatory! Please fill in all fields.";

/// Raw purchase entry form as posted by the browser. Every field is text so
/// that blanks reach validation instead of failing extraction.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PurchaseForm {
    pub item_name: String,
    pub item_qty: String,
    pub unit: String,
    pub vendor: String,
    pub stage: String,
    pub category: String,
    pub date: String,
    pub purchase_amount: String,
    pub mode_of_payment: String,
    pub paid_amount: String,
    pub paid_by: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FormErrors {
    pub errors: Vec<FieldError>,
}

impl FormErrors {
    fn push(&mut self, field: &'static str, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.field).collect()
    }
}

impl PurchaseForm {
    /// Check required fields and numeric ranges, producing the row to insert.
    pub fn validate(&self, project_id: i64) -> Result<NewPurchase, FormErrors> {
        let mut errs = FormErrors::default();

        let item_name = required(&mut errs, "item_name", &self.item_name);
        let vendor = required(&mut errs, "vendor", &self.vendor);
        let stage = required(&mut errs, "stage", &self.stage);
        let category = required(&mut errs, "category", &self.category);
        let mode_of_payment = required(&mut errs, "mode_of_payment", &self.mode_of_payment);

        let date = match self.date.trim() {
            "" => {
                errs.push("date", "required");
                None
            }
            raw => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .inspect_err(|_| errs.push("date", "expected YYYY-MM-DD"))
                .ok(),
        };

        let item_qty = number(&mut errs, "item_qty", &self.item_qty, QTY_RANGE);
        let purchase_amount = number(
            &mut errs,
            "purchase_amount",
            &self.purchase_amount,
            AMOUNT_RANGE,
        );
        let paid_amount = number(&mut errs, "paid_amount", &self.paid_amount, AMOUNT_RANGE);

        if let (Some(purchase), Some(paid)) = (purchase_amount, paid_amount)
            && !(purchase > AMOUNT_RANGE.0 || paid > 0.0)
        {
            errs.push(
                "purchase_amount",
                "enter a purchase amount or a paid amount",
            );
        }

        if !errs.is_empty() {
            return Err(errs);
        }

        // every Option below is Some once no error was recorded
        match (
            item_name,
            vendor,
            stage,
            category,
            mode_of_payment,
            date,
            item_qty,
            purchase_amount,
            paid_amount,
        ) {
            (
                Some(item_name),
                Some(vendor),
                Some(stage),
                Some(category),
                Some(mode_of_payment),
                Some(date),
                Some(item_qty),
                Some(purchase_amount),
                Some(paid_amount),
            ) => Ok(NewPurchase {
                project_id,
                item_name,
                item_qty,
                unit: optional(&self.unit),
                vendor,
                stage,
                category,
                date,
                purchase_amount,
                mode_of_payment,
                paid_amount,
                paid_by: optional(&self.paid_by),
                notes: optional(&self.notes),
            }),
            _ => Err(errs),
        }
    }
}

fn required(errs: &mut FormErrors, field: &'static str, raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.is_empty() {
        errs.push(field, "required");
        None
    } else {
        Some(v.to_string())
    }
}

fn optional(raw: &str) -> Option<String> {
    let v = raw.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Blank numeric inputs count as zero, like an untouched number widget.
fn number(
    errs: &mut FormErrors,
    field: &'static str,
    raw: &str,
    (min, max): (f64, f64),
) -> Option<f64> {
    let v = raw.trim();
    if v.is_empty() {
        return Some(0.0);
    }
    match v.parse::<f64>() {
        Ok(n) if n.is_finite() && (min..=max).contains(&n) => Some(n),
        Ok(_) => {
            errs.push(field, format!("must be between {min} and {max}"));
            None
        }
        Err(_) => {
            errs.push(field, "must be a number");
            None
        }
    }
}
