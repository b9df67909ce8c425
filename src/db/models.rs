use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Project {
    pub project_id: i64,
    pub project_name: String,
}

impl Project {
    /// Picker label, e.g. `7 - Riverside Villa`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.project_id, self.project_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Purchase {
    pub purchase_id: i64,
    pub project_id: i64,
    pub item_name: String,
    pub item_qty: f64,
    pub unit: Option<String>,
    pub vendor: String,
    pub stage: String,
    pub category: String,
    pub date: NaiveDate,
    pub purchase_amount: f64,
    pub mode_of_payment: String,
    pub paid_amount: f64,
    pub paid_by: Option<String>,
    pub notes: Option<String>,
}

/// A validated purchase ready to be inserted; see `types::form::PurchaseForm`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchase {
    pub project_id: i64,
    pub item_name: String,
    pub item_qty: f64,
    pub unit: Option<String>,
    pub vendor: String,
    pub stage: String,
    pub category: String,
    pub date: NaiveDate,
    pub purchase_amount: f64,
    pub mode_of_payment: String,
    pub paid_amount: f64,
    pub paid_by: Option<String>,
    pub notes: Option<String>,
}
