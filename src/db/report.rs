//! Report queries over the `purchases` table.
//!
//! Only column names chosen from [`Dimension`] are interpolated into SQL text;
//! every value is a bound parameter.

use crate::db::models::Purchase;
use crate::db::sqlite::{ExpenseStorage, PURCHASE_COLUMNS};
use crate::error::TrackerError;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt::Write;

/// A purchase column that reports can filter or group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    Vendor,
    Stage,
    ModeOfPayment,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Category,
        Dimension::Vendor,
        Dimension::Stage,
        Dimension::ModeOfPayment,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::Vendor => "vendor",
            Dimension::Stage => "stage",
            Dimension::ModeOfPayment => "mode_of_payment",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Dimension::Category => "Category",
            Dimension::Vendor => "Vendor",
            Dimension::Stage => "Stage",
            Dimension::ModeOfPayment => "Mode Of Payment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Group,
    Total,
    Percentage,
}

impl RowKind {
    fn from_ord(ord: i64) -> Self {
        match ord {
            0 => RowKind::Group,
            1 => RowKind::Total,
            _ => RowKind::Percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub kind: RowKind,
    pub label: String,
    pub purchase_total: f64,
    pub paid_total: f64,
    pub balance: f64,
    /// Share of the purchase grand total, 0..=100.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub kind: RowKind,
    pub label: String,
    pub cells: Vec<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotReport {
    pub rows_by: Dimension,
    pub columns_by: Dimension,
    pub column_labels: Vec<String>,
    pub rows: Vec<PivotRow>,
}

impl ExpenseStorage {
    /// Distinct trimmed, upper-cased values of `dimension` within a project.
    pub async fn distinct_values(
        &self,
        project_id: i64,
        dimension: Dimension,
    ) -> Result<Vec<String>, TrackerError> {
        let col = dimension.column();
        let sql = format!(
            "SELECT DISTINCT TRIM(UPPER({col})) AS value FROM purchases \
             WHERE project_id = ? ORDER BY value"
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(project_id)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Purchases of a project whose `dimension` equals `value`, ignoring case
    /// and surrounding whitespace.
    pub async fn purchases_matching(
        &self,
        project_id: i64,
        dimension: Dimension,
        value: &str,
    ) -> Result<Vec<Purchase>, TrackerError> {
        let col = dimension.column();
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases \
             WHERE UPPER(TRIM({col})) = UPPER(TRIM(?)) AND project_id = ? \
             ORDER BY purchase_id"
        );
        let rows = sqlx::query_as::<_, Purchase>(&sql)
            .bind(value)
            .bind(project_id)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    /// Purchase/paid totals per group plus a synthesized `Total` row.
    pub async fn summary(
        &self,
        project_id: i64,
        group_by: Dimension,
    ) -> Result<Vec<SummaryRow>, TrackerError> {
        let sql = summary_sql(group_by);
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(self.pool())
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(SummaryRow {
                    kind: RowKind::from_ord(row.try_get("ord")?),
                    label: row.try_get("label")?,
                    purchase_total: row.try_get("purchase_total")?,
                    paid_total: row.try_get("paid_total")?,
                    balance: row.try_get("balance")?,
                    percentage: row.try_get("percentage")?,
                })
            })
            .collect()
    }

    /// Purchase amounts cross-tabulated by two dimensions, with a `Total`
    /// column, a `Total` row and a `Percentage` row.
    pub async fn pivot(
        &self,
        project_id: i64,
        rows_by: Dimension,
        columns_by: Dimension,
    ) -> Result<PivotReport, TrackerError> {
        let column_labels = self.distinct_values(project_id, columns_by).await?;
        let sql = pivot_sql(rows_by, columns_by, column_labels.len());

        let mut query = sqlx::query(&sql).bind(project_id);
        // group rows, Total row, Percentage row: each binds the labels once
        for _ in 0..3 {
            for label in &column_labels {
                query = query.bind(label);
            }
        }
        let rows = query.fetch_all(self.pool()).await?;

        let rows = rows
            .into_iter()
            .map(|row| {
                let cells = (0..column_labels.len())
                    .map(|i| row.try_get::<f64, _>(format!("c{i}").as_str()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PivotRow {
                    kind: RowKind::from_ord(row.try_get("ord")?),
                    label: row.try_get("row_label")?,
                    cells,
                    total: row.try_get("total")?,
                })
            })
            .collect::<Result<Vec<_>, TrackerError>>()?;

        Ok(PivotReport {
            rows_by,
            columns_by,
            column_labels,
            rows,
        })
    }
}

fn summary_sql(group_by: Dimension) -> String {
    let col = group_by.column();
    format!(
        r#"
        WITH scoped AS (
            SELECT UPPER(TRIM({col})) AS label,
                   CAST(purchase_amount AS REAL) AS purchase_amount,
                   CAST(paid_amount AS REAL) AS paid_amount
            FROM purchases WHERE project_id = ?
        ),
        grand AS (SELECT TOTAL(purchase_amount) AS total FROM scoped)
        SELECT ord, label, purchase_total, paid_total, balance, percentage FROM (
            SELECT 0 AS ord, label,
                   TOTAL(purchase_amount) AS purchase_total,
                   TOTAL(paid_amount) AS paid_total,
                   TOTAL(purchase_amount) - TOTAL(paid_amount) AS balance,
                   CASE WHEN (SELECT total FROM grand) = 0 THEN 0.0
                        ELSE 100.0 * TOTAL(purchase_amount) / (SELECT total FROM grand)
                   END AS percentage
            FROM scoped GROUP BY label
            UNION ALL
            SELECT 1, 'Total',
                   TOTAL(purchase_amount),
                   TOTAL(paid_amount),
                   TOTAL(purchase_amount) - TOTAL(paid_amount),
                   CASE WHEN TOTAL(purchase_amount) = 0 THEN 0.0 ELSE 100.0 END
            FROM scoped
        )
        ORDER BY ord, label
        "#
    )
}

fn pivot_sql(rows_by: Dimension, columns_by: Dimension, n_columns: usize) -> String {
    let row_col = rows_by.column();
    let col_col = columns_by.column();

    let mut sums = String::new();
    let mut shares = String::new();
    for i in 0..n_columns {
        let _ = write!(
            sums,
            "TOTAL(CASE WHEN col_label = ? THEN amount END) AS c{i}, "
        );
        let _ = write!(
            shares,
            "CASE WHEN (SELECT total FROM grand) = 0 THEN 0.0 \
             ELSE 100.0 * TOTAL(CASE WHEN col_label = ? THEN amount END) / (SELECT total FROM grand) \
             END AS c{i}, "
        );
    }
    let cell_names: String = (0..n_columns).map(|i| format!("c{i}, ")).collect();

    format!(
        r#"
        WITH scoped AS (
            SELECT UPPER(TRIM({row_col})) AS row_label,
                   UPPER(TRIM({col_col})) AS col_label,
                   CAST(purchase_amount AS REAL) AS amount
            FROM purchases WHERE project_id = ?
        ),
        grand AS (SELECT TOTAL(amount) AS total FROM scoped)
        SELECT ord, row_label, {cell_names}total FROM (
            SELECT 0 AS ord, row_label, {sums}TOTAL(amount) AS total
            FROM scoped GROUP BY row_label
            UNION ALL
            SELECT 1, 'Total', {sums}TOTAL(amount)
            FROM scoped
            UNION ALL
            SELECT 2, 'Percentage', {shares}
                   CASE WHEN (SELECT total FROM grand) = 0 THEN 0.0 ELSE 100.0 END
            FROM scoped
        )
        ORDER BY ord, row_label
        "#
    )
}
