use crate::db::models::{NewPurchase, Project, Purchase};
use crate::db::schema::SQLITE_INIT;
use crate::error::TrackerError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

/// Column list shared by every purchase listing. Numeric columns are cast so
/// files written by older clients (integer amounts) decode the same way.
pub(crate) const PURCHASE_COLUMNS: &str = r#"
    purchase_id, project_id, item_name,
    CAST(item_qty AS REAL) AS item_qty, unit, vendor, stage, category, date,
    CAST(purchase_amount AS REAL) AS purchase_amount, mode_of_payment,
    CAST(paid_amount AS REAL) AS paid_amount, paid_by, notes
"#;

/// Static reference tables that feed the form's select widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Category,
    Stage,
    PaymentMode,
}

impl Lookup {
    fn table_and_column(self) -> (&'static str, &'static str) {
        match self {
            Lookup::Category => ("category", "category"),
            Lookup::Stage => ("stages", "stage"),
            Lookup::PaymentMode => ("mode_of_payment", "mode_of_payment"),
        }
    }
}

/// Storage handle opened for the duration of one request.
#[derive(Clone)]
pub struct ExpenseStorage {
    pool: SqlitePool,
}

impl ExpenseStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database file with a single connection.
    ///
    /// The journal stays in `DELETE` mode: the file on disk must be the whole
    /// database when it is uploaded.
    pub async fn open(path: &Path) -> Result<Self, TrackerError> {
        let connect_opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_opts)
            .await?;
        debug!(path = %path.display(), "database opened");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), TrackerError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, TrackerError> {
        let rows = sqlx::query_as::<_, Project>(
            "SELECT project_id, project_name FROM projects ORDER BY project_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_project(&self, project_id: i64) -> Result<Option<Project>, TrackerError> {
        let row = sqlx::query_as::<_, Project>(
            "SELECT project_id, project_name FROM projects WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// True when neither projects nor purchases hold any row.
    pub async fn is_blank(&self) -> Result<bool, TrackerError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM projects) + (SELECT COUNT(*) FROM purchases)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count == 0)
    }

    /// Values of a lookup table in insertion order.
    pub async fn lookup(&self, lookup: Lookup) -> Result<Vec<String>, TrackerError> {
        let (table, column) = lookup.table_and_column();
        let sql = format!("SELECT {column} FROM {table} ORDER BY rowid");
        let rows: Vec<(String,)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Insert one purchase. Returns the new `purchase_id`.
    pub async fn insert_purchase(&self, p: &NewPurchase) -> Result<i64, TrackerError> {
        let result = sqlx::query(
            r#"
            INSERT INTO purchases (
                project_id, item_name, item_qty, unit, vendor, stage, category,
                date, purchase_amount, mode_of_payment, paid_amount, paid_by, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(p.project_id)
        .bind(&p.item_name)
        .bind(p.item_qty)
        .bind(&p.unit)
        .bind(&p.vendor)
        .bind(&p.stage)
        .bind(&p.category)
        .bind(p.date)
        .bind(p.purchase_amount)
        .bind(&p.mode_of_payment)
        .bind(p.paid_amount)
        .bind(&p.paid_by)
        .bind(&p.notes)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn list_purchases(&self, project_id: i64) -> Result<Vec<Purchase>, TrackerError> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE project_id = ? ORDER BY purchase_id"
        );
        let rows = sqlx::query_as::<_, Purchase>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_purchase(
        &self,
        project_id: i64,
        purchase_id: i64,
    ) -> Result<Option<Purchase>, TrackerError> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE project_id = ? AND purchase_id = ?"
        );
        let row = sqlx::query_as::<_, Purchase>(&sql)
            .bind(project_id)
            .bind(purchase_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Delete exactly one purchase of the given project.
    pub async fn delete_purchase(
        &self,
        project_id: i64,
        purchase_id: i64,
    ) -> Result<(), TrackerError> {
        let result = sqlx::query("DELETE FROM purchases WHERE purchase_id = ? AND project_id = ?")
            .bind(purchase_id)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TrackerError::PurchaseNotFound(purchase_id));
        }
        Ok(())
    }
}
