//! SQL DDL for the expense database.
//! Every statement is idempotent so a freshly downloaded file can be opened as-is.

/// SQLite schema includes:
/// - `projects` (one construction job per row)
/// - lookup tables `category`, `stages`, `mode_of_payment` (read-only from the UI)
/// - `purchases`, the only table the UI writes to
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    project_id INTEGER PRIMARY KEY NOT NULL,
    project_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS category (
    category TEXT PRIMARY KEY NOT NULL
);

CREATE TABLE IF NOT EXISTS stages (
    stage TEXT PRIMARY KEY NOT NULL
);

CREATE TABLE IF NOT EXISTS mode_of_payment (
    mode_of_payment TEXT PRIMARY KEY NOT NULL
);

CREATE TABLE IF NOT EXISTS purchases (
    purchase_id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(project_id),
    item_name TEXT NOT NULL,
    item_qty REAL NOT NULL DEFAULT 0,
    unit TEXT NULL,
    vendor TEXT NOT NULL,
    stage TEXT NOT NULL,
    category TEXT NOT NULL,
    date TEXT NOT NULL, -- YYYY-MM-DD
    purchase_amount REAL NOT NULL DEFAULT 0,
    mode_of_payment TEXT NOT NULL,
    paid_amount REAL NOT NULL DEFAULT 0,
    paid_by TEXT NULL,
    notes TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_purchases_project_id ON purchases(project_id);
"#;
