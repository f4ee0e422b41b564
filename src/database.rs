use anyhow::Result;
use libsql::{Builder, Connection, Value};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::sync::RwLock;

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id             TEXT    PRIMARY KEY,
    email          TEXT    UNIQUE NOT NULL,
    name           TEXT,
    password_hash  TEXT    NOT NULL,
    created_at     INTEGER NOT NULL,
    updated_at     INTEGER
);
"#;

const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    token       TEXT    PRIMARY KEY,
    user_id     TEXT    NOT NULL,
    expires_at  INTEGER NOT NULL
);
"#;

const CREATE_CATEGORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id            TEXT    PRIMARY KEY,
    name          TEXT    NOT NULL,
    color         TEXT,
    icon          TEXT,
    budget_limit  REAL,
    created_at    INTEGER NOT NULL
);
"#;

const CREATE_PROJECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS projections (
    id           TEXT    PRIMARY KEY,
    name         TEXT    NOT NULL,
    description  TEXT,
    start_date   TEXT,
    end_date     TEXT,
    is_active    INTEGER NOT NULL DEFAULT 1,
    created_at   INTEGER NOT NULL,
    updated_at   INTEGER
);
"#;

const CREATE_BANK_STATEMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS bank_statements (
    id                  TEXT    PRIMARY KEY,
    filename            TEXT    NOT NULL,
    bank_name           TEXT,
    period_start        TEXT,
    period_end          TEXT,
    total_transactions  INTEGER NOT NULL DEFAULT 0,
    status              TEXT    NOT NULL,
    upload_date         INTEGER NOT NULL
);
"#;

const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id                 TEXT    PRIMARY KEY,
    date               TEXT    NOT NULL,
    description        TEXT    NOT NULL,
    amount             REAL    NOT NULL,
    category_id        TEXT,
    projection_id      TEXT,
    bank_statement_id  TEXT,
    is_manual          INTEGER NOT NULL DEFAULT 1,
    is_projection      INTEGER NOT NULL DEFAULT 0,
    created_at         INTEGER NOT NULL,
    updated_at         INTEGER
);
"#;

const CREATE_AI_CHAT_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ai_chat_history (
    id          TEXT    PRIMARY KEY,
    message     TEXT    NOT NULL,
    response    TEXT    NOT NULL,
    model       TEXT,
    created_at  INTEGER NOT NULL
);
"#;

const CREATE_CATEGORIES_NAME_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_name ON categories (name COLLATE NOCASE)";

// Concurrent requests open their own connections to the same file
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TRANSACTIONS_INDEXES: [&str; 2] = [
    "CREATE INDEX IF NOT EXISTS idx_transactions_ledger ON transactions (is_projection, date)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_projection ON transactions (projection_id)",
];

pub type Db = Arc<RwLock<Connection>>;

/// Main users registry DB (users.db)
pub async fn init_main_db(data_dir: &str) -> Result<Db> {
    tokio::fs::create_dir_all(data_dir).await?;
    let path = Path::new(data_dir).join("users.db");
    let db = Builder::new_local(path).build().await?;
    let conn = db.connect()?;

    conn.execute(CREATE_USERS_TABLE, ()).await?;
    conn.execute(CREATE_SESSIONS_TABLE, ()).await?;
    Ok(Arc::new(RwLock::new(conn)))
}

/// Per-user isolated DB (user_{id}.db)
pub async fn get_user_db(data_dir: &str, user_id: &str) -> Result<Db> {
    tokio::fs::create_dir_all(data_dir).await?;
    let path = Path::new(data_dir).join(format!("user_{}.db", user_id));
    let db = Builder::new_local(path).build().await?;
    let conn = db.connect()?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    conn.execute(CREATE_CATEGORIES_TABLE, ()).await?;
    conn.execute(CREATE_CATEGORIES_NAME_INDEX, ()).await?;
    conn.execute(CREATE_PROJECTIONS_TABLE, ()).await?;
    conn.execute(CREATE_BANK_STATEMENTS_TABLE, ()).await?;
    conn.execute(CREATE_TRANSACTIONS_TABLE, ()).await?;
    conn.execute(CREATE_AI_CHAT_HISTORY_TABLE, ()).await?;
    for index in CREATE_TRANSACTIONS_INDEXES {
        conn.execute(index, ()).await?;
    }
    Ok(Arc::new(RwLock::new(conn)))
}

pub fn is_unique_violation(err: &libsql::Error) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

pub fn text_or_null(value: Option<&str>) -> Value {
    match value {
        Some(v) => Value::Text(v.to_string()),
        None => Value::Null,
    }
}

pub fn real_or_null(value: Option<f64>) -> Value {
    match value {
        Some(v) => Value::Real(v),
        None => Value::Null,
    }
}

pub fn flag(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

pub fn optional_text(row: &libsql::Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(anyhow::anyhow!("expected text at column {}, got {:?}", idx, other)),
    }
}

pub fn optional_real(row: &libsql::Row, idx: i32) -> Result<Option<f64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Real(v) => Ok(Some(v)),
        Value::Integer(v) => Ok(Some(v as f64)),
        other => Err(anyhow::anyhow!("expected number at column {}, got {:?}", idx, other)),
    }
}

pub fn optional_integer(row: &libsql::Row, idx: i32) -> Result<Option<i64>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Integer(v) => Ok(Some(v)),
        other => Err(anyhow::anyhow!("expected integer at column {}, got {:?}", idx, other)),
    }
}

pub fn real(row: &libsql::Row, idx: i32) -> Result<f64> {
    optional_real(row, idx)?.ok_or_else(|| anyhow::anyhow!("unexpected NULL at column {}", idx))
}
