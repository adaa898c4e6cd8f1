use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const DB_FILE: &str = "lunchsync.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    reference_number TEXT NOT NULL DEFAULT '',
    amount_value TEXT NOT NULL,
    amount_currency TEXT NOT NULL,
    merchant_name TEXT NOT NULL DEFAULT '',
    merchant_category_code TEXT,
    merchant_city TEXT,
    merchant_state_province TEXT,
    transaction_date TEXT NOT NULL,
    posted_date TEXT NOT NULL DEFAULT '',
    source_account_name TEXT NOT NULL DEFAULT '',
    lunchmoney_id INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_reference
    ON transactions(reference_number) WHERE reference_number <> '';

CREATE TABLE IF NOT EXISTS account_mappings (
    external_name TEXT PRIMARY KEY,
    lunchmoney_account_id INTEGER NOT NULL,
    is_plaid INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS ignored_external_accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS account_info (
    lunchmoney_account_id INTEGER PRIMARY KEY,
    balance_value TEXT NOT NULL DEFAULT '',
    balance_currency TEXT NOT NULL DEFAULT '',
    balance_updated_at TEXT,
    is_plaid INTEGER NOT NULL DEFAULT 0,
    sync_strategy INTEGER NOT NULL DEFAULT 3
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    if let Some(dir) = db_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["transactions", "account_mappings", "ignored_external_accounts", "account_info"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_get_connection_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("test.db");
        get_connection(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_reference_unique_but_empty_allowed_twice() {
        let (_dir, conn) = test_db();
        let insert = "INSERT INTO transactions (reference_number, amount_value, amount_currency, transaction_date) \
                      VALUES (?1, '1.00', 'USD', '2025-01-01')";
        conn.execute(insert, [""]).unwrap();
        conn.execute(insert, [""]).unwrap();
        conn.execute(insert, ["REF1"]).unwrap();
        assert!(conn.execute(insert, ["REF1"]).is_err());
    }

    #[test]
    fn test_account_info_defaults_to_all_options() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO account_info (lunchmoney_account_id) VALUES (7)", []).unwrap();
        let strategy: i64 = conn
            .query_row("SELECT sync_strategy FROM account_info WHERE lunchmoney_account_id = 7", [], |r| r.get(0))
            .unwrap();
        assert_eq!(strategy, 3);
    }
}
