//! SQLite reference store.
//!
//! RULE: Only the store talks to the database.
//! The engine receives a built catalogue and organisation; it never
//! executes SQL. Tables are read once at start-up and nothing computed is
//! written back.

mod organisation;
mod reference;

use crate::{
    error::{WorkloadError, WorkloadResult},
    normalize::parse_number,
};
use rusqlite::{types::Value as SqlValue, Connection};

pub use organisation::{NewCentrePoste, NewTache};

pub struct ReferenceStore {
    conn: Connection,
    path: Option<String>, // None for :memory:
}

impl ReferenceStore {
    /// Open (or create) the reference database at `path`.
    pub fn open(path: &str) -> WorkloadResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files; :memory: ignores it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> WorkloadResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> WorkloadResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_reference.sql"))?;
        Ok(())
    }

    /// Row count of a reference table, for start-up diagnostics.
    pub fn count(&self, table: &str) -> WorkloadResult<i64> {
        if !TABLES.contains(&table) {
            return Err(WorkloadError::configuration(format!("unknown table {table}")));
        }
        let n = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n)
    }
}

pub const TABLES: [&str; 10] = [
    "flux",
    "volume_sens",
    "volume_segments",
    "volume_mapping_rules",
    "unite_conversion_rules",
    "directions",
    "centres",
    "postes",
    "centre_postes",
    "taches",
];

/// Coerce a loosely typed column (number, '85%', '1,5', NULL).
fn loose_number(field: &str, value: SqlValue) -> WorkloadResult<Option<f64>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Integer(i) => Ok(Some(i as f64)),
        SqlValue::Real(f) => Ok(Some(f)),
        SqlValue::Text(s) => parse_number(field, &s),
        SqlValue::Blob(_) => Err(WorkloadError::InvalidNumber {
            field: field.to_string(),
            raw: "<blob>".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_columns_accept_text_and_numbers() {
        assert_eq!(loose_number("x", SqlValue::Null).unwrap(), None);
        assert_eq!(loose_number("x", SqlValue::Integer(3)).unwrap(), Some(3.0));
        assert_eq!(loose_number("x", SqlValue::Real(0.5)).unwrap(), Some(0.5));
        assert_eq!(
            loose_number("x", SqlValue::Text("1,5".into())).unwrap(),
            Some(1.5)
        );
        assert!(loose_number("x", SqlValue::Blob(vec![1])).is_err());
    }

    #[test]
    fn count_rejects_unknown_tables() {
        let store = ReferenceStore::in_memory().unwrap();
        store.migrate().unwrap();
        assert_eq!(store.count("flux").unwrap(), 0);
        assert!(store.count("sqlite_master; DROP TABLE flux").is_err());
    }
}
