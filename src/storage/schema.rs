//! Relational schema of the store.
//!
//! Each model declares the tables it owns. Destroying a model drops exactly
//! those tables, whatever else lives in the same database file.

use crate::Result;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub create_sql: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub create_sql: &'static str,
    pub indexes: &'static [IndexSpec],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub tables: &'static [TableSpec],
}

pub const GEOCODE_LOGICAL: &str = "geocode_logical";
pub const GEOCODE_RACE: &str = "geocode_race";

pub const GEOCODE_LOGICAL_TABLE: TableSpec = TableSpec {
    name: GEOCODE_LOGICAL,
    create_sql: "CREATE TABLE IF NOT EXISTS geocode_logical (
        id INTEGER PRIMARY KEY,
        state TEXT NOT NULL,
        summary_level TEXT NOT NULL,
        logical_record TEXT NOT NULL,
        zcta TEXT NOT NULL
    )",
    indexes: &[IndexSpec {
        name: "zcta_index",
        create_sql: "CREATE INDEX IF NOT EXISTS zcta_index ON geocode_logical (zcta)",
    }],
};

pub const GEOCODE_RACE_TABLE: TableSpec = TableSpec {
    name: GEOCODE_RACE,
    create_sql: "CREATE TABLE IF NOT EXISTS geocode_race (
        id INTEGER PRIMARY KEY,
        state TEXT NOT NULL,
        logical_record TEXT NOT NULL,
        num_white INTEGER NOT NULL CHECK (num_white >= 0),
        num_black INTEGER NOT NULL CHECK (num_black >= 0),
        num_ai INTEGER NOT NULL CHECK (num_ai >= 0),
        num_api INTEGER NOT NULL CHECK (num_api >= 0),
        num_hispanic INTEGER NOT NULL CHECK (num_hispanic >= 0),
        num_multi INTEGER NOT NULL CHECK (num_multi >= 0)
    )",
    indexes: &[IndexSpec {
        name: "logical_record_index",
        create_sql: "CREATE INDEX IF NOT EXISTS logical_record_index ON geocode_race (logical_record)",
    }],
};

/// ZCTA geocoding: header rows keyed by ZCTA and their race counts
pub const GEOCODE_MODEL: ModelSpec = ModelSpec {
    name: "geocode",
    tables: &[GEOCODE_LOGICAL_TABLE, GEOCODE_RACE_TABLE],
};

impl ModelSpec {
    pub fn table_names(&self) -> Vec<&'static str> {
        self.tables.iter().map(|t| t.name).collect()
    }

    pub fn owns(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t.name == table)
    }
}

pub fn create_tables(conn: &Connection, model: &ModelSpec) -> Result<()> {
    for table in model.tables {
        conn.execute(table.create_sql, [])?;
    }
    Ok(())
}

pub fn create_indexes(conn: &Connection, model: &ModelSpec) -> Result<()> {
    for table in model.tables {
        for index in table.indexes {
            conn.execute(index.create_sql, [])?;
        }
    }
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Row count of one of the model tables. Fails when the table is absent.
pub fn row_count(conn: &Connection, table: &TableSpec) -> Result<u64> {
    // Table names come from the static schema, never from input
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table.name), [], |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn, &GEOCODE_MODEL).unwrap();
        create_tables(&conn, &GEOCODE_MODEL).unwrap();
        create_indexes(&conn, &GEOCODE_MODEL).unwrap();
        create_indexes(&conn, &GEOCODE_MODEL).unwrap();

        assert!(table_exists(&conn, GEOCODE_LOGICAL).unwrap());
        assert!(table_exists(&conn, GEOCODE_RACE).unwrap());
        assert_eq!(row_count(&conn, &GEOCODE_RACE_TABLE).unwrap(), 0);
    }

    #[test]
    fn test_indexes_are_declared() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn, &GEOCODE_MODEL).unwrap();
        create_indexes(&conn, &GEOCODE_MODEL).unwrap();

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' ORDER BY name")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(names, vec!["logical_record_index", "zcta_index"]);
    }

    #[test]
    fn test_negative_counts_are_refused() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn, &GEOCODE_MODEL).unwrap();
        let result = conn.execute(
            "INSERT INTO geocode_race (state, logical_record, num_white, num_black, num_ai,
             num_api, num_hispanic, num_multi) VALUES ('AL', '0000001', -1, 0, 0, 0, 0, 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_model_ownership_is_explicit() {
        assert_eq!(GEOCODE_MODEL.table_names(), vec!["geocode_logical", "geocode_race"]);
        assert!(GEOCODE_MODEL.owns("geocode_race"));
        assert!(!GEOCODE_MODEL.owns("geocode_cache"));
    }

    #[test]
    fn test_missing_table_count_fails() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(row_count(&conn, &GEOCODE_LOGICAL_TABLE).is_err());
        assert!(!table_exists(&conn, GEOCODE_LOGICAL).unwrap());
    }
}
