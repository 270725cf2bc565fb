use crate::models::ente::Ente;
use crate::models::import::ImportSummary;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;

const DB_SCHEMA_VERSION: i64 = 2;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        // Future schema; do not fail reads/writes for forward-compatible changes.
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS imports (
            id TEXT PRIMARY KEY,
            imported_at INTEGER NOT NULL,
            source_name TEXT NOT NULL DEFAULT '',
            schema_version INTEGER NOT NULL,
            header_columns INTEGER NOT NULL DEFAULT 0,
            row_count INTEGER NOT NULL DEFAULT 0,
            record_count INTEGER NOT NULL DEFAULT 0,
            summary_json TEXT NOT NULL DEFAULT '{}'
        );

        CREATE TABLE IF NOT EXISTS entes (
            position INTEGER PRIMARY KEY,
            import_id TEXT NOT NULL REFERENCES imports(id) ON DELETE CASCADE,
            ibge_code TEXT NOT NULL DEFAULT '',
            name TEXT NOT NULL DEFAULT '',
            state_code TEXT NOT NULL DEFAULT '',
            record_json TEXT NOT NULL
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_entes_ibge_code ON entes(ibge_code);
        CREATE INDEX IF NOT EXISTS idx_entes_state_code ON entes(state_code);
        CREATE INDEX IF NOT EXISTS idx_imports_imported_at ON imports(imported_at);
        ",
    )
}

pub fn get_db_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// Replaces the stored collection in one transaction.
pub fn replace_collection(conn: &Connection, summary: &ImportSummary, entes: &[Ente]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM entes", [])?;
    tx.execute("DELETE FROM imports", [])?;

    let summary_json = serde_json::to_string(summary)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    tx.execute(
        "INSERT INTO imports (id, imported_at, source_name, schema_version, header_columns, row_count, record_count, summary_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            summary.id,
            summary.imported_at,
            summary.source_name,
            summary.schema_version as i64,
            summary.header_columns as i64,
            summary.row_count as i64,
            summary.record_count as i64,
            summary_json,
        ],
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO entes (position, import_id, ibge_code, name, state_code, record_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for (position, ente) in entes.iter().enumerate() {
            let record_json = serde_json::to_string(ente)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            stmt.execute(params![
                position as i64,
                summary.id,
                ente.ibge_code,
                ente.name,
                ente.state_code,
                record_json,
            ])?;
        }
    }

    tx.commit()
}

fn decode_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str::<T>(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn has_import(conn: &Connection) -> Result<bool> {
    conn.query_row("SELECT EXISTS(SELECT 1 FROM imports)", [], |row| row.get(0))
}

/// `None` when nothing has been imported yet; an import with zero records
/// loads as an empty collection.
pub fn load_collection(conn: &Connection) -> Result<Option<Vec<Ente>>> {
    if !has_import(conn)? {
        return Ok(None);
    }

    let mut stmt = conn.prepare("SELECT record_json FROM entes ORDER BY position ASC")?;
    let entes = stmt
        .query_map([], |row| decode_json::<Ente>(&row.get::<_, String>(0)?))?
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(entes))
}

pub fn load_last_import(conn: &Connection) -> Result<Option<ImportSummary>> {
    conn.query_row(
        "SELECT summary_json FROM imports ORDER BY imported_at DESC LIMIT 1",
        [],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .map(|json| decode_json::<ImportSummary>(&json))
    .transpose()
}

pub fn clear_collection(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM entes", [])?;
    tx.execute("DELETE FROM imports", [])?;
    tx.commit()
}

pub fn find_by_ibge(conn: &Connection, ibge_code: &str) -> Result<Option<Ente>> {
    conn.query_row(
        "SELECT record_json FROM entes WHERE ibge_code = ?1 ORDER BY position ASC LIMIT 1",
        params![ibge_code],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .map(|json| decode_json::<Ente>(&json))
    .transpose()
}
