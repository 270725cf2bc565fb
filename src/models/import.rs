use crate::models::ente::Ente;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowExclusion {
    Blank,
    RepeatedHeader,
    TotalRow,
    SumRow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRow {
    /// Index into the header-less row sequence
    pub index: usize,
    pub first_cell: String,
    pub reason: RowExclusion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub id: String,
    pub imported_at: i64,
    pub source_name: String,
    pub schema_version: u32,
    pub header_columns: usize,
    pub row_count: usize,
    pub record_count: usize,
    pub dropped_rows: Vec<DroppedRow>,
    pub duplicate_ibge_codes: Vec<String>,
    pub duration_ms: u64,
}

impl ImportSummary {
    /// Metadata for a collection that did not come from a spreadsheet
    /// (seed export, collection restored from another store).
    pub fn snapshot(source_name: &str, record_count: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            imported_at: chrono::Utc::now().timestamp(),
            source_name: source_name.to_string(),
            schema_version: crate::analysis::mapper::COLUMN_SCHEMA_VERSION,
            header_columns: 0,
            row_count: record_count,
            record_count,
            dropped_rows: Vec::new(),
            duplicate_ibge_codes: Vec::new(),
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    Empty,
    LocalStore,
    SeedFile,
    Import,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedEntes {
    pub source: DataSource,
    pub count: usize,
    pub notice: Option<String>,
    /// True when the durable local store holds a collection the seed would replace on reset
    pub has_local_data: bool,
}

/// Session collection shared with the presentation layer
#[derive(Debug, Default)]
pub struct EntesState {
    pub entes: Vec<Ente>,
    pub source: DataSource,
    pub notice: Option<String>,
    pub last_import: Option<ImportSummary>,
}
