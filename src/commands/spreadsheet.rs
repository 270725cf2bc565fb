use crate::analysis::cells::CellValue;
use crate::analysis::mapper::{COLUMN_SCHEMA_VERSION, EXPECTED_COLUMN_COUNT};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Grid = Vec<Vec<CellValue>>;

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("could not open workbook: {0}")]
    Open(#[from] calamine::Error),

    #[error("workbook has no sheets")]
    NoSheets,

    #[error("could not read sheet {name:?}: {source}")]
    Sheet {
        name: String,
        #[source]
        source: calamine::Error,
    },

    #[error("no .xlsx or .xls file found in {0}")]
    NoWorkbookFound(String),

    #[error("header has {found} columns, layout v{version} expects {expected}")]
    SchemaMismatch {
        found: usize,
        expected: usize,
        version: u32,
    },
}

/// First sheet of the workbook at `path`, as raw rows.
pub fn read_grid_from_path(path: &Path) -> Result<Grid, SpreadsheetError> {
    let workbook = open_workbook_auto(path)?;
    first_sheet_grid(workbook)
}

/// Same as `read_grid_from_path`, for an uploaded file's bytes.
pub fn read_grid_from_bytes(bytes: Vec<u8>) -> Result<Grid, SpreadsheetError> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    first_sheet_grid(workbook)
}

fn first_sheet_grid<RS>(mut workbook: Sheets<RS>) -> Result<Grid, SpreadsheetError>
where
    RS: Read + Seek,
{
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SpreadsheetError::NoSheets)?;

    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| SpreadsheetError::Sheet {
            name: name.clone(),
            source,
        })?;

    Ok(range_to_grid(&range))
}

/// Columns are positional from column A, so a used range starting further
/// right is padded with empty cells.
fn range_to_grid(range: &Range<Data>) -> Grid {
    let column_offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    range
        .rows()
        .map(|row| {
            let mut cells = Vec::with_capacity(column_offset + row.len());
            cells.resize(column_offset, CellValue::Empty);
            cells.extend(row.iter().map(to_cell));
            cells
        })
        .collect()
}

fn to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Workbooks directly inside `dir`, sorted by path.
pub fn discover_workbooks(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for ext in ["xlsx", "xls"] {
        let pattern = dir.join(format!("*.{ext}"));
        let Ok(paths) = glob::glob(&pattern.to_string_lossy()) else {
            continue;
        };
        found.extend(paths.flatten());
    }
    found.sort();
    found
}

/// A file path is used as-is; a directory resolves to its first workbook.
pub fn resolve_workbook(path: &Path) -> Result<PathBuf, SpreadsheetError> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }

    let candidates = discover_workbooks(path);
    if candidates.len() > 1 {
        log::info!(
            "Found {} workbooks in {}, using {}",
            candidates.len(),
            path.display(),
            candidates[0].display()
        );
    }
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| SpreadsheetError::NoWorkbookFound(path.display().to_string()))
}

/// Splits off the header row and checks its width against the column layout.
/// With `strict` off a narrow header only logs a warning; missing cells still
/// coerce to defaults during mapping.
pub fn split_header(mut grid: Grid, strict: bool) -> Result<(usize, Grid), SpreadsheetError> {
    if grid.is_empty() {
        return Ok((0, grid));
    }

    let header = grid.remove(0);
    let width = header
        .iter()
        .rposition(|c| !c.is_falsy())
        .map(|i| i + 1)
        .unwrap_or(0);

    if width < EXPECTED_COLUMN_COUNT {
        if strict {
            return Err(SpreadsheetError::SchemaMismatch {
                found: width,
                expected: EXPECTED_COLUMN_COUNT,
                version: COLUMN_SCHEMA_VERSION,
            });
        }
        log::warn!(
            "Header has {width} columns, layout v{COLUMN_SCHEMA_VERSION} expects {EXPECTED_COLUMN_COUNT}; missing columns read as blank"
        );
    }

    Ok((width, grid))
}
