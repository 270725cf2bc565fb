use crate::analysis::dates::format_update_label;
use crate::analysis::mapper::{map_rows_with_report, COLUMN_SCHEMA_VERSION};
use crate::analysis::payments::{financial_history, prior_revenue_shares};
use crate::analysis::portfolio::{
    apply_filter, dashboard_stats, matches_search, opportunity, sort_entes, state_summaries,
};
use crate::analysis::predictive::project;
use crate::analysis::thesis::resolve_thesis_status;
use crate::commands::repository::EntesRepository;
use crate::commands::spreadsheet::{
    read_grid_from_bytes, read_grid_from_path, resolve_workbook, split_header, Grid,
};
use crate::models::ente::Ente;
use crate::models::import::{DataSource, EntesState, ImportSummary, LoadedEntes};
use crate::models::portfolio::{DashboardStats, EnteFilter, EnteQuery, StateSummary};
use crate::models::projection::EnteProfile;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

pub const LOAD_FAILURE_NOTICE: &str = "Não foi possível carregar os dados dos entes";

pub async fn load_entes(
    store: &dyn EntesRepository,
    seed: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<LoadedEntes, String> {
    load_entes_internal(store, seed, state)
}

/// Local store first, then the seed file, then an empty collection with a notice.
pub fn load_entes_internal(
    store: &dyn EntesRepository,
    seed: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<LoadedEntes, String> {
    if let Some(entes) = try_load(store) {
        let last_import = store.last_import().unwrap_or_else(|e| {
            log::warn!("Could not read import metadata: {e}");
            None
        });
        return install(state, entes, DataSource::LocalStore, None, last_import, true);
    }

    load_from_seed(seed, state)
}

pub async fn reset_to_seed(
    store: &dyn EntesRepository,
    seed: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<LoadedEntes, String> {
    reset_to_seed_internal(store, seed, state)
}

/// Drops the locally stored collection and reloads the seed.
pub fn reset_to_seed_internal(
    store: &dyn EntesRepository,
    seed: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<LoadedEntes, String> {
    store.clear()?;
    log::info!("Cleared {}", store.describe());
    load_from_seed(seed, state)
}

fn load_from_seed(
    seed: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<LoadedEntes, String> {
    match try_load(seed) {
        Some(entes) => install(state, entes, DataSource::SeedFile, None, None, false),
        None => {
            log::warn!("No collection available, starting empty");
            install(
                state,
                Vec::new(),
                DataSource::Empty,
                Some(LOAD_FAILURE_NOTICE.to_string()),
                None,
                false,
            )
        }
    }
}

fn try_load(repo: &dyn EntesRepository) -> Option<Vec<Ente>> {
    match repo.load() {
        Ok(Some(entes)) => {
            log::info!("Loaded {} entes from {}", entes.len(), repo.describe());
            Some(entes)
        }
        Ok(None) => {
            log::debug!("Nothing stored in {}", repo.describe());
            None
        }
        Err(e) => {
            log::warn!("Failed to load {}: {e}", repo.describe());
            None
        }
    }
}

fn install(
    state: &Arc<Mutex<EntesState>>,
    entes: Vec<Ente>,
    source: DataSource,
    notice: Option<String>,
    last_import: Option<ImportSummary>,
    has_local_data: bool,
) -> Result<LoadedEntes, String> {
    let mut lock = lock_state(state)?;
    let loaded = LoadedEntes {
        source,
        count: entes.len(),
        notice: notice.clone(),
        has_local_data,
    };
    lock.entes = entes;
    lock.source = source;
    lock.notice = notice;
    lock.last_import = last_import;
    Ok(loaded)
}

pub async fn import_spreadsheet(
    path: String,
    strict_column_count: bool,
    store: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<ImportSummary, String> {
    import_spreadsheet_internal(Path::new(&path), strict_column_count, store, state)
}

/// `path` may be a workbook or a directory holding one.
pub fn import_spreadsheet_internal(
    path: &Path,
    strict_column_count: bool,
    store: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<ImportSummary, String> {
    let workbook = resolve_workbook(path).map_err(|e| format!("Import failed: {e}"))?;
    let grid = read_grid_from_path(&workbook)
        .map_err(|e| format!("Import failed for {}: {e}", workbook.display()))?;

    let source_name = workbook
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| workbook.display().to_string());

    import_grid(grid, &source_name, strict_column_count, store, state)
}

pub async fn import_spreadsheet_bytes(
    bytes: Vec<u8>,
    source_name: String,
    strict_column_count: bool,
    store: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<ImportSummary, String> {
    let grid = read_grid_from_bytes(bytes)
        .map_err(|e| format!("Import failed for {source_name}: {e}"))?;
    import_grid(grid, &source_name, strict_column_count, store, state)
}

/// Maps a raw grid (header row included) and replaces the collection.
/// The store is written before the session state, so any failure leaves the
/// previous collection in place.
pub fn import_grid(
    grid: Grid,
    source_name: &str,
    strict_column_count: bool,
    store: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<ImportSummary, String> {
    let start = Instant::now();

    let (header_columns, rows) = split_header(grid, strict_column_count)
        .map_err(|e| format!("Import failed for {source_name}: {e}"))?;
    let outcome = map_rows_with_report(&rows);

    for dropped in &outcome.dropped {
        log::debug!(
            "Dropped row {} ({:?}): {:?}",
            dropped.index,
            dropped.reason,
            dropped.first_cell
        );
    }

    let duplicate_ibge_codes = duplicate_ibge_codes(&outcome.entes);
    if !duplicate_ibge_codes.is_empty() {
        log::warn!(
            "{} IBGE codes appear more than once in {source_name}; lookups use the first match",
            duplicate_ibge_codes.len()
        );
    }

    let summary = ImportSummary {
        id: uuid::Uuid::new_v4().to_string(),
        imported_at: chrono::Utc::now().timestamp(),
        source_name: source_name.to_string(),
        schema_version: COLUMN_SCHEMA_VERSION,
        header_columns,
        row_count: rows.len(),
        record_count: outcome.entes.len(),
        dropped_rows: outcome.dropped,
        duplicate_ibge_codes,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    store
        .save(&outcome.entes, &summary)
        .map_err(|e| format!("Failed to save imported entes: {e}"))?;

    {
        let mut lock = lock_state(state)?;
        lock.entes = outcome.entes;
        lock.source = DataSource::Import;
        lock.notice = None;
        lock.last_import = Some(summary.clone());
    }

    log::info!(
        "Imported {} entes from {source_name} ({} rows, {} dropped) in {}ms",
        summary.record_count,
        summary.row_count,
        summary.dropped_rows.len(),
        summary.duration_ms
    );

    Ok(summary)
}

fn duplicate_ibge_codes(entes: &[Ente]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();
    for ente in entes.iter().filter(|e| !e.ibge_code.is_empty()) {
        if !seen.insert(ente.ibge_code.as_str()) {
            duplicates.insert(ente.ibge_code.clone());
        }
    }
    duplicates.into_iter().collect()
}

pub async fn get_ente_profile(
    ibge_code: String,
    state: &Arc<Mutex<EntesState>>,
) -> Result<EnteProfile, String> {
    let lock = lock_state(state)?;
    let ente = lock
        .entes
        .iter()
        .find(|e| e.ibge_code == ibge_code)
        .ok_or_else(|| format!("No ente with IBGE code {ibge_code}"))?;
    Ok(build_profile(ente))
}

/// Everything the profile view shows, recomputed from the record on each call.
pub fn build_profile(ente: &Ente) -> EnteProfile {
    let projection = project(ente);
    let thesis = resolve_thesis_status(ente, &projection);

    EnteProfile {
        ente: ente.clone(),
        thesis,
        opportunity: opportunity(ente),
        last_update_label: format_update_label(&ente.last_update),
        financial_history: financial_history(ente),
        payments: projection.payment_history.years.clone(),
        prior_revenue_shares: prior_revenue_shares(ente),
        projection,
    }
}

pub async fn list_entes(
    query: EnteQuery,
    state: &Arc<Mutex<EntesState>>,
) -> Result<Vec<Ente>, String> {
    let lock = lock_state(state)?;
    let search = query.search.as_deref().unwrap_or("");

    let mut rows: Vec<&Ente> = apply_filter(&lock.entes, &query.filter)
        .into_iter()
        .filter(|e| matches_search(e, search))
        .collect();
    sort_entes(&mut rows, query.sort_field, query.sort_direction);

    Ok(rows.into_iter().cloned().collect())
}

pub async fn get_dashboard_stats(
    filter: EnteFilter,
    state: &Arc<Mutex<EntesState>>,
) -> Result<DashboardStats, String> {
    let lock = lock_state(state)?;
    let filtered: Vec<Ente> = apply_filter(&lock.entes, &filter)
        .into_iter()
        .cloned()
        .collect();
    Ok(dashboard_stats(&filtered))
}

pub async fn get_state_summaries(
    state: &Arc<Mutex<EntesState>>,
) -> Result<Vec<StateSummary>, String> {
    let lock = lock_state(state)?;
    Ok(state_summaries(&lock.entes))
}

pub async fn get_last_import(
    state: &Arc<Mutex<EntesState>>,
) -> Result<Option<ImportSummary>, String> {
    let lock = lock_state(state)?;
    Ok(lock.last_import.clone())
}

pub async fn export_seed(
    seed: &dyn EntesRepository,
    state: &Arc<Mutex<EntesState>>,
) -> Result<usize, String> {
    let (entes, summary) = {
        let lock = lock_state(state)?;
        let summary = lock
            .last_import
            .clone()
            .unwrap_or_else(|| ImportSummary::snapshot("session", lock.entes.len()));
        (lock.entes.clone(), summary)
    };

    seed.save(&entes, &summary)?;
    log::info!("Exported {} entes to {}", entes.len(), seed.describe());
    Ok(entes.len())
}

fn lock_state(state: &Arc<Mutex<EntesState>>) -> Result<MutexGuard<'_, EntesState>, String> {
    state.lock().map_err(|_| "State lock error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cells::CellValue;
    use crate::models::ente::ThesisStatus;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct MemoryRepository {
        entes: Mutex<Option<Vec<Ente>>>,
        fail_saves: AtomicBool,
    }

    impl EntesRepository for MemoryRepository {
        fn load(&self) -> Result<Option<Vec<Ente>>, String> {
            Ok(self.entes.lock().unwrap().clone())
        }

        fn save(&self, entes: &[Ente], _summary: &ImportSummary) -> Result<(), String> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err("disk full".to_string());
            }
            *self.entes.lock().unwrap() = Some(entes.to_vec());
            Ok(())
        }

        fn clear(&self) -> Result<(), String> {
            *self.entes.lock().unwrap() = None;
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    fn row(name: &str, ibge: &str) -> Vec<CellValue> {
        vec![
            CellValue::from(name),
            CellValue::from(name),
            CellValue::from("M"),
            CellValue::from("SP"),
            CellValue::from(ibge),
        ]
    }

    fn grid(rows: Vec<Vec<CellValue>>) -> Grid {
        let mut grid = vec![vec![CellValue::from("Ente")]];
        grid.extend(rows);
        grid
    }

    #[test]
    fn import_reports_drops_and_duplicates() {
        let store = MemoryRepository::default();
        let state = Arc::new(Mutex::new(EntesState::default()));

        let summary = import_grid(
            grid(vec![
                row("Santos", "3548500"),
                vec![CellValue::Empty],
                row("TOTAL GERAL", ""),
                row("Santos (revisado)", "3548500"),
            ]),
            "base.xlsx",
            false,
            &store,
            &state,
        )
        .expect("import");

        assert_eq!(summary.row_count, 4);
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.header_columns, 1);
        let dropped: Vec<usize> = summary.dropped_rows.iter().map(|d| d.index).collect();
        assert_eq!(dropped, vec![1, 2]);
        assert_eq!(summary.duplicate_ibge_codes, vec!["3548500".to_string()]);

        let lock = state.lock().unwrap();
        assert_eq!(lock.source, DataSource::Import);
        assert_eq!(lock.entes.len(), 2);
        assert_eq!(store.load().unwrap().map(|e| e.len()), Some(2));
    }

    #[test]
    fn failed_save_keeps_previous_collection() {
        let store = MemoryRepository::default();
        let state = Arc::new(Mutex::new(EntesState::default()));
        import_grid(grid(vec![row("Santos", "1")]), "a.xlsx", false, &store, &state)
            .expect("first import");

        store.fail_saves.store(true, Ordering::SeqCst);
        let result = import_grid(
            grid(vec![row("Campinas", "2"), row("Sorocaba", "3")]),
            "b.xlsx",
            false,
            &store,
            &state,
        );

        assert!(result.is_err());
        let lock = state.lock().unwrap();
        assert_eq!(lock.entes.len(), 1);
        assert_eq!(lock.entes[0].name, "Santos");
    }

    #[test]
    fn strict_mode_rejects_narrow_header() {
        let store = MemoryRepository::default();
        let state = Arc::new(Mutex::new(EntesState::default()));
        let result = import_grid(grid(vec![row("Santos", "1")]), "a.xlsx", true, &store, &state);

        assert!(result.unwrap_err().contains("expects 67"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn load_falls_back_to_seed_then_empty() {
        let store = MemoryRepository::default();
        let seed = MemoryRepository::default();
        let state = Arc::new(Mutex::new(EntesState::default()));

        let loaded = load_entes_internal(&store, &seed, &state).expect("load");
        assert_eq!(loaded.source, DataSource::Empty);
        assert_eq!(loaded.notice.as_deref(), Some(LOAD_FAILURE_NOTICE));

        *seed.entes.lock().unwrap() = Some(vec![Ente::default()]);
        let loaded = load_entes_internal(&store, &seed, &state).expect("load");
        assert_eq!(loaded.source, DataSource::SeedFile);
        assert_eq!(loaded.count, 1);
        assert!(!loaded.has_local_data);

        *store.entes.lock().unwrap() = Some(vec![Ente::default(), Ente::default()]);
        let loaded = load_entes_internal(&store, &seed, &state).expect("load");
        assert_eq!(loaded.source, DataSource::LocalStore);
        assert_eq!(loaded.count, 2);
        assert!(loaded.has_local_data);
        assert!(state.lock().unwrap().notice.is_none());
    }

    #[test]
    fn reset_clears_store_and_reloads_seed() {
        let store = MemoryRepository::default();
        let seed = MemoryRepository::default();
        let state = Arc::new(Mutex::new(EntesState::default()));
        *store.entes.lock().unwrap() = Some(vec![Ente::default(), Ente::default()]);
        *seed.entes.lock().unwrap() = Some(vec![Ente::default()]);

        let loaded = reset_to_seed_internal(&store, &seed, &state).expect("reset");
        assert_eq!(loaded.source, DataSource::SeedFile);
        assert_eq!(loaded.count, 1);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn profile_labels_undefined_status_case_by_case() {
        let ente = Ente {
            name: "Santos".to_string(),
            capag_grade: "C".to_string(),
            last_update: "45413".to_string(),
            thesis_status: ThesisStatus::Undefined,
            ..Ente::default()
        };

        let profile = build_profile(&ente);
        assert_eq!(profile.thesis.label, "Caso a Caso");
        assert!(!profile.thesis.approved_by_parameters);
        assert_eq!(profile.last_update_label, "mai/24");
        assert_eq!(profile.payments.len(), 6);
        assert_eq!(profile.prior_revenue_shares.len(), 5);
        assert_eq!(profile.financial_history.len(), 6);
    }

    #[test]
    fn profile_keeps_unconvertible_update_text() {
        let ente = Ente {
            name: "Niterói".to_string(),
            last_update: "-1e300".to_string(),
            ..Ente::default()
        };

        let profile = build_profile(&ente);
        assert_eq!(profile.last_update_label, "-1e300");
    }
}
