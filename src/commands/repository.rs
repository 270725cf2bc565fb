use crate::commands::db;
use crate::models::ente::Ente;
use crate::models::import::ImportSummary;
use std::fs;
use std::path::{Path, PathBuf};

/// Durable home of the entity collection. Handed to the commands explicitly
/// instead of being reached through global state.
pub trait EntesRepository: Send + Sync {
    /// `Ok(None)` when the repository holds no collection at all.
    fn load(&self) -> Result<Option<Vec<Ente>>, String>;
    fn save(&self, entes: &[Ente], summary: &ImportSummary) -> Result<(), String>;
    fn clear(&self) -> Result<(), String>;
    fn describe(&self) -> String;

    /// Metadata of the import that produced the stored collection, if tracked.
    fn last_import(&self) -> Result<Option<ImportSummary>, String> {
        Ok(None)
    }
}

/// SQLite state database under the data directory.
pub struct SqliteRepository {
    db_path: PathBuf,
}

impl SqliteRepository {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn for_data_dir(data_dir: &str) -> Result<Self, String> {
        let dir = Path::new(data_dir).join(".precatorios");
        fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create .precatorios directory: {e}"))?;
        Ok(Self::new(dir.join("state.db")))
    }

    fn connection(&self) -> Result<rusqlite::Connection, String> {
        db::get_db_connection(&self.db_path).map_err(|e| format!("DB error: {e}"))
    }

    pub fn find_by_ibge(&self, ibge_code: &str) -> Result<Option<Ente>, String> {
        let conn = self.connection()?;
        db::find_by_ibge(&conn, ibge_code).map_err(|e| format!("DB read error: {e}"))
    }
}

impl EntesRepository for SqliteRepository {
    fn load(&self) -> Result<Option<Vec<Ente>>, String> {
        let conn = self.connection()?;
        db::load_collection(&conn).map_err(|e| format!("DB read error: {e}"))
    }

    fn save(&self, entes: &[Ente], summary: &ImportSummary) -> Result<(), String> {
        let conn = self.connection()?;
        db::replace_collection(&conn, summary, entes).map_err(|e| format!("DB write error: {e}"))
    }

    fn clear(&self) -> Result<(), String> {
        let conn = self.connection()?;
        db::clear_collection(&conn).map_err(|e| format!("DB delete error: {e}"))
    }

    fn describe(&self) -> String {
        format!("local store {}", self.db_path.display())
    }

    fn last_import(&self) -> Result<Option<ImportSummary>, String> {
        let conn = self.connection()?;
        db::load_last_import(&conn).map_err(|e| format!("DB read error: {e}"))
    }
}

/// Static JSON array shipped alongside the app as a fallback seed.
pub struct SeedFileRepository {
    path: PathBuf,
}

impl SeedFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntesRepository for SeedFileRepository {
    fn load(&self) -> Result<Option<Vec<Ente>>, String> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read {}: {e}", self.path.display()))?;
        let entes = serde_json::from_str::<Vec<Ente>>(&raw)
            .map_err(|e| format!("Failed to parse {}: {e}", self.path.display()))?;
        Ok(Some(entes))
    }

    fn save(&self, entes: &[Ente], _summary: &ImportSummary) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
            }
        }
        let raw = serde_json::to_string_pretty(entes)
            .map_err(|e| format!("Failed to serialize entes: {e}"))?;
        fs::write(&self.path, raw)
            .map_err(|e| format!("Failed to write {}: {e}", self.path.display()))
    }

    fn clear(&self) -> Result<(), String> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| format!("Failed to remove {}: {e}", self.path.display()))?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("seed file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ImportSummary {
        ImportSummary::snapshot("unit test", 1)
    }

    #[test]
    fn seed_file_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let seed = SeedFileRepository::new(dir.path().join("public").join("entes.json"));
        assert!(seed.load().expect("load").is_none());

        let entes = vec![Ente {
            name: "Curitiba".to_string(),
            ibge_code: "4106902".to_string(),
            net_revenue_2024: 9_876_543.21,
            ..Ente::default()
        }];
        seed.save(&entes, &summary()).expect("save");
        assert_eq!(seed.load().expect("load"), Some(entes));

        seed.clear().expect("clear");
        assert!(seed.load().expect("load").is_none());
    }

    #[test]
    fn malformed_seed_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("entes.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(SeedFileRepository::new(path).load().is_err());
    }

    #[test]
    fn legacy_seed_with_loose_values_still_loads() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("entes.json");
        fs::write(
            &path,
            r#"[
                {"ente": "Cidade A", "esfera": "m", "regime": "ORDINÁRIO", "populacao": 1234.5},
                {"ente": "Cidade B", "esfera": "X", "codigoIBGE": "3550308", "qtdProcessosPendentes": 8.0}
            ]"#,
        )
        .expect("write");

        let entes = SeedFileRepository::new(path)
            .load()
            .expect("load")
            .expect("seed present");
        assert_eq!(entes.len(), 2);
        assert_eq!(entes[0].population, 1235);
        assert_eq!(entes[1].pending_cases, 8);
        assert_eq!(entes[1].ibge_code, "3550308");
    }

    #[test]
    fn sqlite_repository_persists_across_instances() {
        let dir = tempfile::tempdir().expect("temp dir");
        let data_dir = dir.path().to_string_lossy().to_string();

        let entes = vec![Ente {
            name: "Recife".to_string(),
            ibge_code: "2611606".to_string(),
            ..Ente::default()
        }];
        SqliteRepository::for_data_dir(&data_dir)
            .expect("repo")
            .save(&entes, &summary())
            .expect("save");

        let reopened = SqliteRepository::for_data_dir(&data_dir).expect("repo");
        assert_eq!(reopened.load().expect("load"), Some(entes));
        assert_eq!(
            reopened.last_import().expect("summary").map(|s| s.source_name),
            Some("unit test".to_string())
        );
        assert_eq!(
            reopened.find_by_ibge("2611606").expect("find").map(|e| e.name),
            Some("Recife".to_string())
        );
    }
}
