use crate::commands::entes::{
    export_seed, get_dashboard_stats, get_ente_profile, get_last_import, get_state_summaries,
    import_spreadsheet, list_entes, load_entes, reset_to_seed,
};
use crate::commands::repository::{SeedFileRepository, SqliteRepository};
use crate::commands::settings::{get_settings, load_effective_settings, save_settings, EffectiveSettings};
use crate::models::ente::{Esfera, Regime, ThesisStatus};
use crate::models::import::EntesState;
use crate::models::portfolio::{EnteFilter, EnteQuery, SortDirection, SortField};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Parser)]
#[command(name = "precatorios", version, about = "Debtor entity ingestion, projections and dashboard data")]
pub struct Cli {
    /// Directory holding `.precatorios/` (state database and settings)
    #[arg(long, global = true, default_value = ".")]
    pub data_dir: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import a workbook (or the first workbook in a directory), replacing the collection
    Import {
        path: PathBuf,
        /// Reject workbooks whose header is narrower than the column layout
        #[arg(long)]
        strict: bool,
    },
    /// List entes matching the filters
    List(ListArgs),
    /// Full profile of one ente: projection, thesis decision, history series
    Show { ibge_code: String },
    /// Dashboard counters over the filtered collection
    Stats(FilterArgs),
    /// Per-state rollup for the map view
    States,
    /// Summary of the import behind the current collection
    LastImport,
    /// Drop the locally stored collection and reload the seed file
    Reset,
    /// Write the current collection as the seed file
    ExportSeed { path: Option<PathBuf> },
    /// Show settings, or merge a partial JSON object into them
    Settings {
        #[arg(long)]
        set: Option<String>,
    },
}

#[derive(Debug, Default, Args)]
pub struct FilterArgs {
    #[arg(long = "tier", value_parser = parse_tier)]
    pub tiers: Vec<Esfera>,
    #[arg(long = "regime", value_parser = parse_regime)]
    pub regimes: Vec<Regime>,
    /// Letter grade, matched exactly against the stored grade
    #[arg(long = "grade")]
    pub grades: Vec<String>,
    #[arg(long = "thesis", value_parser = parse_thesis)]
    pub thesis_statuses: Vec<ThesisStatus>,
    #[arg(long)]
    pub settlement: Option<bool>,
    #[arg(long)]
    pub population_min: Option<u64>,
    #[arg(long)]
    pub population_max: Option<u64>,
    #[arg(long)]
    pub stock_rcl_max: Option<f64>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Case-insensitive match on name or state code
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long, value_parser = parse_sort_field)]
    pub sort: Option<SortField>,
    #[arg(long)]
    pub desc: bool,
    #[arg(long)]
    pub limit: Option<usize>,
}

fn parse_tier(value: &str) -> Result<Esfera, String> {
    Esfera::from_code(&value.to_uppercase()).ok_or_else(|| format!("unknown tier {value:?} (M, E or D)"))
}

fn parse_regime(value: &str) -> Result<Regime, String> {
    match value.to_lowercase().as_str() {
        "ordinario" | "ordinário" => Ok(Regime::Ordinary),
        "especial" => Ok(Regime::Special),
        _ => Err(format!("unknown regime {value:?} (ordinario or especial)")),
    }
}

fn parse_thesis(value: &str) -> Result<ThesisStatus, String> {
    match value.trim().to_uppercase().as_str() {
        "APROVADA" => Ok(ThesisStatus::Approved),
        "REPROVADA" => Ok(ThesisStatus::Rejected),
        "REVISÃO" | "REVISAO" => Ok(ThesisStatus::UnderReview),
        "INDEFINIDO" => Ok(ThesisStatus::Undefined),
        _ => Err(format!(
            "unknown thesis status {value:?} (aprovada, reprovada, revisao or indefinido)"
        )),
    }
}

fn parse_sort_field(value: &str) -> Result<SortField, String> {
    SortField::parse(value).ok_or_else(|| format!("unknown sort field {value:?}"))
}

impl FilterArgs {
    fn into_filter(self, defaults: &EnteFilter) -> EnteFilter {
        EnteFilter {
            tiers: self.tiers,
            regimes: self.regimes,
            grades: self.grades.into_iter().map(|g| g.trim().to_string()).collect(),
            has_settlement: self.settlement,
            thesis_statuses: self.thesis_statuses,
            population_min: self.population_min.unwrap_or(defaults.population_min),
            population_max: self.population_max.unwrap_or(defaults.population_max),
            stock_rcl_max: self.stock_rcl_max.unwrap_or(defaults.stock_rcl_max),
        }
    }
}

struct Session {
    settings: EffectiveSettings,
    store: SqliteRepository,
    seed: SeedFileRepository,
    state: Arc<Mutex<EntesState>>,
}

impl Session {
    fn open(data_dir: &str) -> Result<Self, String> {
        let settings = load_effective_settings(data_dir)?;
        let store = SqliteRepository::for_data_dir(data_dir)?;
        let seed = SeedFileRepository::new(settings.seed_file.clone());
        Ok(Self {
            settings,
            store,
            seed,
            state: Arc::new(Mutex::new(EntesState::default())),
        })
    }

    async fn load(&self) -> Result<(), String> {
        let loaded = load_entes(&self.store, &self.seed, &self.state).await?;
        if let Some(notice) = &loaded.notice {
            log::warn!("{notice}");
        }
        Ok(())
    }
}

/// Runs one command and returns what should be printed.
pub async fn execute(cli: Cli) -> Result<Value, String> {
    let data_dir = cli.data_dir;
    let session = Session::open(&data_dir)?;

    match cli.command {
        Command::Settings { set: Some(raw) } => {
            let partial = serde_json::from_str::<Value>(&raw)
                .map_err(|e| format!("--set expects a JSON object: {e}"))?;
            save_settings(data_dir, partial).await
        }
        Command::Settings { set: None } => get_settings(data_dir).await,
        Command::Import { path, strict } => {
            let strict = strict || session.settings.strict_column_count;
            let summary = import_spreadsheet(
                path.to_string_lossy().to_string(),
                strict,
                &session.store,
                &session.state,
            )
            .await?;
            to_json(&summary)
        }
        Command::Reset => {
            let loaded = reset_to_seed(&session.store, &session.seed, &session.state).await?;
            to_json(&loaded)
        }
        Command::List(args) => {
            session.load().await?;
            let query = EnteQuery {
                filter: args.filter.into_filter(&session.settings.default_filter),
                search: args.search,
                sort_field: args.sort.unwrap_or(session.settings.sort_field),
                sort_direction: if args.desc {
                    SortDirection::Desc
                } else {
                    session.settings.sort_direction
                },
            };
            let mut entes = list_entes(query, &session.state).await?;
            if let Some(limit) = args.limit {
                entes.truncate(limit);
            }
            to_json(&entes)
        }
        Command::Show { ibge_code } => {
            session.load().await?;
            to_json(&get_ente_profile(ibge_code, &session.state).await?)
        }
        Command::Stats(filter) => {
            session.load().await?;
            let filter = filter.into_filter(&session.settings.default_filter);
            to_json(&get_dashboard_stats(filter, &session.state).await?)
        }
        Command::States => {
            session.load().await?;
            to_json(&get_state_summaries(&session.state).await?)
        }
        Command::LastImport => {
            session.load().await?;
            to_json(&get_last_import(&session.state).await?)
        }
        Command::ExportSeed { path } => {
            session.load().await?;
            let target = path
                .map(SeedFileRepository::new)
                .unwrap_or_else(|| SeedFileRepository::new(session.settings.seed_file.clone()));
            let count = export_seed(&target, &session.state).await?;
            to_json(&serde_json::json!({
                "path": target.path().display().to_string(),
                "count": count,
            }))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to serialize output: {e}"))
}
