use crate::models::ente::{Esfera, Regime, ThesisStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total: usize,
    pub ordinary: usize,
    pub ordinary_pct: f64,
    pub special: usize,
    pub special_pct: f64,
    pub with_settlement: usize,
    pub hot_opportunities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub state_code: String,
    pub municipal_count: usize,
    pub total_precatorio_debt: f64,
    pub state_grade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnteFilter {
    pub tiers: Vec<Esfera>,
    pub regimes: Vec<Regime>,
    pub grades: Vec<String>,
    pub has_settlement: Option<bool>,
    pub thesis_statuses: Vec<ThesisStatus>,
    pub population_min: u64,
    pub population_max: u64,
    pub stock_rcl_max: f64,
}

pub const DEFAULT_POPULATION_MAX: u64 = 50_000_000;
pub const DEFAULT_STOCK_RCL_MAX: f64 = 10.0;

impl Default for EnteFilter {
    fn default() -> Self {
        Self {
            tiers: Vec::new(),
            regimes: Vec::new(),
            grades: Vec::new(),
            has_settlement: None,
            thesis_statuses: Vec::new(),
            population_min: 0,
            population_max: DEFAULT_POPULATION_MAX,
            stock_rcl_max: DEFAULT_STOCK_RCL_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    State,
    Population,
    Revenue,
    PrecatorioDebt,
    StockToRevenue,
    Grade,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "state" => Some(Self::State),
            "population" => Some(Self::Population),
            "revenue" => Some(Self::Revenue),
            "precatorio_debt" => Some(Self::PrecatorioDebt),
            "stock_to_revenue" => Some(Self::StockToRevenue),
            "grade" => Some(Self::Grade),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Listing request: filter, free-text search and ordering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnteQuery {
    pub filter: EnteFilter,
    pub search: Option<String>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}
