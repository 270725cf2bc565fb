use crate::models::ente::{Ente, ThesisStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedYear {
    pub year: u16,
    pub revenue: f64,
    pub payment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentYear {
    pub year: u16,
    pub paid: f64,
    pub issued: f64,
    /// paid / issued in percentage points; 0 when nothing was issued
    pub paid_to_issued_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentHistorySummary {
    pub years: Vec<PaymentYear>,
    pub average_paid: f64,
    pub average_issued: f64,
    pub average_paid_to_issued_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorRevenueShare {
    pub year: u16,
    pub paid: f64,
    pub prior_revenue: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialYear {
    pub year: u16,
    pub revenue: f64,
    pub map_debt: f64,
    pub consolidated_debt: f64,
}

/// Derived on demand from one record. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionReport {
    pub revenue_growth_rate: f64,
    pub revenue_share: f64,
    pub revenue_shares: Vec<f64>,
    pub projection: Vec<ProjectedYear>,
    pub annual_average_payment: f64,
    pub payoff_years: f64,
    pub payoff_months: f64,
    pub annual_case_closures: f64,
    pub payment_history: PaymentHistorySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesisDecision {
    pub status: ThesisStatus,
    pub approved_by_parameters: bool,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opportunity {
    Favorable,
    Neutral,
    Unfavorable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnteProfile {
    pub ente: Ente,
    pub projection: ProjectionReport,
    pub thesis: ThesisDecision,
    pub opportunity: Opportunity,
    pub last_update_label: String,
    pub financial_history: Vec<FinancialYear>,
    pub payments: Vec<PaymentYear>,
    pub prior_revenue_shares: Vec<PriorRevenueShare>,
}
