use crate::models::ente::{Ente, Regime, ThesisStatus};
use crate::models::projection::{ProjectionReport, ThesisDecision};

pub const MAX_STOCK_TO_REVENUE: f64 = 0.01;
pub const MAX_STOCK_TO_CONSOLIDATED_DEBT: f64 = 0.01;
pub const MAX_AVERAGE_TICKET: f64 = 500_000.0;
/// Payments must outpace issuances on average (percentage points).
pub const MIN_PAID_TO_ISSUED_PCT: f64 = 100.0;

pub const APPROVED_BY_PARAMETERS_LABEL: &str = "APROVADO POR PARÂMETROS";
pub const CASE_BY_CASE_LABEL: &str = "Caso a Caso";

/// Every criterion must hold; only consulted when the stored status is undefined.
pub fn qualifies_for_auto_approval(ente: &Ente, report: &ProjectionReport) -> bool {
    matches!(ente.capag_grade.as_str(), "A" | "B")
        && ente.regime == Regime::Ordinary
        && ente.stock_to_revenue < MAX_STOCK_TO_REVENUE
        && ente.stock_to_consolidated_debt < MAX_STOCK_TO_CONSOLIDATED_DEBT
        && ente.average_ticket < MAX_AVERAGE_TICKET
        && report.payment_history.average_paid_to_issued_pct > MIN_PAID_TO_ISSUED_PCT
}

pub fn resolve_thesis_status(ente: &Ente, report: &ProjectionReport) -> ThesisDecision {
    let status = ente.thesis_status;

    if status == ThesisStatus::Undefined && qualifies_for_auto_approval(ente, report) {
        return ThesisDecision {
            status,
            approved_by_parameters: true,
            label: APPROVED_BY_PARAMETERS_LABEL.to_string(),
        };
    }

    let label = match status {
        ThesisStatus::Undefined => CASE_BY_CASE_LABEL.to_string(),
        other => other.as_str().to_string(),
    };

    ThesisDecision {
        status,
        approved_by_parameters: false,
        label,
    }
}
