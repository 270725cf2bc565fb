use crate::models::ente::{Ente, Esfera, Regime};
use crate::models::portfolio::{DashboardStats, EnteFilter, SortDirection, SortField, StateSummary};
use crate::models::projection::Opportunity;
use std::cmp::Ordering;
use std::collections::BTreeMap;

const HOT_OPPORTUNITY_MAX_STOCK_RCL: f64 = 0.5;
const FAVORABLE_MAX_STOCK_RCL: f64 = 0.3;
const UNFAVORABLE_MIN_STOCK_RCL: f64 = 1.0;

pub fn dashboard_stats(entes: &[Ente]) -> DashboardStats {
    let total = entes.len();
    let ordinary = entes.iter().filter(|e| e.regime == Regime::Ordinary).count();
    let special = entes.iter().filter(|e| e.regime == Regime::Special).count();
    let with_settlement = entes.iter().filter(|e| e.has_settlement).count();
    let hot_opportunities = entes
        .iter()
        .filter(|e| e.capag_grade == "A" && e.stock_to_revenue < HOT_OPPORTUNITY_MAX_STOCK_RCL)
        .count();

    DashboardStats {
        total,
        ordinary,
        ordinary_pct: share_pct(ordinary, total),
        special,
        special_pct: share_pct(special, total),
        with_settlement,
        hot_opportunities,
    }
}

fn share_pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

pub fn opportunity(ente: &Ente) -> Opportunity {
    if ente.capag_grade == "A" && ente.stock_to_revenue < FAVORABLE_MAX_STOCK_RCL {
        Opportunity::Favorable
    } else if ente.capag_grade == "D" || ente.stock_to_revenue > UNFAVORABLE_MIN_STOCK_RCL {
        Opportunity::Unfavorable
    } else {
        Opportunity::Neutral
    }
}

pub fn matches_filter(ente: &Ente, filter: &EnteFilter) -> bool {
    (filter.tiers.is_empty() || filter.tiers.contains(&ente.tier))
        && (filter.regimes.is_empty() || filter.regimes.contains(&ente.regime))
        && (filter.grades.is_empty() || filter.grades.contains(&ente.capag_grade))
        && filter.has_settlement.map_or(true, |flag| ente.has_settlement == flag)
        && (filter.thesis_statuses.is_empty() || filter.thesis_statuses.contains(&ente.thesis_status))
        && ente.population >= filter.population_min
        && ente.population <= filter.population_max
        && ente.stock_to_revenue <= filter.stock_rcl_max
}

pub fn apply_filter<'a>(entes: &'a [Ente], filter: &EnteFilter) -> Vec<&'a Ente> {
    entes.iter().filter(|e| matches_filter(e, filter)).collect()
}

/// Case-insensitive substring match on name or state code. Blank terms match everything.
pub fn matches_search(ente: &Ente, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || ente.name.to_lowercase().contains(&term)
        || ente.state_code.to_lowercase().contains(&term)
}

pub fn sort_entes(entes: &mut [&Ente], field: SortField, direction: SortDirection) {
    entes.sort_by(|a, b| {
        let ordering = compare(a, b, field);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn compare(a: &Ente, b: &Ente, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::State => a.state_code.cmp(&b.state_code),
        SortField::Population => a.population.cmp(&b.population),
        SortField::Revenue => a.net_revenue_2024.total_cmp(&b.net_revenue_2024),
        SortField::PrecatorioDebt => a.precatorio_debt_2024.total_cmp(&b.precatorio_debt_2024),
        SortField::StockToRevenue => a.stock_to_revenue.total_cmp(&b.stock_to_revenue),
        SortField::Grade => a.capag_grade.cmp(&b.capag_grade),
    }
}

/// Per-state rollup for the map view, ordered by state code.
pub fn state_summaries(entes: &[Ente]) -> Vec<StateSummary> {
    let mut by_state: BTreeMap<&str, StateSummary> = BTreeMap::new();

    for ente in entes.iter().filter(|e| !e.state_code.is_empty()) {
        let summary = by_state
            .entry(ente.state_code.as_str())
            .or_insert_with(|| StateSummary {
                state_code: ente.state_code.clone(),
                municipal_count: 0,
                total_precatorio_debt: 0.0,
                state_grade: None,
            });

        summary.total_precatorio_debt += ente.precatorio_debt_2024;
        match ente.tier {
            Esfera::Municipal => summary.municipal_count += 1,
            Esfera::State | Esfera::FederalDistrict => {
                if summary.state_grade.is_none() {
                    summary.state_grade = Some(ente.capag_grade.clone());
                }
            }
        }
    }

    by_state.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ente::ThesisStatus;

    fn ente(name: &str, uf: &str, grade: &str, stock_rcl: f64) -> Ente {
        Ente {
            name: name.to_string(),
            state_code: uf.to_string(),
            capag_grade: grade.to_string(),
            stock_to_revenue: stock_rcl,
            ..Ente::default()
        }
    }

    #[test]
    fn counts_regimes_settlements_and_hot_opportunities() {
        let entes = vec![
            ente("A", "SP", "A", 0.1),
            Ente { regime: Regime::Special, has_settlement: true, ..ente("B", "RJ", "A", 0.6) },
            ente("C", "MG", "B", 0.1),
            ente("D", "BA", "A", 0.49),
        ];

        let stats = dashboard_stats(&entes);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.ordinary, 3);
        assert_eq!(stats.special, 1);
        assert!((stats.ordinary_pct - 75.0).abs() < 1e-9);
        assert_eq!(stats.with_settlement, 1);
        assert_eq!(stats.hot_opportunities, 2);
    }

    #[test]
    fn empty_collection_has_zero_shares() {
        let stats = dashboard_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.ordinary_pct, 0.0);
    }

    #[test]
    fn classifies_opportunities() {
        assert_eq!(opportunity(&ente("x", "SP", "A", 0.2)), Opportunity::Favorable);
        assert_eq!(opportunity(&ente("x", "SP", "A", 0.4)), Opportunity::Neutral);
        assert_eq!(opportunity(&ente("x", "SP", "D", 0.1)), Opportunity::Unfavorable);
        assert_eq!(opportunity(&ente("x", "SP", "B", 1.5)), Opportunity::Unfavorable);
    }

    #[test]
    fn default_filter_keeps_everything_in_range() {
        let entes = vec![ente("A", "SP", "A", 0.1), ente("B", "SP", "C", 12.0)];
        let kept = apply_filter(&entes, &EnteFilter::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "A");
    }

    #[test]
    fn filter_criteria_combine() {
        let entes = vec![
            Ente { tier: Esfera::State, ..ente("Estado", "SP", "B", 0.1) },
            Ente { has_settlement: true, ..ente("Cidade", "SP", "B", 0.1) },
            Ente { thesis_status: ThesisStatus::Approved, ..ente("Outra", "RJ", "B", 0.1) },
        ];

        let filter = EnteFilter {
            tiers: vec![Esfera::Municipal],
            has_settlement: Some(false),
            ..EnteFilter::default()
        };
        let filtered = apply_filter(&entes, &filter);
        let kept: Vec<&str> = filtered.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(kept, vec!["Outra"]);

        let filter = EnteFilter {
            thesis_statuses: vec![ThesisStatus::Undefined],
            grades: vec!["B".to_string()],
            ..EnteFilter::default()
        };
        assert_eq!(apply_filter(&entes, &filter).len(), 2);

        let filter = EnteFilter {
            grades: vec!["b".to_string()],
            ..EnteFilter::default()
        };
        assert!(apply_filter(&entes, &filter).is_empty());
    }

    #[test]
    fn search_matches_name_or_state() {
        let e = ente("São Paulo", "SP", "A", 0.1);
        assert!(matches_search(&e, "paulo"));
        assert!(matches_search(&e, "sp"));
        assert!(matches_search(&e, ""));
        assert!(!matches_search(&e, "rio"));
    }

    #[test]
    fn sorts_descending_by_revenue() {
        let a = Ente { net_revenue_2024: 10.0, ..ente("A", "SP", "A", 0.0) };
        let b = Ente { net_revenue_2024: 30.0, ..ente("B", "SP", "A", 0.0) };
        let c = Ente { net_revenue_2024: 20.0, ..ente("C", "SP", "A", 0.0) };
        let mut refs = vec![&a, &b, &c];

        sort_entes(&mut refs, SortField::Revenue, SortDirection::Desc);
        let names: Vec<&str> = refs.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
    }

    #[test]
    fn summarizes_states() {
        let entes = vec![
            Ente { tier: Esfera::State, precatorio_debt_2024: 100.0, ..ente("Estado de SP", "SP", "B", 0.1) },
            Ente { precatorio_debt_2024: 5.0, ..ente("Santos", "SP", "A", 0.1) },
            Ente { precatorio_debt_2024: 7.0, ..ente("Niterói", "RJ", "C", 0.1) },
        ];

        let summaries = state_summaries(&entes);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].state_code, "RJ");
        assert_eq!(summaries[0].state_grade, None);
        assert_eq!(summaries[1].municipal_count, 1);
        assert_eq!(summaries[1].state_grade.as_deref(), Some("B"));
        assert!((summaries[1].total_precatorio_debt - 105.0).abs() < 1e-9);
    }
}
