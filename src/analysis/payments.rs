use crate::models::ente::{year_value, Ente};
use crate::models::projection::{
    FinancialYear, PaymentHistorySummary, PaymentYear, PriorRevenueShare,
};

pub const HISTORY_YEARS: [u16; 6] = [2019, 2020, 2021, 2022, 2023, 2024];

/// Paid vs issued per year, averaged over the years that carry any data.
pub fn payment_history(ente: &Ente) -> PaymentHistorySummary {
    let years: Vec<PaymentYear> = HISTORY_YEARS
        .iter()
        .map(|&year| {
            let paid = year_value(&ente.payment_history, year);
            let issued = year_value(&ente.issued_history, year);
            let paid_to_issued_pct = if issued != 0.0 {
                paid / issued * 100.0
            } else {
                0.0
            };
            PaymentYear {
                year,
                paid,
                issued,
                paid_to_issued_pct,
            }
        })
        .collect();

    let with_data: Vec<&PaymentYear> = years
        .iter()
        .filter(|y| y.paid > 0.0 || y.issued > 0.0)
        .collect();

    let average = |f: fn(&PaymentYear) -> f64| {
        if with_data.is_empty() {
            0.0
        } else {
            with_data.iter().map(|&y| f(y)).sum::<f64>() / with_data.len() as f64
        }
    };

    PaymentHistorySummary {
        average_paid: average(|y| y.paid),
        average_issued: average(|y| y.issued),
        average_paid_to_issued_pct: average(|y| y.paid_to_issued_pct),
        years,
    }
}

/// Amount paid in a year against the previous year's net revenue (2020..2024).
pub fn prior_revenue_shares(ente: &Ente) -> Vec<PriorRevenueShare> {
    (2020..=2024u16)
        .map(|year| {
            let paid = year_value(&ente.payment_history, year);
            let prior_revenue = year_value(&ente.revenue_history, year - 1);
            let share_pct = if prior_revenue > 0.0 {
                paid / prior_revenue * 100.0
            } else {
                0.0
            };
            PriorRevenueShare {
                year,
                paid,
                prior_revenue,
                share_pct,
            }
        })
        .collect()
}

/// Revenue, map debt and consolidated debt for 2019..2024. The 2024 point
/// comes from the current-year fields.
pub fn financial_history(ente: &Ente) -> Vec<FinancialYear> {
    HISTORY_YEARS
        .iter()
        .map(|&year| {
            if year == 2024 {
                FinancialYear {
                    year,
                    revenue: ente.net_revenue_2024,
                    map_debt: ente.annual_map_debt_2024,
                    consolidated_debt: ente.consolidated_debt_2024,
                }
            } else {
                FinancialYear {
                    year,
                    revenue: year_value(&ente.revenue_history, year),
                    map_debt: year_value(&ente.annual_map_debt, year),
                    consolidated_debt: year_value(&ente.consolidated_debt_history, year),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_payments(paid: &[(u16, f64)], issued: &[(u16, f64)]) -> Ente {
        let mut ente = Ente::default();
        for (year, v) in paid {
            ente.payment_history.insert(year.to_string(), *v);
        }
        for (year, v) in issued {
            ente.issued_history.insert(year.to_string(), *v);
        }
        ente
    }

    #[test]
    fn averages_only_years_with_data() {
        let ente = with_payments(&[(2022, 300.0), (2023, 100.0)], &[(2022, 200.0), (2023, 100.0)]);
        let summary = payment_history(&ente);

        assert_eq!(summary.years.len(), 6);
        assert!((summary.average_paid - 200.0).abs() < 1e-9);
        assert!((summary.average_issued - 150.0).abs() < 1e-9);
        // (150% + 100%) / 2
        assert!((summary.average_paid_to_issued_pct - 125.0).abs() < 1e-9);
    }

    #[test]
    fn payment_without_issuance_counts_as_zero_ratio() {
        let ente = with_payments(&[(2021, 500.0), (2022, 100.0)], &[(2022, 50.0)]);
        let summary = payment_history(&ente);

        // 2021 contributes 0%, 2022 contributes 200%
        assert!((summary.average_paid_to_issued_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_history_yields_zero_averages() {
        let summary = payment_history(&Ente::default());
        assert_eq!(summary.average_paid, 0.0);
        assert_eq!(summary.average_paid_to_issued_pct, 0.0);
    }

    #[test]
    fn prior_revenue_share_uses_previous_year() {
        let mut ente = with_payments(&[(2021, 50.0)], &[]);
        ente.revenue_history.insert("2020".to_string(), 1000.0);

        let shares = prior_revenue_shares(&ente);
        let y2021 = shares.iter().find(|s| s.year == 2021).expect("2021 entry");
        assert!((y2021.share_pct - 5.0).abs() < 1e-9);
        assert_eq!(shares.len(), 5);
    }

    #[test]
    fn financial_history_reads_current_year_fields_for_2024() {
        let ente = Ente {
            net_revenue_2024: 10.0,
            annual_map_debt_2024: 2.0,
            consolidated_debt_2024: 3.0,
            ..Ente::default()
        };
        let last = financial_history(&ente).pop().expect("2024 point");
        assert_eq!((last.year, last.revenue, last.map_debt, last.consolidated_debt), (2024, 10.0, 2.0, 3.0));
    }
}
