use crate::analysis::payments::payment_history;
use crate::models::ente::{year_value, Ente};
use crate::models::projection::{ProjectedYear, ProjectionReport};

/// Only 75% of the historical revenue growth is carried forward.
pub const GROWTH_CONSERVATISM: f64 = 0.75;
/// Only 90% of the historical revenue share is assumed to keep going to precatórios.
pub const PAYMENT_PRIORITIZATION: f64 = 0.90;
/// Entities running settlement agreements are assumed to pay half.
pub const SETTLEMENT_PAYMENT_FACTOR: f64 = 0.5;

pub const FIRST_PROJECTED_YEAR: u16 = 2025;
pub const PROJECTED_YEARS: u16 = 5;

/// Projects revenue, payments and payoff estimates for one entity.
pub fn project(ente: &Ente) -> ProjectionReport {
    let revenue_growth_rate = revenue_growth_rate(ente);
    let revenue_shares = revenue_shares(ente);
    let revenue_share = if revenue_shares.is_empty() {
        0.0
    } else {
        mean(&revenue_shares) * PAYMENT_PRIORITIZATION
    };

    let mut projection = Vec::with_capacity(PROJECTED_YEARS as usize);
    let mut revenue = ente.net_revenue_2024;
    for year in FIRST_PROJECTED_YEAR..FIRST_PROJECTED_YEAR + PROJECTED_YEARS {
        revenue *= 1.0 + revenue_growth_rate;
        let mut payment = revenue * revenue_share;
        if ente.has_settlement {
            payment *= SETTLEMENT_PAYMENT_FACTOR;
        }
        projection.push(ProjectedYear {
            year,
            revenue,
            payment,
        });
    }

    let payments: Vec<f64> = projection.iter().map(|p| p.payment).collect();
    let annual_average_payment = mean(&payments);

    // Payment as a fraction of the outstanding stock, not years to zero
    // balance. Downstream screens label it "payoff time", so the ratio is
    // kept until the business owners settle which one they want.
    let payoff_years = if ente.precatorio_debt_2024 > 0.0 {
        annual_average_payment / ente.precatorio_debt_2024
    } else {
        0.0
    };

    let annual_case_closures = if ente.average_ticket > 0.0 {
        annual_average_payment / ente.average_ticket
    } else {
        0.0
    };

    ProjectionReport {
        revenue_growth_rate,
        revenue_share,
        revenue_shares,
        projection,
        annual_average_payment,
        payoff_years,
        payoff_months: payoff_years * 12.0,
        annual_case_closures,
        payment_history: payment_history(ente),
    }
}

/// Average year-over-year growth of the positive revenue values 2019..2024,
/// scaled by `GROWTH_CONSERVATISM`. Gaps are skipped, so a pair may span
/// more than one calendar year.
pub fn revenue_growth_rate(ente: &Ente) -> f64 {
    let values: Vec<f64> = (2019..=2023u16)
        .map(|year| year_value(&ente.revenue_history, year))
        .chain(std::iter::once(ente.net_revenue_2024))
        .filter(|v| *v > 0.0)
        .collect();

    if values.len() < 2 {
        return 0.0;
    }

    let growths: Vec<f64> = values
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();

    mean(&growths) * GROWTH_CONSERVATISM
}

/// payment[y] / revenue[y - 1] for y in 2020..=2024, zeros dropped.
pub fn revenue_shares(ente: &Ente) -> Vec<f64> {
    (2020..=2024u16)
        .map(|year| {
            let prior_revenue = year_value(&ente.revenue_history, year - 1);
            if prior_revenue > 0.0 {
                year_value(&ente.payment_history, year) / prior_revenue
            } else {
                0.0
            }
        })
        .filter(|share| *share > 0.0)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
