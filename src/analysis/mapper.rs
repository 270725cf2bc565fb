use crate::analysis::cells::{cell, to_count, to_flag, to_number, to_text, to_text_or, CellValue};
use crate::models::ente::{Ente, Esfera, Regime, ThesisStatus, YearSeries};
use crate::models::import::{DroppedRow, RowExclusion};

/// Version of the positional column layout below. Bump when the
/// spreadsheet contract changes.
pub const COLUMN_SCHEMA_VERSION: u32 = 1;

/// Number of columns the layout reads (0..=66).
pub const EXPECTED_COLUMN_COUNT: usize = 67;

/// Zero-based column indices of the entity spreadsheet.
pub mod col {
    pub const NAME: usize = 0;
    pub const NAME_NORMALIZED: usize = 1;
    pub const TIER: usize = 2;
    pub const STATE_CODE: usize = 3;
    pub const IBGE_CODE: usize = 4;
    pub const POPULATION: usize = 5;
    pub const REGIME: usize = 6;
    pub const NET_REVENUE_2024: usize = 7;
    pub const CONSOLIDATED_DEBT_2024: usize = 8;
    pub const DEBT_INDEX: usize = 9;
    pub const DEBT_INDEX_GRADE: usize = 10;
    pub const SAVINGS_INDEX: usize = 11;
    pub const SAVINGS_INDEX_GRADE: usize = 12;
    pub const LIQUIDITY_INDEX: usize = 13;
    pub const LIQUIDITY_INDEX_GRADE: usize = 14;
    pub const CAPAG_GRADE: usize = 15;
    pub const PRECATORIO_DEBT_2024: usize = 16;
    pub const STOCK_TO_REVENUE: usize = 17;
    pub const STOCK_TO_CONSOLIDATED_DEBT: usize = 18;
    pub const PRECATORIO_DEBT_2025: usize = 19;
    pub const ANNUAL_MAP_DEBT_2024: usize = 20;
    pub const ISSUED_2025: usize = 21;
    pub const INSTALLMENT_LIMIT_2025: usize = 22;
    pub const PENDING_CASES: usize = 23;
    pub const LAST_UPDATE: usize = 24;
    pub const HAS_SETTLEMENT: usize = 25;
    pub const AVERAGE_TICKET: usize = 26;
    pub const LAST_NOTICE: usize = 54;
    pub const NOTICE_LINK: usize = 55;
    pub const DISCOUNT: usize = 56;
    pub const CRITERIA: usize = 57;
    pub const NOTICE_START: usize = 58;
    pub const NOTICE_CLOSE: usize = 59;
    pub const AMOUNT_ALLOCATED: usize = 60;
    pub const THESIS_STATUS: usize = 66;
}

/// (year label, column) pairs for each time series.
pub const REVENUE_HISTORY: [(&str, usize); 5] =
    [("2023", 27), ("2022", 29), ("2021", 31), ("2020", 33), ("2019", 35)];

pub const CONSOLIDATED_DEBT_HISTORY: [(&str, usize); 5] =
    [("2023", 28), ("2022", 30), ("2021", 32), ("2020", 34), ("2019", 36)];

pub const PAYMENT_HISTORY: [(&str, usize); 6] = [
    ("2024", 37),
    ("2023", 38),
    ("2022", 39),
    ("2021", 40),
    ("2020", 41),
    ("2019", 42),
];

// NOTE: "2024" reads column 21, the same cell as `issued_2025`. The sheet
// has no separate 2024 issued column; kept as-is until the sheet owners
// confirm which figure belongs here.
pub const ISSUED_HISTORY: [(&str, usize); 6] = [
    ("2019", 61),
    ("2020", 62),
    ("2021", 63),
    ("2022", 64),
    ("2023", 65),
    ("2024", col::ISSUED_2025),
];

pub const INSTALLMENT_LIMITS: [(&str, usize); 5] =
    [("2024", 43), ("2023", 44), ("2022", 45), ("2021", 46), ("2020", 47)];

pub const ANNUAL_MAP_DEBT: [(&str, usize); 6] = [
    ("2024", 48),
    ("2023", 49),
    ("2022", 50),
    ("2021", 51),
    ("2020", 52),
    ("2019", 53),
];

pub struct MappingOutcome {
    pub entes: Vec<Ente>,
    pub dropped: Vec<DroppedRow>,
}

/// Map header-less rows to records, dropping blank and summary rows.
pub fn map_rows(rows: &[Vec<CellValue>]) -> Vec<Ente> {
    map_rows_with_report(rows).entes
}

pub fn map_rows_with_report(rows: &[Vec<CellValue>]) -> MappingOutcome {
    let mut entes = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match classify_row(row) {
            Some(reason) => dropped.push(DroppedRow {
                index,
                first_cell: to_text(cell(row, col::NAME)),
                reason,
            }),
            None => entes.push(map_row(row)),
        }
    }

    MappingOutcome { entes, dropped }
}

/// Returns the exclusion reason for a row, or None when it holds an entity.
pub fn classify_row(row: &[CellValue]) -> Option<RowExclusion> {
    let first = cell(row, col::NAME);
    if row.is_empty() || first.is_falsy() {
        return Some(RowExclusion::Blank);
    }

    let name = to_text(first);
    if name.is_empty() {
        return Some(RowExclusion::Blank);
    }

    let lowered = name.to_lowercase();
    if lowered == "ente" {
        return Some(RowExclusion::RepeatedHeader);
    }
    if lowered.contains("total") {
        return Some(RowExclusion::TotalRow);
    }
    if lowered.contains("soma") {
        return Some(RowExclusion::SumRow);
    }

    None
}

fn map_row(row: &[CellValue]) -> Ente {
    let num = |index: usize| to_number(cell(row, index));
    let text = |index: usize| to_text(cell(row, index));

    let tier_code = to_text_or(cell(row, col::TIER), "M");
    let tier = Esfera::from_code(&tier_code).unwrap_or_else(|| {
        log::warn!(
            "Unknown tier {tier_code:?} for {:?}; treating as municipal",
            text(col::NAME)
        );
        Esfera::Municipal
    });

    Ente {
        name: text(col::NAME),
        name_normalized: text(col::NAME_NORMALIZED),
        tier,
        state_code: text(col::STATE_CODE),
        ibge_code: text(col::IBGE_CODE),
        population: to_count(cell(row, col::POPULATION)),
        regime: Regime::from_text(&to_text_or(cell(row, col::REGIME), "Ordinário")),

        net_revenue_2024: num(col::NET_REVENUE_2024),
        consolidated_debt_2024: num(col::CONSOLIDATED_DEBT_2024),

        debt_index: num(col::DEBT_INDEX),
        debt_index_grade: text(col::DEBT_INDEX_GRADE),
        savings_index: num(col::SAVINGS_INDEX),
        savings_index_grade: text(col::SAVINGS_INDEX_GRADE),
        liquidity_index: num(col::LIQUIDITY_INDEX),
        liquidity_index_grade: text(col::LIQUIDITY_INDEX_GRADE),
        capag_grade: text(col::CAPAG_GRADE),

        precatorio_debt_2024: num(col::PRECATORIO_DEBT_2024),
        stock_to_revenue: num(col::STOCK_TO_REVENUE),
        stock_to_consolidated_debt: num(col::STOCK_TO_CONSOLIDATED_DEBT),
        precatorio_debt_2025: num(col::PRECATORIO_DEBT_2025),
        annual_map_debt_2024: num(col::ANNUAL_MAP_DEBT_2024),
        issued_2025: num(col::ISSUED_2025),
        installment_limit_2025: num(col::INSTALLMENT_LIMIT_2025),
        pending_cases: to_count(cell(row, col::PENDING_CASES)),
        last_update: text(col::LAST_UPDATE),
        has_settlement: to_flag(cell(row, col::HAS_SETTLEMENT)),
        average_ticket: num(col::AVERAGE_TICKET),

        revenue_history: series(row, &REVENUE_HISTORY),
        consolidated_debt_history: series(row, &CONSOLIDATED_DEBT_HISTORY),
        payment_history: series(row, &PAYMENT_HISTORY),
        issued_history: series(row, &ISSUED_HISTORY),
        installment_limits: series(row, &INSTALLMENT_LIMITS),
        annual_map_debt: series(row, &ANNUAL_MAP_DEBT),

        last_notice: text(col::LAST_NOTICE),
        notice_link: text(col::NOTICE_LINK),
        discount: text(col::DISCOUNT),
        criteria: text(col::CRITERIA),
        notice_start: text(col::NOTICE_START),
        notice_close: text(col::NOTICE_CLOSE),
        amount_allocated: num(col::AMOUNT_ALLOCATED),

        thesis_status: ThesisStatus::from_text(&text(col::THESIS_STATUS)),
    }
}

fn series(row: &[CellValue], columns: &[(&str, usize)]) -> YearSeries {
    columns
        .iter()
        .map(|(year, index)| (year.to_string(), to_number(cell(row, *index))))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::ente::year_value;

    pub(crate) fn sample_row() -> Vec<CellValue> {
        let mut row = vec![CellValue::Empty; EXPECTED_COLUMN_COUNT];
        row[0] = "Município X".into();
        row[1] = "Municipio X".into();
        row[2] = "M".into();
        row[3] = "SP".into();
        row[4] = "3550308".into();
        row[5] = "500000".into();
        row[6] = "Ordinário".into();
        row[7] = "1000000".into();
        row[8] = "200000".into();
        row[15] = "A".into();
        row[16] = "50000".into();
        row[21] = 7000.0.into();
        row[25] = "Sim".into();
        row[26] = "10000".into();
        row[27] = 900000.0.into();
        row[29] = 800000.0.into();
        row[31] = 700000.0.into();
        row[33] = 600000.0.into();
        row[35] = 500000.0.into();
        row
    }

    #[test]
    fn maps_fixed_columns_into_record() {
        let ente = map_row(&sample_row());

        assert_eq!(ente.name, "Município X");
        assert_eq!(ente.name_normalized, "Municipio X");
        assert_eq!(ente.tier, Esfera::Municipal);
        assert_eq!(ente.state_code, "SP");
        assert_eq!(ente.ibge_code, "3550308");
        assert_eq!(ente.population, 500_000);
        assert_eq!(ente.regime, Regime::Ordinary);
        assert_eq!(ente.net_revenue_2024, 1_000_000.0);
        assert_eq!(ente.capag_grade, "A");
        assert_eq!(ente.precatorio_debt_2024, 50_000.0);
        assert!(ente.has_settlement);
        assert_eq!(ente.average_ticket, 10_000.0);
        assert_eq!(year_value(&ente.revenue_history, 2023), 900_000.0);
        assert_eq!(year_value(&ente.revenue_history, 2019), 500_000.0);
        assert_eq!(ente.thesis_status, ThesisStatus::Undefined);
    }

    #[test]
    fn issued_2024_shares_the_issued_2025_column() {
        let ente = map_row(&sample_row());
        assert_eq!(year_value(&ente.issued_history, 2024), 7000.0);
        assert_eq!(ente.issued_2025, 7000.0);
    }

    #[test]
    fn short_rows_default_every_missing_field() {
        let row = vec![CellValue::from("Estado Z")];
        let ente = map_row(&row);

        assert_eq!(ente.tier, Esfera::Municipal);
        assert_eq!(ente.regime, Regime::Ordinary);
        assert_eq!(ente.ibge_code, "");
        assert_eq!(ente.net_revenue_2024, 0.0);
        assert!(!ente.has_settlement);
        assert_eq!(ente.payment_history.len(), 6);
        assert!(ente.payment_history.values().all(|v| *v == 0.0));
    }

    #[test]
    fn numeric_ibge_code_becomes_plain_text() {
        let mut row = sample_row();
        row[4] = 3304557.0.into();
        assert_eq!(map_row(&row).ibge_code, "3304557");
    }

    #[test]
    fn parses_tier_regime_and_status_codes() {
        let mut row = sample_row();
        row[2] = "E".into();
        row[6] = "Especial".into();
        row[66] = " REPROVADA ".into();
        let ente = map_row(&row);

        assert_eq!(ente.tier, Esfera::State);
        assert_eq!(ente.regime, Regime::Special);
        assert_eq!(ente.thesis_status, ThesisStatus::Rejected);
    }

    #[test]
    fn exclusion_policy_drops_blank_header_and_summary_rows() {
        let rows = vec![
            sample_row(),
            vec![],
            vec![CellValue::from("   ")],
            vec![CellValue::from(" Ente ")],
            vec![CellValue::from("TOTAL GERAL"), CellValue::from(1.0)],
            vec![CellValue::from("Soma dos municípios")],
            vec![CellValue::Number(0.0)],
            sample_row(),
        ];

        let outcome = map_rows_with_report(&rows);
        assert_eq!(outcome.entes.len(), 2);

        let reasons: Vec<(usize, RowExclusion)> =
            outcome.dropped.iter().map(|d| (d.index, d.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (1, RowExclusion::Blank),
                (2, RowExclusion::Blank),
                (3, RowExclusion::RepeatedHeader),
                (4, RowExclusion::TotalRow),
                (5, RowExclusion::SumRow),
                (6, RowExclusion::Blank),
            ]
        );
    }

    #[test]
    fn names_containing_entes_are_kept() {
        let mut row = sample_row();
        row[0] = "Entre Rios".into();
        assert!(classify_row(&row).is_none());
    }

    #[test]
    fn mapping_is_idempotent() {
        let rows = vec![sample_row(), vec![CellValue::from("Total")], sample_row()];
        assert_eq!(map_rows(&rows), map_rows(&rows));
    }
}
