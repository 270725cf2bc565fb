use crate::analysis::cells::{to_count, to_text, CellValue};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Year label ("2019".."2024") → amount or count
pub type YearSeries = BTreeMap<String, f64>;

/// Look up a year in a series; missing years read as 0.
pub fn year_value(series: &YearSeries, year: u16) -> f64 {
    series.get(&year.to_string()).copied().unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Esfera {
    #[default]
    #[serde(rename = "M")]
    Municipal,
    #[serde(rename = "E")]
    State,
    #[serde(rename = "D")]
    FederalDistrict,
}

impl Esfera {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Self::Municipal),
            "E" => Some(Self::State),
            "D" => Some(Self::FederalDistrict),
            _ => None,
        }
    }
}

/// Seed files were written without validation, so unknown codes read as
/// municipal the same way the spreadsheet mapper treats them.
impl<'de> Deserialize<'de> for Esfera {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = to_text(&CellValue::deserialize(deserializer)?);
        Ok(Self::from_code(&code).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Regime {
    #[default]
    #[serde(rename = "Ordinário")]
    Ordinary,
    #[serde(rename = "Especial")]
    Special,
}

impl Regime {
    pub fn from_text(text: &str) -> Self {
        if text == "Especial" {
            Self::Special
        } else {
            Self::Ordinary
        }
    }
}

impl<'de> Deserialize<'de> for Regime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_text(&to_text(&CellValue::deserialize(deserializer)?)))
    }
}

/// Counts stored as floats, numeric text or null round to a non-negative integer.
fn loose_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(to_count(&CellValue::deserialize(deserializer)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ThesisStatus {
    #[serde(rename = "APROVADA")]
    Approved,
    #[serde(rename = "REPROVADA")]
    Rejected,
    #[serde(rename = "REVISÃO")]
    UnderReview,
    #[default]
    #[serde(rename = "INDEFINIDO")]
    Undefined,
}

impl ThesisStatus {
    pub fn from_text(text: &str) -> Self {
        match text {
            "APROVADA" => Self::Approved,
            "REPROVADA" => Self::Rejected,
            "REVISÃO" | "REVISAO" => Self::UnderReview,
            _ => Self::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APROVADA",
            Self::Rejected => "REPROVADA",
            Self::UnderReview => "REVISÃO",
            Self::Undefined => "INDEFINIDO",
        }
    }
}

impl<'de> Deserialize<'de> for ThesisStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_text(&to_text(&CellValue::deserialize(deserializer)?)))
    }
}

/// One debtor entity for a fiscal-year snapshot. Serialized with the
/// dashboard's historical JSON keys so exported seed files stay compatible.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ente {
    #[serde(rename = "ente")]
    pub name: String,
    #[serde(rename = "enteSemAcento")]
    pub name_normalized: String,
    #[serde(rename = "esfera")]
    pub tier: Esfera,
    #[serde(rename = "uf")]
    pub state_code: String,
    #[serde(rename = "codigoIBGE")]
    pub ibge_code: String,
    #[serde(rename = "populacao", deserialize_with = "loose_count")]
    pub population: u64,
    pub regime: Regime,

    #[serde(rename = "receitaCorrenteLiquida2024")]
    pub net_revenue_2024: f64,
    #[serde(rename = "dividaConsolidada2024")]
    pub consolidated_debt_2024: f64,

    // CAPAG sub-indices
    #[serde(rename = "indice1Endividamento")]
    pub debt_index: f64,
    #[serde(rename = "indice1Nota")]
    pub debt_index_grade: String,
    #[serde(rename = "indice2PoupancaCorrente")]
    pub savings_index: f64,
    #[serde(rename = "indice2Nota")]
    pub savings_index_grade: String,
    #[serde(rename = "indice3Liquidez")]
    pub liquidity_index: f64,
    #[serde(rename = "indice3Nota")]
    pub liquidity_index_grade: String,
    #[serde(rename = "notaGeralCAPAG2025")]
    pub capag_grade: String,

    // Precatório metrics
    #[serde(rename = "dividaPrecatoriosSICONFI2024")]
    pub precatorio_debt_2024: f64,
    #[serde(rename = "estoquePrecRCL")]
    pub stock_to_revenue: f64,
    #[serde(rename = "estoquePrecDC")]
    pub stock_to_consolidated_debt: f64,
    #[serde(rename = "dividaPrecatoriosSICONFI2025")]
    pub precatorio_debt_2025: f64,
    #[serde(rename = "dividaMapaAnual2024")]
    pub annual_map_debt_2024: f64,
    #[serde(rename = "montanteExpedido2025")]
    pub issued_2025: f64,
    #[serde(rename = "reguaParcelamento2025")]
    pub installment_limit_2025: f64,
    #[serde(rename = "qtdProcessosPendentes", deserialize_with = "loose_count")]
    pub pending_cases: u64,
    /// Raw cell text; may be an Excel serial date such as "45412".
    #[serde(rename = "atualizacao")]
    pub last_update: String,
    #[serde(rename = "fazAcordo")]
    pub has_settlement: bool,
    #[serde(rename = "ticketMedioEstimado")]
    pub average_ticket: f64,

    #[serde(rename = "historicoRCL")]
    pub revenue_history: YearSeries,
    #[serde(rename = "historicoDC")]
    pub consolidated_debt_history: YearSeries,
    #[serde(rename = "historicoPagamentos")]
    pub payment_history: YearSeries,
    #[serde(rename = "historicoExpedicoes")]
    pub issued_history: YearSeries,
    #[serde(rename = "limitesParcelamento")]
    pub installment_limits: YearSeries,
    #[serde(rename = "dividasMapaAnual")]
    pub annual_map_debt: YearSeries,

    // Settlement notice
    #[serde(rename = "ultimoEdital")]
    pub last_notice: String,
    #[serde(rename = "linkEdital")]
    pub notice_link: String,
    #[serde(rename = "desagio")]
    pub discount: String,
    #[serde(rename = "criterio")]
    pub criteria: String,
    #[serde(rename = "dataInicio")]
    pub notice_start: String,
    #[serde(rename = "dataFechamento")]
    pub notice_close: String,
    #[serde(rename = "valorDestinado")]
    pub amount_allocated: f64,

    #[serde(rename = "statusTeses")]
    pub thesis_status: ThesisStatus,
}
