use std::collections::BTreeMap;

use serde::Serialize;

/// One spreadsheet row: a year of sales activity for one area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRecord {
    pub year: i32,
    pub area: String,
    /// Weighted average rate in rupees per square foot.
    pub rate: f64,
    pub units_sold: f64,
    pub total_units: f64,
}

/// Single-area chart payload: years ascending, one rate per year.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PriceTrend {
    pub years: Vec<String>,
    pub values: Vec<f64>,
}

/// Multi-area chart payload. `years` is the sorted union across the compared
/// areas; each series is aligned to it, with `None` where an area has no row
/// for that year.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonTrend {
    pub years: Vec<String>,
    pub areas: BTreeMap<String, Vec<Option<f64>>>,
}

/// Analysis result, discriminated by the `type` tag. Single mode covers zero
/// or one detected areas; comparison mode covers two or more.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnalysisResponse {
    Single {
        area: String,
        summary: String,
        chart: PriceTrend,
        table: Vec<SaleRecord>,
    },
    Comparison {
        areas: Vec<String>,
        summary: String,
        chart: ComparisonTrend,
        tables: BTreeMap<String, Vec<SaleRecord>>,
    },
}
