use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AnalysisResponse, ComparisonTrend, PriceTrend, SaleRecord};
use crate::services::dataset::Dataset;
use crate::services::summary::{group_thousands, Summarizer};

/// Dispersion of rates relative to their mean, in three bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volatility {
    Stable,
    Moderate,
    Volatile,
}

impl Volatility {
    pub fn classify(pct: f64) -> Self {
        if pct < 10.0 {
            Volatility::Stable
        } else if pct < 20.0 {
            Volatility::Moderate
        } else {
            Volatility::Volatile
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Volatility::Stable => "stable",
            Volatility::Moderate => "moderate",
            Volatility::Volatile => "volatile",
        }
    }
}

/// Aggregates over one area's rows. Pure function of the row set.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaStats {
    pub start_year: i32,
    pub end_year: i32,
    pub mean_rate: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub total_units_sold: f64,
    pub total_units: f64,
    /// First-to-last percentage change in rate, by year order.
    pub rate_change_pct: f64,
    /// First-to-last percentage change in units sold, by year order.
    pub sales_change_pct: f64,
    /// Sample standard deviation of rate over its mean, as a percentage.
    pub volatility_pct: f64,
}

impl AreaStats {
    /// Rows must already be in year order, as `Dataset::rows_for_area`
    /// returns them. Returns `None` for an empty selection.
    pub fn compute(rows: &[SaleRecord]) -> Option<Self> {
        let first = rows.first()?;
        let last = rows.last()?;
        let n = rows.len() as f64;

        let mean_rate = rows.iter().map(|r| r.rate).sum::<f64>() / n;
        let min_rate = rows.iter().map(|r| r.rate).fold(f64::INFINITY, f64::min);
        let max_rate = rows.iter().map(|r| r.rate).fold(f64::NEG_INFINITY, f64::max);

        let volatility_pct = if rows.len() > 1 && mean_rate > 0.0 {
            let variance = rows
                .iter()
                .map(|r| (r.rate - mean_rate).powi(2))
                .sum::<f64>()
                / (n - 1.0);
            variance.sqrt() / mean_rate * 100.0
        } else {
            0.0
        };

        Some(AreaStats {
            start_year: first.year,
            end_year: last.year,
            mean_rate,
            min_rate,
            max_rate,
            total_units_sold: rows.iter().map(|r| r.units_sold).sum(),
            total_units: rows.iter().map(|r| r.total_units).sum(),
            rate_change_pct: pct_change(first.rate, last.rate),
            sales_change_pct: pct_change(first.units_sold, last.units_sold),
            volatility_pct,
        })
    }

    pub fn volatility(&self) -> Volatility {
        Volatility::classify(self.volatility_pct)
    }
}

fn pct_change(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        0.0
    } else {
        (last - first) / first * 100.0
    }
}

/// Single-mode chart series: years ascending with the matching rates.
pub fn price_trend(rows: &[SaleRecord]) -> PriceTrend {
    PriceTrend {
        years: rows.iter().map(|r| r.year.to_string()).collect(),
        values: rows.iter().map(|r| r.rate).collect(),
    }
}

/// Comparison chart keyed by the union of years across the areas, with one
/// rate series per area aligned to that union.
pub fn comparison_trend(dataset: &Dataset, areas: &[String]) -> ComparisonTrend {
    let per_area: Vec<(String, Vec<SaleRecord>)> = areas
        .iter()
        .map(|area| (area.clone(), dataset.rows_for_area(area)))
        .collect();

    let years: BTreeSet<i32> = per_area
        .iter()
        .flat_map(|(_, rows)| rows.iter().map(|r| r.year))
        .collect();

    let mut series = BTreeMap::new();
    for (area, rows) in &per_area {
        if rows.is_empty() {
            continue;
        }
        let values = years
            .iter()
            .map(|year| rows.iter().find(|r| r.year == *year).map(|r| r.rate))
            .collect();
        series.insert(area.clone(), values);
    }

    ComparisonTrend {
        years: years.into_iter().map(|y| y.to_string()).collect(),
        areas: series,
    }
}

/// One line per area with its average rate, pipe-joined. Comparison mode
/// never calls the remote summary.
pub fn comparison_summary(dataset: &Dataset, areas: &[String]) -> String {
    let parts: Vec<String> = areas
        .iter()
        .filter_map(|area| {
            let rows = dataset.rows_for_area(area);
            AreaStats::compute(&rows)
                .map(|stats| format!("{}: ₹{}/sqft", area, group_thousands(stats.mean_rate)))
        })
        .collect();

    if parts.is_empty() {
        "No data found for comparison.".to_string()
    } else {
        parts.join(" | ")
    }
}

/// Full pipeline for one query: area detection, then either a single-area
/// analysis (remote summary with fallback) or a side-by-side comparison.
pub async fn analyze_query(
    dataset: &Dataset,
    summarizer: &Summarizer,
    message: &str,
) -> AnalysisResponse {
    let detected = dataset.detect_areas(message);

    // A "compare ..." query still needs two detected areas, so a single
    // check on the detection count covers both comparison triggers.
    if detected.len() > 1 {
        let mut tables = BTreeMap::new();
        for area in &detected {
            tables.insert(area.clone(), dataset.rows_for_area(area));
        }

        AnalysisResponse::Comparison {
            summary: comparison_summary(dataset, &detected),
            chart: comparison_trend(dataset, &detected),
            tables,
            areas: detected,
        }
    } else {
        let area = detected.into_iter().next().unwrap_or_default();
        let rows = dataset.rows_for_area(&area);
        let summary = summarizer.summarize(&area, &rows).await;

        AnalysisResponse::Single {
            area,
            summary,
            chart: price_trend(&rows),
            table: rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::summary::analytical_summary;

    fn akurdi_rows() -> Vec<SaleRecord> {
        Dataset::sample().rows_for_area("Akurdi")
    }

    #[test]
    fn stats_over_akurdi_sample() {
        let stats = AreaStats::compute(&akurdi_rows()).unwrap();
        assert_eq!(stats.start_year, 2020);
        assert_eq!(stats.end_year, 2024);
        assert!((stats.mean_rate - 40.8).abs() < 1e-9);
        assert_eq!(stats.min_rate, 35.0);
        assert_eq!(stats.max_rate, 48.0);
        assert_eq!(stats.total_units_sold, 400.0);
        assert!((stats.rate_change_pct - 37.142857142857146).abs() < 1e-9);
        assert!((stats.sales_change_pct - 13.333333333333334).abs() < 1e-9);
        assert_eq!(stats.volatility(), Volatility::Moderate);
    }

    #[test]
    fn stats_are_deterministic() {
        let rows = akurdi_rows();
        assert_eq!(AreaStats::compute(&rows), AreaStats::compute(&rows));
    }

    #[test]
    fn stats_on_empty_selection_is_none() {
        assert!(AreaStats::compute(&[]).is_none());
    }

    #[test]
    fn single_row_has_no_trend_or_volatility() {
        let rows = vec![SaleRecord {
            year: 2024,
            area: "Wakad".to_string(),
            rate: 65.0,
            units_sold: 95.0,
            total_units: 1500.0,
        }];
        let stats = AreaStats::compute(&rows).unwrap();
        assert_eq!(stats.rate_change_pct, 0.0);
        assert_eq!(stats.sales_change_pct, 0.0);
        assert_eq!(stats.volatility_pct, 0.0);
        assert_eq!(stats.volatility(), Volatility::Stable);
    }

    #[test]
    fn volatility_band_edges() {
        assert_eq!(Volatility::classify(0.0), Volatility::Stable);
        assert_eq!(Volatility::classify(9.99), Volatility::Stable);
        assert_eq!(Volatility::classify(10.0), Volatility::Moderate);
        assert_eq!(Volatility::classify(19.99), Volatility::Moderate);
        assert_eq!(Volatility::classify(20.0), Volatility::Volatile);
    }

    #[test]
    fn price_trend_matches_akurdi_example() {
        let trend = price_trend(&akurdi_rows());
        assert_eq!(trend.years, ["2020", "2021", "2022", "2023", "2024"]);
        assert_eq!(trend.values, [35.0, 37.0, 40.0, 44.0, 48.0]);
    }

    #[test]
    fn comparison_trend_aligns_series_to_year_union() {
        let dataset = Dataset::sample();
        let areas = vec!["Wakad".to_string(), "Akurdi".to_string()];
        let trend = comparison_trend(&dataset, &areas);

        assert_eq!(trend.years, ["2020", "2021", "2022", "2023", "2024"]);
        assert_eq!(trend.areas.len(), 2);
        let wakad = &trend.areas["Wakad"];
        assert_eq!(wakad.len(), trend.years.len());
        assert_eq!(wakad[0], Some(45.0));
        assert_eq!(trend.areas["Akurdi"][4], Some(48.0));
    }

    #[test]
    fn comparison_series_have_gaps_for_missing_years() {
        let row = |area: &str, year: i32, rate: f64| SaleRecord {
            year,
            area: area.to_string(),
            rate,
            units_sold: 60.0,
            total_units: 900.0,
        };
        let dataset = Dataset::from_records(vec![
            row("Ravet", 2020, 40.0),
            row("Ravet", 2021, 42.0),
            row("Ravet", 2022, 45.0),
            row("Moshi", 2022, 30.0),
            row("Moshi", 2023, 33.0),
            row("Moshi", 2024, 36.0),
        ]);

        let areas = vec!["Ravet".to_string(), "Moshi".to_string()];
        let trend = comparison_trend(&dataset, &areas);

        assert_eq!(trend.years, ["2020", "2021", "2022", "2023", "2024"]);
        assert_eq!(
            trend.areas["Ravet"],
            [Some(40.0), Some(42.0), Some(45.0), None, None]
        );
        assert_eq!(
            trend.areas["Moshi"],
            [None, None, Some(30.0), Some(33.0), Some(36.0)]
        );
    }

    #[test]
    fn comparison_summary_is_pipe_joined() {
        let dataset = Dataset::sample();
        let areas = vec!["Wakad".to_string(), "Akurdi".to_string()];
        let summary = comparison_summary(&dataset, &areas);
        assert_eq!(summary, "Wakad: ₹54/sqft | Akurdi: ₹41/sqft");
    }

    #[tokio::test]
    async fn analyze_single_area_uses_fallback_summary_without_credential() {
        let dataset = Dataset::sample();
        let summarizer = Summarizer::new(None);

        match analyze_query(&dataset, &summarizer, "Analyze Akurdi").await {
            AnalysisResponse::Single {
                area,
                summary,
                chart,
                table,
            } => {
                assert_eq!(area, "Akurdi");
                assert_eq!(summary, analytical_summary("Akurdi", &akurdi_rows()));
                assert_eq!(chart.values, [35.0, 37.0, 40.0, 44.0, 48.0]);
                assert_eq!(table.len(), 5);
            }
            other => panic!("expected single mode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn analyze_unknown_area_yields_no_data_result() {
        let dataset = Dataset::sample();
        let summarizer = Summarizer::new(None);

        match analyze_query(&dataset, &summarizer, "what about the moon?").await {
            AnalysisResponse::Single {
                area,
                summary,
                chart,
                table,
            } => {
                assert_eq!(area, "");
                assert_eq!(summary, "No data available.");
                assert!(chart.years.is_empty());
                assert!(chart.values.is_empty());
                assert!(table.is_empty());
            }
            other => panic!("expected single mode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn analyze_two_areas_yields_comparison_mode() {
        let dataset = Dataset::sample();
        let summarizer = Summarizer::new(None);

        match analyze_query(&dataset, &summarizer, "Compare Wakad and Akurdi").await {
            AnalysisResponse::Comparison {
                areas,
                summary,
                chart,
                tables,
            } => {
                assert_eq!(areas, ["Wakad", "Akurdi"]);
                assert!(summary.contains(" | "));
                assert_eq!(chart.areas.len(), 2);
                assert_eq!(tables.len(), 2);
                assert_eq!(tables["Wakad"].len(), 5);
                assert_eq!(tables["Akurdi"].len(), 5);
            }
            other => panic!("expected comparison mode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn compare_wording_with_one_area_stays_single_mode() {
        let dataset = Dataset::sample();
        let summarizer = Summarizer::new(None);

        match analyze_query(&dataset, &summarizer, "compare Wakad against itself").await {
            AnalysisResponse::Single { area, .. } => assert_eq!(area, "Wakad"),
            other => panic!("expected single mode, got {:?}", other),
        }
    }
}
