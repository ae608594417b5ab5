use calamine::{open_workbook, Data, Reader, Xlsx};

use crate::models::SaleRecord;

// Column names are the contract with the data provider.
const COL_YEAR: &str = "year";
const COL_AREA: &str = "final location";
const COL_RATE: &str = "flat - weighted average rate";
const COL_UNITS_SOLD: &str = "flat_sold - igr";
const COL_TOTAL_UNITS: &str = "total units";

/// The in-memory table. Loaded once at startup and read-only afterwards, so
/// request handlers share it behind an `Arc` without coordination.
#[derive(Debug)]
pub struct Dataset {
    records: Vec<SaleRecord>,
    /// Distinct area names in first-appearance order. Detection results are
    /// ordered by this enumeration, not by query order.
    areas: Vec<String>,
}

impl Dataset {
    /// Load the spreadsheet at `path`. Any failure (missing file, unreadable
    /// workbook, missing columns) logs and substitutes the built-in sample
    /// table; the loader never returns an error.
    pub fn load(path: &str) -> Self {
        match Self::read_workbook(path) {
            Ok(records) if !records.is_empty() => {
                tracing::info!("Data loaded successfully. Rows: {}", records.len());
                Self::from_records(records)
            }
            Ok(_) => {
                tracing::warn!("Spreadsheet at {} has no data rows, using sample data", path);
                Self::sample()
            }
            Err(e) => {
                tracing::warn!("Failed to load spreadsheet at {}: {}. Using sample data", path, e);
                Self::sample()
            }
        }
    }

    fn read_workbook(path: &str) -> Result<Vec<SaleRecord>, String> {
        let mut workbook: Xlsx<_> =
            open_workbook(path).map_err(|e| format!("failed to open workbook: {}", e))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| "workbook has no sheets".to_string())?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| format!("failed to read sheet {}: {}", sheet_name, e))?;

        let mut rows = range.rows();
        let header = rows.next().ok_or_else(|| "sheet is empty".to_string())?;

        let find_col = |name: &str| -> Result<usize, String> {
            header
                .iter()
                .position(|cell| cell.to_string().trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| format!("missing column {:?}", name))
        };

        let year_idx = find_col(COL_YEAR)?;
        let area_idx = find_col(COL_AREA)?;
        let rate_idx = find_col(COL_RATE)?;
        let sold_idx = find_col(COL_UNITS_SOLD)?;
        let total_idx = find_col(COL_TOTAL_UNITS)?;

        let mut records = Vec::new();
        for row in rows {
            let year = match cell_f64(row.get(year_idx)) {
                Some(y) => y as i32,
                None => continue,
            };
            let area = match row.get(area_idx) {
                Some(Data::Empty) | None => continue,
                Some(cell) => cell.to_string().trim().to_string(),
            };
            if area.is_empty() {
                continue;
            }
            let rate = match cell_f64(row.get(rate_idx)) {
                Some(r) => r,
                None => continue,
            };

            records.push(SaleRecord {
                year,
                area,
                rate,
                units_sold: cell_f64(row.get(sold_idx)).unwrap_or(0.0),
                total_units: cell_f64(row.get(total_idx)).unwrap_or(0.0),
            });
        }

        Ok(records)
    }

    pub(crate) fn from_records(records: Vec<SaleRecord>) -> Self {
        let mut areas: Vec<String> = Vec::new();
        for record in &records {
            if !areas.iter().any(|a| a.eq_ignore_ascii_case(&record.area)) {
                areas.push(record.area.clone());
            }
        }
        Self { records, areas }
    }

    /// Fixed fallback table covering four localities over 2020-2024.
    pub fn sample() -> Self {
        let areas = [
            ("Wakad", [45.0, 48.0, 52.0, 58.0, 65.0], [85.0, 88.0, 90.0, 92.0, 95.0], [1200.0, 1250.0, 1300.0, 1400.0, 1500.0]),
            ("Akurdi", [35.0, 37.0, 40.0, 44.0, 48.0], [75.0, 78.0, 80.0, 82.0, 85.0], [1100.0, 1150.0, 1200.0, 1250.0, 1300.0]),
            ("Aundh", [50.0, 53.0, 56.0, 60.0, 65.0], [80.0, 82.0, 85.0, 88.0, 90.0], [1350.0, 1400.0, 1450.0, 1500.0, 1600.0]),
            ("Baner", [42.0, 45.0, 48.0, 52.0, 56.0], [78.0, 80.0, 83.0, 86.0, 89.0], [1150.0, 1200.0, 1250.0, 1350.0, 1400.0]),
        ];

        let mut records = Vec::new();
        for (area, rates, sold, totals) in areas {
            for (i, year) in (2020..=2024).enumerate() {
                records.push(SaleRecord {
                    year,
                    area: area.to_string(),
                    rate: rates[i],
                    units_sold: sold[i],
                    total_units: totals[i],
                });
            }
        }
        Self::from_records(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    /// Every distinct area whose name appears (case-insensitively) anywhere in
    /// the message, ordered by the dataset's area enumeration. No match is an
    /// empty vec, not an error.
    pub fn detect_areas(&self, message: &str) -> Vec<String> {
        let message_lower = message.to_lowercase();
        self.areas
            .iter()
            .filter(|area| message_lower.contains(&area.to_lowercase()))
            .cloned()
            .collect()
    }

    /// All rows for `area` (case-insensitive match), sorted ascending by year.
    pub fn rows_for_area(&self, area: &str) -> Vec<SaleRecord> {
        if area.is_empty() {
            return Vec::new();
        }
        let mut rows: Vec<SaleRecord> = self
            .records
            .iter()
            .filter(|r| r.area.eq_ignore_ascii_case(area))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.year);
        rows
    }
}

fn cell_f64(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
