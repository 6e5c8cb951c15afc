//! Tabular summarizer for uploaded CSV files.
//!
//! Shape, column listing and describe-style statistics for every numeric
//! column. Missing-value markers follow the usual dataframe conventions.

use serde::{Serialize, Serializer};
use std::io::Read;

use crate::error::{InnovationError, Result};

pub const ADVISORY: &str = "Based on these insights, predictive analytics models, trend analysis, or dashboards can be created to drive business or operational improvements.";

/// Cell values read as missing rather than as text
const NA_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A parsed CSV: header row plus string cells
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Parse CSV with a header row.
    ///
    /// Short rows are padded with missing cells. Rows with more fields than
    /// the header and invalid UTF-8 are errors.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.is_empty() {
            return Err(InnovationError::DataAnalysis {
                message: "No columns to parse from file".to_string(),
            });
        }
        let columns = dedupe_column_names(headers.iter());

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            if record.len() > columns.len() {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(InnovationError::DataAnalysis {
                    message: format!(
                        "Error tokenizing data: expected {} fields in line {line}, saw {}",
                        columns.len(),
                        record.len()
                    ),
                });
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_csv_reader(bytes)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    /// First `n` rows for display
    pub fn preview(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Parsed values of column `idx` if every non-missing cell is a number
    fn numeric_column(&self, idx: usize) -> Option<Vec<f64>> {
        let mut values = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let cell = row.get(idx).map(String::as_str).unwrap_or("");
            if NA_VALUES.contains(&cell) {
                continue;
            }
            values.push(cell.trim().parse::<f64>().ok()?);
        }
        Some(values)
    }
}

/// Repeated header names get ".1", ".2", ... suffixes
fn dedupe_column_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{name}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// Describe-style statistics for one numeric column; undefined values are None
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: f64,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnStats {
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = (n > 0).then(|| values.iter().sum::<f64>() / n as f64);
        let std = mean.filter(|_| n > 1).map(|m| {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        });

        Self {
            count: n as f64,
            mean,
            std,
            min: sorted.first().copied(),
            q25: quantile(&sorted, 0.25),
            q50: quantile(&sorted, 0.50),
            q75: quantile(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }
}

/// Linear interpolation between closest ranks
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Column name → statistics, in original column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsTable(Vec<(String, ColumnStats)>);

impl StatisticsTable {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&ColumnStats> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnStats)> {
        self.0.iter().map(|(name, s)| (name.as_str(), s))
    }
}

impl Serialize for StatisticsTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub statistics: StatisticsTable,
    pub advisory: &'static str,
}

impl TableSummary {
    pub fn shape_sentence(&self) -> String {
        format!(
            "The dataset contains {} rows and {} columns.",
            self.row_count, self.column_count
        )
    }

    pub fn columns_sentence(&self) -> String {
        format!("Key columns: {}", self.columns.join(", "))
    }

    pub fn statistics_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.statistics)?)
    }
}

/// Summarize a parsed table
pub fn summarize(table: &Table) -> TableSummary {
    let (row_count, column_count) = table.shape();
    let statistics = StatisticsTable(
        table
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| {
                table
                    .numeric_column(idx)
                    .map(|values| (name.clone(), ColumnStats::from_values(&values)))
            })
            .collect(),
    );
    TableSummary {
        row_count,
        column_count,
        columns: table.columns().to_vec(),
        statistics,
        advisory: ADVISORY,
    }
}

/// Parse then summarize raw CSV bytes
pub fn summarize_csv(bytes: &[u8]) -> Result<TableSummary> {
    let table = Table::from_csv_bytes(bytes)?;
    Ok(summarize(&table))
}
