//! Load datasets from CSV files
//!
//! Collaborator for the CLI binaries: reads a CSV into the column-oriented
//! `Dataset`, inferring cell types per value. The analytics core itself only
//! ever sees the materialized table.

use std::error::Error;
use std::path::Path;

use chrono::NaiveDate;
use csv::Reader;
use log::debug;

use super::{Dataset, Value};
use crate::error::AnalyticsError;

/// Parse one CSV field into a typed cell
///
/// Empty fields become `Null`; numeric fields (with optional thousands
/// separators stripped) become `Number`; ISO and day-first dates become
/// `Date`; everything else stays `Text`.
fn parse_cell(field: &str) -> Value {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    let numeric_form = trimmed.replace(',', "");
    if let Ok(x) = numeric_form.parse::<f64>() {
        if x.is_finite() {
            return Value::Number(x);
        }
    }

    for format in ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
            return Value::Date(d);
        }
    }

    Value::Text(trimmed.to_string())
}

/// Load a dataset from a CSV file
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset, Box<dyn Error>> {
    let reader = Reader::from_path(path)?;
    load_from_csv(reader)
}

/// Load a dataset from any reader (e.g., string buffer, network stream)
pub fn load_dataset_from_reader<R: std::io::Read>(reader: R) -> Result<Dataset, Box<dyn Error>> {
    load_from_csv(Reader::from_reader(reader))
}

fn load_from_csv<R: std::io::Read>(mut reader: Reader<R>) -> Result<Dataset, Box<dyn Error>> {
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(parse_cell(record.get(i).unwrap_or("")));
        }
    }

    if columns.first().map(|c| c.is_empty()).unwrap_or(true) {
        return Err(Box::new(AnalyticsError::EmptyDataset));
    }

    debug!(
        "loaded {} rows x {} columns",
        columns[0].len(),
        headers.len()
    );

    Ok(Dataset::from_columns(
        headers.into_iter().zip(columns).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parsing() {
        assert_eq!(parse_cell("1250.5"), Value::Number(1250.5));
        assert_eq!(parse_cell("1,250"), Value::Number(1250.0));
        assert_eq!(parse_cell(""), Value::Null);
        assert_eq!(parse_cell("  "), Value::Null);
        assert_eq!(parse_cell("Kasko"), Value::Text("Kasko".into()));
        assert_eq!(
            parse_cell("2023-06-15"),
            Value::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap())
        );
        assert_eq!(
            parse_cell("15.06.2023"),
            Value::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap())
        );
    }

    #[test]
    fn test_load_from_reader() {
        let csv = "region,earned_premium,start_date\nA,100.5,2023-01-01\nB,,\n";
        let ds = load_dataset_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(ds.number_at("earned_premium", 0), Some(100.5));
        assert_eq!(ds.number_at("earned_premium", 1), None);
        assert!(ds.column("start_date").unwrap()[1].is_null());
    }

    #[test]
    fn test_empty_file_rejected() {
        let err = load_dataset_from_reader("a,b\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no rows"));
    }
}
