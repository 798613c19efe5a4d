//! Stable, invertible label encoding for categorical predictors
//!
//! The GLM consumes numeric predictors only; categorical columns are
//! encoded by the caller before fitting, and the mapping travels with the
//! fitted model so coefficients can be read against original labels.

use std::collections::HashMap;

use serde::Serialize;

use crate::dataset::{Dataset, Value};
use crate::error::AnalyticsError;

/// Invertible label-to-code mapping for one column
///
/// Codes are assigned in first-appearance order, so encoding the same
/// column of the same dataset always yields the same mapping.
#[derive(Debug, Clone, Serialize)]
pub struct LabelEncoding {
    column: String,
    labels: Vec<String>,
    #[serde(skip)]
    codes: HashMap<String, usize>,
}

impl LabelEncoding {
    /// Learn the mapping from a dataset column
    pub fn fit(dataset: &Dataset, column: &str) -> Result<Self, AnalyticsError> {
        let cells = dataset.dimension(column)?;

        let mut labels: Vec<String> = Vec::new();
        let mut codes: HashMap<String, usize> = HashMap::new();
        for cell in cells {
            if cell.is_null() {
                continue;
            }
            let label = cell.group_key();
            if !codes.contains_key(&label) {
                codes.insert(label.clone(), labels.len());
                labels.push(label);
            }
        }

        Ok(Self {
            column: column.to_string(),
            labels,
            codes,
        })
    }

    /// Column the mapping was learned from
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Number of distinct labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Code for a label, if seen during fit
    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.codes.get(label).copied()
    }

    /// Label for a code — the inverse used when reporting coefficients
    pub fn label_of(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// Encode the column's cells to numeric codes
    ///
    /// Nulls and labels unseen at fit time stay `Null`, so they fall under
    /// the GLM's null-predictor row exclusion.
    pub fn transform(&self, dataset: &Dataset) -> Result<Vec<Value>, AnalyticsError> {
        let cells = dataset.dimension(&self.column)?;
        Ok(cells
            .iter()
            .map(|cell| {
                if cell.is_null() {
                    return Value::Null;
                }
                match self.codes.get(&cell.group_key()) {
                    Some(&code) => Value::Number(code as f64),
                    None => Value::Null,
                }
            })
            .collect())
    }

    /// New dataset with the column replaced by its codes
    ///
    /// Convenience for callers that fit straight after encoding.
    pub fn encode_into(dataset: &Dataset, column: &str) -> Result<(Dataset, Self), AnalyticsError> {
        let encoding = Self::fit(dataset, column)?;
        let codes = encoding.transform(dataset)?;

        let columns = dataset
            .column_names()
            .iter()
            .map(|name| {
                let cells = if name == column {
                    codes.clone()
                } else {
                    dataset.column(name).map(<[Value]>::to_vec).unwrap_or_default()
                };
                (name.clone(), cells)
            })
            .collect();

        Ok((Dataset::from_columns(columns), encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brands() -> Dataset {
        Dataset::from_columns(vec![(
            "brand".to_string(),
            vec![
                Value::Text("Renault".into()),
                Value::Text("Fiat".into()),
                Value::Text("Renault".into()),
                Value::Null,
                Value::Text("Togg".into()),
            ],
        )])
    }

    #[test]
    fn test_first_appearance_codes() {
        let encoding = LabelEncoding::fit(&brands(), "brand").unwrap();
        assert_eq!(encoding.len(), 3);
        assert_eq!(encoding.code_of("Renault"), Some(0));
        assert_eq!(encoding.code_of("Fiat"), Some(1));
        assert_eq!(encoding.code_of("Togg"), Some(2));
        assert_eq!(encoding.code_of("Lada"), None);
    }

    #[test]
    fn test_round_trip_invertibility() {
        let encoding = LabelEncoding::fit(&brands(), "brand").unwrap();
        for label in ["Renault", "Fiat", "Togg"] {
            let code = encoding.code_of(label).unwrap();
            assert_eq!(encoding.label_of(code), Some(label));
        }
        assert_eq!(encoding.label_of(99), None);
    }

    #[test]
    fn test_transform_keeps_nulls() {
        let ds = brands();
        let encoding = LabelEncoding::fit(&ds, "brand").unwrap();
        let codes = encoding.transform(&ds).unwrap();
        assert_eq!(codes[0], Value::Number(0.0));
        assert_eq!(codes[1], Value::Number(1.0));
        assert_eq!(codes[2], Value::Number(0.0));
        assert_eq!(codes[3], Value::Null);
        assert_eq!(codes[4], Value::Number(2.0));
    }

    #[test]
    fn test_encode_into_replaces_column() {
        let (encoded, encoding) = LabelEncoding::encode_into(&brands(), "brand").unwrap();
        assert_eq!(encoded.number_at("brand", 0), Some(0.0));
        assert_eq!(encoded.number_at("brand", 4), Some(2.0));
        assert_eq!(encoding.column(), "brand");
    }

    #[test]
    fn test_unknown_column() {
        let err = LabelEncoding::fit(&brands(), "model").unwrap_err();
        assert!(matches!(err, AnalyticsError::UnknownDimension { .. }));
    }
}
