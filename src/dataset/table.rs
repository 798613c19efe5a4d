//! Column-oriented table of typed cells
//!
//! The dataset is loaded once by an external collaborator and treated as
//! read-only for the duration of any analysis request. Operations validate
//! the columns they need up front instead of failing inside arithmetic.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// One cell of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Numeric cell
    Number(f64),
    /// Free-text cell (region names, brands, plate codes, ...)
    Text(String),
    /// Date cell, normalized by the loader
    Date(NaiveDate),
    /// Empty cell
    Null,
}

impl Value {
    /// Numeric view of the cell, if it is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    /// Text view of the cell, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical grouping key for this cell.
    ///
    /// Null cells form their own `(missing)` group rather than being dropped.
    pub fn group_key(&self) -> String {
        match self {
            Value::Number(x) => {
                // Integral numbers group as "2019", not "2019.0"
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    format!("{}", *x as i64)
                } else {
                    format!("{}", x)
                }
            }
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Null => "(missing)".to_string(),
        }
    }

    fn hash_into(&self, state: &mut impl Hasher) {
        match self {
            Value::Number(x) => {
                0u8.hash(state);
                x.to_bits().hash(state);
            }
            Value::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
            Value::Date(d) => {
                2u8.hash(state);
                d.hash(state);
            }
            Value::Null => 3u8.hash(state),
        }
    }
}

/// Column-oriented, row-aligned table
///
/// Columns keep their load order; cells are immutable after construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
    rows: usize,
    index: HashMap<String, usize>,
}

impl Dataset {
    /// Build a dataset from named, row-aligned columns
    ///
    /// # Panics
    /// Panics if the columns are not all the same length.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Self {
        let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        for (name, col) in &columns {
            assert_eq!(
                col.len(),
                rows,
                "column '{}' has {} rows, expected {}",
                name,
                col.len(),
                rows
            );
        }

        let names: Vec<String> = columns.iter().map(|(n, _)| n.clone()).collect();
        let cols: Vec<Vec<Value>> = columns.into_iter().map(|(_, c)| c).collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        Self {
            names,
            columns: cols,
            rows,
            index,
        }
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn n_columns(&self) -> usize {
        self.names.len()
    }

    /// Column names in load order
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Whether a column exists in the schema
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Cells of a column, if present
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.index.get(name).map(|&i| self.columns[i].as_slice())
    }

    /// Cells of a column, failing with `MissingColumn` if absent
    ///
    /// Used by operations whose contract requires the column in the schema.
    pub fn require_column(&self, name: &str) -> Result<&[Value], AnalyticsError> {
        self.column(name).ok_or_else(|| AnalyticsError::MissingColumn {
            column: name.to_string(),
        })
    }

    /// Cells of a column, failing with `UnknownDimension` if absent
    ///
    /// Used for caller-chosen grouping dimensions and model predictors.
    pub fn dimension(&self, name: &str) -> Result<&[Value], AnalyticsError> {
        self.column(name)
            .ok_or_else(|| AnalyticsError::UnknownDimension {
                column: name.to_string(),
            })
    }

    /// Numeric value of one cell, None for nulls and non-numbers
    pub fn number_at(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name).and_then(|c| c.get(row)).and_then(Value::as_number)
    }

    /// Stable content fingerprint over schema and cells
    ///
    /// Used as a memoization key: identical content yields an identical
    /// fingerprint across calls within the same build.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.rows.hash(&mut hasher);
        for (name, col) in self.names.iter().zip(&self.columns) {
            name.hash(&mut hasher);
            for cell in col {
                cell.hash_into(&mut hasher);
            }
        }
        hasher.finish()
    }
}
