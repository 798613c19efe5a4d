//! Composite risk scoring and price adjustment
//!
//! Combines externally supplied per-dimension weights with relative risk
//! factors computed from the book itself. Stateless: every call recomputes
//! the factor tables from the records it is given.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Value};
use crate::error::AnalyticsError;
use crate::metrics::EnrichedRecord;

/// Caller-supplied weights for the three factor dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskWeights {
    pub model_year_weight: f64,
    pub region_weight: f64,
    pub brand_weight: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            model_year_weight: 1.0,
            region_weight: 1.0,
            brand_weight: 1.0,
        }
    }
}

/// Column names the scorer reads its dimensions from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub region_column: String,
    pub brand_column: String,
    pub model_year_column: String,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            region_column: "region".to_string(),
            brand_column: "brand".to_string(),
            model_year_column: "model_year".to_string(),
        }
    }
}

/// Composite score for one record, with its factor breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    /// Row index into the source dataset
    pub row: usize,

    /// Mean of the three weighted factors, times 100
    pub score: f64,

    pub region_factor: f64,
    pub brand_factor: f64,
    pub vehicle_factor: f64,
}

/// Relative premium factor per distinct dimension value
///
/// `mean(premium | value) / mean(premium | overall)`; a dimension value
/// never seen (or a null cell) scores the neutral 1.0.
fn relative_factors(
    cells: &[Value],
    records: &[EnrichedRecord],
) -> HashMap<String, f64> {
    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
    let mut overall_sum = 0.0;

    for record in records {
        overall_sum += record.earned_premium;
        if let Some(cell) = cells.get(record.row) {
            if !cell.is_null() {
                let entry = sums.entry(cell.group_key()).or_insert((0.0, 0));
                entry.0 += record.earned_premium;
                entry.1 += 1;
            }
        }
    }

    let overall_mean = if records.is_empty() {
        0.0
    } else {
        overall_sum / records.len() as f64
    };
    if overall_mean <= 0.0 {
        return HashMap::new();
    }

    sums.into_iter()
        .map(|(key, (sum, count))| (key, (sum / count as f64) / overall_mean))
        .collect()
}

/// Fixed vehicle-age step factor from the model year
fn vehicle_factor(model_year: Option<f64>) -> f64 {
    match model_year {
        Some(year) if year < 2015.0 => 1.5,
        Some(year) if year < 2020.0 => 1.0,
        Some(_) => 0.8,
        None => 1.0,
    }
}

/// Score every record against the book's relative risk factors
pub fn score(
    dataset: &Dataset,
    records: &[EnrichedRecord],
    weights: &RiskWeights,
    config: &ScoreConfig,
) -> Result<Vec<RiskScore>, AnalyticsError> {
    let regions = dataset.dimension(&config.region_column)?;
    let brands = dataset.dimension(&config.brand_column)?;
    let model_years = dataset.dimension(&config.model_year_column)?;

    let region_factors = relative_factors(regions, records);
    let brand_factors = relative_factors(brands, records);

    let factor_of = |cells: &[Value], table: &HashMap<String, f64>, row: usize| -> f64 {
        cells
            .get(row)
            .filter(|cell| !cell.is_null())
            .and_then(|cell| table.get(&cell.group_key()).copied())
            .unwrap_or(1.0)
    };

    Ok(records
        .iter()
        .map(|record| {
            let region_factor = factor_of(regions, &region_factors, record.row);
            let brand_factor = factor_of(brands, &brand_factors, record.row);
            let vehicle = vehicle_factor(
                model_years.get(record.row).and_then(Value::as_number),
            );

            let score = (weights.region_weight * region_factor
                + weights.brand_weight * brand_factor
                + weights.model_year_weight * vehicle)
                / 3.0
                * 100.0;

            RiskScore {
                row: record.row,
                score,
                region_factor,
                brand_factor,
                vehicle_factor: vehicle,
            }
        })
        .collect())
}

/// Linear price adjustment from a composite score
///
/// A score of 100 is book-average and leaves the premium unchanged;
/// `elasticity` scales how hard the price follows the score.
pub fn adjusted_premium(base_premium: f64, score: f64, elasticity: f64) -> f64 {
    base_premium * (1.0 + elasticity * (score - 100.0) / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{derive, DeriveConfig};
    use approx::assert_relative_eq;

    fn scored_dataset() -> Dataset {
        let n = 4;
        let zeros = || vec![Value::Number(0.0); n];
        Dataset::from_columns(vec![
            (
                "region".to_string(),
                vec![
                    Value::Text("Ankara".into()),
                    Value::Text("Ankara".into()),
                    Value::Text("Izmir".into()),
                    Value::Null,
                ],
            ),
            (
                "brand".to_string(),
                vec![
                    Value::Text("Fiat".into()),
                    Value::Text("Fiat".into()),
                    Value::Text("Fiat".into()),
                    Value::Text("Fiat".into()),
                ],
            ),
            (
                "model_year".to_string(),
                vec![
                    Value::Number(2010.0),
                    Value::Number(2017.0),
                    Value::Number(2022.0),
                    Value::Null,
                ],
            ),
            (
                "earned_premium".to_string(),
                vec![
                    Value::Number(300.0),
                    Value::Number(100.0),
                    Value::Number(200.0),
                    Value::Number(200.0),
                ],
            ),
            ("indemnity_paid".to_string(), zeros()),
            ("expense_paid".to_string(), zeros()),
            ("recovery_paid".to_string(), zeros()),
            ("salvage_paid".to_string(), zeros()),
            ("indemnity_reserve".to_string(), zeros()),
            ("expense_reserve".to_string(), zeros()),
            ("recovery_reserve".to_string(), zeros()),
            ("salvage_reserve".to_string(), zeros()),
        ])
    }

    #[test]
    fn test_relative_factors_and_composite() {
        let ds = scored_dataset();
        let records = derive(&ds, &DeriveConfig::new(2024)).unwrap();
        let scores = score(
            &ds,
            &records,
            &RiskWeights::default(),
            &ScoreConfig::default(),
        )
        .unwrap();

        // Overall mean premium = 200; Ankara mean = 200 -> factor 1.0;
        // Izmir mean = 200 -> factor 1.0; brand factor 1.0 everywhere.
        assert_relative_eq!(scores[0].region_factor, 1.0);
        assert_relative_eq!(scores[2].region_factor, 1.0);
        assert_relative_eq!(scores[0].brand_factor, 1.0);

        // Vehicle step: 2010 -> 1.5, 2017 -> 1.0, 2022 -> 0.8, null -> 1.0
        assert_relative_eq!(scores[0].vehicle_factor, 1.5);
        assert_relative_eq!(scores[1].vehicle_factor, 1.0);
        assert_relative_eq!(scores[2].vehicle_factor, 0.8);
        assert_relative_eq!(scores[3].vehicle_factor, 1.0);

        // Composite for row 0: (1.0 + 1.0 + 1.5) / 3 * 100
        assert_relative_eq!(scores[0].score, 116.666666, epsilon = 1e-4);
    }

    #[test]
    fn test_missing_dimension_value_is_neutral() {
        let ds = scored_dataset();
        let records = derive(&ds, &DeriveConfig::new(2024)).unwrap();
        let scores = score(
            &ds,
            &records,
            &RiskWeights::default(),
            &ScoreConfig::default(),
        )
        .unwrap();

        // Row 3 has null region and null model year
        assert_relative_eq!(scores[3].region_factor, 1.0);
        assert_relative_eq!(scores[3].vehicle_factor, 1.0);
        assert_relative_eq!(scores[3].score, 100.0);
    }

    #[test]
    fn test_weights_scale_factors() {
        let ds = scored_dataset();
        let records = derive(&ds, &DeriveConfig::new(2024)).unwrap();
        let weights = RiskWeights {
            model_year_weight: 2.0,
            region_weight: 0.0,
            brand_weight: 0.0,
        };
        let scores = score(&ds, &records, &weights, &ScoreConfig::default()).unwrap();
        // Row 0: (0 + 0 + 2 * 1.5) / 3 * 100
        assert_relative_eq!(scores[0].score, 100.0);
    }

    #[test]
    fn test_missing_score_column_is_an_error() {
        let ds = scored_dataset();
        let records = derive(&ds, &DeriveConfig::new(2024)).unwrap();
        let config = ScoreConfig {
            region_column: "province".to_string(),
            ..ScoreConfig::default()
        };
        let err = score(&ds, &records, &RiskWeights::default(), &config).unwrap_err();
        assert!(matches!(err, AnalyticsError::UnknownDimension { .. }));
    }

    #[test]
    fn test_adjusted_premium_is_linear_in_score() {
        assert_relative_eq!(adjusted_premium(1000.0, 100.0, 0.5), 1000.0);
        assert_relative_eq!(adjusted_premium(1000.0, 120.0, 0.5), 1100.0);
        assert_relative_eq!(adjusted_premium(1000.0, 80.0, 0.5), 900.0);
        // Elasticity 0 pins the price
        assert_relative_eq!(adjusted_premium(1000.0, 150.0, 0.0), 1000.0);
    }
}
