//! Roll up enriched records by a caller-chosen dimension
//!
//! Groups keep first-appearance order until the final sort so that
//! loss-ratio ties resolve deterministically. All ratio denominators are
//! zero-guarded; a zero denominator yields 0, never NaN.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::RiskStatus;
use crate::dataset::Dataset;
use crate::error::AnalyticsError;
use crate::metrics::EnrichedRecord;

/// Aggregation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateOptions {
    /// Segments with fewer policies are hidden from the report.
    /// Filtering happens after aggregation, so it never changes values.
    pub min_policy_count: usize,

    /// Keep only the first N segments after sorting (None = all)
    pub top_n: Option<usize>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            min_policy_count: 1,
            top_n: None,
        }
    }
}

/// Rollup statistics for one segment of a partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentReport {
    /// Distinct value of the grouping dimension
    pub key: String,

    /// Sum of earned premium over the segment
    pub earned_premium: f64,

    /// Sum of net loss over the segment
    pub net_loss: f64,

    /// Sum of loss including outstanding reserves
    pub loss_incl_reserve: f64,

    /// Sum of claim counts
    pub claim_count: f64,

    /// Sum of earned exposure
    pub exposure: f64,

    /// Number of records in the segment
    pub policy_count: usize,

    /// Net loss over earned premium, percent
    pub loss_ratio: f64,

    /// Claims per exposure unit, percent
    pub frequency: f64,

    /// Average net loss per claim
    pub severity: f64,

    /// Earned premium minus net loss
    pub profit: f64,

    /// Risk band assigned from the loss ratio
    pub status: RiskStatus,
}

/// Ratio with a zero-guarded denominator
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    earned_premium: f64,
    net_loss: f64,
    loss_incl_reserve: f64,
    claim_count: f64,
    exposure: f64,
    policy_count: usize,
}

impl Accumulator {
    fn add(&mut self, record: &EnrichedRecord) {
        self.earned_premium += record.earned_premium;
        self.net_loss += record.net_loss;
        self.loss_incl_reserve += record.loss_incl_reserve;
        self.claim_count += record.claim_count;
        self.exposure += record.exposure;
        self.policy_count += 1;
    }

    fn into_report(self, key: String) -> SegmentReport {
        let loss_ratio = ratio(self.net_loss, self.earned_premium) * 100.0;
        SegmentReport {
            key,
            earned_premium: self.earned_premium,
            net_loss: self.net_loss,
            loss_incl_reserve: self.loss_incl_reserve,
            claim_count: self.claim_count,
            exposure: self.exposure,
            policy_count: self.policy_count,
            loss_ratio,
            frequency: ratio(self.claim_count, self.exposure) * 100.0,
            severity: ratio(self.net_loss, self.claim_count),
            profit: self.earned_premium - self.net_loss,
            status: RiskStatus::from_loss_ratio(loss_ratio),
        }
    }
}

/// Grouping key resolution: a dataset column, or one of the derived
/// bucket fields carried on the records themselves
enum KeySource<'a> {
    Column(&'a [crate::dataset::Value]),
    DriverAgeBucket,
    VehicleAgeBucket,
}

impl<'a> KeySource<'a> {
    fn resolve(
        dataset: &'a Dataset,
        dimension: &str,
    ) -> Result<KeySource<'a>, AnalyticsError> {
        match dimension {
            "driver_age_bucket" => Ok(KeySource::DriverAgeBucket),
            "vehicle_age_bucket" => Ok(KeySource::VehicleAgeBucket),
            _ => Ok(KeySource::Column(dataset.dimension(dimension)?)),
        }
    }

    fn key(&self, record: &EnrichedRecord) -> String {
        match self {
            KeySource::Column(cells) => cells
                .get(record.row)
                .map(|cell| cell.group_key())
                .unwrap_or_else(|| "(missing)".to_string()),
            KeySource::DriverAgeBucket => record.driver_age_bucket.as_str().to_string(),
            KeySource::VehicleAgeBucket => record.vehicle_age_bucket.as_str().to_string(),
        }
    }
}

/// Aggregate enriched records by one dimension
///
/// The dimension is a dataset column, or one of the derived bucket names
/// (`driver_age_bucket`, `vehicle_age_bucket`). Null cells form their own
/// `(missing)` segment. The report is sorted by descending loss ratio;
/// ties keep the order in which group keys first appeared in the data.
pub fn aggregate(
    dataset: &Dataset,
    records: &[EnrichedRecord],
    dimension: &str,
    options: &AggregateOptions,
) -> Result<Vec<SegmentReport>, AnalyticsError> {
    let source = KeySource::resolve(dataset, dimension)?;

    // First-appearance order of keys, with an index for O(1) lookup
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Accumulator> = HashMap::new();

    for record in records {
        let key = source.key(record);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().add(record);
    }

    let mut reports: Vec<SegmentReport> = order
        .into_iter()
        .map(|key| {
            let accumulator = groups.remove(&key).unwrap_or_default();
            accumulator.into_report(key)
        })
        .collect();

    // Stable sort keeps first-appearance order among equal loss ratios
    reports.sort_by(|a, b| {
        b.loss_ratio
            .partial_cmp(&a.loss_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    reports.retain(|report| report.policy_count >= options.min_policy_count);
    if let Some(n) = options.top_n {
        reports.truncate(n);
    }

    Ok(reports)
}

/// Aggregate the same records across several dimensions in parallel
///
/// Each dimension is an independent rollup over the shared read-only
/// records, so the sweep fans out across the rayon pool. Output preserves
/// the input dimension order.
pub fn aggregate_many(
    dataset: &Dataset,
    records: &[EnrichedRecord],
    dimensions: &[String],
    options: &AggregateOptions,
) -> Result<Vec<(String, Vec<SegmentReport>)>, AnalyticsError> {
    dimensions
        .par_iter()
        .map(|dimension| {
            aggregate(dataset, records, dimension, options)
                .map(|reports| (dimension.clone(), reports))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use crate::metrics::{derive, DeriveConfig};
    use approx::assert_relative_eq;

    /// Dataset with the full monetary schema plus a region column
    fn motor_dataset(rows: &[(&str, f64, f64)]) -> Dataset {
        let n = rows.len();
        let zeros = || vec![Value::Number(0.0); n];
        Dataset::from_columns(vec![
            (
                "region".to_string(),
                rows.iter()
                    .map(|(region, _, _)| {
                        if region.is_empty() {
                            Value::Null
                        } else {
                            Value::Text(region.to_string())
                        }
                    })
                    .collect(),
            ),
            (
                "earned_premium".to_string(),
                rows.iter().map(|(_, p, _)| Value::Number(*p)).collect(),
            ),
            (
                "indemnity_paid".to_string(),
                rows.iter().map(|(_, _, l)| Value::Number(*l)).collect(),
            ),
            ("expense_paid".to_string(), zeros()),
            ("recovery_paid".to_string(), zeros()),
            ("salvage_paid".to_string(), zeros()),
            ("indemnity_reserve".to_string(), zeros()),
            ("expense_reserve".to_string(), zeros()),
            ("recovery_reserve".to_string(), zeros()),
            ("salvage_reserve".to_string(), zeros()),
        ])
    }

    fn enrich(dataset: &Dataset) -> Vec<EnrichedRecord> {
        derive(dataset, &DeriveConfig::new(2024)).unwrap()
    }

    #[test]
    fn test_three_record_scenario() {
        let ds = motor_dataset(&[("A", 100.0, 40.0), ("A", 200.0, 300.0), ("B", 50.0, 10.0)]);
        let records = enrich(&ds);
        let reports = aggregate(&ds, &records, "region", &AggregateOptions::default()).unwrap();

        assert_eq!(reports.len(), 2);

        // A first: higher loss ratio
        assert_eq!(reports[0].key, "A");
        assert_relative_eq!(reports[0].earned_premium, 300.0);
        assert_relative_eq!(reports[0].net_loss, 340.0);
        assert_relative_eq!(reports[0].loss_ratio, 113.333333, epsilon = 1e-4);
        assert_eq!(reports[0].status, RiskStatus::LossMaking);

        assert_eq!(reports[1].key, "B");
        assert_relative_eq!(reports[1].earned_premium, 50.0);
        assert_relative_eq!(reports[1].loss_ratio, 20.0);
        assert_eq!(reports[1].status, RiskStatus::Profitable);
    }

    #[test]
    fn test_premium_conservation() {
        let rows: Vec<(&str, f64, f64)> = vec![
            ("A", 120.0, 10.0),
            ("B", 75.5, 80.0),
            ("C", 310.25, 0.0),
            ("A", 44.0, 44.0),
            ("", 16.75, 3.0),
            ("B", 98.5, 120.0),
        ];
        let total: f64 = rows.iter().map(|(_, p, _)| p).sum();
        let ds = motor_dataset(&rows);
        let records = enrich(&ds);
        let reports = aggregate(&ds, &records, "region", &AggregateOptions::default()).unwrap();

        let sum: f64 = reports.iter().map(|r| r.earned_premium).sum();
        assert_relative_eq!(sum, total, epsilon = 1e-9);
    }

    #[test]
    fn test_ratio_and_status_bands() {
        let ds = motor_dataset(&[("W", 1000.0, 700.0)]);
        let records = enrich(&ds);
        let reports = aggregate(&ds, &records, "region", &AggregateOptions::default()).unwrap();
        assert_relative_eq!(reports[0].loss_ratio, 70.0);
        assert_eq!(reports[0].status, RiskStatus::AtRisk);

        let ds = motor_dataset(&[("L", 1000.0, 1001.0)]);
        let records = enrich(&ds);
        let reports = aggregate(&ds, &records, "region", &AggregateOptions::default()).unwrap();
        assert_eq!(reports[0].status, RiskStatus::LossMaking);
    }

    #[test]
    fn test_zero_premium_group_guarded() {
        let ds = motor_dataset(&[("Z", 0.0, 500.0)]);
        let records = enrich(&ds);
        let reports = aggregate(&ds, &records, "region", &AggregateOptions::default()).unwrap();
        assert_relative_eq!(reports[0].loss_ratio, 0.0);
        assert!(reports[0].loss_ratio.is_finite());
        assert_relative_eq!(reports[0].severity, 0.0);
        assert_relative_eq!(reports[0].frequency, 0.0);
    }

    #[test]
    fn test_missing_cells_form_their_own_group() {
        let ds = motor_dataset(&[("A", 100.0, 10.0), ("", 60.0, 90.0)]);
        let records = enrich(&ds);
        let reports = aggregate(&ds, &records, "region", &AggregateOptions::default()).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().any(|r| r.key == "(missing)"));
    }

    #[test]
    fn test_min_count_filters_rows_not_values() {
        let ds = motor_dataset(&[
            ("A", 100.0, 10.0),
            ("A", 100.0, 20.0),
            ("B", 500.0, 490.0),
        ]);
        let records = enrich(&ds);
        let options = AggregateOptions {
            min_policy_count: 2,
            top_n: None,
        };
        let reports = aggregate(&ds, &records, "region", &options).unwrap();

        // B hidden, A's values unchanged by the filter
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].key, "A");
        assert_relative_eq!(reports[0].earned_premium, 200.0);
    }

    #[test]
    fn test_top_n_truncates_after_sort() {
        let ds = motor_dataset(&[("A", 100.0, 90.0), ("B", 100.0, 50.0), ("C", 100.0, 10.0)]);
        let records = enrich(&ds);
        let options = AggregateOptions {
            min_policy_count: 1,
            top_n: Some(2),
        };
        let reports = aggregate(&ds, &records, "region", &options).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].key, "A");
        assert_eq!(reports[1].key, "B");
    }

    #[test]
    fn test_ties_keep_first_appearance_order() {
        let ds = motor_dataset(&[("X", 100.0, 50.0), ("Y", 200.0, 100.0), ("Z", 50.0, 25.0)]);
        let records = enrich(&ds);
        let reports = aggregate(&ds, &records, "region", &AggregateOptions::default()).unwrap();
        let keys: Vec<&str> = reports.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_group_by_derived_bucket() {
        // No driver_age column: every record defaults into the 36-45 band
        let ds = motor_dataset(&[("A", 100.0, 10.0), ("B", 200.0, 50.0)]);
        let records = enrich(&ds);
        let reports =
            aggregate(&ds, &records, "driver_age_bucket", &AggregateOptions::default()).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].key, "36-45");
        assert_eq!(reports[0].policy_count, 2);
    }

    #[test]
    fn test_unknown_dimension() {
        let ds = motor_dataset(&[("A", 100.0, 10.0)]);
        let records = enrich(&ds);
        let err = aggregate(&ds, &records, "galaxy", &AggregateOptions::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::UnknownDimension { .. }));
    }

    #[test]
    fn test_aggregate_many_preserves_dimension_order() {
        let ds = motor_dataset(&[("A", 100.0, 10.0), ("B", 50.0, 40.0)]);
        let records = enrich(&ds);
        let dimensions = vec!["region".to_string(), "earned_premium".to_string()];
        let sweep =
            aggregate_many(&ds, &records, &dimensions, &AggregateOptions::default()).unwrap();
        assert_eq!(sweep.len(), 2);
        assert_eq!(sweep[0].0, "region");
        assert_eq!(sweep[1].0, "earned_premium");
        assert_eq!(sweep[0].1.len(), 2);
    }
}
