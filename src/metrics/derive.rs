//! Metric derivation: raw rows to enriched records
//!
//! A pure, order-preserving, row-independent transform. Missing monetary
//! cells read as zero; a monetary column missing from the schema entirely
//! is a contract violation and fails up front.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{DriverAgeBucket, VehicleAgeBucket};
use crate::dataset::{Dataset, Value};
use crate::error::AnalyticsError;

/// Age assumed when the driver age cell is null
const DEFAULT_DRIVER_AGE: f64 = 35.0;

/// Vehicle age assumed when the model year cell is null
const DEFAULT_VEHICLE_AGE: i32 = 5;

/// Column names and derivation parameters
///
/// Defaults match the conventional motor book schema; callers with other
/// headers override the relevant fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeriveConfig {
    pub earned_premium: String,
    pub indemnity_paid: String,
    pub expense_paid: String,
    pub recovery_paid: String,
    pub salvage_paid: String,
    pub indemnity_reserve: String,
    pub expense_reserve: String,
    pub recovery_reserve: String,
    pub salvage_reserve: String,
    pub claim_count: String,
    pub exposure: String,
    pub driver_age: String,
    pub model_year: String,

    /// Year vehicle ages are measured against
    pub reference_year: i32,
}

impl DeriveConfig {
    /// Conventional schema with an explicit reference year
    pub fn new(reference_year: i32) -> Self {
        Self {
            earned_premium: "earned_premium".to_string(),
            indemnity_paid: "indemnity_paid".to_string(),
            expense_paid: "expense_paid".to_string(),
            recovery_paid: "recovery_paid".to_string(),
            salvage_paid: "salvage_paid".to_string(),
            indemnity_reserve: "indemnity_reserve".to_string(),
            expense_reserve: "expense_reserve".to_string(),
            recovery_reserve: "recovery_reserve".to_string(),
            salvage_reserve: "salvage_reserve".to_string(),
            claim_count: "claim_count".to_string(),
            exposure: "exposure".to_string(),
            driver_age: "driver_age".to_string(),
            model_year: "model_year".to_string(),
            reference_year,
        }
    }
}

/// One row with its derived financial and demographic metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// Row index into the source dataset
    pub row: usize,

    /// Earned premium for the row (0 if the cell is null)
    pub earned_premium: f64,

    /// Paid indemnity + expenses, net of recovery and salvage
    pub net_loss: f64,

    /// Net loss plus outstanding reserves, net of reserve offsets
    pub loss_incl_reserve: f64,

    /// Net loss over earned premium, percent; 0 when premium is not positive
    pub loss_ratio: f64,

    /// Claims attributed to this row
    pub claim_count: f64,

    /// Earned exposure attributed to this row
    pub exposure: f64,

    pub driver_age_bucket: DriverAgeBucket,
    pub vehicle_age_bucket: VehicleAgeBucket,
}

/// Numeric cell with null-as-zero semantics
fn monetary(column: &[Value], row: usize) -> f64 {
    column.get(row).and_then(Value::as_number).unwrap_or(0.0)
}

/// Derive metrics for every row of the dataset
///
/// Row-independent, so the per-row work fans out across the rayon pool.
/// Output order matches input row order.
pub fn derive(
    dataset: &Dataset,
    config: &DeriveConfig,
) -> Result<Vec<EnrichedRecord>, AnalyticsError> {
    let premium = dataset.require_column(&config.earned_premium)?;
    let indemnity_paid = dataset.require_column(&config.indemnity_paid)?;
    let expense_paid = dataset.require_column(&config.expense_paid)?;
    let recovery_paid = dataset.require_column(&config.recovery_paid)?;
    let salvage_paid = dataset.require_column(&config.salvage_paid)?;
    let indemnity_reserve = dataset.require_column(&config.indemnity_reserve)?;
    let expense_reserve = dataset.require_column(&config.expense_reserve)?;
    let recovery_reserve = dataset.require_column(&config.recovery_reserve)?;
    let salvage_reserve = dataset.require_column(&config.salvage_reserve)?;

    // Demographic and count columns tolerate full absence: every cell then
    // takes the row-level default.
    let claim_count = dataset.column(&config.claim_count);
    let exposure = dataset.column(&config.exposure);
    let driver_age = dataset.column(&config.driver_age);
    let model_year = dataset.column(&config.model_year);

    let records = (0..dataset.n_rows())
        .into_par_iter()
        .map(|row| {
            let earned_premium = monetary(premium, row);

            let net_loss = monetary(indemnity_paid, row) + monetary(expense_paid, row)
                - monetary(recovery_paid, row)
                - monetary(salvage_paid, row);

            let loss_incl_reserve = net_loss + monetary(indemnity_reserve, row)
                + monetary(expense_reserve, row)
                - monetary(recovery_reserve, row)
                - monetary(salvage_reserve, row);

            let loss_ratio = if earned_premium > 0.0 {
                net_loss / earned_premium * 100.0
            } else {
                0.0
            };

            let age = driver_age
                .and_then(|c| c.get(row))
                .and_then(Value::as_number)
                .unwrap_or(DEFAULT_DRIVER_AGE);

            let vehicle_age = model_year
                .and_then(|c| c.get(row))
                .and_then(Value::as_number)
                .map(|year| config.reference_year - year as i32)
                .unwrap_or(DEFAULT_VEHICLE_AGE);

            EnrichedRecord {
                row,
                earned_premium,
                net_loss,
                loss_incl_reserve,
                loss_ratio,
                claim_count: claim_count.map(|c| monetary(c, row)).unwrap_or(0.0),
                exposure: exposure.map(|c| monetary(c, row)).unwrap_or(0.0),
                driver_age_bucket: DriverAgeBucket::from_age(age),
                vehicle_age_bucket: VehicleAgeBucket::from_years(vehicle_age),
            }
        })
        .collect();

    Ok(records)
}
