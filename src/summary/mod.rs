//! Portfolio headline figures and per-column distribution stats

use serde::{Deserialize, Serialize};

use crate::dataset::{Dataset, Value};
use crate::error::AnalyticsError;
use crate::metrics::EnrichedRecord;

/// Headline figures over the whole book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub policy_count: usize,
    pub total_premium: f64,
    pub total_net_loss: f64,
    pub total_claims: f64,
    /// Overall net loss over earned premium, percent
    pub loss_ratio: f64,
    /// Overall claims per exposure unit, percent
    pub frequency: f64,
    /// Overall average net loss per claim
    pub severity: f64,
}

/// Distribution stats for one numeric column (non-null cells only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

fn guarded(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Headline figures from enriched records
pub fn portfolio_summary(records: &[EnrichedRecord]) -> PortfolioSummary {
    let mut total_premium = 0.0;
    let mut total_net_loss = 0.0;
    let mut total_claims = 0.0;
    let mut total_exposure = 0.0;

    for record in records {
        total_premium += record.earned_premium;
        total_net_loss += record.net_loss;
        total_claims += record.claim_count;
        total_exposure += record.exposure;
    }

    PortfolioSummary {
        policy_count: records.len(),
        total_premium,
        total_net_loss,
        total_claims,
        loss_ratio: guarded(total_net_loss, total_premium) * 100.0,
        frequency: guarded(total_claims, total_exposure) * 100.0,
        severity: guarded(total_net_loss, total_claims),
    }
}

/// Distribution stats for one column
pub fn column_stats(dataset: &Dataset, column: &str) -> Result<ColumnStats, AnalyticsError> {
    let cells = dataset.dimension(column)?;

    let mut values: Vec<f64> = cells.iter().filter_map(Value::as_number).collect();
    if values.is_empty() {
        return Ok(ColumnStats {
            count: 0,
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
        });
    }

    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 1 {
        values[count / 2]
    } else {
        (values[count / 2 - 1] + values[count / 2]) / 2.0
    };

    Ok(ColumnStats {
        count,
        mean,
        median,
        min: values[0],
        max: values[count - 1],
    })
}
