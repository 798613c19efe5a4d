//! Risk status bands over the loss ratio

use serde::{Deserialize, Serialize};

/// Risk classification of a segment by loss ratio, percent
///
/// Bands are half-open `[lower, upper)`: a loss ratio of exactly 70 is
/// already `AtRisk`, exactly 100 is already `LossMaking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    /// [0, 50)
    Profitable,
    /// [50, 70)
    Watch,
    /// [70, 100)
    AtRisk,
    /// [100, Inf)
    LossMaking,
}

impl RiskStatus {
    /// Classify a loss ratio, percent
    pub fn from_loss_ratio(loss_ratio: f64) -> Self {
        if loss_ratio < 50.0 {
            RiskStatus::Profitable
        } else if loss_ratio < 70.0 {
            RiskStatus::Watch
        } else if loss_ratio < 100.0 {
            RiskStatus::AtRisk
        } else {
            RiskStatus::LossMaking
        }
    }

    /// Label used in report tables
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Profitable => "Profitable",
            RiskStatus::Watch => "Watch",
            RiskStatus::AtRisk => "At-Risk",
            RiskStatus::LossMaking => "Loss-Making",
        }
    }
}
