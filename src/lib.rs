//! Motor Analytics - Loss-ratio analytics and GLM pricing for motor insurance books
//!
//! This library provides:
//! - Per-record derived loss metrics (net loss, reserves, loss ratio, age buckets)
//! - Segment aggregation by any dimension with risk classification
//! - Log-link GLM fitting (Gamma, Poisson, Tweedie) with held-out diagnostics
//! - Composite risk scoring with a linear price adjustment
//! - Portfolio summary statistics and result memoization

pub mod cache;
pub mod dataset;
pub mod error;
pub mod glm;
pub mod metrics;
pub mod scoring;
pub mod segmentation;
pub mod summary;

// Re-export commonly used types
pub use cache::{AnalysisCache, AnalysisKey};
pub use dataset::{Dataset, Value};
pub use error::AnalyticsError;
pub use glm::{fit, Family, FitSpec, LabelEncoding, ModelFit};
pub use metrics::{derive, DeriveConfig, EnrichedRecord};
pub use scoring::{score, RiskScore, RiskWeights, ScoreConfig};
pub use segmentation::{aggregate, aggregate_many, AggregateOptions, RiskStatus, SegmentReport};
pub use summary::{column_stats, portfolio_summary, PortfolioSummary};
