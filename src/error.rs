//! Error taxonomy for the analytics library
//!
//! Every fallible core operation returns `AnalyticsError` to its immediate
//! caller. The library never retries and never logs from computation paths;
//! presentation layers translate each kind into a user-facing message.

use thiserror::Error;

/// Errors produced by the analytics core
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A column the operation requires is entirely absent from the schema.
    /// Per-row nulls are tolerated; a missing column is not.
    #[error("required column '{column}' is missing from the dataset")]
    MissingColumn { column: String },

    /// A grouping dimension, predictor, or target names no column
    #[error("unknown dimension '{column}': no such column in the dataset")]
    UnknownDimension { column: String },

    /// Too few usable rows remain after exclusions to fit a model
    #[error("insufficient data: {usable} usable rows, at least {required} required")]
    InsufficientData { usable: usize, required: usize },

    /// IRLS exhausted its iteration cap without meeting tolerance
    #[error("model failed to converge within {iterations} iterations")]
    NonConvergence { iterations: usize },

    /// The positivity requirement on the target excluded every row
    #[error("target column '{column}' has no positive values to fit against")]
    InvalidTarget { column: String },

    /// An operation that needs rows received a dataset with none
    #[error("dataset contains no rows")]
    EmptyDataset,
}
