//! Per-record derived loss metrics

mod buckets;
mod derive;

pub use buckets::{DriverAgeBucket, VehicleAgeBucket};
pub use derive::{derive, DeriveConfig, EnrichedRecord};
