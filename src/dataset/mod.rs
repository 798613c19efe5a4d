//! Tabular dataset structures and CSV ingestion

mod table;
pub mod loader;

pub use table::{Dataset, Value};
pub use loader::{load_dataset, load_dataset_from_reader};
