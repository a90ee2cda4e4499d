pub mod connectors;
pub mod dataset;

pub use connectors::{CsvConnector, DataValidator};
pub use dataset::Dataset;
