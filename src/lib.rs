pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod functions;
pub mod types;
pub mod utils;

pub use config::{EngineConfig, EvolutionConfig, SearchSpaceConfig};
pub use data::Dataset;
pub use engines::generation::{ModelFormat, Program, ProgramType, SearchSpace, Variation};
pub use error::{Result, TypedGpError};
pub use types::{Value, ValueKind};
