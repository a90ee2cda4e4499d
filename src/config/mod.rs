pub mod evolution;
pub mod manager;
pub mod search_space;
pub mod traits;

pub use evolution::{EvolutionConfig, MutationProbs};
pub use manager::{ConfigManager, EngineConfig};
pub use search_space::SearchSpaceConfig;
pub use traits::ConfigSection;
