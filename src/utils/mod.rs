pub mod sampling;
pub mod stats;
