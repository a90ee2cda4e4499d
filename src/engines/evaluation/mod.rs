pub mod expression;
pub mod split;

pub use split::{best_split, best_threshold};
