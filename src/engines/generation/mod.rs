pub mod ast;
pub mod node;
pub mod operators;
pub mod population;
pub mod program;
pub mod ptc2;
pub mod search_space;
pub mod variation;

pub use ast::{NodeId, Tree};
pub use node::{Node, NodeRecord};
pub use operators::{crossover, MutationKind};
pub use population::{initial_population, offspring};
pub use program::{ModelFormat, Program, ProgramType};
pub use search_space::SearchSpace;
pub use variation::Variation;
