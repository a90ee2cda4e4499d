pub mod nodetype;
pub mod primitives;
pub mod registry;
pub mod signatures;

pub use nodetype::{KindSet, NodeKind};
pub use registry::{DispatchTable, WeightOverrides};
pub use signatures::{signatures, Signature, MAX_ARITY, MAX_NARY_ARGS};
