//! Dataflow slicing: the query engine, the per-direction visitor, and the
//! result model.

pub mod engine;
pub mod names;
pub mod types;
pub mod visitor;

pub use engine::Slicer;
pub use types::{Criterion, SliceDirection, SliceNode, SliceResult, MAX_PASSES, MODULE_SCOPE};
