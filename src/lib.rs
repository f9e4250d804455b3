//! Dataflow slicing for Python source.
//!
//! Given a criterion `file:line:variable`, the engine computes a backward
//! slice (the statements that produced that value) and/or a forward slice
//! (the statements the value flows into), following dataflow across file
//! boundaries through import resolution.
//!
//! ```no_run
//! use dfslice::{Criterion, SliceDirection, Slicer};
//!
//! # fn main() -> dfslice::Result<()> {
//! let slicer = Slicer::new("./my_project");
//! let criterion = Criterion::new("main.py", 42, "result");
//! let result = slicer.slice(&criterion, SliceDirection::Both)?;
//! for node in result.all_nodes() {
//!     println!("{}:{} {}", node.file.display(), node.line, node.code);
//! }
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod error;
pub mod render;
pub mod resolve;
pub mod slice;

pub use error::{Result, SliceError};
pub use render::OutputFormat;
pub use slice::{Criterion, SliceDirection, SliceNode, SliceResult, Slicer};

/// One-shot convenience wrapper around [`Slicer`].
pub fn slice(
    root: impl Into<std::path::PathBuf>,
    criterion: &Criterion,
    direction: SliceDirection,
) -> Result<SliceResult> {
    Slicer::new(root).slice(criterion, direction)
}
