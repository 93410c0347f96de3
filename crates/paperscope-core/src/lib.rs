//! paperscope-core: typed document model for academic papers.
//!
//! This crate provides the tree that every reader produces and every
//! downstream stage (citation resolution, fidelity scoring, rendering)
//! consumes: metadata, a section hierarchy, equation/table/figure blocks,
//! citation markers and bibliography entries.

mod block;
mod citation;
mod document;
mod fidelity;
mod index;
mod text;
mod traits;

pub use block::*;
pub use citation::*;
pub use document::*;
pub use fidelity::*;
pub use index::*;
pub use text::*;
pub use traits::*;
