//! ERF notification pipeline stages
//!
//! Spreadsheet → records → status filter → requester groups → drafts.
//! Each stage takes owned input and returns owned output; dispatch lives in
//! [`crate::dispatch`].

pub mod compose;
pub mod excel;
pub mod filter;
pub mod grouper;
pub mod resolve;
mod types;

pub use compose::{Composer, Renderer, Renderers};
pub use filter::{FilterOutcome, filter_by_status, status_breakdown};
pub use grouper::group_by_requester;
pub use resolve::{EmailResolver, ResolverStats};
pub use types::*;
