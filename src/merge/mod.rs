//! Joining sequence tables with sample metadata.

mod join;

pub use join::{merge_by_sample, MergedTable};
