//! Normalization of group summaries into relative abundances.

pub mod relative;

pub use relative::{relative_abundance, ZeroRowPolicy};
