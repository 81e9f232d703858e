//! Sample filtering applied before aggregation.

pub mod library_size;
pub mod samples;

pub use library_size::filter_library_size;
pub use samples::{filter_samples, SampleFilter, SampleFilterResult};
