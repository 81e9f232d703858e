//! Reduction of samples to per-group summaries.

pub mod group_mean;

pub use group_mean::{group_means, GroupMeans};
