//! Group-wise relative abundance summaries for microbiome sequence tables.
//!
//! A sequence table (samples × ASVs) is joined with sample metadata on a
//! shared identifier, samples are averaged within each level of a metadata
//! category, and every feature's group means are scaled to sum to one.
//!
//! # Overview
//!
//! - **data**: Core data structures (CountMatrix, Metadata, AbundanceTable)
//! - **merge**: Joining counts with metadata and assigning groups
//! - **filter**: Sample selection (metadata values, library size)
//! - **aggregate**: Per-group mean counts
//! - **normalize**: Relative abundance across groups
//! - **profile**: Join diagnostics
//! - **pipeline**: Configuration and execution
//!
//! # Example
//!
//! ```no_run
//! use seqtab_summary::prelude::*;
//!
//! let counts = CountMatrix::from_seqtab_tsv("sequence_table.merged.txt", "row_names").unwrap();
//! let metadata = Metadata::from_tsv("map.txt", "manifest_id").unwrap();
//!
//! let table = Summary::new("body_site").run(&counts, &metadata).unwrap();
//! table
//!     .to_tsv("body_site_abund.txt", &TsvFormat::default())
//!     .unwrap();
//! ```

pub mod aggregate;
pub mod data;
pub mod error;
pub mod filter;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod profile;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::aggregate::{group_means, GroupMeans};
    pub use crate::data::{AbundanceTable, CountMatrix, Metadata, TsvFormat, Variable, VariableType};
    pub use crate::error::{Result, SummaryError};
    pub use crate::filter::{filter_library_size, filter_samples, SampleFilter, SampleFilterResult};
    pub use crate::merge::{merge_by_sample, MergedTable};
    pub use crate::normalize::{relative_abundance, ZeroRowPolicy};
    pub use crate::pipeline::{run_from_config, InputConfig, Summary, SummaryConfig};
    pub use crate::profile::{profile_join, GroupProfile, JoinProfile};
}
