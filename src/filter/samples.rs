//! Metadata-based sample selection.

use crate::data::Metadata;
use crate::error::{Result, SummaryError};
use serde::{Deserialize, Serialize};

/// Keep or drop samples by the value of one metadata column.
///
/// A sample is kept when its value is listed in `include` (or `include` is
/// empty) and is not listed in `exclude`. Samples with a missing value are
/// kept only when `include` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleFilter {
    /// Metadata column to inspect.
    pub column: String,
    /// Values to keep.
    pub include: Vec<String>,
    /// Values to drop.
    pub exclude: Vec<String>,
}

impl SampleFilter {
    /// Keep only samples whose `column` value is one of `values`.
    pub fn include<S: AsRef<str>>(column: &str, values: &[S]) -> Self {
        Self {
            column: column.to_string(),
            include: values.iter().map(|v| v.as_ref().to_string()).collect(),
            exclude: Vec::new(),
        }
    }

    /// Drop samples whose `column` value is one of `values`.
    pub fn exclude<S: AsRef<str>>(column: &str, values: &[S]) -> Self {
        Self {
            column: column.to_string(),
            include: Vec::new(),
            exclude: values.iter().map(|v| v.as_ref().to_string()).collect(),
        }
    }

    /// Whether the filter has any effect.
    pub fn is_noop(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Decide whether a sample with the given value is kept.
    pub fn keeps(&self, value: Option<&str>) -> bool {
        match value {
            None => self.include.is_empty(),
            Some(v) => {
                (self.include.is_empty() || self.include.iter().any(|i| i == v))
                    && !self.exclude.iter().any(|e| e == v)
            }
        }
    }
}

/// Result of sample filtering with statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleFilterResult {
    /// Number of samples before filtering.
    pub n_before: usize,
    /// Number of samples after filtering.
    pub n_after: usize,
    /// Number of samples removed.
    pub n_removed: usize,
}

impl std::fmt::Display for SampleFilterResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Sample Filter Result")?;
        writeln!(f, "  Before:  {} samples", self.n_before)?;
        writeln!(f, "  After:   {} samples", self.n_after)?;
        writeln!(f, "  Removed: {} samples", self.n_removed)?;
        Ok(())
    }
}

/// Restrict metadata to the samples a [`SampleFilter`] keeps.
///
/// Filtering the metadata before the join removes the samples from the
/// summary entirely.
pub fn filter_samples(
    metadata: &Metadata,
    filter: &SampleFilter,
) -> Result<(Metadata, SampleFilterResult)> {
    let by_id = filter.column == metadata.id_column();
    if !by_id && !metadata.has_column(&filter.column) {
        return Err(SummaryError::missing_column(&filter.column, "metadata"));
    }

    let keep: Vec<String> = metadata
        .sample_ids()
        .iter()
        .filter(|sid| {
            let value = if by_id {
                Some(sid.as_str())
            } else {
                metadata.raw(sid, &filter.column)
            };
            filter.keeps(value)
        })
        .cloned()
        .collect();

    if keep.is_empty() {
        return Err(SummaryError::EmptyData(format!(
            "No samples remain after filtering on '{}'",
            filter.column
        )));
    }

    let stats = SampleFilterResult {
        n_before: metadata.n_samples(),
        n_after: keep.len(),
        n_removed: metadata.n_samples() - keep.len(),
    };
    tracing::info!(
        column = %filter.column,
        kept = stats.n_after,
        removed = stats.n_removed,
        "filtered samples"
    );

    Ok((metadata.subset_samples(&keep)?, stats))
}
