//! Library size-based filtering for samples.

use crate::data::CountMatrix;
use crate::error::{Result, SummaryError};

/// Filter samples by library size (total counts).
///
/// Removes samples with total counts below or above specified thresholds,
/// so that shallow samples do not dominate their group's mean.
///
/// # Arguments
/// * `counts` - The count matrix to filter
/// * `min_reads` - Minimum total reads per sample (None for no minimum)
/// * `max_reads` - Maximum total reads per sample (None for no maximum)
///
/// # Returns
/// A new CountMatrix containing only samples meeting the criteria.
pub fn filter_library_size(
    counts: &CountMatrix,
    min_reads: Option<u64>,
    max_reads: Option<u64>,
) -> Result<CountMatrix> {
    if let (Some(min), Some(max)) = (min_reads, max_reads) {
        if max < min {
            return Err(SummaryError::InvalidParameter(
                "max_reads cannot be less than min_reads".to_string(),
            ));
        }
    }

    let col_sums = counts.col_sums();
    let min = min_reads.unwrap_or(0);
    let max = max_reads.unwrap_or(u64::MAX);

    let keep_indices: Vec<usize> = col_sums
        .iter()
        .enumerate()
        .filter(|(_, &sum)| sum >= min && sum <= max)
        .map(|(i, _)| i)
        .collect();

    if keep_indices.is_empty() {
        return Err(SummaryError::EmptyData(format!(
            "No samples have library size between {} and {}",
            min, max
        )));
    }

    let removed = counts.n_samples() - keep_indices.len();
    if removed > 0 {
        tracing::info!(removed, min, max, "dropped samples outside library size range");
    }

    counts.subset_samples(&keep_indices)
}
