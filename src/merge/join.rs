//! Inner join of a count matrix and metadata on the sample identifier.

use crate::data::{sort_levels, CountMatrix, Metadata, VariableType};
use crate::error::{Result, SummaryError};
use std::collections::{HashMap, HashSet};

/// Counts restricted to joined samples, each assigned to a category group.
#[derive(Debug, Clone)]
pub struct MergedTable {
    counts: CountMatrix,
    category: String,
    levels: Vec<String>,
    /// Group index of each sample column in `counts`.
    sample_groups: Vec<usize>,
    unmatched_seqtab: Vec<String>,
    unmatched_metadata: Vec<String>,
    ungrouped: Vec<String>,
}

impl MergedTable {
    /// Counts of the grouped samples, in sequence-table order.
    pub fn counts(&self) -> &CountMatrix {
        &self.counts
    }

    /// Metadata column used for grouping.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Group labels in output order.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Number of groups.
    pub fn n_groups(&self) -> usize {
        self.levels.len()
    }

    /// Group index for each sample column.
    pub fn sample_groups(&self) -> &[usize] {
        &self.sample_groups
    }

    /// Sample column indices belonging to each group, in level order.
    pub fn group_indices(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.levels.len()];
        for (sample, &group) in self.sample_groups.iter().enumerate() {
            groups[group].push(sample);
        }
        groups
    }

    /// Number of samples in each group, in level order.
    pub fn group_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.levels.len()];
        for &group in &self.sample_groups {
            sizes[group] += 1;
        }
        sizes
    }

    /// Sequence-table samples with no metadata row.
    pub fn unmatched_seqtab(&self) -> &[String] {
        &self.unmatched_seqtab
    }

    /// Metadata samples absent from the sequence table.
    pub fn unmatched_metadata(&self) -> &[String] {
        &self.unmatched_metadata
    }

    /// Joined samples dropped because their category value is missing.
    pub fn ungrouped(&self) -> &[String] {
        &self.ungrouped
    }
}

/// Join counts with metadata and assign every joined sample to a group.
///
/// Only samples present in both inputs are kept, in sequence-table order.
/// Samples without a value for `category` are excluded from grouping.
/// Passing the metadata identifier column as `category` puts each sample
/// in its own group.
pub fn merge_by_sample(
    counts: &CountMatrix,
    metadata: &Metadata,
    category: &str,
) -> Result<MergedTable> {
    let by_id = category == metadata.id_column();
    if !by_id && !metadata.has_column(category) {
        return Err(SummaryError::missing_column(category, "metadata"));
    }

    let mut keep: Vec<usize> = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    let mut unmatched_seqtab = Vec::new();
    let mut ungrouped = Vec::new();

    for (idx, sample_id) in counts.sample_ids().iter().enumerate() {
        if !metadata.has_sample(sample_id) {
            unmatched_seqtab.push(sample_id.clone());
            continue;
        }
        let label = if by_id {
            Some(sample_id.clone())
        } else {
            metadata.label(sample_id, category)
        };
        match label {
            Some(label) => {
                keep.push(idx);
                labels.push(label);
            }
            None => ungrouped.push(sample_id.clone()),
        }
    }

    let seqtab_ids: HashSet<&str> = counts.sample_ids().iter().map(String::as_str).collect();
    let unmatched_metadata: Vec<String> = metadata
        .sample_ids()
        .iter()
        .filter(|sid| !seqtab_ids.contains(sid.as_str()))
        .cloned()
        .collect();

    if keep.is_empty() {
        let msg = if ungrouped.is_empty() {
            format!(
                "No samples shared between sequence table and metadata ('{}')",
                metadata.id_column()
            )
        } else {
            format!("No joined samples have a value for '{}'", category)
        };
        return Err(SummaryError::EmptyData(msg));
    }

    if !unmatched_seqtab.is_empty() {
        tracing::warn!(
            count = unmatched_seqtab.len(),
            "sequence table samples have no metadata and were dropped"
        );
    }
    if !ungrouped.is_empty() {
        tracing::warn!(
            count = ungrouped.len(),
            category,
            "joined samples have no category value and were dropped"
        );
    }
    tracing::debug!(
        unmatched_metadata = unmatched_metadata.len(),
        "metadata samples absent from sequence table"
    );

    let column_type = if by_id {
        Some(VariableType::Categorical)
    } else {
        metadata.column_type(category)
    };
    let mut levels: Vec<String> = labels
        .iter()
        .cloned()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    sort_levels(&mut levels, column_type);

    let level_index: HashMap<&str, usize> = levels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect();
    let sample_groups: Vec<usize> = labels.iter().map(|l| level_index[l.as_str()]).collect();

    tracing::info!(
        samples = keep.len(),
        groups = levels.len(),
        category,
        "joined sequence table with metadata"
    );

    Ok(MergedTable {
        counts: counts.subset_samples(&keep)?,
        category: category.to_string(),
        levels,
        sample_groups,
        unmatched_seqtab,
        unmatched_metadata,
        ungrouped,
    })
}
