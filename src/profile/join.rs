//! Profiling of the sequence table / metadata join.

use crate::data::{CountMatrix, Metadata};
use crate::error::Result;
use crate::merge::merge_by_sample;
use serde::{Deserialize, Serialize};

/// How many identifiers to list per category in text output.
const DISPLAY_LIMIT: usize = 10;

/// Sample and read totals for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupProfile {
    /// Group label.
    pub label: String,
    /// Number of samples in the group.
    pub n_samples: usize,
    /// Total reads over the group's samples.
    pub total_reads: u64,
    /// Mean reads per sample.
    pub mean_reads: f64,
}

/// Profile of how a sequence table and metadata line up for a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinProfile {
    /// Grouping column.
    pub category: String,
    /// Number of features in the sequence table.
    pub n_features: usize,
    /// Samples in the sequence table.
    pub n_seqtab_samples: usize,
    /// Samples in the metadata.
    pub n_metadata_samples: usize,
    /// Samples present in both.
    pub n_matched: usize,
    /// Matched samples with a category value.
    pub n_grouped: usize,
    /// Sequence-table samples without metadata.
    pub unmatched_seqtab: Vec<String>,
    /// Metadata samples without sequences.
    pub unmatched_metadata: Vec<String>,
    /// Matched samples missing the category value.
    pub ungrouped: Vec<String>,
    /// Per-group totals, in output column order.
    pub groups: Vec<GroupProfile>,
}

impl JoinProfile {
    /// Whether every sample on both sides took part in the summary.
    pub fn is_complete(&self) -> bool {
        self.unmatched_seqtab.is_empty()
            && self.unmatched_metadata.is_empty()
            && self.ungrouped.is_empty()
    }
}

fn write_ids(f: &mut std::fmt::Formatter<'_>, label: &str, ids: &[String]) -> std::fmt::Result {
    if ids.is_empty() {
        return Ok(());
    }
    let shown: Vec<&str> = ids.iter().take(DISPLAY_LIMIT).map(String::as_str).collect();
    let more = ids.len().saturating_sub(DISPLAY_LIMIT);
    if more > 0 {
        writeln!(f, "  {}: {} (+{} more)", label, shown.join(", "), more)
    } else {
        writeln!(f, "  {}: {}", label, shown.join(", "))
    }
}

impl std::fmt::Display for JoinProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Join Profile ({})", self.category)?;
        writeln!(f, "  Features:          {}", self.n_features)?;
        writeln!(f, "  Sequence samples:  {}", self.n_seqtab_samples)?;
        writeln!(f, "  Metadata samples:  {}", self.n_metadata_samples)?;
        writeln!(f, "  Matched:           {}", self.n_matched)?;
        writeln!(f, "  Grouped:           {}", self.n_grouped)?;
        write_ids(f, "No metadata", &self.unmatched_seqtab)?;
        write_ids(f, "No sequences", &self.unmatched_metadata)?;
        write_ids(f, "No category value", &self.ungrouped)?;
        writeln!(f, "  Groups:")?;
        for g in &self.groups {
            writeln!(
                f,
                "    {}: {} samples, {} reads (mean {:.0})",
                g.label, g.n_samples, g.total_reads, g.mean_reads
            )?;
        }
        Ok(())
    }
}

/// Profile the join of `counts` and `metadata` on `category`.
pub fn profile_join(counts: &CountMatrix, metadata: &Metadata, category: &str) -> Result<JoinProfile> {
    let merged = merge_by_sample(counts, metadata, category)?;
    let library_sizes = merged.counts().col_sums();

    let groups: Vec<GroupProfile> = merged
        .levels()
        .iter()
        .zip(merged.group_indices())
        .map(|(label, indices)| {
            let total_reads: u64 = indices.iter().map(|&j| library_sizes[j]).sum();
            GroupProfile {
                label: label.clone(),
                n_samples: indices.len(),
                total_reads,
                mean_reads: total_reads as f64 / indices.len() as f64,
            }
        })
        .collect();

    let n_grouped = merged.counts().n_samples();
    Ok(JoinProfile {
        category: category.to_string(),
        n_features: counts.n_features(),
        n_seqtab_samples: counts.n_samples(),
        n_metadata_samples: metadata.n_samples(),
        n_matched: n_grouped + merged.ungrouped().len(),
        n_grouped,
        unmatched_seqtab: merged.unmatched_seqtab().to_vec(),
        unmatched_metadata: merged.unmatched_metadata().to_vec(),
        ungrouped: merged.ungrouped().to_vec(),
        groups,
    })
}
