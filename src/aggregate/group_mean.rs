//! Per-group mean counts for every feature.

use crate::error::{Result, SummaryError};
use crate::merge::MergedTable;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::Serialize;

/// Mean count of each feature within each group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupMeans {
    /// Mean counts (features × groups).
    #[serde(skip)]
    pub data: DMatrix<f64>,
    /// Feature identifiers.
    pub feature_ids: Vec<String>,
    /// Group labels, one per column.
    pub group_labels: Vec<String>,
    /// Number of samples averaged in each group.
    pub group_sizes: Vec<usize>,
    /// Metadata column the groups were drawn from.
    pub category: String,
}

impl GroupMeans {
    /// Get the mean for a feature and group.
    pub fn get(&self, feature: usize, group: usize) -> f64 {
        self.data[(feature, group)]
    }

    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.data.nrows()
    }

    /// Number of groups.
    pub fn n_groups(&self) -> usize {
        self.data.ncols()
    }
}

/// Average the counts of every feature over the samples of each group.
///
/// # Formula
/// For feature i and group g with samples S_g: mean(i, g) = sum_{j in S_g} x_ij / |S_g|
pub fn group_means(merged: &MergedTable) -> Result<GroupMeans> {
    let counts = merged.counts();
    let n_features = counts.n_features();
    let n_groups = merged.n_groups();

    if n_features == 0 || n_groups == 0 {
        return Err(SummaryError::EmptyData(
            "Cannot average an empty table".to_string(),
        ));
    }

    let groups = merged.sample_groups();
    let group_sizes = merged.group_sizes();

    let rows: Vec<Vec<f64>> = (0..n_features)
        .into_par_iter()
        .map(|i| {
            let mut sums = vec![0u64; n_groups];
            for (j, value) in counts.row_dense(i).into_iter().enumerate() {
                sums[groups[j]] += value;
            }
            sums.iter()
                .zip(&group_sizes)
                .map(|(&sum, &size)| sum as f64 / size as f64)
                .collect()
        })
        .collect();

    let mut data = DMatrix::zeros(n_features, n_groups);
    for (i, row) in rows.iter().enumerate() {
        for (g, &val) in row.iter().enumerate() {
            data[(i, g)] = val;
        }
    }

    tracing::debug!(features = n_features, groups = n_groups, "computed group means");

    Ok(GroupMeans {
        data,
        feature_ids: counts.feature_ids().to_vec(),
        group_labels: merged.levels().to_vec(),
        group_sizes,
        category: merged.category().to_string(),
    })
}
