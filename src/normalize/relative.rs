//! Relative abundance of each feature across groups.
//!
//! Group means are transposed to features × groups and every row is divided
//! by its total, so a feature's values describe how its abundance is
//! distributed over the groups of the category.

use crate::aggregate::GroupMeans;
use crate::data::AbundanceTable;
use crate::error::{Result, SummaryError};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Handling of features whose group means are all zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroRowPolicy {
    /// Keep the row with undefined (blank) values.
    #[default]
    Empty,
    /// Keep the row with every value set to zero.
    Zero,
    /// Remove the row.
    Drop,
}

/// Divide each feature's group means by their sum.
///
/// # Formula
/// For feature i and group g: RA(i, g) = mean(i, g) / sum_h mean(i, h)
///
/// # Arguments
/// * `means` - Group means (features × groups)
/// * `zero_rows` - What to do with features absent from every group
///
/// # Returns
/// An AbundanceTable whose defined rows each sum to 1.
pub fn relative_abundance(means: &GroupMeans, zero_rows: ZeroRowPolicy) -> Result<AbundanceTable> {
    let n_features = means.n_features();
    let n_groups = means.n_groups();

    if n_features == 0 || n_groups == 0 {
        return Err(SummaryError::EmptyData(
            "Cannot normalize an empty table".to_string(),
        ));
    }

    let rows: Vec<Option<Vec<f64>>> = (0..n_features)
        .into_par_iter()
        .map(|i| {
            let row: Vec<f64> = (0..n_groups).map(|g| means.get(i, g)).collect();
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                Some(row.iter().map(|&v| v / total).collect())
            } else {
                match zero_rows {
                    ZeroRowPolicy::Empty => Some(vec![f64::NAN; n_groups]),
                    ZeroRowPolicy::Zero => Some(vec![0.0; n_groups]),
                    ZeroRowPolicy::Drop => None,
                }
            }
        })
        .collect();

    let n_zero = rows
        .iter()
        .enumerate()
        .filter(|(i, _)| (0..n_groups).all(|g| means.get(*i, g) == 0.0))
        .count();
    if n_zero > 0 {
        tracing::debug!(features = n_zero, policy = ?zero_rows, "features absent from every group");
    }

    let kept: Vec<(usize, Vec<f64>)> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| row.map(|r| (i, r)))
        .collect();

    if kept.is_empty() {
        return Err(SummaryError::EmptyData(
            "No features have counts in any group".to_string(),
        ));
    }

    let mut data = DMatrix::zeros(kept.len(), n_groups);
    let mut feature_ids = Vec::with_capacity(kept.len());
    for (row_idx, (i, row)) in kept.iter().enumerate() {
        feature_ids.push(means.feature_ids[*i].clone());
        for (g, &val) in row.iter().enumerate() {
            data[(row_idx, g)] = val;
        }
    }

    Ok(AbundanceTable {
        data,
        feature_ids,
        group_labels: means.group_labels.clone(),
        category: means.category.clone(),
    })
}
