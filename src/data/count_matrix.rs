//! Count matrix with sparse storage for sequence-table abundances.

use crate::error::{Result, SummaryError};
use sprs::{CsMat, TriMat};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A sparse count matrix storing feature abundances across samples.
///
/// Rows represent features (ASVs/taxa), columns represent samples.
/// Uses CSR (Compressed Sparse Row) format for efficient row-wise operations.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    /// Sparse matrix in CSR format (features × samples)
    data: CsMat<u64>,
    /// Feature identifiers (row names)
    feature_ids: Vec<String>,
    /// Sample identifiers (column names)
    sample_ids: Vec<String>,
}

impl CountMatrix {
    /// Create a new CountMatrix from a sparse matrix and identifiers.
    pub fn new(
        data: CsMat<u64>,
        feature_ids: Vec<String>,
        sample_ids: Vec<String>,
    ) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != feature_ids.len() {
            return Err(SummaryError::DimensionMismatch {
                expected: nrows,
                actual: feature_ids.len(),
            });
        }
        if ncols != sample_ids.len() {
            return Err(SummaryError::DimensionMismatch {
                expected: ncols,
                actual: sample_ids.len(),
            });
        }
        Ok(Self {
            data,
            feature_ids,
            sample_ids,
        })
    }

    /// Load a sample-major sequence table from a TSV file.
    ///
    /// Expected format:
    /// - First row: header naming every column
    /// - `id_column` holds the sample identifier (e.g. `row_names`)
    /// - Every other column is a feature with one integer count per sample
    ///
    /// The table is transposed on load so that features become rows.
    pub fn from_seqtab_tsv<P: AsRef<Path>>(path: P, id_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        let id_idx = header
            .iter()
            .position(|h| h == id_column)
            .ok_or_else(|| SummaryError::missing_column(id_column, "sequence table"))?;
        let feature_ids: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_idx)
            .map(|(_, h)| h.to_string())
            .collect();
        if feature_ids.is_empty() {
            return Err(SummaryError::EmptyData(
                "Sequence table has no feature columns".to_string(),
            ));
        }

        let mut triplets: Vec<(usize, usize, u64)> = Vec::new();
        let mut sample_ids: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let sample_id = record
                .get(id_idx)
                .ok_or(SummaryError::DimensionMismatch {
                    expected: header.len(),
                    actual: record.len(),
                })?
                .trim()
                .to_string();
            if !seen.insert(sample_id.clone()) {
                return Err(SummaryError::DuplicateSample(sample_id));
            }
            let col = sample_ids.len();
            sample_ids.push(sample_id);

            let counts = record
                .iter()
                .enumerate()
                .filter(|(field_idx, _)| *field_idx != id_idx)
                .map(|(_, value)| value);
            for (feature, value_str) in counts.enumerate() {
                let value = parse_count(value_str).ok_or_else(|| SummaryError::InvalidCount {
                    value: value_str.to_string(),
                    row: row_idx,
                    column: feature_ids[feature].clone(),
                })?;
                if value > 0 {
                    triplets.push((feature, col, value));
                }
            }
        }

        if sample_ids.is_empty() {
            return Err(SummaryError::EmptyData(
                "No samples in sequence table".to_string(),
            ));
        }

        let mut tri_mat = TriMat::new((feature_ids.len(), sample_ids.len()));
        for (row, col, val) in triplets {
            tri_mat.add_triplet(row, col, val);
        }

        Self::new(tri_mat.to_csr(), feature_ids, sample_ids)
    }

    /// Get the value at (row, col), returning 0 for missing entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data.get(row, col).copied().unwrap_or(0)
    }

    /// Number of features (rows).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.data.rows()
    }

    /// Number of samples (columns).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.cols()
    }

    /// Feature identifiers.
    #[inline]
    pub fn feature_ids(&self) -> &[String] {
        &self.feature_ids
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get a dense vector for a specific row (feature).
    pub fn row_dense(&self, row: usize) -> Vec<u64> {
        let mut dense = vec![0u64; self.n_samples()];
        if let Some(row_vec) = self.data.outer_view(row) {
            for (col, &val) in row_vec.iter() {
                dense[col] = val;
            }
        }
        dense
    }

    /// Compute column sums (library sizes per sample).
    pub fn col_sums(&self) -> Vec<u64> {
        let mut sums = vec![0u64; self.n_samples()];
        for row_vec in self.data.outer_iterator() {
            for (col, &val) in row_vec.iter() {
                sums[col] += val;
            }
        }
        sums
    }

    /// Subset the matrix to include only specified samples (by index).
    ///
    /// Samples appear in the order given by `indices`.
    pub fn subset_samples(&self, indices: &[usize]) -> Result<Self> {
        let n_features = self.n_features();
        let n_samples = indices.len();

        let col_map: HashMap<usize, usize> = indices
            .iter()
            .enumerate()
            .map(|(new_idx, &old_idx)| (old_idx, new_idx))
            .collect();

        let mut new_sample_ids = Vec::with_capacity(n_samples);
        for &old_col in indices {
            if old_col >= self.n_samples() {
                return Err(SummaryError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    old_col
                )));
            }
            new_sample_ids.push(self.sample_ids[old_col].clone());
        }

        let mut tri_mat = TriMat::new((n_features, n_samples));
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (old_col, &val) in row_vec.iter() {
                if let Some(&new_col) = col_map.get(&old_col) {
                    tri_mat.add_triplet(row, new_col, val);
                }
            }
        }

        Self::new(tri_mat.to_csr(), self.feature_ids.clone(), new_sample_ids)
    }
}

/// Parse a count cell. Integral decimals such as `12.0` are accepted.
fn parse_count(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<u64>() {
        return Some(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_matrix() -> CountMatrix {
        // 3 features × 4 samples
        let mut tri_mat = TriMat::new((3, 4));
        tri_mat.add_triplet(0, 0, 10);
        tri_mat.add_triplet(0, 1, 20);
        tri_mat.add_triplet(0, 3, 5);
        tri_mat.add_triplet(1, 0, 100);
        tri_mat.add_triplet(1, 1, 200);
        tri_mat.add_triplet(1, 2, 150);
        tri_mat.add_triplet(1, 3, 175);
        tri_mat.add_triplet(2, 0, 1);

        let feature_ids = vec!["asv_A".to_string(), "asv_B".to_string(), "asv_C".to_string()];
        let sample_ids = vec![
            "sample1".to_string(),
            "sample2".to_string(),
            "sample3".to_string(),
            "sample4".to_string(),
        ];

        CountMatrix::new(tri_mat.to_csr(), feature_ids, sample_ids).unwrap()
    }

    fn write_seqtab(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_dimensions() {
        let mat = create_test_matrix();
        assert_eq!(mat.n_features(), 3);
        assert_eq!(mat.n_samples(), 4);
    }

    #[test]
    fn test_get_values() {
        let mat = create_test_matrix();
        assert_eq!(mat.get(0, 0), 10);
        assert_eq!(mat.get(0, 2), 0);
        assert_eq!(mat.get(2, 1), 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let tri_mat: TriMat<u64> = TriMat::new((2, 2));
        let result = CountMatrix::new(tri_mat.to_csr(), vec!["a".into()], vec!["s1".into(), "s2".into()]);
        assert!(matches!(result, Err(SummaryError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_row_dense_and_col_sums() {
        let mat = create_test_matrix();
        assert_eq!(mat.row_dense(0), vec![10, 20, 0, 5]);
        assert_eq!(mat.col_sums(), vec![111, 220, 150, 180]);
    }

    #[test]
    fn test_load_seqtab_transposes() {
        let file = write_seqtab(&[
            "row_names\tASV1\tASV2\tASV3",
            "S1\t10\t0\t5",
            "S2\t3\t7\t0",
        ]);
        let mat = CountMatrix::from_seqtab_tsv(file.path(), "row_names").unwrap();

        assert_eq!(mat.n_features(), 3);
        assert_eq!(mat.n_samples(), 2);
        assert_eq!(mat.feature_ids(), &["ASV1", "ASV2", "ASV3"]);
        assert_eq!(mat.sample_ids(), &["S1", "S2"]);
        assert_eq!(mat.get(0, 0), 10);
        assert_eq!(mat.get(1, 1), 7);
        assert_eq!(mat.get(2, 1), 0);
    }

    #[test]
    fn test_load_seqtab_id_column_not_first() {
        let file = write_seqtab(&["ASV1\trow_names\tASV2", "4\tS1\t6"]);
        let mat = CountMatrix::from_seqtab_tsv(file.path(), "row_names").unwrap();

        assert_eq!(mat.feature_ids(), &["ASV1", "ASV2"]);
        assert_eq!(mat.sample_ids(), &["S1"]);
        assert_eq!(mat.row_dense(1), vec![6]);
    }

    #[test]
    fn test_load_seqtab_quoted_header() {
        let file = write_seqtab(&["\"row_names\"\t\"ASV1\"", "\"S1\"\t2.0"]);
        let mat = CountMatrix::from_seqtab_tsv(file.path(), "row_names").unwrap();
        assert_eq!(mat.sample_ids(), &["S1"]);
        assert_eq!(mat.get(0, 0), 2);
    }

    #[test]
    fn test_load_seqtab_missing_id_column() {
        let file = write_seqtab(&["sample\tASV1", "S1\t1"]);
        let result = CountMatrix::from_seqtab_tsv(file.path(), "row_names");
        assert!(matches!(result, Err(SummaryError::MissingColumn { .. })));
    }

    #[test]
    fn test_load_seqtab_invalid_count() {
        let file = write_seqtab(&["row_names\tASV1\tASV2", "S1\t1\tabc"]);
        match CountMatrix::from_seqtab_tsv(file.path(), "row_names") {
            Err(SummaryError::InvalidCount { value, row, column }) => {
                assert_eq!(value, "abc");
                assert_eq!(row, 0);
                assert_eq!(column, "ASV2");
            }
            other => panic!("expected InvalidCount, got {:?}", other),
        }
    }

    #[test]
    fn test_load_seqtab_rejects_fractional_and_negative() {
        let file = write_seqtab(&["row_names\tASV1", "S1\t1.5"]);
        assert!(CountMatrix::from_seqtab_tsv(file.path(), "row_names").is_err());

        let file = write_seqtab(&["row_names\tASV1", "S1\t-3"]);
        assert!(CountMatrix::from_seqtab_tsv(file.path(), "row_names").is_err());
    }

    #[test]
    fn test_load_seqtab_duplicate_sample() {
        let file = write_seqtab(&["row_names\tASV1", "S1\t1", "S1\t2"]);
        let result = CountMatrix::from_seqtab_tsv(file.path(), "row_names");
        assert!(matches!(result, Err(SummaryError::DuplicateSample(ref s)) if s == "S1"));
    }

    #[test]
    fn test_load_seqtab_no_samples() {
        let file = write_seqtab(&["row_names\tASV1"]);
        let result = CountMatrix::from_seqtab_tsv(file.path(), "row_names");
        assert!(matches!(result, Err(SummaryError::EmptyData(_))));
    }

    #[test]
    fn test_load_seqtab_no_features() {
        let file = write_seqtab(&["row_names", "S1", "S2"]);
        let result = CountMatrix::from_seqtab_tsv(file.path(), "row_names");
        assert!(matches!(result, Err(SummaryError::EmptyData(_))));
    }

    #[test]
    fn test_load_seqtab_ragged_row() {
        let file = write_seqtab(&["row_names\tASV1\tASV2", "S1\t1\t2", "S2\t3"]);
        let result = CountMatrix::from_seqtab_tsv(file.path(), "row_names");
        assert!(matches!(result, Err(SummaryError::Csv(_))));
    }

    #[test]
    fn test_subset_samples_reorders() {
        let mat = create_test_matrix();
        let subset = mat.subset_samples(&[3, 1]).unwrap();

        assert_eq!(subset.n_features(), 3);
        assert_eq!(subset.n_samples(), 2);
        assert_eq!(subset.sample_ids(), &["sample4", "sample2"]);
        assert_eq!(subset.get(0, 0), 5);
        assert_eq!(subset.get(0, 1), 20);
    }

    #[test]
    fn test_subset_samples_out_of_bounds() {
        let mat = create_test_matrix();
        assert!(mat.subset_samples(&[7]).is_err());
    }
}
