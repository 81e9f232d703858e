//! Sample metadata keyed by an identifier column.

use super::abundance::float_repr;
use crate::error::{Result, SummaryError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Cell values treated as missing when loading metadata.
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "na", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "<NA>", "#N/A",
];

/// A variable value that can be categorical or continuous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        matches!(self, Variable::Missing)
    }

    /// Try to get as categorical string.
    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            Variable::Categorical(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as continuous f64.
    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            _ => None,
        }
    }
}

/// Inferred type of a metadata column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

#[derive(Debug, Clone)]
struct Cell {
    raw: String,
    value: Variable,
}

/// Sample metadata containing variables for each sample.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Name of the identifier column.
    id_column: String,
    /// Sample IDs in file order.
    sample_ids: Vec<String>,
    /// Variable column names, excluding the identifier column.
    column_names: Vec<String>,
    /// sample_id -> column_name -> cell.
    data: HashMap<String, HashMap<String, Cell>>,
    /// Inferred type of each column.
    column_types: HashMap<String, VariableType>,
    /// Continuous columns holding only integers with no missing cells.
    integer_columns: HashSet<String>,
}

impl Metadata {
    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names
    /// - `id_column` (e.g. `manifest_id`) holds the sample identifier and may
    ///   appear at any position
    ///
    /// Columns are inferred as continuous if all non-missing values parse as
    /// numbers, otherwise categorical. Rows with an empty identifier are skipped.
    pub fn from_tsv<P: AsRef<Path>>(path: P, id_column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        let id_idx = header
            .iter()
            .position(|h| h == id_column)
            .ok_or_else(|| SummaryError::missing_column(id_column, "metadata"))?;
        let columns: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != id_idx)
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        // First pass: collect raw values to infer types
        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for record in reader.records() {
            let record = record?;
            let sample_id = record.get(id_idx).unwrap_or("").trim().to_string();
            if sample_id.is_empty() {
                tracing::debug!("skipping metadata row without {}", id_column);
                continue;
            }
            if !seen.insert(sample_id.clone()) {
                return Err(SummaryError::DuplicateSample(sample_id));
            }
            let values: Vec<String> = columns
                .iter()
                .map(|(i, _)| record.get(*i).unwrap_or("").trim().to_string())
                .collect();
            raw_data.push((sample_id, values));
        }

        if raw_data.is_empty() {
            return Err(SummaryError::EmptyData("No samples in metadata".to_string()));
        }

        let column_names: Vec<String> = columns.into_iter().map(|(_, name)| name).collect();

        let mut column_types = HashMap::new();
        let mut integer_columns = HashSet::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            if raw_data
                .iter()
                .all(|(_, values)| values[col_idx].parse::<i64>().is_ok())
            {
                integer_columns.insert(col_name.clone());
            }
            let all_numeric = raw_data.iter().all(|(_, values)| {
                let v = values[col_idx].as_str();
                is_missing_token(v) || v.parse::<f64>().is_ok()
            });
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };
            column_types.insert(col_name.clone(), var_type);
        }

        let mut sample_ids = Vec::with_capacity(raw_data.len());
        let mut data = HashMap::with_capacity(raw_data.len());

        for (sample_id, values) in raw_data {
            let mut sample_data = HashMap::with_capacity(column_names.len());
            for (col_name, raw) in column_names.iter().zip(values) {
                let value = if is_missing_token(&raw) {
                    Variable::Missing
                } else {
                    match column_types.get(col_name) {
                        Some(VariableType::Continuous) => raw
                            .parse::<f64>()
                            .map(Variable::Continuous)
                            .unwrap_or(Variable::Missing),
                        Some(VariableType::Categorical) | None => {
                            Variable::Categorical(raw.clone())
                        }
                    }
                };
                sample_data.insert(col_name.clone(), Cell { raw, value });
            }
            sample_ids.push(sample_id.clone());
            data.insert(sample_id, sample_data);
        }

        tracing::debug!(
            samples = sample_ids.len(),
            columns = column_names.len(),
            "loaded metadata"
        );

        Ok(Self {
            id_column: id_column.to_string(),
            sample_ids,
            column_names,
            data,
            column_types,
            integer_columns,
        })
    }

    /// Name of the identifier column.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names, excluding the identifier column.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data
            .get(sample_id)
            .and_then(|m| m.get(column))
            .map(|c| &c.value)
    }

    /// Get the cell text for a sample and column, or `None` if missing.
    pub fn raw(&self, sample_id: &str, column: &str) -> Option<&str> {
        self.data
            .get(sample_id)
            .and_then(|m| m.get(column))
            .filter(|c| !c.value.is_missing())
            .map(|c| c.raw.as_str())
    }

    /// Group label of a sample for a column, or `None` if missing.
    ///
    /// Continuous values are rendered from the parsed number, so `1` and
    /// `1.0` share a label. Integer columns print as integers; numeric
    /// columns with decimals or missing cells print as floats (`1.0`, `1e-05`).
    pub fn label(&self, sample_id: &str, column: &str) -> Option<String> {
        let cell = self.data.get(sample_id)?.get(column)?;
        match &cell.value {
            Variable::Missing => None,
            Variable::Categorical(s) => Some(s.clone()),
            Variable::Continuous(v) if self.integer_columns.contains(column) => Some(
                cell.raw
                    .parse::<i64>()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|_| float_repr(*v)),
            ),
            Variable::Continuous(v) => Some(float_repr(*v)),
        }
    }

    /// Get all values for a column, in sample order.
    pub fn column(&self, column: &str) -> Result<Vec<&Variable>> {
        if !self.has_column(column) {
            return Err(SummaryError::missing_column(column, "metadata"));
        }
        Ok(self
            .sample_ids
            .iter()
            .map(|sid| self.get(sid, column).unwrap_or(&Variable::Missing))
            .collect())
    }

    /// Get the type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Distinct non-missing values of a column.
    ///
    /// Continuous columns are ordered numerically, categorical columns
    /// lexicographically.
    pub fn levels(&self, column: &str) -> Result<Vec<String>> {
        if !self.has_column(column) {
            return Err(SummaryError::missing_column(column, "metadata"));
        }
        let levels: HashSet<String> = self
            .sample_ids
            .iter()
            .filter_map(|sid| self.label(sid, column))
            .collect();
        let mut levels: Vec<String> = levels.into_iter().collect();
        sort_levels(&mut levels, self.column_type(column));
        Ok(levels)
    }

    /// Subset metadata to only include specified samples.
    pub fn subset_samples(&self, sample_ids: &[String]) -> Result<Self> {
        let mut new_data = HashMap::with_capacity(sample_ids.len());
        let mut new_sample_ids = Vec::with_capacity(sample_ids.len());

        for sid in sample_ids {
            match self.data.get(sid) {
                Some(sample_data) => {
                    new_data.insert(sid.clone(), sample_data.clone());
                    new_sample_ids.push(sid.clone());
                }
                None => {
                    return Err(SummaryError::SampleMismatch(format!(
                        "Sample '{}' not found in metadata",
                        sid
                    )))
                }
            }
        }

        Ok(Self {
            id_column: self.id_column.clone(),
            sample_ids: new_sample_ids,
            column_names: self.column_names.clone(),
            data: new_data,
            column_types: self.column_types.clone(),
            integer_columns: self.integer_columns.clone(),
        })
    }

    /// Check if a sample exists.
    pub fn has_sample(&self, sample_id: &str) -> bool {
        self.data.contains_key(sample_id)
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }
}

fn is_missing_token(value: &str) -> bool {
    MISSING_TOKENS.contains(&value)
}

/// Order group labels the way a group-by on the column would.
pub(crate) fn sort_levels(levels: &mut [String], column_type: Option<VariableType>) {
    match column_type {
        Some(VariableType::Continuous) => levels.sort_by(|a, b| {
            match (a.parse::<f64>(), b.parse::<f64>()) {
                (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b)),
                _ => a.cmp(b),
            }
        }),
        _ => levels.sort(),
    }
}
