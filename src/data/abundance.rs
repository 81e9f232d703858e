//! Relative abundance table produced by a group-wise summary.

use crate::error::Result;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Formatting options for writing an [`AbundanceTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsvFormat {
    /// Fixed number of decimals. `None` writes the shortest exact representation.
    pub precision: Option<usize>,
    /// Text of the top-left header cell (the feature column label).
    pub index_label: String,
}

/// Relative abundances of each feature across the groups of a category.
///
/// Rows are features, columns are group levels. Undefined cells (features
/// with no counts in any group) hold `NaN`.
#[derive(Debug, Clone, Serialize)]
pub struct AbundanceTable {
    /// Values (features × groups).
    #[serde(skip)]
    pub data: DMatrix<f64>,
    /// Feature identifiers.
    pub feature_ids: Vec<String>,
    /// Group labels, one per column.
    pub group_labels: Vec<String>,
    /// Metadata column the groups were drawn from.
    pub category: String,
}

impl AbundanceTable {
    /// Get the value for a feature and group.
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

    /// Get a row (feature) as a vector.
    pub fn row(&self, feature: usize) -> Vec<f64> {
        self.data.row(feature).iter().cloned().collect()
    }

    /// Sum of a feature's values across groups.
    pub fn row_sum(&self, feature: usize) -> f64 {
        self.data.row(feature).sum()
    }

    /// Index of a group label.
    pub fn group_index(&self, label: &str) -> Option<usize> {
        self.group_labels.iter().position(|g| g == label)
    }

    /// Index of a feature identifier.
    pub fn feature_index(&self, feature_id: &str) -> Option<usize> {
        self.feature_ids.iter().position(|f| f == feature_id)
    }

    /// Get reference to the underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Write the table as TSV to any writer.
    pub fn write_tsv<W: Write>(&self, writer: &mut W, format: &TsvFormat) -> Result<()> {
        write!(writer, "{}", format.index_label)?;
        for label in &self.group_labels {
            write!(writer, "\t{}", label)?;
        }
        writeln!(writer)?;

        for (row_idx, feature_id) in self.feature_ids.iter().enumerate() {
            write!(writer, "{}", feature_id)?;
            for col_idx in 0..self.n_groups() {
                write!(writer, "\t{}", format_value(self.get(row_idx, col_idx), format.precision))?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Write the table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P, format: &TsvFormat) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_tsv(&mut writer, format)?;
        writer.flush()?;
        Ok(())
    }
}

fn format_value(value: f64, precision: Option<usize>) -> String {
    if !value.is_finite() {
        return String::new();
    }
    match precision {
        Some(p) => format!("{:.*}", p, value),
        None => float_repr(value),
    }
}

/// Shortest round-trip text for a float, in the form pandas writes it.
///
/// Integral values keep a trailing `.0`. Magnitudes below `1e-4` or from
/// `1e16` up use exponent notation with a signed two-digit exponent
/// (`1e-05`, `1.5e+16`).
pub(crate) fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return format!("{:.1}", value);
    }

    let sci = format!("{:e}", value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if (-4..16).contains(&exponent) {
        if value.fract() == 0.0 {
            format!("{:.1}", value)
        } else {
            format!("{}", value)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}
