//! Summary configuration and execution.

use crate::aggregate::group_means;
use crate::data::{AbundanceTable, CountMatrix, Metadata, TsvFormat};
use crate::error::{Result, SummaryError};
use crate::filter::{filter_library_size, filter_samples, SampleFilter};
use crate::merge::merge_by_sample;
use crate::normalize::{relative_abundance, ZeroRowPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default metadata location, relative to the working directory.
pub const DEFAULT_METADATA_PATH: &str = "map.txt";
/// Default sequence table location, relative to the working directory.
pub const DEFAULT_SEQTAB_PATH: &str = "../01-read_processing/sequence_table.merged.txt";
/// Default metadata identifier column.
pub const DEFAULT_METADATA_ID: &str = "manifest_id";
/// Default sequence table identifier column.
pub const DEFAULT_SEQTAB_ID: &str = "row_names";

/// Input file locations and their identifier columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Metadata TSV.
    pub metadata: PathBuf,
    /// Identifier column in the metadata.
    pub metadata_id: String,
    /// Sequence table TSV (samples as rows).
    pub seqtab: PathBuf,
    /// Identifier column in the sequence table.
    pub seqtab_id: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            metadata: PathBuf::from(DEFAULT_METADATA_PATH),
            metadata_id: DEFAULT_METADATA_ID.to_string(),
            seqtab: PathBuf::from(DEFAULT_SEQTAB_PATH),
            seqtab_id: DEFAULT_SEQTAB_ID.to_string(),
        }
    }
}

/// Summary configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Metadata column to group samples by.
    pub category: String,
    /// Input files.
    pub inputs: InputConfig,
    /// Directory receiving `<category>_abund.txt`.
    pub output_dir: PathBuf,
    /// Handling of features with no counts in any group.
    pub zero_rows: ZeroRowPolicy,
    /// Output formatting.
    pub format: TsvFormat,
    /// Drop samples with fewer total reads.
    pub min_reads: Option<u64>,
    /// Restrict the samples that enter the summary.
    pub sample_filter: Option<SampleFilter>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            category: String::new(),
            inputs: InputConfig::default(),
            output_dir: PathBuf::from("."),
            zero_rows: ZeroRowPolicy::default(),
            format: TsvFormat::default(),
            min_reads: None,
            sample_filter: None,
        }
    }
}

impl SummaryConfig {
    /// Configuration for a category with every other setting at its default.
    pub fn for_category(category: &str) -> Self {
        Self {
            category: category.to_string(),
            ..Self::default()
        }
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(SummaryError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(SummaryError::from)
    }

    /// Check that required settings are present.
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(SummaryError::InvalidParameter(
                "A category to summarize over is required".to_string(),
            ));
        }
        if self.inputs.metadata_id.is_empty() || self.inputs.seqtab_id.is_empty() {
            return Err(SummaryError::InvalidParameter(
                "Identifier column names cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the output file: `<output_dir>/<category>_abund.txt`.
    pub fn output_path(&self) -> PathBuf {
        let name: String = self
            .category
            .chars()
            .map(|c| if std::path::is_separator(c) { '_' } else { c })
            .collect();
        self.output_dir.join(format!("{}_abund.txt", name))
    }
}

/// Builder for summarizing a sequence table over a metadata category.
#[derive(Debug, Clone)]
pub struct Summary {
    category: String,
    sample_filter: Option<SampleFilter>,
    min_reads: Option<u64>,
    zero_rows: ZeroRowPolicy,
}

impl Summary {
    /// Create a summary over `category` with default settings.
    pub fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            sample_filter: None,
            min_reads: None,
            zero_rows: ZeroRowPolicy::default(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &SummaryConfig) -> Self {
        Self {
            category: config.category.clone(),
            sample_filter: config.sample_filter.clone(),
            min_reads: config.min_reads,
            zero_rows: config.zero_rows,
        }
    }

    /// Restrict the samples by metadata value.
    pub fn sample_filter(mut self, filter: SampleFilter) -> Self {
        self.sample_filter = Some(filter);
        self
    }

    /// Drop samples with fewer than `min_reads` total reads.
    pub fn min_reads(mut self, min_reads: u64) -> Self {
        self.min_reads = Some(min_reads);
        self
    }

    /// Set the handling of features absent from every group.
    pub fn zero_rows(mut self, policy: ZeroRowPolicy) -> Self {
        self.zero_rows = policy;
        self
    }

    /// Grouping category.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Run the summary: filter, join, average per group, normalize per feature.
    pub fn run(&self, counts: &CountMatrix, metadata: &Metadata) -> Result<AbundanceTable> {
        let metadata = match &self.sample_filter {
            Some(filter) if !filter.is_noop() => filter_samples(metadata, filter)?.0,
            _ => metadata.clone(),
        };
        let counts = match self.min_reads {
            Some(min) => filter_library_size(counts, Some(min), None)?,
            None => counts.clone(),
        };

        let merged = merge_by_sample(&counts, &metadata, &self.category)?;
        let means = group_means(&merged)?;
        let table = relative_abundance(&means, self.zero_rows)?;

        tracing::info!(
            features = table.n_features(),
            groups = table.n_groups(),
            category = %self.category,
            "computed relative abundances"
        );
        Ok(table)
    }
}

/// Load inputs named by `config`, summarize, and write the output file.
///
/// Returns the path written.
pub fn run_from_config(config: &SummaryConfig) -> Result<PathBuf> {
    config.validate()?;

    tracing::info!(path = %config.inputs.metadata.display(), "loading metadata");
    let metadata = Metadata::from_tsv(&config.inputs.metadata, &config.inputs.metadata_id)?;
    tracing::info!(path = %config.inputs.seqtab.display(), "loading sequence table");
    let counts = CountMatrix::from_seqtab_tsv(&config.inputs.seqtab, &config.inputs.seqtab_id)?;
    tracing::info!(
        features = counts.n_features(),
        samples = counts.n_samples(),
        "loaded sequence table"
    );

    let table = Summary::from_config(config).run(&counts, &metadata)?;

    let output = config.output_path();
    table.to_tsv(&output, &config.format)?;
    tracing::info!(path = %output.display(), "wrote relative abundances");

    Ok(output)
}
