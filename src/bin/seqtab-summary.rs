//! seqtab-summary - group-wise relative abundance CLI
//!
//! Summarizes a sequence table over a metadata category and writes
//! `<category>_abund.txt`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use seqtab_summary::data::{CountMatrix, Metadata};
use seqtab_summary::error::{Result, SummaryError};
use seqtab_summary::filter::{filter_library_size, filter_samples, SampleFilter};
use seqtab_summary::normalize::ZeroRowPolicy;
use seqtab_summary::pipeline::{run_from_config, SummaryConfig};
use seqtab_summary::profile::profile_join;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// CLI-friendly zero-row policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliZeroRows {
    /// Keep the feature with blank values
    Empty,
    /// Keep the feature with zeros
    Zero,
    /// Leave the feature out
    Drop,
}

impl From<CliZeroRows> for ZeroRowPolicy {
    fn from(policy: CliZeroRows) -> Self {
        match policy {
            CliZeroRows::Empty => ZeroRowPolicy::Empty,
            CliZeroRows::Zero => ZeroRowPolicy::Zero,
            CliZeroRows::Drop => ZeroRowPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileFormat {
    Text,
    Json,
    Yaml,
}

/// Group-wise relative abundance summaries
#[derive(Parser)]
#[command(name = "seqtab-summary")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Inputs and sample selection shared by every command that reads data.
#[derive(Args, Debug)]
struct InputArgs {
    /// Category in the metadata file to summarize data over
    #[arg(short, long)]
    category: Option<String>,

    /// YAML configuration; flags given on the command line take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to metadata TSV [default: map.txt]
    #[arg(short, long)]
    metadata: Option<PathBuf>,

    /// Sample identifier column in the metadata [default: manifest_id]
    #[arg(long)]
    metadata_id: Option<String>,

    /// Path to sequence table TSV [default: ../01-read_processing/sequence_table.merged.txt]
    #[arg(short, long)]
    seqtab: Option<PathBuf>,

    /// Sample identifier column in the sequence table [default: row_names]
    #[arg(long)]
    seqtab_id: Option<String>,

    /// Drop samples with fewer total reads
    #[arg(long)]
    min_reads: Option<u64>,

    /// Metadata column used by --include / --exclude
    #[arg(long)]
    filter_column: Option<String>,

    /// Keep only samples with these values (comma-separated)
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Drop samples with these values (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write relative abundances of every feature across category groups
    Summarize {
        #[command(flatten)]
        inputs: InputArgs,

        /// Directory for <category>_abund.txt [default: .]
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Fixed number of decimals in the output
        #[arg(long)]
        precision: Option<usize>,

        /// Label for the feature column header
        #[arg(long)]
        index_label: Option<String>,

        /// Handling of features with no counts in any group
        #[arg(long, value_enum)]
        zero_rows: Option<CliZeroRows>,
    },

    /// Show how the sequence table and metadata join for a category
    Profile {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ProfileFormat,
    },

    /// Generate an example configuration file
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "summary.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Summarize {
            inputs,
            output_dir,
            precision,
            index_label,
            zero_rows,
        } => build_config(inputs).and_then(|mut config| {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if precision.is_some() {
                config.format.precision = precision;
            }
            if let Some(label) = index_label {
                config.format.index_label = label;
            }
            if let Some(policy) = zero_rows {
                config.zero_rows = policy.into();
            }
            cmd_summarize(&config)
        }),

        Commands::Profile { inputs, format } => {
            build_config(inputs).and_then(|config| cmd_profile(&config, format))
        }

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "seqtab_summary=debug"
    } else {
        "seqtab_summary=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Merge the optional config file with command-line overrides.
fn build_config(args: InputArgs) -> Result<SummaryConfig> {
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            SummaryConfig::from_file(path)?
        }
        None => SummaryConfig::default(),
    };

    if let Some(category) = args.category {
        config.category = category;
    }
    if let Some(path) = args.metadata {
        config.inputs.metadata = path;
    }
    if let Some(column) = args.metadata_id {
        config.inputs.metadata_id = column;
    }
    if let Some(path) = args.seqtab {
        config.inputs.seqtab = path;
    }
    if let Some(column) = args.seqtab_id {
        config.inputs.seqtab_id = column;
    }
    if args.min_reads.is_some() {
        config.min_reads = args.min_reads;
    }

    config.sample_filter = merge_sample_filter(
        config.sample_filter.take(),
        args.filter_column,
        args.include,
        args.exclude,
    )?;

    config.validate()?;
    Ok(config)
}

/// Apply --filter-column / --include / --exclude on top of the config's filter.
///
/// Without --filter-column the config's column is used. Values given on the
/// command line replace the config's list of the same kind.
fn merge_sample_filter(
    from_config: Option<SampleFilter>,
    column: Option<String>,
    include: Vec<String>,
    exclude: Vec<String>,
) -> Result<Option<SampleFilter>> {
    let mut filter = match (column, from_config) {
        (Some(column), Some(f)) if f.column == column => f,
        (Some(column), _) => SampleFilter {
            column,
            ..SampleFilter::default()
        },
        (None, Some(f)) if !f.column.is_empty() => f,
        (None, from_config) => {
            if !include.is_empty() || !exclude.is_empty() {
                return Err(SummaryError::InvalidParameter(
                    "--include/--exclude require --filter-column".to_string(),
                ));
            }
            return Ok(from_config);
        }
    };

    if !include.is_empty() {
        filter.include = include;
    }
    if !exclude.is_empty() {
        filter.exclude = exclude;
    }
    Ok(Some(filter))
}

/// Summarize and write the output file
fn cmd_summarize(config: &SummaryConfig) -> Result<()> {
    let output = run_from_config(config)?;
    println!("{}", output.display());
    Ok(())
}

/// Print the join profile
fn cmd_profile(config: &SummaryConfig, format: ProfileFormat) -> Result<()> {
    let metadata = Metadata::from_tsv(&config.inputs.metadata, &config.inputs.metadata_id)?;
    let metadata = match &config.sample_filter {
        Some(filter) if !filter.is_noop() => filter_samples(&metadata, filter)?.0,
        _ => metadata,
    };
    let counts = CountMatrix::from_seqtab_tsv(&config.inputs.seqtab, &config.inputs.seqtab_id)?;
    let counts = match config.min_reads {
        Some(min) => filter_library_size(&counts, Some(min), None)?,
        None => counts,
    };

    let profile = profile_join(&counts, &metadata, &config.category)?;

    match format {
        ProfileFormat::Text => print!("{}", profile),
        ProfileFormat::Json => println!("{}", serde_json::to_string_pretty(&profile)?),
        ProfileFormat::Yaml => print!("{}", serde_yaml::to_string(&profile)?),
    }

    Ok(())
}

/// Write an example configuration
fn cmd_example(output_path: &Path) -> Result<()> {
    let mut config = SummaryConfig::for_category("body_site");
    config.min_reads = Some(1000);
    config.sample_filter = Some(SampleFilter::include("study", &["DOMHaIN"]));

    let yaml = config.to_yaml()?;
    std::fs::write(output_path, &yaml)?;
    tracing::info!(path = %output_path.display(), "wrote example configuration");
    println!("{}", yaml);

    Ok(())
}
