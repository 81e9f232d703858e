//! Summary configuration and execution.

mod runner;

pub use runner::{
    run_from_config, InputConfig, Summary, SummaryConfig, DEFAULT_METADATA_ID,
    DEFAULT_METADATA_PATH, DEFAULT_SEQTAB_ID, DEFAULT_SEQTAB_PATH,
};
