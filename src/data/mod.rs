//! Data structures for group-wise abundance summaries.

mod abundance;
mod count_matrix;
mod metadata;

pub use abundance::{AbundanceTable, TsvFormat};
pub use count_matrix::CountMatrix;
pub use metadata::{Metadata, Variable, VariableType, MISSING_TOKENS};

pub(crate) use metadata::sort_levels;
