//! Diagnostics describing how inputs line up before summarizing.

mod join;

pub use join::{profile_join, GroupProfile, JoinProfile};
