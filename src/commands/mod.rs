//! Top-level subcommand orchestration.
pub mod apply;
pub mod completions;
pub mod facts;
