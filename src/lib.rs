//! Declarative Windows system-configuration engine.
//!
//! A flat, declaration-ordered list of desired-state settings — registry
//! values, service states, scheduled tasks, packages, environment
//! variables, file removals, context-menu entries, process restarts —
//! applied sequentially against the local machine, each with independent
//! success/failure, logged to console and a persistent file, idempotent
//! and safe to re-run.
//!
//! The public API is organised into four layers:
//!
//! - **[`settings`]** — the declarative model plus the built-in catalog
//!   and the optional TOML manifest
//! - **[`providers`]** — idempotent `check + apply` primitives, one per
//!   setting category
//! - **[`applier`]** — ordered execution, critical-failure halting, and
//!   outcome recording
//! - **[`commands`]** — top-level subcommand orchestration (`apply`,
//!   `facts`, `completions`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod applier;
pub mod cli;
pub mod commands;
pub mod conditions;
pub mod context;
pub mod error;
pub mod exec;
pub mod facts;
pub mod logging;
pub mod operations;
pub mod outcome;
pub mod providers;
pub mod settings;
