//! Applicability predicates over host facts.
use std::fmt;

use crate::facts::{Generation, HostFacts};

/// Condition attached to a setting, evaluated against [`HostFacts`].
///
/// `Unsupported` carries a condition kind the manifest loader did not
/// recognise.  It always evaluates to `false`: an unrecognised condition
/// must never cause an unintended mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Applies on every host.
    Always,
    /// Applies only on the named generation.
    GenerationIs(Generation),
    /// Applies on the named generation and anything newer.
    GenerationAtLeast(Generation),
    /// Applies on hosts with at least the given build number.
    BuildAtLeast(u32),
    /// An unrecognised condition kind; never applicable.
    Unsupported {
        /// The condition kind string as written in the manifest.
        kind: String,
    },
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::GenerationIs(generation) => write!(f, "generation == {generation}"),
            Self::GenerationAtLeast(generation) => write!(f, "generation >= {generation}"),
            Self::BuildAtLeast(build) => write!(f, "build >= {build}"),
            Self::Unsupported { kind } => write!(f, "unsupported condition '{kind}'"),
        }
    }
}

/// Evaluate a predicate against the gathered host facts.
///
/// Pure function, no side effects.
#[must_use]
pub fn applicable(predicate: &Predicate, facts: &HostFacts) -> bool {
    match predicate {
        Predicate::Always => true,
        Predicate::GenerationIs(generation) => facts.generation == *generation,
        Predicate::GenerationAtLeast(generation) => facts.generation >= *generation,
        Predicate::BuildAtLeast(build) => facts.build >= *build,
        Predicate::Unsupported { .. } => false,
    }
}
