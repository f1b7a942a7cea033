//! Host fact gathering: OS version, build number, elevation status.
//!
//! Facts are captured once per run, before any setting is applied, and
//! are read-only thereafter.  All queries go through the [`Executor`] so
//! the whole engine can run against a simulated host in tests.
use std::fmt;

use anyhow::{Context, Result};

use crate::exec::Executor;

const CURRENT_VERSION_KEY: &str = r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion";

/// Windows generation, derived from the build number.
///
/// Ordered: `Windows10 < Windows11`, so "at least" predicates can compare
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Windows 10 (builds below 22000).
    Windows10,
    /// Windows 11 (builds 22000 and up).
    Windows11,
}

impl Generation {
    /// Derive the generation from a build number.
    #[must_use]
    pub const fn from_build(build: u32) -> Self {
        if build >= 22000 {
            Self::Windows11
        } else {
            Self::Windows10
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows10 => write!(f, "windows10"),
            Self::Windows11 => write!(f, "windows11"),
        }
    }
}

impl std::str::FromStr for Generation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "windows10" | "10" => Ok(Self::Windows10),
            "windows11" | "11" => Ok(Self::Windows11),
            other => anyhow::bail!("unknown generation '{other}'"),
        }
    }
}

/// Immutable snapshot of the machine attributes used for applicability
/// decisions.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HostFacts {
    /// OS major version number.
    pub major: u32,
    /// OS build number.
    pub build: u32,
    /// Windows generation derived from the build number.
    pub generation: Generation,
    /// Whether the current process runs elevated.
    pub elevated: bool,
}

impl HostFacts {
    /// Create facts with explicit values (for tests and tooling).
    #[must_use]
    pub const fn new(major: u32, build: u32, elevated: bool) -> Self {
        Self {
            major,
            build,
            generation: Generation::from_build(build),
            elevated,
        }
    }

    /// Gather facts from the live host.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS version cannot be read from the
    /// registry or its value cannot be parsed.
    pub fn gather(executor: &dyn Executor) -> Result<Self> {
        let build = query_build_number(executor)?;
        // Major version is informational; pre-1511 builds lack the value.
        let major = query_major_version(executor).unwrap_or(10);
        Ok(Self::new(major, build, is_elevated(executor)))
    }
}

impl fmt::Display for HostFacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (major {}, build {}, {})",
            self.generation,
            self.major,
            self.build,
            if self.elevated {
                "elevated"
            } else {
                "not elevated"
            }
        )
    }
}

/// Check whether the current process runs with administrative rights.
///
/// `net session` is only permitted for elevated processes, which makes it
/// a reliable probe that needs no Win32 bindings.
pub fn is_elevated(executor: &dyn Executor) -> bool {
    executor
        .run_unchecked("net", &["session"])
        .is_ok_and(|r| r.success)
}

fn query_build_number(executor: &dyn Executor) -> Result<u32> {
    let raw = query_version_value(executor, "CurrentBuildNumber")?;
    raw.trim()
        .parse::<u32>()
        .with_context(|| format!("unparseable build number '{raw}'"))
}

fn query_major_version(executor: &dyn Executor) -> Result<u32> {
    let raw = query_version_value(executor, "CurrentMajorVersionNumber")?;
    parse_reg_integer(raw.trim())
        .with_context(|| format!("unparseable major version '{raw}'"))
}

/// Read a single value from the `CurrentVersion` registry key.
fn query_version_value(executor: &dyn Executor, name: &str) -> Result<String> {
    let result = executor.run_unchecked("reg", &["query", CURRENT_VERSION_KEY, "/v", name])?;
    if !result.success {
        anyhow::bail!("registry value '{name}' not found under CurrentVersion");
    }
    extract_reg_data(&result.stdout, name)
        .ok_or_else(|| anyhow::anyhow!("could not parse reg query output for '{name}'"))
}

/// Pull the data column out of `reg query` output for the given value name.
///
/// `reg query` prints one indented line per value:
/// `    CurrentBuildNumber    REG_SZ    22631`.
fn extract_reg_data(stdout: &str, name: &str) -> Option<String> {
    for line in stdout.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(name) {
            continue;
        }
        let _type = tokens.next()?;
        let data: Vec<&str> = tokens.collect();
        if !data.is_empty() {
            return Some(data.join(" "));
        }
    }
    None
}

/// Parse a registry integer rendered either as decimal or `0x` hex.
fn parse_reg_integer(raw: &str) -> Result<u32> {
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).map_err(Into::into);
    }
    raw.parse::<u32>().map_err(Into::into)
}
