//! Registry value provider, plus `reg.exe` helpers shared with the
//! context-menu and environment-variable providers.
use anyhow::{Context as _, Result};

use crate::context::RunContext;
use crate::exec::Executor;
use crate::settings::{RegistryData, Setting, SettingKind};

use super::{Provider, SettingState, wrong_kind};

/// Asserts a named value under a registry key.
#[derive(Debug, Default)]
pub struct RegistryProvider;

impl Provider for RegistryProvider {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn check(&self, setting: &Setting, ctx: &RunContext) -> Result<SettingState> {
        let SettingKind::RegistryValue {
            key_path,
            value_name,
            data,
        } = &setting.kind
        else {
            return Err(wrong_kind(self.name(), setting));
        };

        let current = query_value(ctx.executor.as_ref(), key_path, value_name)?;
        Ok(current.map_or(SettingState::NeedsApply, |current| {
            if value_matches(&current, data) {
                SettingState::Satisfied
            } else {
                SettingState::NeedsApply
            }
        }))
    }

    fn apply(&self, setting: &Setting, ctx: &RunContext) -> Result<()> {
        let SettingKind::RegistryValue {
            key_path,
            value_name,
            data,
        } = &setting.kind
        else {
            return Err(wrong_kind(self.name(), setting));
        };

        // `reg add` creates missing parent keys on its own.
        ctx.executor
            .run(
                "reg",
                &[
                    "add",
                    key_path,
                    "/v",
                    value_name,
                    "/t",
                    data.type_name(),
                    "/d",
                    &data.data_string(),
                    "/f",
                ],
            )
            .with_context(|| format!("set registry value {key_path}\\{value_name}"))?;
        Ok(())
    }
}

/// Read a single registry value's data.
///
/// Returns `Ok(None)` when the key or value does not exist.
pub(crate) fn query_value(
    executor: &dyn Executor,
    key_path: &str,
    value_name: &str,
) -> Result<Option<String>> {
    let result = executor.run_unchecked("reg", &["query", key_path, "/v", value_name])?;
    if !result.success {
        return Ok(None);
    }
    Ok(extract_data(&result.stdout, value_name))
}

/// Check whether a registry key exists at all.
pub(crate) fn key_exists(executor: &dyn Executor, key_path: &str) -> Result<bool> {
    let result = executor.run_unchecked("reg", &["query", key_path])?;
    Ok(result.success)
}

/// Pull the data column out of `reg query` output for the given value
/// name.  `reg query` prints one indented line per value:
/// `    AllowTelemetry    REG_DWORD    0x0`.
fn extract_data(stdout: &str, value_name: &str) -> Option<String> {
    for line in stdout.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(value_name) {
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

/// Compare the current rendered value against the desired data.
///
/// `reg query` renders DWORDs as `0x`-prefixed hex, so numeric values
/// compare numerically; strings compare verbatim.
pub(crate) fn value_matches(current: &str, desired: &RegistryData) -> bool {
    match desired {
        RegistryData::Dword(expected) => parse_number(current) == Some(u64::from(*expected)),
        RegistryData::Str(expected) => current == expected,
    }
}

fn parse_number(raw: &str) -> Option<u64> {
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    raw.parse::<u64>().ok()
}
