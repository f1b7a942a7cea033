//! Persistent environment-variable provider (`setx`).
use anyhow::{Context as _, Result};

use crate::context::RunContext;
use crate::settings::{EnvScope, Setting, SettingKind};

use super::registry::query_value;
use super::{Provider, SettingState, wrong_kind};

const USER_ENV_KEY: &str = r"HKCU\Environment";
const MACHINE_ENV_KEY: &str = r"HKLM\SYSTEM\CurrentControlSet\Control\Session Manager\Environment";

/// Asserts a persistent environment variable at user or machine scope.
///
/// Idempotent by construction: setting the same value twice is harmless,
/// and the check avoids even that by reading the backing registry key.
#[derive(Debug, Default)]
pub struct EnvVarProvider;

impl Provider for EnvVarProvider {
    fn name(&self) -> &'static str {
        "env-var"
    }

    fn check(&self, setting: &Setting, ctx: &RunContext) -> Result<SettingState> {
        let SettingKind::EnvironmentVariable { name, value, scope } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        let current = query_value(ctx.executor.as_ref(), scope_key(*scope), name)?;
        Ok(match current {
            Some(current) if current == *value => SettingState::Satisfied,
            _ => SettingState::NeedsApply,
        })
    }

    fn apply(&self, setting: &Setting, ctx: &RunContext) -> Result<()> {
        let SettingKind::EnvironmentVariable { name, value, scope } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        match scope {
            EnvScope::User => ctx.executor.run("setx", &[name, value]),
            EnvScope::Machine => ctx.executor.run("setx", &[name, value, "/M"]),
        }
        .with_context(|| format!("set environment variable {name}"))?;
        Ok(())
    }
}

const fn scope_key(scope: EnvScope) -> &'static str {
    match scope {
        EnvScope::User => USER_ENV_KEY,
        EnvScope::Machine => MACHINE_ENV_KEY,
    }
}
