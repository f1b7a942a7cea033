//! Service startup-mode provider (`sc.exe`).
use anyhow::{Context as _, Result, bail};

use crate::context::RunContext;
use crate::exec::Executor;
use crate::settings::{ServiceStartup, Setting, SettingKind};

use super::{Provider, SettingState, wrong_kind};

/// Asserts a service's startup mode, stopping it first when it is
/// running and the desired mode is `Disabled`.
#[derive(Debug, Default)]
pub struct ServiceProvider;

impl Provider for ServiceProvider {
    fn name(&self) -> &'static str {
        "service"
    }

    fn check(&self, setting: &Setting, ctx: &RunContext) -> Result<SettingState> {
        let SettingKind::ServiceState { service, startup } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        // A missing service is a failure, not a skip: the catalog names
        // services that exist on every supported edition.
        let current = query_startup(ctx.executor.as_ref(), service)?;
        if current != startup.sc_query_token() {
            return Ok(SettingState::NeedsApply);
        }
        if *startup == ServiceStartup::Disabled && is_running(ctx.executor.as_ref(), service)? {
            return Ok(SettingState::NeedsApply);
        }
        Ok(SettingState::Satisfied)
    }

    fn apply(&self, setting: &Setting, ctx: &RunContext) -> Result<()> {
        let SettingKind::ServiceState { service, startup } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        if is_running(ctx.executor.as_ref(), service)? {
            ctx.executor
                .run("sc", &["stop", service])
                .with_context(|| format!("stop service {service}"))?;
        }
        ctx.executor
            .run("sc", &["config", service, "start=", startup.sc_config_arg()])
            .with_context(|| format!("configure service {service}"))?;
        Ok(())
    }
}

/// Read the `START_TYPE` token from `sc qc` output.
///
/// `sc qc` prints `        START_TYPE         : 4   DISABLED`; the token
/// of interest is the trailing word.
fn query_startup(executor: &dyn Executor, service: &str) -> Result<String> {
    let result = executor.run_unchecked("sc", &["qc", service])?;
    if !result.success {
        bail!(
            "service '{service}' not found or query failed: {}",
            combined_output(&result.stdout, &result.stderr)
        );
    }
    for line in result.stdout.lines() {
        if line.contains("START_TYPE")
            && let Some(token) = line.split_whitespace().last()
        {
            return Ok(token.to_string());
        }
    }
    bail!("could not parse START_TYPE for service '{service}'");
}

/// Whether `sc query` reports the service as running.
fn is_running(executor: &dyn Executor, service: &str) -> Result<bool> {
    let result = executor.run_unchecked("sc", &["query", service])?;
    if !result.success {
        bail!(
            "service '{service}' not found or query failed: {}",
            combined_output(&result.stdout, &result.stderr)
        );
    }
    Ok(result
        .stdout
        .lines()
        .any(|line| line.contains("STATE") && line.contains("RUNNING")))
}

fn combined_output(stdout: &str, stderr: &str) -> String {
    let stdout = stdout.trim();
    let stderr = stderr.trim();
    if stderr.is_empty() {
        stdout.to_string()
    } else if stdout.is_empty() {
        stderr.to_string()
    } else {
        format!("{stdout} {stderr}")
    }
}
