//! Process restart provider (`taskkill`/`tasklist`).
use anyhow::{Context as _, Result};

use crate::context::RunContext;
use crate::exec::Executor;
use crate::settings::{Setting, SettingKind};

use super::{Provider, SettingState, wrong_kind};

/// Terminates a process by image name, optionally relaunching it.
///
/// Used only during finalization, after the configuration settings have
/// been applied; the orchestrator never lets a restart failure abort the
/// run.
#[derive(Debug, Default)]
pub struct ProcessRestartProvider;

impl Provider for ProcessRestartProvider {
    fn name(&self) -> &'static str {
        "process-restart"
    }

    fn check(&self, setting: &Setting, ctx: &RunContext) -> Result<SettingState> {
        let SettingKind::ProcessRestart { process, relaunch } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        if is_running(ctx.executor.as_ref(), process)? {
            return Ok(SettingState::NeedsApply);
        }
        // Not running: only worth doing if we are expected to start it.
        if relaunch.is_some() {
            Ok(SettingState::NeedsApply)
        } else {
            Ok(SettingState::NotSupported {
                reason: format!("{process} is not running"),
            })
        }
    }

    fn apply(&self, setting: &Setting, ctx: &RunContext) -> Result<()> {
        let SettingKind::ProcessRestart { process, relaunch } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        if is_running(ctx.executor.as_ref(), process)? {
            ctx.executor
                .run("taskkill", &["/F", "/IM", process])
                .with_context(|| format!("terminate {process}"))?;
        }
        if let Some(command) = relaunch {
            ctx.executor
                .run("cmd", &["/C", "start", "", command])
                .with_context(|| format!("relaunch {command}"))?;
        }
        Ok(())
    }
}

/// Whether `tasklist` shows the image name.
///
/// With a filter and no match, `tasklist` still exits zero and prints an
/// informational message, so presence is judged from the output text.
fn is_running(executor: &dyn Executor, process: &str) -> Result<bool> {
    let filter = format!("IMAGENAME eq {process}");
    let result = executor.run_unchecked("tasklist", &["/FI", &filter])?;
    Ok(result.success && result.stdout.contains(process))
}
