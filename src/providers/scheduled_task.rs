//! Scheduled-task enablement provider (`schtasks.exe`).
use anyhow::{Context as _, Result};

use crate::context::RunContext;
use crate::settings::{Setting, SettingKind};

use super::{Provider, SettingState, wrong_kind};

/// Asserts a scheduled task's enablement by full task path.
///
/// Task inventories differ wildly across editions and builds, so an
/// absent task is a skip, never a failure.
#[derive(Debug, Default)]
pub struct ScheduledTaskProvider;

impl Provider for ScheduledTaskProvider {
    fn name(&self) -> &'static str {
        "scheduled-task"
    }

    fn check(&self, setting: &Setting, ctx: &RunContext) -> Result<SettingState> {
        let SettingKind::ScheduledTaskState { task_path, enabled } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        let result = ctx.executor.run_unchecked(
            "schtasks",
            &["/Query", "/TN", task_path, "/V", "/FO", "LIST"],
        )?;
        if !result.success {
            return Ok(SettingState::NotSupported {
                reason: format!("task {task_path} does not exist on this edition"),
            });
        }

        let currently_disabled = task_state_disabled(&result.stdout);
        if currently_disabled == !*enabled {
            Ok(SettingState::Satisfied)
        } else {
            Ok(SettingState::NeedsApply)
        }
    }

    fn apply(&self, setting: &Setting, ctx: &RunContext) -> Result<()> {
        let SettingKind::ScheduledTaskState { task_path, enabled } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        let flag = if *enabled { "/ENABLE" } else { "/DISABLE" };
        ctx.executor
            .run("schtasks", &["/Change", "/TN", task_path, flag])
            .with_context(|| format!("change scheduled task {task_path}"))?;
        Ok(())
    }
}

/// Whether verbose `schtasks /Query` output reports the task as disabled.
///
/// The LIST format prints a `Scheduled Task State:` field whose value is
/// `Enabled` or `Disabled`.
fn task_state_disabled(stdout: &str) -> bool {
    stdout.lines().any(|line| {
        line.trim_start().starts_with("Scheduled Task State:") && line.contains("Disabled")
    })
}
