//! Package installation provider (`winget`).
use anyhow::{Result, bail};

use crate::context::{PackagePolicy, RunContext};
use crate::settings::{Setting, SettingKind};

use super::{Provider, SettingState, wrong_kind};

/// Asserts that a package is installed, installing it only when absent.
///
/// Package-manager availability is an explicit capability on the run
/// context; what happens without one is governed by [`PackagePolicy`].
#[derive(Debug, Default)]
pub struct PackageProvider;

impl Provider for PackageProvider {
    fn name(&self) -> &'static str {
        "package"
    }

    fn check(&self, setting: &Setting, ctx: &RunContext) -> Result<SettingState> {
        let SettingKind::PackageInstalled { id } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        if !ctx.capabilities.package_manager {
            return match ctx.package_policy {
                PackagePolicy::SkipWithoutManager => Ok(SettingState::NotSupported {
                    reason: "winget is not available".to_string(),
                }),
                PackagePolicy::RequireManager => bail!("winget is not available"),
            };
        }

        let result = ctx.executor.run_unchecked(
            "winget",
            &["list", "--id", id, "--exact", "--accept-source-agreements"],
        )?;
        if result.success && result.stdout.contains(id) {
            Ok(SettingState::Satisfied)
        } else {
            Ok(SettingState::NeedsApply)
        }
    }

    fn apply(&self, setting: &Setting, ctx: &RunContext) -> Result<()> {
        let SettingKind::PackageInstalled { id } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        let result = ctx.executor.run_unchecked(
            "winget",
            &[
                "install",
                "--id",
                id,
                "--exact",
                "--source",
                "winget",
                "--accept-source-agreements",
                "--accept-package-agreements",
            ],
        )?;
        if result.success {
            Ok(())
        } else {
            // winget writes most diagnostics to stdout, not stderr.
            // Combine both streams so the user sees useful output.
            let detail = if result.stderr.trim().is_empty() {
                result.stdout.trim().to_string()
            } else {
                format!("{} {}", result.stdout.trim(), result.stderr.trim())
            };
            bail!("winget install failed for '{id}': {detail}")
        }
    }
}
