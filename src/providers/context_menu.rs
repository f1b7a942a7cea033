//! Context-menu entry provider.
//!
//! Context-menu entries live as registry keys under the classes hive, so
//! this provider asserts key presence or absence through the same
//! `reg.exe` helpers the registry provider uses.
use anyhow::{Context as _, Result};

use crate::context::RunContext;
use crate::settings::{Setting, SettingKind};

use super::registry::key_exists;
use super::{Provider, SettingState, wrong_kind};

/// Asserts presence or absence of a context-menu registry key.
#[derive(Debug, Default)]
pub struct ContextMenuProvider;

impl Provider for ContextMenuProvider {
    fn name(&self) -> &'static str {
        "context-menu"
    }

    fn check(&self, setting: &Setting, ctx: &RunContext) -> Result<SettingState> {
        let SettingKind::ContextMenuEntry { key_path, present } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        let exists = key_exists(ctx.executor.as_ref(), key_path)?;
        Ok(if exists == *present {
            SettingState::Satisfied
        } else {
            SettingState::NeedsApply
        })
    }

    fn apply(&self, setting: &Setting, ctx: &RunContext) -> Result<()> {
        let SettingKind::ContextMenuEntry { key_path, present } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        if *present {
            ctx.executor
                .run("reg", &["add", key_path, "/f"])
                .with_context(|| format!("create context menu key {key_path}"))?;
        } else {
            ctx.executor
                .run("reg", &["delete", key_path, "/f"])
                .with_context(|| format!("delete context menu key {key_path}"))?;
        }
        Ok(())
    }
}
