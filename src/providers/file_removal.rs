//! Best-effort file and directory removal provider.
//!
//! Works through [`FileSystemOps`](crate::operations::FileSystemOps)
//! rather than the executor: removal is plain filesystem work, and the
//! abstraction lets unit tests run without touching a real disk.
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::context::RunContext;
use crate::settings::{Setting, SettingKind};

use super::{Provider, SettingState, wrong_kind};

/// Asserts the absence of a path; the final component may contain `*`.
#[derive(Debug, Default)]
pub struct FileRemovalProvider;

impl Provider for FileRemovalProvider {
    fn name(&self) -> &'static str {
        "file-removal"
    }

    fn check(&self, setting: &Setting, ctx: &RunContext) -> Result<SettingState> {
        let SettingKind::FileRemoval { path } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        let matches = expand(ctx, path)?;
        if matches.is_empty() {
            Ok(SettingState::NotSupported {
                reason: format!("{path} is not present"),
            })
        } else {
            Ok(SettingState::NeedsApply)
        }
    }

    fn apply(&self, setting: &Setting, ctx: &RunContext) -> Result<()> {
        let SettingKind::FileRemoval { path } = &setting.kind else {
            return Err(wrong_kind(self.name(), setting));
        };

        let matches = expand(ctx, path)?;
        let mut removed = 0usize;
        let mut first_error = None;
        for target in &matches {
            match ctx.fs_ops.remove_all(target) {
                Ok(()) => {
                    removed += 1;
                    ctx.log.debug(&format!("removed {}", target.display()));
                }
                Err(e) => {
                    // Locked temp files are routine; a partial sweep still
                    // counts as progress.
                    ctx.log
                        .warn(&format!("could not remove {}: {e}", target.display()));
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if removed == 0
            && let Some(e) = first_error
        {
            bail!("nothing under {path} could be removed: {e}");
        }
        Ok(())
    }
}

/// Expand a removal target into concrete paths.
///
/// A `*` in the final component matches entries of the parent directory;
/// a literal path expands to itself when it exists.
fn expand(ctx: &RunContext, path: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(path);
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        bail!("invalid removal path: {}", path.display());
    };

    if !file_name.contains('*') {
        return Ok(if ctx.fs_ops.exists(path) {
            vec![path.to_path_buf()]
        } else {
            vec![]
        });
    }

    let Some(parent) = path.parent() else {
        bail!("glob removal needs a parent directory: {}", path.display());
    };
    if !ctx.fs_ops.exists(parent) {
        return Ok(vec![]);
    }
    let entries = ctx.fs_ops.read_dir(parent)?;
    Ok(entries
        .into_iter()
        .filter(|entry| {
            entry
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| wildcard_match(file_name, name))
        })
        .collect())
}

/// Match `pattern` against `name`, where `*` matches any run of
/// characters.  Case-insensitive, as Windows paths are.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    fn inner(pattern: &[char], name: &[char]) -> bool {
        match pattern.split_first() {
            None => name.is_empty(),
            Some(('*', rest)) => {
                (0..=name.len()).any(|skip| inner(rest, name.get(skip..).unwrap_or(&[])))
            }
            Some((c, rest)) => name
                .split_first()
                .is_some_and(|(n, name_rest)| n == c && inner(rest, name_rest)),
        }
    }
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let name: Vec<char> = name.to_lowercase().chars().collect();
    inner(&pattern, &name)
}
