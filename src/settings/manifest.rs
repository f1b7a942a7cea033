//! Optional TOML manifest contributing extra settings to a run.
//!
//! Shape errors fail closed: an entry with an unknown category or missing
//! fields is reported as an issue (surfaced as a failed outcome) instead
//! of crashing the run, and an unknown condition kind degrades to
//! [`Predicate::Unsupported`], which never applies.
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::conditions::Predicate;
use crate::facts::Generation;

use super::{EnvScope, RegistryData, ServiceStartup, Setting, SettingKind};

/// Result of loading a manifest: the usable settings plus per-entry issues.
#[derive(Debug, Default)]
pub struct LoadedManifest {
    /// Settings that converted cleanly, in file order.
    pub settings: Vec<Setting>,
    /// Entries that could not be converted, with the reason.
    pub issues: Vec<ManifestIssue>,
}

/// A manifest entry that failed shape validation.
#[derive(Debug)]
pub struct ManifestIssue {
    /// The entry's id (or a placeholder when even that is missing).
    pub id: String,
    /// Human-readable cause.
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    settings: Vec<RawSetting>,
}

/// One manifest entry with every category-specific field optional;
/// conversion enforces the fields its category actually needs.
#[derive(Debug, Deserialize)]
struct RawSetting {
    id: String,
    category: String,
    #[serde(default)]
    critical: bool,
    #[serde(default)]
    when: Option<RawCondition>,
    #[serde(default)]
    key_path: Option<String>,
    #[serde(default)]
    value_name: Option<String>,
    #[serde(default)]
    data: Option<RawData>,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    startup: Option<String>,
    #[serde(default)]
    task_path: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    package: Option<String>,
    #[serde(default)]
    process: Option<String>,
    #[serde(default)]
    relaunch: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    present: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawData {
    Int(u32),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    kind: String,
    #[serde(default)]
    value: Option<String>,
}

/// Load and convert a manifest file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML; a
/// syntactically broken manifest cannot be trusted at all.  Per-entry
/// shape problems are returned as [`ManifestIssue`]s instead.
pub fn load(path: &Path) -> Result<LoadedManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    parse(&content).with_context(|| format!("failed to parse manifest {}", path.display()))
}

/// Parse manifest TOML content.
///
/// # Errors
///
/// Returns an error if the content is not valid TOML.
pub fn parse(content: &str) -> Result<LoadedManifest> {
    let file: ManifestFile = toml::from_str(content)?;
    let mut loaded = LoadedManifest::default();
    for raw in file.settings {
        let id = raw.id.clone();
        match convert(raw) {
            Ok(setting) => loaded.settings.push(setting),
            Err(e) => loaded.issues.push(ManifestIssue {
                id,
                reason: format!("{e:#}"),
            }),
        }
    }
    Ok(loaded)
}

fn convert(raw: RawSetting) -> Result<Setting> {
    let predicate = convert_condition(raw.when.as_ref());
    let kind = convert_kind(&raw)?;
    let mut setting = Setting::new(raw.id, kind).when(predicate);
    if raw.critical {
        setting = setting.critical();
    }
    Ok(setting)
}

fn convert_kind(raw: &RawSetting) -> Result<SettingKind> {
    match raw.category.trim().to_lowercase().replace('-', "_").as_str() {
        "registry_value" => Ok(SettingKind::RegistryValue {
            key_path: required(&raw.key_path, "key_path")?,
            value_name: required(&raw.value_name, "value_name")?,
            data: match raw.data.as_ref() {
                Some(RawData::Int(n)) => RegistryData::Dword(*n),
                Some(RawData::Text(s)) => RegistryData::Str(s.clone()),
                None => anyhow::bail!("missing field 'data'"),
            },
        }),
        "service_state" => Ok(SettingKind::ServiceState {
            service: required(&raw.service, "service")?,
            startup: required(&raw.startup, "startup")?.parse::<ServiceStartup>()?,
        }),
        "scheduled_task_state" => Ok(SettingKind::ScheduledTaskState {
            task_path: required(&raw.task_path, "task_path")?,
            enabled: raw.enabled.unwrap_or(false),
        }),
        "package_installed" => Ok(SettingKind::PackageInstalled {
            id: required(&raw.package, "package")?,
        }),
        "process_restart" => Ok(SettingKind::ProcessRestart {
            process: required(&raw.process, "process")?,
            relaunch: raw.relaunch.clone(),
        }),
        "environment_variable" => Ok(SettingKind::EnvironmentVariable {
            name: required(&raw.name, "name")?,
            value: required(&raw.value, "value")?,
            scope: match raw.scope.as_deref() {
                Some(scope) => scope.parse::<EnvScope>()?,
                None => EnvScope::User,
            },
        }),
        "file_removal" => Ok(SettingKind::FileRemoval {
            path: required(&raw.path, "path")?,
        }),
        "context_menu_entry" => Ok(SettingKind::ContextMenuEntry {
            key_path: required(&raw.key_path, "key_path")?,
            present: raw.present.unwrap_or(false),
        }),
        other => anyhow::bail!("unknown category '{other}'"),
    }
}

/// Convert a raw condition, degrading anything unrecognised or
/// unparseable to `Predicate::Unsupported`.
fn convert_condition(raw: Option<&RawCondition>) -> Predicate {
    let Some(raw) = raw else {
        return Predicate::Always;
    };
    let value = raw.value.as_deref().unwrap_or_default();
    match raw.kind.trim().to_lowercase().as_str() {
        "always" => Predicate::Always,
        "generation_is" => value
            .parse::<Generation>()
            .map_or_else(|_| unsupported(&raw.kind, value), Predicate::GenerationIs),
        "generation_at_least" => value.parse::<Generation>().map_or_else(
            |_| unsupported(&raw.kind, value),
            Predicate::GenerationAtLeast,
        ),
        "build_at_least" => value
            .parse::<u32>()
            .map_or_else(|_| unsupported(&raw.kind, value), Predicate::BuildAtLeast),
        _ => unsupported(&raw.kind, value),
    }
}

fn unsupported(kind: &str, value: &str) -> Predicate {
    Predicate::Unsupported {
        kind: if value.is_empty() {
            kind.to_string()
        } else {
            format!("{kind}={value}")
        },
    }
}

fn required(field: &Option<String>, name: &str) -> Result<String> {
    field
        .clone()
        .ok_or_else(|| anyhow::anyhow!("missing field '{name}'"))
}
