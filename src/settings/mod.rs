//! The declarative setting model: one desired-state assertion per entry.
pub mod catalog;
pub mod manifest;

use std::fmt;

use anyhow::Result;

use crate::conditions::Predicate;

/// Category of system state a setting asserts over.
///
/// Each category is served by exactly one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// A named value under a registry key.
    RegistryValue,
    /// Startup mode (and run state) of a Windows service.
    ServiceState,
    /// Enablement of a scheduled task.
    ScheduledTaskState,
    /// Presence of a package.
    PackageInstalled,
    /// Termination (and optional relaunch) of a process; finalization only.
    ProcessRestart,
    /// A persistent environment variable.
    EnvironmentVariable,
    /// Absence of a file or directory tree.
    FileRemoval,
    /// Presence or absence of a context-menu registry key.
    ContextMenuEntry,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RegistryValue => "registry-value",
            Self::ServiceState => "service-state",
            Self::ScheduledTaskState => "scheduled-task-state",
            Self::PackageInstalled => "package-installed",
            Self::ProcessRestart => "process-restart",
            Self::EnvironmentVariable => "environment-variable",
            Self::FileRemoval => "file-removal",
            Self::ContextMenuEntry => "context-menu-entry",
        };
        write!(f, "{name}")
    }
}

/// Typed registry value payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryData {
    /// A 32-bit `REG_DWORD` value.
    Dword(u32),
    /// A `REG_SZ` string value.
    Str(String),
}

impl RegistryData {
    /// The `reg add /t` type name for this payload.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Dword(_) => "REG_DWORD",
            Self::Str(_) => "REG_SZ",
        }
    }

    /// The `reg add /d` data string for this payload.
    #[must_use]
    pub fn data_string(&self) -> String {
        match self {
            Self::Dword(value) => value.to_string(),
            Self::Str(value) => value.clone(),
        }
    }
}

impl fmt::Display for RegistryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dword(value) => write!(f, "{value:#x}"),
            Self::Str(value) => write!(f, "{value}"),
        }
    }
}

/// Service startup mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStartup {
    /// Service cannot be started.
    Disabled,
    /// Service starts on demand.
    Manual,
    /// Service starts at boot.
    Automatic,
}

impl ServiceStartup {
    /// The `sc config start=` argument for this mode.
    #[must_use]
    pub const fn sc_config_arg(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Manual => "demand",
            Self::Automatic => "auto",
        }
    }

    /// The `START_TYPE` token `sc qc` prints for this mode.
    #[must_use]
    pub const fn sc_query_token(&self) -> &'static str {
        match self {
            Self::Disabled => "DISABLED",
            Self::Manual => "DEMAND_START",
            Self::Automatic => "AUTO_START",
        }
    }
}

impl fmt::Display for ServiceStartup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Manual => write!(f, "manual"),
            Self::Automatic => write!(f, "automatic"),
        }
    }
}

impl std::str::FromStr for ServiceStartup {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disabled" => Ok(Self::Disabled),
            "manual" | "demand" => Ok(Self::Manual),
            "automatic" | "auto" => Ok(Self::Automatic),
            other => anyhow::bail!("unknown service startup mode '{other}'"),
        }
    }
}

/// Scope of a persistent environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvScope {
    /// Per-user environment (`HKCU\Environment`).
    User,
    /// Machine-wide environment.
    Machine,
}

impl fmt::Display for EnvScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Machine => write!(f, "machine"),
        }
    }
}

impl std::str::FromStr for EnvScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "machine" | "system" => Ok(Self::Machine),
            other => anyhow::bail!("unknown environment scope '{other}'"),
        }
    }
}

/// Category-specific target and desired value of a setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingKind {
    /// Assert a named registry value.
    RegistryValue {
        /// Registry key path (e.g. `HKLM\SOFTWARE\...`).
        key_path: String,
        /// Value name under the key.
        value_name: String,
        /// Desired typed data.
        data: RegistryData,
    },
    /// Assert a service's startup mode (stopping it first when disabling).
    ServiceState {
        /// Service name as known to the service control manager.
        service: String,
        /// Desired startup mode.
        startup: ServiceStartup,
    },
    /// Assert a scheduled task's enablement.
    ScheduledTaskState {
        /// Full task path (e.g. `\Microsoft\Windows\...\Consolidator`).
        task_path: String,
        /// Desired enablement.
        enabled: bool,
    },
    /// Assert that a package is installed.
    PackageInstalled {
        /// Package identifier understood by the package manager.
        id: String,
    },
    /// Terminate a process, optionally relaunching it.
    ProcessRestart {
        /// Image name (e.g. `explorer.exe`).
        process: String,
        /// Command to start afterwards; `None` for processes that
        /// respawn on their own.
        relaunch: Option<String>,
    },
    /// Assert a persistent environment variable.
    EnvironmentVariable {
        /// Variable name.
        name: String,
        /// Desired value.
        value: String,
        /// Persistence scope.
        scope: EnvScope,
    },
    /// Assert the absence of a path (final component may contain `*`).
    FileRemoval {
        /// Path to delete, recursively and best-effort.
        path: String,
    },
    /// Assert presence or absence of a context-menu registry key.
    ContextMenuEntry {
        /// Registry key path of the menu entry.
        key_path: String,
        /// Whether the entry should exist.
        present: bool,
    },
}

impl SettingKind {
    /// The category this kind belongs to.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::RegistryValue { .. } => Category::RegistryValue,
            Self::ServiceState { .. } => Category::ServiceState,
            Self::ScheduledTaskState { .. } => Category::ScheduledTaskState,
            Self::PackageInstalled { .. } => Category::PackageInstalled,
            Self::ProcessRestart { .. } => Category::ProcessRestart,
            Self::EnvironmentVariable { .. } => Category::EnvironmentVariable,
            Self::FileRemoval { .. } => Category::FileRemoval,
            Self::ContextMenuEntry { .. } => Category::ContextMenuEntry,
        }
    }
}

/// One declarative desired-state assertion about the target machine.
#[derive(Debug, Clone)]
pub struct Setting {
    /// Stable identifier, unique within a run.
    pub id: String,
    /// Target and desired value.
    pub kind: SettingKind,
    /// Applicability condition over host facts.
    pub predicate: Predicate,
    /// Whether a failure aborts the remainder of the run.
    pub critical: bool,
}

impl Setting {
    /// Create a non-critical, always-applicable setting.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: SettingKind) -> Self {
        Self {
            id: id.into(),
            kind,
            predicate: Predicate::Always,
            critical: false,
        }
    }

    /// Attach an applicability predicate.
    #[must_use]
    pub fn when(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Mark the setting as critical: its failure halts the run.
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// The category of this setting.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.kind.category()
    }

    /// Human-readable description of the asserted state.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.kind {
            SettingKind::RegistryValue {
                key_path,
                value_name,
                data,
            } => format!("{key_path}\\{value_name} = {data}"),
            SettingKind::ServiceState { service, startup } => {
                format!("service {service} startup={startup}")
            }
            SettingKind::ScheduledTaskState { task_path, enabled } => {
                format!(
                    "task {task_path} {}",
                    if *enabled { "enabled" } else { "disabled" }
                )
            }
            SettingKind::PackageInstalled { id } => format!("package {id} installed"),
            SettingKind::ProcessRestart { process, .. } => format!("restart {process}"),
            SettingKind::EnvironmentVariable { name, value, scope } => {
                format!("env {name}={value} ({scope})")
            }
            SettingKind::FileRemoval { path } => format!("remove {path}"),
            SettingKind::ContextMenuEntry { key_path, present } => {
                format!(
                    "context menu {key_path} {}",
                    if *present { "present" } else { "absent" }
                )
            }
        }
    }
}

/// Validate the run invariant that setting ids are unique.
///
/// # Errors
///
/// Returns an error naming the first duplicated id.
pub fn validate_unique_ids(settings: &[Setting]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for setting in settings {
        if !seen.insert(setting.id.as_str()) {
            anyhow::bail!("duplicate setting id '{}'", setting.id);
        }
    }
    Ok(())
}
