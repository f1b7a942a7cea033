//! The built-in setting catalog: the default Windows setup list.
//!
//! A pure builder, independent of the applier.  Order is significant:
//! settings are applied exactly as declared, and process restarts are
//! declared last because the orchestrator runs them as finalization.
use crate::conditions::Predicate;
use crate::facts::Generation;

use super::{EnvScope, RegistryData, ServiceStartup, Setting, SettingKind};

/// Build the default setting list.
#[must_use]
pub fn default_settings() -> Vec<Setting> {
    let mut settings = vec![
        // Telemetry and data collection. The policy value is the anchor the
        // rest of the telemetry trim builds on, so its failure aborts.
        Setting::new(
            "telemetry-policy-off",
            SettingKind::RegistryValue {
                key_path: r"HKLM\SOFTWARE\Policies\Microsoft\Windows\DataCollection".to_string(),
                value_name: "AllowTelemetry".to_string(),
                data: RegistryData::Dword(0),
            },
        )
        .critical(),
        Setting::new(
            "advertising-id-off",
            SettingKind::RegistryValue {
                key_path:
                    r"HKCU\Software\Microsoft\Windows\CurrentVersion\AdvertisingInfo".to_string(),
                value_name: "Enabled".to_string(),
                data: RegistryData::Dword(0),
            },
        ),
        Setting::new(
            "feedback-notifications-off",
            SettingKind::RegistryValue {
                key_path: r"HKCU\Software\Microsoft\Siuf\Rules".to_string(),
                value_name: "NumberOfSIUFInPeriod".to_string(),
                data: RegistryData::Dword(0),
            },
        ),
        Setting::new(
            "diagtrack-service-disabled",
            SettingKind::ServiceState {
                service: "DiagTrack".to_string(),
                startup: ServiceStartup::Disabled,
            },
        ),
        Setting::new(
            "wap-push-service-disabled",
            SettingKind::ServiceState {
                service: "dmwappushservice".to_string(),
                startup: ServiceStartup::Disabled,
            },
        ),
        Setting::new(
            "compat-appraiser-task-off",
            SettingKind::ScheduledTaskState {
                task_path: r"\Microsoft\Windows\Application Experience\Microsoft Compatibility Appraiser"
                    .to_string(),
                enabled: false,
            },
        ),
        Setting::new(
            "ceip-consolidator-task-off",
            SettingKind::ScheduledTaskState {
                task_path:
                    r"\Microsoft\Windows\Customer Experience Improvement Program\Consolidator"
                        .to_string(),
                enabled: false,
            },
        ),
        // Explorer behaviour.
        Setting::new(
            "show-file-extensions",
            SettingKind::RegistryValue {
                key_path: r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\Advanced"
                    .to_string(),
                value_name: "HideFileExt".to_string(),
                data: RegistryData::Dword(0),
            },
        ),
        Setting::new(
            "start-menu-web-search-off",
            SettingKind::RegistryValue {
                key_path: r"HKCU\Software\Microsoft\Windows\CurrentVersion\Search".to_string(),
                value_name: "BingSearchEnabled".to_string(),
                data: RegistryData::Dword(0),
            },
        ),
        // Windows 11 reshuffled the taskbar and shell; these only make
        // sense there.
        Setting::new(
            "taskbar-align-left",
            SettingKind::RegistryValue {
                key_path: r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\Advanced"
                    .to_string(),
                value_name: "TaskbarAl".to_string(),
                data: RegistryData::Dword(0),
            },
        )
        .when(Predicate::GenerationIs(Generation::Windows11)),
        Setting::new(
            "copilot-off",
            SettingKind::RegistryValue {
                key_path: r"HKCU\Software\Policies\Microsoft\Windows\WindowsCopilot".to_string(),
                value_name: "TurnOffWindowsCopilot".to_string(),
                data: RegistryData::Dword(1),
            },
        )
        .when(Predicate::GenerationAtLeast(Generation::Windows11)),
        // Context-menu trims.
        Setting::new(
            "context-menu-no-sharing",
            SettingKind::ContextMenuEntry {
                key_path: r"HKCR\Directory\shellex\ContextMenuHandlers\Sharing".to_string(),
                present: false,
            },
        ),
        Setting::new(
            "context-menu-no-modern-sharing",
            SettingKind::ContextMenuEntry {
                key_path: r"HKCR\*\shellex\ContextMenuHandlers\ModernSharing".to_string(),
                present: false,
            },
        ),
        // Toolchain opt-outs.
        Setting::new(
            "powershell-telemetry-optout",
            SettingKind::EnvironmentVariable {
                name: "POWERSHELL_TELEMETRY_OPTOUT".to_string(),
                value: "1".to_string(),
                scope: EnvScope::User,
            },
        ),
        Setting::new(
            "dotnet-telemetry-optout",
            SettingKind::EnvironmentVariable {
                name: "DOTNET_CLI_TELEMETRY_OPTOUT".to_string(),
                value: "1".to_string(),
                scope: EnvScope::User,
            },
        ),
        // Cleanup.
        Setting::new(
            "purge-machine-temp",
            SettingKind::FileRemoval {
                path: r"C:\Windows\Temp\*".to_string(),
            },
        ),
    ];

    settings.extend(default_packages());

    // Finalization: Explorer picks up the registry changes on restart and
    // respawns on its own after termination.
    settings.push(Setting::new(
        "restart-explorer",
        SettingKind::ProcessRestart {
            process: "explorer.exe".to_string(),
            relaunch: None,
        },
    ));

    settings
}

/// Package installs, all non-critical: a failed install never blocks the
/// remaining configuration.
fn default_packages() -> Vec<Setting> {
    ["Git.Git", "Microsoft.PowerShell", "7zip.7zip"]
        .into_iter()
        .map(|id| {
            Setting::new(
                format!("install-{}", id.to_lowercase().replace('.', "-")),
                SettingKind::PackageInstalled { id: id.to_string() },
            )
        })
        .collect()
}
