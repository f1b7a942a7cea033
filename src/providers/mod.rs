//! Setting providers: one `check + apply` implementation per category.
pub mod context_menu;
pub mod env_var;
pub mod file_removal;
pub mod package;
pub mod process;
pub mod registry;
pub mod scheduled_task;
pub mod service;

use std::collections::HashMap;

use anyhow::Result;

use crate::context::RunContext;
use crate::settings::{Category, Setting};

/// Current state of a setting's target, as seen by its provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingState {
    /// The target already matches the desired state; nothing to do.
    Satisfied,
    /// The target differs (or is missing) and `apply` should run.
    NeedsApply,
    /// The setting cannot be applied here (e.g. the scheduled task does
    /// not exist on this edition); recorded as skipped, not failed.
    NotSupported {
        /// Why the setting does not apply.
        reason: String,
    },
}

/// A provider knows how to verify and apply one category of setting.
///
/// Errors returned from either method never escape the applier: they are
/// converted into failed outcome records at that boundary.  A provider
/// must confine its side effects to the one target named by the setting.
pub trait Provider: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Inspect the target's current state without mutating anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined; the applier
    /// records this as a failure and does not attempt the mutation.
    fn check(&self, setting: &Setting, ctx: &RunContext) -> Result<SettingState>;

    /// Apply the desired state to the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system call fails.
    fn apply(&self, setting: &Setting, ctx: &RunContext) -> Result<()>;
}

/// The provider registry, keyed by category.
///
/// A category without a registered provider yields a failed outcome for
/// its settings rather than a crash.
pub struct ProviderSet {
    providers: HashMap<Category, Box<dyn Provider>>,
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut categories: Vec<String> =
            self.providers.keys().map(ToString::to_string).collect();
        categories.sort();
        f.debug_struct("ProviderSet")
            .field("categories", &categories)
            .finish()
    }
}

impl Default for ProviderSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl ProviderSet {
    /// An empty registry (used by tests exercising the unknown-category
    /// path).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// The full standard registry with one provider per category.
    #[must_use]
    pub fn standard() -> Self {
        let mut set = Self::empty();
        set.insert(Category::RegistryValue, Box::new(registry::RegistryProvider));
        set.insert(Category::ServiceState, Box::new(service::ServiceProvider));
        set.insert(
            Category::ScheduledTaskState,
            Box::new(scheduled_task::ScheduledTaskProvider),
        );
        set.insert(Category::PackageInstalled, Box::new(package::PackageProvider));
        set.insert(Category::ProcessRestart, Box::new(process::ProcessRestartProvider));
        set.insert(Category::EnvironmentVariable, Box::new(env_var::EnvVarProvider));
        set.insert(Category::FileRemoval, Box::new(file_removal::FileRemovalProvider));
        set.insert(
            Category::ContextMenuEntry,
            Box::new(context_menu::ContextMenuProvider),
        );
        set
    }

    /// Register (or replace) the provider for a category.
    pub fn insert(&mut self, category: Category, provider: Box<dyn Provider>) {
        self.providers.insert(category, provider);
    }

    /// Remove the provider for a category, returning it if present.
    pub fn remove(&mut self, category: Category) -> Option<Box<dyn Provider>> {
        self.providers.remove(&category)
    }

    /// Look up the provider for a category.
    #[must_use]
    pub fn get(&self, category: Category) -> Option<&dyn Provider> {
        self.providers.get(&category).map(AsRef::as_ref)
    }
}

/// Render the error a provider returns when handed a setting of a
/// foreign category; only reachable through a misregistered
/// [`ProviderSet`].
pub(crate) fn wrong_kind(provider: &str, setting: &Setting) -> anyhow::Error {
    anyhow::anyhow!(
        "{provider} provider cannot handle {} setting '{}'",
        setting.category(),
        setting.id
    )
}
