//! Shared, read-only context handed to every provider call.
use std::sync::Arc;

use crate::exec::Executor;
use crate::facts::HostFacts;
use crate::logging::Log;
use crate::operations::{FileSystemOps, SystemFileSystemOps};

/// Capabilities detected once at run start.
///
/// Settings that depend on an external tool consult this explicit value
/// instead of probing (or worse, remembering) availability themselves.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Whether the package manager (`winget`) is on PATH.
    pub package_manager: bool,
}

impl Capabilities {
    /// Probe the host for available tools.
    pub fn detect(executor: &dyn Executor) -> Self {
        Self {
            package_manager: executor.which("winget"),
        }
    }
}

/// What to do with package settings when the package manager is missing.
///
/// The skip-vs-fail decision is an explicit policy, not a side effect of
/// availability detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackagePolicy {
    /// Record package settings as skipped with a reason (default).
    #[default]
    SkipWithoutManager,
    /// Record package settings as failed.
    RequireManager,
}

/// Shared context for a single run.
pub struct RunContext {
    /// Host facts gathered at run start; read-only thereafter.
    pub facts: HostFacts,
    /// Command executor (real system or test double).
    pub executor: Arc<dyn Executor>,
    /// Filesystem operations (injectable for testing).
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Logger for console and file output.
    pub log: Arc<dyn Log>,
    /// Whether to preview changes without applying them.
    pub dry_run: bool,
    /// Tools detected at run start.
    pub capabilities: Capabilities,
    /// Policy for package settings without a package manager.
    pub package_policy: PackagePolicy,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("facts", &self.facts)
            .field("dry_run", &self.dry_run)
            .field("capabilities", &self.capabilities)
            .field("package_policy", &self.package_policy)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Create a context, probing capabilities through the executor.
    pub fn new(
        facts: HostFacts,
        executor: Arc<dyn Executor>,
        log: Arc<dyn Log>,
        dry_run: bool,
    ) -> Self {
        let capabilities = Capabilities::detect(executor.as_ref());
        Self {
            facts,
            executor,
            fs_ops: Arc::new(SystemFileSystemOps),
            log,
            dry_run,
            capabilities,
            package_policy: PackagePolicy::default(),
        }
    }

    /// Replace the package policy.
    #[must_use]
    pub fn with_package_policy(mut self, policy: PackagePolicy) -> Self {
        self.package_policy = policy;
        self
    }

    /// Replace the filesystem operations implementation.
    ///
    /// Used by tests to inject a mock so providers can be exercised
    /// without touching the real filesystem.
    #[must_use]
    pub fn with_fs_ops(mut self, fs_ops: Arc<dyn FileSystemOps>) -> Self {
        self.fs_ops = fs_ops;
        self
    }
}
