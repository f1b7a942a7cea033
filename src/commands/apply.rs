//! The `apply` subcommand: the top-level run orchestration.
//!
//! Sequence: privilege check → host-fact gathering → settings assembly →
//! applier pass → finalization (process restarts, always attempted) →
//! summary.  The exit code is non-zero only for a missing elevation or a
//! critical failure.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::applier::Applier;
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::context::{PackagePolicy, RunContext};
use crate::error::SetupError;
use crate::exec::{Executor, SystemExecutor};
use crate::facts::{self, HostFacts};
use crate::logging::{Log, Logger};
use crate::outcome::{OutcomeLog, OutcomeRecord, Status};
use crate::providers::ProviderSet;
use crate::settings::{self, Category, Setting, catalog, manifest};

/// Run the apply command against the live system.
///
/// # Errors
///
/// Returns an error if the process is not elevated, host facts cannot be
/// gathered, the settings list is invalid, or a critical setting failed.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Arc<Logger>) -> Result<()> {
    let executor: Arc<dyn Executor> =
        Arc::new(SystemExecutor::new(Duration::from_secs(global.timeout)));
    run_with_executor(global, opts, Arc::clone(log) as Arc<dyn Log>, executor)
}

/// Run the apply command against an arbitrary executor.
///
/// Split out so integration tests can drive the full orchestration
/// against a simulated host.
///
/// # Errors
///
/// See [`run`].
pub fn run_with_executor(
    global: &GlobalOpts,
    opts: &ApplyOpts,
    log: Arc<dyn Log>,
    executor: Arc<dyn Executor>,
) -> Result<()> {
    let version = option_env!("WINSETUP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("winsetup {version}"));

    // Abort before any mutation; a dry run mutates nothing, so it may
    // proceed unelevated for previewing.
    log.stage("Checking privileges");
    if !facts::is_elevated(executor.as_ref()) {
        if !global.dry_run {
            return Err(SetupError::NotElevated.into());
        }
        log.warn("not elevated; dry run will preview but a real run would abort");
    }

    log.stage("Gathering host facts");
    let host_facts = HostFacts::gather(executor.as_ref())?;
    log.info(&format!("host: {host_facts}"));

    log.stage("Building settings");
    let (all_settings, manifest_issues) = assemble_settings(global, log.as_ref())?;
    let selected = filter_settings(all_settings, opts);
    let (main_settings, finalize_settings): (Vec<Setting>, Vec<Setting>) = selected
        .into_iter()
        .partition(|s| s.category() != Category::ProcessRestart);
    log.info(&format!(
        "{} settings selected ({} finalization)",
        main_settings.len() + finalize_settings.len(),
        finalize_settings.len()
    ));

    let policy = if global.require_package_manager {
        PackagePolicy::RequireManager
    } else {
        PackagePolicy::SkipWithoutManager
    };
    let ctx = RunContext::new(host_facts, Arc::clone(&executor), Arc::clone(&log), global.dry_run)
        .with_package_policy(policy);
    if !ctx.capabilities.package_manager {
        log.debug("winget not found on PATH");
    }

    let outcome_path = global.log_file.clone().or_else(OutcomeLog::default_path);
    let outcomes = OutcomeLog::new(Arc::clone(&log), outcome_path, global.json_lines);
    outcomes.event(&format!(
        "run started: host {}, {} settings",
        ctx.facts,
        main_settings.len() + finalize_settings.len()
    ));

    // Manifest entries that failed shape validation become failed
    // outcomes, not a crash.
    for issue in &manifest_issues {
        outcomes.record(OutcomeRecord::new(
            &issue.id,
            Status::Failed,
            Some(format!("manifest entry rejected: {}", issue.reason)),
        ));
    }

    log.stage("Applying settings");
    let providers = ProviderSet::standard();
    let report = Applier::new(&providers, &ctx, &outcomes)
        .with_halt_on_critical(!global.continue_on_critical_failure)
        .run(&main_settings);

    // Finalization runs even after a critical halt: the settings that did
    // succeed may need their dependent process restarted.  Failures here
    // never abort.
    if !finalize_settings.is_empty() {
        log.stage("Finalizing");
        Applier::new(&providers, &ctx, &outcomes)
            .with_halt_on_critical(false)
            .run(&finalize_settings);
    }

    outcomes.event(if report.aborted {
        "run aborted"
    } else {
        "run completed"
    });
    outcomes.print_summary();

    if report.aborted {
        return Err(SetupError::Aborted {
            setting_id: report.halted_on.unwrap_or_default(),
        }
        .into());
    }
    Ok(())
}

/// Build the full setting list: catalog plus optional manifest.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or the merged list
/// violates the unique-id invariant.
fn assemble_settings(
    global: &GlobalOpts,
    log: &dyn Log,
) -> Result<(Vec<Setting>, Vec<manifest::ManifestIssue>)> {
    let mut settings = catalog::default_settings();
    let mut issues = Vec::new();
    if let Some(path) = &global.manifest {
        let loaded = manifest::load(path)?;
        log.info(&format!(
            "manifest {} contributed {} settings",
            path.display(),
            loaded.settings.len()
        ));
        settings.extend(loaded.settings);
        issues = loaded.issues;
    }
    settings::validate_unique_ids(&settings)?;
    Ok((settings, issues))
}

/// Apply the `--skip` / `--only` id filters, preserving order.
fn filter_settings(settings: Vec<Setting>, opts: &ApplyOpts) -> Vec<Setting> {
    settings
        .into_iter()
        .filter(|setting| {
            let id = setting.id.to_lowercase();
            if !opts.only.is_empty() {
                return opts.only.iter().any(|o| id.contains(&o.to_lowercase()));
            }
            if !opts.skip.is_empty() {
                return !opts.skip.iter().any(|s| id.contains(&s.to_lowercase()));
            }
            true
        })
        .collect()
}
