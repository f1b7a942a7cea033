//! The applier: walks the setting list in order and records one outcome
//! per setting.
//!
//! Per-setting lifecycle: pending → skipped (inapplicable, already
//! satisfied, or dry run) or applying → succeeded/failed.  A failed
//! critical setting halts the remaining queue; everything else continues.
//! No reordering, no parallelism: settings mutate shared, order-dependent
//! system state.
use crate::conditions;
use crate::context::RunContext;
use crate::outcome::{OutcomeLog, OutcomeRecord, Status};
use crate::providers::{ProviderSet, SettingState};
use crate::settings::Setting;

/// Aggregate result of one applier pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Whether a critical failure halted the queue.
    pub aborted: bool,
    /// Id of the setting that halted the queue, if any.
    pub halted_on: Option<String>,
}

impl RunReport {
    const fn completed() -> Self {
        Self {
            aborted: false,
            halted_on: None,
        }
    }
}

/// Applies settings strictly in declaration order.
pub struct Applier<'a> {
    providers: &'a ProviderSet,
    ctx: &'a RunContext,
    outcomes: &'a OutcomeLog,
    halt_on_critical: bool,
}

impl std::fmt::Debug for Applier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applier")
            .field("halt_on_critical", &self.halt_on_critical)
            .finish_non_exhaustive()
    }
}

impl<'a> Applier<'a> {
    /// Create an applier that halts on critical failures.
    #[must_use]
    pub fn new(
        providers: &'a ProviderSet,
        ctx: &'a RunContext,
        outcomes: &'a OutcomeLog,
    ) -> Self {
        Self {
            providers,
            ctx,
            outcomes,
            halt_on_critical: true,
        }
    }

    /// Override the halt-on-critical behaviour (the
    /// `--continue-on-critical-failure` flag, and the finalization pass,
    /// disable it).
    #[must_use]
    pub fn with_halt_on_critical(mut self, halt: bool) -> Self {
        self.halt_on_critical = halt;
        self
    }

    /// Apply every setting in order, recording one outcome each.
    ///
    /// On a critical failure the remaining settings are not attempted and
    /// not recorded; the report marks the run as aborted.
    pub fn run(&self, settings: &[Setting]) -> RunReport {
        for setting in settings {
            let record = self.apply_one(setting);
            let failed = record.status == Status::Failed;
            self.outcomes.record(record);
            if failed && setting.critical && self.halt_on_critical {
                self.outcomes.event(&format!(
                    "run aborted: critical setting '{}' failed",
                    setting.id
                ));
                return RunReport {
                    aborted: true,
                    halted_on: Some(setting.id.clone()),
                };
            }
        }
        RunReport::completed()
    }

    /// Drive one setting through the state machine.
    fn apply_one(&self, setting: &Setting) -> OutcomeRecord {
        if !conditions::applicable(&setting.predicate, &self.ctx.facts) {
            return OutcomeRecord::new(
                &setting.id,
                Status::Skipped,
                Some(format!("not applicable: requires {}", setting.predicate)),
            );
        }

        let Some(provider) = self.providers.get(setting.category()) else {
            return OutcomeRecord::new(
                &setting.id,
                Status::Failed,
                Some(format!(
                    "no provider registered for category {}",
                    setting.category()
                )),
            );
        };

        match provider.check(setting, self.ctx) {
            Ok(SettingState::Satisfied) => OutcomeRecord::new(
                &setting.id,
                Status::Skipped,
                Some("already satisfied".to_string()),
            ),
            Ok(SettingState::NotSupported { reason }) => {
                OutcomeRecord::new(&setting.id, Status::Skipped, Some(reason))
            }
            Ok(SettingState::NeedsApply) => {
                if self.ctx.dry_run {
                    self.ctx
                        .log
                        .dry_run(&format!("would apply: {}", setting.description()));
                    return OutcomeRecord::new(
                        &setting.id,
                        Status::Skipped,
                        Some("dry run: would apply".to_string()),
                    );
                }
                self.ctx.log.debug(&format!(
                    "applying {} via {} provider",
                    setting.description(),
                    provider.name()
                ));
                match provider.apply(setting, self.ctx) {
                    Ok(()) => OutcomeRecord::new(&setting.id, Status::Success, None),
                    Err(e) => OutcomeRecord::new(&setting.id, Status::Failed, Some(format!("{e:#}"))),
                }
            }
            // No mutation is attempted on unknown state.
            Err(e) => OutcomeRecord::new(
                &setting.id,
                Status::Failed,
                Some(format!("state check failed: {e:#}")),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;

    use super::*;
    use crate::conditions::Predicate;
    use crate::context::RunContext;
    use crate::facts::HostFacts;
    use crate::logging::Log;
    use crate::logging::test_support::CapturingLog;
    use crate::providers::Provider;
    use crate::providers::test_support::StubExecutor;
    use crate::settings::{Category, RegistryData, SettingKind};

    /// A scripted provider with call counters.
    struct ScriptedProvider {
        check_result: fn() -> Result<SettingState>,
        apply_result: fn() -> Result<()>,
        check_calls: Arc<AtomicUsize>,
        apply_calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        fn new(
            check_result: fn() -> Result<SettingState>,
            apply_result: fn() -> Result<()>,
        ) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let check_calls = Arc::new(AtomicUsize::new(0));
            let apply_calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    check_result,
                    apply_result,
                    check_calls: Arc::clone(&check_calls),
                    apply_calls: Arc::clone(&apply_calls),
                },
                check_calls,
                apply_calls,
            )
        }
    }

    impl Provider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn check(&self, _: &Setting, _: &RunContext) -> Result<SettingState> {
            self.check_calls.fetch_add(1, Ordering::SeqCst);
            (self.check_result)()
        }

        fn apply(&self, _: &Setting, _: &RunContext) -> Result<()> {
            self.apply_calls.fetch_add(1, Ordering::SeqCst);
            (self.apply_result)()
        }
    }

    fn reg_setting(id: &str) -> Setting {
        Setting::new(
            id,
            SettingKind::RegistryValue {
                key_path: r"HKCU\Software\Test".to_string(),
                value_name: "Flag".to_string(),
                data: RegistryData::Dword(1),
            },
        )
    }

    fn make_ctx(dry_run: bool) -> RunContext {
        RunContext::new(
            HostFacts::new(10, 19045, true),
            Arc::new(StubExecutor::default()),
            Arc::new(CapturingLog::new()),
            dry_run,
        )
    }

    fn outcome_log() -> OutcomeLog {
        OutcomeLog::new(
            Arc::new(CapturingLog::new()) as Arc<dyn Log>,
            None,
            false,
        )
    }

    fn providers_with(
        provider: ScriptedProvider,
    ) -> ProviderSet {
        let mut set = ProviderSet::empty();
        set.insert(Category::RegistryValue, Box::new(provider));
        set
    }

    #[test]
    fn needs_apply_leads_to_success() {
        let (provider, checks, applies) =
            ScriptedProvider::new(|| Ok(SettingState::NeedsApply), || Ok(()));
        let providers = providers_with(provider);
        let ctx = make_ctx(false);
        let outcomes = outcome_log();

        let report = Applier::new(&providers, &ctx, &outcomes).run(&[reg_setting("a")]);

        assert!(!report.aborted);
        let records = outcomes.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, Status::Success);
        assert_eq!(checks.load(Ordering::SeqCst), 1);
        assert_eq!(applies.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn satisfied_setting_never_invokes_apply() {
        let (provider, _checks, applies) =
            ScriptedProvider::new(|| Ok(SettingState::Satisfied), || Ok(()));
        let providers = providers_with(provider);
        let ctx = make_ctx(false);
        let outcomes = outcome_log();

        Applier::new(&providers, &ctx, &outcomes).run(&[reg_setting("a")]);

        let records = outcomes.records();
        assert_eq!(records[0].status, Status::Skipped);
        assert_eq!(records[0].detail.as_deref(), Some("already satisfied"));
        assert_eq!(applies.load(Ordering::SeqCst), 0, "apply must not run");
    }

    #[test]
    fn inapplicable_setting_never_reaches_the_provider() {
        let (provider, checks, applies) =
            ScriptedProvider::new(|| Ok(SettingState::NeedsApply), || Ok(()));
        let providers = providers_with(provider);
        let ctx = make_ctx(false); // Windows 10 facts
        let outcomes = outcome_log();

        let setting = reg_setting("only-11").when(Predicate::GenerationIs(
            crate::facts::Generation::Windows11,
        ));
        Applier::new(&providers, &ctx, &outcomes).run(&[setting]);

        let records = outcomes.records();
        assert_eq!(records[0].status, Status::Skipped);
        assert!(
            records[0]
                .detail
                .as_deref()
                .unwrap()
                .contains("not applicable"),
            "detail should mention inapplicability"
        );
        assert_eq!(checks.load(Ordering::SeqCst), 0);
        assert_eq!(applies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsupported_predicate_always_skips() {
        let (provider, checks, _applies) =
            ScriptedProvider::new(|| Ok(SettingState::NeedsApply), || Ok(()));
        let providers = providers_with(provider);
        let ctx = make_ctx(false);
        let outcomes = outcome_log();

        let setting = reg_setting("odd").when(Predicate::Unsupported {
            kind: "moon_phase".to_string(),
        });
        Applier::new(&providers, &ctx, &outcomes).run(&[setting]);

        assert_eq!(outcomes.records()[0].status, Status::Skipped);
        assert_eq!(
            checks.load(Ordering::SeqCst),
            0,
            "an unrecognised condition must never reach Applying"
        );
    }

    #[test]
    fn missing_provider_is_a_failed_outcome_not_a_crash() {
        let providers = ProviderSet::empty();
        let ctx = make_ctx(false);
        let outcomes = outcome_log();

        let report = Applier::new(&providers, &ctx, &outcomes).run(&[reg_setting("a")]);

        assert!(!report.aborted);
        let records = outcomes.records();
        assert_eq!(records[0].status, Status::Failed);
        assert!(
            records[0].detail.as_deref().unwrap().contains("no provider"),
            "detail should name the missing provider"
        );
    }

    #[test]
    fn check_error_fails_without_applying() {
        let (provider, _checks, applies) = ScriptedProvider::new(
            || anyhow::bail!("service 'Ghost' not found"),
            || Ok(()),
        );
        let providers = providers_with(provider);
        let ctx = make_ctx(false);
        let outcomes = outcome_log();

        Applier::new(&providers, &ctx, &outcomes).run(&[reg_setting("a")]);

        let records = outcomes.records();
        assert_eq!(records[0].status, Status::Failed);
        assert!(records[0].detail.as_deref().unwrap().contains("state check failed"));
        assert_eq!(applies.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn critical_failure_halts_the_queue() {
        let (provider, checks, _applies) = ScriptedProvider::new(
            || Ok(SettingState::NeedsApply),
            || anyhow::bail!("kaboom"),
        );
        let providers = providers_with(provider);
        let ctx = make_ctx(false);
        let outcomes = outcome_log();

        let settings = vec![reg_setting("first").critical(), reg_setting("second")];
        let report = Applier::new(&providers, &ctx, &outcomes).run(&settings);

        assert!(report.aborted);
        assert_eq!(report.halted_on.as_deref(), Some("first"));
        assert_eq!(
            outcomes.records().len(),
            1,
            "the second setting must never be attempted"
        );
        assert_eq!(checks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_critical_failure_continues() {
        let calls = Arc::new(AtomicUsize::new(0));
        struct FlakyProvider {
            calls: Arc<AtomicUsize>,
        }
        impl Provider for FlakyProvider {
            fn name(&self) -> &'static str {
                "flaky"
            }
            fn check(&self, _: &Setting, _: &RunContext) -> Result<SettingState> {
                Ok(SettingState::NeedsApply)
            }
            fn apply(&self, _: &Setting, _: &RunContext) -> Result<()> {
                // First apply fails, second succeeds.
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    anyhow::bail!("transient failure")
                }
                Ok(())
            }
        }

        let mut providers = ProviderSet::empty();
        providers.insert(
            Category::RegistryValue,
            Box::new(FlakyProvider {
                calls: Arc::clone(&calls),
            }),
        );
        let ctx = make_ctx(false);
        let outcomes = outcome_log();

        let report = Applier::new(&providers, &ctx, &outcomes)
            .run(&[reg_setting("first"), reg_setting("second")]);

        assert!(!report.aborted);
        let records = outcomes.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Status::Failed);
        assert_eq!(records[1].status, Status::Success);
    }

    #[test]
    fn continue_on_critical_override_keeps_going() {
        let (provider, _checks, _applies) = ScriptedProvider::new(
            || Ok(SettingState::NeedsApply),
            || anyhow::bail!("kaboom"),
        );
        let providers = providers_with(provider);
        let ctx = make_ctx(false);
        let outcomes = outcome_log();

        let settings = vec![reg_setting("first").critical(), reg_setting("second")];
        let report = Applier::new(&providers, &ctx, &outcomes)
            .with_halt_on_critical(false)
            .run(&settings);

        assert!(!report.aborted);
        assert_eq!(outcomes.records().len(), 2);
    }

    #[test]
    fn dry_run_skips_apply_but_reports_intent() {
        let (provider, checks, applies) =
            ScriptedProvider::new(|| Ok(SettingState::NeedsApply), || Ok(()));
        let providers = providers_with(provider);
        let ctx = make_ctx(true);
        let outcomes = outcome_log();

        Applier::new(&providers, &ctx, &outcomes).run(&[reg_setting("a")]);

        let records = outcomes.records();
        assert_eq!(records[0].status, Status::Skipped);
        assert!(records[0].detail.as_deref().unwrap().contains("dry run"));
        assert_eq!(checks.load(Ordering::SeqCst), 1, "dry run still checks state");
        assert_eq!(applies.load(Ordering::SeqCst), 0, "dry run never applies");
    }

    #[test]
    fn settings_are_applied_in_declaration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        struct OrderedProvider {
            order: Arc<std::sync::Mutex<Vec<String>>>,
        }
        impl Provider for OrderedProvider {
            fn name(&self) -> &'static str {
                "ordered"
            }
            fn check(&self, _: &Setting, _: &RunContext) -> Result<SettingState> {
                Ok(SettingState::NeedsApply)
            }
            fn apply(&self, setting: &Setting, _: &RunContext) -> Result<()> {
                self.order.lock().unwrap().push(setting.id.clone());
                Ok(())
            }
        }

        let mut providers = ProviderSet::empty();
        providers.insert(
            Category::RegistryValue,
            Box::new(OrderedProvider {
                order: Arc::clone(&order),
            }),
        );
        let ctx = make_ctx(false);
        let outcomes = outcome_log();

        Applier::new(&providers, &ctx, &outcomes).run(&[
            reg_setting("one"),
            reg_setting("two"),
            reg_setting("three"),
        ]);

        assert_eq!(*order.lock().unwrap(), vec!["one", "two", "three"]);
    }
}
