//! # Lookup Dispatch
//!
//! Runs the selected modules one at a time, in selection order. A module
//! failure is logged and shown as "no results"; it never stops the run.
//! A run can be cut short by an interrupt future, which the console wires
//! to Ctrl+C through [`RunGuard`].

use std::future::Future;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use osint_core::{Cedula, LookupOutcome};
use osint_lookup::{LookupModule, ModuleRegistry};
use serde::Serialize;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::render::render_outcome;

/// How a dispatch run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every selected module ran.
    Completed,
    /// The interrupt fired before the run finished.
    Interrupted,
}

/// One module's result, as emitted by batch mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub module: &'static str,
    pub label: &'static str,
    pub outcome: LookupOutcome,
}

/// Run one module, collapsing any error to [`LookupOutcome::Absent`].
pub async fn run_module(module: &dyn LookupModule, cedula: &Cedula) -> LookupOutcome {
    tracing::info!(module = module.key(), "running lookup");
    match module.search(cedula).await {
        Ok(outcome) => {
            tracing::debug!(module = module.key(), absent = outcome.is_absent(), "lookup finished");
            outcome
        }
        Err(e) => {
            tracing::warn!(module = module.key(), error = %e, "lookup failed");
            LookupOutcome::Absent
        }
    }
}

/// Runs selections against a [`ModuleRegistry`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: ModuleRegistry,
}

impl Dispatcher {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Run the 1-based `selected` modules, rendering each outcome to `out`
    /// as soon as it is available.
    ///
    /// `interrupt` is raced against every module; when it resolves the
    /// in-flight lookup is dropped and the remaining modules are skipped.
    pub async fn run<W, F>(
        &self,
        cedula: &Cedula,
        selected: &[usize],
        out: &mut W,
        interrupt: F,
    ) -> io::Result<RunStatus>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        for module in self.selected(selected) {
            write!(out, "==> {}\n\n", module.label())?;
            out.flush()?;
            let outcome = tokio::select! {
                biased;
                _ = &mut interrupt => {
                    tracing::info!(module = module.key(), "run interrupted");
                    return Ok(RunStatus::Interrupted);
                }
                outcome = run_module(module, cedula) => outcome,
            };
            render_outcome(out, module.label(), &outcome)?;
            out.flush()?;
        }
        Ok(RunStatus::Completed)
    }

    /// Run the 1-based `selected` modules and return their outcomes.
    pub async fn collect(&self, cedula: &Cedula, selected: &[usize]) -> Vec<Report> {
        let mut reports = Vec::with_capacity(selected.len());
        for module in self.selected(selected) {
            reports.push(Report {
                module: module.key(),
                label: module.label(),
                outcome: run_module(module, cedula).await,
            });
        }
        reports
    }

    fn selected<'a>(&'a self, selected: &'a [usize]) -> impl Iterator<Item = &'a dyn LookupModule> + 'a {
        selected
            .iter()
            .filter_map(|n| n.checked_sub(1))
            .filter_map(|i| self.registry.get(i))
            .map(|m| m.as_ref())
    }
}

/// Where the console is waiting when Ctrl+C arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Identity prompt or between screens. Ctrl+C ends the session.
    Idle = 0,
    /// Reading a module selection.
    Menu = 1,
    /// Modules are running.
    Running = 2,
    /// Waiting for Enter after a run.
    AwaitingEnter = 3,
}

impl Phase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Menu,
            2 => Self::Running,
            3 => Self::AwaitingEnter,
            _ => Self::Idle,
        }
    }
}

/// Routes Ctrl+C either to the console or to the caller.
///
/// Outside [`Phase::Idle`], [`RunGuard::interrupt`] wakes every future
/// obtained from [`RunGuard::interrupted`] and returns `true`. In
/// [`Phase::Idle`] it returns `false` and the caller decides what Ctrl+C
/// means.
#[derive(Debug, Default)]
pub struct RunGuard {
    phase: AtomicU8,
    notify: Notify,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn interrupt(&self) -> bool {
        if self.phase() == Phase::Idle {
            return false;
        }
        self.notify.notify_waiters();
        true
    }

    /// A future that resolves on the next [`RunGuard::interrupt`].
    ///
    /// Call `enable` on the pinned future before entering a phase, or an
    /// interrupt that lands before the first poll is missed.
    pub fn interrupted(&self) -> Notified<'_> {
        self.notify.notified()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use osint_lookup::LookupError;

    use super::*;

    struct Fixed {
        key: &'static str,
        result: fn() -> Result<LookupOutcome, LookupError>,
    }

    #[async_trait]
    impl LookupModule for Fixed {
        fn key(&self) -> &'static str {
            self.key
        }
        fn label(&self) -> &'static str {
            self.key
        }
        async fn search(&self, _cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
            (self.result)()
        }
    }

    struct Hangs;

    #[async_trait]
    impl LookupModule for Hangs {
        fn key(&self) -> &'static str {
            "lento"
        }
        fn label(&self) -> &'static str {
            "Lento"
        }
        async fn search(&self, _cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
            std::future::pending().await
        }
    }

    fn cedula() -> Cedula {
        Cedula::new("1710034065").unwrap()
    }

    fn dispatcher() -> Dispatcher {
        let modules: Vec<Arc<dyn LookupModule>> = vec![
            Arc::new(Fixed {
                key: "uno",
                result: || Ok(LookupOutcome::Line("primero".into())),
            }),
            Arc::new(Fixed {
                key: "dos",
                result: || Err(LookupError::Captcha("sin OCR".into())),
            }),
            Arc::new(Fixed {
                key: "tres",
                result: || Ok(LookupOutcome::Lines(vec!["a".into(), "b".into()])),
            }),
        ];
        Dispatcher::new(ModuleRegistry::from_modules(modules))
    }

    #[tokio::test]
    async fn runs_in_selection_order_and_collapses_errors() {
        let mut out = Vec::new();
        let status = dispatcher()
            .run(&cedula(), &[3, 2, 1], &mut out, std::future::pending())
            .await
            .unwrap();
        assert_eq!(status, RunStatus::Completed);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "==> tres\n\na\nb\n\n==> dos\n\n(sin resultados)\n\n==> uno\n\nprimero\n\n"
        );
    }

    #[tokio::test]
    async fn interrupt_skips_remaining_modules() {
        let modules: Vec<Arc<dyn LookupModule>> = vec![
            Arc::new(Hangs),
            Arc::new(Fixed {
                key: "uno",
                result: || Ok(LookupOutcome::Line("nunca".into())),
            }),
        ];
        let dispatcher = Dispatcher::new(ModuleRegistry::from_modules(modules));
        let guard = Arc::new(RunGuard::new());
        guard.enter(Phase::Running);

        let notified = guard.interrupted();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let trigger = Arc::clone(&guard);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.interrupt();
        });

        let mut out = Vec::new();
        let status = dispatcher
            .run(&cedula(), &[1, 2], &mut out, notified)
            .await
            .unwrap();
        assert_eq!(status, RunStatus::Interrupted);
        assert_eq!(String::from_utf8(out).unwrap(), "==> Lento\n\n");
    }

    #[tokio::test]
    async fn collect_reports_keys_and_outcomes() {
        let reports = dispatcher().collect(&cedula(), &[2, 1, 9]).await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].module, "dos");
        assert!(reports[0].outcome.is_absent());
        assert_eq!(reports[1].outcome, LookupOutcome::Line("primero".into()));

        let json = serde_json::to_value(&reports[1]).unwrap();
        assert_eq!(json["module"], "uno");
        assert_eq!(json["outcome"]["kind"], "line");
        assert_eq!(json["outcome"]["value"], "primero");
    }

    #[test]
    fn interrupt_only_outside_idle() {
        let guard = RunGuard::new();
        assert_eq!(guard.phase(), Phase::Idle);
        assert!(!guard.interrupt());
        for phase in [Phase::Menu, Phase::Running, Phase::AwaitingEnter] {
            guard.enter(phase);
            assert_eq!(guard.phase(), phase);
            assert!(guard.interrupt());
        }
        guard.enter(Phase::Idle);
        assert!(!guard.interrupt());
    }
}
