//! # osint-cli — Console for osint-ec
//!
//! The interactive flow is a loop of two screens:
//!
//! 1. **Identity prompt**: read a cédula until one passes validation.
//! 2. **Module menu**: pick modules by number, range or `todos`, run them,
//!    and come back to the menu. `0` returns to the identity prompt.
//!
//! Ctrl+C at the menu redraws it, and after a run it returns to the menu.
//! End of input on either screen ends the session. Output goes through a
//! generic writer and input through an async reader, so the whole flow is
//! testable in memory.

pub mod dispatch;
pub mod menu;
pub mod prompt;
pub mod render;
pub mod screen;
pub mod selection;

use std::io::{self, Write};
use std::sync::Arc;

use osint_core::Cedula;
use tokio::io::AsyncBufRead;

use dispatch::{Dispatcher, Phase, RunGuard, RunStatus};
use menu::Choice;
use screen::Screen;

/// The interactive console.
pub struct Console<R, W> {
    input: R,
    out: W,
    screen: Screen,
    dispatcher: Dispatcher,
    guard: Arc<RunGuard>,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W, screen: Screen, dispatcher: Dispatcher, guard: Arc<RunGuard>) -> Self {
        Self {
            input,
            out,
            screen,
            dispatcher,
            guard,
        }
    }

    /// Run until input ends. `initial` is the `--id` value, used only on
    /// the first pass through the identity prompt.
    pub async fn run(&mut self, initial: Option<String>) -> io::Result<()> {
        let mut initial = initial;
        loop {
            self.screen.reset(&mut self.out)?;
            let identity = prompt::read_identity(
                &mut self.input,
                &mut self.out,
                &self.screen,
                initial.take(),
            )
            .await?;
            let Some(cedula) = identity else {
                return Ok(());
            };
            if !self.menu(&cedula).await? {
                return Ok(());
            }
        }
    }

    /// Returns `false` when input ended, `true` to go back to the prompt.
    async fn menu(&mut self, cedula: &Cedula) -> io::Result<bool> {
        let mut notice: Option<&'static str> = None;
        loop {
            self.screen.reset(&mut self.out)?;
            if let Some(notice) = notice.take() {
                writeln!(self.out, "{notice}\n")?;
            }
            menu::draw(&mut self.out, cedula, self.dispatcher.registry())?;
            let raw = match self.read_interruptible(Phase::Menu).await? {
                Input::Line(raw) => raw,
                Input::Interrupted => {
                    notice = Some(menu::SELECTION_INTERRUPTED);
                    continue;
                }
                Input::Eof => {
                    writeln!(self.out)?;
                    return Ok(false);
                }
            };

            let selected = match menu::parse_choice(&raw, self.dispatcher.registry().len()) {
                Choice::Back => return Ok(true),
                Choice::Invalid => {
                    notice = Some(menu::INVALID_SELECTION);
                    continue;
                }
                Choice::Run(selected) => selected,
            };

            match self.execute(cedula, &selected).await? {
                RunStatus::Interrupted => notice = Some(render::INTERRUPTED),
                RunStatus::Completed => {
                    writeln!(self.out, "{}", render::PRESS_ENTER)?;
                    self.out.flush()?;
                    // Enter and Ctrl+C both lead back to the menu.
                    if let Input::Eof = self.read_interruptible(Phase::AwaitingEnter).await? {
                        return Ok(false);
                    }
                }
            }
        }
    }

    async fn execute(&mut self, cedula: &Cedula, selected: &[usize]) -> io::Result<RunStatus> {
        self.screen.reset(&mut self.out)?;
        menu::write_identity(&mut self.out, cedula)?;
        writeln!(self.out, "Ejecutando módulos...\n")?;

        let interrupted = self.guard.interrupted();
        tokio::pin!(interrupted);
        interrupted.as_mut().enable();
        self.guard.enter(Phase::Running);
        let status = self
            .dispatcher
            .run(cedula, selected, &mut self.out, interrupted)
            .await;
        self.guard.enter(Phase::Idle);
        status
    }

    /// Read a line while `phase` is active, so that Ctrl+C interrupts the
    /// read instead of ending the session.
    async fn read_interruptible(&mut self, phase: Phase) -> io::Result<Input> {
        let interrupted = self.guard.interrupted();
        tokio::pin!(interrupted);
        interrupted.as_mut().enable();
        self.guard.enter(phase);
        let input = tokio::select! {
            biased;
            _ = &mut interrupted => Ok(Input::Interrupted),
            line = prompt::read_line(&mut self.input) => {
                line.map(|line| line.map_or(Input::Eof, Input::Line))
            }
        };
        self.guard.enter(Phase::Idle);
        if let Ok(Input::Interrupted) = input {
            tracing::debug!(?phase, "read interrupted");
        }
        input
    }
}

enum Input {
    Line(String),
    Eof,
    Interrupted,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use osint_core::LookupOutcome;
    use tokio::io::AsyncWriteExt;
    use osint_lookup::{LookupError, LookupModule, ModuleRegistry};

    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl LookupModule for Named {
        fn key(&self) -> &'static str {
            "nombres"
        }
        fn label(&self) -> &'static str {
            "Nombres"
        }
        async fn search(&self, _cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
            Ok(LookupOutcome::line(self.0))
        }
    }

    fn dispatcher() -> Dispatcher {
        let modules: Vec<Arc<dyn LookupModule>> = vec![Arc::new(Named("JUAN PEREZ"))];
        Dispatcher::new(ModuleRegistry::from_modules(modules))
    }

    async fn wait_for(guard: &RunGuard, phase: Phase) {
        while guard.phase() != phase {
            tokio::task::yield_now().await;
        }
    }

    async fn session(input: &str, initial: Option<&str>) -> String {
        let dispatcher = dispatcher();
        let mut out = Vec::new();
        Console::new(
            input.as_bytes(),
            &mut out,
            Screen::new(false, false),
            dispatcher,
            Arc::new(RunGuard::new()),
        )
        .run(initial.map(String::from))
        .await
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn full_round_trip() {
        let out = session("1710034065\n1\n\n0\n", None).await;
        assert!(out.contains("  1. Nombres\n"), "{out}");
        assert!(out.contains("Ejecutando módulos...\n\n==> Nombres\n\nJUAN PEREZ\n\n"), "{out}");
        assert!(out.contains("Presiona Enter para volver al menú..."), "{out}");
        // Back at the identity prompt after `0`, then input ends.
        assert!(out.ends_with("Identificación: \n"), "{out}");
    }

    #[tokio::test]
    async fn invalid_selection_shows_notice() {
        let out = session("x\n", Some("1710034065")).await;
        let notice = out.find(menu::INVALID_SELECTION).expect("notice shown");
        let second_menu = out.rfind("Seleccione módulos").expect("menu redrawn");
        assert!(notice < second_menu);
        assert!(!out.contains("==>"));
    }

    #[tokio::test]
    async fn end_of_input_at_prompt_exits() {
        let out = session("", None).await;
        assert_eq!(out, "Identificación: \n");
    }

    #[tokio::test]
    async fn interrupt_at_menu_and_enter_prompt_keeps_session() {
        let (mut tx, rx) = tokio::io::duplex(1024);
        let guard = Arc::new(RunGuard::new());
        let mut out = Vec::new();
        let mut console = Console::new(
            tokio::io::BufReader::new(rx),
            &mut out,
            Screen::new(false, false),
            dispatcher(),
            Arc::clone(&guard),
        );

        let driver = {
            let guard = Arc::clone(&guard);
            async move {
                tx.write_all(b"1710034065\n").await.unwrap();
                wait_for(&guard, Phase::Menu).await;
                assert!(guard.interrupt());

                tx.write_all(b"1\n").await.unwrap();
                wait_for(&guard, Phase::AwaitingEnter).await;
                assert!(guard.interrupt());

                wait_for(&guard, Phase::Menu).await;
                tx.write_all(b"0\n").await.unwrap();
                // End of input at the identity prompt closes the session.
                drop(tx);
            }
        };

        let (ran, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(console.run(None), driver)
        })
        .await
        .expect("session finished");
        ran.unwrap();
        drop(console);

        let out = String::from_utf8(out).unwrap();
        let notice = out.find(menu::SELECTION_INTERRUPTED).expect("notice shown");
        let run = out.find("==> Nombres").expect("modules ran");
        assert!(notice < run, "{out}");
        assert_eq!(out.matches("Presiona Enter para volver al menú...").count(), 1);
        assert_eq!(out.matches("Seleccione módulos").count(), 3, "{out}");
        assert!(out.ends_with("Identificación: \n"), "{out}");
        assert_eq!(guard.phase(), Phase::Idle);
        assert!(!guard.interrupt());
    }
}
