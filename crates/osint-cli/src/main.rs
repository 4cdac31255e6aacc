//! # osint-ec entry point
//!
//! Without `--select` the interactive console runs. With `--select` the
//! chosen modules run once for `--id` and the process exits, printing text
//! or, with `--json`, a JSON array of reports.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use osint_cli::dispatch::{Dispatcher, RunGuard};
use osint_cli::render::render_outcome;
use osint_cli::screen::Screen;
use osint_cli::selection::parse_selection;
use osint_cli::{prompt, Console};
use osint_core::Cedula;
use osint_lookup::{LookupConfig, ModuleRegistry};

/// Framework ligero de OSINT (Ecuador) para consola.
#[derive(Parser, Debug)]
#[command(name = "osint-ec", version, about, long_about = None)]
struct Cli {
    /// Identificación inicial (10 dígitos).
    #[arg(short, long)]
    id: Option<String>,

    /// No mostrar el banner ASCII al iniciar.
    #[arg(long)]
    no_banner: bool,

    /// Enable verbose logging on stderr. Repeat for more (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// YAML file overriding portal URLs and HTTP/CAPTCHA settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run these modules once and exit: numbers, ranges, `todos`, or
    /// comma-separated module keys.
    #[arg(long, requires = "id")]
    select: Option<String>,

    /// Print batch results as JSON.
    #[arg(long, requires = "select")]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "osint-ec starting");

    let result = match build_registry(&cli) {
        Ok(registry) => match cli.select.as_deref() {
            Some(selection) => run_batch(&cli, selection, registry).await,
            None => run_interactive(&cli, registry).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn build_registry(cli: &Cli) -> anyhow::Result<ModuleRegistry> {
    let mut config = LookupConfig::from_env().context("reading OSINT_* environment")?;
    if let Some(path) = &cli.config {
        config = config
            .merge_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    tracing::debug!(captcha = config.captcha_enabled(), "configuration loaded");
    ModuleRegistry::standard(&config).context("building lookup modules")
}

async fn run_interactive(cli: &Cli, registry: ModuleRegistry) -> anyhow::Result<u8> {
    let guard = Arc::new(RunGuard::new());
    let watcher = Arc::clone(&guard);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !watcher.interrupt() {
                println!("\nOperación cancelada por el usuario.");
                std::process::exit(2);
            }
        }
    });

    let stdout = io::stdout();
    let screen = Screen::new(!cli.no_banner, stdout.is_terminal());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    Console::new(stdin, stdout, screen, Dispatcher::new(registry), guard)
        .run(cli.id.clone())
        .await
        .context("console I/O")?;
    Ok(0)
}

async fn run_batch(cli: &Cli, selection: &str, registry: ModuleRegistry) -> anyhow::Result<u8> {
    let raw = cli.id.as_deref().unwrap_or_default();
    let cedula = match Cedula::new(raw) {
        Ok(cedula) => cedula,
        Err(rejection) => {
            eprintln!("{}: {rejection}", prompt::rejection_message(&rejection));
            return Ok(2);
        }
    };
    let selected = resolve_selection(selection, &registry);
    if selected.is_empty() {
        eprintln!("{}", osint_cli::menu::INVALID_SELECTION);
        return Ok(2);
    }

    let reports = Dispatcher::new(registry).collect(&cedula, &selected).await;
    let mut out = io::stdout().lock();
    if cli.json {
        let json = serde_json::to_string_pretty(&reports).context("encoding reports")?;
        writeln!(out, "{json}")?;
    } else {
        for report in &reports {
            write!(out, "==> {}\n\n", report.label)?;
            render_outcome(&mut out, report.label, &report.outcome)?;
        }
    }
    out.flush()?;
    Ok(0)
}

/// Menu-style selection, or failing that a comma-separated list of module
/// keys. An unknown key rejects the whole list.
fn resolve_selection(raw: &str, registry: &ModuleRegistry) -> Vec<usize> {
    let by_number = parse_selection(raw, registry.len());
    if !by_number.is_empty() {
        return by_number;
    }
    let mut picked = Vec::new();
    for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        let Some(n) = registry.iter().position(|m| m.key() == key).map(|i| i + 1) else {
            return Vec::new();
        };
        if !picked.contains(&n) {
            picked.push(n);
        }
    }
    picked
}
