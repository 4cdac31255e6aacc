//! Module menu.

use std::io::{self, Write};

use osint_core::Cedula;
use osint_lookup::ModuleRegistry;

use crate::selection::parse_selection;

pub const INVALID_SELECTION: &str =
    "Formato inválido. Use números separados por coma, rangos (2-4) o 'todos'.";
pub const SELECTION_INTERRUPTED: &str = "Selección interrumpida. Intenta de nuevo.";

/// What the user asked for at the menu prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Return to the identity prompt.
    Back,
    /// Run these 1-based module numbers.
    Run(Vec<usize>),
    Invalid,
}

pub fn parse_choice(raw: &str, total: usize) -> Choice {
    let raw = raw.trim().to_lowercase();
    if matches!(raw.as_str(), "0" | "volver" | "back") {
        return Choice::Back;
    }
    let selected = parse_selection(&raw, total);
    if selected.is_empty() {
        Choice::Invalid
    } else {
        Choice::Run(selected)
    }
}

/// Identity line shown above the menu and the run output.
pub fn write_identity<W: Write>(out: &mut W, cedula: &Cedula) -> io::Result<()> {
    writeln!(out, "Identificación: {cedula} ({})\n", cedula.province())
}

/// Draw the numbered module list and the selection prompt.
pub fn draw<W: Write>(out: &mut W, cedula: &Cedula, registry: &ModuleRegistry) -> io::Result<()> {
    write_identity(out, cedula)?;
    writeln!(out, "Seleccione módulos (ej: 1,3,5-7) o escriba 'todos':\n")?;
    for (i, module) in registry.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, module.label())?;
    }
    writeln!(out, "\n  0. Volver a la pantalla principal")?;
    write!(out, "\nMódulos: ")?;
    out.flush()
}
