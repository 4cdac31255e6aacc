//! Text rendering of lookup outcomes.

use std::io::{self, Write};

use osint_core::{LookupOutcome, Record};

pub const NO_RESULTS: &str = "(sin resultados)";
pub const PRESS_ENTER: &str = "\nPresiona Enter para volver al menú...";
pub const INTERRUPTED: &str = "Ejecución interrumpida. Regresando al menú...";

/// Write one module's outcome, followed by a blank line.
pub fn render_outcome<W: Write>(out: &mut W, label: &str, outcome: &LookupOutcome) -> io::Result<()> {
    match outcome {
        LookupOutcome::Absent => writeln!(out, "{NO_RESULTS}\n"),
        LookupOutcome::Line(text) => writeln!(out, "{}\n", text.trim()),
        LookupOutcome::Lines(lines) => {
            for line in lines {
                writeln!(out, "{line}")?;
            }
            writeln!(out)
        }
        LookupOutcome::Record(record) => {
            render_table(out, &format!("Resultados: {label}"), std::slice::from_ref(record))
        }
        LookupOutcome::Table(rows) => render_table(out, &format!("Resultados: {label}"), rows),
    }
}

/// Draw `rows` as a bordered table.
///
/// Columns are the union of all labels in first-seen order. Widths are
/// counted in characters so accented text lines up.
pub fn render_table<W: Write>(out: &mut W, title: &str, rows: &[Record]) -> io::Result<()> {
    if rows.is_empty() {
        return writeln!(out, "{NO_RESULTS}\n");
    }

    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for label in row.labels() {
            if !columns.contains(&label) {
                columns.push(label);
            }
        }
    }
    let widths: Vec<usize> = columns
        .iter()
        .map(|col| {
            rows.iter()
                .map(|r| r.get(col).unwrap_or("").chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let border = format!("+{border}+");
    let line = |cells: Vec<&str>| {
        let body = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!(" {}{} ", cell, " ".repeat(w - cell.chars().count())))
            .collect::<Vec<_>>()
            .join("|");
        format!("|{body}|")
    };

    writeln!(out, "{title}")?;
    writeln!(out, "{border}")?;
    writeln!(out, "{}", line(columns.clone()))?;
    writeln!(out, "{border}")?;
    for row in rows {
        let cells = columns.iter().map(|c| row.get(c).unwrap_or("")).collect();
        writeln!(out, "{}", line(cells))?;
    }
    writeln!(out, "{border}")?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(outcome: &LookupOutcome) -> String {
        let mut out = Vec::new();
        render_outcome(&mut out, "Prueba", outcome).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn absent_line_and_lines() {
        assert_eq!(render(&LookupOutcome::Absent), "(sin resultados)\n\n");
        assert_eq!(render(&LookupOutcome::Line("CASADO".into())), "CASADO\n\n");
        assert_eq!(
            render(&LookupOutcome::Lines(vec!["a".into(), "b".into()])),
            "a\nb\n\n"
        );
    }

    #[test]
    fn table_with_accented_values() {
        let rows = vec![
            Record::new().with("Título", "ING").with("Año", "2010"),
            Record::new().with("Título", "MAGÍSTER").with("Nota", "x"),
        ];
        let text = render(&LookupOutcome::Table(rows));
        let expected = "\
Resultados: Prueba
+----------+------+------+
| Título   | Año  | Nota |
+----------+------+------+
| ING      | 2010 |      |
| MAGÍSTER |      | x    |
+----------+------+------+

";
        assert_eq!(text, expected);
    }

    #[test]
    fn record_is_a_single_row_table() {
        let text = render(&LookupOutcome::Record(Record::new().with("k", "v")));
        assert!(text.starts_with("Resultados: Prueba\n+---+\n| k |\n"), "{text}");
        assert!(text.contains("| v |"));
    }
}
