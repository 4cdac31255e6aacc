//! Identity prompt.

use std::io::{self, Write};

use osint_core::{Cedula, CedulaRejection};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::screen::Screen;

pub const PROMPT: &str = "Identificación: ";
pub const NOT_TEN_DIGITS: &str = "Debe tener 10 caracteres numéricos";
pub const INVALID: &str = "Identificación inválida";

/// Read one line without its terminator. `None` at end of input.
pub async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// User-facing message for a rejected identity.
pub fn rejection_message(rejection: &CedulaRejection) -> &'static str {
    if rejection.is_format_error() {
        NOT_TEN_DIGITS
    } else {
        INVALID
    }
}

/// Ask for an identity number until a valid one is entered.
///
/// `initial` (the `--id` flag) is checked once before prompting; when it is
/// rejected its message is shown and the interactive prompt takes over.
/// Returns `None` when input ends.
pub async fn read_identity<R, W>(
    input: &mut R,
    out: &mut W,
    screen: &Screen,
    initial: Option<String>,
) -> io::Result<Option<Cedula>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if let Some(candidate) = initial {
        match accept(&candidate) {
            Ok(cedula) => return Ok(Some(cedula)),
            Err(message) => complain(out, screen, message)?,
        }
    }

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;
        let Some(line) = read_line(input).await? else {
            writeln!(out)?;
            return Ok(None);
        };
        match accept(&line) {
            Ok(cedula) => return Ok(Some(cedula)),
            Err(message) => complain(out, screen, message)?,
        }
    }
}

fn accept(candidate: &str) -> Result<Cedula, &'static str> {
    Cedula::new(candidate).map_err(|rejection| {
        tracing::debug!(%rejection, "identity rejected");
        rejection_message(&rejection)
    })
}

fn complain<W: Write>(out: &mut W, screen: &Screen, message: &str) -> io::Result<()> {
    screen.reset(out)?;
    writeln!(out, "{message}")?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> Screen {
        Screen::new(false, false)
    }

    async fn run(input: &str, initial: Option<&str>) -> (Option<Cedula>, String) {
        let mut reader = input.as_bytes();
        let mut out = Vec::new();
        let got = read_identity(&mut reader, &mut out, &quiet(), initial.map(String::from))
            .await
            .unwrap();
        (got, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn valid_initial_skips_prompt() {
        let (got, out) = run("", Some(" 1710034065 ")).await;
        assert_eq!(got.unwrap().as_str(), "1710034065");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn bad_initial_falls_through_to_prompt() {
        let (got, out) = run("1710034065\n", Some("1234567890")).await;
        assert_eq!(got.unwrap().as_str(), "1710034065");
        assert_eq!(out, "Identificación inválida\n\nIdentificación: ");
    }

    #[tokio::test]
    async fn messages_by_rejection_kind() {
        let (got, out) = run("17100\n9999999999\r\n1710034065\n", None).await;
        assert!(got.is_some());
        assert_eq!(
            out,
            "Identificación: Debe tener 10 caracteres numéricos\n\n\
             Identificación: Identificación inválida\n\n\
             Identificación: "
        );
    }

    #[tokio::test]
    async fn end_of_input_returns_none() {
        let (got, out) = run("abc\n", None).await;
        assert!(got.is_none());
        assert!(out.ends_with("Identificación: \n"));
    }
}
