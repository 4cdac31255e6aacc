//! `titulos`: registered higher-education degrees from SENESCYT.
//!
//! The consultation form is guarded by a four-character image CAPTCHA.
//! Each attempt reloads the form, reads a fresh image through the
//! configured [`CaptchaSolver`], and submits the search as a PrimeFaces
//! ajax request.

use std::sync::Arc;

use async_trait::async_trait;
use osint_core::{Cedula, LookupOutcome, Record};
use url::Url;

use crate::captcha::{is_plausible, CaptchaSolver};
use crate::error::LookupError;
use crate::http;
use crate::jsf::{self, Form};
use crate::markup;
use crate::module::LookupModule;
use crate::text::fold;

const CONSULT_PATH: &str = "consulta-titulos-web/faces/vista/consulta/consulta.xhtml";
const FORM_ID: &str = "formPrincipal";
const ID_INPUT: &str = "formPrincipal:identificacion";
const CAPTCHA_INPUT: &str = "formPrincipal:captchaSellerInput";
const CAPTCHA_IMAGE: &str = "formPrincipal:capimg";
const SEARCH_BUTTON: &str = "formPrincipal:boton-buscar";
const MESSAGES: &str = "formPrincipal:messages";

/// Column labels of the rendered table.
pub const COLUMNS: [&str; 3] = [
    "Título",
    "Institución de Educación Superior",
    "Fecha de Registro",
];

/// What the portal made of one submitted attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verdict {
    Found(Vec<Record>),
    NotFound,
    Retry,
}

/// The degrees module.
pub struct TitlesModule {
    http: reqwest::Client,
    base_url: Url,
    solver: Option<Arc<dyn CaptchaSolver>>,
    attempts: u32,
}

impl TitlesModule {
    /// Create the module. Without a solver every search yields
    /// [`LookupOutcome::Absent`].
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        solver: Option<Arc<dyn CaptchaSolver>>,
        attempts: u32,
    ) -> Self {
        Self {
            http,
            base_url,
            solver,
            attempts,
        }
    }

    async fn attempt(
        &self,
        solver: &dyn CaptchaSolver,
        cedula: &Cedula,
        last_image: &mut Option<Vec<u8>>,
    ) -> Result<Verdict, LookupError> {
        let get_endpoint = "GET /consulta.xhtml";
        let url = http::endpoint(&self.base_url, CONSULT_PATH)?;
        let (page_url, page) =
            http::send_text(self.http.get(url).header("Accept", http::ACCEPT_HTML), get_endpoint)
                .await?;
        let mut form = Form::by_id(&page, FORM_ID, get_endpoint)?;

        let src = markup::by_id(&page, CAPTCHA_IMAGE)
            .and_then(|img| img.attr("src"))
            .ok_or_else(|| LookupError::markup(get_endpoint, "captcha image not found"))?;
        let image_url = page_url.join(&src).map_err(|e| {
            LookupError::from(crate::config::ConfigError::InvalidUrl(src.clone(), e.to_string()))
        })?;
        let image = http::send_bytes(
            self.http.get(image_url).header("Referer", page_url.as_str()),
            "GET captcha image",
        )
        .await?;

        if last_image.as_deref() == Some(image.as_slice()) {
            tracing::debug!("captcha image unchanged, reloading");
            return Ok(Verdict::Retry);
        }
        let answer = solver.solve(&image).await?;
        *last_image = Some(image);
        if !is_plausible(&answer) {
            tracing::debug!(answer = %answer, "implausible captcha answer");
            return Ok(Verdict::Retry);
        }

        form.set(ID_INPUT, cedula.as_str());
        form.set(CAPTCHA_INPUT, answer);
        let mut pairs = form.ajax_pairs(SEARCH_BUTTON, "@all", FORM_ID);
        pairs.push((SEARCH_BUTTON.to_string(), SEARCH_BUTTON.to_string()));

        let post_url = form.action_url(&page_url)?;
        let (_, body) = http::send_text(
            http::ajax(self.http.post(post_url), &page_url).form(&pairs),
            "POST /consulta.xhtml (search)",
        )
        .await?;
        Ok(verdict(&jsf::response_markup(&body)))
    }
}

impl std::fmt::Debug for TitlesModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitlesModule")
            .field("base_url", &self.base_url.as_str())
            .field("solver", &self.solver.is_some())
            .field("attempts", &self.attempts)
            .finish()
    }
}

#[async_trait]
impl LookupModule for TitlesModule {
    fn key(&self) -> &'static str {
        "titulos"
    }

    fn label(&self) -> &'static str {
        "Títulos SENESCYT"
    }

    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
        let Some(solver) = self.solver.as_deref() else {
            tracing::debug!("no captcha solver configured");
            return Ok(LookupOutcome::Absent);
        };

        let mut last_image = None;
        for attempt in 1..=self.attempts {
            match self.attempt(solver, cedula, &mut last_image).await? {
                Verdict::Found(rows) => return Ok(LookupOutcome::table(rows)),
                Verdict::NotFound => return Ok(LookupOutcome::Absent),
                Verdict::Retry => tracing::debug!(attempt, "captcha rejected"),
            }
        }
        tracing::debug!(attempts = self.attempts, "captcha attempts exhausted");
        Ok(LookupOutcome::Absent)
    }
}

/// Classify the re-rendered form. Neither a message nor a result table
/// counts as a rejected CAPTCHA.
fn verdict(html: &str) -> Verdict {
    if let Some(messages) = markup::by_id(html, MESSAGES) {
        let text = fold(&messages.text());
        if text.contains("caracteres incorrectos") {
            return Verdict::Retry;
        }
        if text.contains("no se encontraron resultados") || text.contains("no existen registros") {
            return Verdict::NotFound;
        }
    }
    let rows = degree_rows(html);
    if rows.is_empty() {
        Verdict::Retry
    } else {
        Verdict::Found(rows)
    }
}

/// Rows of every table whose headers include the registration date, the
/// degree, and the institution.
fn degree_rows(html: &str) -> Vec<Record> {
    let wanted = ["titulo", "institucion de educacion superior", "fecha de registro"];
    let mut out = Vec::new();

    for table in markup::elements(html, "table") {
        let headers: Vec<String> = markup::elements(table.inner, "th")
            .iter()
            .map(|th| fold(&th.text()))
            .collect();
        let Some(columns) = wanted
            .iter()
            .map(|w| headers.iter().position(|h| h == w))
            .collect::<Option<Vec<usize>>>()
        else {
            continue;
        };

        let body = markup::elements(table.inner, "tbody")
            .first()
            .map_or(table.inner, |b| b.inner);
        for tr in markup::top_level(body, "tr") {
            let cells: Vec<String> = markup::top_level(tr.inner, "td")
                .iter()
                .map(|td| td.text())
                .collect();
            if cells.is_empty() || columns.iter().any(|&i| i >= cells.len()) {
                continue;
            }
            out.push(
                COLUMNS
                    .iter()
                    .zip(&columns)
                    .map(|(label, &i)| (*label, cells[i].clone()))
                    .collect::<Record>(),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT: &str = r#"
    <div id="formPrincipal:messages" class="ui-messages"></div>
    <div class="ui-datatable"><table>
      <thead><tr><th>Título</th><th>Institución de Educación Superior</th><th>Tipo</th>
        <th>Reconocido Por</th><th>Número de Registro</th><th>Fecha de Registro</th></tr></thead>
      <tbody>
        <tr><td>INGENIERO EN SISTEMAS</td><td>ESCUELA POLITÉCNICA NACIONAL</td><td>Nacional</td>
          <td></td><td>1001-2010-123456</td><td>2010-08-20</td></tr>
        <tr><td colspan="6">No existen registros.</td></tr>
      </tbody></table></div>"#;

    #[test]
    fn extracts_degree_rows() {
        let Verdict::Found(rows) = verdict(RESULT) else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Título"), Some("INGENIERO EN SISTEMAS"));
        assert_eq!(
            rows[0].get("Institución de Educación Superior"),
            Some("ESCUELA POLITÉCNICA NACIONAL")
        );
        assert_eq!(rows[0].get("Fecha de Registro"), Some("2010-08-20"));
    }

    #[test]
    fn messages_classify_attempt() {
        let wrong = r#"<div id="formPrincipal:messages"><span>Caracteres incorrectos</span></div>"#;
        assert_eq!(verdict(wrong), Verdict::Retry);

        let none = r#"<div id="formPrincipal:messages"><span>No se encontraron resultados</span></div>"#;
        assert_eq!(verdict(none), Verdict::NotFound);

        assert_eq!(verdict("<div>cargando</div>"), Verdict::Retry);
    }

    #[test]
    fn tables_without_wanted_headers_are_ignored() {
        let html = "<table><thead><tr><th>Título</th></tr></thead><tbody><tr><td>X</td></tr></tbody></table>";
        assert!(degree_rows(html).is_empty());
    }
}
