//! `fallecidos`: date of death from the social-security pension request form.
//!
//! The form asks for the deceased's identity number and, when the social
//! security institute has registered a death, shows its date in a span whose
//! id ends with `:fecFallecimiento`.

use async_trait::async_trait;
use osint_core::{Cedula, LookupOutcome};
use url::Url;

use crate::error::LookupError;
use crate::http;
use crate::jsf::{self, Form};
use crate::markup;
use crate::module::LookupModule;

const FORM_PATH: &str = "prjPensionesJubilacion-web/pages/solicitudGenerica/solicitud.jsf";
const ID_INPUT_SUFFIX: &str = ":cedcau";
const DATE_SPAN_SUFFIX: &str = ":fecFallecimiento";
const CONTINUE_LABEL: &str = "Continuar";

static_regex!(iso_date_re, r"^\d{4}-\d{2}-\d{2}$");

/// The deceased-status module.
#[derive(Debug, Clone)]
pub struct DeceasedModule {
    http: reqwest::Client,
    base_url: Url,
}

impl DeceasedModule {
    /// Create the module for the portal at `base_url`.
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl LookupModule for DeceasedModule {
    fn key(&self) -> &'static str {
        "fallecidos"
    }

    fn label(&self) -> &'static str {
        "Fallecidos"
    }

    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
        let get_endpoint = "GET /solicitud.jsf";
        let url = http::endpoint(&self.base_url, FORM_PATH)?;
        let (page_url, page) = http::send_text(
            self.http.get(url).header("Accept", http::ACCEPT_HTML),
            get_endpoint,
        )
        .await?;

        let mut form = Form::containing_input(&page, ID_INPUT_SUFFIX, get_endpoint)?;
        let id_field = form
            .field_ending(ID_INPUT_SUFFIX)
            .ok_or_else(|| LookupError::markup(get_endpoint, "identity input has no name"))?;
        form.set(id_field, cedula.as_str());

        // The "Continuar" button submits the whole form under its own name.
        let button = markup::find(&page, |name, el| {
            name.eq_ignore_ascii_case("input")
                && el.attr("value").as_deref() == Some(CONTINUE_LABEL)
        })
        .and_then(|el| el.attr("name").or_else(|| el.id()));
        if let Some(button) = button {
            form.set(button.clone(), CONTINUE_LABEL);
        }

        let post_url = form.action_url(&page_url)?;
        let (_, body) = http::send_text(
            self.http
                .post(post_url)
                .header("Referer", page_url.as_str())
                .form(form.pairs()),
            "POST /solicitud.jsf",
        )
        .await?;

        Ok(LookupOutcome::from_option(
            death_date(&jsf::response_markup(&body)).map(|d| format!("Fallecimiento: {d}")),
        ))
    }
}

/// The registered date of death, only when it is a `YYYY-MM-DD` value.
fn death_date(markup_text: &str) -> Option<String> {
    let span = markup::by_id_suffix(markup_text, "span", DATE_SPAN_SUFFIX)?;
    let value = span.text();
    iso_date_re().is_match(&value).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_iso_date() {
        let html = r#"<fieldset><legend>Fecha de Fallecimiento</legend>
            <span id="frm:j_idt40:fecFallecimiento"> 2019-03-07 </span></fieldset>"#;
        assert_eq!(death_date(html).as_deref(), Some("2019-03-07"));
    }

    #[test]
    fn ignores_non_dates_and_missing_span() {
        assert_eq!(
            death_date(r#"<span id="f:fecFallecimiento">No registra</span>"#),
            None
        );
        assert_eq!(death_date(r#"<span id="f:fecFallecimiento"></span>"#), None);
        assert_eq!(death_date("<p>nada</p>"), None);
    }
}
