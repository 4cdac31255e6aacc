//! Social-registry request portal (SIIRS).
//!
//! Typing an identity number into the request form fires a JSF
//! `valueChange` ajax event; the partial response re-renders the form with
//! the registered person's name filled in.

use async_trait::async_trait;
use osint_core::Cedula;
use regex::Regex;
use url::Url;

use crate::error::LookupError;
use crate::http;
use crate::jsf::{Form, PartialResponse};
use crate::markup;
use crate::names::NameBackend;
use crate::text::collapse_ws;

const FORM_PATH: &str = "pages/publico/requerimiento.jsf";
const FORM_ID: &str = "frmIngreso";
const INPUT_ID: &str = "frmIngreso:txtCedula";
const RENDER_IDS: &str = "frmIngreso:txtCedula frmIngreso frmIngreso:messCuen msgs2 \
                          frmIngreso:lblUbicacion frmValidacion frmIngreso:checkMensaje";

static_regex!(given_label_re, r"(?i)^nombres?\s*(?::\s*(.*))?$");
static_regex!(surname_label_re, r"(?i)^apellidos?\s*(?::\s*(.*))?$");

/// Name lookup through the SIIRS request form.
#[derive(Debug, Clone)]
pub struct SocialRegistryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SocialRegistryClient {
    /// Create a client for the portal at `base_url`.
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl NameBackend for SocialRegistryClient {
    fn name(&self) -> &'static str {
        "siirs"
    }

    async fn full_name(&self, cedula: &Cedula) -> Result<Option<String>, LookupError> {
        let url = http::endpoint(&self.base_url, FORM_PATH)?;
        let (page_url, page) = http::send_text(
            self.http
                .get(url)
                .header("Cache-Control", "no-cache")
                .header("Pragma", "no-cache"),
            "GET /requerimiento.jsf",
        )
        .await?;

        let mut form = Form::by_id(&page, FORM_ID, "GET /requerimiento.jsf")?;
        form.set(FORM_ID, FORM_ID);
        form.set(INPUT_ID, cedula.as_str());
        let mut pairs = form.ajax_pairs(INPUT_ID, INPUT_ID, RENDER_IDS);
        pairs.push(("javax.faces.behavior.event".into(), "valueChange".into()));
        pairs.push(("javax.faces.partial.event".into(), "change".into()));

        let post_url = form.action_url(&page_url)?;
        let (_, body) = http::send_text(
            http::ajax(self.http.post(post_url), &page_url).form(&pairs),
            "POST /requerimiento.jsf (valueChange)",
        )
        .await?;

        Ok(extract_name(&PartialResponse::parse(&body)))
    }
}

/// Read the name from the re-rendered form: `lblName` when present,
/// otherwise given names and surnames composed.
fn extract_name(partial: &PartialResponse) -> Option<String> {
    let mut full = None;
    let mut given = None;
    let mut surnames = None;

    for chunk in partial.preferred(&[FORM_ID]) {
        full = label_text(chunk, "frmIngreso:lblName");
        if full.is_none() {
            let lines = markup::text_lines(chunk);
            if given.is_none() {
                given = label_text(chunk, "frmIngreso:lblNombres")
                    .or_else(|| label_value(&lines, given_label_re()));
            }
            if surnames.is_none() {
                surnames = label_text(chunk, "frmIngreso:lblApellidos")
                    .or_else(|| label_value(&lines, surname_label_re()));
            }
        }
        if full.is_some() || given.is_some() || surnames.is_some() {
            break;
        }
    }

    full.or_else(|| {
        let parts: Vec<String> = [given, surnames].into_iter().flatten().collect();
        Some(parts.join(" ")).filter(|s| !s.is_empty())
    })
    .map(|s| collapse_ws(&s))
    .filter(|s| !s.is_empty())
}

fn label_text(html: &str, id: &str) -> Option<String> {
    markup::by_id(html, id)
        .map(|el| el.text())
        .filter(|t| !t.is_empty())
}

/// Value following a `Label:` line, inline or on the next line.
fn label_value(lines: &[String], label: &Regex) -> Option<String> {
    lines.iter().enumerate().find_map(|(i, line)| {
        let caps = label.captures(line)?;
        match caps.get(1).map(|m| m.as_str().trim()) {
            Some(inline) if !inline.is_empty() => Some(inline.to_string()),
            _ => lines.get(i + 1).cloned(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(fragment: &str) -> PartialResponse {
        PartialResponse::parse(&format!(
            r#"<partial-response><changes><update id="frmIngreso"><![CDATA[{fragment}]]></update>
<update id="javax.faces.ViewState"><![CDATA[1:2]]></update></changes></partial-response>"#
        ))
    }

    #[test]
    fn full_name_label() {
        let p = partial(r#"<span id="frmIngreso:lblName"> PEREZ  LOPEZ JUAN </span>"#);
        assert_eq!(extract_name(&p).as_deref(), Some("PEREZ LOPEZ JUAN"));
    }

    #[test]
    fn composed_from_split_labels() {
        let p = partial(
            r#"<span id="frmIngreso:lblNombres">JUAN</span><span id="frmIngreso:lblApellidos">PEREZ LOPEZ</span>"#,
        );
        assert_eq!(extract_name(&p).as_deref(), Some("JUAN PEREZ LOPEZ"));
    }

    #[test]
    fn label_text_fallback() {
        let p = partial(
            "<table><tr><td>Nombres:</td><td>ANA MARIA</td></tr><tr><td>Apellidos: ROSERO</td></tr></table>",
        );
        assert_eq!(extract_name(&p).as_deref(), Some("ANA MARIA ROSERO"));
    }

    #[test]
    fn empty_form_yields_none() {
        let p = partial(r#"<span id="frmIngreso:lblName"></span><div>Sin datos</div>"#);
        assert_eq!(extract_name(&p), None);
        assert_eq!(extract_name(&PartialResponse::default()), None);
    }
}
