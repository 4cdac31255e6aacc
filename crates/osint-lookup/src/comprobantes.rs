//! `correo`: e-mail address printed on the civil registry's electronic invoices.
//!
//! The citizen portal lists the invoices issued to an identity number. The
//! authorized XML of an invoice carries the buyer's contact data in its
//! `infoAdicional` block; the first invoice's XML is downloaded and its
//! `campoAdicional nombre="Email"` read.

use async_trait::async_trait;
use osint_core::{Cedula, LookupOutcome};
use url::Url;

use crate::error::LookupError;
use crate::http;
use crate::jsf::{self, Form, PartialResponse};
use crate::markup::{self, Element};
use crate::module::LookupModule;
use crate::text::unescape;

const PORTAL_PATH: &str = "portalCiudadano/comprobantes.jsf";
const ID_INPUT_SUFFIX: &str = ":txtIdentificacion";
const SEARCH_LINK_SUFFIX: &str = ":j_idt111";
const SEARCH_LABEL: &str = "Buscar";
const INVOICES_BODY_SUFFIX: &str = ":tabFacturas_data";
const XML_LINK_SUFFIX: &str = ":j_idt125";
const XML_LABEL: &str = "Descargar XML";

static_regex!(
    email_field_re,
    r#"(?i)<campoAdicional\s+[^>]*nombre\s*=\s*"email"[^>]*>([^<]+)</campoAdicional>"#
);
static_regex!(any_field_re, r"(?i)<campoAdicional[^>]*>([^<]+)</campoAdicional>");

/// The invoice e-mail module.
#[derive(Debug, Clone)]
pub struct InvoiceEmailModule {
    http: reqwest::Client,
    base_url: Url,
}

impl InvoiceEmailModule {
    /// Create the module for the portal at `base_url`.
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl LookupModule for InvoiceEmailModule {
    fn key(&self) -> &'static str {
        "correo"
    }

    fn label(&self) -> &'static str {
        "Correo en facturas RC"
    }

    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
        let get_endpoint = "GET /comprobantes.jsf";
        let url = http::endpoint(&self.base_url, PORTAL_PATH)?;
        let (page_url, page) = http::send_text(
            self.http
                .get(url)
                .header("Accept", http::ACCEPT_HTML)
                .header("Accept-Language", "es-EC,es;q=0.9"),
            get_endpoint,
        )
        .await?;

        let mut form = Form::containing_input(&page, ID_INPUT_SUFFIX, get_endpoint)?;
        let id_field = form
            .field_ending(ID_INPUT_SUFFIX)
            .ok_or_else(|| LookupError::markup(get_endpoint, "identification input has no name"))?;
        form.set(id_field, cedula.as_str());

        let search_link = search_link(&page)
            .ok_or_else(|| LookupError::markup(get_endpoint, "search link not found"))?;
        let mut pairs = form.ajax_pairs(&search_link, "@all", "@all");
        pairs.push((search_link.clone(), search_link.clone()));

        let post_url = form.action_url(&page_url)?;
        let (_, body) = http::send_text(
            http::ajax(self.http.post(post_url.clone()), &page_url).form(&pairs),
            "POST /comprobantes.jsf (search)",
        )
        .await?;
        form.refresh_view_state(&PartialResponse::parse(&body));

        let Some(xml_link) = first_invoice_xml_link(&jsf::response_markup(&body)) else {
            tracing::debug!("no invoice with an XML link");
            return Ok(LookupOutcome::Absent);
        };

        form.set(xml_link.clone(), xml_link);
        let xml = http::send_bytes(
            self.http
                .post(post_url)
                .header("Referer", page_url.as_str())
                .form(form.pairs()),
            "POST /comprobantes.jsf (xml download)",
        )
        .await?;

        Ok(LookupOutcome::from_option(email_from_xml(&xml)))
    }
}

fn search_link(page: &str) -> Option<String> {
    markup::find(page, |name, el| {
        name.eq_ignore_ascii_case("a")
            && (el.id().is_some_and(|id| id.ends_with(SEARCH_LINK_SUFFIX))
                || el.attr("aria-label").as_deref() == Some(SEARCH_LABEL)
                || el.attr("title").as_deref() == Some(SEARCH_LABEL))
    })
    .and_then(|a| a.id())
}

/// Id of the "Descargar XML" link in the first row of the invoices table.
fn first_invoice_xml_link(html: &str) -> Option<String> {
    let tbody = markup::by_id_suffix(html, "tbody", INVOICES_BODY_SUFFIX)?;
    let rows = markup::top_level(tbody.inner, "tr");
    let row = rows
        .iter()
        .find(|tr| tr.attr("data-ri").as_deref() == Some("0"))
        .or_else(|| rows.first())?;

    let links = markup::elements(row.inner, "a");
    links
        .iter()
        .find(|a| a.id().is_some_and(|id| id.ends_with(XML_LINK_SUFFIX)))
        .or_else(|| links.iter().find(|a| has_xml_icon(a)))
        .and_then(|a| a.id())
}

fn has_xml_icon(link: &Element<'_>) -> bool {
    markup::elements(link.inner, "img").iter().any(|img| {
        img.attr("alt").as_deref() == Some(XML_LABEL) || img.attr("title").as_deref() == Some(XML_LABEL)
    })
}

/// The buyer e-mail of an invoice XML. The invoice is often embedded as
/// escaped text inside the authorization document, so a second pass reads
/// the unescaped text.
fn email_from_xml(xml: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(xml);
    scan_email(&text).or_else(|| scan_email(&unescape(&text)))
}

fn scan_email(text: &str) -> Option<String> {
    let clean = |s: &str| s.replace(['\r', '\n'], "").trim().to_string();
    if let Some(caps) = email_field_re().captures(text) {
        let email = clean(caps.get(1)?.as_str());
        return email.contains('@').then_some(email);
    }
    any_field_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| clean(m.as_str())))
        .find(|candidate| candidate.contains('@'))
}
