//! `supa`: child-support pension cards from the judiciary's SUPA portal.
//!
//! The portal is a PrimeFaces view. A search by identity number re-renders
//! the result panel; each result row then needs two more ajax round trips,
//! one for the detail dialog (current pension) and one for the
//! pending-movements tab (total owed). Every partial response carries the
//! next view-state token, which the following post must echo.

use async_trait::async_trait;
use osint_core::{Cedula, LookupOutcome, Record};
use url::Url;

use crate::error::LookupError;
use crate::http;
use crate::jsf::{Form, PartialResponse, VIEW_STATE};
use crate::markup::{self, Element};
use crate::module::LookupModule;
use crate::text::{collapse_ws, fold, format_money, parse_amount};

const CONSULT_PATH: &str = "pensiones/publico/consulta.jsf";
const DEFAULT_FORM_ID: &str = "form";
const NO_CRITERION: &str = "Seleccione...";

const DETAIL_DIALOG: &str = "form:dDetalle";
const PENDING_TAB: &str = "form:ta_co_movimientosPendientes";
const PENDING_DIALOG: &str = "form:d_pendientes";

/// Column labels of the rendered table.
pub const COLUMNS: [&str; 6] = [
    "Código tarjeta",
    "Dependencia jurisdiccional",
    "Representante legal",
    "Obligado principal",
    "Pensión actual",
    "Total pendiente",
];

static_regex!(
    money_re,
    r"\$\s*\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{2})"
);
static_regex!(
    pension_blob_re,
    r"(?is)pensi[oó]n\s+actual\s*:?.{0,200}?(\$\s*\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{2}))"
);
static_regex!(number_re, r"\d[\d.,]*");
static_regex!(bare_number_re, r"^[\d.,]+$");

/// The SUPA pensions module.
#[derive(Debug, Clone)]
pub struct SupaModule {
    http: reqwest::Client,
    base_url: Url,
}

impl SupaModule {
    /// Create the module for the portal at `base_url`.
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

/// One result row before enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Card {
    code: String,
    court: String,
    legal_representative: Option<String>,
    obligor: Option<String>,
    detail_button: Option<String>,
}

/// Conversation state for one search: the page, its form id, and the
/// latest view-state token.
struct Conversation<'a> {
    http: &'a reqwest::Client,
    page_url: Url,
    form_id: String,
    view_state: String,
    cedula: &'a str,
}

impl Conversation<'_> {
    /// Filter fields the portal expects on every post of the form.
    fn filter_fields(&self) -> Vec<(String, String)> {
        let f = &self.form_id;
        vec![
            (f.clone(), f.clone()),
            (format!("{f}:t_texto_cedula"), self.cedula.to_string()),
            (format!("{f}:s_criterio_busqueda"), NO_CRITERION.to_string()),
            (format!("{f}:t_texto"), String::new()),
        ]
    }

    /// Fire an ajax event and return the update rendered for `update_id`.
    async fn post(
        &mut self,
        source: &str,
        execute: &str,
        render: &str,
        mut fields: Vec<(String, String)>,
        update_id: &str,
        endpoint: &str,
    ) -> Result<String, LookupError> {
        fields.extend([
            ("javax.faces.partial.ajax".to_string(), "true".to_string()),
            ("javax.faces.source".to_string(), source.to_string()),
            ("javax.faces.partial.execute".to_string(), execute.to_string()),
            ("javax.faces.partial.render".to_string(), render.to_string()),
            (VIEW_STATE.to_string(), self.view_state.clone()),
        ]);
        let (_, body) = http::send_text(
            http::ajax(self.http.post(self.page_url.clone()), &self.page_url).form(&fields),
            endpoint,
        )
        .await?;

        let partial = PartialResponse::parse(&body);
        if let Some(token) = partial.view_state() {
            self.view_state = token.to_string();
        }
        Ok(partial.update(update_id).unwrap_or_default().to_string())
    }

    async fn search(&mut self) -> Result<String, LookupError> {
        let f = self.form_id.clone();
        let button = format!("{f}:b_buscar_cedula");
        let result_panel = format!("{f}:pResultado");
        let mut fields = vec![(button.clone(), button.clone())];
        fields.extend(self.filter_fields());
        self.post(
            &button,
            "@all",
            &format!("{result_panel} panelMensajes {f}:pFiltro"),
            fields,
            &result_panel,
            "POST /consulta.jsf (search)",
        )
        .await
    }

    /// Detail dialog markup: the row's "Ver" button first, then an explicit
    /// content load when the button yields no pension.
    async fn detail(&mut self, button: Option<&str>) -> Result<String, LookupError> {
        if let Some(button) = button {
            let fields = vec![
                (button.to_string(), button.to_string()),
                (self.form_id.clone(), self.form_id.clone()),
            ];
            let html = self
                .post(button, button, DETAIL_DIALOG, fields, DETAIL_DIALOG, "POST /consulta.jsf (detail)")
                .await?;
            if current_pension(&html).is_some() {
                return Ok(html);
            }
        }
        self.content_load(DETAIL_DIALOG, "POST /consulta.jsf (detail load)")
            .await
    }

    /// Pending-movements markup: the tab first, then an explicit content
    /// load when the tab shows no total.
    async fn pending(&mut self) -> Result<String, LookupError> {
        let mut fields = vec![(PENDING_TAB.to_string(), PENDING_TAB.to_string())];
        fields.extend(self.filter_fields());
        match self
            .post(PENDING_TAB, PENDING_TAB, PENDING_DIALOG, fields, PENDING_DIALOG, "POST /consulta.jsf (pending tab)")
            .await
        {
            Ok(html) if html.to_uppercase().contains("TOTAL PENDIENTE") => return Ok(html),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "pending tab failed, trying content load"),
        }
        self.content_load(PENDING_DIALOG, "POST /consulta.jsf (pending load)")
            .await
    }

    async fn content_load(&mut self, dialog: &str, endpoint: &str) -> Result<String, LookupError> {
        let mut fields = vec![
            (dialog.to_string(), dialog.to_string()),
            (format!("{dialog}_contentLoad"), "true".to_string()),
        ];
        fields.extend(self.filter_fields());
        self.post(dialog, dialog, dialog, fields, dialog, endpoint).await
    }
}

#[async_trait]
impl LookupModule for SupaModule {
    fn key(&self) -> &'static str {
        "supa"
    }

    fn label(&self) -> &'static str {
        "SUPA Pensiones"
    }

    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
        let get_endpoint = "GET /consulta.jsf";
        let url = http::endpoint(&self.base_url, CONSULT_PATH)?;
        let (page_url, page) =
            http::send_text(self.http.get(url).header("Accept", http::ACCEPT_HTML), get_endpoint)
                .await?;

        let form = Form::first(&page, get_endpoint)?;
        let mut conversation = Conversation {
            http: &self.http,
            page_url,
            form_id: Some(form.id.clone())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| DEFAULT_FORM_ID.to_string()),
            view_state: form.view_state().unwrap_or_default().to_string(),
            cedula: cedula.as_str(),
        };

        let results = conversation.search().await?;
        let cards = parse_cards(&results);
        tracing::debug!(cards = cards.len(), "supa result rows");

        let mut rows = Vec::with_capacity(cards.len());
        for card in cards {
            let pension = match conversation.detail(card.detail_button.as_deref()).await {
                Ok(html) => current_pension(&html),
                Err(e) => {
                    tracing::debug!(card = %card.code, error = %e, "detail request failed");
                    None
                }
            };
            let pending = match conversation.pending().await {
                Ok(html) => total_pending(&html).or_else(|| sum_debt_column(&html)),
                Err(e) => {
                    tracing::debug!(card = %card.code, error = %e, "pending request failed");
                    None
                }
            };

            let values = [
                Some(card.code),
                Some(card.court),
                card.legal_representative,
                card.obligor,
                pension,
                pending,
            ];
            rows.push(
                COLUMNS
                    .iter()
                    .zip(values)
                    .map(|(label, value)| (label.to_string(), value.unwrap_or_default()))
                    .collect::<Record>(),
            );
        }
        Ok(LookupOutcome::table(rows))
    }
}

/// The data table inside the first `ui-datatable-tablewrapper` div.
fn wrapped_table(html: &str) -> Option<Element<'_>> {
    let wrapper = markup::find(html, |name, el| {
        name.eq_ignore_ascii_case("div") && el.has_class("ui-datatable-tablewrapper")
    })?;
    markup::elements(wrapper.inner, "table").into_iter().next()
}

fn parse_cards(results_html: &str) -> Vec<Card> {
    let Some(table) = wrapped_table(results_html) else {
        return Vec::new();
    };
    let Some(tbody) = markup::elements(table.inner, "tbody").into_iter().next() else {
        return Vec::new();
    };

    markup::top_level(tbody.inner, "tr")
        .iter()
        .filter(|tr| tr.attr("role").as_deref() == Some("row"))
        .filter_map(|tr| {
            let cells = markup::top_level(tr.inner, "td");
            if cells.len() < 6 {
                return None;
            }
            let mut card = Card {
                code: cells[0].text(),
                court: cells[2].text(),
                detail_button: markup::elements(cells[5].inner, "button")
                    .first()
                    .and_then(Element::id),
                ..Card::default()
            };
            if let Some(parties) = markup::elements(cells[4].inner, "table").first() {
                for row in markup::table_rows(parties.inner) {
                    let [label, value, ..] = row.as_slice() else {
                        continue;
                    };
                    let label = fold(&label.replace(':', ""));
                    let value = Some(collapse_ws(value)).filter(|v| !v.is_empty());
                    if label.contains("representante legal") {
                        card.legal_representative = value;
                    } else if label.contains("obligado principal") {
                        card.obligor = value;
                    }
                }
            }
            Some(card)
        })
        .collect()
}

/// Value cell following a label cell matching `label` (folded).
fn labelled_value(html: &str, label: &str) -> Option<String> {
    markup::table_rows(html).into_iter().find_map(|row| {
        let [key, value, ..] = row.as_slice() else {
            return None;
        };
        fold(key.trim_end_matches(':'))
            .contains(label)
            .then(|| collapse_ws(value))
    })
}

/// "Pensión actual" from the detail dialog, as the portal writes the amount.
fn current_pension(detail_html: &str) -> Option<String> {
    if let Some(raw) = labelled_value(detail_html, "pension actual") {
        let found = money_re().find(&raw).map(|m| m.as_str().to_string());
        if let Some(value) = found.or(Some(raw)).filter(|v| !v.is_empty()) {
            return Some(value);
        }
    }
    pension_blob_re()
        .captures(detail_html)
        .and_then(|caps| caps.get(1))
        .map(|m| collapse_ws(m.as_str()))
}

/// First number in `text`, normalized to `$1,234.56`.
fn normalize_money(text: &str) -> Option<String> {
    let number = number_re().find(text)?;
    parse_amount(number.as_str()).map(format_money)
}

/// Total owed from the pending-movements dialog: the "TOTAL PENDIENTE"
/// row, then "Total pensiones más intereses", then the table footer.
fn total_pending(pending_html: &str) -> Option<String> {
    for label in ["total pendiente", "total pensiones mas intereses"] {
        if let Some(value) = labelled_value(pending_html, label).and_then(|v| normalize_money(&v)) {
            return Some(value);
        }
    }
    let tfoot = markup::elements(pending_html, "tfoot").into_iter().next()?;
    markup::elements(tfoot.inner, "td")
        .iter()
        .map(Element::text)
        .find(|t| bare_number_re().is_match(t))
        .and_then(|t| normalize_money(&t))
}

/// Sum of the "Valor de deuda" column of the pending-movements table.
fn sum_debt_column(pending_html: &str) -> Option<String> {
    let table = wrapped_table(pending_html)?;
    let thead = markup::elements(table.inner, "thead").into_iter().next()?;
    let column = markup::elements(thead.inner, "th")
        .iter()
        .position(|th| fold(&th.text()).contains("valor de deuda"))?;
    let tbody = markup::elements(table.inner, "tbody").into_iter().next()?;

    let amounts: Vec<f64> = markup::top_level(tbody.inner, "tr")
        .iter()
        .filter_map(|tr| {
            let cell = markup::top_level(tr.inner, "td").get(column)?.text();
            parse_amount(number_re().find(&cell)?.as_str())
        })
        .collect();
    (!amounts.is_empty()).then(|| format_money(amounts.iter().sum()))
}
