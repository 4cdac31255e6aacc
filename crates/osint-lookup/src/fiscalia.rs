//! `delitos`: crime-news reports naming the identity number.
//!
//! The prosecutor's office publishes one table per report, headed
//! "NOTICIA DEL DELITO", with labelled cells for place, date and offence.
//! The query parameter is a PHP-serialized one-element array.

use async_trait::async_trait;
use osint_core::{Cedula, LookupOutcome};
use url::Url;

use crate::error::LookupError;
use crate::http;
use crate::markup;
use crate::module::LookupModule;
use crate::text::collapse_ws;

const INFO_PATH: &str = "siaf/comunes/noticiasdelito/info_mod.php";
const REFERER_PATH: &str = "siaf/informacion/web/noticiasdelito/index.php";
const REPORT_HEADING: &str = "NOTICIA DEL DELITO";

static_regex!(offence_code_re, r"\s*\(\d+\)\s*$");

/// The crime-news module.
#[derive(Debug, Clone)]
pub struct CrimeNewsModule {
    http: reqwest::Client,
    base_url: Url,
}

impl CrimeNewsModule {
    /// Create the module for the portal at `base_url`.
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl LookupModule for CrimeNewsModule {
    fn key(&self) -> &'static str {
        "delitos"
    }

    fn label(&self) -> &'static str {
        "Noticias de delitos"
    }

    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
        let url = http::endpoint(&self.base_url, INFO_PATH)?;
        let referer = http::endpoint(&self.base_url, REFERER_PATH)?;
        let (_, body) = http::send_text(
            self.http
                .get(url)
                .query(&[("businfo", php_businfo(cedula.as_str()))])
                .header("Accept", http::ACCEPT_HTML)
                .header("Accept-Language", "es-EC,es;q=0.9,en;q=0.8")
                .header("Referer", referer.as_str()),
            "GET /info_mod.php",
        )
        .await?;
        Ok(LookupOutcome::lines(parse_reports(&body)))
    }
}

/// `a:1:{i:0;s:<len>:"<id>";}`
fn php_businfo(id: &str) -> String {
    format!("a:1:{{i:0;s:{}:\"{}\";}}", id.len(), id)
}

/// One `fecha: delito, lugar` line per complete report table.
fn parse_reports(html: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for table in markup::elements(html, "table") {
        if table.inner.to_ascii_lowercase().contains("<table") {
            continue;
        }
        let heading = markup::elements(table.inner, "th")
            .first()
            .map(|th| th.text())
            .unwrap_or_default();
        if !heading.contains(REPORT_HEADING) {
            continue;
        }

        let (mut place, mut date, mut offence) = (None, None, None);
        for cells in markup::table_rows(table.inner) {
            for (i, cell) in cells.iter().enumerate() {
                let Some(next) = cells.get(i + 1) else {
                    continue;
                };
                let upper = cell.to_uppercase();
                if upper.starts_with("LUGAR") {
                    place = Some(next.clone());
                }
                if upper.starts_with("FECHA") {
                    date = Some(next.clone());
                }
                if upper.starts_with("DELITO:") {
                    offence = Some(next.clone());
                }
            }
        }

        if let (Some(place), Some(date), Some(offence)) = (place, date, offence) {
            let offence = offence_code_re().replace(&collapse_ws(&offence), "").into_owned();
            let line = format!("{}: {}, {}", collapse_ws(&date), offence, collapse_ws(&place));
            if !out.contains(&line) {
                out.push(line);
            }
        }
    }
    out
}
