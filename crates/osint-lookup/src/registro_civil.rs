//! # Civil-Registry JSON API
//!
//! A public registration service exposes the civil-registry record for an
//! identity number as JSON. Field names vary between deployments, so every
//! accessor tries a list of known spellings and then, where the record
//! carries free-text summaries, a labelled-text pattern.
//!
//! Three modules read from this record: birth date, birthplace and marital
//! status. The names module uses it as its second backend.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use osint_core::{Cedula, LookupOutcome};
use serde_json::{Map, Value};
use url::Url;

use crate::error::LookupError;
use crate::http;
use crate::module::LookupModule;
use crate::text::collapse_ws;

const CONSULT_PATH: &str = "api/registro-civil/consultar";
const REFERER_PATH: &str = "register";

static_regex!(
    birthplace_re,
    r"(?i)Provincia\s*:\s*([^-–—\n\r]+?)\s*-\s*(?:Ciudad\s*/\s*Cant[oó]n|Cant[oó]n|Ciudad)\s*:\s*([^-–—\n\r]+?)\s*-\s*Parroquia\s*:\s*([^\n\r,]+)"
);
static_regex!(
    marital_re,
    r"(?i)Estado\s*Civil\s*:\s*([A-Za-zÁÉÍÓÚÜÑáéíóúüñ/\s-]+)"
);
static_regex!(trailing_sep_re, r"[,\s]+$");

/// Client for the civil-registry consult endpoint.
#[derive(Debug, Clone)]
pub struct CivilRegistryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CivilRegistryClient {
    /// Create a client for the API at `base_url`.
    pub fn new(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Fetch the record for `cedula`.
    ///
    /// Calls `POST {base_url}/api/registro-civil/consultar` with
    /// `{"numeroCedula": "<id>"}`. An empty body yields an empty record.
    pub async fn consult(&self, cedula: &Cedula) -> Result<CivilRecord, LookupError> {
        let endpoint = "POST /api/registro-civil/consultar";
        let url = http::endpoint(&self.base_url, CONSULT_PATH)?;
        let referer = http::endpoint(&self.base_url, REFERER_PATH)?;

        let request = self
            .http
            .post(url)
            .header("Accept", "application/json, text/plain, */*")
            .header("Origin", http::origin(&self.base_url))
            .header("Referer", referer.as_str())
            .json(&serde_json::json!({ "numeroCedula": cedula.as_str() }));
        let (_, body) = http::send_text(request, endpoint).await?;
        CivilRecord::from_body(&body, endpoint)
    }
}

/// The civil-registry record as returned by the API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CivilRecord(Map<String, Value>);

impl CivilRecord {
    /// Parse a response body. Blank bodies and non-object JSON yield an
    /// empty record.
    pub fn from_body(body: &str, endpoint: &str) -> Result<Self, LookupError> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value =
            serde_json::from_str(body).map_err(|source| LookupError::Deserialization {
                endpoint: endpoint.into(),
                source,
            })?;
        Ok(match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        })
    }

    /// First non-blank string among `keys`, trimmed.
    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.0.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn strings(&self) -> impl Iterator<Item = &str> {
        self.0.values().filter_map(Value::as_str)
    }

    /// Full name, either as given or composed from its parts.
    pub fn full_name(&self) -> Option<String> {
        let name = self
            .first(&["nombresApellidos", "nombreCompleto", "nombresCompletos"])
            .or_else(|| {
                let given = self.first(&["nombre", "nombres"]);
                let paternal = self.first(&["apellidoPaterno", "apellido1"]);
                let maternal = self.first(&["apellidoMaterno", "apellido2"]);
                let surnames = match (paternal, maternal) {
                    (None, None) => self.first(&["apellidos"]),
                    (p, m) => Some([p, m].into_iter().flatten().collect::<Vec<_>>().join(" ")),
                };
                match (given, surnames) {
                    (Some(g), Some(s)) => Some(format!("{g} {s}")),
                    (g, s) => g.or(s),
                }
            })?;
        Some(collapse_ws(&name)).filter(|n| !n.is_empty())
    }

    /// Date of birth from `fechaNacimiento` (`dd/mm/YYYY`).
    pub fn birth_date(&self) -> Option<NaiveDate> {
        let raw = self.first(&["fechaNacimiento"])?;
        NaiveDate::parse_from_str(&raw, "%d/%m/%Y").ok()
    }

    /// `PROVINCIA - CANTON - PARROQUIA`, all three parts required.
    pub fn birthplace(&self) -> Option<String> {
        let province = self
            .first(&[
                "provinciaNacimiento",
                "provincia",
                "provinciaNacimientoDesc",
                "provinciaNacimientoNombre",
            ])
            .and_then(|s| clean_place(&s));
        let canton = self
            .first(&[
                "cantonNacimiento",
                "ciudadCanton",
                "canton",
                "ciudad",
                "ciudadNacimiento",
                "ciudadNacimientoDesc",
            ])
            .and_then(|s| clean_place(&s));
        let parish = self
            .first(&[
                "parroquiaNacimiento",
                "parroquia",
                "parroquiaNacimientoDesc",
                "parroquiaNacimientoNombre",
            ])
            .and_then(|s| clean_place(&s));

        if let (Some(p), Some(c), Some(q)) = (province, canton, parish) {
            return Some(format!("{p} - {c} - {q}"));
        }

        self.strings().find_map(|s| {
            let caps = birthplace_re().captures(s)?;
            let p = clean_place(caps.get(1)?.as_str())?;
            let c = clean_place(caps.get(2)?.as_str())?;
            let q = clean_place(caps.get(3)?.as_str())?;
            Some(format!("{p} - {c} - {q}"))
        })
    }

    /// Normalized marital status.
    pub fn marital_status(&self) -> Option<String> {
        self.first(&[
            "estadoCivil",
            "estado_civil",
            "estadoCivilDesc",
            "estado",
            "estCivil",
            "estadocivil",
            "estadoCivilDescripcion",
        ])
        .or_else(|| {
            self.strings().find_map(|s| {
                marital_re()
                    .captures(s)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
            })
        })
        .map(|s| normalize_marital_status(&s))
        .filter(|s| !s.is_empty())
    }
}

fn clean_place(raw: &str) -> Option<String> {
    let trimmed = trailing_sep_re().replace(raw, "");
    let cleaned = collapse_ws(&trimmed).to_uppercase();
    Some(cleaned).filter(|s| !s.is_empty())
}

/// Map gendered and colloquial spellings onto one form per status.
pub fn normalize_marital_status(raw: &str) -> String {
    let key = collapse_ws(raw).to_uppercase();
    match key.as_str() {
        "CASADA" | "CASADO" => "CASADO".into(),
        "SOLTERA" | "SOLTERO" => "SOLTERO".into(),
        "DIVORCIADA" | "DIVORCIADO" => "DIVORCIADO".into(),
        "VIUDA" | "VIUDO" => "VIUDO".into(),
        "UNION DE HECHO" | "UNION LIBRE" | "CONCUBINATO" => "UNIÓN DE HECHO".into(),
        "SEPARADA" | "SEPARADO" => "SEPARADO".into(),
        _ => key,
    }
}

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let before_birthday = (today.month(), today.day()) < (birth.month(), birth.day());
    today.year() - birth.year() - i32::from(before_birthday)
}

// -- Modules ------------------------------------------------------------------

/// `fecha_nacimiento`: date of birth and current age.
#[derive(Debug, Clone)]
pub struct BirthDateModule {
    client: CivilRegistryClient,
}

impl BirthDateModule {
    /// Create the module over a civil-registry client.
    pub fn new(client: CivilRegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LookupModule for BirthDateModule {
    fn key(&self) -> &'static str {
        "fecha_nacimiento"
    }

    fn label(&self) -> &'static str {
        "Fecha Nacimiento"
    }

    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
        let record = self.client.consult(cedula).await?;
        let today = chrono::Local::now().date_naive();
        Ok(LookupOutcome::from_option(record.birth_date().map(|dob| {
            format!("{} ({} años)", dob.format("%Y-%m-%d"), age_on(dob, today))
        })))
    }
}

/// `lugar_nacimiento`: province, canton and parish of birth.
#[derive(Debug, Clone)]
pub struct BirthplaceModule {
    client: CivilRegistryClient,
}

impl BirthplaceModule {
    /// Create the module over a civil-registry client.
    pub fn new(client: CivilRegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LookupModule for BirthplaceModule {
    fn key(&self) -> &'static str {
        "lugar_nacimiento"
    }

    fn label(&self) -> &'static str {
        "Lugar de Nacimiento"
    }

    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
        let record = self.client.consult(cedula).await?;
        Ok(LookupOutcome::from_option(record.birthplace()))
    }
}

/// `estado_civil`: marital status.
#[derive(Debug, Clone)]
pub struct MaritalStatusModule {
    client: CivilRegistryClient,
}

impl MaritalStatusModule {
    /// Create the module over a civil-registry client.
    pub fn new(client: CivilRegistryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LookupModule for MaritalStatusModule {
    fn key(&self) -> &'static str {
        "estado_civil"
    }

    fn label(&self) -> &'static str {
        "Estado Civil"
    }

    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
        let record = self.client.consult(cedula).await?;
        Ok(LookupOutcome::from_option(record.marital_status()))
    }
}
