//! Lookup configuration.
//!
//! One base URL per portal plus the shared HTTP and CAPTCHA settings.
//! Defaults point to the production portals. Override via environment
//! variables, a YAML file, or [`LookupConfig::local_mock`] for tests.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use url::Url;

const DEFAULT_CIVIL_REGISTRY_URL: &str = "https://pusakregistro.fomentoacademico.gob.ec";
const DEFAULT_SOCIAL_REGISTRY_URL: &str = "https://siirs.registrosocial.gob.ec";
const DEFAULT_IESS_URL: &str = "https://iess.gob.ec";
const DEFAULT_JUDICIARY_URL: &str = "https://supa.funcionjudicial.gob.ec";
const DEFAULT_PROSECUTOR_URL: &str = "https://www.gestiondefiscalias.gob.ec";
const DEFAULT_SENESCYT_URL: &str = "https://www.senescyt.gob.ec";
const DEFAULT_INVOICES_URL: &str = "https://apps.registrocivil.gob.ec";

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:140.0) Gecko/20100101 Firefox/140.0";
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_CAPTCHA_COMMAND: &str = "tesseract";
const DEFAULT_CAPTCHA_ATTEMPTS: u32 = 12;

/// Configuration shared by every lookup module.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupConfig {
    /// Civil-registry JSON API (names, birth data, marital status).
    pub civil_registry_url: Url,
    /// Social registry request portal (SIIRS), used for names.
    pub social_registry_url: Url,
    /// Social security portal (deceased status).
    pub iess_url: Url,
    /// Judiciary child-support portal (SUPA).
    pub judiciary_url: Url,
    /// Prosecutor's office crime-news portal.
    pub prosecutor_url: Url,
    /// Higher-education degree registry.
    pub senescyt_url: Url,
    /// Civil-registry invoice portal.
    pub invoices_url: Url,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` sent on every request.
    pub user_agent: String,
    /// Accept portals with broken certificate chains.
    pub accept_invalid_certs: bool,
    /// OCR executable for CAPTCHA images. Empty disables CAPTCHA-gated modules.
    pub captcha_command: String,
    /// Maximum CAPTCHA attempts per search.
    pub captcha_attempts: u32,
}

impl LookupConfig {
    /// Production defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` only if a built-in URL fails to
    /// parse, which avoids `expect()` on constants.
    pub fn production() -> Result<Self, ConfigError> {
        Ok(Self {
            civil_registry_url: parse_url("civil_registry_url", DEFAULT_CIVIL_REGISTRY_URL)?,
            social_registry_url: parse_url("social_registry_url", DEFAULT_SOCIAL_REGISTRY_URL)?,
            iess_url: parse_url("iess_url", DEFAULT_IESS_URL)?,
            judiciary_url: parse_url("judiciary_url", DEFAULT_JUDICIARY_URL)?,
            prosecutor_url: parse_url("prosecutor_url", DEFAULT_PROSECUTOR_URL)?,
            senescyt_url: parse_url("senescyt_url", DEFAULT_SENESCYT_URL)?,
            invoices_url: parse_url("invoices_url", DEFAULT_INVOICES_URL)?,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: true,
            captcha_command: DEFAULT_CAPTCHA_COMMAND.to_string(),
            captcha_attempts: DEFAULT_CAPTCHA_ATTEMPTS,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `OSINT_CIVIL_REGISTRY_URL` (default: `https://pusakregistro.fomentoacademico.gob.ec`)
    /// - `OSINT_SOCIAL_REGISTRY_URL` (default: `https://siirs.registrosocial.gob.ec`)
    /// - `OSINT_IESS_URL` (default: `https://iess.gob.ec`)
    /// - `OSINT_JUDICIARY_URL` (default: `https://supa.funcionjudicial.gob.ec`)
    /// - `OSINT_PROSECUTOR_URL` (default: `https://www.gestiondefiscalias.gob.ec`)
    /// - `OSINT_SENESCYT_URL` (default: `https://www.senescyt.gob.ec`)
    /// - `OSINT_INVOICES_URL` (default: `https://apps.registrocivil.gob.ec`)
    /// - `OSINT_TIMEOUT_SECS` (default: 20)
    /// - `OSINT_USER_AGENT`
    /// - `OSINT_ACCEPT_INVALID_CERTS` (default: true)
    /// - `OSINT_CAPTCHA_COMMAND` (default: `tesseract`; empty disables)
    /// - `OSINT_CAPTCHA_ATTEMPTS` (default: 12)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            civil_registry_url: env_url("OSINT_CIVIL_REGISTRY_URL", DEFAULT_CIVIL_REGISTRY_URL)?,
            social_registry_url: env_url("OSINT_SOCIAL_REGISTRY_URL", DEFAULT_SOCIAL_REGISTRY_URL)?,
            iess_url: env_url("OSINT_IESS_URL", DEFAULT_IESS_URL)?,
            judiciary_url: env_url("OSINT_JUDICIARY_URL", DEFAULT_JUDICIARY_URL)?,
            prosecutor_url: env_url("OSINT_PROSECUTOR_URL", DEFAULT_PROSECUTOR_URL)?,
            senescyt_url: env_url("OSINT_SENESCYT_URL", DEFAULT_SENESCYT_URL)?,
            invoices_url: env_url("OSINT_INVOICES_URL", DEFAULT_INVOICES_URL)?,
            timeout_secs: env_parse("OSINT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            user_agent: std::env::var("OSINT_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            accept_invalid_certs: env_bool("OSINT_ACCEPT_INVALID_CERTS", true)?,
            captcha_command: std::env::var("OSINT_CAPTCHA_COMMAND")
                .unwrap_or_else(|_| DEFAULT_CAPTCHA_COMMAND.to_string()),
            captcha_attempts: env_parse("OSINT_CAPTCHA_ATTEMPTS", DEFAULT_CAPTCHA_ATTEMPTS)?,
        })
    }

    /// Create a configuration pointing every portal at one mock server.
    ///
    /// CAPTCHA solving is disabled and the timeout is short.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base` does not parse.
    pub fn local_mock(base: &str) -> Result<Self, ConfigError> {
        let url = parse_url("local_mock", base)?;
        Ok(Self {
            civil_registry_url: url.clone(),
            social_registry_url: url.clone(),
            iess_url: url.clone(),
            judiciary_url: url.clone(),
            prosecutor_url: url.clone(),
            senescyt_url: url.clone(),
            invoices_url: url,
            timeout_secs: 5,
            user_agent: "osint-ec-test".to_string(),
            accept_invalid_certs: false,
            captcha_command: String::new(),
            captcha_attempts: 3,
        })
    }

    /// Apply the fields present in a YAML file over this configuration.
    ///
    /// Every field in the file is optional; unknown fields are rejected.
    pub fn merge_yaml_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: ConfigFile = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })?;
        file.apply(&mut self)?;
        Ok(self)
    }

    /// Load a YAML file over the production defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        Self::production()?.merge_yaml_file(path)
    }

    /// Whether CAPTCHA-gated modules can run.
    pub fn captcha_enabled(&self) -> bool {
        !self.captcha_command.trim().is_empty() && self.captcha_attempts > 0
    }
}

/// On-disk form of [`LookupConfig`]. URLs are kept as strings so that a bad
/// value is reported with its field name.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    civil_registry_url: Option<String>,
    social_registry_url: Option<String>,
    iess_url: Option<String>,
    judiciary_url: Option<String>,
    prosecutor_url: Option<String>,
    senescyt_url: Option<String>,
    invoices_url: Option<String>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
    accept_invalid_certs: Option<bool>,
    captcha_command: Option<String>,
    captcha_attempts: Option<u32>,
}

impl ConfigFile {
    fn apply(self, cfg: &mut LookupConfig) -> Result<(), ConfigError> {
        let urls = [
            ("civil_registry_url", self.civil_registry_url, &mut cfg.civil_registry_url),
            ("social_registry_url", self.social_registry_url, &mut cfg.social_registry_url),
            ("iess_url", self.iess_url, &mut cfg.iess_url),
            ("judiciary_url", self.judiciary_url, &mut cfg.judiciary_url),
            ("prosecutor_url", self.prosecutor_url, &mut cfg.prosecutor_url),
            ("senescyt_url", self.senescyt_url, &mut cfg.senescyt_url),
            ("invoices_url", self.invoices_url, &mut cfg.invoices_url),
        ];
        for (field, raw, slot) in urls {
            if let Some(raw) = raw {
                *slot = parse_url(field, &raw)?;
            }
        }
        if let Some(v) = self.timeout_secs {
            cfg.timeout_secs = v;
        }
        if let Some(v) = self.user_agent {
            cfg.user_agent = v;
        }
        if let Some(v) = self.accept_invalid_certs {
            cfg.accept_invalid_certs = v;
        }
        if let Some(v) = self.captcha_command {
            cfg.captcha_command = v;
        }
        if let Some(v) = self.captcha_attempts {
            cfg.captcha_attempts = v;
        }
        Ok(())
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

fn env_parse<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

fn env_bool(var: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(var.to_string(), raw)),
        },
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A URL setting does not parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    /// A numeric or boolean setting does not parse.
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// File path as given.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The configuration file is not valid YAML for this schema.
    #[error("invalid config file {path}: {source}")]
    Yaml {
        /// File path as given.
        path: String,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
}
