//! # osint-lookup -- Lookup adapters for Ecuadorian public portals
//!
//! Each adapter implements [`LookupModule`]: given a validated
//! [`osint_core::Cedula`], it queries one public portal and returns an
//! [`osint_core::LookupOutcome`].
//!
//! - **Nombres** via the SIIRS social-registry form, falling back to the
//!   civil-registry JSON API
//! - **Fecha de nacimiento**, **Estado civil**, **Lugar de nacimiento** via
//!   the civil-registry JSON API
//! - **Correo** via the civil registry's electronic-invoice portal
//! - **Fallecidos** via the IESS pension request form
//! - **Noticias de delitos** via the prosecutor's office
//! - **SUPA** via the judiciary's child-support pension system
//! - **Títulos** via SENESCYT, behind an image CAPTCHA
//!
//! ## Transport
//!
//! All modules share one `reqwest::Client` built by [`http::build_client`].
//! Portals that were historically driven through a browser are spoken to
//! directly: their JSF forms are scraped, posted back with the current
//! `javax.faces.ViewState`, and their partial responses parsed.
//!
//! ## Base URLs
//!
//! Every portal root is a field of [`LookupConfig`], so integration tests
//! point all modules at one local mock server.

/// Lazily compiled, process-wide regular expression.
///
/// Patterns are string literals, so compilation cannot fail at runtime.
/// Callers need `regex` among their own dependencies.
#[macro_export]
macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static ::regex::Regex {
            static RE: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            RE.get_or_init(|| ::regex::Regex::new($pattern).expect("static pattern must compile"))
        }
    };
}

pub mod captcha;
pub mod comprobantes;
pub mod config;
pub mod error;
pub mod fiscalia;
pub mod http;
pub mod iess;
pub(crate) mod jsf;
pub(crate) mod markup;
pub mod module;
pub mod names;
pub mod registro_civil;
pub mod senescyt;
pub mod siirs;
pub mod supa;
pub mod text;

pub use config::{ConfigError, LookupConfig};
pub use error::LookupError;
pub use module::LookupModule;

use std::sync::Arc;

use captcha::{CaptchaSolver, TesseractSolver};
use registro_civil::CivilRegistryClient;

/// The lookup modules in menu order.
#[derive(Clone)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn LookupModule>>,
}

impl ModuleRegistry {
    /// Build every module against the portals in `config`, sharing one
    /// HTTP client.
    pub fn standard(config: &LookupConfig) -> Result<Self, LookupError> {
        let http = http::build_client(config)?;
        let civil = CivilRegistryClient::new(http.clone(), config.civil_registry_url.clone());
        let solver: Option<Arc<dyn CaptchaSolver>> = if config.captcha_enabled() {
            Some(Arc::new(TesseractSolver::new(config.captcha_command.clone())))
        } else {
            None
        };

        let name_backends: Vec<Box<dyn names::NameBackend>> = vec![
            Box::new(siirs::SocialRegistryClient::new(
                http.clone(),
                config.social_registry_url.clone(),
            )),
            Box::new(civil.clone()),
        ];
        let modules: Vec<Arc<dyn LookupModule>> = vec![
            Arc::new(names::NamesModule::new(name_backends)),
            Arc::new(registro_civil::BirthDateModule::new(civil.clone())),
            Arc::new(comprobantes::InvoiceEmailModule::new(
                http.clone(),
                config.invoices_url.clone(),
            )),
            Arc::new(registro_civil::MaritalStatusModule::new(civil.clone())),
            Arc::new(iess::DeceasedModule::new(http.clone(), config.iess_url.clone())),
            Arc::new(registro_civil::BirthplaceModule::new(civil)),
            Arc::new(fiscalia::CrimeNewsModule::new(
                http.clone(),
                config.prosecutor_url.clone(),
            )),
            Arc::new(supa::SupaModule::new(http.clone(), config.judiciary_url.clone())),
            Arc::new(senescyt::TitlesModule::new(
                http,
                config.senescyt_url.clone(),
                solver,
                config.captcha_attempts,
            )),
        ];
        Ok(Self::from_modules(modules))
    }

    /// A registry over arbitrary modules, kept in the given order.
    pub fn from_modules(modules: Vec<Arc<dyn LookupModule>>) -> Self {
        Self { modules }
    }

    /// Modules in menu order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn LookupModule>> {
        self.modules.iter()
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True when the registry holds no module.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module at zero-based `index`.
    pub fn get(&self, index: usize) -> Option<&Arc<dyn LookupModule>> {
        self.modules.get(index)
    }

    /// Module with the given key.
    pub fn by_key(&self, key: &str) -> Option<&Arc<dyn LookupModule>> {
        self.modules.iter().find(|m| m.key() == key)
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.modules.iter().map(|m| m.key()))
            .finish()
    }
}
