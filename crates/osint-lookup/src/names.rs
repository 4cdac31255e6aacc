//! `nombres`: full name through a chain of backends.
//!
//! Backends are tried in order and the first non-empty name wins. A
//! failing backend is logged and skipped, so one portal being down never
//! hides a name another portal can supply.

use async_trait::async_trait;
use osint_core::{Cedula, LookupOutcome};

use crate::error::LookupError;
use crate::module::LookupModule;
use crate::registro_civil::CivilRegistryClient;

/// A source able to resolve an identity number to a full name.
#[async_trait]
pub trait NameBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// The full name, or `None` when the source has no record.
    async fn full_name(&self, cedula: &Cedula) -> Result<Option<String>, LookupError>;
}

#[async_trait]
impl NameBackend for CivilRegistryClient {
    fn name(&self) -> &'static str {
        "civil_registry"
    }

    async fn full_name(&self, cedula: &Cedula) -> Result<Option<String>, LookupError> {
        Ok(self.consult(cedula).await?.full_name())
    }
}

/// The names module.
pub struct NamesModule {
    backends: Vec<Box<dyn NameBackend>>,
}

impl NamesModule {
    /// Create the module over `backends`, tried in the given order.
    pub fn new(backends: Vec<Box<dyn NameBackend>>) -> Self {
        Self { backends }
    }
}

impl std::fmt::Debug for NamesModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamesModule")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[async_trait]
impl LookupModule for NamesModule {
    fn key(&self) -> &'static str {
        "nombres"
    }

    fn label(&self) -> &'static str {
        "Nombres"
    }

    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError> {
        for backend in &self.backends {
            match backend.full_name(cedula).await {
                Ok(Some(name)) if !name.trim().is_empty() => {
                    tracing::debug!(backend = backend.name(), "name resolved");
                    return Ok(LookupOutcome::line(name));
                }
                Ok(_) => tracing::debug!(backend = backend.name(), "no name"),
                Err(e) => tracing::debug!(backend = backend.name(), error = %e, "name backend failed"),
            }
        }
        Ok(LookupOutcome::Absent)
    }
}
