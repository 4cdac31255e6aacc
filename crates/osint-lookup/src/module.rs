//! The lookup module contract.

use async_trait::async_trait;
use osint_core::{Cedula, LookupOutcome};

use crate::error::LookupError;

/// One independent lookup against a public portal.
///
/// Implementations must be `Send + Sync` so the registry can share them
/// behind an `Arc`. A module only ever receives a validated [`Cedula`].
/// "Nothing found" is `Ok(LookupOutcome::Absent)`; `Err` is reserved for
/// transport failures and unexpected markup.
#[async_trait]
pub trait LookupModule: Send + Sync {
    /// Stable identifier, used by `--select` and in JSON output.
    fn key(&self) -> &'static str;

    /// Menu label shown to the user.
    fn label(&self) -> &'static str;

    /// Run the lookup.
    async fn search(&self, cedula: &Cedula) -> Result<LookupOutcome, LookupError>;
}
