#![deny(missing_docs)]

//! # osint-core — Foundational Types for osint-ec
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It performs no I/O and has no internal crate dependencies. It uses only
//! `serde` and `thiserror` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **The cédula validator is the admission gate.** No lookup module ever
//!    sees an identity number that has not passed [`check_cedula`]. The
//!    validated form is the [`Cedula`] newtype; lookup signatures take
//!    `&Cedula`, never `&str`.
//!
//! 2. **Rejections are decomposed.** [`check_cedula`] reports *which* guard
//!    fired through [`CedulaRejection`], while [`is_valid_cedula`] collapses
//!    the verdict to a plain `bool`.
//!
//! 3. **One result shape for every lookup.** [`LookupOutcome`] is the tagged
//!    variant each module returns: absent, a line, a record, a list of
//!    lines, or a table of records.

pub mod cedula;
pub mod error;
pub mod outcome;
pub mod province;

// Re-export primary types at crate root for ergonomic imports.
pub use cedula::{check_cedula, expected_check_digit, is_valid_cedula, Cedula, CEDULA_LEN};
pub use error::CedulaRejection;
pub use outcome::{LookupOutcome, Record};
pub use province::Province;
