//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`source`] - Mock [`PageSource`](crate::port::PageSource)
//!   implementations: `ScriptedSource`, `GatedSource`.
//! - [`domain`] - Builders for keys, pages and sample items.
//! - [`config`] - Canonical test configurations.

pub mod config;
pub mod domain;
pub mod source;
