//! Infrastructure layer.
//!
//! Technical concerns supporting the application layer: configuration,
//! logging and wiring of the synchronization components.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root building a [`bootstrap::SyncLayer`]
//! - [`config`] - Configuration loading and validation

pub mod bootstrap;
pub mod config;
