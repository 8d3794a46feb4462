//! castlens-core library.
//!
//! Content model and dataset loading, the trait predicate language, the
//! trait index and its persisted cache, and trait statistics.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums in library modules, `anyhow::Result`
//!   at application boundaries (config loading).
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

#![forbid(unsafe_code)]

pub mod cache;
pub mod clock;
pub mod config;
pub mod dataset;
pub mod error;
pub mod index;
pub mod model;
pub mod predicate;
pub mod sanitize;
pub mod session;
pub mod stats;
pub mod traits;
