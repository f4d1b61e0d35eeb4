//! `crier-core` — shared configuration and top-level error type.
//!
//! Everything the other crates need to agree on but that belongs to no one
//! subsystem: the layered config loader (`crier.toml` + `CRIER_*` env
//! overrides) and the wiring-level error enum.

pub mod config;
pub mod error;

pub use config::CrierConfig;
pub use error::{CrierError, Result};
