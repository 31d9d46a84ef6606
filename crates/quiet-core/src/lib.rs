//! `quiet-core`: shared types, configuration and trait seams for the
//! Quiet Hours scheduler.
//!
//! Everything that crosses a crate boundary lives here: the [`types::QuietBlock`]
//! record, the [`config::QuietConfig`] layer (TOML + `QUIET_*` env overrides),
//! the per-subsystem error enums, and the [`notify`] traits that decouple the
//! dispatcher from the concrete store and identity lookup.

pub mod config;
pub mod error;
pub mod notify;
pub mod types;
