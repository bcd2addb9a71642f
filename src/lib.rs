//! M4bkit - Audiobook metadata and chapter extraction
//!
//! This library crate exposes configuration and report rendering for the
//! CLI and for integration testing. Parsing lives in `m4bkit-media`.

pub mod config;
pub mod probe;
