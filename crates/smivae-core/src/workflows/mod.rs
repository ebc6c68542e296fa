//! # Workflows Module
//!
//! Top-level entry points of the library. A workflow takes a validated configuration and a
//! progress reporter, loads everything it needs, and returns its results in memory after
//! persisting them.
//!
//! - **Generation Workflow** ([`generate`]) - Checkpoint loading, latent optimization,
//!   decoding and QED scoring of a batch of molecules.

pub mod generate;
