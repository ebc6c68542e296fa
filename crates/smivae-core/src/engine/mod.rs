//! # Engine Module
//!
//! The stateful half of generation: run configuration, latent-space optimization and
//! autoregressive decoding on top of the stateless [`crate::core`] layer.
//!
//! - **Configuration** ([`config`]) - layer sizes, optimizer and decoder settings, builder
//! - **Optimization** ([`optimization`]) - objectives and the SPSA/Adam latent optimizer
//! - **Decoding** ([`decoding`]) - greedy and temperature sampling decoders
//! - **Progress Monitoring** ([`progress`]) - events for front-end progress display
//! - **Error Handling** ([`error`]) - aggregated engine errors

pub mod config;
pub mod decoding;
pub mod error;
pub mod optimization;
pub mod progress;
pub mod utils;
