//! # smivae Core Library
//!
//! Latent-space guided molecule generation from a pretrained SMILES variational autoencoder.
//! A checkpoint is loaded, a single latent vector is optimized, and a batch of SMILES strings
//! decoded from it is validated and scored for drug-likeness (QED).
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers throughout:
//!
//! - **[`core`]: The Foundation.** Stateless building blocks: the SMILES parser and molecular
//!   graph (`chem`), descriptor and QED scoring, checkpoint and CSV I/O (`io`), and the
//!   encoder/decoder network with its vocabulary (`model`).
//!
//! - **[`engine`]: The Logic Core.** Configuration, token sampling, autoregressive decoding and
//!   the latent optimizer, together with the error and progress types shared by workflows.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures that tie `engine` and `core`
//!   together. [`workflows::generate::run`] is the single entry point for generation.

pub mod core;
pub mod engine;
pub mod workflows;
