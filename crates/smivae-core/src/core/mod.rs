//! # Core Module
//!
//! Stateless building blocks of the generator: chemistry (SMILES parsing, descriptors and
//! QED), the neural network that maps latent vectors to token distributions, and the
//! checkpoint and report I/O around them.
//!
//! - **Chemistry** ([`chem`]) - SMILES reader, sanitization, molecular descriptors, QED
//! - **Network** ([`model`]) - vocabulary, layers and the SMILES VAE
//! - **File I/O** ([`io`]) - checkpoint metadata and weights, CSV result tables

pub mod chem;
pub mod io;
pub mod model;
