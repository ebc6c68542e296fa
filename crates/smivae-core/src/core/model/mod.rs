//! # Model Module
//!
//! CPU implementation of the SMILES variational autoencoder: token vocabulary, dense and
//! recurrent layers, and the encoder/decoder network assembled from a checkpoint.
//!
//! - **Vocabulary** ([`vocab`]) - symbol/index maps, special tokens, tokenization
//! - **Layers** ([`layers`]) - `Linear`, `Embedding` and `GruCell` on `nalgebra` matrices
//! - **Network** ([`vae`]) - architecture reconstruction, weight loading, encode/decode steps

pub mod layers;
pub mod vae;
pub mod vocab;

use crate::core::io::checkpoint::CheckpointError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid architecture: {0}")]
    InvalidArchitecture(String),

    #[error("Inconsistent vocabulary: {0}")]
    InconsistentVocabulary(String),

    #[error("Special token '{0}' is not part of the vocabulary")]
    MissingSpecialToken(String),

    #[error("No vocabulary symbol matches '{input}' at position {position}")]
    UnknownSymbol { input: String, position: usize },

    #[error("Token index {index} is outside the vocabulary of size {size}")]
    TokenOutOfRange { index: usize, size: usize },

    #[error("Expected a vector of length {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Failed to load weights: {source}")]
    Weights {
        #[from]
        source: CheckpointError,
    },
}
