use thiserror::Error;

use super::config::ConfigError;
use super::utils::sampling::SamplingError;
use crate::core::io::checkpoint::CheckpointError;
use crate::core::io::report::ReportError;
use crate::core::model::ModelError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Checkpoint loading failed: {source}")]
    Checkpoint {
        #[from]
        source: CheckpointError,
    },

    #[error("Model error: {source}")]
    Model {
        #[from]
        source: ModelError,
    },

    #[error("Token sampling failed: {source}")]
    Sampling {
        #[from]
        source: SamplingError,
    },

    #[error("Failed to write results: {source}")]
    Report {
        #[from]
        source: ReportError,
    },

    #[error("Phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_failure_names_the_phase_it_came_from() {
        let decoding = EngineError::PhaseFailed {
            phase: "decoding",
            reason: "decoder produced no logits".to_string(),
        };
        assert_eq!(
            decoding.to_string(),
            "Phase 'decoding' failed: decoder produced no logits"
        );

        let optimization = EngineError::PhaseFailed {
            phase: "latent optimization",
            reason: "objective evaluated to NaN".to_string(),
        };
        assert_eq!(
            optimization.to_string(),
            "Phase 'latent optimization' failed: objective evaluated to NaN"
        );
    }
}
