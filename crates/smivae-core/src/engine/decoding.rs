use super::config::DecodingStrategy;
use super::error::EngineError;
use super::utils::sampling::{argmax, log_softmax, sample_categorical};
use crate::core::model::vae::SmilesVae;
use crate::core::model::vocab::Vocabulary;
use nalgebra::DVector;
use rand::Rng;
use tracing::trace;

/// Token sequence produced by one decoder run.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSequence {
    /// Emitted token indices, without start, end or pad tokens.
    pub tokens: Vec<usize>,
    /// Sum of the log-probabilities of every token chosen, including the terminating one.
    pub log_prob: f64,
    /// Number of decoder steps taken.
    pub steps: usize,
    /// Whether decoding stopped on an end or pad token rather than the length limit.
    pub terminated: bool,
}

impl DecodedSequence {
    pub fn mean_log_prob(&self) -> f64 {
        if self.steps == 0 {
            0.0
        } else {
            self.log_prob / self.steps as f64
        }
    }
}

/// Autoregressive decoder turning a latent vector into a SMILES string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoder {
    strategy: DecodingStrategy,
}

impl Decoder {
    pub fn new(strategy: DecodingStrategy) -> Self {
        Self { strategy }
    }

    /// Runs the decoder; `rng` is only drawn from by the sampling strategy.
    pub fn decode_tokens(
        &self,
        model: &SmilesVae,
        vocab: &Vocabulary,
        z: &DVector<f32>,
        rng: &mut impl Rng,
    ) -> Result<DecodedSequence, EngineError> {
        match self.strategy {
            DecodingStrategy::Greedy => decode_greedy(model, vocab, z),
            DecodingStrategy::Sample { temperature } => unroll(model, vocab, z, |logits| {
                Ok(sample_categorical(logits, temperature, rng)?)
            }),
        }
    }

    pub fn decode(
        &self,
        model: &SmilesVae,
        vocab: &Vocabulary,
        z: &DVector<f32>,
        rng: &mut impl Rng,
    ) -> Result<String, EngineError> {
        let sequence = self.decode_tokens(model, vocab, z, rng)?;
        Ok(vocab.detokenize(&sequence.tokens))
    }
}

/// Arg-max decoding; deterministic for a given latent vector.
pub fn decode_greedy(
    model: &SmilesVae,
    vocab: &Vocabulary,
    z: &DVector<f32>,
) -> Result<DecodedSequence, EngineError> {
    unroll(model, vocab, z, |logits| {
        argmax(logits).ok_or(EngineError::PhaseFailed {
            phase: "decoding",
            reason: "decoder produced no logits".to_string(),
        })
    })
}

fn unroll(
    model: &SmilesVae,
    vocab: &Vocabulary,
    z: &DVector<f32>,
    mut choose: impl FnMut(&[f32]) -> Result<usize, EngineError>,
) -> Result<DecodedSequence, EngineError> {
    let horizon = model.architecture().max_decode_len;
    let mut hidden = model.initial_hidden(z)?;
    let mut input = vocab.start_index();
    let mut sequence = DecodedSequence {
        tokens: Vec::with_capacity(horizon),
        log_prob: 0.0,
        steps: 0,
        terminated: false,
    };

    for _ in 0..horizon {
        let (logits, next_hidden) = model.step(input, &hidden)?;
        hidden = next_hidden;
        let logits = logits.as_slice();

        let token = choose(logits)?;
        sequence.log_prob += log_softmax(logits)[token];
        sequence.steps += 1;

        if token == vocab.end_index() || token == vocab.pad_index() {
            sequence.terminated = true;
            break;
        }
        if token != vocab.start_index() {
            sequence.tokens.push(token);
        }
        input = token;
    }

    trace!(
        steps = sequence.steps,
        terminated = sequence.terminated,
        "Decoded {} tokens",
        sequence.tokens.len()
    );
    Ok(sequence)
}
