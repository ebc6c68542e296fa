use rand::{distributions::WeightedIndex, prelude::*};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Logits are empty, cannot perform sampling")]
    EmptyLogits,
    #[error("Logits contain NaN or infinite values")]
    NonFiniteLogits,
    #[error("Invalid temperature: {0}. Temperature must be positive for softmax sampling")]
    InvalidTemperature(f64),
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

fn max_logit(logits: &[f32]) -> f64 {
    logits
        .iter()
        .map(|&l| l as f64)
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Numerically stable `log(softmax(logits))`.
pub fn log_softmax(logits: &[f32]) -> Vec<f64> {
    let max = max_logit(logits);
    let log_sum = logits
        .iter()
        .map(|&l| (l as f64 - max).exp())
        .sum::<f64>()
        .ln();
    logits.iter().map(|&l| l as f64 - max - log_sum).collect()
}

/// Index of the largest logit; the first one wins ties.
pub fn argmax(logits: &[f32]) -> Option<usize> {
    logits
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &l)| match best {
            Some((_, b)) if b >= l => best,
            _ => Some((i, l)),
        })
        .map(|(i, _)| i)
}

/// Draws an index from `softmax(logits / temperature)`.
#[instrument(level = "trace", skip_all, fields(temperature))]
pub fn sample_categorical(
    logits: &[f32],
    temperature: f64,
    rng: &mut impl Rng,
) -> Result<usize, SamplingError> {
    if logits.is_empty() {
        return Err(SamplingError::EmptyLogits);
    }
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(SamplingError::InvalidTemperature(temperature));
    }
    if logits.iter().any(|l| !l.is_finite()) {
        return Err(SamplingError::NonFiniteLogits);
    }

    let max = max_logit(logits);
    let weights: Vec<f64> = logits
        .iter()
        .map(|&l| ((l as f64 - max) / temperature).exp())
        .collect();

    let dist = WeightedIndex::new(&weights)?;
    Ok(dist.sample(rng))
}
