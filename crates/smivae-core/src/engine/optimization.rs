use super::config::{ObjectiveKind, OptimizationConfig};
use super::decoding::decode_greedy;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::chem::qed;
use crate::core::model::vae::SmilesVae;
use crate::core::model::vocab::Vocabulary;
use nalgebra::DVector;
use rand::Rng;
use tracing::{debug, info, trace};

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

/// A scalar score of a latent vector; the optimizer maximizes it.
pub trait LatentObjective {
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        model: &SmilesVae,
        vocab: &Vocabulary,
        z: &DVector<f32>,
    ) -> Result<f64, EngineError>;
}

fn prior_penalty(z: &DVector<f32>) -> f64 {
    let squared: f64 = z.iter().map(|&v| (v as f64) * (v as f64)).sum();
    0.5 * squared / z.len().max(1) as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderConfidence {
    pub prior_weight: f64,
}

impl LatentObjective for DecoderConfidence {
    fn name(&self) -> &'static str {
        "decoder-confidence"
    }

    fn evaluate(
        &self,
        model: &SmilesVae,
        vocab: &Vocabulary,
        z: &DVector<f32>,
    ) -> Result<f64, EngineError> {
        let sequence = decode_greedy(model, vocab, z)?;
        Ok(sequence.mean_log_prob() - self.prior_weight * prior_penalty(z))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QedGuided {
    pub prior_weight: f64,
    pub qed_weight: f64,
}

impl LatentObjective for QedGuided {
    fn name(&self) -> &'static str {
        "qed-guided"
    }

    fn evaluate(
        &self,
        model: &SmilesVae,
        vocab: &Vocabulary,
        z: &DVector<f32>,
    ) -> Result<f64, EngineError> {
        let sequence = decode_greedy(model, vocab, z)?;
        let score = qed::score_smiles(&vocab.detokenize(&sequence.tokens));
        Ok(sequence.mean_log_prob() - self.prior_weight * prior_penalty(z)
            + self.qed_weight * score)
    }
}

pub fn objective_for(config: &OptimizationConfig) -> Box<dyn LatentObjective> {
    match config.objective {
        ObjectiveKind::DecoderConfidence => Box::new(DecoderConfidence {
            prior_weight: config.prior_weight,
        }),
        ObjectiveKind::QedGuided => Box::new(QedGuided {
            prior_weight: config.prior_weight,
            qed_weight: config.qed_weight,
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationTrace {
    pub initial: f64,
    pub final_value: f64,
    /// Per-step objective estimate, the mean of the two perturbed evaluations.
    pub estimates: Vec<f64>,
}

impl OptimizationTrace {
    pub fn improvement(&self) -> f64 {
        self.final_value - self.initial
    }
}

/// Adam ascent on a latent vector, with gradients estimated by simultaneous perturbation
/// (SPSA): two objective evaluations per step regardless of the latent dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatentOptimizer {
    pub steps: usize,
    pub learning_rate: f64,
    pub perturbation: f64,
}

impl LatentOptimizer {
    pub fn from_config(config: &OptimizationConfig) -> Self {
        Self {
            steps: config.steps,
            learning_rate: config.learning_rate,
            perturbation: config.perturbation,
        }
    }

    pub fn optimize(
        &self,
        objective: &dyn LatentObjective,
        model: &SmilesVae,
        vocab: &Vocabulary,
        z: &mut DVector<f32>,
        rng: &mut impl Rng,
        reporter: &ProgressReporter,
    ) -> Result<OptimizationTrace, EngineError> {
        let initial = finite(objective.evaluate(model, vocab, z)?)?;
        info!(
            "Optimizing latent vector with '{}' for {} steps (lr = {}, c = {})",
            objective.name(),
            self.steps,
            self.learning_rate,
            self.perturbation
        );
        debug!("Initial objective: {:.6}", initial);

        let dim = z.len();
        let mut m = vec![0.0f64; dim];
        let mut v = vec![0.0f64; dim];
        let mut estimates = Vec::with_capacity(self.steps);
        let c = self.perturbation;

        reporter.report(Progress::TaskStart {
            total_steps: self.steps as u64,
        });
        for step in 1..=self.steps {
            let delta: Vec<f64> = (0..dim)
                .map(|_| if rng.gen_bool(0.5) { 1.0 } else { -1.0 })
                .collect();
            let shifted = |sign: f64| {
                DVector::from_fn(dim, |i, _| z[i] + (sign * c * delta[i]) as f32)
            };
            let plus = finite(objective.evaluate(model, vocab, &shifted(1.0))?)?;
            let minus = finite(objective.evaluate(model, vocab, &shifted(-1.0))?)?;
            let slope = (plus - minus) / (2.0 * c);

            let bias1 = 1.0 - ADAM_BETA1.powi(step as i32);
            let bias2 = 1.0 - ADAM_BETA2.powi(step as i32);
            for i in 0..dim {
                let g = slope * delta[i];
                m[i] = ADAM_BETA1 * m[i] + (1.0 - ADAM_BETA1) * g;
                v[i] = ADAM_BETA2 * v[i] + (1.0 - ADAM_BETA2) * g * g;
                let m_hat = m[i] / bias1;
                let v_hat = v[i] / bias2;
                z[i] += (self.learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON)) as f32;
            }

            let estimate = 0.5 * (plus + minus);
            trace!(step, estimate, "SPSA step");
            estimates.push(estimate);
            reporter.report(Progress::Objective {
                step,
                value: estimate,
            });
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);

        let final_value = if self.steps == 0 {
            initial
        } else {
            finite(objective.evaluate(model, vocab, z)?)?
        };
        info!(
            "Latent optimization finished: objective {:.4} -> {:.4}",
            initial, final_value
        );

        Ok(OptimizationTrace {
            initial,
            final_value,
            estimates,
        })
    }
}

fn finite(value: f64) -> Result<f64, EngineError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::PhaseFailed {
            phase: "latent optimization",
            reason: format!("objective evaluated to {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::checkpoint::ModelInfo;
    use crate::core::model::vae::{LayerSizes, VaeArchitecture};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::{Arc, Mutex};

    fn fixture() -> (SmilesVae, Vocabulary) {
        let info = ModelInfo::from_vocab(
            ["<pad>", "<start>", "<end>", "C", "O", "c", "1", "(", ")"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            "<start>",
            "<end>",
            "<pad>",
            16,
        );
        let arch = VaeArchitecture::from_info(
            &info,
            LayerSizes {
                embed_size: 5,
                latent_dim: 4,
                hidden_size: 6,
            },
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(23);
        (
            SmilesVae::random(arch, &mut rng),
            Vocabulary::from_info(&info).unwrap(),
        )
    }

    /// Concave objective with its maximum at `target`; ignores the network.
    struct Quadratic {
        target: f32,
    }

    impl LatentObjective for Quadratic {
        fn name(&self) -> &'static str {
            "quadratic"
        }

        fn evaluate(
            &self,
            _model: &SmilesVae,
            _vocab: &Vocabulary,
            z: &DVector<f32>,
        ) -> Result<f64, EngineError> {
            Ok(-z.iter().map(|&v| ((v - self.target) as f64).powi(2)).sum::<f64>())
        }
    }

    #[test]
    fn optimizer_climbs_a_simple_objective() {
        let (model, vocab) = fixture();
        let optimizer = LatentOptimizer {
            steps: 300,
            learning_rate: 0.05,
            perturbation: 0.01,
        };
        let mut z = DVector::from_element(4, 2.0f32);
        let mut rng = StdRng::seed_from_u64(4);
        let trace = optimizer
            .optimize(
                &Quadratic { target: 0.0 },
                &model,
                &vocab,
                &mut z,
                &mut rng,
                &ProgressReporter::new(),
            )
            .unwrap();
        assert!(trace.final_value > trace.initial);
        assert!(trace.improvement() > 10.0);
        assert_eq!(trace.estimates.len(), 300);
        assert!(z.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn zero_steps_leave_the_latent_untouched() {
        let (model, vocab) = fixture();
        let optimizer = LatentOptimizer {
            steps: 0,
            learning_rate: 0.01,
            perturbation: 0.05,
        };
        let original = DVector::from_column_slice(&[0.3f32, -0.1, 0.0, 1.2]);
        let mut z = original.clone();
        let mut rng = StdRng::seed_from_u64(4);
        let objective = DecoderConfidence { prior_weight: 1.0 };
        let trace = optimizer
            .optimize(&objective, &model, &vocab, &mut z, &mut rng, &ProgressReporter::new())
            .unwrap();
        assert_eq!(z, original);
        assert_eq!(trace.initial, trace.final_value);
        assert!(trace.estimates.is_empty());
    }

    #[test]
    fn optimizer_reports_one_increment_per_step() {
        let (model, vocab) = fixture();
        let increments = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&increments);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            if event == Progress::TaskIncrement {
                *counter.lock().unwrap() += 1;
            }
        }));
        let optimizer = LatentOptimizer {
            steps: 7,
            learning_rate: 0.01,
            perturbation: 0.05,
        };
        let mut z = DVector::zeros(4);
        let mut rng = StdRng::seed_from_u64(8);
        optimizer
            .optimize(
                &QedGuided {
                    prior_weight: 1.0,
                    qed_weight: 1.0,
                },
                &model,
                &vocab,
                &mut z,
                &mut rng,
                &reporter,
            )
            .unwrap();
        assert_eq!(*increments.lock().unwrap(), 7);
    }

    #[test]
    fn decoder_confidence_penalizes_distance_from_the_prior() {
        let (model, vocab) = fixture();
        let z = DVector::from_element(4, 0.5f32);
        let free = DecoderConfidence { prior_weight: 0.0 }
            .evaluate(&model, &vocab, &z)
            .unwrap();
        let penalized = DecoderConfidence { prior_weight: 2.0 }
            .evaluate(&model, &vocab, &z)
            .unwrap();
        assert!(free <= 0.0);
        assert!((free - penalized - 2.0 * 0.125).abs() < 1e-9);
    }

    #[test]
    fn objectives_are_selected_from_config() {
        let mut config = OptimizationConfig::default();
        assert_eq!(objective_for(&config).name(), "decoder-confidence");
        config.objective = ObjectiveKind::QedGuided;
        assert_eq!(objective_for(&config).name(), "qed-guided");
    }

    #[test]
    fn seeded_optimization_is_reproducible() {
        let (model, vocab) = fixture();
        let optimizer = LatentOptimizer {
            steps: 5,
            learning_rate: 0.01,
            perturbation: 0.05,
        };
        let run = || {
            let mut z = DVector::from_element(4, 0.2f32);
            let mut rng = StdRng::seed_from_u64(31);
            optimizer
                .optimize(
                    &DecoderConfidence { prior_weight: 1.0 },
                    &model,
                    &vocab,
                    &mut z,
                    &mut rng,
                    &ProgressReporter::new(),
                )
                .unwrap();
            z
        };
        assert_eq!(run(), run());
    }
}
