use crate::core::io::checkpoint::{MODEL_INFO_FILE, WEIGHTS_FILE};
use crate::core::model::vae::LayerSizes;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_HIDDEN_SIZE: usize = 256;
pub const DEFAULT_OPTIMIZATION_STEPS: usize = 100;
pub const DEFAULT_LEARNING_RATE: f64 = 1e-2;
pub const DEFAULT_PERTURBATION: f64 = 0.05;
pub const DEFAULT_PRIOR_WEIGHT: f64 = 1.0;
pub const DEFAULT_QED_WEIGHT: f64 = 1.0;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Unsupported device '{0}' (expected 'cpu' or 'auto')")]
    UnsupportedDevice(String),
    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Compute device for the forward pass. Only the CPU backend exists; `auto` resolves to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
}

impl FromStr for Device {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" | "auto" => Ok(Device::Cpu),
            other => Err(ConfigError::UnsupportedDevice(other.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveKind {
    /// Mean log-probability of the greedy decode, regularized toward the prior.
    #[default]
    DecoderConfidence,
    /// Decoder confidence plus a weighted QED bonus for the greedy decode.
    QedGuided,
}

impl FromStr for ObjectiveKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "decoder-confidence" => Ok(ObjectiveKind::DecoderConfidence),
            "qed-guided" => Ok(ObjectiveKind::QedGuided),
            other => Err(ConfigError::UnknownVariant {
                kind: "objective",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodingStrategy {
    Sample { temperature: f64 },
    Greedy,
}

impl Default for DecodingStrategy {
    fn default() -> Self {
        DecodingStrategy::Sample {
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum InitialLatent {
    /// Standard normal draw.
    #[default]
    Random,
    /// Encoder posterior mean of the given SMILES string.
    FromSmiles(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub embed_size: usize,
    pub latent_dim: usize,
    pub hidden_size: usize,
    pub device: Device,
}

impl ModelConfig {
    pub fn layer_sizes(&self) -> LayerSizes {
        LayerSizes {
            embed_size: self.embed_size,
            latent_dim: self.latent_dim,
            hidden_size: self.hidden_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationConfig {
    pub steps: usize,
    pub learning_rate: f64,
    pub perturbation: f64,
    pub prior_weight: f64,
    pub objective: ObjectiveKind,
    pub qed_weight: f64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_OPTIMIZATION_STEPS,
            learning_rate: DEFAULT_LEARNING_RATE,
            perturbation: DEFAULT_PERTURBATION,
            prior_weight: DEFAULT_PRIOR_WEIGHT,
            objective: ObjectiveKind::default(),
            qed_weight: DEFAULT_QED_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub num_molecules: usize,
    pub model_dir: PathBuf,
    pub output_path: PathBuf,
    pub model: ModelConfig,
    pub optimization: OptimizationConfig,
    pub decoding: DecodingStrategy,
    pub initial_latent: InitialLatent,
    pub seed: Option<u64>,
}

impl GenerationConfig {
    pub fn model_info_path(&self) -> PathBuf {
        self.model_dir.join(MODEL_INFO_FILE)
    }

    pub fn weights_path(&self) -> PathBuf {
        self.model_dir.join(WEIGHTS_FILE)
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

#[derive(Default)]
pub struct GenerationConfigBuilder {
    num_molecules: Option<usize>,
    model_dir: Option<PathBuf>,
    output_path: Option<PathBuf>,
    embed_size: Option<usize>,
    latent_dim: Option<usize>,
    hidden_size: Option<usize>,
    device: Option<Device>,
    steps: Option<usize>,
    learning_rate: Option<f64>,
    perturbation: Option<f64>,
    prior_weight: Option<f64>,
    objective: Option<ObjectiveKind>,
    qed_weight: Option<f64>,
    decoding: Option<DecodingStrategy>,
    initial_latent: Option<InitialLatent>,
    seed: Option<u64>,
}

impl GenerationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_molecules(mut self, n: usize) -> Self {
        self.num_molecules = Some(n);
        self
    }
    pub fn model_dir(mut self, path: PathBuf) -> Self {
        self.model_dir = Some(path);
        self
    }
    pub fn output_path(mut self, path: PathBuf) -> Self {
        self.output_path = Some(path);
        self
    }
    pub fn embed_size(mut self, size: usize) -> Self {
        self.embed_size = Some(size);
        self
    }
    pub fn latent_dim(mut self, dim: usize) -> Self {
        self.latent_dim = Some(dim);
        self
    }
    pub fn hidden_size(mut self, size: usize) -> Self {
        self.hidden_size = Some(size);
        self
    }
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }
    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = Some(steps);
        self
    }
    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = Some(lr);
        self
    }
    pub fn perturbation(mut self, c: f64) -> Self {
        self.perturbation = Some(c);
        self
    }
    pub fn prior_weight(mut self, weight: f64) -> Self {
        self.prior_weight = Some(weight);
        self
    }
    pub fn objective(mut self, objective: ObjectiveKind) -> Self {
        self.objective = Some(objective);
        self
    }
    pub fn qed_weight(mut self, weight: f64) -> Self {
        self.qed_weight = Some(weight);
        self
    }
    pub fn decoding(mut self, strategy: DecodingStrategy) -> Self {
        self.decoding = Some(strategy);
        self
    }
    pub fn initial_latent(mut self, initial: InitialLatent) -> Self {
        self.initial_latent = Some(initial);
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<GenerationConfig, ConfigError> {
        let defaults = OptimizationConfig::default();
        let model = ModelConfig {
            embed_size: self
                .embed_size
                .ok_or(ConfigError::MissingParameter("embed_size"))?,
            latent_dim: self
                .latent_dim
                .ok_or(ConfigError::MissingParameter("latent_dim"))?,
            hidden_size: self.hidden_size.unwrap_or(DEFAULT_HIDDEN_SIZE),
            device: self.device.unwrap_or_default(),
        };
        let optimization = OptimizationConfig {
            steps: self.steps.unwrap_or(defaults.steps),
            learning_rate: positive(
                "learning_rate",
                self.learning_rate.unwrap_or(defaults.learning_rate),
            )?,
            perturbation: positive(
                "perturbation",
                self.perturbation.unwrap_or(defaults.perturbation),
            )?,
            prior_weight: non_negative(
                "prior_weight",
                self.prior_weight.unwrap_or(defaults.prior_weight),
            )?,
            objective: self.objective.unwrap_or(defaults.objective),
            qed_weight: non_negative("qed_weight", self.qed_weight.unwrap_or(defaults.qed_weight))?,
        };
        let decoding = self.decoding.unwrap_or_default();
        if let DecodingStrategy::Sample { temperature } = decoding {
            positive("temperature", temperature)?;
        }

        Ok(GenerationConfig {
            num_molecules: self
                .num_molecules
                .ok_or(ConfigError::MissingParameter("num_molecules"))?,
            model_dir: self
                .model_dir
                .ok_or(ConfigError::MissingParameter("model_dir"))?,
            output_path: self
                .output_path
                .ok_or(ConfigError::MissingParameter("output_path"))?,
            model,
            optimization,
            decoding,
            initial_latent: self.initial_latent.unwrap_or_default(),
            seed: self.seed,
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("{value} is not a positive finite number"),
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("{value} is not a non-negative finite number"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> GenerationConfigBuilder {
        GenerationConfigBuilder::new()
            .num_molecules(5)
            .model_dir(PathBuf::from("model"))
            .output_path(PathBuf::from("out.csv"))
            .embed_size(64)
            .latent_dim(56)
    }

    #[test]
    fn builder_applies_defaults() {
        let config = minimal().build().unwrap();
        assert_eq!(config.model.hidden_size, DEFAULT_HIDDEN_SIZE);
        assert_eq!(config.model.device, Device::Cpu);
        assert_eq!(config.optimization.steps, 100);
        assert_eq!(config.optimization.learning_rate, 1e-2);
        assert_eq!(config.decoding, DecodingStrategy::Sample { temperature: 1.0 });
        assert_eq!(config.initial_latent, InitialLatent::Random);
        assert_eq!(config.seed, None);
        assert_eq!(config.model_info_path(), PathBuf::from("model/model_info.json"));
        assert_eq!(config.weights_path(), PathBuf::from("model/vae_model.safetensors"));
    }

    #[test]
    fn builder_reports_missing_parameters() {
        let result = GenerationConfigBuilder::new()
            .embed_size(64)
            .latent_dim(56)
            .model_dir(PathBuf::from("m"))
            .output_path(PathBuf::from("o.csv"))
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("num_molecules")));

        let result = GenerationConfigBuilder::new().embed_size(64).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("latent_dim")));
    }

    #[test]
    fn builder_rejects_non_positive_rates_and_temperatures() {
        assert!(matches!(
            minimal().learning_rate(0.0).build(),
            Err(ConfigError::InvalidParameter { name: "learning_rate", .. })
        ));
        assert!(matches!(
            minimal()
                .decoding(DecodingStrategy::Sample { temperature: -1.0 })
                .build(),
            Err(ConfigError::InvalidParameter { name: "temperature", .. })
        ));
        assert!(minimal().decoding(DecodingStrategy::Greedy).build().is_ok());
    }

    #[test]
    fn device_names_resolve_to_cpu() {
        assert_eq!("cpu".parse::<Device>(), Ok(Device::Cpu));
        assert_eq!("AUTO".parse::<Device>(), Ok(Device::Cpu));
        assert_eq!(
            "cuda".parse::<Device>(),
            Err(ConfigError::UnsupportedDevice("cuda".to_string()))
        );
    }

    #[test]
    fn objective_names_parse() {
        assert_eq!(
            "qed-guided".parse::<ObjectiveKind>(),
            Ok(ObjectiveKind::QedGuided)
        );
        assert!("best".parse::<ObjectiveKind>().is_err());
    }
}
