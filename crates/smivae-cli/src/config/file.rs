use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileModelConfig {
    pub embed_size: Option<usize>,
    pub latent_dim: Option<usize>,
    pub hidden_size: Option<usize>,
    pub device: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOptimizationConfig {
    pub steps: Option<usize>,
    pub learning_rate: Option<f64>,
    pub perturbation: Option<f64>,
    pub prior_weight: Option<f64>,
    pub objective: Option<String>,
    pub qed_weight: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileDecodingStrategy {
    Sample,
    Greedy,
}

impl std::str::FromStr for FileDecodingStrategy {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sample" => Ok(Self::Sample),
            "greedy" => Ok(Self::Greedy),
            other => Err(CliError::Config(format!(
                "Unknown decoding strategy '{}' (expected 'sample' or 'greedy')",
                other
            ))),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileDecodingConfig {
    pub strategy: Option<FileDecodingStrategy>,
    pub temperature: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub seed: Option<u64>,
    pub model: Option<FileModelConfig>,
    pub optimization: Option<FileOptimizationConfig>,
    pub decoding: Option<FileDecodingConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn full_file_deserializes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("smivae.toml");
        std::fs::write(
            &path,
            r#"
            seed = 42

            [model]
            embed-size = 64
            latent-dim = 56
            hidden-size = 128
            device = "auto"

            [optimization]
            steps = 20
            learning-rate = 0.05
            objective = "qed-guided"
            qed-weight = 2.0

            [decoding]
            strategy = "greedy"
            "#,
        )
        .unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        assert_eq!(config.seed, Some(42));
        let model = config.model.unwrap();
        assert_eq!(model.embed_size, Some(64));
        assert_eq!(model.hidden_size, Some(128));
        assert_eq!(model.device.as_deref(), Some("auto"));
        let opt = config.optimization.unwrap();
        assert_eq!(opt.steps, Some(20));
        assert_eq!(opt.objective.as_deref(), Some("qed-guided"));
        assert_eq!(opt.perturbation, None);
        assert_eq!(
            config.decoding.unwrap().strategy,
            Some(FileDecodingStrategy::Greedy)
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[model]\nembedding = 64\n").unwrap();
        assert!(matches!(
            FileConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            FileConfig::from_file(&dir.path().join("absent.toml")),
            Err(CliError::Io(_))
        ));
    }
}
