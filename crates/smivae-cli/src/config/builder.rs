use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileDecodingStrategy};
use crate::cli::GenerateArgs;
use crate::error::{CliError, Result};
use smivae::engine::config as core_config;
use std::str::FromStr;

pub fn build_config(args: &GenerateArgs) -> Result<core_config::GenerationConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let model_file = file_config.model.take().unwrap_or_default();
    let opt_file = file_config.optimization.take().unwrap_or_default();
    let decoding_file = file_config.decoding.take().unwrap_or_default();

    let device = parse_core::<core_config::Device>(
        model_file.device.as_deref().unwrap_or(&defaults.device),
    )?;
    let objective = parse_core::<core_config::ObjectiveKind>(
        args.objective
            .as_deref()
            .or(opt_file.objective.as_deref())
            .unwrap_or(&defaults.objective),
    )?;

    let decoding = if args.greedy {
        core_config::DecodingStrategy::Greedy
    } else {
        match decoding_file.strategy.unwrap_or(FileDecodingStrategy::Sample) {
            FileDecodingStrategy::Greedy if args.temperature.is_none() => {
                core_config::DecodingStrategy::Greedy
            }
            _ => core_config::DecodingStrategy::Sample {
                temperature: args
                    .temperature
                    .or(decoding_file.temperature)
                    .unwrap_or(defaults.temperature),
            },
        }
    };

    let initial_latent = match &args.from_smiles {
        Some(smiles) => core_config::InitialLatent::FromSmiles(smiles.clone()),
        None => core_config::InitialLatent::Random,
    };

    let mut builder = core_config::GenerationConfigBuilder::new()
        .num_molecules(args.num_molecules)
        .model_dir(args.model_dir.clone())
        .output_path(args.output.clone())
        .hidden_size(
            args.hidden_size
                .or(model_file.hidden_size)
                .unwrap_or(defaults.hidden_size),
        )
        .device(device)
        .steps(args.steps.or(opt_file.steps).unwrap_or(defaults.steps))
        .learning_rate(
            args.learning_rate
                .or(opt_file.learning_rate)
                .unwrap_or(defaults.learning_rate),
        )
        .perturbation(opt_file.perturbation.unwrap_or(defaults.perturbation))
        .prior_weight(opt_file.prior_weight.unwrap_or(defaults.prior_weight))
        .objective(objective)
        .qed_weight(opt_file.qed_weight.unwrap_or(defaults.qed_weight))
        .decoding(decoding)
        .initial_latent(initial_latent)
        .seed(args.seed.or(file_config.seed));

    if let Some(embed_size) = args.embed_size.or(model_file.embed_size) {
        builder = builder.embed_size(embed_size);
    }
    if let Some(latent_dim) = args.latent_dim.or(model_file.latent_dim) {
        builder = builder.latent_dim(latent_dim);
    }

    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

fn parse_core<T>(value: &str) -> Result<T>
where
    T: FromStr<Err = core_config::ConfigError>,
{
    value.parse().map_err(|e: core_config::ConfigError| CliError::Config(e.to_string()))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "seed" => config.seed = Some(parse_value(key, value_str, "integer")?),
            "model.embed-size" => {
                config.model.get_or_insert_with(Default::default).embed_size =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "model.latent-dim" => {
                config.model.get_or_insert_with(Default::default).latent_dim =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "model.hidden-size" => {
                config.model.get_or_insert_with(Default::default).hidden_size =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "model.device" => {
                config.model.get_or_insert_with(Default::default).device =
                    Some(value_str.to_string());
            }
            "optimization.steps" => {
                config.optimization.get_or_insert_with(Default::default).steps =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "optimization.learning-rate" => {
                config
                    .optimization
                    .get_or_insert_with(Default::default)
                    .learning_rate = Some(parse_value(key, value_str, "float")?);
            }
            "optimization.perturbation" => {
                config
                    .optimization
                    .get_or_insert_with(Default::default)
                    .perturbation = Some(parse_value(key, value_str, "float")?);
            }
            "optimization.prior-weight" => {
                config
                    .optimization
                    .get_or_insert_with(Default::default)
                    .prior_weight = Some(parse_value(key, value_str, "float")?);
            }
            "optimization.objective" => {
                config.optimization.get_or_insert_with(Default::default).objective =
                    Some(value_str.to_string());
            }
            "optimization.qed-weight" => {
                config
                    .optimization
                    .get_or_insert_with(Default::default)
                    .qed_weight = Some(parse_value(key, value_str, "float")?);
            }
            "decoding.strategy" => {
                config.decoding.get_or_insert_with(Default::default).strategy =
                    Some(value_str.parse()?);
            }
            "decoding.temperature" => {
                config.decoding.get_or_insert_with(Default::default).temperature =
                    Some(parse_value(key, value_str, "float")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn base_generate_args() -> GenerateArgs {
        GenerateArgs {
            num_molecules: 10,
            model_dir: PathBuf::from("model"),
            output: PathBuf::from("out.csv"),
            config: None,
            embed_size: Some(64),
            latent_dim: Some(56),
            hidden_size: None,
            seed: None,
            steps: None,
            learning_rate: None,
            objective: None,
            from_smiles: None,
            temperature: None,
            greedy: false,
            set_values: vec![],
        }
    }

    #[test]
    fn defaults_fill_everything_not_given() {
        let cfg = build_config(&base_generate_args()).unwrap();
        let defaults = DefaultsConfig::default();

        assert_eq!(cfg.num_molecules, 10);
        assert_eq!(cfg.model.embed_size, 64);
        assert_eq!(cfg.model.latent_dim, 56);
        assert_eq!(cfg.model.hidden_size, defaults.hidden_size);
        assert_eq!(cfg.model.device, core_config::Device::Cpu);
        assert_eq!(cfg.optimization.steps, defaults.steps);
        assert_eq!(cfg.optimization.learning_rate, defaults.learning_rate);
        assert_eq!(cfg.optimization.perturbation, defaults.perturbation);
        assert_eq!(
            cfg.optimization.objective,
            core_config::ObjectiveKind::DecoderConfidence
        );
        assert_eq!(
            cfg.decoding,
            core_config::DecodingStrategy::Sample {
                temperature: defaults.temperature
            }
        );
        assert_eq!(cfg.initial_latent, core_config::InitialLatent::Random);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn file_values_are_overridden_by_set_then_cli() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
            seed = 1

            [model]
            embed-size = 32
            latent-dim = 16
            hidden-size = 64

            [optimization]
            steps = 10
            learning-rate = 0.5
            prior-weight = 0.0

            [decoding]
            temperature = 0.7
            "#,
        )
        .unwrap();

        let mut args = base_generate_args();
        args.config = Some(cfg_path);
        args.embed_size = None;
        args.latent_dim = None;
        args.steps = Some(3);
        args.set_values = vec![
            "optimization.steps=7".to_string(),
            "optimization.learning-rate=0.2".to_string(),
            "seed=9".to_string(),
        ];

        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.model.embed_size, 32);
        assert_eq!(cfg.model.latent_dim, 16);
        assert_eq!(cfg.model.hidden_size, 64);
        assert_eq!(cfg.optimization.steps, 3);
        assert_eq!(cfg.optimization.learning_rate, 0.2);
        assert_eq!(cfg.optimization.prior_weight, 0.0);
        assert_eq!(cfg.seed, Some(9));
        assert_eq!(
            cfg.decoding,
            core_config::DecodingStrategy::Sample { temperature: 0.7 }
        );
    }

    #[test]
    fn greedy_flag_and_file_strategy_select_greedy() {
        let mut args = base_generate_args();
        args.greedy = true;
        assert_eq!(
            build_config(&args).unwrap().decoding,
            core_config::DecodingStrategy::Greedy
        );

        let mut args = base_generate_args();
        args.set_values = vec!["decoding.strategy=greedy".to_string()];
        assert_eq!(
            build_config(&args).unwrap().decoding,
            core_config::DecodingStrategy::Greedy
        );

        args.temperature = Some(0.5);
        assert_eq!(
            build_config(&args).unwrap().decoding,
            core_config::DecodingStrategy::Sample { temperature: 0.5 }
        );
    }

    #[test]
    fn missing_model_dimensions_are_reported() {
        let mut args = base_generate_args();
        args.latent_dim = None;
        let err = build_config(&args).unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("latent_dim")));
    }

    #[test]
    fn objective_device_and_seed_smiles_are_parsed() {
        let mut args = base_generate_args();
        args.objective = Some("qed-guided".to_string());
        args.from_smiles = Some("CCO".to_string());
        args.set_values = vec!["model.device=auto".to_string()];
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.optimization.objective, core_config::ObjectiveKind::QedGuided);
        assert_eq!(
            cfg.initial_latent,
            core_config::InitialLatent::FromSmiles("CCO".to_string())
        );

        let mut args = base_generate_args();
        args.set_values = vec!["model.device=cuda".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let mut args = base_generate_args();
        args.objective = Some("best".to_string());
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        for bad in ["optimization.steps", "optimization.steps=many", "unknown.key=1"] {
            let mut args = base_generate_args();
            args.set_values = vec![bad.to_string()];
            assert!(
                matches!(build_config(&args), Err(CliError::Config(_))),
                "expected rejection of {bad}"
            );
        }
    }

    #[test]
    fn invalid_values_fail_core_validation() {
        let mut args = base_generate_args();
        args.learning_rate = Some(-1.0);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }
}
