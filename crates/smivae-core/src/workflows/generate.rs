use crate::core::chem::qed;
use crate::core::io::checkpoint::{ModelInfo, WeightStore};
use crate::core::io::report::{GeneratedRecord, ResultTable};
use crate::core::model::vae::{SmilesVae, VaeArchitecture};
use crate::core::model::vocab::Vocabulary;
use crate::engine::config::{GenerationConfig, InitialLatent};
use crate::engine::decoding::Decoder;
use crate::engine::error::EngineError;
use crate::engine::optimization::{LatentOptimizer, objective_for};
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::DVector;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use tracing::{debug, info, instrument};

/// Loads a checkpoint, optimizes one latent vector, decodes `num_molecules` strings from it
/// and writes the validity/QED table to the configured output path.
#[instrument(skip_all, name = "generation_workflow")]
pub fn run(
    config: &GenerationConfig,
    reporter: &ProgressReporter,
) -> Result<ResultTable, EngineError> {
    info!(
        "Generating {} molecule(s) from model in '{}' on {}.",
        config.num_molecules,
        config.model_dir.display(),
        config.model.device
    );

    // === Phase 1: Load the checkpoint ===
    let (model, vocab) = reporter.phase("Loading Model", || load_model(config))?;

    let mut rng = match config.seed {
        Some(seed) => {
            debug!("Seeding RNG with {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    // === Phase 2: Latent vector optimization ===
    let mut z = initial_latent(config, &model, &vocab, &mut rng)?;
    let trace = reporter.phase("Optimizing Latent Vector", || {
        let objective = objective_for(&config.optimization);
        LatentOptimizer::from_config(&config.optimization).optimize(
            objective.as_ref(),
            &model,
            &vocab,
            &mut z,
            &mut rng,
            reporter,
        )
    })?;

    // === Phase 3: Decode, validate and score ===
    let table = reporter.phase("Decoding Molecules", || {
        decode_batch(config, &model, &vocab, &z, &mut rng, reporter)
    })?;

    // === Phase 4: Persist ===
    table.write_csv(config.output_path())?;
    info!(
        "Generated molecules saved to {}",
        config.output_path().display()
    );
    match table.mean_valid_qed() {
        Some(mean) => info!(
            "{}/{} valid molecule(s), mean QED of valid molecules {:.3}.",
            table.valid_count(),
            table.len(),
            mean
        ),
        None => info!("0/{} valid molecule(s).", table.len()),
    }
    info!(
        "Latent objective changed by {:+.4} over {} optimization step(s).",
        trace.improvement(),
        trace.estimates.len()
    );

    Ok(table)
}

fn load_model(config: &GenerationConfig) -> Result<(SmilesVae, Vocabulary), EngineError> {
    let info = ModelInfo::load(&config.model_info_path())?;
    let arch = VaeArchitecture::from_info(&info, config.model.layer_sizes())?;
    let vocab = Vocabulary::from_info(&info)?;
    let store = WeightStore::load(&config.weights_path())?;
    let model = SmilesVae::load_weights(arch, &store)?;
    info!(
        "Loaded model: vocabulary of {}, latent dimension {}, decode horizon {}.",
        arch.vocab_size, arch.latent_dim, arch.max_decode_len
    );
    Ok((model, vocab))
}

fn initial_latent(
    config: &GenerationConfig,
    model: &SmilesVae,
    vocab: &Vocabulary,
    rng: &mut StdRng,
) -> Result<DVector<f32>, EngineError> {
    let dim = model.architecture().latent_dim;
    match &config.initial_latent {
        InitialLatent::Random => Ok(DVector::from_fn(dim, |_, _| {
            StandardNormal.sample(&mut *rng)
        })),
        InitialLatent::FromSmiles(smiles) => {
            let mut tokens = vec![vocab.start_index()];
            tokens.extend(vocab.tokenize(smiles)?);
            tokens.push(vocab.end_index());
            let (mu, _) = model.encode(&tokens)?;
            info!("Starting from the encoder mean of '{}'.", smiles);
            Ok(mu)
        }
    }
}

fn decode_batch(
    config: &GenerationConfig,
    model: &SmilesVae,
    vocab: &Vocabulary,
    z: &DVector<f32>,
    rng: &mut StdRng,
    reporter: &ProgressReporter,
) -> Result<ResultTable, EngineError> {
    let decoder = Decoder::new(config.decoding);
    let mut table = ResultTable::with_capacity(config.num_molecules);

    reporter.report(Progress::TaskStart {
        total_steps: config.num_molecules as u64,
    });
    for _ in 0..config.num_molecules {
        let smiles = decoder.decode(model, vocab, z, rng)?;
        let (validity, qed) = qed::evaluate(&smiles);
        debug!(smiles = %smiles, %validity, qed, "Decoded molecule");
        table.push(GeneratedRecord {
            smiles,
            validity,
            qed,
        });
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::Validity;
    use crate::core::model::vae::LayerSizes;
    use crate::core::model::ModelError;
    use crate::engine::config::{DecodingStrategy, GenerationConfigBuilder};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tempfile::{TempDir, tempdir};

    const SIZES: LayerSizes = LayerSizes {
        embed_size: 8,
        latent_dim: 4,
        hidden_size: 12,
    };

    fn model_info(symbols: &[&str], max_length: usize) -> ModelInfo {
        ModelInfo::from_vocab(
            symbols.iter().map(|s| s.to_string()).collect(),
            "<start>",
            "<end>",
            "<pad>",
            max_length,
        )
    }

    fn write_checkpoint(dir: &Path, info: &ModelInfo) {
        let arch = VaeArchitecture::from_info(info, SIZES).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);
        SmilesVae::random(arch, &mut rng)
            .save_checkpoint(dir, info)
            .unwrap();
    }

    fn smiles_checkpoint() -> TempDir {
        let dir = tempdir().unwrap();
        let info = model_info(
            &[
                "<pad>", "<start>", "<end>", "C", "c", "N", "O", "1", "2", "(", ")", "=", "#",
                "Cl",
            ],
            24,
        );
        write_checkpoint(dir.path(), &info);
        dir
    }

    fn config_for(model_dir: &Path, output: PathBuf, count: usize) -> GenerationConfigBuilder {
        GenerationConfigBuilder::new()
            .num_molecules(count)
            .model_dir(model_dir.to_path_buf())
            .output_path(output)
            .embed_size(SIZES.embed_size)
            .latent_dim(SIZES.latent_dim)
            .hidden_size(SIZES.hidden_size)
            .steps(5)
    }

    #[test]
    fn row_count_matches_request_and_labels_match_reparse() {
        let model_dir = smiles_checkpoint();
        let out_dir = tempdir().unwrap();
        let output = out_dir.path().join("generated.csv");
        let config = config_for(model_dir.path(), output.clone(), 12)
            .seed(Some(7))
            .build()
            .unwrap();

        let table = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(table.len(), 12);
        for record in table.records() {
            assert_eq!(record.validity, Validity::of(&record.smiles));
            assert!(record.qed.is_finite());
            if record.validity == Validity::Invalid {
                assert_eq!(record.qed, 0.0);
            }
        }

        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content.lines().next(), Some("Generated_SMILES,Validity,QED"));
        assert_eq!(ResultTable::read_csv(&output).unwrap().len(), 12);
    }

    #[test]
    fn same_seed_reproduces_identical_rows() {
        let model_dir = smiles_checkpoint();
        let out_dir = tempdir().unwrap();
        let generate = |name: &str| {
            let config = config_for(model_dir.path(), out_dir.path().join(name), 6)
                .seed(Some(123))
                .build()
                .unwrap();
            run(&config, &ProgressReporter::new()).unwrap()
        };
        assert_eq!(generate("a.csv"), generate("b.csv"));
    }

    #[test]
    fn zero_count_writes_header_only() {
        let model_dir = smiles_checkpoint();
        let out_dir = tempdir().unwrap();
        let output = out_dir.path().join("empty.csv");
        let config = config_for(model_dir.path(), output.clone(), 0)
            .build()
            .unwrap();

        let table = run(&config, &ProgressReporter::new()).unwrap();
        assert!(table.is_empty());
        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content.trim_end(), "Generated_SMILES,Validity,QED");
    }

    #[test]
    fn zero_count_still_reports_loading_and_optimization() {
        let model_dir = smiles_checkpoint();
        let out_dir = tempdir().unwrap();
        let config = config_for(model_dir.path(), out_dir.path().join("quiet.csv"), 0)
            .seed(Some(3))
            .build()
            .unwrap();

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            sink.lock().unwrap().push(event);
        }));
        assert!(run(&config, &reporter).unwrap().is_empty());

        let events = events.lock().unwrap();
        let objectives = events
            .iter()
            .filter(|e| matches!(e, Progress::Objective { .. }))
            .count();
        assert_eq!(objectives, 5);

        let mut expected = vec![
            Progress::PhaseStart {
                name: "Loading Model",
            },
            Progress::PhaseFinish,
            Progress::PhaseStart {
                name: "Optimizing Latent Vector",
            },
            Progress::TaskStart { total_steps: 5 },
        ];
        expected.extend(std::iter::repeat_n(Progress::TaskIncrement, 5));
        expected.extend([
            Progress::TaskFinish,
            Progress::PhaseFinish,
            Progress::PhaseStart {
                name: "Decoding Molecules",
            },
            Progress::TaskStart { total_steps: 0 },
            Progress::TaskFinish,
            Progress::PhaseFinish,
        ]);
        let structural: Vec<Progress> = events
            .iter()
            .filter(|e| !matches!(e, Progress::Objective { .. }))
            .cloned()
            .collect();
        assert_eq!(structural, expected);
    }

    #[test]
    fn toy_vocabulary_yields_three_labeled_rows() {
        let model_dir = tempdir().unwrap();
        let info = model_info(&["A", "B", "C", "<start>", "<end>", "<pad>"], 10);
        write_checkpoint(model_dir.path(), &info);
        let out_dir = tempdir().unwrap();
        let config = config_for(model_dir.path(), out_dir.path().join("toy.csv"), 3)
            .seed(Some(1))
            .build()
            .unwrap();

        let table = run(&config, &ProgressReporter::new()).unwrap();
        assert_eq!(table.len(), 3);
        for record in table.records() {
            assert!(matches!(record.validity, Validity::Valid | Validity::Invalid));
            assert!(record.qed.is_finite());
            assert!(record.smiles.chars().count() <= 9);
        }
    }

    #[test]
    fn empty_vocabulary_fails_before_decoding() {
        let model_dir = tempdir().unwrap();
        model_info(&[], 10)
            .save(&model_dir.path().join(crate::core::io::checkpoint::MODEL_INFO_FILE))
            .unwrap();
        let out_dir = tempdir().unwrap();
        let output = out_dir.path().join("never.csv");
        let config = config_for(model_dir.path(), output.clone(), 3)
            .build()
            .unwrap();

        let result = run(&config, &ProgressReporter::new());
        assert!(matches!(
            result,
            Err(EngineError::Model {
                source: ModelError::InvalidArchitecture(_)
            })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn max_length_of_one_fails_before_decoding() {
        let model_dir = tempdir().unwrap();
        model_info(&["<pad>", "<start>", "<end>", "C"], 1)
            .save(&model_dir.path().join(crate::core::io::checkpoint::MODEL_INFO_FILE))
            .unwrap();
        let out_dir = tempdir().unwrap();
        let config = config_for(model_dir.path(), out_dir.path().join("never.csv"), 3)
            .build()
            .unwrap();
        assert!(matches!(
            run(&config, &ProgressReporter::new()),
            Err(EngineError::Model {
                source: ModelError::InvalidArchitecture(_)
            })
        ));
    }

    #[test]
    fn missing_checkpoint_files_are_reported() {
        let model_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        let config = config_for(model_dir.path(), out_dir.path().join("x.csv"), 1)
            .build()
            .unwrap();
        assert!(matches!(
            run(&config, &ProgressReporter::new()),
            Err(EngineError::Checkpoint { .. })
        ));
    }

    #[test]
    fn greedy_decoding_repeats_one_molecule() {
        let model_dir = smiles_checkpoint();
        let out_dir = tempdir().unwrap();
        let config = config_for(model_dir.path(), out_dir.path().join("greedy.csv"), 4)
            .decoding(DecodingStrategy::Greedy)
            .build()
            .unwrap();
        let table = run(&config, &ProgressReporter::new()).unwrap();
        assert!(
            table
                .generated_smiles()
                .windows(2)
                .all(|pair| pair[0] == pair[1])
        );
    }

    #[test]
    fn latent_can_start_from_a_seed_smiles() {
        let model_dir = smiles_checkpoint();
        let out_dir = tempdir().unwrap();
        let config = config_for(model_dir.path(), out_dir.path().join("seeded.csv"), 2)
            .initial_latent(InitialLatent::FromSmiles("c1ccccc1Cl".to_string()))
            .seed(Some(5))
            .build()
            .unwrap();
        assert_eq!(run(&config, &ProgressReporter::new()).unwrap().len(), 2);

        let bad = config_for(model_dir.path(), out_dir.path().join("bad.csv"), 2)
            .initial_latent(InitialLatent::FromSmiles("Br".to_string()))
            .build()
            .unwrap();
        assert!(matches!(
            run(&bad, &ProgressReporter::new()),
            Err(EngineError::Model {
                source: ModelError::UnknownSymbol { .. }
            })
        ));
    }

    #[test]
    fn unwritable_output_path_fails_after_generation() {
        let model_dir = smiles_checkpoint();
        let out_dir = tempdir().unwrap();
        let config = config_for(
            model_dir.path(),
            out_dir.path().join("missing").join("out.csv"),
            1,
        )
        .build()
        .unwrap();
        assert!(matches!(
            run(&config, &ProgressReporter::new()),
            Err(EngineError::Report { .. })
        ));
    }
}
