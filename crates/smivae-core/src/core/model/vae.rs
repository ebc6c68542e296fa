use super::ModelError;
use super::layers::{Embedding, GruCell, Linear};
use crate::core::io::checkpoint::{
    CheckpointError, MODEL_INFO_FILE, ModelInfo, TensorData, WEIGHTS_FILE, WeightStore,
    write_weights,
};
use nalgebra::DVector;
use rand::Rng;
use std::path::Path;
use tracing::debug;

/// Layer sizes that are fixed by the training configuration rather than the checkpoint
/// metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSizes {
    pub embed_size: usize,
    pub latent_dim: usize,
    pub hidden_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaeArchitecture {
    pub vocab_size: usize,
    pub embed_size: usize,
    pub latent_dim: usize,
    pub hidden_size: usize,
    /// Maximum number of tokens the decoder emits, `max_length - 1`.
    pub max_decode_len: usize,
    pub pad_index: usize,
}

impl VaeArchitecture {
    pub fn from_info(info: &ModelInfo, sizes: LayerSizes) -> Result<Self, ModelError> {
        let vocab_size = info.vocab.len();
        if vocab_size == 0 {
            return Err(ModelError::InvalidArchitecture(
                "vocabulary is empty".to_string(),
            ));
        }
        let max_decode_len = info.max_length.saturating_sub(1);
        if max_decode_len == 0 {
            return Err(ModelError::InvalidArchitecture(format!(
                "max_length {} leaves no room for decoded tokens",
                info.max_length
            )));
        }
        for (name, value) in [
            ("embed_size", sizes.embed_size),
            ("latent_dim", sizes.latent_dim),
            ("hidden_size", sizes.hidden_size),
        ] {
            if value == 0 {
                return Err(ModelError::InvalidArchitecture(format!("{name} must be positive")));
            }
        }
        let pad_index = *info.char_to_idx.get(&info.pad_token).ok_or_else(|| {
            ModelError::InvalidArchitecture(format!(
                "pad token '{}' has no index",
                info.pad_token
            ))
        })?;
        if pad_index >= vocab_size {
            return Err(ModelError::InvalidArchitecture(format!(
                "pad index {pad_index} is outside the vocabulary of size {vocab_size}"
            )));
        }

        Ok(Self {
            vocab_size,
            embed_size: sizes.embed_size,
            latent_dim: sizes.latent_dim,
            hidden_size: sizes.hidden_size,
            max_decode_len,
            pad_index,
        })
    }
}

/// GRU-based SMILES variational autoencoder.
///
/// The encoder embeds a token sequence, runs it through a GRU and projects the final hidden
/// state to the posterior mean and log-variance. The decoder maps a latent vector to its
/// initial hidden state and then emits one token distribution per step.
#[derive(Debug, Clone)]
pub struct SmilesVae {
    arch: VaeArchitecture,
    encoder_embedding: Embedding,
    encoder_gru: GruCell,
    fc_mu: Linear,
    fc_logvar: Linear,
    decoder_embedding: Embedding,
    fc_latent: Linear,
    decoder_gru: GruCell,
    fc_out: Linear,
}

impl SmilesVae {
    pub fn load_weights(arch: VaeArchitecture, store: &WeightStore) -> Result<Self, ModelError> {
        let VaeArchitecture {
            vocab_size: v,
            embed_size: e,
            latent_dim: l,
            hidden_size: h,
            ..
        } = arch;
        let model = Self {
            arch,
            encoder_embedding: Embedding::load(store, "encoder.embedding", v, e)?,
            encoder_gru: GruCell::load(store, "encoder.gru", e, h)?,
            fc_mu: Linear::load(store, "encoder.fc_mu", h, l)?,
            fc_logvar: Linear::load(store, "encoder.fc_logvar", h, l)?,
            decoder_embedding: Embedding::load(store, "decoder.embedding", v, e)?,
            fc_latent: Linear::load(store, "decoder.fc_latent", l, h)?,
            decoder_gru: GruCell::load(store, "decoder.gru", e, h)?,
            fc_out: Linear::load(store, "decoder.fc_out", h, v)?,
        };
        debug!(
            "Loaded VAE weights (vocab {}, embed {}, latent {}, hidden {})",
            v, e, l, h
        );
        Ok(model)
    }

    /// Randomly initialised network, used to fabricate checkpoints in tests and demos.
    pub fn random(arch: VaeArchitecture, rng: &mut impl Rng) -> Self {
        let VaeArchitecture {
            vocab_size: v,
            embed_size: e,
            latent_dim: l,
            hidden_size: h,
            ..
        } = arch;
        Self {
            arch,
            encoder_embedding: Embedding::random(v, e, rng),
            encoder_gru: GruCell::random(e, h, rng),
            fc_mu: Linear::random(h, l, rng),
            fc_logvar: Linear::random(h, l, rng),
            decoder_embedding: Embedding::random(v, e, rng),
            fc_latent: Linear::random(l, h, rng),
            decoder_gru: GruCell::random(e, h, rng),
            fc_out: Linear::random(h, v, rng),
        }
    }

    /// All parameters under their state-dict names.
    pub fn to_tensors(&self) -> Vec<(String, TensorData)> {
        let mut tensors = Vec::new();
        tensors.extend(self.encoder_embedding.tensors("encoder.embedding"));
        tensors.extend(self.encoder_gru.tensors("encoder.gru"));
        tensors.extend(self.fc_mu.tensors("encoder.fc_mu"));
        tensors.extend(self.fc_logvar.tensors("encoder.fc_logvar"));
        tensors.extend(self.decoder_embedding.tensors("decoder.embedding"));
        tensors.extend(self.fc_latent.tensors("decoder.fc_latent"));
        tensors.extend(self.decoder_gru.tensors("decoder.gru"));
        tensors.extend(self.fc_out.tensors("decoder.fc_out"));
        tensors
    }

    /// Writes `model_info.json` and `vae_model.safetensors` into an existing directory.
    pub fn save_checkpoint(&self, dir: &Path, info: &ModelInfo) -> Result<(), CheckpointError> {
        info.save(&dir.join(MODEL_INFO_FILE))?;
        write_weights(&dir.join(WEIGHTS_FILE), &self.to_tensors())
    }

    pub fn architecture(&self) -> &VaeArchitecture {
        &self.arch
    }

    fn embed(&self, table: &Embedding, token: usize) -> Result<DVector<f32>, ModelError> {
        table.lookup(token).ok_or(ModelError::TokenOutOfRange {
            index: token,
            size: table.num_embeddings(),
        })
    }

    /// Posterior mean and log-variance for a token sequence.
    pub fn encode(&self, tokens: &[usize]) -> Result<(DVector<f32>, DVector<f32>), ModelError> {
        let mut hidden = DVector::zeros(self.arch.hidden_size);
        for &token in tokens {
            let x = self.embed(&self.encoder_embedding, token)?;
            hidden = self.encoder_gru.forward(&x, &hidden);
        }
        Ok((self.fc_mu.forward(&hidden), self.fc_logvar.forward(&hidden)))
    }

    /// Decoder hidden state seeded from a latent vector, `tanh(W z + b)`.
    pub fn initial_hidden(&self, z: &DVector<f32>) -> Result<DVector<f32>, ModelError> {
        if z.len() != self.arch.latent_dim {
            return Err(ModelError::DimensionMismatch {
                expected: self.arch.latent_dim,
                found: z.len(),
            });
        }
        Ok(self.fc_latent.forward(z).map(f32::tanh))
    }

    /// Feeds one token to the decoder; returns vocabulary logits and the next hidden state.
    pub fn step(
        &self,
        token: usize,
        hidden: &DVector<f32>,
    ) -> Result<(DVector<f32>, DVector<f32>), ModelError> {
        let x = self.embed(&self.decoder_embedding, token)?;
        let next = self.decoder_gru.forward(&x, hidden);
        let logits = self.fc_out.forward(&next);
        Ok((logits, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tempfile::tempdir;

    const SIZES: LayerSizes = LayerSizes {
        embed_size: 4,
        latent_dim: 3,
        hidden_size: 5,
    };

    fn info(symbols: &[&str], max_length: usize) -> ModelInfo {
        ModelInfo::from_vocab(
            symbols.iter().map(|s| s.to_string()).collect(),
            "<start>",
            "<end>",
            "<pad>",
            max_length,
        )
    }

    fn small_arch() -> VaeArchitecture {
        VaeArchitecture::from_info(&info(&["<pad>", "<start>", "<end>", "C", "O"], 10), SIZES)
            .unwrap()
    }

    #[test]
    fn architecture_derives_horizon_and_pad_index() {
        let arch = small_arch();
        assert_eq!(arch.vocab_size, 5);
        assert_eq!(arch.max_decode_len, 9);
        assert_eq!(arch.pad_index, 0);
    }

    #[test]
    fn empty_vocabulary_is_an_invalid_architecture() {
        let result = VaeArchitecture::from_info(&info(&[], 10), SIZES);
        assert!(matches!(result, Err(ModelError::InvalidArchitecture(_))));
    }

    #[test]
    fn max_length_of_one_is_an_invalid_architecture() {
        for max_length in [0, 1] {
            let result =
                VaeArchitecture::from_info(&info(&["<pad>", "<start>", "<end>"], max_length), SIZES);
            assert!(matches!(result, Err(ModelError::InvalidArchitecture(_))));
        }
    }

    #[test]
    fn zero_sized_layers_are_rejected() {
        let sizes = LayerSizes {
            latent_dim: 0,
            ..SIZES
        };
        let result = VaeArchitecture::from_info(&info(&["<pad>", "<start>", "<end>"], 5), sizes);
        assert!(matches!(result, Err(ModelError::InvalidArchitecture(_))));
    }

    #[test]
    fn weights_round_trip_through_safetensors() {
        let arch = small_arch();
        let mut rng = StdRng::seed_from_u64(3);
        let model = SmilesVae::random(arch, &mut rng);

        let dir = tempdir().unwrap();
        let path = dir.path().join(WEIGHTS_FILE);
        write_weights(&path, &model.to_tensors()).unwrap();
        let reloaded =
            SmilesVae::load_weights(arch, &WeightStore::load(&path).unwrap()).unwrap();

        let z = DVector::from_column_slice(&[0.1, -0.2, 0.3]);
        let h0 = model.initial_hidden(&z).unwrap();
        assert_eq!(h0, reloaded.initial_hidden(&z).unwrap());
        let (logits, _) = model.step(1, &h0).unwrap();
        let (reloaded_logits, _) = reloaded.step(1, &h0).unwrap();
        assert_eq!(logits, reloaded_logits);
        assert_eq!(logits.len(), arch.vocab_size);
    }

    #[test]
    fn saved_checkpoint_contains_both_files() {
        let arch = small_arch();
        let mut rng = StdRng::seed_from_u64(4);
        let model = SmilesVae::random(arch, &mut rng);
        let info = info(&["<pad>", "<start>", "<end>", "C", "O"], 10);
        let dir = tempdir().unwrap();
        model.save_checkpoint(dir.path(), &info).unwrap();

        assert_eq!(ModelInfo::load(&dir.path().join(MODEL_INFO_FILE)).unwrap(), info);
        let store = WeightStore::load(&dir.path().join(WEIGHTS_FILE)).unwrap();
        assert_eq!(store.len(), model.to_tensors().len());
    }

    #[test]
    fn mismatched_checkpoint_fails_to_load() {
        let arch = small_arch();
        let mut rng = StdRng::seed_from_u64(5);
        let wider = VaeArchitecture {
            hidden_size: 6,
            ..arch
        };
        let store = WeightStore::from_tensors(SmilesVae::random(wider, &mut rng).to_tensors());
        assert!(matches!(
            SmilesVae::load_weights(arch, &store),
            Err(ModelError::Weights {
                source: CheckpointError::ShapeMismatch { .. }
            })
        ));
    }

    #[test]
    fn encoder_and_decoder_reject_bad_inputs() {
        let mut rng = StdRng::seed_from_u64(9);
        let model = SmilesVae::random(small_arch(), &mut rng);
        let (mu, logvar) = model.encode(&[1, 3, 4, 2]).unwrap();
        assert_eq!((mu.len(), logvar.len()), (3, 3));
        assert!(matches!(
            model.encode(&[42]),
            Err(ModelError::TokenOutOfRange { index: 42, size: 5 })
        ));
        assert!(matches!(
            model.initial_hidden(&DVector::zeros(2)),
            Err(ModelError::DimensionMismatch { expected: 3, found: 2 })
        ));
    }
}
