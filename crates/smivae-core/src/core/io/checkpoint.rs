use nalgebra::{DMatrix, DVector};
use safetensors::{Dtype, SafeTensorError, SafeTensors, tensor::TensorView};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const MODEL_INFO_FILE: &str = "model_info.json";
pub const WEIGHTS_FILE: &str = "vae_model.safetensors";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Safetensors error for '{path}': {source}")]
    SafeTensors {
        path: String,
        source: SafeTensorError,
    },
    #[error("Tensor '{0}' is missing from the checkpoint")]
    MissingTensor(String),
    #[error("Tensor '{name}' has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("Tensor '{name}' has unsupported dtype {dtype}; only F32 is supported")]
    UnsupportedDType { name: String, dtype: String },
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Vocabulary and sequence metadata stored next to the network weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub vocab: Vec<String>,
    pub char_to_idx: HashMap<String, usize>,
    /// Keys are decimal token indices, as written by JSON encoders for integer-keyed maps.
    pub idx_to_char: HashMap<String, String>,
    pub start_token: String,
    pub end_token: String,
    pub pad_token: String,
    pub max_length: usize,
}

impl ModelInfo {
    /// Builds consistent lookup maps for `vocab`, indexing tokens by position.
    pub fn from_vocab(
        vocab: Vec<String>,
        start_token: &str,
        end_token: &str,
        pad_token: &str,
        max_length: usize,
    ) -> Self {
        let char_to_idx = vocab
            .iter()
            .enumerate()
            .map(|(i, tok)| (tok.clone(), i))
            .collect();
        let idx_to_char = vocab
            .iter()
            .enumerate()
            .map(|(i, tok)| (i.to_string(), tok.clone()))
            .collect();
        Self {
            vocab,
            char_to_idx,
            idx_to_char,
            start_token: start_token.to_string(),
            end_token: end_token.to_string(),
            pad_token: pad_token.to_string(),
            max_length,
        }
    }

    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let content = std::fs::read_to_string(path).map_err(|e| CheckpointError::Io {
            path: path_string(path),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| CheckpointError::Json {
            path: path_string(path),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let content = serde_json::to_string_pretty(self).map_err(|e| CheckpointError::Json {
            path: path_string(path),
            source: e,
        })?;
        std::fs::write(path, content).map_err(|e| CheckpointError::Io {
            path: path_string(path),
            source: e,
        })
    }
}

/// A dense F32 tensor in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorData {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl TensorData {
    pub fn from_matrix(m: &DMatrix<f32>) -> Self {
        let mut values = Vec::with_capacity(m.len());
        for row in m.row_iter() {
            values.extend(row.iter().copied());
        }
        Self {
            shape: vec![m.nrows(), m.ncols()],
            values,
        }
    }

    pub fn from_vector(v: &DVector<f32>) -> Self {
        Self {
            shape: vec![v.len()],
            values: v.iter().copied().collect(),
        }
    }
}

/// Named F32 tensors read from a safetensors file.
#[derive(Debug, Default)]
pub struct WeightStore {
    tensors: HashMap<String, TensorData>,
}

impl WeightStore {
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let bytes = std::fs::read(path).map_err(|e| CheckpointError::Io {
            path: path_string(path),
            source: e,
        })?;
        let parsed =
            SafeTensors::deserialize(&bytes).map_err(|e| CheckpointError::SafeTensors {
                path: path_string(path),
                source: e,
            })?;

        let mut tensors = HashMap::new();
        for (name, view) in parsed.tensors() {
            if view.dtype() != Dtype::F32 {
                return Err(CheckpointError::UnsupportedDType {
                    name,
                    dtype: format!("{:?}", view.dtype()),
                });
            }
            let values = view
                .data()
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            tensors.insert(
                name,
                TensorData {
                    shape: view.shape().to_vec(),
                    values,
                },
            );
        }
        tracing::debug!(
            "Loaded {} tensors from '{}'",
            tensors.len(),
            path.display()
        );
        Ok(Self { tensors })
    }

    pub fn from_tensors(tensors: impl IntoIterator<Item = (String, TensorData)>) -> Self {
        Self {
            tensors: tensors.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    fn get(&self, name: &str, expected: &[usize]) -> Result<&TensorData, CheckpointError> {
        let tensor = self
            .tensors
            .get(name)
            .ok_or_else(|| CheckpointError::MissingTensor(name.to_string()))?;
        if tensor.shape != expected {
            return Err(CheckpointError::ShapeMismatch {
                name: name.to_string(),
                expected: expected.to_vec(),
                found: tensor.shape.clone(),
            });
        }
        Ok(tensor)
    }

    pub fn matrix(
        &self,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<DMatrix<f32>, CheckpointError> {
        let tensor = self.get(name, &[rows, cols])?;
        Ok(DMatrix::from_row_slice(rows, cols, &tensor.values))
    }

    pub fn vector(&self, name: &str, len: usize) -> Result<DVector<f32>, CheckpointError> {
        let tensor = self.get(name, &[len])?;
        Ok(DVector::from_column_slice(&tensor.values))
    }
}

/// Writes `tensors` as an F32 safetensors file.
pub fn write_weights(
    path: &Path,
    tensors: &[(String, TensorData)],
) -> Result<(), CheckpointError> {
    let as_safetensors_error = |e: SafeTensorError| CheckpointError::SafeTensors {
        path: path_string(path),
        source: e,
    };

    let buffers: Vec<(String, Vec<usize>, Vec<u8>)> = tensors
        .iter()
        .map(|(name, t)| {
            let bytes = t.values.iter().flat_map(|v| v.to_le_bytes()).collect();
            (name.clone(), t.shape.clone(), bytes)
        })
        .collect();

    let mut views = Vec::with_capacity(buffers.len());
    for (name, shape, bytes) in &buffers {
        let view =
            TensorView::new(Dtype::F32, shape.clone(), bytes).map_err(as_safetensors_error)?;
        views.push((name.clone(), view));
    }

    safetensors::serialize_to_file(views, &None, path).map_err(as_safetensors_error)
}
