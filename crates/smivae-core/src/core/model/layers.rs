use crate::core::io::checkpoint::{CheckpointError, TensorData, WeightStore};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::distributions::Uniform;

fn uniform_matrix(rows: usize, cols: usize, bound: f32, rng: &mut impl Rng) -> DMatrix<f32> {
    let dist = Uniform::new_inclusive(-bound, bound);
    DMatrix::from_fn(rows, cols, |_, _| rng.sample(dist))
}

fn uniform_vector(len: usize, bound: f32, rng: &mut impl Rng) -> DVector<f32> {
    let dist = Uniform::new_inclusive(-bound, bound);
    DVector::from_fn(len, |_, _| rng.sample(dist))
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Fully connected layer, `y = W x + b` with `W` stored as `[out, in]`.
#[derive(Debug, Clone)]
pub struct Linear {
    weight: DMatrix<f32>,
    bias: DVector<f32>,
}

impl Linear {
    pub fn load(
        store: &WeightStore,
        prefix: &str,
        in_features: usize,
        out_features: usize,
    ) -> Result<Self, CheckpointError> {
        Ok(Self {
            weight: store.matrix(&format!("{prefix}.weight"), out_features, in_features)?,
            bias: store.vector(&format!("{prefix}.bias"), out_features)?,
        })
    }

    pub fn random(in_features: usize, out_features: usize, rng: &mut impl Rng) -> Self {
        let bound = 1.0 / (in_features.max(1) as f32).sqrt();
        Self {
            weight: uniform_matrix(out_features, in_features, bound, rng),
            bias: uniform_vector(out_features, bound, rng),
        }
    }

    pub fn forward(&self, x: &DVector<f32>) -> DVector<f32> {
        &self.weight * x + &self.bias
    }

    pub fn tensors(&self, prefix: &str) -> Vec<(String, TensorData)> {
        vec![
            (format!("{prefix}.weight"), TensorData::from_matrix(&self.weight)),
            (format!("{prefix}.bias"), TensorData::from_vector(&self.bias)),
        ]
    }
}

/// Lookup table of `[num_embeddings, dim]`.
#[derive(Debug, Clone)]
pub struct Embedding {
    weight: DMatrix<f32>,
}

impl Embedding {
    pub fn load(
        store: &WeightStore,
        prefix: &str,
        num_embeddings: usize,
        dim: usize,
    ) -> Result<Self, CheckpointError> {
        Ok(Self {
            weight: store.matrix(&format!("{prefix}.weight"), num_embeddings, dim)?,
        })
    }

    pub fn random(num_embeddings: usize, dim: usize, rng: &mut impl Rng) -> Self {
        Self {
            weight: uniform_matrix(num_embeddings, dim, 1.0, rng),
        }
    }

    pub fn num_embeddings(&self) -> usize {
        self.weight.nrows()
    }

    /// Embedding row for `index`; `None` when out of range.
    pub fn lookup(&self, index: usize) -> Option<DVector<f32>> {
        (index < self.weight.nrows()).then(|| self.weight.row(index).transpose())
    }

    pub fn tensors(&self, prefix: &str) -> Vec<(String, TensorData)> {
        vec![(format!("{prefix}.weight"), TensorData::from_matrix(&self.weight))]
    }
}

/// Single-layer GRU cell with gates stacked as reset, update, candidate.
#[derive(Debug, Clone)]
pub struct GruCell {
    weight_ih: DMatrix<f32>,
    weight_hh: DMatrix<f32>,
    bias_ih: DVector<f32>,
    bias_hh: DVector<f32>,
    hidden_size: usize,
}

impl GruCell {
    pub fn load(
        store: &WeightStore,
        prefix: &str,
        input_size: usize,
        hidden_size: usize,
    ) -> Result<Self, CheckpointError> {
        let gates = 3 * hidden_size;
        Ok(Self {
            weight_ih: store.matrix(&format!("{prefix}.weight_ih_l0"), gates, input_size)?,
            weight_hh: store.matrix(&format!("{prefix}.weight_hh_l0"), gates, hidden_size)?,
            bias_ih: store.vector(&format!("{prefix}.bias_ih_l0"), gates)?,
            bias_hh: store.vector(&format!("{prefix}.bias_hh_l0"), gates)?,
            hidden_size,
        })
    }

    pub fn random(input_size: usize, hidden_size: usize, rng: &mut impl Rng) -> Self {
        let gates = 3 * hidden_size;
        let bound = 1.0 / (hidden_size.max(1) as f32).sqrt();
        Self {
            weight_ih: uniform_matrix(gates, input_size, bound, rng),
            weight_hh: uniform_matrix(gates, hidden_size, bound, rng),
            bias_ih: uniform_vector(gates, bound, rng),
            bias_hh: uniform_vector(gates, bound, rng),
            hidden_size,
        }
    }

    pub fn forward(&self, x: &DVector<f32>, h: &DVector<f32>) -> DVector<f32> {
        let n = self.hidden_size;
        let gi = &self.weight_ih * x + &self.bias_ih;
        let gh = &self.weight_hh * h + &self.bias_hh;

        DVector::from_fn(n, |i, _| {
            let r = sigmoid(gi[i] + gh[i]);
            let z = sigmoid(gi[n + i] + gh[n + i]);
            let candidate = (gi[2 * n + i] + r * gh[2 * n + i]).tanh();
            (1.0 - z) * candidate + z * h[i]
        })
    }

    pub fn tensors(&self, prefix: &str) -> Vec<(String, TensorData)> {
        vec![
            (format!("{prefix}.weight_ih_l0"), TensorData::from_matrix(&self.weight_ih)),
            (format!("{prefix}.weight_hh_l0"), TensorData::from_matrix(&self.weight_hh)),
            (format!("{prefix}.bias_ih_l0"), TensorData::from_vector(&self.bias_ih)),
            (format!("{prefix}.bias_hh_l0"), TensorData::from_vector(&self.bias_hh)),
        ]
    }
}
