/// Values used when neither the config file, `--set` nor a CLI flag provides one.
/// Embedding size and latent dimensionality depend on the checkpoint and have no default.
pub struct DefaultsConfig {
    pub hidden_size: usize,
    pub device: String,
    pub steps: usize,
    pub learning_rate: f64,
    pub perturbation: f64,
    pub prior_weight: f64,
    pub objective: String,
    pub qed_weight: f64,
    pub temperature: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            hidden_size: 256,
            device: "cpu".to_string(),
            steps: 100,
            learning_rate: 1e-2,
            perturbation: 0.05,
            prior_weight: 1.0,
            objective: "decoder-confidence".to_string(),
            qed_weight: 1.0,
            temperature: 1.0,
        }
    }
}
