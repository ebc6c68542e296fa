use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "smivae CLI - Generate and score molecules with a pretrained SMILES variational autoencoder.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Optimize a latent vector and decode a batch of molecules from a trained checkpoint.
    Generate(GenerateArgs),
    /// Report SMILES validity and QED for the given strings.
    Score(ScoreArgs),
}

/// Arguments for the `generate` subcommand.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    // --- Core Arguments ---
    /// Number of molecules to decode.
    #[arg(short = 'n', long = "num-molecules", required = true, value_name = "INT")]
    pub num_molecules: usize,

    /// Directory containing model_info.json and vae_model.safetensors.
    #[arg(short, long = "model-dir", required = true, value_name = "DIR")]
    pub model_dir: PathBuf,

    /// Path of the CSV file to write.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Model Overrides ---
    /// Override the embedding size of the checkpoint.
    #[arg(long, value_name = "INT")]
    pub embed_size: Option<usize>,

    /// Override the latent dimensionality of the checkpoint.
    #[arg(long, value_name = "INT")]
    pub latent_dim: Option<usize>,

    /// Override the GRU hidden size of the checkpoint.
    #[arg(long, value_name = "INT")]
    pub hidden_size: Option<usize>,

    // --- Optimization Overrides ---
    /// Seed for the random number generator. Runs with the same seed are reproducible.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Override the number of latent optimization steps.
    #[arg(long, value_name = "INT")]
    pub steps: Option<usize>,

    /// Override the optimizer learning rate.
    #[arg(long, value_name = "FLOAT")]
    pub learning_rate: Option<f64>,

    /// Objective maximized during latent optimization ('decoder-confidence' or 'qed-guided').
    #[arg(long, value_name = "NAME")]
    pub objective: Option<String>,

    /// Start optimization from the encoder mean of this SMILES instead of a random draw.
    #[arg(long, value_name = "SMILES")]
    pub from_smiles: Option<String>,

    // --- Decoding Overrides ---
    /// Override the sampling temperature.
    #[arg(short, long, value_name = "FLOAT", conflicts_with = "greedy")]
    pub temperature: Option<f64>,

    /// Decode greedily instead of sampling. Every molecule will be identical.
    #[arg(long)]
    pub greedy: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S optimization.steps=50
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `score` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// SMILES strings to evaluate.
    #[arg(required = true, value_name = "SMILES")]
    pub smiles: Vec<String>,
}
