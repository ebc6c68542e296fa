use crate::cli::GenerateArgs;
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use smivae::{core::io::report::ResultTable, engine::progress::ProgressReporter, workflows};
use tracing::{info, warn};

pub fn run(args: GenerateArgs) -> Result<()> {
    info!("Merging configuration from defaults, file and CLI arguments...");
    let config = config::build_config(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Generating {} molecule(s) from {}...",
        config.num_molecules,
        config.model_dir.display()
    );
    info!("Invoking the core generation workflow...");

    let table = workflows::generate::run(&config, &reporter)?;

    println!("Generated molecules saved to {}", config.output_path().display());
    println!("{}", summary_line(&table));
    if !table.is_empty() && table.valid_count() == 0 {
        warn!("None of the generated molecules parsed as valid SMILES.");
    }

    Ok(())
}

fn summary_line(table: &ResultTable) -> String {
    let total = table.len();
    let valid = table.valid_count();
    let fraction = if total == 0 {
        0.0
    } else {
        100.0 * valid as f64 / total as f64
    };
    match table.mean_valid_qed() {
        Some(mean) => format!(
            "✓ {}/{} valid ({:.1}%), mean QED of valid molecules: {:.3}",
            valid, total, fraction, mean
        ),
        None => format!("✓ {}/{} valid ({:.1}%)", valid, total, fraction),
    }
}
