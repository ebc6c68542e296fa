use crate::cli::ScoreArgs;
use crate::error::Result;
use smivae::core::chem::{Validity, qed};
use tracing::debug;

pub fn run(args: ScoreArgs) -> Result<()> {
    let rows: Vec<(String, Validity, f64)> = args
        .smiles
        .into_iter()
        .map(|smiles| {
            let (validity, score) = qed::evaluate(&smiles);
            debug!(smiles = %smiles, %validity, score, "Scored molecule");
            (smiles, validity, score)
        })
        .collect();

    print!("{}", render_table(&rows));
    Ok(())
}

fn render_table(rows: &[(String, Validity, f64)]) -> String {
    let width = rows
        .iter()
        .map(|(s, _, _)| s.chars().count())
        .chain(std::iter::once("SMILES".len()))
        .max()
        .unwrap_or(0);

    let mut out = format!("{:<width$}  {:<8}  {}\n", "SMILES", "Validity", "QED");
    for (smiles, validity, score) in rows {
        out.push_str(&format!(
            "{:<width$}  {:<8}  {:.4}\n",
            smiles,
            validity.to_string(),
            score
        ));
    }
    out
}
