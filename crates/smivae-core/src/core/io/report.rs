use crate::core::chem::Validity;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Column headers of the generation report, in file order.
pub const COLUMNS: [&str; 3] = ["Generated_SMILES", "Validity", "QED"];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Unexpected header in '{path}': {found:?}")]
    Header { path: String, found: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRecord {
    #[serde(rename = "Generated_SMILES")]
    pub smiles: String,
    #[serde(rename = "Validity")]
    pub validity: Validity,
    #[serde(rename = "QED")]
    pub qed: f64,
}

/// Column-oriented table of generated molecules, kept in generation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    generated_smiles: Vec<String>,
    validity: Vec<Validity>,
    qed: Vec<f64>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generated_smiles: Vec::with_capacity(capacity),
            validity: Vec::with_capacity(capacity),
            qed: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: GeneratedRecord) {
        self.generated_smiles.push(record.smiles);
        self.validity.push(record.validity);
        self.qed.push(record.qed);
    }

    pub fn len(&self) -> usize {
        self.generated_smiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generated_smiles.is_empty()
    }

    pub fn generated_smiles(&self) -> &[String] {
        &self.generated_smiles
    }

    pub fn records(&self) -> impl Iterator<Item = GeneratedRecord> + '_ {
        self.generated_smiles
            .iter()
            .zip(&self.validity)
            .zip(&self.qed)
            .map(|((smiles, &validity), &qed)| GeneratedRecord {
                smiles: smiles.clone(),
                validity,
                qed,
            })
    }

    /// Column name to ordered string values, in [`COLUMNS`] order.
    pub fn columns(&self) -> Vec<(&'static str, Vec<String>)> {
        vec![
            (COLUMNS[0], self.generated_smiles.clone()),
            (COLUMNS[1], self.validity.iter().map(ToString::to_string).collect()),
            (COLUMNS[2], self.qed.iter().map(ToString::to_string).collect()),
        ]
    }

    pub fn valid_count(&self) -> usize {
        self.validity.iter().filter(|v| v.is_valid()).count()
    }

    /// Mean QED over valid rows, `None` when no row is valid.
    pub fn mean_valid_qed(&self) -> Option<f64> {
        let (sum, n) = self
            .validity
            .iter()
            .zip(&self.qed)
            .filter(|(v, _)| v.is_valid())
            .fold((0.0, 0usize), |(s, n), (_, &q)| (s + q, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// Writes the table as CSV. The header row is written even when the table is empty.
    pub fn write_csv(&self, path: &Path) -> Result<(), ReportError> {
        let path_str = path.to_string_lossy().to_string();
        let csv_error = |e: csv::Error| ReportError::Csv {
            path: path_str.clone(),
            source: e,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(csv_error)?;
        writer.write_record(COLUMNS).map_err(csv_error)?;
        for record in self.records() {
            writer.serialize(record).map_err(csv_error)?;
        }
        writer.flush().map_err(|e| ReportError::Io {
            path: path_str.clone(),
            source: e,
        })
    }

    pub fn read_csv(path: &Path) -> Result<Self, ReportError> {
        let path_str = path.to_string_lossy().to_string();
        let csv_error = |e: csv::Error| ReportError::Csv {
            path: path_str.clone(),
            source: e,
        };

        let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
        let headers = reader.headers().map_err(csv_error)?.clone();
        if headers.iter().ne(COLUMNS.iter().copied()) {
            return Err(ReportError::Header {
                path: path_str.clone(),
                found: headers.iter().map(str::to_string).collect(),
            });
        }

        let mut table = Self::new();
        for result in reader.deserialize() {
            let record: GeneratedRecord = result.map_err(csv_error)?;
            table.push(record);
        }
        Ok(table)
    }
}

impl FromIterator<GeneratedRecord> for ResultTable {
    fn from_iter<I: IntoIterator<Item = GeneratedRecord>>(iter: I) -> Self {
        let mut table = Self::new();
        for record in iter {
            table.push(record);
        }
        table
    }
}
