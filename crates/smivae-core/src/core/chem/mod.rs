//! Chemistry primitives: SMILES parsing and sanitization, SMARTS substructure queries,
//! molecular descriptors and the QED drug-likeness score used to grade generated molecules.

pub mod descriptors;
pub mod element;
pub mod molecule;
pub mod qed;
pub mod smarts;
pub mod smiles;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a generated string parses into a chemically sane molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Validity {
    Valid,
    Invalid,
}

impl Validity {
    pub fn of(smiles: &str) -> Self {
        if smiles::is_valid(smiles) {
            Validity::Valid
        } else {
            Validity::Invalid
        }
    }

    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validity::Valid => write!(f, "Valid"),
            Validity::Invalid => write!(f, "Invalid"),
        }
    }
}
