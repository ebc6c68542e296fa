use phf::{Map, Set, phf_map, phf_set};

/// Static per-element data used by the SMILES parser and the descriptor calculators.
/// The wildcard atom `*` is listed with atomic number 0 and no valence constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    pub symbol: &'static str,
    pub atomic_number: u8,
    /// Standard atomic weight in g/mol.
    pub mass: f64,
    /// Allowed neutral valences in ascending order. Empty means unchecked (metals, noble gases).
    pub valences: &'static [u8],
}

const HYDROGEN_MASS: f64 = 1.008;

static ELEMENTS: Map<&'static str, ElementData> = phf_map! {
    "*" => ElementData { symbol: "*", atomic_number: 0, mass: 0.0, valences: &[] },
    "H" => ElementData { symbol: "H", atomic_number: 1, mass: HYDROGEN_MASS, valences: &[1] },
    "He" => ElementData { symbol: "He", atomic_number: 2, mass: 4.003, valences: &[] },
    "Li" => ElementData { symbol: "Li", atomic_number: 3, mass: 6.941, valences: &[1] },
    "Be" => ElementData { symbol: "Be", atomic_number: 4, mass: 9.012, valences: &[2] },
    "B" => ElementData { symbol: "B", atomic_number: 5, mass: 10.812, valences: &[3] },
    "C" => ElementData { symbol: "C", atomic_number: 6, mass: 12.011, valences: &[4] },
    "N" => ElementData { symbol: "N", atomic_number: 7, mass: 14.007, valences: &[3] },
    "O" => ElementData { symbol: "O", atomic_number: 8, mass: 15.999, valences: &[2] },
    "F" => ElementData { symbol: "F", atomic_number: 9, mass: 18.998, valences: &[1] },
    "Ne" => ElementData { symbol: "Ne", atomic_number: 10, mass: 20.180, valences: &[] },
    "Na" => ElementData { symbol: "Na", atomic_number: 11, mass: 22.990, valences: &[1] },
    "Mg" => ElementData { symbol: "Mg", atomic_number: 12, mass: 24.305, valences: &[2] },
    "Al" => ElementData { symbol: "Al", atomic_number: 13, mass: 26.982, valences: &[3] },
    "Si" => ElementData { symbol: "Si", atomic_number: 14, mass: 28.086, valences: &[4] },
    "P" => ElementData { symbol: "P", atomic_number: 15, mass: 30.974, valences: &[3, 5, 7] },
    "S" => ElementData { symbol: "S", atomic_number: 16, mass: 32.067, valences: &[2, 4, 6] },
    "Cl" => ElementData { symbol: "Cl", atomic_number: 17, mass: 35.453, valences: &[1] },
    "Ar" => ElementData { symbol: "Ar", atomic_number: 18, mass: 39.948, valences: &[] },
    "K" => ElementData { symbol: "K", atomic_number: 19, mass: 39.098, valences: &[1] },
    "Ca" => ElementData { symbol: "Ca", atomic_number: 20, mass: 40.078, valences: &[2] },
    "Ti" => ElementData { symbol: "Ti", atomic_number: 22, mass: 47.867, valences: &[] },
    "Cr" => ElementData { symbol: "Cr", atomic_number: 24, mass: 51.996, valences: &[] },
    "Mn" => ElementData { symbol: "Mn", atomic_number: 25, mass: 54.938, valences: &[] },
    "Fe" => ElementData { symbol: "Fe", atomic_number: 26, mass: 55.845, valences: &[] },
    "Co" => ElementData { symbol: "Co", atomic_number: 27, mass: 58.933, valences: &[] },
    "Ni" => ElementData { symbol: "Ni", atomic_number: 28, mass: 58.693, valences: &[] },
    "Cu" => ElementData { symbol: "Cu", atomic_number: 29, mass: 63.546, valences: &[] },
    "Zn" => ElementData { symbol: "Zn", atomic_number: 30, mass: 65.390, valences: &[] },
    "Ga" => ElementData { symbol: "Ga", atomic_number: 31, mass: 69.723, valences: &[3] },
    "Ge" => ElementData { symbol: "Ge", atomic_number: 32, mass: 72.610, valences: &[4] },
    "As" => ElementData { symbol: "As", atomic_number: 33, mass: 74.922, valences: &[3, 5, 7] },
    "Se" => ElementData { symbol: "Se", atomic_number: 34, mass: 78.960, valences: &[2, 4, 6] },
    "Br" => ElementData { symbol: "Br", atomic_number: 35, mass: 79.904, valences: &[1] },
    "Kr" => ElementData { symbol: "Kr", atomic_number: 36, mass: 83.800, valences: &[] },
    "Rb" => ElementData { symbol: "Rb", atomic_number: 37, mass: 85.468, valences: &[1] },
    "Sr" => ElementData { symbol: "Sr", atomic_number: 38, mass: 87.620, valences: &[2] },
    "Nb" => ElementData { symbol: "Nb", atomic_number: 41, mass: 92.906, valences: &[] },
    "Mo" => ElementData { symbol: "Mo", atomic_number: 42, mass: 95.950, valences: &[] },
    "Ru" => ElementData { symbol: "Ru", atomic_number: 44, mass: 101.070, valences: &[] },
    "Rh" => ElementData { symbol: "Rh", atomic_number: 45, mass: 102.906, valences: &[] },
    "Pd" => ElementData { symbol: "Pd", atomic_number: 46, mass: 106.420, valences: &[] },
    "Ag" => ElementData { symbol: "Ag", atomic_number: 47, mass: 107.868, valences: &[] },
    "Cd" => ElementData { symbol: "Cd", atomic_number: 48, mass: 112.411, valences: &[] },
    "Sn" => ElementData { symbol: "Sn", atomic_number: 50, mass: 118.710, valences: &[] },
    "Sb" => ElementData { symbol: "Sb", atomic_number: 51, mass: 121.760, valences: &[3, 5] },
    "Te" => ElementData { symbol: "Te", atomic_number: 52, mass: 127.600, valences: &[2, 4, 6] },
    "I" => ElementData { symbol: "I", atomic_number: 53, mass: 126.904, valences: &[1, 3, 5] },
    "Xe" => ElementData { symbol: "Xe", atomic_number: 54, mass: 131.290, valences: &[] },
    "Cs" => ElementData { symbol: "Cs", atomic_number: 55, mass: 132.905, valences: &[1] },
    "Ba" => ElementData { symbol: "Ba", atomic_number: 56, mass: 137.327, valences: &[2] },
    "Ho" => ElementData { symbol: "Ho", atomic_number: 67, mass: 164.930, valences: &[] },
    "Hf" => ElementData { symbol: "Hf", atomic_number: 72, mass: 178.490, valences: &[] },
    "Pt" => ElementData { symbol: "Pt", atomic_number: 78, mass: 195.080, valences: &[] },
    "Au" => ElementData { symbol: "Au", atomic_number: 79, mass: 196.967, valences: &[] },
    "Hg" => ElementData { symbol: "Hg", atomic_number: 80, mass: 200.590, valences: &[] },
    "Tl" => ElementData { symbol: "Tl", atomic_number: 81, mass: 204.383, valences: &[] },
    "Pb" => ElementData { symbol: "Pb", atomic_number: 82, mass: 207.200, valences: &[] },
    "Bi" => ElementData { symbol: "Bi", atomic_number: 83, mass: 208.980, valences: &[3, 5] },
};

/// Symbols that may be written without brackets.
static ORGANIC_SUBSET: Set<&'static str> = phf_set! {
    "B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I",
};

/// Lowercase (aromatic) symbols mapped to their element symbol.
static AROMATIC_SYMBOLS: Map<&'static str, &'static str> = phf_map! {
    "b" => "B", "c" => "C", "n" => "N", "o" => "O", "p" => "P", "s" => "S",
    "se" => "Se", "te" => "Te", "as" => "As",
};

pub fn lookup(symbol: &str) -> Option<&'static ElementData> {
    ELEMENTS.get(symbol)
}

pub fn is_organic_subset(symbol: &str) -> bool {
    ORGANIC_SUBSET.contains(symbol)
}

pub fn aromatic_element(symbol: &str) -> Option<&'static ElementData> {
    AROMATIC_SYMBOLS.get(symbol).and_then(|s| ELEMENTS.get(*s))
}

pub fn hydrogen_mass() -> f64 {
    HYDROGEN_MASS
}

impl ElementData {
    /// Valences permitted for this element carrying `charge`, using the isoelectronic rule:
    /// cations of group 15-17 elements gain a bond, anions lose one, and group 13-14 atoms
    /// lose one bond per unit of charge in either direction.
    pub fn allowed_valences(&self, charge: i8) -> Vec<u8> {
        if self.valences.is_empty() {
            return Vec::new();
        }
        if charge == 0 {
            return self.valences.to_vec();
        }
        let shift: i16 = match self.atomic_number {
            5 | 6 | 14 | 32 => -(charge.unsigned_abs() as i16),
            _ => charge as i16,
        };
        self.valences
            .iter()
            .map(|&v| v as i16 + shift)
            .filter(|&v| v >= 0)
            .map(|v| v as u8)
            .collect()
    }

}
