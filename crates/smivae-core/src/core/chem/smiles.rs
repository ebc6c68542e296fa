//! SMILES reader.
//!
//! Parses the full SMILES grammar into a [`Molecule`] and sanitizes it (ring perception,
//! Kekulé assignment, valence check, aromaticity). Any string that fails here is reported
//! as an invalid molecule by the generation workflow. Wildcard `*` atoms are accepted and
//! pentavalent nitro groups are rewritten to their charge-separated form.

use super::element::{self, ElementData};
use super::molecule::{Atom, BondOrder, Molecule, MoleculeBuilder, SanitizeError};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SmilesError {
    #[error("Empty SMILES string")]
    Empty,
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedCharacter { ch: char, pos: usize },
    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),
    #[error("Unterminated bracket atom starting at position {0}")]
    UnterminatedBracket(usize),
    #[error("Bond symbol at position {0} is not between two atoms")]
    DanglingBond(usize),
    #[error("Branch at position {0} has no preceding atom")]
    BranchWithoutAtom(usize),
    #[error("Empty branch at position {0}")]
    EmptyBranch(usize),
    #[error("Unmatched ')' at position {0}")]
    UnmatchedBranchClose(usize),
    #[error("{0} branch(es) left open")]
    UnclosedBranch(usize),
    #[error("Ring closure {0} at position {1} has no preceding atom")]
    RingWithoutAtom(u32, usize),
    #[error("Ring closure {0} uses conflicting bond orders")]
    ConflictingRingBond(u32),
    #[error("Ring closure(s) {0:?} never closed")]
    UnclosedRing(Vec<u32>),
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
}

/// Parses and sanitizes a SMILES string. Parsing stops at the first whitespace character;
/// anything after it is treated as a name and ignored.
pub fn parse(smiles: &str) -> Result<Molecule, SmilesError> {
    let body = smiles.trim_start();
    let body = body
        .split(char::is_whitespace)
        .next()
        .unwrap_or_default();
    if body.is_empty() {
        return Err(SmilesError::Empty);
    }
    Parser::new(body).run()?.build().map_err(SmilesError::from)
}

/// Returns `true` when the string parses into a sanitized molecule.
pub fn is_valid(smiles: &str) -> bool {
    parse(smiles).is_ok()
}

struct RingOpening {
    atom: usize,
    order: Option<BondOrder>,
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    pos: usize,
    builder: MoleculeBuilder,
    prev: Option<usize>,
    pending_bond: Option<(BondOrder, usize)>,
    /// Saved `prev` atom and the atom count at the time each branch was opened.
    branches: Vec<(usize, usize, usize)>,
    rings: HashMap<u32, RingOpening>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            pos: 0,
            builder: MoleculeBuilder::new(),
            prev: None,
            pending_bond: None,
            branches: Vec::new(),
            rings: HashMap::new(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn run(mut self) -> Result<MoleculeBuilder, SmilesError> {
        while let Some(&ch) = self.chars.peek() {
            let pos = self.pos;
            match ch {
                '-' | '=' | '#' | ':' | '/' | '\\' => {
                    self.bump();
                    if self.pending_bond.is_some() {
                        return Err(SmilesError::UnexpectedCharacter { ch, pos });
                    }
                    let order = match ch {
                        '=' => BondOrder::Double,
                        '#' => BondOrder::Triple,
                        ':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    };
                    self.pending_bond = Some((order, pos));
                }
                '(' => {
                    self.bump();
                    let Some(prev) = self.prev else {
                        return Err(SmilesError::BranchWithoutAtom(pos));
                    };
                    if let Some((_, bond_pos)) = self.pending_bond {
                        return Err(SmilesError::DanglingBond(bond_pos));
                    }
                    self.branches.push((prev, self.builder.atom_count(), pos));
                }
                ')' => {
                    self.bump();
                    let (saved, atoms_at_open, open_pos) = self
                        .branches
                        .pop()
                        .ok_or(SmilesError::UnmatchedBranchClose(pos))?;
                    if let Some((_, bond_pos)) = self.pending_bond {
                        return Err(SmilesError::DanglingBond(bond_pos));
                    }
                    if self.builder.atom_count() == atoms_at_open {
                        return Err(SmilesError::EmptyBranch(open_pos));
                    }
                    self.prev = Some(saved);
                }
                '.' => {
                    self.bump();
                    if let Some((_, bond_pos)) = self.pending_bond {
                        return Err(SmilesError::DanglingBond(bond_pos));
                    }
                    self.prev = None;
                }
                '0'..='9' => {
                    self.bump();
                    let digit = ch.to_digit(10).unwrap_or_default();
                    self.ring_closure(digit, pos)?;
                }
                '%' => {
                    self.bump();
                    let number = self.two_digit_ring_number(pos)?;
                    self.ring_closure(number, pos)?;
                }
                '[' => {
                    let atom = self.bracket_atom()?;
                    self.attach_atom(atom)?;
                }
                _ => {
                    let atom = self.organic_atom(ch, pos)?;
                    self.attach_atom(atom)?;
                }
            }
        }

        if let Some((_, bond_pos)) = self.pending_bond {
            return Err(SmilesError::DanglingBond(bond_pos));
        }
        if !self.branches.is_empty() {
            return Err(SmilesError::UnclosedBranch(self.branches.len()));
        }
        if !self.rings.is_empty() {
            let mut open: Vec<u32> = self.rings.keys().copied().collect();
            open.sort_unstable();
            return Err(SmilesError::UnclosedRing(open));
        }
        if self.builder.atom_count() == 0 {
            return Err(SmilesError::Empty);
        }
        Ok(self.builder)
    }

    fn attach_atom(&mut self, atom: Atom) -> Result<(), SmilesError> {
        let aromatic = atom.aromatic;
        let idx = self.builder.add_atom(atom);
        match (self.prev, self.pending_bond.take()) {
            (Some(prev), explicit) => {
                let order = explicit
                    .map(|(o, _)| o)
                    .unwrap_or_else(|| implicit_order(self.builder.atom(prev).aromatic, aromatic));
                self.builder.add_bond(prev, idx, order)?;
            }
            (None, Some((_, bond_pos))) => return Err(SmilesError::DanglingBond(bond_pos)),
            (None, None) => {}
        }
        self.prev = Some(idx);
        Ok(())
    }

    fn ring_closure(&mut self, number: u32, pos: usize) -> Result<(), SmilesError> {
        let Some(current) = self.prev else {
            return Err(SmilesError::RingWithoutAtom(number, pos));
        };
        let here = self.pending_bond.take().map(|(o, _)| o);

        match self.rings.remove(&number) {
            Some(opening) => {
                let order = match (opening.order, here) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(SmilesError::ConflictingRingBond(number));
                    }
                    (Some(o), _) | (None, Some(o)) => o,
                    (None, None) => implicit_order(
                        self.builder.atom(opening.atom).aromatic,
                        self.builder.atom(current).aromatic,
                    ),
                };
                self.builder.add_bond(opening.atom, current, order)?;
            }
            None => {
                self.rings.insert(
                    number,
                    RingOpening {
                        atom: current,
                        order: here,
                    },
                );
            }
        }
        Ok(())
    }

    fn two_digit_ring_number(&mut self, pos: usize) -> Result<u32, SmilesError> {
        let mut number = 0;
        for _ in 0..2 {
            let ch_pos = self.pos;
            match self.bump() {
                Some(c) if c.is_ascii_digit() => number = number * 10 + c.to_digit(10).unwrap_or(0),
                Some(c) => return Err(SmilesError::UnexpectedCharacter { ch: c, pos: ch_pos }),
                None => return Err(SmilesError::UnexpectedCharacter { ch: '%', pos }),
            }
        }
        Ok(number)
    }

    fn organic_atom(&mut self, ch: char, pos: usize) -> Result<Atom, SmilesError> {
        self.bump();
        if ch == '*' {
            return Ok(Atom::new(known("*")?));
        }
        let two_letter = match (ch, self.chars.peek()) {
            ('C', Some('l')) => Some("Cl"),
            ('B', Some('r')) => Some("Br"),
            _ => None,
        };
        if let Some(symbol) = two_letter {
            self.bump();
            return Ok(Atom::new(known(symbol)?));
        }

        let mut buf = [0u8; 4];
        let symbol: &str = ch.encode_utf8(&mut buf);
        if element::is_organic_subset(symbol) {
            return Ok(Atom::new(known(symbol)?));
        }
        if let Some(data) = aromatic_organic(symbol) {
            let mut atom = Atom::new(data);
            atom.aromatic = true;
            return Ok(atom);
        }
        Err(SmilesError::UnexpectedCharacter { ch, pos })
    }

    fn bracket_atom(&mut self) -> Result<Atom, SmilesError> {
        let start = self.pos;
        self.bump();

        let mut isotope: Option<u16> = None;
        while let Some(d) = self.chars.peek().and_then(|c| c.to_digit(10)) {
            self.bump();
            isotope = Some(isotope.unwrap_or(0).saturating_mul(10).saturating_add(d as u16));
        }

        let mut atom = self.bracket_symbol(start)?;
        atom.isotope = isotope;

        // Chirality: @, @@, @TH1, @AL2, @SP3, @TB10, @OH25 ...
        if self.chars.peek() == Some(&'@') {
            self.bump();
            if self.chars.peek() == Some(&'@') {
                self.bump();
            }
            while self
                .chars
                .peek()
                .is_some_and(|c| c.is_ascii_uppercase() && *c != 'H')
            {
                self.bump();
            }
            while self.chars.peek().is_some_and(char::is_ascii_digit) {
                self.bump();
            }
        }

        let mut h_count = 0u8;
        if self.chars.peek() == Some(&'H') {
            self.bump();
            h_count = 1;
            if let Some(d) = self.chars.peek().and_then(|c| c.to_digit(10)) {
                self.bump();
                h_count = d as u8;
            }
        }
        atom.bracket_h = Some(h_count);

        atom.charge = self.bracket_charge()?;

        if self.chars.peek() == Some(&':') {
            self.bump();
            while self.chars.peek().is_some_and(char::is_ascii_digit) {
                self.bump();
            }
        }

        match self.bump() {
            Some(']') => Ok(atom),
            Some(c) => Err(SmilesError::UnexpectedCharacter {
                ch: c,
                pos: self.pos - 1,
            }),
            None => Err(SmilesError::UnterminatedBracket(start)),
        }
    }

    fn bracket_symbol(&mut self, start: usize) -> Result<Atom, SmilesError> {
        let Some(first) = self.bump() else {
            return Err(SmilesError::UnterminatedBracket(start));
        };

        if first == '*' {
            return Ok(Atom::new(known("*")?));
        }

        if first.is_ascii_lowercase() {
            let mut symbol = first.to_string();
            if let Some(&next) = self.chars.peek() {
                let candidate = format!("{first}{next}");
                if element::aromatic_element(&candidate).is_some() {
                    self.bump();
                    symbol = candidate;
                }
            }
            let data = element::aromatic_element(&symbol)
                .ok_or_else(|| SmilesError::UnknownElement(symbol.clone()))?;
            let mut atom = Atom::new(data);
            atom.aromatic = true;
            return Ok(atom);
        }

        if !first.is_ascii_uppercase() {
            return Err(SmilesError::UnexpectedCharacter {
                ch: first,
                pos: self.pos - 1,
            });
        }

        if let Some(&next) = self.chars.peek() {
            if next.is_ascii_lowercase() {
                let candidate = format!("{first}{next}");
                if let Some(data) = element::lookup(&candidate) {
                    self.bump();
                    return Ok(Atom::new(data));
                }
            }
        }
        let symbol = first.to_string();
        Ok(Atom::new(known(&symbol)?))
    }

    fn bracket_charge(&mut self) -> Result<i8, SmilesError> {
        let sign: i8 = match self.chars.peek() {
            Some('+') => 1,
            Some('-') => -1,
            _ => return Ok(0),
        };
        let sign_char = if sign > 0 { '+' } else { '-' };
        self.bump();

        if let Some(d) = self.chars.peek().and_then(|c| c.to_digit(10)) {
            self.bump();
            let mut magnitude = d as i8;
            if let Some(d2) = self.chars.peek().and_then(|c| c.to_digit(10)) {
                self.bump();
                magnitude = magnitude.saturating_mul(10).saturating_add(d2 as i8);
            }
            return Ok(sign * magnitude);
        }

        let mut magnitude = 1i8;
        while self.chars.peek() == Some(&sign_char) {
            self.bump();
            magnitude = magnitude.saturating_add(1);
        }
        Ok(sign * magnitude)
    }
}

fn known(symbol: &str) -> Result<&'static ElementData, SmilesError> {
    element::lookup(symbol).ok_or_else(|| SmilesError::UnknownElement(symbol.to_string()))
}

fn aromatic_organic(symbol: &str) -> Option<&'static ElementData> {
    match symbol {
        "b" | "c" | "n" | "o" | "p" | "s" => element::aromatic_element(symbol),
        _ => None,
    }
}

#[inline]
fn implicit_order(prev_aromatic: bool, next_aromatic: bool) -> BondOrder {
    if prev_aromatic && next_aromatic {
        BondOrder::Aromatic
    } else {
        BondOrder::Single
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_chain_with_implicit_hydrogens() {
        let mol = parse("CCO").unwrap();
        assert_eq!(mol.atoms().len(), 3);
        assert_eq!(mol.hydrogen_count(0), 3);
        assert_eq!(mol.hydrogen_count(1), 2);
        assert_eq!(mol.hydrogen_count(2), 1);
    }

    #[test]
    fn parses_branches_and_double_bonds() {
        let mol = parse("CC(=O)O").unwrap();
        assert_eq!(mol.atoms().len(), 4);
        let double = mol
            .bonds()
            .iter()
            .find(|b| b.order == BondOrder::Double)
            .unwrap();
        assert_eq!((double.begin, double.end), (1, 2));
        assert_eq!(mol.hydrogen_count(1), 0);
    }

    #[test]
    fn parses_aromatic_rings() {
        let mol = parse("c1ccccc1").unwrap();
        assert_eq!(mol.rings().len(), 1);
        assert!(mol.atoms().iter().all(|a| a.aromatic));
    }

    #[test]
    fn parses_pyrrole_only_with_explicit_nh() {
        assert!(parse("c1cc[nH]c1").is_ok());
        assert!(matches!(
            parse("c1ccnc1"),
            Err(SmilesError::Sanitize(SanitizeError::Kekulization(_)))
        ));
    }

    #[test]
    fn parses_bracket_atoms_with_charge_and_isotope() {
        let mol = parse("[13CH3][N+](C)(C)C").unwrap();
        assert_eq!(mol.atom(0).isotope, Some(13));
        assert_eq!(mol.atom(0).bracket_h, Some(3));
        assert_eq!(mol.atom(1).charge, 1);
        assert_eq!(parse("[O-]C").unwrap().atom(0).charge, -1);
        assert_eq!(parse("[Fe++]").unwrap().atom(0).charge, 2);
        assert_eq!(parse("[Fe+3]").unwrap().atom(0).charge, 3);
    }

    #[test]
    fn parses_two_letter_organic_and_two_digit_rings() {
        let mol = parse("ClC%10CCC%10Br").unwrap();
        assert_eq!(mol.atom(0).symbol(), "Cl");
        assert_eq!(mol.atom(5).symbol(), "Br");
        assert_eq!(mol.rings().len(), 1);
    }

    #[test]
    fn accepts_stereo_and_disconnected_components() {
        assert!(parse("F/C=C/F").is_ok());
        assert!(parse("C[C@@H](N)C(=O)O").is_ok());
        assert!(parse("[Na+].[Cl-]").is_ok());
    }

    #[test]
    fn ignores_text_after_whitespace() {
        assert!(parse("CCO ethanol").is_ok());
        assert_eq!(parse("   ").unwrap_err(), SmilesError::Empty);
    }

    #[test]
    fn rejects_syntax_errors() {
        assert_eq!(parse("").unwrap_err(), SmilesError::Empty);
        assert!(matches!(parse("C1CC"), Err(SmilesError::UnclosedRing(r)) if r == vec![1]));
        assert!(matches!(parse("C(C"), Err(SmilesError::UnclosedBranch(1))));
        assert!(matches!(parse("CC)"), Err(SmilesError::UnmatchedBranchClose(2))));
        assert!(matches!(parse("C()C"), Err(SmilesError::EmptyBranch(1))));
        assert!(matches!(parse("=C"), Err(SmilesError::DanglingBond(0))));
        assert!(matches!(parse("CC="), Err(SmilesError::DanglingBond(2))));
        assert!(matches!(parse("C[Xx]"), Err(SmilesError::UnknownElement(_))));
        assert!(matches!(parse("C[CH4"), Err(SmilesError::UnterminatedBracket(1))));
        assert!(matches!(
            parse("CQ"),
            Err(SmilesError::UnexpectedCharacter { ch: 'Q', pos: 1 })
        ));
    }

    #[test]
    fn rejects_conflicting_ring_bonds() {
        assert_eq!(
            parse("C=1CCC#1").unwrap_err(),
            SmilesError::ConflictingRingBond(1)
        );
        assert!(parse("C=1CCC=1").is_ok());
    }

    #[test]
    fn rejects_chemically_impossible_structures() {
        assert!(matches!(
            parse("C(C)(C)(C)(C)C"),
            Err(SmilesError::Sanitize(SanitizeError::Valence { .. }))
        ));
        assert!(matches!(
            parse("O=O=O"),
            Err(SmilesError::Sanitize(SanitizeError::Valence { .. }))
        ));
        assert!(matches!(
            parse("cc"),
            Err(SmilesError::Sanitize(SanitizeError::AromaticOutsideRing(0)))
        ));
        assert!(matches!(
            parse("C11"),
            Err(SmilesError::Sanitize(SanitizeError::SelfBond(0)))
        ));
    }

    #[test]
    fn pentavalent_nitro_is_charge_separated() {
        let mol = parse("CN(=O)=O").unwrap();
        assert_eq!(mol.atom(1).charge, 1);
        let oxygen_charges: Vec<i8> = [2, 3].iter().map(|&i| mol.atom(i).charge).collect();
        assert!(oxygen_charges.contains(&-1) && oxygen_charges.contains(&0));
        assert_eq!(
            mol.bonds()
                .iter()
                .filter(|b| b.order == BondOrder::Double)
                .count(),
            1
        );
        assert!(is_valid("O=N(=O)c1ccccc1"));
    }

    #[test]
    fn wildcard_atoms_are_accepted() {
        let mol = parse("*CC(=O)O").unwrap();
        assert_eq!(mol.atom(0).symbol(), "*");
        assert_eq!(mol.hydrogen_count(0), 0);
        assert!(is_valid("[*]c1ccccc1"));
        assert!(is_valid("*1CC1"));
    }

    #[test]
    fn kekule_and_aromatic_spellings_agree_on_aromaticity() {
        let kekule = parse("C1=CC=CC=C1").unwrap();
        assert!(kekule.atoms().iter().all(|a| a.aromatic));
        let pyridone = parse("O=c1cccc[nH]1").unwrap();
        assert!(pyridone.rings().iter().all(|r| pyridone.is_aromatic_ring(r)));
        let cyclopentadiene = parse("C1=CCC=C1").unwrap();
        assert!(cyclopentadiene.atoms().iter().all(|a| !a.aromatic));
    }

    #[test]
    fn explicit_hydrogen_atoms_fold_into_parents() {
        let mol = parse("[H]OC([H])([H])[H]").unwrap();
        assert_eq!(mol.atoms().len(), 2);
        assert_eq!(mol.hydrogen_count(0), 1);
        assert_eq!(mol.hydrogen_count(1), 3);
        assert_eq!(parse("[2H]C").unwrap().atoms().len(), 2);
    }

    #[test]
    fn validity_is_deterministic() {
        for s in ["CCO", "c1ccccc1", "C1CC", "((", "CC(C)(C)(C)(C)"] {
            assert_eq!(is_valid(s), is_valid(s));
        }
        assert!(is_valid("CC(=O)Nc1ccc(O)cc1"));
        assert!(!is_valid("CC(C)(C)(C)(C)"));
    }
}
