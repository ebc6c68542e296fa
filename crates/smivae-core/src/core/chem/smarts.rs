//! SMARTS substructure queries.
//!
//! Supports the subset of Daylight SMARTS used by the descriptor tables: atom primitives
//! (`*`, `a`, `A`, `#n`, element symbols, `H`, `D`, `X`, `v`, `R`, `r`, charge, isotope,
//! recursive `$()`), bond primitives (`-`, `=`, `#`, `:`, `~`, `@`) and the `!`, `&`, `,`,
//! `;` operators, plus branches, ring closures and dot-separated components.
//! Chirality is parsed and ignored.

use super::element;
use super::molecule::{BondOrder, Molecule};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SmartsError {
    #[error("Unexpected character '{ch}' at position {pos} in '{pattern}'")]
    UnexpectedCharacter {
        pattern: String,
        ch: char,
        pos: usize,
    },
    #[error("Unexpected end of pattern '{0}'")]
    UnexpectedEnd(String),
    #[error("Unknown element '{symbol}' in '{pattern}'")]
    UnknownElement { pattern: String, symbol: String },
    #[error("Ring closure {ring} is never closed in '{pattern}'")]
    UnclosedRing { pattern: String, ring: u32 },
    #[error("Unbalanced parentheses in '{0}'")]
    UnbalancedBranch(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr<P> {
    True,
    Primitive(P),
    Not(Box<Expr<P>>),
    And(Vec<Expr<P>>),
    Or(Vec<Expr<P>>),
}

impl<P> Expr<P> {
    fn eval(&self, test: &impl Fn(&P) -> bool) -> bool {
        match self {
            Expr::True => true,
            Expr::Primitive(p) => test(p),
            Expr::Not(inner) => !inner.eval(test),
            Expr::And(items) => items.iter().all(|e| e.eval(test)),
            Expr::Or(items) => items.iter().any(|e| e.eval(test)),
        }
    }

    fn and(mut items: Vec<Expr<P>>) -> Self {
        if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::And(items)
        }
    }

    fn or(mut items: Vec<Expr<P>>) -> Self {
        if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Or(items)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AtomPrimitive {
    /// Atomic number with an optional aromaticity constraint (`C` vs `c` vs `#6`).
    Element(u8, Option<bool>),
    Aromatic(bool),
    TotalHydrogens(usize),
    Degree(usize),
    Connectivity(usize),
    Valence(usize),
    /// `R` alone means "in any ring"; `R<n>` counts smallest-set rings.
    RingCount(Option<usize>),
    /// `r` alone means "in any ring"; `r<n>` is the smallest ring size.
    RingSize(Option<usize>),
    Charge(i8),
    Isotope(u16),
    Recursive(Box<Pattern>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BondPrimitive {
    Single,
    Double,
    Triple,
    Aromatic,
    Any,
    Ring,
}

type AtomExpr = Expr<AtomPrimitive>;
type BondExpr = Expr<BondPrimitive>;

#[derive(Debug, Clone, PartialEq)]
struct QueryBond {
    begin: usize,
    end: usize,
    /// `None` is the implicit bond: single or aromatic.
    expr: Option<BondExpr>,
}

/// A compiled SMARTS query.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    source: String,
    atoms: Vec<AtomExpr>,
    bonds: Vec<QueryBond>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, SmartsError> {
        PatternParser::new(source).run()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Whether the query occurs anywhere in the molecule.
    pub fn matches(&self, mol: &Molecule) -> bool {
        self.search(mol, &[])
    }

    /// Whether the query matches with its first atom mapped onto `atom`.
    pub fn matches_at(&self, mol: &Molecule, atom: usize) -> bool {
        self.search(mol, &[atom])
    }

    /// Whether the query matches with its leading atoms mapped onto `seed` in order.
    pub fn matches_from(&self, mol: &Molecule, seed: &[usize]) -> bool {
        self.search(mol, seed)
    }

    /// Number of molecule atoms at which a match rooted on the first query atom exists.
    pub fn count_rooted(&self, mol: &Molecule) -> usize {
        (0..mol.atoms().len())
            .filter(|&atom| self.matches_at(mol, atom))
            .count()
    }

    fn search(&self, mol: &Molecule, seed: &[usize]) -> bool {
        if self.atoms.is_empty() || seed.len() > self.atoms.len() {
            return false;
        }
        let mut mapping = vec![usize::MAX; self.atoms.len()];
        let mut used = vec![false; mol.atoms().len()];
        for (q, &t) in seed.iter().enumerate() {
            if t >= used.len() || used[t] {
                return false;
            }
            mapping[q] = t;
            used[t] = true;
            if !self.atom_fits(mol, q, &mapping) {
                return false;
            }
        }
        self.extend(mol, seed.len(), &mut mapping, &mut used)
    }

    fn extend(
        &self,
        mol: &Molecule,
        q: usize,
        mapping: &mut Vec<usize>,
        used: &mut Vec<bool>,
    ) -> bool {
        if q == self.atoms.len() {
            return true;
        }
        let anchor = self
            .bonds
            .iter()
            .find(|b| b.end == q && b.begin < q)
            .map(|b| mapping[b.begin]);
        let candidates: Vec<usize> = match anchor {
            Some(parent) => mol.neighbors(parent).map(|(nbr, _)| nbr).collect(),
            None => (0..mol.atoms().len()).collect(),
        };
        for t in candidates {
            if used[t] {
                continue;
            }
            mapping[q] = t;
            used[t] = true;
            if self.atom_fits(mol, q, mapping) && self.extend(mol, q + 1, mapping, used) {
                return true;
            }
            used[t] = false;
            mapping[q] = usize::MAX;
        }
        false
    }

    /// Checks query atom `q` against its mapped target and every bond back to
    /// already-mapped query atoms.
    fn atom_fits(&self, mol: &Molecule, q: usize, mapping: &[usize]) -> bool {
        let target = mapping[q];
        if !self.atoms[q].eval(&|p| atom_primitive_holds(p, mol, target)) {
            return false;
        }
        self.bonds
            .iter()
            .filter(|b| (b.end == q && b.begin < q) || (b.begin == q && b.end < q))
            .all(|b| {
                let other = mapping[if b.end == q { b.begin } else { b.end }];
                let Some((_, bond)) = mol.neighbors(target).find(|(nbr, _)| *nbr == other) else {
                    return false;
                };
                match &b.expr {
                    None => matches!(bond.order, BondOrder::Single | BondOrder::Aromatic),
                    Some(expr) => expr.eval(&|p| bond_primitive_holds(*p, bond)),
                }
            })
    }
}

fn atom_primitive_holds(primitive: &AtomPrimitive, mol: &Molecule, idx: usize) -> bool {
    let atom = mol.atom(idx);
    match primitive {
        AtomPrimitive::Element(z, aromatic) => {
            atom.element.atomic_number == *z && aromatic.is_none_or(|a| a == atom.aromatic)
        }
        AtomPrimitive::Aromatic(a) => atom.aromatic == *a,
        AtomPrimitive::TotalHydrogens(n) => mol.hydrogen_count(idx) == *n,
        AtomPrimitive::Degree(n) => mol.degree(idx) == *n,
        AtomPrimitive::Connectivity(n) => mol.degree(idx) + mol.hydrogen_count(idx) == *n,
        AtomPrimitive::Valence(n) => mol.total_valence(idx) == *n,
        AtomPrimitive::RingCount(None) | AtomPrimitive::RingSize(None) => mol.is_ring_atom(idx),
        AtomPrimitive::RingCount(Some(n)) => mol.ring_membership(idx) == *n,
        AtomPrimitive::RingSize(Some(n)) => mol.smallest_ring_size(idx) == Some(*n),
        AtomPrimitive::Charge(c) => atom.charge == *c,
        AtomPrimitive::Isotope(m) => atom.isotope == Some(*m),
        AtomPrimitive::Recursive(pattern) => pattern.matches_at(mol, idx),
    }
}

fn bond_primitive_holds(primitive: BondPrimitive, bond: &super::molecule::Bond) -> bool {
    match primitive {
        BondPrimitive::Single => bond.order == BondOrder::Single,
        BondPrimitive::Double => bond.order == BondOrder::Double,
        BondPrimitive::Triple => bond.order == BondOrder::Triple,
        BondPrimitive::Aromatic => bond.order == BondOrder::Aromatic,
        BondPrimitive::Any => true,
        BondPrimitive::Ring => bond.in_ring,
    }
}

struct PatternParser<'a> {
    source: &'a str,
    chars: Peekable<Chars<'a>>,
    pos: usize,
    atoms: Vec<AtomExpr>,
    bonds: Vec<QueryBond>,
    prev: Option<usize>,
    pending_bond: Option<BondExpr>,
    branches: Vec<usize>,
    rings: Vec<(u32, usize, Option<BondExpr>)>,
}

impl<'a> PatternParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            pos: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            prev: None,
            pending_bond: None,
            branches: Vec::new(),
            rings: Vec::new(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn unexpected(&self, ch: char, pos: usize) -> SmartsError {
        SmartsError::UnexpectedCharacter {
            pattern: self.source.to_string(),
            ch,
            pos,
        }
    }

    fn end(&self) -> SmartsError {
        SmartsError::UnexpectedEnd(self.source.to_string())
    }

    fn run(mut self) -> Result<Pattern, SmartsError> {
        while let Some(ch) = self.peek() {
            let pos = self.pos;
            match ch {
                '-' | '=' | '#' | ':' | '~' | '@' | '!' | '/' | '\\' => {
                    if self.pending_bond.is_some() {
                        return Err(self.unexpected(ch, pos));
                    }
                    self.pending_bond = Some(self.bond_expr()?);
                }
                '(' => {
                    self.bump();
                    let prev = self.prev.ok_or_else(|| self.unexpected(ch, pos))?;
                    self.branches.push(prev);
                }
                ')' => {
                    self.bump();
                    let saved = self
                        .branches
                        .pop()
                        .ok_or_else(|| SmartsError::UnbalancedBranch(self.source.to_string()))?;
                    self.prev = Some(saved);
                }
                '.' => {
                    self.bump();
                    self.prev = None;
                }
                '0'..='9' | '%' => {
                    let number = self.ring_number()?;
                    self.ring_closure(number, pos)?;
                }
                '[' => {
                    self.bump();
                    let expr = self.bracket_expr()?;
                    match self.bump() {
                        Some(']') => {}
                        Some(c) => return Err(self.unexpected(c, self.pos - 1)),
                        None => return Err(self.end()),
                    }
                    self.attach(expr);
                }
                _ => {
                    let expr = self.bare_atom(ch, pos)?;
                    self.attach(expr);
                }
            }
        }

        if !self.branches.is_empty() {
            return Err(SmartsError::UnbalancedBranch(self.source.to_string()));
        }
        if let Some((ring, _, _)) = self.rings.first() {
            return Err(SmartsError::UnclosedRing {
                pattern: self.source.to_string(),
                ring: *ring,
            });
        }
        if self.pending_bond.is_some() || self.atoms.is_empty() {
            return Err(self.end());
        }
        Ok(Pattern {
            source: self.source.to_string(),
            atoms: self.atoms,
            bonds: self.bonds,
        })
    }

    fn attach(&mut self, expr: AtomExpr) {
        let idx = self.atoms.len();
        self.atoms.push(expr);
        let bond = self.pending_bond.take();
        if let Some(prev) = self.prev {
            self.bonds.push(QueryBond {
                begin: prev,
                end: idx,
                expr: bond,
            });
        }
        self.prev = Some(idx);
    }

    fn ring_number(&mut self) -> Result<u32, SmartsError> {
        match self.bump() {
            Some('%') => {
                let mut number = 0;
                for _ in 0..2 {
                    let d = self
                        .bump()
                        .and_then(|c| c.to_digit(10))
                        .ok_or_else(|| self.end())?;
                    number = number * 10 + d;
                }
                Ok(number)
            }
            Some(c) => c.to_digit(10).ok_or_else(|| self.unexpected(c, self.pos - 1)),
            None => Err(self.end()),
        }
    }

    fn ring_closure(&mut self, number: u32, pos: usize) -> Result<(), SmartsError> {
        let current = self.prev.ok_or_else(|| self.unexpected('%', pos))?;
        let here = self.pending_bond.take();
        match self.rings.iter().position(|(n, _, _)| *n == number) {
            Some(slot) => {
                let (_, opening, opened_with) = self.rings.remove(slot);
                self.bonds.push(QueryBond {
                    begin: opening,
                    end: current,
                    expr: opened_with.or(here),
                });
            }
            None => self.rings.push((number, current, here)),
        }
        Ok(())
    }

    fn bare_atom(&mut self, ch: char, pos: usize) -> Result<AtomExpr, SmartsError> {
        self.bump();
        let element = |symbol: &str, aromatic: bool| {
            element::lookup(symbol)
                .map(|e| Expr::Primitive(AtomPrimitive::Element(e.atomic_number, Some(aromatic))))
        };
        let expr = match ch {
            '*' => Some(Expr::True),
            'a' => Some(Expr::Primitive(AtomPrimitive::Aromatic(true))),
            'A' => Some(Expr::Primitive(AtomPrimitive::Aromatic(false))),
            'C' if self.peek() == Some('l') => {
                self.bump();
                element("Cl", false)
            }
            'B' if self.peek() == Some('r') => {
                self.bump();
                element("Br", false)
            }
            'B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I' => element(&ch.to_string(), false),
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => element(&ch.to_ascii_uppercase().to_string(), true),
            _ => None,
        };
        expr.ok_or_else(|| self.unexpected(ch, pos))
    }

    fn bond_expr(&mut self) -> Result<BondExpr, SmartsError> {
        let mut low = vec![self.bond_or()?];
        while self.peek() == Some(';') {
            self.bump();
            low.push(self.bond_or()?);
        }
        Ok(Expr::and(low))
    }

    fn bond_or(&mut self) -> Result<BondExpr, SmartsError> {
        let mut items = vec![self.bond_and()?];
        while self.peek() == Some(',') {
            self.bump();
            items.push(self.bond_and()?);
        }
        Ok(Expr::or(items))
    }

    fn bond_and(&mut self) -> Result<BondExpr, SmartsError> {
        let mut items = vec![self.bond_not()?];
        loop {
            match self.peek() {
                Some('&') => {
                    self.bump();
                    items.push(self.bond_not()?);
                }
                Some('-' | '=' | '#' | ':' | '~' | '@' | '!' | '/' | '\\') => {
                    items.push(self.bond_not()?);
                }
                _ => break,
            }
        }
        Ok(Expr::and(items))
    }

    fn bond_not(&mut self) -> Result<BondExpr, SmartsError> {
        let pos = self.pos;
        let primitive = match self.bump() {
            Some('!') => return Ok(Expr::Not(Box::new(self.bond_not()?))),
            Some('-' | '/' | '\\') => BondPrimitive::Single,
            Some('=') => BondPrimitive::Double,
            Some('#') => BondPrimitive::Triple,
            Some(':') => BondPrimitive::Aromatic,
            Some('~') => BondPrimitive::Any,
            Some('@') => BondPrimitive::Ring,
            Some(c) => return Err(self.unexpected(c, pos)),
            None => return Err(self.end()),
        };
        Ok(Expr::Primitive(primitive))
    }

    fn bracket_expr(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut low = vec![self.atom_or()?];
        while self.peek() == Some(';') {
            self.bump();
            low.push(self.atom_or()?);
        }
        Ok(Expr::and(low))
    }

    fn atom_or(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut items = vec![self.atom_and()?];
        while self.peek() == Some(',') {
            self.bump();
            items.push(self.atom_and()?);
        }
        Ok(Expr::or(items))
    }

    fn atom_and(&mut self) -> Result<AtomExpr, SmartsError> {
        let mut items = vec![self.atom_not()?];
        loop {
            match self.peek() {
                Some('&') => {
                    self.bump();
                    items.push(self.atom_not()?);
                }
                Some(';' | ',' | ']' | ')') | None => break,
                Some(_) => items.push(self.atom_not()?),
            }
        }
        Ok(Expr::and(items))
    }

    fn atom_not(&mut self) -> Result<AtomExpr, SmartsError> {
        if self.peek() == Some('!') {
            self.bump();
            return Ok(Expr::Not(Box::new(self.atom_not()?)));
        }
        self.atom_primitive()
    }

    fn number(&mut self) -> Option<usize> {
        let mut value: Option<usize> = None;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            self.bump();
            value = Some(value.unwrap_or(0) * 10 + d as usize);
        }
        value
    }

    fn atom_primitive(&mut self) -> Result<AtomExpr, SmartsError> {
        let pos = self.pos;
        let Some(ch) = self.peek() else {
            return Err(self.end());
        };
        let first_in_bracket = self.source.get(..pos).is_some_and(|s| s.ends_with('['));

        if ch.is_ascii_digit() {
            let mass = self.number().unwrap_or(0);
            return Ok(Expr::Primitive(AtomPrimitive::Isotope(mass as u16)));
        }
        self.bump();

        let primitive = match ch {
            '*' => return Ok(Expr::True),
            '$' => return self.recursive(pos),
            '@' => {
                while matches!(self.peek(), Some('@')) {
                    self.bump();
                }
                return Ok(Expr::True);
            }
            '#' => {
                let z = self.number().ok_or_else(|| self.end())?;
                AtomPrimitive::Element(z as u8, None)
            }
            '+' | '-' => {
                let sign: i8 = if ch == '+' { 1 } else { -1 };
                let magnitude = match self.number() {
                    Some(n) => n as i8,
                    None => {
                        let mut n = 1i8;
                        while self.peek() == Some(ch) {
                            self.bump();
                            n += 1;
                        }
                        n
                    }
                };
                AtomPrimitive::Charge(sign * magnitude)
            }
            c if c.is_ascii_uppercase() => {
                if let Some(next) = self.peek().filter(char::is_ascii_lowercase) {
                    let candidate = format!("{c}{next}");
                    if let Some(e) = element::lookup(&candidate) {
                        self.bump();
                        return Ok(Expr::Primitive(AtomPrimitive::Element(
                            e.atomic_number,
                            Some(false),
                        )));
                    }
                }
                match c {
                    'H' if first_in_bracket
                        && matches!(self.peek(), Some(']' | '+' | '-')) =>
                    {
                        AtomPrimitive::Element(1, Some(false))
                    }
                    'H' => AtomPrimitive::TotalHydrogens(self.number().unwrap_or(1)),
                    'D' => AtomPrimitive::Degree(self.number().unwrap_or(1)),
                    'X' => AtomPrimitive::Connectivity(self.number().unwrap_or(1)),
                    'R' => AtomPrimitive::RingCount(self.number()),
                    'A' => AtomPrimitive::Aromatic(false),
                    _ => {
                        let symbol = c.to_string();
                        let e = element::lookup(&symbol).ok_or_else(|| {
                            SmartsError::UnknownElement {
                                pattern: self.source.to_string(),
                                symbol,
                            }
                        })?;
                        AtomPrimitive::Element(e.atomic_number, Some(false))
                    }
                }
            }
            c if c.is_ascii_lowercase() => {
                if let Some(next) = self.peek().filter(char::is_ascii_lowercase) {
                    let candidate = format!("{c}{next}");
                    if let Some(e) = element::aromatic_element(&candidate) {
                        self.bump();
                        return Ok(Expr::Primitive(AtomPrimitive::Element(
                            e.atomic_number,
                            Some(true),
                        )));
                    }
                }
                match c {
                    'a' => AtomPrimitive::Aromatic(true),
                    'v' => AtomPrimitive::Valence(self.number().unwrap_or(1)),
                    'r' => AtomPrimitive::RingSize(self.number()),
                    _ => {
                        let e = element::aromatic_element(&c.to_string())
                            .ok_or_else(|| self.unexpected(c, pos))?;
                        AtomPrimitive::Element(e.atomic_number, Some(true))
                    }
                }
            }
            c => return Err(self.unexpected(c, pos)),
        };
        Ok(Expr::Primitive(primitive))
    }

    fn recursive(&mut self, pos: usize) -> Result<AtomExpr, SmartsError> {
        if self.bump() != Some('(') {
            return Err(self.unexpected('$', pos));
        }
        let start = self.pos;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some('(') => depth += 1,
                Some(')') => depth -= 1,
                Some(_) => {}
                None => return Err(SmartsError::UnbalancedBranch(self.source.to_string())),
            }
        }
        let inner = self
            .source
            .get(start..self.pos - 1)
            .ok_or_else(|| self.end())?;
        let pattern = Pattern::parse(inner)?;
        Ok(Expr::Primitive(AtomPrimitive::Recursive(Box::new(pattern))))
    }
}
