use super::element::ElementData;
use std::collections::VecDeque;
use thiserror::Error;

/// Upper bound on backtracking steps when assigning Kekulé double bonds.
const KEKULIZE_STEP_LIMIT: usize = 200_000;

/// Fused ring systems with more candidate rings than this are only tested ring by ring
/// and in fused pairs.
const MAX_FUSED_SUBSET_RINGS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Bond order counted against valence before Kekulé assignment.
    pub fn nominal(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: &'static ElementData,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Hydrogen count written inside a bracket atom. `None` for organic-subset atoms.
    pub bracket_h: Option<u8>,
    /// Hydrogens inferred from the default valence of organic-subset atoms.
    pub implicit_h: u8,
    /// Plain `[H]` graph atoms folded into this atom during sanitization.
    pub explicit_h: u8,
}

impl Atom {
    pub fn new(element: &'static ElementData) -> Self {
        Self {
            element,
            aromatic: false,
            charge: 0,
            isotope: None,
            bracket_h: None,
            implicit_h: 0,
            explicit_h: 0,
        }
    }

    pub fn is_bracket(&self) -> bool {
        self.bracket_h.is_some()
    }

    /// Hydrogens attached to this atom that are not represented as explicit graph atoms.
    pub fn attached_h(&self) -> u8 {
        self.bracket_h.unwrap_or(self.implicit_h) + self.explicit_h
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element.atomic_number == 1
    }

    pub fn symbol(&self) -> &'static str {
        self.element.symbol
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub begin: usize,
    pub end: usize,
    pub order: BondOrder,
    /// Integer order after Kekulé assignment (aromatic bonds become 1 or 2).
    pub kekule_order: u8,
    pub in_ring: bool,
}

impl Bond {
    pub fn other(&self, atom: usize) -> usize {
        if self.begin == atom {
            self.end
        } else {
            self.begin
        }
    }

    pub fn is_aromatic(&self) -> bool {
        self.order == BondOrder::Aromatic
    }
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SanitizeError {
    #[error("Atom {0} is bonded to itself")]
    SelfBond(usize),
    #[error("Atoms {0} and {1} are bonded more than once")]
    DuplicateBond(usize, usize),
    #[error("Non-ring atom {0} is marked aromatic")]
    AromaticOutsideRing(usize),
    #[error("Cannot assign a Kekulé structure to the aromatic system containing atom {0}")]
    Kekulization(usize),
    #[error("Explicit valence {valence} of atom {atom} ({symbol}) exceeds the permitted maximum")]
    Valence {
        atom: usize,
        symbol: &'static str,
        valence: u8,
    },
}

/// Incremental construction of a molecule graph. `build` folds plain hydrogen atoms into
/// their parents, perceives rings, assigns Kekulé bond orders, infers implicit hydrogens
/// and finally perceives aromaticity, rejecting chemically impossible graphs.
#[derive(Debug, Default)]
pub struct MoleculeBuilder {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl MoleculeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn add_bond(
        &mut self,
        begin: usize,
        end: usize,
        order: BondOrder,
    ) -> Result<usize, SanitizeError> {
        if begin == end {
            return Err(SanitizeError::SelfBond(begin));
        }
        if self
            .bonds
            .iter()
            .any(|b| (b.begin == begin && b.end == end) || (b.begin == end && b.end == begin))
        {
            return Err(SanitizeError::DuplicateBond(begin.min(end), begin.max(end)));
        }
        self.bonds.push(Bond {
            begin,
            end,
            order,
            kekule_order: order.nominal(),
            in_ring: false,
        });
        Ok(self.bonds.len() - 1)
    }

    pub fn build(mut self) -> Result<Molecule, SanitizeError> {
        self.fold_hydrogens();
        self.separate_nitro_charges();

        let mut adjacency = vec![Vec::new(); self.atoms.len()];
        for (bond_idx, bond) in self.bonds.iter().enumerate() {
            adjacency[bond.begin].push((bond.end, bond_idx));
            adjacency[bond.end].push((bond.begin, bond_idx));
        }

        let mut molecule = Molecule {
            atoms: self.atoms,
            bonds: self.bonds,
            adjacency,
            rings: Vec::new(),
        };

        molecule.mark_ring_bonds();
        molecule.rings = molecule.find_sssr();

        for (idx, atom) in molecule.atoms.iter().enumerate() {
            if atom.aromatic && !molecule.is_ring_atom(idx) {
                return Err(SanitizeError::AromaticOutsideRing(idx));
            }
        }

        molecule.kekulize()?;
        molecule.assign_hydrogens()?;
        molecule.perceive_aromaticity();
        Ok(molecule)
    }

    /// Rewrites neutral pentavalent nitrogen `N(=O)=O` as `[N+](=O)[O-]`.
    fn separate_nitro_charges(&mut self) {
        for idx in 0..self.atoms.len() {
            let atom = &self.atoms[idx];
            if atom.element.atomic_number != 7 || atom.charge != 0 || atom.aromatic {
                continue;
            }
            let hydrogens = atom.bracket_h.unwrap_or(0) + atom.explicit_h;
            let incident: Vec<usize> = (0..self.bonds.len())
                .filter(|&b| self.bonds[b].begin == idx || self.bonds[b].end == idx)
                .collect();
            let valence: u8 = incident
                .iter()
                .map(|&b| self.bonds[b].order.nominal())
                .sum::<u8>()
                + hydrogens;
            if valence != 5 {
                continue;
            }
            let terminal_oxo = incident.iter().copied().find(|&b| {
                let bond = &self.bonds[b];
                let oxygen = bond.other(idx);
                bond.order == BondOrder::Double
                    && self.atoms[oxygen].element.atomic_number == 8
                    && self.atoms[oxygen].charge == 0
                    && self
                        .bonds
                        .iter()
                        .filter(|o| o.begin == oxygen || o.end == oxygen)
                        .count()
                        == 1
            });
            if let Some(b) = terminal_oxo {
                let oxygen = self.bonds[b].other(idx);
                self.bonds[b].order = BondOrder::Single;
                self.bonds[b].kekule_order = 1;
                self.atoms[oxygen].charge = -1;
                self.atoms[idx].charge = 1;
            }
        }
    }

    /// Removes neutral, unlabelled hydrogen atoms with a single heavy neighbour and
    /// credits them to that neighbour. Isotopic, charged or bridging hydrogens stay.
    fn fold_hydrogens(&mut self) {
        let mut removable = vec![false; self.atoms.len()];
        for (idx, atom) in self.atoms.iter().enumerate() {
            if !atom.is_hydrogen()
                || atom.charge != 0
                || atom.isotope.is_some()
                || atom.bracket_h.is_some_and(|h| h > 0)
            {
                continue;
            }
            let mut bonds = self
                .bonds
                .iter()
                .filter(|b| b.begin == idx || b.end == idx);
            let (Some(bond), None) = (bonds.next(), bonds.next()) else {
                continue;
            };
            let parent = bond.other(idx);
            if bond.order == BondOrder::Single && !self.atoms[parent].is_hydrogen() {
                removable[idx] = true;
            }
        }
        if !removable.iter().any(|&r| r) {
            return;
        }

        for bond in &self.bonds {
            if removable[bond.begin] {
                self.atoms[bond.end].explicit_h += 1;
            } else if removable[bond.end] {
                self.atoms[bond.begin].explicit_h += 1;
            }
        }

        let mut remap = vec![usize::MAX; self.atoms.len()];
        let mut kept = Vec::with_capacity(self.atoms.len());
        for (idx, atom) in std::mem::take(&mut self.atoms).into_iter().enumerate() {
            if !removable[idx] {
                remap[idx] = kept.len();
                kept.push(atom);
            }
        }
        self.atoms = kept;
        self.bonds.retain(|b| !removable[b.begin] && !removable[b.end]);
        for bond in &mut self.bonds {
            bond.begin = remap[bond.begin];
            bond.end = remap[bond.end];
        }
    }
}

/// A sanitized molecular graph.
#[derive(Debug, Clone)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<(usize, usize)>>,
    rings: Vec<Vec<usize>>,
}

impl Molecule {
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn bond(&self, idx: usize) -> &Bond {
        &self.bonds[idx]
    }

    /// Smallest set of smallest rings, each as a list of atom indices in ring order.
    pub fn rings(&self) -> &[Vec<usize>] {
        &self.rings
    }

    pub fn neighbors(&self, atom: usize) -> impl Iterator<Item = (usize, &Bond)> + '_ {
        self.adjacency[atom]
            .iter()
            .map(move |&(nbr, bond_idx)| (nbr, &self.bonds[bond_idx]))
    }

    /// Number of graph neighbours, hydrogens folded into the atom excluded.
    pub fn degree(&self, atom: usize) -> usize {
        self.adjacency[atom].len()
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| !a.is_hydrogen()).count()
    }

    /// Number of non-hydrogen neighbours.
    pub fn heavy_degree(&self, atom: usize) -> usize {
        self.neighbors(atom)
            .filter(|(nbr, _)| !self.atoms[*nbr].is_hydrogen())
            .count()
    }

    /// Total hydrogens on an atom: implicit, bracket-declared and explicit `[H]` neighbours.
    pub fn hydrogen_count(&self, atom: usize) -> usize {
        let explicit = self
            .neighbors(atom)
            .filter(|(nbr, _)| self.atoms[*nbr].is_hydrogen())
            .count();
        self.atoms[atom].attached_h() as usize + explicit
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.neighbors(atom).any(|(_, bond)| bond.in_ring)
    }

    pub fn smallest_ring_size(&self, atom: usize) -> Option<usize> {
        self.rings
            .iter()
            .filter(|ring| ring.contains(&atom))
            .map(Vec::len)
            .min()
    }

    /// Number of smallest-set rings the atom belongs to.
    pub fn ring_membership(&self, atom: usize) -> usize {
        self.rings.iter().filter(|ring| ring.contains(&atom)).count()
    }

    /// Sum of Kekulé bond orders plus attached hydrogens.
    pub fn total_valence(&self, atom: usize) -> usize {
        let bonds: usize = self
            .neighbors(atom)
            .map(|(_, b)| b.kekule_order as usize)
            .sum();
        bonds + self.atoms[atom].attached_h() as usize
    }

    pub fn is_aromatic_ring(&self, ring: &[usize]) -> bool {
        ring.iter().all(|&a| self.atoms[a].aromatic)
    }

    fn ring_bond_indices(&self, ring: &[usize]) -> Vec<usize> {
        (0..ring.len())
            .filter_map(|i| {
                let (u, v) = (ring[i], ring[(i + 1) % ring.len()]);
                self.adjacency[u]
                    .iter()
                    .find(|(nbr, _)| *nbr == v)
                    .map(|&(_, b)| b)
            })
            .collect()
    }

    fn component_count(&self) -> usize {
        let mut seen = vec![false; self.atoms.len()];
        let mut components = 0;
        for start in 0..self.atoms.len() {
            if seen[start] {
                continue;
            }
            components += 1;
            let mut queue = VecDeque::from([start]);
            seen[start] = true;
            while let Some(u) = queue.pop_front() {
                for &(v, _) in &self.adjacency[u] {
                    if !seen[v] {
                        seen[v] = true;
                        queue.push_back(v);
                    }
                }
            }
        }
        components
    }

    /// Flags every bond that is not a bridge (Tarjan low-link).
    fn mark_ring_bonds(&mut self) {
        let n = self.atoms.len();
        let mut disc = vec![usize::MAX; n];
        let mut low = vec![0usize; n];
        let mut timer = 0usize;
        let mut bridges = vec![false; self.bonds.len()];

        for root in 0..n {
            if disc[root] != usize::MAX {
                continue;
            }
            // (atom, bond used to enter, next adjacency slot)
            let mut stack: Vec<(usize, usize, usize)> = vec![(root, usize::MAX, 0)];
            disc[root] = timer;
            low[root] = timer;
            timer += 1;

            while let Some(top) = stack.last_mut() {
                let (u, parent_bond) = (top.0, top.1);
                if top.2 < self.adjacency[u].len() {
                    let (v, bond_idx) = self.adjacency[u][top.2];
                    top.2 += 1;
                    if bond_idx == parent_bond {
                        continue;
                    }
                    if disc[v] == usize::MAX {
                        disc[v] = timer;
                        low[v] = timer;
                        timer += 1;
                        stack.push((v, bond_idx, 0));
                    } else {
                        low[u] = low[u].min(disc[v]);
                    }
                } else {
                    stack.pop();
                    if let Some(&(p, _, _)) = stack.last() {
                        low[p] = low[p].min(low[u]);
                        if low[u] > disc[p] {
                            bridges[parent_bond] = true;
                        }
                    }
                }
            }
        }

        for (bond, is_bridge) in self.bonds.iter_mut().zip(bridges) {
            bond.in_ring = !is_bridge;
        }
    }

    fn find_sssr(&self) -> Vec<Vec<usize>> {
        let cycle_rank =
            (self.bonds.len() + self.component_count()).saturating_sub(self.atoms.len());
        if cycle_rank == 0 {
            return Vec::new();
        }

        let words = self.bonds.len().div_ceil(64);
        let mut candidates: Vec<(Vec<usize>, Vec<u64>)> = Vec::new();
        for (bond_idx, bond) in self.bonds.iter().enumerate() {
            if !bond.in_ring {
                continue;
            }
            let Some(path) = self.shortest_path_avoiding(bond.begin, bond.end, bond_idx) else {
                continue;
            };
            let mut edges = vec![0u64; words];
            edges[bond_idx / 64] |= 1 << (bond_idx % 64);
            for pair in path.windows(2) {
                if let Some(&(_, b)) = self.adjacency[pair[0]].iter().find(|(v, _)| *v == pair[1]) {
                    edges[b / 64] |= 1 << (b % 64);
                }
            }
            if !candidates.iter().any(|(_, e)| *e == edges) {
                candidates.push((path, edges));
            }
        }
        candidates.sort_by_key(|(path, _)| path.len());

        let mut basis: Vec<(usize, Vec<u64>)> = Vec::new();
        let mut rings = Vec::new();
        for (path, edges) in candidates {
            let mut reduced = edges;
            for (pivot, vector) in &basis {
                if reduced[pivot / 64] & (1 << (pivot % 64)) != 0 {
                    for (r, v) in reduced.iter_mut().zip(vector) {
                        *r ^= v;
                    }
                }
            }
            let Some(pivot) = lowest_set_bit(&reduced) else {
                continue;
            };
            basis.push((pivot, reduced));
            rings.push(path);
            if rings.len() == cycle_rank {
                break;
            }
        }
        rings
    }

    fn shortest_path_avoiding(&self, from: usize, to: usize, banned: usize) -> Option<Vec<usize>> {
        let mut prev = vec![usize::MAX; self.atoms.len()];
        let mut queue = VecDeque::from([from]);
        prev[from] = from;
        while let Some(u) = queue.pop_front() {
            if u == to {
                break;
            }
            for &(v, bond_idx) in &self.adjacency[u] {
                if bond_idx == banned || prev[v] != usize::MAX {
                    continue;
                }
                prev[v] = u;
                queue.push_back(v);
            }
        }
        if prev[to] == usize::MAX {
            return None;
        }
        let mut path = vec![to];
        let mut cur = to;
        while cur != from {
            cur = prev[cur];
            path.push(cur);
        }
        path.reverse();
        Some(path)
    }

    /// Whether an aromatic atom must receive one double bond from its aromatic system.
    fn needs_pi_bond(&self, atom: usize) -> bool {
        let a = &self.atoms[atom];
        let Some(&base) = a.element.allowed_valences(a.charge).first() else {
            return false;
        };
        let sigma =
            self.adjacency[atom].len() + a.bracket_h.unwrap_or(0) as usize + a.explicit_h as usize;
        let exocyclic: usize = self
            .neighbors(atom)
            .filter(|(_, b)| !b.is_aromatic())
            .map(|(_, b)| b.order.nominal() as usize - 1)
            .sum();
        sigma + exocyclic < base as usize
    }

    fn kekulize(&mut self) -> Result<(), SanitizeError> {
        if !self.bonds.iter().any(Bond::is_aromatic) {
            return Ok(());
        }
        let needs: Vec<bool> = (0..self.atoms.len())
            .map(|i| self.atoms[i].aromatic && self.needs_pi_bond(i))
            .collect();

        let mut partner: Vec<Option<usize>> = vec![None; self.atoms.len()];
        let mut steps = 0usize;
        if !self.match_pi_bonds(&needs, &mut partner, &mut steps) {
            let culprit = (0..self.atoms.len())
                .find(|&i| needs[i] && partner[i].is_none())
                .or_else(|| needs.iter().position(|&n| n))
                .unwrap_or(0);
            return Err(SanitizeError::Kekulization(culprit));
        }

        for bond in self.bonds.iter_mut().filter(|b| b.is_aromatic()) {
            bond.kekule_order = 1;
        }
        for atom in 0..self.atoms.len() {
            if let Some(bond_idx) = partner[atom] {
                self.bonds[bond_idx].kekule_order = 2;
            }
        }
        Ok(())
    }

    fn match_pi_bonds(
        &self,
        needs: &[bool],
        partner: &mut Vec<Option<usize>>,
        steps: &mut usize,
    ) -> bool {
        *steps += 1;
        if *steps > KEKULIZE_STEP_LIMIT {
            return false;
        }

        // Most constrained unmatched atom first.
        let mut best: Option<(usize, Vec<(usize, usize)>)> = None;
        for atom in 0..self.atoms.len() {
            if !needs[atom] || partner[atom].is_some() {
                continue;
            }
            let opts: Vec<(usize, usize)> = self.adjacency[atom]
                .iter()
                .filter(|&&(nbr, bond_idx)| {
                    needs[nbr] && partner[nbr].is_none() && self.bonds[bond_idx].is_aromatic()
                })
                .copied()
                .collect();
            if opts.is_empty() {
                return false;
            }
            if best.as_ref().is_none_or(|(_, b)| opts.len() < b.len()) {
                best = Some((atom, opts));
            }
        }
        let Some((atom, opts)) = best else {
            return true;
        };

        for (nbr, bond_idx) in opts {
            partner[atom] = Some(bond_idx);
            partner[nbr] = Some(bond_idx);
            if self.match_pi_bonds(needs, partner, steps) {
                return true;
            }
            partner[atom] = None;
            partner[nbr] = None;
        }
        false
    }

    /// Electrons an atom donates to a cyclic π system, or `None` when it cannot take part.
    fn pi_electrons(&self, atom: usize) -> Option<usize> {
        if !self.is_ring_atom(atom) {
            return None;
        }
        let mut double_partner = None;
        for (nbr, bond) in self.neighbors(atom) {
            match bond.kekule_order {
                3 => return None,
                2 if double_partner.is_some() => return None,
                2 => double_partner = Some((nbr, bond.in_ring)),
                _ => {}
            }
        }
        if let Some((nbr, in_ring)) = double_partner {
            if in_ring {
                return Some(1);
            }
            // Exocyclic C=X donates nothing; exocyclic C=C breaks the system.
            return (self.atoms[nbr].element.atomic_number != 6).then_some(0);
        }

        let a = &self.atoms[atom];
        let connections = self.degree(atom) + a.attached_h() as usize;
        match (a.element.atomic_number, a.charge) {
            (6, -1) => Some(2),
            (6, 1) => Some(0),
            (7 | 15 | 33, 0) if connections == 3 => Some(2),
            (7 | 15 | 33, -1) if connections == 2 => Some(2),
            (8 | 16 | 34 | 52, 0) if connections == 2 => Some(2),
            (5, 0) if connections == 3 => Some(0),
            _ => None,
        }
    }

    /// Hückel aromaticity over single rings and fused ring systems. Replaces whatever
    /// aromatic flags the input carried, so Kekulé and aromatic spellings agree.
    fn perceive_aromaticity(&mut self) {
        for atom in &mut self.atoms {
            atom.aromatic = false;
        }
        for bond in &mut self.bonds {
            if bond.order == BondOrder::Aromatic {
                bond.order = if bond.kekule_order == 2 {
                    BondOrder::Double
                } else {
                    BondOrder::Single
                };
            }
        }
        if self.rings.is_empty() {
            return;
        }

        let electrons: Vec<Option<usize>> =
            (0..self.atoms.len()).map(|i| self.pi_electrons(i)).collect();
        let candidates: Vec<usize> = (0..self.rings.len())
            .filter(|&r| self.rings[r].iter().all(|&a| electrons[a].is_some()))
            .collect();
        let ring_bonds: Vec<Vec<usize>> = candidates
            .iter()
            .map(|&r| self.ring_bond_indices(&self.rings[r]))
            .collect();
        let fused = |i: usize, j: usize| ring_bonds[i].iter().any(|b| ring_bonds[j].contains(b));

        let is_huckel = |members: &[usize]| {
            let mut atoms: Vec<usize> = members
                .iter()
                .flat_map(|&m| self.rings[candidates[m]].iter().copied())
                .collect();
            atoms.sort_unstable();
            atoms.dedup();
            let total: usize = atoms.iter().filter_map(|&a| electrons[a]).sum();
            total >= 2 && total % 4 == 2
        };

        let mut aromatic = vec![false; candidates.len()];
        for i in 0..candidates.len() {
            if is_huckel(&[i]) {
                aromatic[i] = true;
            }
        }
        if candidates.len() <= MAX_FUSED_SUBSET_RINGS {
            for mask in 1u32..(1u32 << candidates.len()) {
                if mask.count_ones() < 2 {
                    continue;
                }
                let members: Vec<usize> =
                    (0..candidates.len()).filter(|&i| mask & (1 << i) != 0).collect();
                if is_fused_system(&members, &fused) && is_huckel(&members) {
                    for &m in &members {
                        aromatic[m] = true;
                    }
                }
            }
        } else {
            for i in 0..candidates.len() {
                for j in (i + 1)..candidates.len() {
                    if fused(i, j) && is_huckel(&[i, j]) {
                        aromatic[i] = true;
                        aromatic[j] = true;
                    }
                }
            }
        }

        for (slot, &is_aromatic) in aromatic.iter().enumerate() {
            if !is_aromatic {
                continue;
            }
            for &atom in &self.rings[candidates[slot]] {
                self.atoms[atom].aromatic = true;
            }
            for &bond in &ring_bonds[slot] {
                self.bonds[bond].order = BondOrder::Aromatic;
            }
        }
    }

    fn assign_hydrogens(&mut self) -> Result<(), SanitizeError> {
        for idx in 0..self.atoms.len() {
            let bond_sum: u8 = self.adjacency[idx]
                .iter()
                .map(|&(_, b)| self.bonds[b].kekule_order)
                .sum::<u8>()
                + self.atoms[idx].explicit_h;
            let (symbol, bracket_h) = (self.atoms[idx].symbol(), self.atoms[idx].bracket_h);
            let allowed = self.atoms[idx]
                .element
                .allowed_valences(self.atoms[idx].charge);

            if let Some(h) = bracket_h {
                let valence = bond_sum + h;
                if let Some(&max) = allowed.last() {
                    if valence > max {
                        return Err(SanitizeError::Valence {
                            atom: idx,
                            symbol,
                            valence,
                        });
                    }
                }
                continue;
            }

            let target = allowed.iter().copied().find(|&v| v >= bond_sum);
            match target {
                Some(v) => self.atoms[idx].implicit_h = v - bond_sum,
                None if allowed.is_empty() => self.atoms[idx].implicit_h = 0,
                None => {
                    return Err(SanitizeError::Valence {
                        atom: idx,
                        symbol,
                        valence: bond_sum,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Whether the rings in `members` form one edge-fused system.
fn is_fused_system(members: &[usize], fused: &impl Fn(usize, usize) -> bool) -> bool {
    let mut reached = vec![false; members.len()];
    let mut stack = vec![0usize];
    reached[0] = true;
    while let Some(i) = stack.pop() {
        for j in 0..members.len() {
            if !reached[j] && fused(members[i], members[j]) {
                reached[j] = true;
                stack.push(j);
            }
        }
    }
    reached.into_iter().all(|r| r)
}

fn lowest_set_bit(words: &[u64]) -> Option<usize> {
    words
        .iter()
        .enumerate()
        .find(|(_, w)| **w != 0)
        .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::element::{aromatic_element, lookup};

    fn carbon() -> Atom {
        Atom::new(lookup("C").unwrap())
    }

    fn aromatic_carbon() -> Atom {
        let mut atom = Atom::new(aromatic_element("c").unwrap());
        atom.aromatic = true;
        atom
    }

    fn ring(builder: &mut MoleculeBuilder, atoms: &[usize], order: BondOrder) {
        for i in 0..atoms.len() {
            builder
                .add_bond(atoms[i], atoms[(i + 1) % atoms.len()], order)
                .unwrap();
        }
    }

    #[test]
    fn chain_has_no_rings_and_full_hydrogens() {
        let mut b = MoleculeBuilder::new();
        let a0 = b.add_atom(carbon());
        let a1 = b.add_atom(carbon());
        b.add_bond(a0, a1, BondOrder::Single).unwrap();
        let mol = b.build().unwrap();
        assert!(mol.rings().is_empty());
        assert_eq!(mol.hydrogen_count(0), 3);
        assert!(!mol.bonds()[0].in_ring);
    }

    #[test]
    fn benzene_is_kekulized_with_three_double_bonds() {
        let mut b = MoleculeBuilder::new();
        let atoms: Vec<usize> = (0..6).map(|_| b.add_atom(aromatic_carbon())).collect();
        ring(&mut b, &atoms, BondOrder::Aromatic);
        let mol = b.build().unwrap();
        let doubles = mol.bonds().iter().filter(|b| b.kekule_order == 2).count();
        assert_eq!(doubles, 3);
        assert_eq!(mol.rings().len(), 1);
        assert!(mol.is_aromatic_ring(&mol.rings()[0]));
        assert!((0..6).all(|i| mol.hydrogen_count(i) == 1));
    }

    #[test]
    fn five_membered_all_carbon_aromatic_ring_fails_kekulization() {
        let mut b = MoleculeBuilder::new();
        let atoms: Vec<usize> = (0..5).map(|_| b.add_atom(aromatic_carbon())).collect();
        ring(&mut b, &atoms, BondOrder::Aromatic);
        assert!(matches!(b.build(), Err(SanitizeError::Kekulization(_))));
    }

    #[test]
    fn aromatic_atom_outside_ring_is_rejected() {
        let mut b = MoleculeBuilder::new();
        let a0 = b.add_atom(aromatic_carbon());
        let a1 = b.add_atom(carbon());
        b.add_bond(a0, a1, BondOrder::Single).unwrap();
        assert_eq!(b.build().unwrap_err(), SanitizeError::AromaticOutsideRing(0));
    }

    #[test]
    fn pentavalent_carbon_is_rejected() {
        let mut b = MoleculeBuilder::new();
        let center = b.add_atom(carbon());
        for _ in 0..5 {
            let leaf = b.add_atom(carbon());
            b.add_bond(center, leaf, BondOrder::Single).unwrap();
        }
        assert!(matches!(
            b.build(),
            Err(SanitizeError::Valence { atom: 0, valence: 5, .. })
        ));
    }

    #[test]
    fn duplicate_and_self_bonds_are_rejected() {
        let mut b = MoleculeBuilder::new();
        let a0 = b.add_atom(carbon());
        let a1 = b.add_atom(carbon());
        b.add_bond(a0, a1, BondOrder::Single).unwrap();
        assert_eq!(
            b.add_bond(a1, a0, BondOrder::Double),
            Err(SanitizeError::DuplicateBond(0, 1))
        );
        assert_eq!(b.add_bond(a0, a0, BondOrder::Single), Err(SanitizeError::SelfBond(0)));
    }

    #[test]
    fn fused_rings_yield_two_smallest_rings() {
        // Decalin skeleton: two cyclohexanes sharing the 0-5 bond.
        let mut b = MoleculeBuilder::new();
        let atoms: Vec<usize> = (0..10).map(|_| b.add_atom(carbon())).collect();
        ring(&mut b, &atoms[0..6], BondOrder::Single);
        for pair in [(5, 6), (6, 7), (7, 8), (8, 9), (9, 0)] {
            b.add_bond(atoms[pair.0], atoms[pair.1], BondOrder::Single)
                .unwrap();
        }
        let mol = b.build().unwrap();
        assert_eq!(mol.rings().len(), 2);
        assert!(mol.rings().iter().all(|r| r.len() == 6));
        assert_eq!(mol.smallest_ring_size(0), Some(6));
    }
    #[test]
    fn kekule_benzene_is_perceived_aromatic() {
        let mut b = MoleculeBuilder::new();
        let atoms: Vec<usize> = (0..6).map(|_| b.add_atom(carbon())).collect();
        for i in 0..6 {
            let order = if i % 2 == 0 {
                BondOrder::Double
            } else {
                BondOrder::Single
            };
            b.add_bond(atoms[i], atoms[(i + 1) % 6], order).unwrap();
        }
        let mol = b.build().unwrap();
        assert!(mol.atoms().iter().all(|a| a.aromatic));
        assert!(mol.bonds().iter().all(|b| b.order == BondOrder::Aromatic));
        assert_eq!(
            mol.bonds().iter().filter(|b| b.kekule_order == 2).count(),
            3
        );
    }

    #[test]
    fn cyclohexadiene_stays_aliphatic() {
        let mut b = MoleculeBuilder::new();
        let atoms: Vec<usize> = (0..6).map(|_| b.add_atom(carbon())).collect();
        let orders = [
            BondOrder::Double,
            BondOrder::Single,
            BondOrder::Double,
            BondOrder::Single,
            BondOrder::Single,
            BondOrder::Single,
        ];
        for (i, order) in orders.into_iter().enumerate() {
            b.add_bond(atoms[i], atoms[(i + 1) % 6], order).unwrap();
        }
        let mol = b.build().unwrap();
        assert!(mol.atoms().iter().all(|a| !a.aromatic));
        assert!(!mol.bonds().iter().any(Bond::is_aromatic));
    }

    #[test]
    fn plain_hydrogen_atoms_are_folded_into_their_parent() {
        let mut b = MoleculeBuilder::new();
        let c = b.add_atom(carbon());
        let mut hydrogen = Atom::new(lookup("H").unwrap());
        hydrogen.bracket_h = Some(0);
        for _ in 0..4 {
            let h = b.add_atom(hydrogen.clone());
            b.add_bond(c, h, BondOrder::Single).unwrap();
        }
        let mol = b.build().unwrap();
        assert_eq!(mol.atoms().len(), 1);
        assert_eq!(mol.hydrogen_count(0), 4);
        assert_eq!(mol.degree(0), 0);
    }

    #[test]
    fn naphthalene_atoms_report_ring_membership() {
        let mut b = MoleculeBuilder::new();
        let atoms: Vec<usize> = (0..10).map(|_| b.add_atom(aromatic_carbon())).collect();
        ring(&mut b, &atoms[0..6], BondOrder::Aromatic);
        for pair in [(5, 6), (6, 7), (7, 8), (8, 9), (9, 0)] {
            b.add_bond(atoms[pair.0], atoms[pair.1], BondOrder::Aromatic)
                .unwrap();
        }
        let mol = b.build().unwrap();
        assert_eq!(mol.ring_membership(0), 2);
        assert_eq!(mol.ring_membership(2), 1);
        assert!(mol.rings().iter().all(|r| mol.is_aromatic_ring(r)));
        assert_eq!(mol.total_valence(0), 4);
    }
}
