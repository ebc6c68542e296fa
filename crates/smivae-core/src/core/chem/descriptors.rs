//! The eight molecular properties behind QED.
//!
//! Atom typing, acceptor/donor perception, rotatable bonds and structural alerts are all
//! expressed as SMARTS tables compiled once on first use.

use super::element;
use super::molecule::{BondOrder, Molecule};
use super::smarts::Pattern;
use std::sync::LazyLock;

/// The eight molecular properties that enter the QED desirability functions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MolecularProperties {
    pub mw: f64,
    pub alogp: f64,
    pub hba: usize,
    pub hbd: usize,
    pub psa: f64,
    pub rotb: usize,
    pub arom: usize,
    pub alerts: usize,
}

impl MolecularProperties {
    pub fn compute(mol: &Molecule) -> Self {
        Self {
            mw: molecular_weight(mol),
            alogp: crippen_logp(mol),
            hba: hydrogen_bond_acceptors(mol),
            hbd: hydrogen_bond_donors(mol),
            psa: topological_polar_surface_area(mol),
            rotb: rotatable_bonds(mol),
            arom: aromatic_ring_count(mol),
            alerts: structural_alerts(mol),
        }
    }

    /// Property values in the fixed QED order (MW, ALOGP, HBA, HBD, PSA, ROTB, AROM, ALERTS).
    pub fn as_array(&self) -> [f64; 8] {
        [
            self.mw,
            self.alogp,
            self.hba as f64,
            self.hbd as f64,
            self.psa,
            self.rotb as f64,
            self.arom as f64,
            self.alerts as f64,
        ]
    }
}

fn compile(source: &str) -> Pattern {
    Pattern::parse(source).unwrap_or_else(|err| {
        panic!("Built-in SMARTS table entry is invalid ({err}). This is a library bug.")
    })
}

fn compile_all(sources: &[&str]) -> Vec<Pattern> {
    sources.iter().map(|s| compile(s)).collect()
}

/// Average molecular weight including every implicit and explicit hydrogen.
pub fn molecular_weight(mol: &Molecule) -> f64 {
    mol.atoms()
        .iter()
        .map(|atom| atom.element.mass + atom.attached_h() as f64 * element::hydrogen_mass())
        .sum()
}

/// One Wildman-Crippen atom class: its logP contribution and the SMARTS that select it.
struct CrippenType {
    label: &'static str,
    logp: f64,
    patterns: &'static [&'static str],
}

const fn crippen(
    label: &'static str,
    logp: f64,
    patterns: &'static [&'static str],
) -> CrippenType {
    CrippenType {
        label,
        logp,
        patterns,
    }
}

/// Heavy-atom classes, tried in order; the first class with a pattern rooted on the atom wins.
const HEAVY_ATOM_TYPES: &[CrippenType] = &[
    crippen("C1", 0.1441, &["[CH4]", "[CH3]C", "[CH2](C)C"]),
    crippen("C2", 0.0, &["[CH](C)(C)C", "[C](C)(C)(C)C"]),
    crippen(
        "C3",
        -0.2035,
        &["[CH3][N,O,P,S,F,Cl,Br,I]", "[CH2X4]([N,O,P,S,F,Cl,Br,I])[A;!#1]"],
    ),
    crippen(
        "C4",
        -0.2051,
        &[
            "[CH1X4]([N,O,P,S,F,Cl,Br,I])([A;!#1])[A;!#1]",
            "[CH0X4]([N,O,P,S,F,Cl,Br,I])([A;!#1])([A;!#1])[A;!#1]",
        ],
    ),
    crippen("C5", -0.2783, &["[C]=[!C;A;!#1]"]),
    crippen(
        "C6",
        0.1551,
        &["[CH2]=C", "[CH1](=C)[A;!#1]", "[CH0](=C)([A;!#1])[A;!#1]", "[C](=C)=C"],
    ),
    crippen("C7", 0.0017, &["[CX2]#[A]"]),
    crippen("C8", 0.08452, &["[CH3]c"]),
    crippen("C9", -0.1444, &["[CH3]a"]),
    crippen("C10", -0.0516, &["[CH2X4]a"]),
    crippen("C11", 0.1193, &["[CHX4]a"]),
    crippen("C12", -0.0967, &["[CH0X4]a"]),
    crippen("C13", -0.5443, &["[cH0]-[A;!C;!N;!O;!S;!F;!Cl;!Br;!I;!#1]"]),
    crippen("C14", 0.0, &["[c][#9]"]),
    crippen("C15", 0.245, &["[c][#17]"]),
    crippen("C16", 0.198, &["[c][#35]"]),
    crippen("C17", 0.0, &["[c][#53]"]),
    crippen("C18", 0.1581, &["[cH]"]),
    crippen("C19", 0.2955, &["[c](:a)(:a):a"]),
    crippen("C20", 0.2713, &["[c](:a)(:a)-a"]),
    crippen("C21", 0.136, &["[c](:a)(:a)-C"]),
    crippen("C22", 0.4619, &["[c](:a)(:a)-N"]),
    crippen("C23", 0.5437, &["[c](:a)(:a)-O"]),
    crippen("C24", 0.1893, &["[c](:a)(:a)-S"]),
    crippen("C25", -0.8186, &["[c](:a)(:a)=[C,N,O]"]),
    crippen(
        "C26",
        0.264,
        &["[C](=C)(a)[A;!#1]", "[C](=C)(c)a", "[CH1](=C)a", "[C]=c"],
    ),
    crippen("C27", 0.2148, &["[CX4][A;!C;!N;!O;!P;!S;!F;!Cl;!Br;!I;!#1]"]),
    crippen("CS", 0.08129, &["[#6]"]),
    crippen("N1", -1.019, &["[NH2+0][A;!#1]"]),
    crippen("N2", -0.7096, &["[NH+0]([A;!#1])[A;!#1]"]),
    crippen("N3", -1.027, &["[NH2+0]a"]),
    crippen("N4", -0.5188, &["[NH+0](a)[A;!#1]"]),
    crippen("N5", 0.08387, &["[NH+0](a)a"]),
    crippen("N6", -0.3187, &["[N+0]([A;!#1])([A;!#1])[A;!#1]"]),
    crippen("N7", -0.4458, &["[N+0](a)([A;!#1])[A;!#1]"]),
    crippen("N8", 0.01508, &["[N+0](a)(a)[A;!#1]", "[N+0](a)(a)a"]),
    crippen("N9", 0.01508, &["[N+0]#[A;!#1]"]),
    crippen("N10", -1.95, &["[NH3,NH2,NH;+,+2,+3]"]),
    crippen("N11", -0.3239, &["[n+0]"]),
    crippen("N12", -1.119, &["[n;+,+2,+3]"]),
    crippen(
        "N13",
        -0.3396,
        &[
            "[NH0;+,+2,+3]([A;!#1])([A;!#1])([A;!#1])[A;!#1]",
            "[NH0;+,+2,+3](=A)(A)A",
            "[NH0;+,+2,+3](=A)(A)a",
            "[NH0;+,+2,+3](=[#6])=[#7]",
        ],
    ),
    crippen(
        "N14",
        0.2578,
        &[
            "[N;+,+2,+3]#[A;!#1]",
            "[N;-,-2,-3]",
            "[N;+,+2,+3](=[N;-,-2,-3])=N",
        ],
    ),
    crippen("NS", -0.4806, &["[#7]"]),
    crippen("O1", 0.1552, &["[o]"]),
    crippen("O2", -0.2893, &["[OH]", "[OH2]"]),
    crippen("O3", -0.0684, &["[O]([A;!#1])[A;!#1]"]),
    crippen("O4", -0.4195, &["[O](a)[A;!#1]", "[O](a)a"]),
    crippen("O5", 0.0335, &["[O]=[#7,#8]", "[OX1;-;$([OX1;-][#7])]"]),
    crippen("O6", -0.3339, &["[OX1;-;$([OX1;-][#16])]"]),
    crippen("O8", 0.1788, &["[O]=c"]),
    crippen(
        "O9",
        -0.1526,
        &[
            "[O]=[CH]C",
            "O=C(C)C",
            "O=C(C)[A;!#1]",
            "[O]=[CH]N",
            "[O]=[CH]O",
            "[O]=[CH2]",
            "[O]=[CX2]=O",
        ],
    ),
    crippen(
        "O10",
        0.1129,
        &["[O]=[CH]c", "O=C([C,c])[a;!#1]", "O=C(c)[A;!#1]"],
    ),
    crippen("O11", 0.4833, &["[O]=C([!#1;!#6])[!#1;!#6]"]),
    crippen("O12", -1.326, &["[O-1]C(=O)"]),
    crippen("OS", -0.1188, &["[#8]"]),
    crippen("F", 0.4202, &["[#9-0]"]),
    crippen("Cl", 0.6895, &["[#17-0]"]),
    crippen("Br", 0.8456, &["[#35-0]"]),
    crippen("I", 0.8857, &["[#53-0]"]),
    crippen(
        "Hal",
        -2.996,
        &["[#9;-]", "[#17;-]", "[#35;-]", "[#53;-]", "[#53;+,+2,+3]"],
    ),
    crippen("P", 0.8612, &["[#15]"]),
    crippen("S1", 0.6482, &["[S-0]"]),
    crippen("S2", -0.0024, &["[S;-,-2,-3,-4,+1,+2,+3,+5,+6]"]),
    crippen("S3", 0.6237, &["[s]"]),
    crippen("Me1", -0.3808, &["[#3,#11,#19,#37,#55]"]),
    crippen(
        "Me2",
        -0.0025,
        &[
            "[#4,#5,#12,#13,#14,#20,#22,#24,#25,#26,#27,#28,#29,#30,#31,#32,#33,#34]",
            "[#38,#41,#42,#44,#45,#46,#47,#48,#50,#51,#52,#56,#67,#72,#78,#79,#80,#81,#82,#83]",
        ],
    ),
];

/// Hydrogen classes, rooted on the atom carrying the hydrogen.
const HYDROGEN_TYPES: &[CrippenType] = &[
    crippen("H1", 0.123, &["[#6]", "[#1]"]),
    crippen(
        "H2",
        -0.2677,
        &["O[CX4]", "Oc", "O[!#6;!#7;!#8;!#16]", "[OH2]", "[!#6;!#7;!#8]"],
    ),
    crippen("H3", 0.2142, &["[#7]", "O[#7]"]),
    crippen(
        "H4",
        0.298,
        &["OC=[#6]", "OC=[#7]", "OC=O", "OC=S", "OO", "OS"],
    ),
    crippen("HS", 0.1125, &["*"]),
];

struct CompiledType {
    label: &'static str,
    logp: f64,
    patterns: Vec<Pattern>,
}

fn compile_types(types: &[CrippenType]) -> Vec<CompiledType> {
    types
        .iter()
        .map(|t| CompiledType {
            label: t.label,
            logp: t.logp,
            patterns: compile_all(t.patterns),
        })
        .collect()
}

static HEAVY_ATOM_CLASSES: LazyLock<Vec<CompiledType>> =
    LazyLock::new(|| compile_types(HEAVY_ATOM_TYPES));
static HYDROGEN_CLASSES: LazyLock<Vec<CompiledType>> =
    LazyLock::new(|| compile_types(HYDROGEN_TYPES));

fn classify<'a>(classes: &'a [CompiledType], mol: &Molecule, idx: usize) -> Option<&'a CompiledType> {
    classes
        .iter()
        .find(|class| class.patterns.iter().any(|p| p.matches_at(mol, idx)))
}

/// Wildman-Crippen octanol/water partition coefficient: the sum of heavy-atom class
/// contributions plus one hydrogen contribution per attached hydrogen.
pub fn crippen_logp(mol: &Molecule) -> f64 {
    (0..mol.atoms().len())
        .filter(|&i| !mol.atom(i).is_hydrogen())
        .map(|i| {
            let heavy = classify(&HEAVY_ATOM_CLASSES, mol, i).map_or(0.0, |c| c.logp);
            let hydrogens = mol.hydrogen_count(i);
            if hydrogens == 0 {
                return heavy;
            }
            let per_h = classify(&HYDROGEN_CLASSES, mol, i).map_or(0.0, |c| c.logp);
            heavy + hydrogens as f64 * per_h
        })
        .sum()
}

const ACCEPTOR_SMARTS: &[&str] = &[
    "[oH0;X2]",
    "[OH1;X2;v2]",
    "[OH0;X2;v2]",
    "[OH0;X1;v2]",
    "[O-;X1]",
    "[SH0;X2;v2]",
    "[SH0;X1;v2]",
    "[S-;X1]",
    "[nH0;X2]",
    "[NH0;X1;v3]",
    "[$([N;+0;X3;v3]);!$(N[C,S]=O)]",
];

const DONOR_SMARTS: &str = "[N&!H0&v3,N&!H0&+1&v4,O&H1&+0,S&H1&+0,n&H1&+0]";

static ACCEPTORS: LazyLock<Vec<Pattern>> = LazyLock::new(|| compile_all(ACCEPTOR_SMARTS));
static DONORS: LazyLock<Pattern> = LazyLock::new(|| compile(DONOR_SMARTS));

/// Acceptor atoms: the sum of matches over the acceptor patterns, so an atom that fits
/// two patterns counts twice.
pub fn hydrogen_bond_acceptors(mol: &Molecule) -> usize {
    ACCEPTORS.iter().map(|p| p.count_rooted(mol)).sum()
}

/// Nitrogen, oxygen and sulfur atoms carrying a donatable hydrogen.
pub fn hydrogen_bond_donors(mol: &Molecule) -> usize {
    DONORS.count_rooted(mol)
}

/// Bonding environment of a polar atom, heavy neighbours only.
#[derive(Debug, Default, Clone, Copy)]
struct PolarEnvironment {
    neighbors: usize,
    hydrogens: usize,
    charge: i8,
    single: usize,
    double: usize,
    triple: usize,
    aromatic: usize,
    in_three_ring: bool,
}

impl PolarEnvironment {
    fn of(mol: &Molecule, idx: usize) -> Self {
        let mut env = PolarEnvironment {
            hydrogens: mol.hydrogen_count(idx),
            charge: mol.atom(idx).charge,
            in_three_ring: mol
                .rings()
                .iter()
                .any(|ring| ring.len() == 3 && ring.contains(&idx)),
            ..Default::default()
        };
        for (nbr, bond) in mol.neighbors(idx) {
            if mol.atom(nbr).is_hydrogen() {
                continue;
            }
            env.neighbors += 1;
            match bond.order {
                BondOrder::Single => env.single += 1,
                BondOrder::Double => env.double += 1,
                BondOrder::Triple => env.triple += 1,
                BondOrder::Aromatic => env.aromatic += 1,
            }
        }
        env
    }
}

/// Ertl topological polar surface area over nitrogen and oxygen atoms.
pub fn topological_polar_surface_area(mol: &Molecule) -> f64 {
    (0..mol.atoms().len())
        .map(|i| match mol.atom(i).element.atomic_number {
            7 => nitrogen_psa(&PolarEnvironment::of(mol, i)),
            8 => oxygen_psa(&PolarEnvironment::of(mol, i)),
            _ => 0.0,
        })
        .sum()
}

fn nitrogen_psa(env: &PolarEnvironment) -> f64 {
    let e = env;
    let tabulated = match (e.neighbors, e.hydrogens, e.charge) {
        (1, 0, 0) if e.triple == 1 => Some(23.79),
        (1, 1, 0) if e.double == 1 => Some(23.85),
        (1, 2, 0) if e.single == 1 => Some(26.02),
        (1, 2, 1) if e.double == 1 => Some(25.59),
        (1, 3, 1) if e.single == 1 => Some(27.64),
        (2, 0, 0) if e.single == 1 && e.double == 1 => Some(12.36),
        (2, 0, 0) if e.double == 1 && e.triple == 1 => Some(13.60),
        (2, 1, 0) if e.single == 2 => Some(if e.in_three_ring { 21.94 } else { 12.03 }),
        (2, 0, 1) if e.triple == 1 && e.single == 1 => Some(4.36),
        (2, 1, 1) if e.double == 1 && e.single == 1 => Some(13.97),
        (2, 2, 1) if e.single == 2 => Some(16.61),
        (2, 0, 0) if e.aromatic == 2 => Some(12.89),
        (2, 1, 0) if e.aromatic == 2 => Some(15.79),
        (2, 1, 1) if e.aromatic == 2 => Some(14.14),
        (3, 0, 0) if e.single == 3 => Some(if e.in_three_ring { 3.01 } else { 3.24 }),
        (3, 0, 0) if e.single == 1 && e.double == 2 => Some(11.68),
        (3, 0, 1) if e.single == 2 && e.double == 1 => Some(3.01),
        (3, 1, 1) if e.single == 3 => Some(4.44),
        (3, 0, 0) if e.aromatic == 3 => Some(4.41),
        (3, 0, 0) if e.single == 1 && e.aromatic == 2 => Some(4.93),
        (3, 0, 0) if e.double == 1 && e.aromatic == 2 => Some(8.39),
        (3, 0, 1) if e.aromatic == 3 => Some(4.10),
        (3, 0, 1) if e.single == 1 && e.aromatic == 2 => Some(3.88),
        (4, 0, 1) if e.single == 4 => Some(0.0),
        _ => None,
    };
    tabulated.unwrap_or_else(|| {
        (30.5 - 8.2 * e.neighbors as f64 + 1.5 * e.hydrogens as f64).max(0.0)
    })
}

fn oxygen_psa(env: &PolarEnvironment) -> f64 {
    let e = env;
    let tabulated = match (e.neighbors, e.hydrogens, e.charge) {
        (1, 0, 0) if e.double == 1 => Some(17.07),
        (1, 1, 0) if e.single == 1 => Some(20.23),
        (1, 0, -1) if e.single == 1 => Some(23.06),
        (2, 0, 0) if e.single == 2 => Some(if e.in_three_ring { 12.53 } else { 9.23 }),
        (2, 0, 0) if e.aromatic == 2 => Some(13.14),
        _ => None,
    };
    tabulated.unwrap_or_else(|| {
        (28.5 - 8.6 * e.neighbors as f64 + 1.5 * e.hydrogens as f64).max(0.0)
    })
}

/// Strict rotatable bond definition: terminal atoms, triple bonds, CX3 rotors and amide,
/// thioamide and amidine C-N/O/S bonds are excluded.
const ROTATABLE_BOND_SMARTS: &str = "[!$(*#*)&!D1&!$(C(F)(F)F)&!$(C(Cl)(Cl)Cl)&!$(C(Br)(Br)Br)\
&!$(C([CH3])([CH3])[CH3])&!$([CD3](=[N,O,S])-!@[#7,O,S!D1])&!$([#7,O,S!D1]-!@[CD3]=[N,O,S])\
&!$([CD3](=[N+])-!@[#7!D1])&!$([#7!D1]-!@[CD3]=[N+])]-,:;!@[!$(*#*)&!D1&!$(C(F)(F)F)\
&!$(C(Cl)(Cl)Cl)&!$(C(Br)(Br)Br)&!$(C([CH3])([CH3])[CH3])]";

static ROTATABLE_BOND: LazyLock<Pattern> = LazyLock::new(|| compile(ROTATABLE_BOND_SMARTS));

pub fn rotatable_bonds(mol: &Molecule) -> usize {
    mol.bonds()
        .iter()
        .filter(|bond| {
            ROTATABLE_BOND.matches_from(mol, &[bond.begin, bond.end])
                || ROTATABLE_BOND.matches_from(mol, &[bond.end, bond.begin])
        })
        .count()
}

/// Ring atoms that are aliphatic and have a non-aromatic neighbour.
static ALIPHATIC_RING_ATOM: LazyLock<Pattern> = LazyLock::new(|| compile("[$([A;R][!a])]"));

/// Rings left after deleting aliphatic ring atoms, i.e. the cycle rank of what remains.
pub fn aromatic_ring_count(mol: &Molecule) -> usize {
    let n = mol.atoms().len();
    let kept: Vec<bool> = (0..n)
        .map(|i| !ALIPHATIC_RING_ATOM.matches_at(mol, i))
        .collect();

    let mut parent: Vec<usize> = (0..n).collect();
    let mut cycles = 0usize;
    for bond in mol.bonds() {
        if !kept[bond.begin] || !kept[bond.end] {
            continue;
        }
        let (a, b) = (find_root(&mut parent, bond.begin), find_root(&mut parent, bond.end));
        if a == b {
            cycles += 1;
        } else {
            parent[a] = b;
        }
    }
    cycles
}

fn find_root(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Unwanted functional groups and scaffolds. Each alert counts once no matter how many
/// times it matches.
pub const ALERT_SMARTS: &[&str] = &[
    "*1[O,S,N]*1",
    "[S,C](=[O,S])[F,Br,Cl,I]",
    "[CX4][Cl,Br,I]",
    "[#6]S(=O)(=O)O[#6]",
    "[$([CH]),$(CC)]#CC(=O)[#6]",
    "[$([CH]),$(CC)]#CC(=O)O[#6]",
    "n[OH]",
    "[$([CH]),$(CC)]#CS(=O)(=O)[#6]",
    "C=C(C=O)C=O",
    "n1c([F,Cl,Br,I])cccc1",
    "[CH1](=O)",
    "[#8][#8]",
    "[C;!R]=[N;!R]",
    "[N!R]=[N!R]",
    "[#6](=O)[#6](=O)",
    "[#16][#16]",
    "[#7][NH2]",
    "C(=O)N[NH2]",
    "[#6]=S",
    "[$([CH2]),$([CH][CX4]),$(C([CX4])[CX4])]=[$([CH2]),$([CH][CX4]),$(C([CX4])[CX4])]",
    "C1(=[O,N])C=CC(=[O,N])C=C1",
    "C1(=[O,N])C(=[O,N])C=CC=C1",
    "a21aa3a(aa1aaaa2)aaaa3",
    "a31a(a2a(aa1)aaaa2)aaaa3",
    "a1aa2a3a(a1)A=AA=A3=AA=A2",
    "c1cc([NH2])ccc1",
    "[Hg,Fe,As,Sb,Zn,Se,se,Te,B,Si,Na,Ca,Ge,Ag,Mg,K,Ba,Sr,Be,Ti,Mo,Mn,Ru,Pd,Ni,Cu,Au,Cd,Al,Ga,Sn,Rh,Tl,Bi,Nb,Li,Pb,Hf,Ho]",
    "I",
    "OS(=O)(=O)[O-]",
    "[N+](=O)[O-]",
    "C(=O)N[OH]",
    "C1NC(=O)NC(=O)1",
    "[SH]",
    "[S-]",
    "c1ccc([Cl,Br,I,F])c([Cl,Br,I,F])c1[Cl,Br,I,F]",
    "c1cc([Cl,Br,I,F])cc([Cl,Br,I,F])c1[Cl,Br,I,F]",
    "[CR1]1[CR1][CR1][CR1][CR1][CR1][CR1]1",
    "[CR1]1[CR1][CR1]cc[CR1][CR1]1",
    "[CR2]1[CR2][CR2][CR2][CR2][CR2][CR2][CR2]1",
    "[CR2]1[CR2][CR2]cc[CR2][CR2][CR2]1",
    "[CH2R2]1N[CH2R2][CH2R2][CH2R2][CH2R2][CH2R2]1",
    "[CH2R2]1N[CH2R2][CH2R2][CH2R2][CH2R2][CH2R2][CH2R2]1",
    "C#C",
    "[OR2,NR2]@[CR2]@[CR2]@[OR2,NR2]@[CR2]@[CR2]@[OR2,NR2]",
    "[$([N+R]),$([n+R]),$([N+]=C)][O-]",
    "[#6]=N[OH]",
    "[#6]=NOC=O",
    "[#6](=O)[CX4,CR0X3,O][#6](=O)",
    "c1ccc2c(c1)ccc(=O)o2",
    "[O+,o+,S+,s+]",
    "N=C=O",
    "[NX3,NX4][F,Cl,Br,I]",
    "c1ccccc1OC(=O)[#6]",
    "[CR0]=[CR0][CR0]=[CR0]",
    "[C+,c+,C-,c-]",
    "N=[N+]=[N-]",
    "C12C(NC(N1)=O)CSC2",
    "c1c([OH])c([OH,NH2,NH])ccc1",
    "P",
    "[N,O,S]C#N",
    "C=C=O",
    "[Si][F,Cl,Br,I]",
    "[SX2]O",
    "[SiR0,CR0](c1ccccc1)(c2ccccc2)(c3ccccc3)",
    "O1CCCCC1OC2CCC3CCCCC3C2",
    "N=[CR0][N,n,O,S]",
    "[cR2]1[cR2][cR2]([Nv3X3,Nv4X4])[cR2][cR2][cR2]1[cR2]2[cR2][cR2][cR2]([Nv3X3,Nv4X4])[cR2][cR2]2",
    "C=[C!r]C#N",
    "[cR2]1[cR2]c([N+0X3R0,nX3R0])c([N+0X3R0,nX3R0])[cR2][cR2]1",
    "[cR2]1[cR2]c([N+0X3R0,nX3R0])[cR2]c([N+0X3R0,nX3R0])[cR2]1",
    "[cR2]1[cR2]c([N+0X3R0,nX3R0])[cR2][cR2]c1([N+0X3R0,nX3R0])",
    "[OH]c1ccc([OH,NH2,NH])cc1",
    "c1ccccc1OC(=O)O",
    "[SX2H0][N]",
    "c12ccccc1(SC(S)=N2)",
    "c12ccccc1(SC(=S)N2)",
    "c1nnnn1C=O",
    "s1c(S)nnc1NC=O",
    "S1C=CSC1=S",
    "C(=O)Onnn",
    "OS(=O)(=O)C(F)(F)F",
    "N#CC[OH]",
    "N#CC(=O)",
    "S(=O)(=O)C#N",
    "N[CH2]C#N",
    "C1(=O)NCC1",
    "S(=O)(=O)[O-,OH]",
    "NC[F,Cl,Br,I]",
    "C=[C!r]O",
    "[NX2+0]=[O+0]",
    "[OR0,NR0][OR0,NR0]",
    "C(=O)O[C,H1].C(=O)O[C,H1].C(=O)O[C,H1]",
    "[CX2R0][NX3R0]",
    "c1ccccc1[C;!R]=[C;!R]c2ccccc2",
    "[NX3R0,NX4R0,OR0,SX2R0][CX4][NX3R0,NX4R0,OR0,SX2R0]",
    "[s,S,c,C,n,N,o,O]~[n+,N+](~[s,S,c,C,n,N,o,O])(~[s,S,c,C,n,N,o,O])~[s,S,c,C,n,N,o,O]",
    "[s,S,c,C,n,N,o,O]~[nX3+,NX3+](~[s,S,c,C,n,N])~[s,S,c,C,n,N]",
    "[*]=[N+]=[*]",
    "[SX3](=O)[O-,OH]",
    "N#N",
    "F.F.F.F",
    "[R0;D2][R0;D2][R0;D2][R0;D2]",
    "[cR,CR]~C(=O)NC(=O)~[cR,CR]",
    "C=!@CC=[O,S]",
    "[#6,#8,#16][#6](=O)O[#6]",
    "c[C;R0](=[O,S])[#6]",
    "c[SX2][C;!R]",
    "C=C=C",
    "c1nc([F,Cl,Br,I,S])ncc1",
    "c1ncnc([F,Cl,Br,I,S])c1",
    "c1nc(c2c(n1)nc(n2)[F,Cl,Br,I])",
    "[#6]S(=O)(=O)c1ccc(cc1)F",
    "[15N]",
    "[13C]",
    "[18O]",
    "[34S]",
];

static ALERTS: LazyLock<Vec<Pattern>> = LazyLock::new(|| compile_all(ALERT_SMARTS));

pub fn structural_alerts(mol: &Molecule) -> usize {
    matched_alerts(mol).len()
}

/// SMARTS of the alerts the molecule triggers.
pub fn matched_alerts(mol: &Molecule) -> Vec<&'static str> {
    ALERTS
        .iter()
        .filter(|alert| alert.matches(mol))
        .map(Pattern::source)
        .collect()
}
