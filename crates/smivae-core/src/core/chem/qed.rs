//! Quantitative Estimate of Drug-likeness.
//!
//! Each of the eight [`MolecularProperties`] is mapped through an asymmetric double sigmoid
//! desirability function; the score is the weighted geometric mean of the desirabilities
//! using the mean weights of Bickerton et al. (Nat. Chem. 2012).

use super::descriptors::MolecularProperties;
use super::molecule::Molecule;
use super::Validity;

/// Parameters of one asymmetric double sigmoid desirability function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    pub dmax: f64,
}

const fn ads_params(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64, dmax: f64) -> AdsParameters {
    AdsParameters { a, b, c, d, e, f, dmax }
}

/// MW, ALOGP, HBA, HBD, PSA, ROTB, AROM, ALERTS.
pub const ADS_PARAMETERS: [AdsParameters; 8] = [
    ads_params(2.817065973, 392.5754953, 290.7489764, 2.419764353, 49.22325677, 65.37051707, 104.9805561),
    ads_params(3.172690585, 137.8624751, 2.534937431, 4.581497897, 0.822739154, 0.576295591, 131.3186604),
    ads_params(2.948620388, 160.4605972, 3.615294657, 4.435986202, 0.290141953, 1.300669958, 148.7763046),
    ads_params(1.618662227, 1010.051101, 0.985094388, 0.000000001, 0.713820843, 0.920922555, 258.1632616),
    ads_params(1.876861559, 125.2232657, 62.90773554, 87.83366614, 12.01999824, 28.51324732, 104.5686167),
    ads_params(0.010000000, 272.4121427, 2.558379970, 1.565547684, 1.271567166, 2.758063707, 105.4420403),
    ads_params(3.217788970, 957.7374108, 2.274627939, 0.000000001, 1.317690384, 0.375760881, 312.3372610),
    ads_params(0.010000000, 1199.094025, -0.09002883, 0.000000001, 0.185904477, 0.875193782, 417.7253140),
];

pub const WEIGHT_MEAN: [f64; 8] = [0.66, 0.46, 0.05, 0.61, 0.06, 0.65, 0.48, 0.95];

/// Asymmetric double sigmoid, normalised so that its maximum is close to 1.
pub fn ads(x: f64, p: &AdsParameters) -> f64 {
    let rise = 1.0 + (-(x - p.c + p.d / 2.0) / p.e).exp();
    let fall = 1.0 + (-(x - p.c - p.d / 2.0) / p.f).exp();
    (p.a + p.b / rise * (1.0 - 1.0 / fall)) / p.dmax
}

pub fn qed_from_properties(props: &MolecularProperties) -> f64 {
    let values = props.as_array();
    let (weighted_log, total_weight) = values
        .iter()
        .zip(ADS_PARAMETERS.iter())
        .zip(WEIGHT_MEAN.iter())
        .fold((0.0, 0.0), |(acc, wsum), ((&x, p), &w)| {
            let desirability = ads(x, p).max(f64::MIN_POSITIVE);
            (acc + w * desirability.ln(), wsum + w)
        });
    (weighted_log / total_weight).exp()
}

pub fn qed(mol: &Molecule) -> f64 {
    qed_from_properties(&MolecularProperties::compute(mol))
}

/// QED of a SMILES string; 0 when the string does not parse into a valid molecule.
pub fn score_smiles(smiles: &str) -> f64 {
    evaluate(smiles).1
}

/// Validity label and QED computed from a single parse of `smiles`.
pub fn evaluate(smiles: &str) -> (Validity, f64) {
    match super::smiles::parse(smiles) {
        Ok(mol) => (Validity::Valid, qed(&mol)),
        Err(err) => {
            tracing::trace!(smiles, error = %err, "Decoded string is not a valid molecule");
            (Validity::Invalid, 0.0)
        }
    }
}
