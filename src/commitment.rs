// src/commitment.rs
//
// Feldman commitments to sharing polynomials, and nothing-up-my-sleeve
// generators.
//
// - A dealer publishes C_j = g * a_j for every coefficient a_j
// - Anyone can check a share s_i against them: g * s_i ?= Σ C_j * x_i^j
// - Commitments from several dealers add coefficient-wise, giving the
//   commitments of the summed polynomial

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::group::{sum_elements, PrimeGroup};
use crate::shamir::{share_x, Poly};

const COMMITMENT_DIGEST_DOMAIN: &[u8] = b"threshold-tally.feldman-digest.v1";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeldmanCommitments<G: PrimeGroup> {
    pub points: Vec<G::Element>,
}

impl<G: PrimeGroup> FeldmanCommitments<G> {
    /// Commit to every coefficient of `poly`.
    pub fn commit(poly: &Poly<G>) -> Self {
        let g = G::generator();
        Self {
            points: poly.coeffs.iter().map(|a| g * *a).collect(),
        }
    }

    /// Number of committed coefficients (the reconstruction threshold).
    pub fn threshold(&self) -> usize {
        self.points.len()
    }

    /// Commitment to the constant term.
    pub fn public_value(&self) -> G::Element {
        self.points.first().copied().unwrap_or_else(G::identity)
    }

    /// Σ C_j * x^j at the share point of `index`, i.e. `g * p(x_index)`.
    pub fn evaluate(&self, index: u32) -> G::Element {
        let x = share_x::<G>(index);
        // Horner in the exponent
        self.points
            .iter()
            .rev()
            .fold(G::identity(), |acc, c| acc * x + *c)
    }

    pub fn verify_share(&self, index: u32, share: &G::Scalar) -> bool {
        G::generator() * *share == self.evaluate(index)
    }

    /// Coefficient-wise sum of commitment vectors of equal length.
    pub fn aggregate<'a>(all: impl IntoIterator<Item = &'a Self>) -> Result<Self> {
        let mut iter = all.into_iter();
        let first = iter
            .next()
            .ok_or(Error::UnexpectedMessage("no commitments to aggregate"))?;
        let mut points = first.points.clone();
        for c in iter {
            if c.points.len() != points.len() {
                return Err(Error::UnexpectedMessage("commitment length mismatch"));
            }
            for (acc, p) in points.iter_mut().zip(&c.points) {
                *acc = *acc + *p;
            }
        }
        Ok(Self { points })
    }

    /// Fingerprint of the whole commitment vector. Responses carry it so
    /// that every participant can tell whether a dealer showed everyone the
    /// same polynomial.
    pub fn digest(&self) -> [u8; 32] {
        Sha256::new()
            .chain_update(COMMITMENT_DIGEST_DOMAIN)
            .chain_update((self.points.len() as u64).to_le_bytes())
            .chain_update(self.to_bytes())
            .finalize()
            .into()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.points.len() * G::ELEMENT_LEN);
        for p in &self.points {
            out.extend_from_slice(&G::element_to_bytes(p));
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() % G::ELEMENT_LEN != 0 {
            return Err(Error::Decoding("commitment vector length"));
        }
        let points = bytes
            .chunks(G::ELEMENT_LEN)
            .map(G::element_from_bytes)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { points })
    }
}

/// Deterministically derive `count` independent generators under `label`.
/// Nobody knows a discrete-log relation between them or to `g`, which the
/// shuffle's permutation commitments rely on.
pub fn derive_generators<G: PrimeGroup>(label: &[u8], count: usize) -> Vec<G::Element> {
    (0..count as u64)
        .map(|i| G::hash_to_element(label, &i.to_le_bytes()))
        .collect()
}

/// Σ λ_i * public share_i: the group element committed by a set of
/// public shares.
pub fn interpolate_public<G: PrimeGroup>(shares: &[(u32, G::Element)]) -> Result<G::Element> {
    let ss: Vec<u32> = shares.iter().map(|(i, _)| *i).collect();
    let lambdas = crate::shamir::lagrange_coefficients_at_zero::<G>(&ss)?;
    Ok(sum_elements::<G>(
        shares.iter().zip(lambdas).map(|((_, p), l)| *p * l),
    ))
}
