// src/shuffle.rs
//
// Verifiable re-encryption shuffle (Terelius-Wikström proof of a shuffle).
//
// Output position j holds a re-encryption of input perm[j]:
//   w'_j = w_{perm[j]} + s_j·(G, PK)
// The prover commits to the permutation with u_i = r_i·G + h_{pos(i)}, where
// pos is the inverse of perm and the h_j are hash-derived generators, then
// proves in zero knowledge that
//   (1) A = Σ e_i·u_i opens to a·G + Σ e'_j·h_j
//   (2) the chain B_j = b_j·G + e'_j·B_{j-1}, B_0 = h_0, is well formed
//   (3) C = Σ u_i − Σ h_j opens to c·G
//   (4) D = B_N − (Π e_i)·h_0 opens to d·G
//   (5) F = Σ e_i·w_i equals Σ e'_j·w'_j − f·(G, PK)
// with e'_j = e_{perm[j]}. Challenges e_i and v come from one transcript over
// the statement and the prover's commitments.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::commitment::derive_generators;
use crate::elgamal::{reencrypt, Ciphertext};
use crate::error::{Error, Result};
use crate::group::PrimeGroup;
use crate::hash::Transcript;
use crate::randutil::random_permutation;

const SHUFFLE_DOMAIN: &[u8] = b"threshold-tally.shuffle.v1";
const GENERATORS_LABEL: &[u8] = b"threshold-tally.shuffle.generators";

/// Non-interactive proof that one ciphertext list is a permuted
/// re-encryption of another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShuffleProof<G: PrimeGroup> {
    /// u_i, one per input
    pub permutation_commitments: Vec<G::Element>,
    /// B_1..B_N
    pub chain: Vec<G::Element>,
    /// B'_1..B'_N
    pub chain_commitments: Vec<G::Element>,
    pub a_commitment: G::Element,
    pub c_commitment: G::Element,
    pub d_commitment: G::Element,
    pub f_commitment: Ciphertext<G>,
    pub k_a: G::Scalar,
    pub k_c: G::Scalar,
    pub k_d: G::Scalar,
    pub k_f: G::Scalar,
    pub k_b: Vec<G::Scalar>,
    pub k_e: Vec<G::Scalar>,
}

impl<G: PrimeGroup> ShuffleProof<G> {
    pub fn len(&self) -> usize {
        self.permutation_commitments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permutation_commitments.is_empty()
    }

    fn encoded_len(n: usize) -> Option<usize> {
        let elements = n.checked_mul(3)?.checked_add(5)?.checked_mul(G::ELEMENT_LEN)?;
        let scalars = n.checked_mul(2)?.checked_add(4)?.checked_mul(G::SCALAR_LEN)?;
        elements.checked_add(scalars)?.checked_add(4)
    }

    /// Layout:
    /// `N (u32 LE) || u[N] || B[N] || B'[N] || A' || C' || D' || F'.c1 || F'.c2
    ///  || k_a || k_c || k_d || k_f || k_b[N] || k_e[N]`
    pub fn to_bytes(&self) -> Vec<u8> {
        let n = self.len();
        let mut out = Vec::with_capacity(Self::encoded_len(n).unwrap_or(0));
        out.extend_from_slice(&(n as u32).to_le_bytes());
        for e in self
            .permutation_commitments
            .iter()
            .chain(&self.chain)
            .chain(&self.chain_commitments)
        {
            out.extend_from_slice(&G::element_to_bytes(e));
        }
        for e in [
            &self.a_commitment,
            &self.c_commitment,
            &self.d_commitment,
            &self.f_commitment.c1,
            &self.f_commitment.c2,
        ] {
            out.extend_from_slice(&G::element_to_bytes(e));
        }
        for s in [&self.k_a, &self.k_c, &self.k_d, &self.k_f]
            .into_iter()
            .chain(&self.k_b)
            .chain(&self.k_e)
        {
            out.extend_from_slice(&G::scalar_to_bytes(s));
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader { bytes };
        let n_bytes: [u8; 4] = r
            .take(4)?
            .try_into()
            .map_err(|_| Error::Decoding("shuffle proof header"))?;
        let n = u32::from_le_bytes(n_bytes) as usize;
        if Self::encoded_len(n) != Some(bytes.len()) {
            return Err(Error::Decoding("shuffle proof length"));
        }

        let permutation_commitments = r.elements::<G>(n)?;
        let chain = r.elements::<G>(n)?;
        let chain_commitments = r.elements::<G>(n)?;
        let a_commitment = r.element::<G>()?;
        let c_commitment = r.element::<G>()?;
        let d_commitment = r.element::<G>()?;
        let f_commitment = Ciphertext {
            c1: r.element::<G>()?,
            c2: r.element::<G>()?,
        };
        let k_a = r.scalar::<G>()?;
        let k_c = r.scalar::<G>()?;
        let k_d = r.scalar::<G>()?;
        let k_f = r.scalar::<G>()?;
        let k_b = r.scalars::<G>(n)?;
        let k_e = r.scalars::<G>(n)?;

        Ok(Self {
            permutation_commitments,
            chain,
            chain_commitments,
            a_commitment,
            c_commitment,
            d_commitment,
            f_commitment,
            k_a,
            k_c,
            k_d,
            k_f,
            k_b,
            k_e,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            return Err(Error::Decoding("truncated shuffle proof"));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn element<G: PrimeGroup>(&mut self) -> Result<G::Element> {
        G::element_from_bytes(self.take(G::ELEMENT_LEN)?)
    }

    fn scalar<G: PrimeGroup>(&mut self) -> Result<G::Scalar> {
        G::scalar_from_bytes(self.take(G::SCALAR_LEN)?)
    }

    fn elements<G: PrimeGroup>(&mut self, n: usize) -> Result<Vec<G::Element>> {
        (0..n).map(|_| self.element::<G>()).collect()
    }

    fn scalars<G: PrimeGroup>(&mut self, n: usize) -> Result<Vec<G::Scalar>> {
        (0..n).map(|_| self.scalar::<G>()).collect()
    }
}

fn statement_transcript<G: PrimeGroup>(
    pk: &G::Element,
    input: &[Ciphertext<G>],
    output: &[Ciphertext<G>],
    permutation_commitments: &[G::Element],
) -> Transcript {
    let mut tr = Transcript::new(SHUFFLE_DOMAIN);
    tr.append_element::<G>(b"pk", pk);
    tr.append_u64(b"n", input.len() as u64);
    for ct in input {
        tr.append_message(b"input", &ct.to_bytes());
    }
    for ct in output {
        tr.append_message(b"output", &ct.to_bytes());
    }
    tr.append_elements::<G>(b"u", permutation_commitments);
    tr
}

/// Per-input challenges e_i.
fn challenge_e<G: PrimeGroup>(tr: &mut Transcript, n: usize) -> Vec<G::Scalar> {
    let seed = tr.challenge_bytes(b"e");
    (0..n as u64)
        .map(|i| {
            let mut data = seed.to_vec();
            data.extend_from_slice(&i.to_le_bytes());
            G::hash_to_scalar(b"threshold-tally.shuffle.e", &data)
        })
        .collect()
}

fn challenge_v<G: PrimeGroup>(
    tr: &mut Transcript,
    chain: &[G::Element],
    chain_commitments: &[G::Element],
    a_commitment: &G::Element,
    c_commitment: &G::Element,
    d_commitment: &G::Element,
    f_commitment: &Ciphertext<G>,
) -> G::Scalar {
    tr.append_elements::<G>(b"B", chain);
    tr.append_elements::<G>(b"B'", chain_commitments);
    tr.append_element::<G>(b"A'", a_commitment);
    tr.append_element::<G>(b"C'", c_commitment);
    tr.append_element::<G>(b"D'", d_commitment);
    tr.append_message(b"F'", &f_commitment.to_bytes());
    tr.challenge_scalar::<G>(b"v")
}

fn random_scalars<G: PrimeGroup>(n: usize) -> Vec<G::Scalar> {
    (0..n).into_par_iter().map(|_| G::random_scalar()).collect()
}

fn par_sum<G: PrimeGroup>(items: impl ParallelIterator<Item = G::Element>) -> G::Element {
    items.reduce(G::identity, |a, b| a + b)
}

/// Permute and re-encrypt `ciphertexts` under `pk`, with a proof of
/// correctness that does not reveal the permutation.
#[instrument(level = "debug", skip_all, fields(len = ciphertexts.len()))]
pub fn shuffle<G: PrimeGroup>(
    pk: &G::Element,
    ciphertexts: &[Ciphertext<G>],
) -> Result<(Vec<Ciphertext<G>>, ShuffleProof<G>)> {
    if ciphertexts.is_empty() {
        return Err(Error::EmptyBatch);
    }
    let n = ciphertexts.len();
    let g = G::generator();
    let h = derive_generators::<G>(GENERATORS_LABEL, n);

    let perm = random_permutation(n);
    let mut pos = vec![0usize; n];
    for (j, &i) in perm.iter().enumerate() {
        pos[i] = j;
    }

    let s = random_scalars::<G>(n);
    let shuffled: Vec<Ciphertext<G>> = perm
        .par_iter()
        .zip(s.par_iter())
        .map(|(&i, s_j)| reencrypt(&ciphertexts[i], pk, s_j))
        .collect();

    let r = random_scalars::<G>(n);
    let u: Vec<G::Element> = r
        .par_iter()
        .zip(pos.par_iter())
        .map(|(r_i, &j)| g * *r_i + h[j])
        .collect();

    let mut tr = statement_transcript(pk, ciphertexts, &shuffled, &u);
    let e = challenge_e::<G>(&mut tr, n);
    let e_prime: Vec<G::Scalar> = perm.iter().map(|&i| e[i]).collect();

    // commitment chain
    let b = random_scalars::<G>(n);
    let mut chain = Vec::with_capacity(n);
    let mut prev = h[0];
    for j in 0..n {
        let b_j = g * b[j] + prev * e_prime[j];
        chain.push(b_j);
        prev = b_j;
    }
    let chain_prev: Vec<G::Element> = std::iter::once(h[0])
        .chain(chain[..n - 1].iter().copied())
        .collect();

    // blinding
    let alpha = G::random_scalar();
    let beta = random_scalars::<G>(n);
    let epsilon = random_scalars::<G>(n);
    let gamma = G::random_scalar();
    let delta = G::random_scalar();
    let phi = G::random_scalar();

    let a_commitment = g * alpha
        + par_sum::<G>(h.par_iter().zip(epsilon.par_iter()).map(|(h_j, eps)| *h_j * *eps));
    let chain_commitments: Vec<G::Element> = (0..n)
        .into_par_iter()
        .map(|j| g * beta[j] + chain_prev[j] * epsilon[j])
        .collect();
    let c_commitment = g * gamma;
    let d_commitment = g * delta;
    let f_commitment = Ciphertext {
        c1: par_sum::<G>(shuffled.par_iter().zip(epsilon.par_iter()).map(|(w, eps)| w.c1 * *eps))
            - g * phi,
        c2: par_sum::<G>(shuffled.par_iter().zip(epsilon.par_iter()).map(|(w, eps)| w.c2 * *eps))
            - *pk * phi,
    };

    let v = challenge_v(
        &mut tr,
        &chain,
        &chain_commitments,
        &a_commitment,
        &c_commitment,
        &d_commitment,
        &f_commitment,
    );

    // witnesses folded by the challenges
    let a = r
        .iter()
        .zip(&e)
        .fold(G::zero(), |acc, (r_i, e_i)| acc + *r_i * *e_i);
    let c = r.iter().fold(G::zero(), |acc, r_i| acc + *r_i);
    let f = s
        .iter()
        .zip(&e_prime)
        .fold(G::zero(), |acc, (s_j, e_j)| acc + *s_j * *e_j);
    let d = b
        .iter()
        .zip(&e_prime)
        .skip(1)
        .fold(b[0], |acc, (b_j, e_j)| *b_j + *e_j * acc);

    let proof = ShuffleProof {
        permutation_commitments: u,
        chain,
        chain_commitments,
        a_commitment,
        c_commitment,
        d_commitment,
        f_commitment,
        k_a: v * a + alpha,
        k_c: v * c + gamma,
        k_d: v * d + delta,
        k_f: v * f + phi,
        k_b: b.iter().zip(&beta).map(|(b_j, beta_j)| v * *b_j + *beta_j).collect(),
        k_e: e_prime
            .iter()
            .zip(&epsilon)
            .map(|(e_j, eps)| v * *e_j + *eps)
            .collect(),
    };

    debug!("shuffle proof constructed");
    Ok((shuffled, proof))
}

/// Check that `shuffled` is a permuted re-encryption of `original` under
/// `pk`. Any mismatch in lengths or any failing relation yields `false`.
#[instrument(level = "debug", skip_all, fields(len = original.len()))]
pub fn verify_shuffle<G: PrimeGroup>(
    pk: &G::Element,
    original: &[Ciphertext<G>],
    shuffled: &[Ciphertext<G>],
    proof: &ShuffleProof<G>,
) -> bool {
    let n = original.len();
    if n == 0
        || shuffled.len() != n
        || proof.permutation_commitments.len() != n
        || proof.chain.len() != n
        || proof.chain_commitments.len() != n
        || proof.k_b.len() != n
        || proof.k_e.len() != n
    {
        debug!("shuffle proof shape mismatch");
        return false;
    }

    let g = G::generator();
    let h = derive_generators::<G>(GENERATORS_LABEL, n);
    let u = &proof.permutation_commitments;

    let mut tr = statement_transcript(pk, original, shuffled, u);
    let e = challenge_e::<G>(&mut tr, n);
    let v = challenge_v(
        &mut tr,
        &proof.chain,
        &proof.chain_commitments,
        &proof.a_commitment,
        &proof.c_commitment,
        &proof.d_commitment,
        &proof.f_commitment,
    );

    // (1)
    let big_a = par_sum::<G>(u.par_iter().zip(e.par_iter()).map(|(u_i, e_i)| *u_i * *e_i));
    let lhs_1 = big_a * v + proof.a_commitment;
    let rhs_1 = g * proof.k_a
        + par_sum::<G>(h.par_iter().zip(proof.k_e.par_iter()).map(|(h_j, k)| *h_j * *k));

    // (2)
    let chain_ok = (0..n).into_par_iter().all(|j| {
        let prev = if j == 0 { h[0] } else { proof.chain[j - 1] };
        proof.chain[j] * v + proof.chain_commitments[j] == g * proof.k_b[j] + prev * proof.k_e[j]
    });

    // (3)
    let big_c = u.iter().fold(G::identity(), |acc, u_i| acc + *u_i)
        - h.iter().fold(G::identity(), |acc, h_j| acc + *h_j);
    let lhs_3 = big_c * v + proof.c_commitment;
    let rhs_3 = g * proof.k_c;

    // (4)
    let e_prod = e.iter().fold(G::one(), |acc, e_i| acc * *e_i);
    let big_d = proof.chain[n - 1] - h[0] * e_prod;
    let lhs_4 = big_d * v + proof.d_commitment;
    let rhs_4 = g * proof.k_d;

    // (5)
    let f1 = par_sum::<G>(original.par_iter().zip(e.par_iter()).map(|(w, e_i)| w.c1 * *e_i));
    let f2 = par_sum::<G>(original.par_iter().zip(e.par_iter()).map(|(w, e_i)| w.c2 * *e_i));
    let lhs_5 = (
        f1 * v + proof.f_commitment.c1,
        f2 * v + proof.f_commitment.c2,
    );
    let rhs_5 = (
        par_sum::<G>(shuffled.par_iter().zip(proof.k_e.par_iter()).map(|(w, k)| w.c1 * *k))
            - g * proof.k_f,
        par_sum::<G>(shuffled.par_iter().zip(proof.k_e.par_iter()).map(|(w, k)| w.c2 * *k))
            - *pk * proof.k_f,
    );

    let ok = lhs_1 == rhs_1 && chain_ok && lhs_3 == rhs_3 && lhs_4 == rhs_4 && lhs_5 == rhs_5;
    if !ok {
        debug!("shuffle proof relation failed");
    }
    ok
}
