// src/nizk.rs
//
// Chaum-Pedersen proof that a shadow is honest: the same x_i links
//   Y = x_i·G   (the holder's public share, from the joint commitments)
//   S = x_i·c1  (the shadow)
// Made non-interactive with a Fiat-Shamir transcript.

use crate::elgamal::Ciphertext;
use crate::error::{Error, Result};
use crate::group::PrimeGroup;
use crate::hash::Transcript;
use crate::types::{DistKeyShare, Shadow};

const SHADOW_PROOF_DOMAIN: &[u8] = b"threshold-tally.shadow-dleq.v1";

/// Proof π := (XG, XC, z)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowProof<G: PrimeGroup> {
    pub xg: G::Element,
    pub xc: G::Element,
    pub z: G::Scalar,
}

impl<G: PrimeGroup> ShadowProof<G> {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = G::element_to_bytes(&self.xg);
        out.extend_from_slice(&G::element_to_bytes(&self.xc));
        out.extend_from_slice(&G::scalar_to_bytes(&self.z));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let el = G::ELEMENT_LEN;
        if bytes.len() != 2 * el + G::SCALAR_LEN {
            return Err(Error::Decoding("shadow proof length"));
        }
        Ok(Self {
            xg: G::element_from_bytes(&bytes[..el])?,
            xc: G::element_from_bytes(&bytes[el..2 * el])?,
            z: G::scalar_from_bytes(&bytes[2 * el..])?,
        })
    }
}

fn challenge<G: PrimeGroup>(
    ct: &Ciphertext<G>,
    index: u32,
    public_share: &G::Element,
    shadow: &G::Element,
    xg: &G::Element,
    xc: &G::Element,
) -> G::Scalar {
    let mut tr = Transcript::new(SHADOW_PROOF_DOMAIN);
    tr.append_u64(b"index", u64::from(index));
    tr.append_element::<G>(b"c1", &ct.c1);
    tr.append_element::<G>(b"c2", &ct.c2);
    tr.append_element::<G>(b"Y", public_share);
    tr.append_element::<G>(b"S", shadow);
    tr.append_element::<G>(b"XG", xg);
    tr.append_element::<G>(b"XC", xc);
    tr.challenge_scalar::<G>(b"e")
}

/// Shadow of `ct` under `share`, together with its proof of correctness.
pub fn prove_shadow<G: PrimeGroup>(
    ct: &Ciphertext<G>,
    share: &DistKeyShare<G>,
) -> (Shadow<G>, ShadowProof<G>) {
    let x = share.private_share;
    let y = G::generator() * x;
    let s = ct.c1 * x;

    let x_hat = G::random_scalar();
    // XG := x_hat·G, XC := x_hat·c1
    let xg = G::generator() * x_hat;
    let xc = ct.c1 * x_hat;

    let e = challenge(ct, share.index, &y, &s, &xg, &xc);
    let z = x_hat + x * e;

    (
        Shadow {
            index: share.index,
            value: s,
        },
        ShadowProof { xg, xc, z },
    )
}

/// Check `shadow` against the holder's public share `g·x_i`.
pub fn verify_shadow<G: PrimeGroup>(
    ct: &Ciphertext<G>,
    shadow: &Shadow<G>,
    proof: &ShadowProof<G>,
    public_share: &G::Element,
) -> bool {
    let e = challenge(ct, shadow.index, public_share, &shadow.value, &proof.xg, &proof.xc);

    // z·G == XG + e·Y
    let left1 = G::generator() * proof.z;
    let right1 = proof.xg + *public_share * e;

    // z·c1 == XC + e·S
    let left2 = ct.c1 * proof.z;
    let right2 = proof.xc + shadow.value * e;

    left1 == right1 && left2 == right2
}
