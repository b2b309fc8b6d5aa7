// src/elgamal.rs
//
// ElGamal over a prime-order group, written additively:
//   Enc(M; r) = (r·G, M + r·PK)
// Threshold decryption: each share holder contributes a shadow x_i·c1, and
// any t shadows recover x·c1 = r·PK in the exponent.

use tracing::{instrument, warn};

use crate::error::{Error, Result};
use crate::group::PrimeGroup;
use crate::nizk::{verify_shadow, ShadowProof};
use crate::shamir::recover_commitment;
use crate::types::{DistKeyShare, Shadow};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ciphertext<G: PrimeGroup> {
    pub c1: G::Element,
    pub c2: G::Element,
}

impl<G: PrimeGroup> Ciphertext<G> {
    /// Canonical encoding `c1 || c2`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = G::element_to_bytes(&self.c1);
        out.extend_from_slice(&G::element_to_bytes(&self.c2));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 2 * G::ELEMENT_LEN {
            return Err(Error::Decoding("ciphertext length"));
        }
        let (a, b) = bytes.split_at(G::ELEMENT_LEN);
        Ok(Self {
            c1: G::element_from_bytes(a)?,
            c2: G::element_from_bytes(b)?,
        })
    }
}

pub fn encrypt<G: PrimeGroup>(message: &G::Element, pk: &G::Element) -> Ciphertext<G> {
    encrypt_with_r(message, pk, &G::random_scalar())
}

pub fn encrypt_with_r<G: PrimeGroup>(
    message: &G::Element,
    pk: &G::Element,
    r: &G::Scalar,
) -> Ciphertext<G> {
    Ciphertext {
        c1: G::generator() * *r,
        c2: *message + *pk * *r,
    }
}

/// Fresh blinding of an existing ciphertext: (c1 + s·G, c2 + s·PK).
/// Decrypts to the same message.
pub fn reencrypt<G: PrimeGroup>(
    ct: &Ciphertext<G>,
    pk: &G::Element,
    s: &G::Scalar,
) -> Ciphertext<G> {
    Ciphertext {
        c1: ct.c1 + G::generator() * *s,
        c2: ct.c2 + *pk * *s,
    }
}

pub fn extract_shadow<G: PrimeGroup>(ct: &Ciphertext<G>, share: &DistKeyShare<G>) -> Shadow<G> {
    Shadow {
        index: share.index,
        value: ct.c1 * share.private_share,
    }
}

/// Combine at least `t` shadows with unique indices in `[0, n)`.
#[instrument(level = "trace", skip_all, fields(t, n, shadows = shadows.len()))]
pub fn decrypt<G: PrimeGroup>(
    ct: &Ciphertext<G>,
    shadows: &[Shadow<G>],
    t: usize,
    n: usize,
) -> Result<G::Element> {
    let blind = recover_commitment(shadows, t, n)?;
    Ok(ct.c2 - blind)
}

/// Like [`decrypt`], but first drops every shadow whose proof does not
/// verify against the share holder's public share.
pub fn decrypt_verified<G: PrimeGroup>(
    ct: &Ciphertext<G>,
    proven: &[(Shadow<G>, ShadowProof<G>)],
    key: &DistKeyShare<G>,
    n: usize,
) -> Result<G::Element> {
    let t = key.threshold();
    let mut valid = Vec::with_capacity(proven.len());
    for (shadow, proof) in proven {
        if (shadow.index as usize) < n
            && verify_shadow(ct, shadow, proof, &key.public_share(shadow.index))
        {
            valid.push(*shadow);
        } else {
            warn!(index = shadow.index, "dropping shadow with invalid proof");
        }
    }
    decrypt(ct, &valid, t, n)
}

/// Decryption with the whole secret key.
pub fn decrypt_with_secret<G: PrimeGroup>(ct: &Ciphertext<G>, x: &G::Scalar) -> G::Element {
    ct.c2 - ct.c1 * *x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Ristretto;
    use crate::nizk::prove_shadow;

    type G = Ristretto;

    #[test]
    fn single_key_roundtrip() {
        let x = G::random_scalar();
        let pk = G::generator() * x;
        let m = G::embed(b"hello").unwrap();
        let ct = encrypt::<G>(&m, &pk);
        assert_eq!(decrypt_with_secret(&ct, &x), m);
    }

    #[test]
    fn reencryption_preserves_plaintext() {
        let x = G::random_scalar();
        let pk = G::generator() * x;
        let m = G::random_element();
        let ct = encrypt::<G>(&m, &pk);
        let ct2 = reencrypt(&ct, &pk, &G::random_scalar());
        assert_ne!(ct, ct2);
        assert_eq!(decrypt_with_secret(&ct2, &x), m);
    }

    #[test]
    fn deterministic_randomness_gives_identical_ciphertexts() {
        let pk = G::random_element();
        let m = G::random_element();
        let r = G::random_scalar();
        assert_eq!(encrypt_with_r::<G>(&m, &pk, &r), encrypt_with_r::<G>(&m, &pk, &r));
    }

    #[test]
    fn ciphertext_bytes() {
        let ct = encrypt::<G>(&G::random_element(), &G::random_element());
        let bytes = ct.to_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(Ciphertext::<G>::from_bytes(&bytes).unwrap(), ct);
        assert!(Ciphertext::<G>::from_bytes(&bytes[..63]).is_err());
    }

    #[test]
    fn verified_decryption_drops_forged_shadows() {
        let shares = crate::keygen::create_threshold_shares::<G>(4, 2).unwrap();
        let m = G::embed(b"VOTE:D").unwrap();
        let ct = encrypt::<G>(&m, &shares[0].public_key);
        let mut proven: Vec<_> = shares[..3].iter().map(|s| prove_shadow(&ct, s)).collect();
        proven[1].0.value = G::random_element();

        assert_eq!(decrypt_verified(&ct, &proven, &shares[0], 4).unwrap(), m);
        assert_eq!(
            decrypt_verified(&ct, &proven[1..2], &shares[0], 4).unwrap_err(),
            Error::InsufficientShares { required: 2, provided: 0 }
        );
    }
}
