// src/protocol.rs
//
// Batch entry points used by the benchmark driver and by callers that work
// on whole ballot lists rather than single ciphertexts.

use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::chunking::{decode_chunks, encrypt_message, reassemble_messages};
use crate::elgamal::{decrypt, decrypt_verified, encrypt, extract_shadow, Ciphertext};
use crate::error::{Error, Result};
use crate::group::PrimeGroup;
use crate::nizk::prove_shadow;
use crate::shuffle::{shuffle, verify_shuffle};
use crate::types::DistKeyShare;

/// Encrypt every message under `pk`, in parallel.
#[instrument(level = "info", skip_all, fields(len = messages.len()))]
pub fn encrypt_batch<G: PrimeGroup>(
    pk: &G::Element,
    messages: &[G::Element],
) -> Vec<Ciphertext<G>> {
    messages.par_iter().map(|m| encrypt::<G>(m, pk)).collect()
}

/// Every holder in `shares` contributes a shadow for every ciphertext, then
/// each ciphertext is decrypted from those shadows.
#[instrument(
    level = "info",
    skip_all,
    fields(len = ciphertexts.len(), holders = shares.len(), t, n)
)]
pub fn decrypt_batch<G: PrimeGroup>(
    ciphertexts: &[Ciphertext<G>],
    shares: &[DistKeyShare<G>],
    t: usize,
    n: usize,
) -> Result<Vec<G::Element>> {
    ciphertexts
        .par_iter()
        .map(|ct| {
            let shadows: Vec<_> = shares.iter().map(|s| extract_shadow(ct, s)).collect();
            decrypt(ct, &shadows, t, n)
        })
        .collect()
}

/// Like [`decrypt_batch`], but every shadow carries a proof and shadows
/// whose proof fails are left out.
#[instrument(level = "info", skip_all, fields(len = ciphertexts.len(), holders = shares.len(), n))]
pub fn decrypt_batch_verified<G: PrimeGroup>(
    ciphertexts: &[Ciphertext<G>],
    shares: &[DistKeyShare<G>],
    n: usize,
) -> Result<Vec<G::Element>> {
    let key = shares.first().ok_or(Error::InsufficientShares {
        required: 1,
        provided: 0,
    })?;
    ciphertexts
        .par_iter()
        .map(|ct| {
            let proven: Vec<_> = shares.iter().map(|s| prove_shadow(ct, s)).collect();
            decrypt_verified(ct, &proven, key, n)
        })
        .collect()
}

/// Shuffle and immediately check the proof; a batch whose proof fails must
/// be discarded.
#[instrument(level = "info", skip_all, fields(len = ciphertexts.len()))]
pub fn shuffle_and_verify<G: PrimeGroup>(
    pk: &G::Element,
    ciphertexts: &[Ciphertext<G>],
) -> Result<Vec<Ciphertext<G>>> {
    let (shuffled, proof) = shuffle(pk, ciphertexts)?;
    if !verify_shuffle(pk, ciphertexts, &shuffled, &proof) {
        warn!("shuffle proof rejected");
        return Err(Error::ShuffleProofInvalid);
    }
    debug!(proof_bytes = proof.to_bytes().len(), "shuffle verified");
    Ok(shuffled)
}

/// Chunk, embed and encrypt each payload. The result holds every chunk of
/// every payload, ready to be mixed.
#[instrument(level = "info", skip_all, fields(payloads = payloads.len()))]
pub fn encrypt_long_messages<G: PrimeGroup, P: AsRef<[u8]> + Sync>(
    pk: &G::Element,
    payloads: &[P],
) -> Result<Vec<Ciphertext<G>>> {
    let per_message: Vec<Vec<Ciphertext<G>>> = payloads
        .par_iter()
        .map(|p| encrypt_message::<G>(pk, p.as_ref()))
        .collect::<Result<_>>()?;
    Ok(per_message.into_iter().flatten().collect())
}

/// Threshold-decrypt chunk ciphertexts (in any order) and regroup them into
/// payloads, ordered by nonce.
#[instrument(level = "info", skip_all, fields(len = ciphertexts.len(), t, n))]
pub fn decrypt_long_messages<G: PrimeGroup>(
    ciphertexts: &[Ciphertext<G>],
    shares: &[DistKeyShare<G>],
    t: usize,
    n: usize,
) -> Result<Vec<Vec<u8>>> {
    let plaintexts = decrypt_batch(ciphertexts, shares, t, n)?;
    reassemble_messages(&decode_chunks::<G>(&plaintexts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::PARTITIONS;
    use crate::group::Ristretto;
    use crate::keygen::create_threshold_shares;

    type G = Ristretto;

    #[test]
    fn batch_roundtrip_with_threshold_subset() {
        let shares = create_threshold_shares::<G>(4, 2).unwrap();
        let pk = shares[0].public_key;
        let msgs: Vec<_> = ["a", "bb", "ccc"]
            .iter()
            .map(|s| G::embed(s.as_bytes()).unwrap())
            .collect();
        let cts = encrypt_batch::<G>(&pk, &msgs);
        assert_eq!(decrypt_batch(&cts, &shares[1..3], 2, 4).unwrap(), msgs);
        assert_eq!(decrypt_batch(&cts, &shares, 2, 4).unwrap(), msgs);
        assert_eq!(decrypt_batch_verified(&cts, &shares[2..], 4).unwrap(), msgs);
        assert_eq!(
            decrypt_batch(&cts, &shares[..1], 2, 4).unwrap_err(),
            Error::InsufficientShares { required: 2, provided: 1 }
        );
    }

    #[test]
    fn long_messages_survive_shuffle() {
        let shares = create_threshold_shares::<G>(3, 2).unwrap();
        let pk = shares[0].public_key;
        let payloads = [
            "Hello. My name is BOB. I vote for Smith.",
            "HMMM... I pass.",
            "This is an example message. As you can see, these messages can be quite long!",
        ];
        let cts = encrypt_long_messages::<G, _>(&pk, &payloads).unwrap();
        assert_eq!(cts.len(), payloads.len() * PARTITIONS);

        let mixed = shuffle_and_verify(&pk, &cts).unwrap();
        let mut out = decrypt_long_messages(&mixed, &shares[..2], 2, 3).unwrap();
        out.sort();
        let mut want: Vec<Vec<u8>> = payloads.iter().map(|p| p.as_bytes().to_vec()).collect();
        want.sort();
        assert_eq!(out, want);
    }

    #[test]
    fn empty_shuffle_is_an_error() {
        let pk = G::random_element();
        assert_eq!(
            shuffle_and_verify::<G>(&pk, &[]).unwrap_err(),
            Error::EmptyBatch
        );
    }
}
