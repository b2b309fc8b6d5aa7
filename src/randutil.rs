use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;

use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::{RngCore, TryRngCore};

/// Fill a fixed-size buffer from the OS generator. Every call draws fresh
/// bytes, so concurrent callers never share generator state.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.unwrap_err().fill_bytes(&mut bytes);
    bytes
}

pub fn random_scalar() -> Scalar {
    Scalar::from_bytes_mod_order_wide(&random_bytes::<64>())
}

pub fn random_point() -> RistrettoPoint {
    RistrettoPoint::from_uniform_bytes(&random_bytes::<64>())
}

/// Uniform permutation of `0..n` in one-line notation: position `i` of the
/// output holds the source index that lands there.
pub fn random_permutation(n: usize) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(&mut OsRng.unwrap_err());
    perm
}

pub fn hash_to_scalar(bytes: &[u8]) -> Scalar {
    let mut wide = [0u8; 64];
    let take = bytes.len().min(64);
    wide[..take].copy_from_slice(&bytes[..take]);
    Scalar::from_bytes_mod_order_wide(&wide)
}

pub fn hash_to_point(bytes: &[u8]) -> RistrettoPoint {
    let mut wide = [0u8; 64];
    let take = bytes.len().min(64);
    wide[..take].copy_from_slice(&bytes[..take]);
    RistrettoPoint::from_uniform_bytes(&wide)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_covers_every_index_once() {
        let mut perm = random_permutation(50);
        perm.sort_unstable();
        assert_eq!(perm, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn random_draws_differ() {
        assert_ne!(random_scalar(), random_scalar());
        assert_ne!(random_bytes::<16>(), random_bytes::<16>());
    }
}
