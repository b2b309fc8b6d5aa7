// src/group.rs
//
// Prime-order group abstraction used by every protocol layer, and the
// ristretto255 backend.

use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;

use crate::error::{Error, Result};
use crate::hash::hash_64;
use crate::randutil;

/// A cyclic group of prime order with an invertible byte embedding.
///
/// Elements are written additively: `a + b` is the group operation and
/// `e * k` is scalar multiplication. Canonical encodings are deterministic,
/// so byte order can be used for sorting and hashing.
pub trait PrimeGroup: Copy + Debug + Default + Eq + Send + Sync + 'static {
    type Scalar: Copy
        + Debug
        + Eq
        + Send
        + Sync
        + Add<Output = Self::Scalar>
        + Sub<Output = Self::Scalar>
        + Mul<Output = Self::Scalar>
        + Neg<Output = Self::Scalar>;

    type Element: Copy
        + Debug
        + Eq
        + Send
        + Sync
        + Add<Output = Self::Element>
        + Sub<Output = Self::Element>
        + Neg<Output = Self::Element>
        + Mul<Self::Scalar, Output = Self::Element>;

    /// Length of a canonical element encoding.
    const ELEMENT_LEN: usize;
    /// Length of a canonical scalar encoding.
    const SCALAR_LEN: usize;
    /// Maximum payload carried by one embedded element.
    const EMBED_CAPACITY: usize;

    fn generator() -> Self::Element;
    fn identity() -> Self::Element;

    fn scalar_from_u64(x: u64) -> Self::Scalar;
    fn zero() -> Self::Scalar {
        Self::scalar_from_u64(0)
    }
    fn one() -> Self::Scalar {
        Self::scalar_from_u64(1)
    }
    /// Multiplicative inverse. Zero maps to zero.
    fn invert(s: &Self::Scalar) -> Self::Scalar;

    fn random_scalar() -> Self::Scalar;
    fn random_element() -> Self::Element;

    fn hash_to_scalar(domain: &[u8], data: &[u8]) -> Self::Scalar;
    fn hash_to_element(domain: &[u8], data: &[u8]) -> Self::Element;

    fn element_to_bytes(e: &Self::Element) -> Vec<u8>;
    fn element_from_bytes(bytes: &[u8]) -> Result<Self::Element>;
    fn scalar_to_bytes(s: &Self::Scalar) -> Vec<u8>;
    fn scalar_from_bytes(bytes: &[u8]) -> Result<Self::Scalar>;

    /// Map at most `EMBED_CAPACITY` bytes into an element.
    fn embed(data: &[u8]) -> Result<Self::Element>;
    /// Recover the bytes placed by [`PrimeGroup::embed`].
    fn extract(e: &Self::Element) -> Result<Vec<u8>>;
}

/// Sum of a sequence of elements (the identity for an empty sequence).
pub fn sum_elements<G: PrimeGroup>(items: impl IntoIterator<Item = G::Element>) -> G::Element {
    items.into_iter().fold(G::identity(), |acc, e| acc + e)
}

pub fn sum_scalars<G: PrimeGroup>(items: impl IntoIterator<Item = G::Scalar>) -> G::Scalar {
    items.into_iter().fold(G::zero(), |acc, s| acc + s)
}

/// ristretto255 over curve25519.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ristretto;

// Embedding layout of the 32-byte compressed encoding:
//   [0]      probe byte, always even so the encoding stays non-negative
//   [1]      payload length
//   [2..31]  payload, zero padded
//   [31]     probe byte below 64 so the value stays under the field modulus
const EMBED_LEN_POS: usize = 1;
const EMBED_DATA_POS: usize = 2;
const EMBED_PROBE_HI: usize = 31;

impl PrimeGroup for Ristretto {
    type Scalar = Scalar;
    type Element = RistrettoPoint;

    const ELEMENT_LEN: usize = 32;
    const SCALAR_LEN: usize = 32;
    const EMBED_CAPACITY: usize = EMBED_PROBE_HI - EMBED_DATA_POS;

    fn generator() -> RistrettoPoint {
        RISTRETTO_BASEPOINT_POINT
    }

    fn identity() -> RistrettoPoint {
        RistrettoPoint::identity()
    }

    fn scalar_from_u64(x: u64) -> Scalar {
        Scalar::from(x)
    }

    fn invert(s: &Scalar) -> Scalar {
        if *s == Scalar::ZERO {
            Scalar::ZERO
        } else {
            s.invert()
        }
    }

    fn random_scalar() -> Scalar {
        randutil::random_scalar()
    }

    fn random_element() -> RistrettoPoint {
        randutil::random_point()
    }

    fn hash_to_scalar(domain: &[u8], data: &[u8]) -> Scalar {
        randutil::hash_to_scalar(&hash_64(domain, data))
    }

    fn hash_to_element(domain: &[u8], data: &[u8]) -> RistrettoPoint {
        randutil::hash_to_point(&hash_64(domain, data))
    }

    fn element_to_bytes(e: &RistrettoPoint) -> Vec<u8> {
        e.compress().to_bytes().to_vec()
    }

    fn element_from_bytes(bytes: &[u8]) -> Result<RistrettoPoint> {
        CompressedRistretto::from_slice(bytes)
            .map_err(|_| Error::Decoding("ristretto point must be 32 bytes"))?
            .decompress()
            .ok_or(Error::Decoding("not a canonical ristretto point"))
    }

    fn scalar_to_bytes(s: &Scalar) -> Vec<u8> {
        s.to_bytes().to_vec()
    }

    fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Decoding("scalar must be 32 bytes"))?;
        Option::from(Scalar::from_canonical_bytes(arr))
            .ok_or(Error::Decoding("non-canonical scalar"))
    }

    fn embed(data: &[u8]) -> Result<RistrettoPoint> {
        if data.len() > Self::EMBED_CAPACITY {
            return Err(Error::PayloadTooLarge {
                len: data.len(),
                capacity: Self::EMBED_CAPACITY,
            });
        }

        let mut bytes = [0u8; 32];
        bytes[EMBED_LEN_POS] = data.len() as u8;
        bytes[EMBED_DATA_POS..EMBED_DATA_POS + data.len()].copy_from_slice(data);

        // Roughly one candidate in eight decodes, so the search ends quickly.
        for hi in 0..64u8 {
            bytes[EMBED_PROBE_HI] = hi;
            for lo in 0..128u8 {
                bytes[0] = lo << 1;
                if let Some(point) = CompressedRistretto(bytes).decompress() {
                    return Ok(point);
                }
            }
        }
        Err(Error::Embedding)
    }

    fn extract(e: &RistrettoPoint) -> Result<Vec<u8>> {
        let bytes = e.compress().to_bytes();
        let len = bytes[EMBED_LEN_POS] as usize;
        if len > Self::EMBED_CAPACITY {
            return Err(Error::Extraction);
        }
        let end = EMBED_DATA_POS + len;
        if bytes[end..EMBED_PROBE_HI].iter().any(|b| *b != 0) {
            return Err(Error::Extraction);
        }
        Ok(bytes[EMBED_DATA_POS..end].to_vec())
    }
}
