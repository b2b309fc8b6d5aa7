// Integrity failures inside the DKG (bad deals, bad
// justifications) are reported through these variants but only abort a run
// when too few participants certify.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("payload of {len} bytes exceeds embedding capacity of {capacity} bytes")]
    PayloadTooLarge { len: usize, capacity: usize },

    #[error("no group element encodes the payload")]
    Embedding,

    #[error("group element does not carry an embedded payload")]
    Extraction,

    #[error("decoding failure: {0}")]
    Decoding(&'static str),

    #[error("invalid threshold parameters: n={n}, t={t}")]
    InvalidParameters { n: usize, t: usize },

    #[error("invalid deal from dealer {dealer}: {reason}")]
    InvalidDeal { dealer: u32, reason: &'static str },

    #[error("invalid justification from dealer {dealer}")]
    InvalidJustification { dealer: u32 },

    #[error("unexpected protocol message: {0}")]
    UnexpectedMessage(&'static str),

    #[error("participant is not certified")]
    NotCertified,

    #[error("key generation failed: {certified} participants certified, threshold is {threshold}")]
    DkgFailed { certified: usize, threshold: usize },

    #[error("certified participants {first} and {other} hold different public keys")]
    InconsistentPublicKey { first: u32, other: u32 },

    #[error("insufficient shares: required {required}, provided {provided}")]
    InsufficientShares { required: usize, provided: usize },

    #[error("duplicate share index: {0}")]
    DuplicateIndex(u32),

    #[error("share index {index} out of range for {n} participants")]
    IndexOutOfRange { index: u32, n: usize },

    #[error("empty ciphertext batch")]
    EmptyBatch,

    #[error("shuffle proof rejected")]
    ShuffleProofInvalid,

    #[error("malformed message chunk of {0} bytes")]
    MalformedChunk(usize),

    #[error("conflicting chunk content for nonce {nonce} at index {index}")]
    ReconstructionMismatch { nonce: String, index: u8 },

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
