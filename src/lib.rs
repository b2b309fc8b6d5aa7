pub mod chunking;
pub mod commitment;
pub mod dkg;
pub mod elgamal;
pub mod error;
pub mod group;
pub mod hash;
pub mod keygen;
pub mod network;
pub mod nizk;
pub mod protocol;
pub mod randutil;
pub mod shamir;
pub mod shuffle;
pub mod types;

pub use chunking::{reassemble_messages, split_message};
pub use elgamal::Ciphertext;
pub use error::{Error, Result};
pub use group::{PrimeGroup, Ristretto};
pub use keygen::create_threshold_shares;
pub use protocol::{
    decrypt_batch, decrypt_long_messages, encrypt_batch, encrypt_long_messages, shuffle_and_verify,
};
pub use shuffle::{shuffle, verify_shuffle};
pub use types::{DistKeyShare, Shadow, ThresholdParams};
