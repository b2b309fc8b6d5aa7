use sha2::{Digest, Sha512};

use crate::group::PrimeGroup;

// ===== Random Oracles =====
// Domain-separated SHA-512, then mapped by the group backend to:
// - Points via PrimeGroup::hash_to_element
// - Scalars via PrimeGroup::hash_to_scalar

/// Hash(len(domain) || domain || data) -> 64 bytes (SHA-512)
pub fn hash_64(domain: &[u8], data: &[u8]) -> [u8; 64] {
    let mut h = Sha512::new();
    h.update((domain.len() as u64).to_le_bytes());
    h.update(domain);
    h.update(data);
    let out = h.finalize();
    let mut r = [0u8; 64];
    r.copy_from_slice(&out[..64]);
    r
}

/// Fiat-Shamir transcript.
///
/// Every appended item is framed as `len(label) || label || len(msg) || msg`
/// into one running SHA-512 state. Challenges are derived from a clone of the
/// state and then folded back in, so two challenges drawn in sequence differ.
#[derive(Clone)]
pub struct Transcript {
    state: Sha512,
}

impl Transcript {
    pub fn new(domain: &[u8]) -> Self {
        let mut state = Sha512::new();
        state.update(b"threshold-tally.transcript.v1");
        state.update((domain.len() as u64).to_le_bytes());
        state.update(domain);
        Self { state }
    }

    pub fn append_message(&mut self, label: &[u8], message: &[u8]) {
        self.state.update((label.len() as u64).to_le_bytes());
        self.state.update(label);
        self.state.update((message.len() as u64).to_le_bytes());
        self.state.update(message);
    }

    pub fn append_u64(&mut self, label: &[u8], value: u64) {
        self.append_message(label, &value.to_le_bytes());
    }

    pub fn append_element<G: PrimeGroup>(&mut self, label: &[u8], e: &G::Element) {
        self.append_message(label, &G::element_to_bytes(e));
    }

    pub fn append_elements<G: PrimeGroup>(&mut self, label: &[u8], es: &[G::Element]) {
        self.append_u64(label, es.len() as u64);
        for e in es {
            self.append_element::<G>(label, e);
        }
    }

    pub fn challenge_bytes(&mut self, label: &[u8]) -> [u8; 64] {
        let mut fork = self.state.clone();
        fork.update(b"challenge");
        fork.update((label.len() as u64).to_le_bytes());
        fork.update(label);
        let out = fork.finalize();

        let mut r = [0u8; 64];
        r.copy_from_slice(&out[..64]);
        self.append_message(b"challenge_out", &r);
        r
    }

    pub fn challenge_scalar<G: PrimeGroup>(&mut self, label: &[u8]) -> G::Scalar {
        let bytes = self.challenge_bytes(label);
        G::hash_to_scalar(b"transcript.challenge", &bytes)
    }
}
