// src/chunking.rs
//
// Long-message codec. A payload is cut into PARTITIONS chunks, each tagged
// with a per-message random nonce and its position, so chunks of many
// messages can be encrypted, mixed and shuffled independently and still be
// regrouped after decryption.
//
// Chunk layout (embedded into exactly one group element):
//   nonce (16 bytes) || index (1 byte) || payload (<= capacity - 17 bytes)

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::elgamal::{encrypt, Ciphertext};
use crate::error::{Error, Result};
use crate::group::{PrimeGroup, Ristretto};
use crate::randutil::random_bytes;

pub const NONCE_LEN: usize = 16;
pub const PARTITIONS: usize = 8;
pub const HEADER_LEN: usize = NONCE_LEN + 1;

/// Payload bytes per chunk on ristretto255.
pub const CHUNK_PAYLOAD: usize = <Ristretto as PrimeGroup>::EMBED_CAPACITY - HEADER_LEN;
/// Longest message accepted by [`split_message`] on ristretto255.
pub const MAX_MESSAGE_LEN: usize = PARTITIONS * CHUNK_PAYLOAD;

pub fn chunk_payload_len<G: PrimeGroup>() -> usize {
    G::EMBED_CAPACITY.saturating_sub(HEADER_LEN)
}

pub fn max_message_len<G: PrimeGroup>() -> usize {
    PARTITIONS * chunk_payload_len::<G>()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageChunk {
    pub nonce: [u8; NONCE_LEN],
    pub index: u8,
    pub payload: Vec<u8>,
}

impl MessageChunk {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.nonce);
        out.push(self.index);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::MalformedChunk(bytes.len()));
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[..NONCE_LEN]);
        Ok(Self {
            nonce,
            index: bytes[NONCE_LEN],
            payload: bytes[HEADER_LEN..].to_vec(),
        })
    }

    pub fn embed<G: PrimeGroup>(&self) -> Result<G::Element> {
        G::embed(&self.to_bytes())
    }
}

/// Cut `data` into [`PARTITIONS`] chunks sharing one fresh nonce. Trailing
/// chunks carry short or empty payloads when `data` does not fill them.
pub fn split_message<G: PrimeGroup>(data: &[u8]) -> Result<Vec<MessageChunk>> {
    let per_chunk = chunk_payload_len::<G>();
    let max = max_message_len::<G>();
    if data.len() > max {
        return Err(Error::PayloadTooLarge {
            len: data.len(),
            capacity: max,
        });
    }

    let nonce = random_bytes::<NONCE_LEN>();
    let chunks = (0..PARTITIONS)
        .map(|k| {
            let start = (k * per_chunk).min(data.len());
            let end = ((k + 1) * per_chunk).min(data.len());
            MessageChunk {
                nonce,
                index: k as u8,
                payload: data[start..end].to_vec(),
            }
        })
        .collect();
    debug!(nonce = %hex::encode(nonce), len = data.len(), "message split");
    Ok(chunks)
}

/// Split, embed and encrypt one message; one ciphertext per chunk.
pub fn encrypt_message<G: PrimeGroup>(pk: &G::Element, data: &[u8]) -> Result<Vec<Ciphertext<G>>> {
    split_message::<G>(data)?
        .iter()
        .map(|chunk| -> Result<Ciphertext<G>> { Ok(encrypt::<G>(&chunk.embed::<G>()?, pk)) })
        .collect()
}

/// Recover the chunk bytes carried by decrypted elements.
pub fn decode_chunks<G: PrimeGroup>(plaintexts: &[G::Element]) -> Result<Vec<Vec<u8>>> {
    plaintexts.iter().map(G::extract).collect()
}

fn reassemble(chunks: &[Vec<u8>], strict: bool) -> Result<Vec<Vec<u8>>> {
    if let Some(bad) = chunks.iter().find(|c| c.len() < HEADER_LEN) {
        return Err(Error::MalformedChunk(bad.len()));
    }

    // Sorting groups each nonce together, ordered by index byte.
    let mut sorted: Vec<&[u8]> = chunks.iter().map(Vec::as_slice).collect();
    sorted.sort_unstable();

    let mut messages: Vec<Vec<u8>> = Vec::new();
    let mut prev: Option<&[u8]> = None;
    for chunk in sorted {
        let (nonce, index) = (&chunk[..NONCE_LEN], chunk[NONCE_LEN]);
        let payload = &chunk[HEADER_LEN..];

        if let Some(p) = prev.filter(|p| p[..NONCE_LEN] == *nonce) {
            if p[NONCE_LEN] == index {
                if p != chunk {
                    if strict {
                        return Err(Error::ReconstructionMismatch {
                            nonce: hex::encode(nonce),
                            index,
                        });
                    }
                    warn!(
                        nonce = %hex::encode(nonce),
                        index,
                        "conflicting duplicate chunk ignored"
                    );
                }
                // keep the first chunk seen for this index
                continue;
            }
            if let Some(current) = messages.last_mut() {
                current.extend_from_slice(payload);
            }
        } else {
            messages.push(payload.to_vec());
        }
        prev = Some(chunk);
    }
    Ok(messages)
}

/// Regroup decrypted chunk bytes into messages.
///
/// Output order follows nonce byte order, not submission order. A chunk
/// repeating the index of the chunk before it is skipped; when its content
/// differs a warning is logged and the first one in sorted order wins.
pub fn reassemble_messages(chunks: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
    reassemble(chunks, false)
}

/// Like [`reassemble_messages`], but conflicting duplicates are an error.
pub fn reassemble_messages_strict(chunks: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
    reassemble(chunks, true)
}

pub fn reassemble_text(chunks: &[Vec<u8>]) -> Result<Vec<String>> {
    Ok(reassemble_messages(chunks)?
        .into_iter()
        .map(|m| String::from_utf8_lossy(&m).into_owned())
        .collect())
}
