use serde::{Deserialize, Serialize};

use crate::commitment::FeldmanCommitments;
use crate::error::{Error, Result};
use crate::group::PrimeGroup;

/// Committee size and reconstruction threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdParams {
    pub n: usize,
    pub t: usize,
}

impl ThresholdParams {
    pub fn new(n: usize, t: usize) -> Result<Self> {
        let params = Self { n, t };
        params.validate()?;
        Ok(params)
    }

    /// 1 <= t <= n, and n must fit a participant index.
    pub fn validate(&self) -> Result<()> {
        if self.t == 0 || self.t > self.n || self.n > u32::MAX as usize {
            return Err(Error::InvalidParameters {
                n: self.n,
                t: self.t,
            });
        }
        Ok(())
    }
}

/// A certified participant's slice of the joint key.
#[derive(Clone, Debug)]
pub struct DistKeyShare<G: PrimeGroup> {
    pub index: u32,
    pub private_share: G::Scalar,
    pub public_key: G::Element,
    /// Aggregated commitments of the joint polynomial; `points[0]` is the
    /// public key.
    pub commitments: FeldmanCommitments<G>,
}

impl<G: PrimeGroup> DistKeyShare<G> {
    /// `g * x_i` for participant `index`, derivable by anyone from the
    /// commitments.
    pub fn public_share(&self, index: u32) -> G::Element {
        self.commitments.evaluate(index)
    }

    pub fn threshold(&self) -> usize {
        self.commitments.threshold()
    }
}

/// Partial decryption `c1 * x_i` contributed by participant `index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shadow<G: PrimeGroup> {
    pub index: u32,
    pub value: G::Element,
}
