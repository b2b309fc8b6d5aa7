// src/dkg.rs
//
// Pedersen distributed key generation, one state machine per participant.
//
//   Initialized --deals()--> DealsIssued --close_response_round()-->
//   ResponsesProcessed --finalize()--> Certified | Disqualified
//
// Round 1: every dealer sends each other participant a Deal: its Feldman
//          commitments plus the share p(x_j) sealed with AES-256-GCM under a
//          key derived from the Diffie-Hellman point of the identity keys.
// Round 2: every recipient broadcasts a Response (Approved or Complaint)
//          carrying the digest of the commitments it was shown, and a
//          MissingDeal complaint for every deal that never arrived. A
//          dealer whose digests disagree showed different polynomials to
//          different recipients and is marked bad by everyone.
// Round 3: a dealer answers each complaint against it with a public
//          Justification revealing the disputed share.
// Finally every participant computes the same QUAL set from the broadcast
// messages and sums the shares of the QUAL dealers.

use std::collections::{BTreeMap, BTreeSet};

use aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::commitment::FeldmanCommitments;
use crate::error::{Error, Result};
use crate::group::{sum_scalars, PrimeGroup};
use crate::randutil::random_bytes;
use crate::shamir::Poly;
use crate::types::{DistKeyShare, ThresholdParams};

const DEAL_KDF_SALT: &[u8] = b"threshold-tally.dkg.deal-key.v1";
const DEAL_NONCE_LEN: usize = 12;

/// Ephemeral identity keypair used only to seal deals.
#[derive(Clone, Debug)]
pub struct IdentityKey<G: PrimeGroup> {
    secret: G::Scalar,
    public: G::Element,
}

impl<G: PrimeGroup> IdentityKey<G> {
    pub fn generate() -> Self {
        let secret = G::random_scalar();
        Self {
            secret,
            public: G::generator() * secret,
        }
    }

    pub fn public(&self) -> G::Element {
        self.public
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedShare {
    pub nonce: [u8; DEAL_NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deal<G: PrimeGroup> {
    pub dealer: u32,
    pub recipient: u32,
    pub commitments: FeldmanCommitments<G>,
    pub encrypted_share: EncryptedShare,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplaintReason {
    UndecryptableShare,
    MalformedCommitments,
    ShareMismatch,
    MissingDeal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Approved,
    Complaint(ComplaintReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub dealer: u32,
    pub responder: u32,
    pub verdict: Verdict,
    /// Digest of the commitments the verdict was reached on; `None` when
    /// no deal arrived.
    pub commitments: Option<[u8; 32]>,
}

/// Public opening of the share `dealer` owes `recipient`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Justification<G: PrimeGroup> {
    pub dealer: u32,
    pub recipient: u32,
    pub share: G::Scalar,
    pub commitments: FeldmanCommitments<G>,
}

/// Everything participants exchange during key generation.
#[derive(Clone, Debug)]
pub enum DkgMessage<G: PrimeGroup> {
    Deal(Deal<G>),
    Response(Response),
    Justification(Justification<G>),
}

#[derive(Clone, Debug)]
pub enum ParticipantState<G: PrimeGroup> {
    Initialized,
    DealsIssued,
    ResponsesProcessed,
    Certified(DistKeyShare<G>),
    Disqualified,
}

macro_rules! expect_state {
    ($self:ident, $state:ident) => {
        if !matches!($self.state, ParticipantState::$state) {
            return Err(Error::UnexpectedMessage(concat!(
                "participant is not in state ",
                stringify!($state)
            )));
        }
    };
}

/// What this participant learned from one dealer.
#[derive(Clone, Debug)]
struct DealerRecord<G: PrimeGroup> {
    commitments: FeldmanCommitments<G>,
    share: Option<G::Scalar>,
}

pub struct Participant<G: PrimeGroup> {
    index: u32,
    params: ThresholdParams,
    identity: IdentityKey<G>,
    identities: Vec<G::Element>,
    poly: Poly<G>,
    commitments: FeldmanCommitments<G>,

    received: BTreeMap<u32, DealerRecord<G>>,
    approvals: BTreeMap<u32, BTreeSet<u32>>,
    complaints: BTreeMap<u32, BTreeSet<u32>>,
    bad_dealers: BTreeSet<u32>,
    qual: Vec<u32>,

    state: ParticipantState<G>,
}

fn deal_cipher<G: PrimeGroup>(
    secret: &G::Scalar,
    peer: &G::Element,
    dealer: u32,
    recipient: u32,
) -> Result<Aes256Gcm> {
    let dh = *peer * *secret;
    let hk = Hkdf::<Sha256>::new(Some(DEAL_KDF_SALT), &G::element_to_bytes(&dh));
    let mut info = Vec::with_capacity(8);
    info.extend_from_slice(&dealer.to_le_bytes());
    info.extend_from_slice(&recipient.to_le_bytes());
    let mut okm = [0u8; 32];
    hk.expand(&info, &mut okm).map_err(|_| Error::InvalidDeal {
        dealer,
        reason: "deal key derivation",
    })?;
    Aes256Gcm::new_from_slice(&okm).map_err(|_| Error::InvalidDeal {
        dealer,
        reason: "deal key length",
    })
}

/// The commitments travel in the clear but are bound to the sealed share.
fn deal_aad<G: PrimeGroup>(
    dealer: u32,
    recipient: u32,
    commitments: &FeldmanCommitments<G>,
) -> Vec<u8> {
    let mut aad = Vec::new();
    aad.extend_from_slice(&dealer.to_le_bytes());
    aad.extend_from_slice(&recipient.to_le_bytes());
    aad.extend_from_slice(&commitments.to_bytes());
    aad
}

impl<G: PrimeGroup> Participant<G> {
    /// `identities[i]` is the identity public key of participant `i`; the
    /// committee size is `identities.len()`.
    pub fn new(
        index: u32,
        identity: IdentityKey<G>,
        identities: Vec<G::Element>,
        t: usize,
    ) -> Result<Self> {
        let params = ThresholdParams::new(identities.len(), t)?;
        if index as usize >= params.n {
            return Err(Error::IndexOutOfRange {
                index,
                n: params.n,
            });
        }
        if identities[index as usize] != identity.public {
            return Err(Error::UnexpectedMessage("identity key does not match index"));
        }

        let poly = Poly::random(t);
        let commitments = FeldmanCommitments::commit(&poly);
        Ok(Self {
            index,
            params,
            identity,
            identities,
            poly,
            commitments,
            received: BTreeMap::new(),
            approvals: BTreeMap::new(),
            complaints: BTreeMap::new(),
            bad_dealers: BTreeSet::new(),
            qual: Vec::new(),
            state: ParticipantState::Initialized,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn params(&self) -> ThresholdParams {
        self.params
    }

    pub fn state(&self) -> &ParticipantState<G> {
        &self.state
    }

    pub fn is_certified(&self) -> bool {
        matches!(self.state, ParticipantState::Certified(_))
    }

    /// Qualified dealers, available once finalized.
    pub fn qual(&self) -> &[u32] {
        &self.qual
    }

    pub fn dist_key_share(&self) -> Result<DistKeyShare<G>> {
        match &self.state {
            ParticipantState::Certified(share) => Ok(share.clone()),
            _ => Err(Error::NotCertified),
        }
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if index as usize >= self.params.n {
            return Err(Error::IndexOutOfRange {
                index,
                n: self.params.n,
            });
        }
        Ok(())
    }

    /// One sealed deal for every other participant. The dealer keeps its own
    /// share.
    pub fn deals(&mut self) -> Result<Vec<Deal<G>>> {
        expect_state!(self, Initialized);

        let mut deals = Vec::with_capacity(self.params.n.saturating_sub(1));
        for (j, peer) in self.identities.iter().enumerate() {
            let recipient = j as u32;
            if recipient == self.index {
                continue;
            }
            let share = self.poly.share_for(recipient);
            let cipher = deal_cipher::<G>(&self.identity.secret, peer, self.index, recipient)?;
            let nonce = random_bytes::<DEAL_NONCE_LEN>();
            let aad = deal_aad(self.index, recipient, &self.commitments);
            let ciphertext = cipher
                .encrypt(
                    Nonce::from_slice(&nonce),
                    Payload {
                        msg: &G::scalar_to_bytes(&share),
                        aad: &aad,
                    },
                )
                .map_err(|_| Error::InvalidDeal {
                    dealer: self.index,
                    reason: "share encryption",
                })?;
            deals.push(Deal {
                dealer: self.index,
                recipient,
                commitments: self.commitments.clone(),
                encrypted_share: EncryptedShare { nonce, ciphertext },
            });
        }

        self.received.insert(
            self.index,
            DealerRecord {
                commitments: self.commitments.clone(),
                share: Some(self.poly.share_for(self.index)),
            },
        );
        self.state = ParticipantState::DealsIssued;
        debug!(dealer = self.index, deals = deals.len(), "deals issued");
        Ok(deals)
    }

    fn open_deal(&self, deal: &Deal<G>) -> std::result::Result<G::Scalar, ComplaintReason> {
        if deal.commitments.threshold() != self.params.t {
            return Err(ComplaintReason::MalformedCommitments);
        }
        let peer = &self.identities[deal.dealer as usize];
        let cipher = deal_cipher::<G>(&self.identity.secret, peer, deal.dealer, deal.recipient)
            .map_err(|_| ComplaintReason::UndecryptableShare)?;
        let aad = deal_aad(deal.dealer, deal.recipient, &deal.commitments);
        let plain = cipher
            .decrypt(
                Nonce::from_slice(&deal.encrypted_share.nonce),
                Payload {
                    msg: &deal.encrypted_share.ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| ComplaintReason::UndecryptableShare)?;
        let share = G::scalar_from_bytes(&plain).map_err(|_| ComplaintReason::UndecryptableShare)?;
        if !deal.commitments.verify_share(self.index, &share) {
            return Err(ComplaintReason::ShareMismatch);
        }
        Ok(share)
    }

    /// Open and check a deal addressed to this participant.
    pub fn process_deal(&mut self, deal: &Deal<G>) -> Result<Response> {
        expect_state!(self, DealsIssued);
        self.check_index(deal.dealer)?;
        if deal.recipient != self.index {
            return Err(Error::UnexpectedMessage("deal addressed to another participant"));
        }
        if deal.dealer == self.index {
            return Err(Error::InvalidDeal {
                dealer: deal.dealer,
                reason: "deal to self",
            });
        }
        if self.received.contains_key(&deal.dealer) {
            return Err(Error::InvalidDeal {
                dealer: deal.dealer,
                reason: "duplicate deal",
            });
        }
        if self.has_complained(deal.dealer) {
            return Err(Error::InvalidDeal {
                dealer: deal.dealer,
                reason: "deal arrived after the deal round closed",
            });
        }

        let opened = self.open_deal(deal);
        let verdict = match opened {
            Ok(_) => Verdict::Approved,
            Err(reason) => {
                warn!(
                    dealer = deal.dealer,
                    recipient = self.index,
                    ?reason,
                    "complaint against deal"
                );
                Verdict::Complaint(reason)
            }
        };
        self.received.insert(
            deal.dealer,
            DealerRecord {
                commitments: deal.commitments.clone(),
                share: opened.ok(),
            },
        );

        let response = Response {
            dealer: deal.dealer,
            responder: self.index,
            verdict,
            commitments: Some(deal.commitments.digest()),
        };
        self.record_response(&response);
        Ok(response)
    }

    fn has_complained(&self, dealer: u32) -> bool {
        self.complaints
            .get(&dealer)
            .is_some_and(|c| c.contains(&self.index))
    }

    /// Close the deal round: one `MissingDeal` complaint for every dealer
    /// whose deal has not arrived. The dealer must then open the share
    /// publicly or drop out of QUAL.
    pub fn complain_missing_deals(&mut self) -> Result<Vec<Response>> {
        expect_state!(self, DealsIssued);
        let missing: Vec<u32> = (0..self.params.n as u32)
            .filter(|d| !self.received.contains_key(d) && !self.has_complained(*d))
            .collect();
        let mut responses = Vec::with_capacity(missing.len());
        for dealer in missing {
            warn!(dealer, recipient = self.index, "no deal received");
            let response = Response {
                dealer,
                responder: self.index,
                verdict: Verdict::Complaint(ComplaintReason::MissingDeal),
                commitments: None,
            };
            self.record_response(&response);
            responses.push(response);
        }
        Ok(responses)
    }

    fn record_response(&mut self, response: &Response) {
        let book = match response.verdict {
            Verdict::Approved => &mut self.approvals,
            Verdict::Complaint(_) => &mut self.complaints,
        };
        book.entry(response.dealer).or_default().insert(response.responder);
    }

    /// Record a broadcast response. Returns a justification when the
    /// complaint targets this participant's own deal.
    pub fn process_response(&mut self, response: &Response) -> Result<Option<Justification<G>>> {
        expect_state!(self, DealsIssued);
        self.check_index(response.dealer)?;
        self.check_index(response.responder)?;
        if response.responder == self.index {
            return Ok(None);
        }
        if response.responder == response.dealer {
            return Err(Error::UnexpectedMessage("response to own deal"));
        }
        self.record_response(response);

        // a dealer must show every recipient the same commitments
        let shown = self.received.get(&response.dealer);
        if let (Some(theirs), Some(ours)) = (response.commitments, shown) {
            if theirs != ours.commitments.digest() && self.bad_dealers.insert(response.dealer) {
                warn!(
                    dealer = response.dealer,
                    responder = response.responder,
                    "dealer sent conflicting commitments"
                );
            }
        }

        match response.verdict {
            Verdict::Complaint(reason) if response.dealer == self.index => {
                debug!(
                    dealer = self.index,
                    recipient = response.responder,
                    ?reason,
                    "justifying deal"
                );
                let justification = Justification {
                    dealer: self.index,
                    recipient: response.responder,
                    share: self.poly.share_for(response.responder),
                    commitments: self.commitments.clone(),
                };
                // broadcasts never reach the sender, so the dealer checks its
                // own opening here
                if let Err(e) = self.apply_justification(&justification) {
                    debug!(dealer = self.index, error = %e, "own justification rejected");
                }
                Ok(Some(justification))
            }
            _ => Ok(None),
        }
    }

    /// No further responses will arrive; justifications may follow.
    pub fn close_response_round(&mut self) -> Result<()> {
        expect_state!(self, DealsIssued);
        self.state = ParticipantState::ResponsesProcessed;
        Ok(())
    }

    /// Check a dealer's public opening. A valid one resolves the complaint
    /// (and hands the share to the complaining recipient); an invalid one
    /// marks the dealer bad and is reported as `InvalidJustification`.
    pub fn process_justification(&mut self, justification: &Justification<G>) -> Result<()> {
        expect_state!(self, ResponsesProcessed);
        self.check_index(justification.dealer)?;
        self.check_index(justification.recipient)?;
        if justification.dealer == self.index {
            // applied when it was issued
            return Ok(());
        }
        self.apply_justification(justification)
    }

    fn apply_justification(&mut self, justification: &Justification<G>) -> Result<()> {
        let (dealer, recipient) = (justification.dealer, justification.recipient);
        let pending = self
            .complaints
            .get(&dealer)
            .is_some_and(|c| c.contains(&recipient));
        if !pending {
            return Err(Error::UnexpectedMessage("justification without complaint"));
        }

        let consistent = self
            .received
            .get(&dealer)
            .map_or(true, |r| r.commitments == justification.commitments);
        let valid = consistent
            && justification.commitments.threshold() == self.params.t
            && justification
                .commitments
                .verify_share(recipient, &justification.share);

        if !valid {
            self.bad_dealers.insert(dealer);
            let err = Error::InvalidJustification { dealer };
            warn!(dealer, recipient, error = %err, "dealer disqualified");
            return Err(err);
        }

        if let Some(c) = self.complaints.get_mut(&dealer) {
            c.remove(&recipient);
        }
        self.approvals.entry(dealer).or_default().insert(recipient);
        if recipient == self.index {
            self.received.insert(
                dealer,
                DealerRecord {
                    commitments: justification.commitments.clone(),
                    share: Some(justification.share),
                },
            );
        }
        debug!(dealer, recipient, "complaint resolved");
        Ok(())
    }

    fn qualifies(&self, dealer: u32) -> bool {
        if self.bad_dealers.contains(&dealer) {
            return false;
        }
        if self.complaints.get(&dealer).is_some_and(|c| !c.is_empty()) {
            return false;
        }
        // the dealer's own share counts as an approval
        let approvals = self.approvals.get(&dealer).map_or(0, BTreeSet::len) + 1;
        approvals >= self.params.t
    }

    /// Decide QUAL and this participant's outcome.
    pub fn finalize(&mut self) -> Result<&ParticipantState<G>> {
        expect_state!(self, ResponsesProcessed);

        self.qual = (0..self.params.n as u32)
            .filter(|&d| self.qualifies(d))
            .collect();

        let holds_all = self
            .qual
            .iter()
            .all(|d| self.received.get(d).is_some_and(|r| r.share.is_some()));
        let certified =
            self.qual.contains(&self.index) && self.qual.len() >= self.params.t && holds_all;

        if !certified {
            warn!(
                participant = self.index,
                qual = self.qual.len(),
                holds_all,
                "participant disqualified"
            );
            self.state = ParticipantState::Disqualified;
            return Ok(&self.state);
        }

        let mut shares = Vec::with_capacity(self.qual.len());
        let mut qual_commitments = Vec::with_capacity(self.qual.len());
        for d in &self.qual {
            if let Some(DealerRecord {
                commitments,
                share: Some(s),
            }) = self.received.get(d)
            {
                shares.push(*s);
                qual_commitments.push(commitments);
            }
        }
        let commitments = FeldmanCommitments::aggregate(qual_commitments)?;
        let share = DistKeyShare {
            index: self.index,
            private_share: sum_scalars::<G>(shares),
            public_key: commitments.public_value(),
            commitments,
        };
        info!(participant = self.index, qual = self.qual.len(), "participant certified");
        self.state = ParticipantState::Certified(share);
        Ok(&self.state)
    }

    #[cfg(test)]
    pub(crate) fn corrupt_polynomial(&mut self) {
        self.poly.coeffs[0] = self.poly.coeffs[0] + G::one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elgamal::{decrypt, encrypt, extract_shadow};
    use crate::group::Ristretto;
    use curve25519_dalek::ristretto::RistrettoPoint;

    type G = Ristretto;

    fn identities(n: usize) -> (Vec<IdentityKey<G>>, Vec<RistrettoPoint>) {
        let keys: Vec<IdentityKey<G>> = (0..n).map(|_| IdentityKey::generate()).collect();
        let publics = keys.iter().map(IdentityKey::public).collect();
        (keys, publics)
    }

    fn committee(n: usize, t: usize) -> Vec<Participant<G>> {
        let (keys, publics) = identities(n);
        keys.into_iter()
            .enumerate()
            .map(|(i, k)| Participant::new(i as u32, k, publics.clone(), t).unwrap())
            .collect()
    }

    /// Drive all rounds by hand. `tamper` may alter deals in transit (or
    /// drop them by returning false) and `before_justify` runs once every
    /// response has been processed.
    fn drive(
        ps: &mut [Participant<G>],
        mut tamper: impl FnMut(&mut Deal<G>) -> bool,
        mut before_justify: impl FnMut(&mut [Participant<G>]),
    ) {
        let mut deals = Vec::new();
        for p in ps.iter_mut() {
            deals.extend(p.deals().unwrap());
        }
        let mut responses = Vec::new();
        for mut d in deals {
            if tamper(&mut d) {
                let r = ps[d.recipient as usize].process_deal(&d).unwrap();
                responses.push(r);
            }
        }
        for p in ps.iter_mut() {
            responses.extend(p.complain_missing_deals().unwrap());
        }
        before_justify(ps);
        let mut justifications = Vec::new();
        for p in ps.iter_mut() {
            for r in &responses {
                if let Some(j) = p.process_response(r).unwrap() {
                    justifications.push(j);
                }
            }
            p.close_response_round().unwrap();
        }
        for p in ps.iter_mut() {
            for j in &justifications {
                match p.process_justification(j) {
                    Ok(()) | Err(Error::InvalidJustification { .. }) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            p.finalize().unwrap();
        }
    }

    #[test]
    fn honest_run_certifies_everyone() {
        let mut ps = committee(4, 3);
        drive(&mut ps, |_| true, |_| {});
        let shares: Vec<_> = ps.iter().map(|p| p.dist_key_share().unwrap()).collect();
        for s in &shares {
            assert_eq!(s.public_key, shares[0].public_key);
            assert_eq!(s.commitments.points[0], s.public_key);
            assert_eq!(G::generator() * s.private_share, s.public_share(s.index));
        }
        assert_eq!(ps[0].qual(), &[0, 1, 2, 3]);
    }

    #[test]
    fn corrupted_deal_is_justified() {
        let mut ps = committee(4, 2);
        drive(
            &mut ps,
            |d| {
                if d.dealer == 1 && d.recipient == 2 {
                    d.encrypted_share.ciphertext[0] ^= 0x01;
                }
                true
            },
            |_| {},
        );
        assert!(ps.iter().all(Participant::is_certified));
        assert_eq!(ps[2].qual(), &[0, 1, 2, 3]);

        let shares: Vec<_> = ps.iter().map(|p| p.dist_key_share().unwrap()).collect();
        let m = G::embed(b"VOTE:B").unwrap();
        let ct = encrypt::<G>(&m, &shares[0].public_key);
        let shadows = [extract_shadow(&ct, &shares[1]), extract_shadow(&ct, &shares[2])];
        assert_eq!(decrypt(&ct, &shadows, 2, 4).unwrap(), m);
    }

    #[test]
    fn failed_justification_disqualifies_dealer() {
        let mut ps = committee(4, 2);
        drive(
            &mut ps,
            |d| {
                if d.dealer == 3 && d.recipient == 0 {
                    d.encrypted_share.ciphertext[5] ^= 0x80;
                }
                true
            },
            |ps| ps[3].corrupt_polynomial(),
        );
        assert!(matches!(ps[3].state(), ParticipantState::Disqualified));
        for p in &ps[..3] {
            assert!(p.is_certified());
            assert_eq!(p.qual(), &[0, 1, 2]);
        }
        assert_eq!(ps[3].dist_key_share().unwrap_err(), Error::NotCertified);

        let shares: Vec<_> = ps[..3].iter().map(|p| p.dist_key_share().unwrap()).collect();
        let m = G::embed(b"VOTE:C").unwrap();
        let ct = encrypt::<G>(&m, &shares[0].public_key);
        let a = [extract_shadow(&ct, &shares[0]), extract_shadow(&ct, &shares[2])];
        let b = [extract_shadow(&ct, &shares[1]), extract_shadow(&ct, &shares[0])];
        assert_eq!(decrypt(&ct, &a, 2, 4).unwrap(), m);
        assert_eq!(decrypt(&ct, &b, 2, 4).unwrap(), m);
    }

    #[test]
    fn equivocating_dealer_is_excluded_by_everyone() {
        // dealer 0 shows participant 3 a different polynomial than 1 and 2
        let (keys, publics) = identities(4);
        let mut twin = Participant::<G>::new(0, keys[0].clone(), publics.clone(), 2).unwrap();
        let forged = twin
            .deals()
            .unwrap()
            .into_iter()
            .find(|d| d.recipient == 3)
            .unwrap();
        let mut ps: Vec<_> = keys
            .into_iter()
            .enumerate()
            .map(|(i, k)| Participant::new(i as u32, k, publics.clone(), 2).unwrap())
            .collect();

        drive(
            &mut ps,
            |d| {
                if d.dealer == 0 && d.recipient == 3 {
                    *d = forged.clone();
                }
                true
            },
            |_| {},
        );
        assert!(matches!(ps[0].state(), ParticipantState::Disqualified));
        let shares: Vec<_> = ps[1..].iter().map(|p| p.dist_key_share().unwrap()).collect();
        for (p, s) in ps[1..].iter().zip(&shares) {
            assert_eq!(p.qual(), &[1, 2, 3]);
            assert_eq!(s.public_key, shares[0].public_key);
        }

        let m = G::embed(b"VOTE:E").unwrap();
        let ct = encrypt::<G>(&m, &shares[0].public_key);
        let shadows = [extract_shadow(&ct, &shares[0]), extract_shadow(&ct, &shares[2])];
        assert_eq!(decrypt(&ct, &shadows, 2, 4).unwrap(), m);
    }

    #[test]
    fn withheld_deal_draws_a_complaint_and_is_opened() {
        let mut ps = committee(4, 3);
        drive(&mut ps, |d| !(d.dealer == 0 && d.recipient == 1), |_| {});
        for p in &ps {
            assert!(p.is_certified());
            assert_eq!(p.qual(), &[0, 1, 2, 3]);
        }
        let keys: Vec<_> = ps.iter().map(|p| p.dist_key_share().unwrap().public_key).collect();
        assert!(keys.iter().all(|k| *k == keys[0]));
    }

    #[test]
    fn late_deal_after_missing_complaint_is_refused() {
        let mut ps = committee(3, 2);
        let deals = ps[0].deals().unwrap();
        ps[1].deals().unwrap();
        let complaints = ps[1].complain_missing_deals().unwrap();
        assert_eq!(complaints.len(), 2);
        assert!(complaints.iter().all(|r| r.commitments.is_none()
            && r.verdict == Verdict::Complaint(ComplaintReason::MissingDeal)));
        // complaints are not repeated
        assert!(ps[1].complain_missing_deals().unwrap().is_empty());
        assert!(ps[1].process_deal(&deals[0]).is_err());
    }

    #[test]
    fn mismatched_commitments_draw_a_complaint() {
        let mut ps = committee(3, 2);
        let mut deals = ps[0].deals().unwrap();
        ps[1].deals().unwrap();
        deals[0].commitments.points.pop();
        let r = ps[1].process_deal(&deals[0]).unwrap();
        assert_eq!(
            r.verdict,
            Verdict::Complaint(ComplaintReason::MalformedCommitments)
        );
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut ps = committee(3, 2);
        assert_eq!(
            ps[0].close_response_round().unwrap_err(),
            Error::UnexpectedMessage("participant is not in state DealsIssued")
        );
        assert!(ps[0].finalize().is_err());
        let deals = ps[0].deals().unwrap();
        assert!(ps[0].deals().is_err());
        // recipient 1 has not issued its own deals yet
        assert!(ps[1].process_deal(&deals[0]).is_err());
        ps[1].deals().unwrap();
        ps[1].process_deal(&deals[0]).unwrap();
        assert_eq!(
            ps[1].process_deal(&deals[0]).unwrap_err(),
            Error::InvalidDeal { dealer: 0, reason: "duplicate deal" }
        );
    }

    #[test]
    fn participant_rejects_bad_parameters() {
        let keys: Vec<IdentityKey<G>> = (0..3).map(|_| IdentityKey::generate()).collect();
        let publics: Vec<_> = keys.iter().map(IdentityKey::public).collect();
        assert_eq!(
            Participant::new(0, keys[0].clone(), publics.clone(), 4).err(),
            Some(Error::InvalidParameters { n: 3, t: 4 })
        );
        assert!(Participant::new(1, keys[0].clone(), publics.clone(), 2).is_err());
        assert!(Participant::new(3, keys[0].clone(), publics, 2).is_err());
    }
}
