// src/keygen.rs
//
// Drives the DKG rounds over a Transport. Every round first lets all
// participants drain and process their mailboxes, then flushes the staged
// outgoing messages, so no participant sees a later round's message early.

use tracing::{info, instrument, warn};

use crate::dkg::{Deal, DkgMessage, IdentityKey, Participant};
use crate::error::{Error, Result};
use crate::group::PrimeGroup;
use crate::network::{MemoryNetwork, Transport};
use crate::types::{DistKeyShare, ThresholdParams};

/// Setup(n, t): fresh identity keys and one participant per index.
pub fn setup<G: PrimeGroup>(params: ThresholdParams) -> Result<Vec<Participant<G>>> {
    params.validate()?;
    let keys: Vec<IdentityKey<G>> = (0..params.n).map(|_| IdentityKey::generate()).collect();
    let publics: Vec<G::Element> = keys.iter().map(IdentityKey::public).collect();
    keys.into_iter()
        .enumerate()
        .map(|(i, key)| Participant::new(i as u32, key, publics.clone(), params.t))
        .collect()
}

/// Run all rounds over an in-memory network.
pub fn run_dkg<G: PrimeGroup>(params: ThresholdParams) -> Result<Vec<Participant<G>>> {
    let participants = setup::<G>(params)?;
    let net = MemoryNetwork::new(params.n);
    run_dkg_over(participants, &net, |_| true)
}

/// Run all rounds over `net`. `intercept` sees every deal in transit and may
/// alter it; returning `false` drops the deal.
pub fn run_dkg_over<G, T, F>(
    mut participants: Vec<Participant<G>>,
    net: &T,
    mut intercept: F,
) -> Result<Vec<Participant<G>>>
where
    G: PrimeGroup,
    T: Transport<DkgMessage<G>>,
    F: FnMut(&mut Deal<G>) -> bool,
{
    // round 1: deals
    for p in participants.iter_mut() {
        for mut deal in p.deals()? {
            if intercept(&mut deal) {
                net.send(deal.recipient, DkgMessage::Deal(deal))?;
            }
        }
    }

    // round 2: responses
    let mut staged = Vec::new();
    for p in participants.iter_mut() {
        for msg in net.drain(p.index())? {
            match msg {
                DkgMessage::Deal(deal) => {
                    let response = p.process_deal(&deal)?;
                    staged.push((p.index(), DkgMessage::Response(response)));
                }
                _ => return Err(Error::UnexpectedMessage("expected deal")),
            }
        }
        for response in p.complain_missing_deals()? {
            staged.push((p.index(), DkgMessage::Response(response)));
        }
    }
    for (from, msg) in staged.drain(..) {
        net.broadcast(from, msg)?;
    }

    // round 3: justifications
    for p in participants.iter_mut() {
        for msg in net.drain(p.index())? {
            match msg {
                DkgMessage::Response(response) => {
                    if let Some(j) = p.process_response(&response)? {
                        staged.push((p.index(), DkgMessage::Justification(j)));
                    }
                }
                _ => return Err(Error::UnexpectedMessage("expected response")),
            }
        }
        p.close_response_round()?;
    }
    for (from, msg) in staged.drain(..) {
        net.broadcast(from, msg)?;
    }

    // resolve complaints and certify
    for p in participants.iter_mut() {
        for msg in net.drain(p.index())? {
            match msg {
                DkgMessage::Justification(j) => match p.process_justification(&j) {
                    // already logged; the dealer is out of QUAL
                    Ok(()) | Err(Error::InvalidJustification { .. }) => {}
                    Err(e) => return Err(e),
                },
                _ => return Err(Error::UnexpectedMessage("expected justification")),
            }
        }
        p.finalize()?;
    }

    Ok(participants)
}

/// Run a DKG among `n` participants with threshold `t` and return the key
/// shares of every certified participant.
#[instrument(level = "info", skip_all, fields(parties = n, threshold = t))]
pub fn create_threshold_shares<G: PrimeGroup>(n: usize, t: usize) -> Result<Vec<DistKeyShare<G>>> {
    let params = ThresholdParams::new(n, t)?;
    let participants = run_dkg::<G>(params)?;
    collect_certified(&participants, params)
}

/// Key shares of the certified participants, or `DkgFailed` when fewer than
/// `t` certified.
pub fn collect_certified<G: PrimeGroup>(
    participants: &[Participant<G>],
    params: ThresholdParams,
) -> Result<Vec<DistKeyShare<G>>> {
    let shares: Vec<DistKeyShare<G>> = participants
        .iter()
        .filter_map(|p| p.dist_key_share().ok())
        .collect();

    if shares.len() < params.t {
        warn!(certified = shares.len(), threshold = params.t, "key generation failed");
        return Err(Error::DkgFailed {
            certified: shares.len(),
            threshold: params.t,
        });
    }
    if let Some(other) = shares.iter().find(|s| s.public_key != shares[0].public_key) {
        return Err(Error::InconsistentPublicKey {
            first: shares[0].index,
            other: other.index,
        });
    }
    info!(certified = shares.len(), "joint key established");
    Ok(shares)
}
