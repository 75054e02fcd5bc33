//! Gathering a quorum of peer attestations for a transaction.
//!
//! [QuorumState] is the per-transaction state. It is never mutated in place: every step
//! produces a new snapshot, so the peers requested on one branch are invisible to any
//! other. [Gatherer] drives the state machine, one remote request per step.
use super::peer_selector::PeerSelector;
use crate::client::RequestAttestation;
use crate::colored::Colorize;
use crate::transaction::{Attestation, CompactTx, FullTx};
use crate::util::short_hex;
use crate::Error;

use actix::Recipient;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, warn};

use std::collections::HashSet;

/// What to do next for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Ask this peer for an attestation.
    Request(usize),
    /// Every remaining candidate failed to accept a request during this step.
    Backoff,
    /// The threshold is met.
    Reached(CompactTx),
    /// Every peer was asked and the threshold is still not met.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct QuorumState {
    ctx: CompactTx,
    /// Peers which answered with an attestation, in the order they were asked.
    requested: Vec<usize>,
    /// Peers which were asked but gave no usable answer. They are not asked again.
    unresponsive: Vec<usize>,
}

impl QuorumState {
    pub fn new(ctx: CompactTx) -> Self {
        QuorumState { ctx, requested: vec![], unresponsive: vec![] }
    }

    pub fn ctx(&self) -> &CompactTx {
        &self.ctx
    }

    pub fn requested(&self) -> &[usize] {
        &self.requested
    }

    pub fn unresponsive(&self) -> &[usize] {
        &self.unresponsive
    }

    /// Whether `peer` must not be asked again for this transaction.
    pub fn is_excluded(&self, peer: usize) -> bool {
        self.requested.contains(&peer) || self.unresponsive.contains(&peer)
    }

    /// Decides the next step. `failed` holds the peers which could not be reached since the
    /// last state change.
    pub fn step(&self, threshold: usize, selector: &PeerSelector, failed: &HashSet<usize>) -> Step {
        if self.ctx.attestations().len() >= threshold {
            return Step::Reached(self.ctx.clone());
        }
        let remaining: Vec<usize> = (0..selector.len()).filter(|p| !self.is_excluded(*p)).collect();
        if remaining.is_empty() {
            return Step::Exhausted;
        }
        if remaining.iter().all(|p| failed.contains(p)) {
            return Step::Backoff;
        }
        loop {
            match selector.draw() {
                Some(peer) if self.is_excluded(peer) || failed.contains(&peer) => continue,
                Some(peer) => return Step::Request(peer),
                None => return Step::Exhausted,
            }
        }
    }

    /// The state after `peer` answered with `attestation`.
    pub fn attested(&self, peer: usize, attestation: Attestation) -> QuorumState {
        let mut next = self.clone();
        if !next.ctx.attest(attestation) {
            debug!("duplicate attestation from peer {} for {}", peer, self.ctx);
        }
        next.requested.push(peer);
        next
    }

    /// The state after `peer` failed to give a usable answer.
    pub fn unresponsive_peer(&self, peer: usize) -> QuorumState {
        let mut next = self.clone();
        next.unresponsive.push(peer);
        next
    }
}

/// The end of quorum gathering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gathered {
    /// Ready for submission.
    Reached(CompactTx),
    /// A peer found the transaction invalid.
    Invalidated { peer: usize },
    /// Every peer attested or stopped answering and the threshold is still not met.
    Unreachable,
}

#[derive(Debug)]
enum Reply {
    Attested(Attestation),
    Invalid,
    /// The request could not be dispatched.
    NotDispatched,
    /// The request was dispatched but no usable answer came back.
    NoAnswer,
}

pub struct Gatherer {
    peers: Vec<Recipient<RequestAttestation>>,
    selector: PeerSelector,
    threshold: usize,
    /// How long to wait for a peer's answer before giving up on it.
    peer_timeout: Duration,
    /// Pause after every remaining candidate failed to accept a request. Doubles while
    /// they keep failing, up to `MAX_BACKOFF_FACTOR` times this.
    retry_delay: Duration,
}

const MAX_BACKOFF_FACTOR: u32 = 32;

impl Gatherer {
    pub fn new(
        peers: Vec<Recipient<RequestAttestation>>,
        selector: PeerSelector,
        threshold: usize,
        peer_timeout: Duration,
        retry_delay: Duration,
    ) -> Self {
        Gatherer { peers, selector, threshold, peer_timeout, retry_delay }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Collects attestations until `ctx` carries `threshold` of them.
    pub async fn gather(&self, tx: &FullTx, ctx: CompactTx) -> Gathered {
        let mut state = QuorumState::new(ctx);
        let mut failed = HashSet::new();
        let mut backoffs: u32 = 0;
        loop {
            match state.step(self.threshold, &self.selector, &failed) {
                Step::Reached(ctx) => return Gathered::Reached(ctx),
                Step::Exhausted => {
                    warn!(
                        "[{}] {} ran out of peers with {}/{} attestations",
                        "sentinel".cyan(),
                        state.ctx(),
                        state.ctx().attestations().len(),
                        self.threshold
                    );
                    return Gathered::Unreachable;
                }
                // Dispatch failures never end the transaction, only delay it.
                Step::Backoff => {
                    if backoffs == 0 || backoffs % 10 == 0 {
                        warn!(
                            "[{}] no peer reachable for {}, retrying ({})",
                            "sentinel".cyan(),
                            state.ctx(),
                            backoffs
                        );
                    }
                    sleep(self.backoff_delay(backoffs)).await;
                    backoffs = backoffs.saturating_add(1);
                    failed.clear();
                }
                Step::Request(peer) => match self.request(peer, tx, &state).await {
                    Reply::Attested(attestation) => {
                        failed.clear();
                        backoffs = 0;
                        state = state.attested(peer, attestation);
                    }
                    Reply::Invalid => {
                        error!(
                            "[{}] {} invalid according to remote sentinel {}",
                            "sentinel".cyan(),
                            state.ctx(),
                            peer
                        );
                        return Gathered::Invalidated { peer };
                    }
                    Reply::NotDispatched => {
                        let _ = failed.insert(peer);
                    }
                    Reply::NoAnswer => {
                        state = state.unresponsive_peer(peer);
                    }
                },
            }
        }
    }

    fn backoff_delay(&self, backoffs: u32) -> Duration {
        let factor = 1u32.checked_shl(backoffs).unwrap_or(MAX_BACKOFF_FACTOR);
        self.retry_delay * factor.min(MAX_BACKOFF_FACTOR)
    }

    async fn request(&self, peer: usize, tx: &FullTx, state: &QuorumState) -> Reply {
        let recipient = match self.peers.get(peer) {
            Some(recipient) => recipient,
            None => return Reply::NotDispatched,
        };
        let request = recipient.send(RequestAttestation { tx: tx.clone() });
        match timeout(self.peer_timeout, request).await {
            Err(_) => {
                warn!("peer {} timed out on {}", peer, short_hex(&state.ctx().id));
                Reply::NoAnswer
            }
            Ok(Err(err)) => {
                debug!("peer {} mailbox: {:?}", peer, err);
                Reply::NotDispatched
            }
            Ok(Ok(Err(Error::Unreachable))) => Reply::NotDispatched,
            Ok(Ok(Err(err))) => {
                warn!("peer {} failed on {}: {}", peer, short_hex(&state.ctx().id), err);
                Reply::NoAnswer
            }
            Ok(Ok(Ok(None))) => Reply::Invalid,
            Ok(Ok(Ok(Some(attestation)))) => {
                if attestation.verify(&state.ctx().id) {
                    Reply::Attested(attestation)
                } else {
                    warn!("peer {} returned a bad attestation for {}", peer, state.ctx());
                    Reply::NoAnswer
                }
            }
        }
    }
}
