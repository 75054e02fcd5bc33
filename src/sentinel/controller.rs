use super::quorum::{Gathered, Gatherer};
use super::result::ExecuteResponse;
use crate::colored::Colorize;
use crate::coordinator::Submitter;
use crate::transaction::validation;
use crate::transaction::{Attestation, CompactTx, FullTx};

use actix::{Actor, Context, Handler, ResponseFuture};
use ed25519_dalek::Keypair;
use tracing::{debug, error, info, warn};

use std::sync::Arc;

/// Admits transactions on behalf of callers and attests to transactions on behalf of peers.
pub struct Controller {
    /// The position of this sentinel in the sentinel endpoint list.
    sentinel_id: u32,
    /// Absent only when attestations are not required.
    keypair: Option<Arc<Keypair>>,
    gatherer: Arc<Gatherer>,
    submitter: Arc<Submitter>,
}

impl Controller {
    pub fn new(
        sentinel_id: u32,
        keypair: Option<Keypair>,
        gatherer: Gatherer,
        submitter: Submitter,
    ) -> Self {
        Controller {
            sentinel_id,
            keypair: keypair.map(Arc::new),
            gatherer: Arc::new(gatherer),
            submitter: Arc::new(submitter),
        }
    }

    /// Builds the compact transaction, self-attested when attestations are required.
    fn compact(&self, tx: &FullTx) -> CompactTx {
        let mut ctx = CompactTx::from(tx);
        if self.gatherer.threshold() > 0 {
            match self.keypair.as_ref() {
                Some(keypair) => {
                    let attestation = ctx.sign(keypair);
                    let _ = ctx.attest(attestation);
                }
                None => warn!("[{}] no key to attest {}", "sentinel".cyan(), ctx),
            }
        }
        ctx
    }
}

impl Actor for Controller {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        match self.keypair.as_ref() {
            Some(keypair) => info!(
                "[{}] sentinel {} public key: {}",
                "sentinel".cyan(),
                self.sentinel_id,
                hex::encode(keypair.public.as_bytes())
            ),
            None => info!("[{}] sentinel {} started without a key", "sentinel".cyan(), self.sentinel_id),
        }
    }
}

/// Executes a transaction: validate, attest, gather a quorum and submit.
///
/// Resolves to `None` when no definite outcome could be determined.
#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "Option<ExecuteResponse>")]
pub struct ExecuteTx {
    pub tx: FullTx,
}

impl Handler<ExecuteTx> for Controller {
    type Result = ResponseFuture<Option<ExecuteResponse>>;

    fn handle(&mut self, msg: ExecuteTx, _ctx: &mut Context<Self>) -> Self::Result {
        if let Some(err) = validation::check_tx(&msg.tx) {
            debug!("[{}] rejected ({}) {}", "sentinel".cyan(), err, hex::encode(msg.tx.id()));
            return Box::pin(async move { Some(ExecuteResponse::static_invalid(err)) });
        }

        let ctx = self.compact(&msg.tx);
        let gatherer = self.gatherer.clone();
        let submitter = self.submitter.clone();
        Box::pin(async move {
            match gatherer.gather(&msg.tx, ctx).await {
                Gathered::Reached(ctx) => {
                    debug!("[{}] accepted {}", "sentinel".cyan(), ctx);
                    ExecuteResponse::from_outcome(submitter.submit(ctx).await)
                }
                Gathered::Invalidated { .. } => Some(ExecuteResponse::state_invalid()),
                Gathered::Unreachable => None,
            }
        })
    }
}

/// Validates a transaction for another sentinel.
#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "ValidateTxAck")]
pub struct ValidateTx {
    pub tx: FullTx,
}

#[derive(Debug, Clone, Serialize, Deserialize, MessageResponse)]
pub struct ValidateTxAck {
    /// `None` if the transaction is invalid.
    pub attestation: Option<Attestation>,
}

impl Handler<ValidateTx> for Controller {
    type Result = ValidateTxAck;

    fn handle(&mut self, msg: ValidateTx, _ctx: &mut Context<Self>) -> Self::Result {
        if let Some(err) = validation::check_tx(&msg.tx) {
            debug!("[{}] refusing to attest ({}) {}", "sentinel".cyan(), err, hex::encode(msg.tx.id()));
            return ValidateTxAck { attestation: None };
        }
        let ctx = CompactTx::from(&msg.tx);
        match self.keypair.as_ref() {
            Some(keypair) => ValidateTxAck { attestation: Some(ctx.sign(keypair)) },
            None => {
                error!("[{}] asked to attest {} without a key", "sentinel".cyan(), ctx);
                ValidateTxAck { attestation: None }
            }
        }
    }
}
