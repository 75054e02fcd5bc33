//! The sentinel's side of the commit coordinator: the client and the submission policy.
mod client;
mod submission;

pub use client::*;
pub use submission::*;

use crate::transaction::CompactTx;

/// A request on the coordinator wire protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoordinatorRequest {
    ExecuteTx(CompactTx),
}

/// The coordinator's reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoordinatorResponse {
    /// `Some(true)` committed, `Some(false)` conflicting state, `None` undetermined.
    Outcome(Option<bool>),
}
