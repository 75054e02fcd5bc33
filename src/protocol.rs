//! The sentinel network message protocol.
use crate::sentinel::{self, ExecuteResponse};

#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "Response")]
pub enum Request {
    /// Run a transaction through the full admission pipeline.
    ExecuteTx(sentinel::ExecuteTx),
    /// Validate and attest to a transaction on behalf of another sentinel.
    ValidateTx(sentinel::ValidateTx),
}

#[derive(Debug, Clone, Serialize, Deserialize, MessageResponse)]
pub enum Response {
    /// `None` when no definite outcome could be determined.
    ExecuteTxAck(Option<ExecuteResponse>),
    ValidateTxAck(sentinel::ValidateTxAck),
    /// The sentinel could not process the request.
    Unavailable,
}
