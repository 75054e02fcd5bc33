use crate::transaction::validation::ValidationError;

/// The status reported to a caller of `ExecuteTx`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum TxStatus {
    /// The coordinator committed the transaction.
    Confirmed,
    /// The transaction failed static validation.
    StaticInvalid,
    /// A peer sentinel or the coordinator rejected the transaction against ledger state.
    StateInvalid,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub status: TxStatus,
    /// Set for [TxStatus::StaticInvalid].
    pub error: Option<ValidationError>,
}

impl ExecuteResponse {
    pub fn static_invalid(error: ValidationError) -> Self {
        ExecuteResponse { status: TxStatus::StaticInvalid, error: Some(error) }
    }

    pub fn state_invalid() -> Self {
        ExecuteResponse { status: TxStatus::StateInvalid, error: None }
    }

    pub fn confirmed() -> Self {
        ExecuteResponse { status: TxStatus::Confirmed, error: None }
    }

    /// Maps the coordinator's outcome. No outcome stays no response.
    pub fn from_outcome(outcome: Option<bool>) -> Option<Self> {
        match outcome {
            Some(true) => Some(ExecuteResponse::confirmed()),
            Some(false) => Some(ExecuteResponse::state_invalid()),
            None => None,
        }
    }
}
