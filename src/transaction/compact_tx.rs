use super::attestation::{Attestation, Attestations};
use super::full_tx::FullTx;
use super::types::*;

use ed25519_dalek::Keypair;

/// The summary of a [FullTx] used on the consensus path.
///
/// The `id`, `inputs` and `outputs` are fixed at construction; only the attestation set
/// grows, and only through [CompactTx::attest].
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CompactTx {
    pub id: TxId,
    /// Identifiers of the ledger entries consumed.
    pub inputs: Vec<Hash>,
    /// Identifiers of the ledger entries produced.
    pub outputs: Vec<Hash>,
    attestations: Attestations,
}

impl std::fmt::Display for CompactTx {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.id))
    }
}

impl From<&FullTx> for CompactTx {
    fn from(tx: &FullTx) -> Self {
        CompactTx {
            id: tx.id(),
            inputs: tx.input_ids(),
            outputs: tx.output_ids(),
            attestations: Attestations::new(),
        }
    }
}

impl CompactTx {
    /// Produces this sentinel's attestation over the transaction id.
    pub fn sign(&self, keypair: &Keypair) -> Attestation {
        Attestation::new(keypair, &self.id)
    }

    /// Adds an attestation, returns `false` if its key already attested.
    pub fn attest(&mut self, attestation: Attestation) -> bool {
        self.attestations.insert(attestation)
    }

    pub fn attestations(&self) -> &Attestations {
        &self.attestations
    }

    pub fn verify_attestations(&self) -> bool {
        self.attestations.verify(&self.id)
    }
}
