use super::types::TxId;

use ed25519_dalek::{Keypair, PublicKey, Signature, Signer, Verifier};

use std::collections::BTreeMap;

/// A sentinel's signature over a transaction id, certifying that the sentinel validated
/// the transaction.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl std::fmt::Display for Attestation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.public_key.as_bytes()))
    }
}

impl Attestation {
    pub fn new(keypair: &Keypair, tx_id: &TxId) -> Self {
        Attestation { public_key: keypair.public, signature: keypair.sign(tx_id) }
    }

    pub fn verify(&self, tx_id: &TxId) -> bool {
        self.public_key.verify(tx_id, &self.signature).is_ok()
    }
}

/// The attestations collected for one transaction, at most one per attesting key.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Attestations(BTreeMap<[u8; 32], Attestation>);

impl Attestations {
    pub fn new() -> Self {
        Attestations(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inserts `attestation` unless its key has already attested. Returns whether the set grew.
    pub fn insert(&mut self, attestation: Attestation) -> bool {
        let key = attestation.public_key.to_bytes();
        if self.0.contains_key(&key) {
            return false;
        }
        let _ = self.0.insert(key, attestation);
        true
    }

    pub fn contains(&self, public_key: &PublicKey) -> bool {
        self.0.contains_key(public_key.as_bytes())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attestation> {
        self.0.values()
    }

    /// Whether every attestation is a valid signature over `tx_id`.
    pub fn verify(&self, tx_id: &TxId) -> bool {
        self.iter().all(|attestation| attestation.verify(tx_id))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use rand::rngs::OsRng;

    #[test]
    fn same_party_is_counted_once() {
        let mut csprng = OsRng {};
        let keypair = Keypair::generate(&mut csprng);
        let mut attestations = Attestations::new();

        assert!(attestations.insert(Attestation::new(&keypair, &[1; 32])));
        assert!(!attestations.insert(Attestation::new(&keypair, &[1; 32])));
        assert_eq!(attestations.len(), 1);
        assert!(attestations.contains(&keypair.public));
    }

    #[test]
    fn verify_rejects_signature_over_other_id() {
        let mut csprng = OsRng {};
        let keypair = Keypair::generate(&mut csprng);
        let attestation = Attestation::new(&keypair, &[1; 32]);
        assert!(attestation.verify(&[1; 32]));
        assert!(!attestation.verify(&[2; 32]));

        let mut attestations = Attestations::new();
        let _ = attestations.insert(attestation);
        assert!(attestations.verify(&[1; 32]));
        assert!(!attestations.verify(&[2; 32]));
    }
}
