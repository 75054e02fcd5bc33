//! Static (structural) validation of a [FullTx].
//!
//! These checks need no ledger state: they are the same on every sentinel, which is what
//! allows a peer to re-run them and attest to the result.
use super::full_tx::FullTx;

use std::collections::HashSet;

/// The first rule a transaction breaks.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    NoInputs,
    NoOutputs,
    /// The number of witnesses differs from the number of inputs.
    MissingWitness { inputs: usize, witnesses: usize },
    /// The input at this position spends an outpoint already spent by an earlier input.
    DuplicateInput(usize),
    ZeroValueOutput(usize),
    ValueOverflow,
    AsymmetricValues { inputs: u64, outputs: u64 },
    /// The witness key does not hash to the lock of the output being spent.
    WitnessLockMismatch(usize),
    InvalidWitnessSignature(usize),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ValidationError::NoInputs => write!(f, "transaction has no inputs"),
            ValidationError::NoOutputs => write!(f, "transaction has no outputs"),
            ValidationError::MissingWitness { inputs, witnesses } => {
                write!(f, "{} witnesses for {} inputs", witnesses, inputs)
            }
            ValidationError::DuplicateInput(i) => write!(f, "input {} is a duplicate", i),
            ValidationError::ZeroValueOutput(i) => write!(f, "output {} has zero value", i),
            ValidationError::ValueOverflow => write!(f, "value sum overflows"),
            ValidationError::AsymmetricValues { inputs, outputs } => {
                write!(f, "inputs sum to {} but outputs sum to {}", inputs, outputs)
            }
            ValidationError::WitnessLockMismatch(i) => {
                write!(f, "witness {} does not match the lock of its input", i)
            }
            ValidationError::InvalidWitnessSignature(i) => {
                write!(f, "witness {} has an invalid signature", i)
            }
        }
    }
}

/// Checks a transaction, returning the violation if there is one.
pub fn check_tx(tx: &FullTx) -> Option<ValidationError> {
    check_shape(tx).or_else(|| check_values(tx)).or_else(|| check_witnesses(tx))
}

fn check_shape(tx: &FullTx) -> Option<ValidationError> {
    if tx.inputs.is_empty() {
        return Some(ValidationError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Some(ValidationError::NoOutputs);
    }
    if tx.witnesses.len() != tx.inputs.len() {
        return Some(ValidationError::MissingWitness {
            inputs: tx.inputs.len(),
            witnesses: tx.witnesses.len(),
        });
    }
    let mut seen = HashSet::new();
    for (i, input) in tx.inputs.iter().enumerate() {
        if !seen.insert(&input.prevout) {
            return Some(ValidationError::DuplicateInput(i));
        }
    }
    None
}

fn check_values(tx: &FullTx) -> Option<ValidationError> {
    if let Some(i) = tx.outputs.iter().position(|output| output.value == 0) {
        return Some(ValidationError::ZeroValueOutput(i));
    }
    let inputs = checked_sum(tx.inputs.iter().map(|input| input.prevout_data.value));
    let outputs = checked_sum(tx.outputs.iter().map(|output| output.value));
    match (inputs, outputs) {
        (Some(inputs), Some(outputs)) if inputs != outputs => {
            Some(ValidationError::AsymmetricValues { inputs, outputs })
        }
        (Some(_), Some(_)) => None,
        _ => Some(ValidationError::ValueOverflow),
    }
}

fn check_witnesses(tx: &FullTx) -> Option<ValidationError> {
    let tx_id = tx.id();
    for (i, (input, witness)) in tx.inputs.iter().zip(tx.witnesses.iter()).enumerate() {
        if super::public_key_hash(&witness.owner) != input.prevout_data.lock {
            return Some(ValidationError::WitnessLockMismatch(i));
        }
        if !witness.verify(&tx_id) {
            return Some(ValidationError::InvalidWitnessSignature(i));
        }
    }
    None
}

fn checked_sum(values: impl Iterator<Item = u64>) -> Option<u64> {
    values.fold(Some(0u64), |acc, v| acc.and_then(|acc| acc.checked_add(v)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transaction::{public_key_hash, Input, OutPoint, Output, Witness};

    use ed25519_dalek::Keypair;
    use rand::rngs::OsRng;

    fn keypair() -> Keypair {
        let mut csprng = OsRng {};
        Keypair::generate(&mut csprng)
    }

    fn input(keypair: &Keypair, n: u8, value: u64) -> Input {
        Input::new(OutPoint::new([n; 32], 0), Output::new(public_key_hash(&keypair.public), value))
    }

    #[test]
    fn valid_transaction_passes() {
        let kp = keypair();
        let tx = FullTx::signed(
            vec![input(&kp, 1, 10), input(&kp, 2, 5)],
            vec![Output::new([7; 32], 12), Output::new([8; 32], 3)],
            &kp,
        );
        assert_eq!(check_tx(&tx), None);
    }

    #[test]
    fn empty_inputs_and_outputs_are_rejected() {
        let kp = keypair();
        let tx = FullTx::signed(vec![], vec![Output::new([7; 32], 1)], &kp);
        assert_eq!(check_tx(&tx), Some(ValidationError::NoInputs));

        let tx = FullTx::signed(vec![input(&kp, 1, 1)], vec![], &kp);
        assert_eq!(check_tx(&tx), Some(ValidationError::NoOutputs));
    }

    #[test]
    fn unsigned_transaction_is_rejected() {
        let kp = keypair();
        let tx = FullTx::new(vec![input(&kp, 1, 1)], vec![Output::new([7; 32], 1)]);
        assert_eq!(
            check_tx(&tx),
            Some(ValidationError::MissingWitness { inputs: 1, witnesses: 0 })
        );
    }

    #[test]
    fn duplicate_input_is_rejected() {
        let kp = keypair();
        let tx = FullTx::signed(
            vec![input(&kp, 1, 1), input(&kp, 1, 1)],
            vec![Output::new([7; 32], 2)],
            &kp,
        );
        assert_eq!(check_tx(&tx), Some(ValidationError::DuplicateInput(1)));
    }

    #[test]
    fn value_rules() {
        let kp = keypair();
        let tx = FullTx::signed(
            vec![input(&kp, 1, 2)],
            vec![Output::new([7; 32], 2), Output::new([7; 32], 0)],
            &kp,
        );
        assert_eq!(check_tx(&tx), Some(ValidationError::ZeroValueOutput(1)));

        let tx = FullTx::signed(vec![input(&kp, 1, 2)], vec![Output::new([7; 32], 3)], &kp);
        assert_eq!(
            check_tx(&tx),
            Some(ValidationError::AsymmetricValues { inputs: 2, outputs: 3 })
        );

        let tx = FullTx::signed(
            vec![input(&kp, 1, u64::MAX), input(&kp, 2, 1)],
            vec![Output::new([7; 32], 1)],
            &kp,
        );
        assert_eq!(check_tx(&tx), Some(ValidationError::ValueOverflow));
    }

    #[test]
    fn witness_rules() {
        let owner = keypair();
        let thief = keypair();

        let tx = FullTx::signed(vec![input(&owner, 1, 4)], vec![Output::new([7; 32], 4)], &thief);
        assert_eq!(check_tx(&tx), Some(ValidationError::WitnessLockMismatch(0)));

        let mut tx = FullTx::new(vec![input(&owner, 1, 4)], vec![Output::new([7; 32], 4)]);
        tx.witnesses = vec![Witness::new(&owner, &[0; 32])];
        assert_eq!(check_tx(&tx), Some(ValidationError::InvalidWitnessSignature(0)));
    }

    #[test]
    fn check_is_deterministic() {
        let kp = keypair();
        let tx = FullTx::signed(vec![input(&kp, 1, 2)], vec![Output::new([7; 32], 3)], &kp);
        assert_eq!(check_tx(&tx), check_tx(&tx.clone()));
    }
}
