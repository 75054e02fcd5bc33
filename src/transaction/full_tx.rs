use super::types::*;

use ed25519_dalek::{Keypair, PublicKey, Signature, Signer, Verifier};

/// Hashes the owner's public key into the value stored in an output `lock`.
pub fn public_key_hash(public_key: &PublicKey) -> PublicKeyHash {
    blake3::hash(public_key.as_bytes()).into()
}

/// A ledger entry produced by a transaction.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Output {
    /// Hash of the public key which may spend this output.
    pub lock: PublicKeyHash,
    pub value: Amount,
}

impl Output {
    pub fn new(lock: PublicKeyHash, value: Amount) -> Self {
        Output { lock, value }
    }

    fn digest(&self, hasher: &mut blake3::Hasher) {
        let _ = hasher.update(&self.lock);
        let _ = hasher.update(&self.value.to_be_bytes());
    }
}

/// Points at the `index`-th output of transaction `tx_id`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_id: TxId,
    pub index: u64,
}

impl OutPoint {
    pub fn new(tx_id: TxId, index: u64) -> Self {
        OutPoint { tx_id, index }
    }
}

/// A reference to the output being spent together with a copy of its data, so that the
/// input can be checked without access to ledger state.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Input {
    pub prevout: OutPoint,
    pub prevout_data: Output,
}

impl Input {
    pub fn new(prevout: OutPoint, prevout_data: Output) -> Self {
        Input { prevout, prevout_data }
    }

    fn digest(&self, hasher: &mut blake3::Hasher) {
        let _ = hasher.update(&self.prevout.tx_id);
        let _ = hasher.update(&self.prevout.index.to_be_bytes());
        self.prevout_data.digest(hasher);
    }

    /// The identifier of the ledger entry this input consumes.
    pub fn hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        self.digest(&mut hasher);
        hasher.finalize().into()
    }
}

/// Proof that the owner of an input authorised the transaction.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Witness {
    pub owner: PublicKey,
    /// Signature of `owner` over the transaction id.
    pub signature: Signature,
}

impl Witness {
    pub fn new(keypair: &Keypair, tx_id: &TxId) -> Self {
        Witness { owner: keypair.public, signature: keypair.sign(tx_id) }
    }

    /// Whether this witness may unlock `output` for the transaction `tx_id`.
    pub fn unlocks(&self, output: &Output, tx_id: &TxId) -> bool {
        public_key_hash(&self.owner) == output.lock && self.verify(tx_id)
    }

    pub fn verify(&self, tx_id: &TxId) -> bool {
        self.owner.verify(tx_id, &self.signature).is_ok()
    }
}

/// A complete transaction as submitted by a caller.
///
/// `witnesses[i]` authorises `inputs[i]`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FullTx {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub witnesses: Vec<Witness>,
}

impl std::fmt::Display for FullTx {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} ({} inputs, {} outputs)",
            hex::encode(self.id()),
            self.inputs.len(),
            self.outputs.len()
        )
    }
}

impl FullTx {
    /// Creates an unsigned transaction.
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>) -> Self {
        FullTx { inputs, outputs, witnesses: vec![] }
    }

    /// Creates a transaction whose inputs are all owned by `keypair` and signs every input.
    pub fn signed(inputs: Vec<Input>, outputs: Vec<Output>, keypair: &Keypair) -> Self {
        let mut tx = FullTx::new(inputs, outputs);
        let tx_id = tx.id();
        tx.witnesses = tx.inputs.iter().map(|_| Witness::new(keypair, &tx_id)).collect();
        tx
    }

    /// The deterministic identity of the transaction. Witnesses are not part of it.
    pub fn id(&self) -> TxId {
        let mut hasher = blake3::Hasher::new();
        let _ = hasher.update(&(self.inputs.len() as u64).to_be_bytes());
        for input in self.inputs.iter() {
            input.digest(&mut hasher);
        }
        let _ = hasher.update(&(self.outputs.len() as u64).to_be_bytes());
        for output in self.outputs.iter() {
            output.digest(&mut hasher);
        }
        hasher.finalize().into()
    }

    /// The identifiers of the ledger entries this transaction produces.
    pub fn output_ids(&self) -> Vec<Hash> {
        let tx_id = self.id();
        self.outputs
            .iter()
            .enumerate()
            .map(|(i, output)| {
                let mut hasher = blake3::Hasher::new();
                let _ = hasher.update(&tx_id);
                let _ = hasher.update(&(i as u64).to_be_bytes());
                output.digest(&mut hasher);
                hasher.finalize().into()
            })
            .collect()
    }

    /// The identifiers of the ledger entries this transaction consumes.
    pub fn input_ids(&self) -> Vec<Hash> {
        self.inputs.iter().map(|input| input.hash()).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use rand::rngs::OsRng;

    fn spendable(keypair: &Keypair, value: Amount, n: u8) -> Input {
        let lock = public_key_hash(&keypair.public);
        Input::new(OutPoint::new([n; 32], 0), Output::new(lock, value))
    }

    fn be(n: u64) -> [u8; 8] {
        n.to_be_bytes()
    }

    #[test]
    fn identities_follow_the_fixed_byte_encoding() {
        let input = Input::new(OutPoint::new([1; 32], 2), Output::new([3; 32], 40));
        let output = Output::new([5; 32], 60);
        let tx = FullTx::new(vec![input.clone()], vec![output]);

        let mut enc_input = vec![];
        enc_input.extend_from_slice(&[1; 32]);
        enc_input.extend_from_slice(&be(2));
        enc_input.extend_from_slice(&[3; 32]);
        enc_input.extend_from_slice(&be(40));
        let mut enc_output = vec![];
        enc_output.extend_from_slice(&[5; 32]);
        enc_output.extend_from_slice(&be(60));

        let mut body = vec![];
        body.extend_from_slice(&be(1));
        body.extend_from_slice(&enc_input);
        body.extend_from_slice(&be(1));
        body.extend_from_slice(&enc_output);
        let tx_id: TxId = blake3::hash(&body).into();
        assert_eq!(tx.id(), tx_id);

        let input_id: Hash = blake3::hash(&enc_input).into();
        assert_eq!(input.hash(), input_id);
        assert_eq!(tx.input_ids(), vec![input_id]);

        let mut out = tx_id.to_vec();
        out.extend_from_slice(&be(0));
        out.extend_from_slice(&enc_output);
        let output_id: Hash = blake3::hash(&out).into();
        assert_eq!(tx.output_ids(), vec![output_id]);

        let keypair = Keypair::generate(&mut OsRng {});
        let lock: PublicKeyHash = blake3::hash(keypair.public.as_bytes()).into();
        assert_eq!(public_key_hash(&keypair.public), lock);
    }

    #[test]
    fn id_is_deterministic_and_ignores_witnesses() {
        let mut csprng = OsRng {};
        let keypair = Keypair::generate(&mut csprng);
        let inputs = vec![spendable(&keypair, 10, 1)];
        let outputs = vec![Output::new([9; 32], 10)];

        let unsigned = FullTx::new(inputs.clone(), outputs.clone());
        let signed = FullTx::signed(inputs.clone(), outputs.clone(), &keypair);
        assert_eq!(unsigned.id(), signed.id());
        assert_eq!(signed.id(), FullTx::signed(inputs, outputs, &keypair).id());
    }

    #[test]
    fn id_changes_with_outputs() {
        let mut csprng = OsRng {};
        let keypair = Keypair::generate(&mut csprng);
        let inputs = vec![spendable(&keypair, 10, 1)];
        let a = FullTx::new(inputs.clone(), vec![Output::new([9; 32], 10)]);
        let b = FullTx::new(inputs, vec![Output::new([9; 32], 5), Output::new([9; 32], 5)]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn output_ids_are_distinct_for_identical_outputs() {
        let mut csprng = OsRng {};
        let keypair = Keypair::generate(&mut csprng);
        let tx = FullTx::new(
            vec![spendable(&keypair, 10, 1)],
            vec![Output::new([9; 32], 5), Output::new([9; 32], 5)],
        );
        let ids = tx.output_ids();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn witness_unlocks_only_its_owners_output() {
        let mut csprng = OsRng {};
        let owner = Keypair::generate(&mut csprng);
        let stranger = Keypair::generate(&mut csprng);
        let input = spendable(&owner, 10, 1);
        let tx_id = [3u8; 32];

        assert!(Witness::new(&owner, &tx_id).unlocks(&input.prevout_data, &tx_id));
        assert!(!Witness::new(&stranger, &tx_id).unlocks(&input.prevout_data, &tx_id));
        assert!(!Witness::new(&owner, &[4u8; 32]).unlocks(&input.prevout_data, &tx_id));
    }
}
