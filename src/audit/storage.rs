use super::{RecordTx, Result};
use crate::transaction::types::{Hash, TxId};

use sled::Transactional;
use tai64::Tai64N;
use zerocopy::{AsBytes, FromBytes, Unaligned};

const TRANSACTIONS: &str = "transactions";
const INPUTS: &str = "inputs";
const OUTPUTS: &str = "outputs";
const UNSPENT: &str = "unspent";

#[derive(Clone, FromBytes, AsBytes, Unaligned)]
#[repr(C)]
struct Key {
    hash: [u8; 32],
}

impl Key {
    fn new(hash: Hash) -> Key {
        Key { hash }
    }
}

/// What is kept for every recorded transaction.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub inputs: Vec<Hash>,
    pub outputs: Vec<Hash>,
    pub recorded_at: Tai64N,
}

/// Stores the record and moves its consumed entries out of / produced entries into the
/// unspent set, atomically.
pub fn record_tx(db: &sled::Db, msg: &RecordTx) -> Result<()> {
    let record = AuditRecord {
        inputs: msg.inputs.clone(),
        outputs: msg.outputs.clone(),
        recorded_at: Tai64N::now(),
    };
    let encoded = bincode::serialize(&record)?;
    let tx_key = Key::new(msg.tx_id);

    let transactions = db.open_tree(TRANSACTIONS)?;
    let inputs = db.open_tree(INPUTS)?;
    let outputs = db.open_tree(OUTPUTS)?;
    let unspent = db.open_tree(UNSPENT)?;

    let result: std::result::Result<(), sled::transaction::TransactionError<()>> =
        (&transactions, &inputs, &outputs, &unspent).transaction(|(t, i, o, u)| {
            let _ = t.insert(tx_key.as_bytes(), encoded.as_slice())?;
            for input in msg.inputs.iter() {
                let key = Key::new(*input);
                let _ = i.insert(key.as_bytes(), tx_key.as_bytes())?;
                let _ = u.remove(key.as_bytes())?;
            }
            for output in msg.outputs.iter() {
                let key = Key::new(*output);
                let _ = o.insert(key.as_bytes(), tx_key.as_bytes())?;
                let _ = u.insert(key.as_bytes(), tx_key.as_bytes())?;
            }
            Ok(())
        });
    match result {
        Ok(()) => Ok(()),
        Err(sled::transaction::TransactionError::Storage(err)) => Err(err.into()),
        Err(sled::transaction::TransactionError::Abort(())) => Ok(()),
    }
}

pub fn get_record(db: &sled::Db, tx_id: &TxId) -> Result<Option<AuditRecord>> {
    let transactions = db.open_tree(TRANSACTIONS)?;
    match transactions.get(Key::new(*tx_id).as_bytes())? {
        Some(v) => Ok(Some(bincode::deserialize(v.as_ref())?)),
        None => Ok(None),
    }
}

pub fn is_unspent(db: &sled::Db, id: &Hash) -> Result<bool> {
    let unspent = db.open_tree(UNSPENT)?;
    Ok(unspent.contains_key(Key::new(*id).as_bytes())?)
}
