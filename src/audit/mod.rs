//! Optional record keeping of submitted transactions for reporting.
//!
//! The sink is fed fire-and-forget by the submitter; nothing it does, including failing,
//! affects the admission of a transaction.
mod storage;

use crate::colored::Colorize;
use crate::transaction::types::{Hash, TxId};
use crate::transaction::CompactTx;
use crate::util::short_hex;

use actix::{Actor, Addr, Arbiter, Context, Handler};
use tracing::{debug, error};

use std::path::Path;

pub use storage::AuditRecord;

#[derive(Debug)]
pub enum Error {
    Sled(sled::Error),
    Bincode(String),
}

impl std::error::Error for Error {}

impl std::convert::From<sled::Error> for Error {
    fn from(error: sled::Error) -> Self {
        Error::Sled(error)
    }
}

impl std::convert::From<Box<bincode::ErrorKind>> for Error {
    fn from(error: Box<bincode::ErrorKind>) -> Self {
        Error::Bincode(format!("{:?}", error))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Owns the audit database. Only this actor touches it.
pub struct AuditSink {
    db: sled::Db,
}

impl AuditSink {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(AuditSink { db: sled::open(path)? })
    }

    /// An in-memory sink, dropped with the actor.
    pub fn temporary() -> Result<Self> {
        Ok(AuditSink { db: sled::Config::new().temporary(true).open()? })
    }

    /// Starts the sink on an arbiter of its own, so that database writes never run on
    /// the thread serving transactions.
    pub fn start_isolated(self) -> Addr<Self> {
        let arbiter = Arbiter::new();
        AuditSink::start_in_arbiter(&arbiter.handle(), move |_| self)
    }
}

impl Actor for AuditSink {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        debug!("started audit sink");
    }
}

/// Records a transaction accepted by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, Message)]
#[rtype(result = "()")]
pub struct RecordTx {
    pub tx_id: TxId,
    pub inputs: Vec<Hash>,
    pub outputs: Vec<Hash>,
}

impl From<&CompactTx> for RecordTx {
    fn from(ctx: &CompactTx) -> Self {
        RecordTx { tx_id: ctx.id, inputs: ctx.inputs.clone(), outputs: ctx.outputs.clone() }
    }
}

impl Handler<RecordTx> for AuditSink {
    type Result = ();

    fn handle(&mut self, msg: RecordTx, _ctx: &mut Context<Self>) -> Self::Result {
        match storage::record_tx(&self.db, &msg) {
            Ok(()) => debug!("[{}] recorded {}", "audit".yellow(), short_hex(&msg.tx_id)),
            Err(err) => {
                error!("[{}] failed to record {}: {}", "audit".yellow(), hex::encode(msg.tx_id), err)
            }
        }
    }
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<Option<AuditRecord>>")]
pub struct GetRecord {
    pub tx_id: TxId,
}

impl Handler<GetRecord> for AuditSink {
    type Result = Result<Option<AuditRecord>>;

    fn handle(&mut self, msg: GetRecord, _ctx: &mut Context<Self>) -> Self::Result {
        storage::get_record(&self.db, &msg.tx_id)
    }
}

/// Whether a ledger entry was produced by a recorded transaction and not yet consumed by one.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<bool>")]
pub struct IsUnspent {
    pub id: Hash,
}

impl Handler<IsUnspent> for AuditSink {
    type Result = Result<bool>;

    fn handle(&mut self, msg: IsUnspent, _ctx: &mut Context<Self>) -> Self::Result {
        storage::is_unspent(&self.db, &msg.id)
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Message)]
#[rtype(result = "String")]
struct ThreadName;

#[cfg(test)]
impl Handler<ThreadName> for AuditSink {
    type Result = String;

    fn handle(&mut self, _msg: ThreadName, _ctx: &mut Context<Self>) -> Self::Result {
        format!("{:?}", std::thread::current().id())
    }
}
