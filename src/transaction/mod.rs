//! The transaction formats exchanged by sentinels.
//!
//! A [FullTx] is what callers submit and what peers re-validate. Everything on the
//! consensus path after static validation works on its [CompactTx] summary.
mod attestation;
mod compact_tx;
mod full_tx;
pub mod types;
pub mod validation;

pub use attestation::*;
pub use compact_tx::*;
pub use full_tx::*;

#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    Hex(String),
    Dalek(String),
    InvalidKeyLength(usize),
}

impl std::error::Error for Error {}

impl std::convert::From<hex::FromHexError> for Error {
    fn from(error: hex::FromHexError) -> Self {
        Error::Hex(format!("{:?}", error))
    }
}

impl std::convert::From<ed25519_dalek::ed25519::Error> for Error {
    fn from(error: ed25519_dalek::ed25519::Error) -> Self {
        Error::Dalek(format!("{:?}", error))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
