#[macro_use]
extern crate serde_derive;
#[macro_use(Message, MessageResponse)]
extern crate actix_derive;
extern crate colored;

pub mod audit;
pub mod channel;
pub mod client;
pub mod coordinator;
pub mod protocol;
pub mod sentinel;
pub mod server;
pub mod transaction;
pub mod util;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Dalek(ed25519_dalek::ed25519::Error),
    Sled(sled::Error),
    Actix(actix::MailboxError),
    Bincode(String),

    // channel errors
    ChannelError(String),
    EmptyResponse,
    InvalidResponse,
    Timeout,

    // dispatch errors
    /// A connection to the remote endpoint could not be opened
    Unreachable,
    /// The coordinator did not accept a submission for dispatch
    NotAccepted,

    // startup errors
    Config(server::ConfigError),
    Transaction(transaction::Error),
}

impl std::error::Error for Error {}

impl std::convert::From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl std::convert::From<ed25519_dalek::ed25519::Error> for Error {
    fn from(error: ed25519_dalek::ed25519::Error) -> Self {
        Error::Dalek(error)
    }
}

impl std::convert::From<sled::Error> for Error {
    fn from(error: sled::Error) -> Self {
        Error::Sled(error)
    }
}

impl std::convert::From<actix::MailboxError> for Error {
    fn from(error: actix::MailboxError) -> Self {
        Error::Actix(error)
    }
}

impl std::convert::From<Box<bincode::ErrorKind>> for Error {
    fn from(error: Box<bincode::ErrorKind>) -> Self {
        Error::Bincode(format!("{:?}", error))
    }
}

impl std::convert::From<server::ConfigError> for Error {
    fn from(error: server::ConfigError) -> Self {
        Error::Config(error)
    }
}

impl std::convert::From<transaction::Error> for Error {
    fn from(error: transaction::Error) -> Self {
        Error::Transaction(error)
    }
}

impl std::convert::From<channel::Error> for Error {
    fn from(error: channel::Error) -> Self {
        match error {
            channel::Error::IO(io_err) => Error::IO(io_err),
            channel::Error::ReadError(err) => Error::ChannelError(format!("{:?}", err)),
            channel::Error::WriteError(err) => Error::ChannelError(format!("{:?}", err)),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
