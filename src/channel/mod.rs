//! Length-delimited bincode framing over TCP.
mod asymmetric;

pub use asymmetric::*;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    ReadError(std::io::Error),
    WriteError(std::io::Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
