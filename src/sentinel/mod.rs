//! The transaction admission pipeline.
//!
//! A transaction is statically validated, summarised as a [CompactTx][crate::transaction::CompactTx],
//! attested by this sentinel and a quorum of its peers, then submitted to the coordinator.
mod controller;
pub mod peer_selector;
pub mod quorum;
mod result;


pub use controller::*;
pub use peer_selector::PeerSelector;
pub use quorum::{Gathered, Gatherer};
pub use result::*;
