// A 256-bit blake3 digest.
pub type Hash = [u8; 32];

// The deterministic identity of a transaction.
pub type TxId = Hash;

// The hash of the public key allowed to spend an output.
pub type PublicKeyHash = Hash;

pub type Amount = u64;
