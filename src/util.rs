use crate::transaction::{Error, Result};

use ed25519_dalek::{Keypair, PublicKey, SecretKey, SECRET_KEY_LENGTH};

/// Rebuilds a keypair from a hex encoded 32-byte ed25519 secret key.
pub fn keypair_from_hex(secret_hex: &str) -> Result<Keypair> {
    let bytes = hex::decode(secret_hex.trim())?;
    if bytes.len() != SECRET_KEY_LENGTH {
        return Err(Error::InvalidKeyLength(bytes.len()));
    }
    let secret = SecretKey::from_bytes(&bytes)?;
    let public = PublicKey::from(&secret);
    Ok(Keypair { secret, public })
}

/// Short hex prefix of a hash, for log lines.
pub fn short_hex(bytes: &[u8]) -> String {
    let n = std::cmp::min(bytes.len(), 8);
    hex::encode(&bytes[..n])
}

#[cfg(test)]
mod test {
    use super::*;

    use rand::rngs::OsRng;

    #[test]
    fn keypair_round_trips_through_hex() {
        let mut csprng = OsRng {};
        let keypair = Keypair::generate(&mut csprng);
        let restored = keypair_from_hex(&hex::encode(keypair.secret.as_bytes())).unwrap();
        assert_eq!(restored.public, keypair.public);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert_eq!(keypair_from_hex("abcd").err(), Some(Error::InvalidKeyLength(2)));
        assert!(keypair_from_hex("zz").is_err());
    }
}
