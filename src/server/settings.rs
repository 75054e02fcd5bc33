use crate::util;

use config::{Config, Environment, File};
use ed25519_dalek::Keypair;
use tokio::time::Duration;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

// For explanation, see issue: https://github.com/serde-rs/serde/issues/368
fn default_peer_timeout_ms() -> u64 {
    5000
}
fn default_retry_ms() -> u64 {
    100
}
fn default_connect_timeout_ms() -> u64 {
    1000
}
fn default_init_attempts() -> u32 {
    5
}
fn default_init_delay_ms() -> u64 {
    1000
}

const ENV_PREFIX: &str = "SENTINEL";

/// Settings as read from the configuration file and the environment.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub sentinel_id: u32,
    pub sentinel_endpoints: Vec<String>,
    pub coordinator_endpoints: Vec<String>,
    /// Hex encoded ed25519 secret keys by sentinel id.
    #[serde(default)]
    pub sentinel_private_keys: HashMap<String, String>,
    /// Number of attestations required before submission, 0 disables attestation.
    #[serde(default)]
    pub attestation_threshold: usize,
    #[serde(default = "default_peer_timeout_ms")]
    pub peer_timeout_ms: u64,
    /// How long opening a connection to a peer or the coordinator may take.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_retry_ms")]
    pub peer_retry_ms: u64,
    #[serde(default = "default_retry_ms")]
    pub coordinator_retry_ms: u64,
    #[serde(default = "default_init_attempts")]
    pub coordinator_init_attempts: u32,
    #[serde(default = "default_init_delay_ms")]
    pub coordinator_init_delay_ms: u64,
    #[serde(default)]
    pub audit_db: Option<String>,
}

/// Reasons the sentinel refuses to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The settings could not be read or deserialised.
    Load(String),
    NoSentinelEndpoints,
    SentinelIdOutOfRange { id: u32, endpoints: usize },
    NoCoordinatorEndpoints,
    InvalidEndpoint(String),
    /// Attestation is enabled but this sentinel has no signing key.
    MissingPrivateKey(u32),
    InvalidPrivateKey(u32),
    /// The threshold cannot be met by this sentinel and all of its peers together.
    InsufficientPeers { threshold: usize, available: usize },
    /// A peer must be given longer to answer than to accept a connection.
    ConnectTimeoutTooLong { connect_ms: u64, peer_ms: u64 },
}

impl std::error::Error for ConfigError {}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::convert::From<config::ConfigError> for ConfigError {
    fn from(error: config::ConfigError) -> Self {
        ConfigError::Load(error.to_string())
    }
}

/// Validated, typed configuration of a running sentinel.
#[derive(Debug)]
pub struct SentinelConfig {
    pub sentinel_id: u32,
    /// Where this sentinel listens.
    pub listener_ip: SocketAddr,
    /// The other sentinels, in endpoint list order.
    pub peers: Vec<SocketAddr>,
    pub coordinator: SocketAddr,
    pub keypair: Option<Keypair>,
    pub attestation_threshold: usize,
    pub peer_timeout: Duration,
    pub connect_timeout: Duration,
    pub peer_retry: Duration,
    pub coordinator_retry: Duration,
    pub coordinator_init_attempts: u32,
    pub coordinator_init_delay: Duration,
    pub audit_db: Option<PathBuf>,
}

fn parse_endpoint(endpoint: &str) -> Result<SocketAddr, ConfigError> {
    endpoint.trim().parse().map_err(|_| ConfigError::InvalidEndpoint(endpoint.to_owned()))
}

impl Settings {
    /// Reads the settings from `path`, then applies `SENTINEL_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sentinel_endpoints")
                    .with_list_parse_key("coordinator_endpoints"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Checks the settings and resolves them into a [SentinelConfig].
    pub fn validate(&self) -> Result<SentinelConfig, ConfigError> {
        if self.sentinel_endpoints.is_empty() {
            return Err(ConfigError::NoSentinelEndpoints);
        }
        let id = self.sentinel_id as usize;
        if id >= self.sentinel_endpoints.len() {
            return Err(ConfigError::SentinelIdOutOfRange {
                id: self.sentinel_id,
                endpoints: self.sentinel_endpoints.len(),
            });
        }
        if self.coordinator_endpoints.is_empty() {
            return Err(ConfigError::NoCoordinatorEndpoints);
        }
        if self.connect_timeout_ms >= self.peer_timeout_ms {
            return Err(ConfigError::ConnectTimeoutTooLong {
                connect_ms: self.connect_timeout_ms,
                peer_ms: self.peer_timeout_ms,
            });
        }

        let endpoints = self
            .sentinel_endpoints
            .iter()
            .map(|e| parse_endpoint(e))
            .collect::<Result<Vec<SocketAddr>, ConfigError>>()?;
        let listener_ip = endpoints[id];
        let peers: Vec<SocketAddr> = endpoints.into_iter().filter(|ip| *ip != listener_ip).collect();

        // Each sentinel talks to one coordinator, spreading sentinels over coordinators.
        let coordinators = self.coordinator_endpoints.len();
        let coordinator = parse_endpoint(&self.coordinator_endpoints[id % coordinators])?;

        let keypair = match self.sentinel_private_keys.get(&self.sentinel_id.to_string()) {
            Some(secret) => Some(
                util::keypair_from_hex(secret)
                    .map_err(|_| ConfigError::InvalidPrivateKey(self.sentinel_id))?,
            ),
            None => None,
        };
        if self.attestation_threshold > 0 {
            if keypair.is_none() {
                return Err(ConfigError::MissingPrivateKey(self.sentinel_id));
            }
            if self.attestation_threshold > peers.len() + 1 {
                return Err(ConfigError::InsufficientPeers {
                    threshold: self.attestation_threshold,
                    available: peers.len() + 1,
                });
            }
        }

        Ok(SentinelConfig {
            sentinel_id: self.sentinel_id,
            listener_ip,
            peers,
            coordinator,
            keypair,
            attestation_threshold: self.attestation_threshold,
            peer_timeout: Duration::from_millis(self.peer_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            peer_retry: Duration::from_millis(self.peer_retry_ms),
            coordinator_retry: Duration::from_millis(self.coordinator_retry_ms),
            coordinator_init_attempts: self.coordinator_init_attempts,
            coordinator_init_delay: Duration::from_millis(self.coordinator_init_delay_ms),
            audit_db: self.audit_db.as_ref().map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use config::FileFormat;
    use rand::rngs::OsRng;

    const SECRET: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    fn three_sentinels(threshold: usize) -> Settings {
        let mut keys = HashMap::new();
        let _ = keys.insert("1".to_owned(), SECRET.to_owned());
        Settings {
            sentinel_id: 1,
            sentinel_endpoints: vec![
                "127.0.0.1:20000".to_owned(),
                "127.0.0.1:20001".to_owned(),
                "127.0.0.1:20002".to_owned(),
            ],
            coordinator_endpoints: vec!["127.0.0.1:30000".to_owned(), "127.0.0.1:30001".to_owned()],
            sentinel_private_keys: keys,
            attestation_threshold: threshold,
            peer_timeout_ms: default_peer_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            peer_retry_ms: default_retry_ms(),
            coordinator_retry_ms: default_retry_ms(),
            coordinator_init_attempts: default_init_attempts(),
            coordinator_init_delay_ms: default_init_delay_ms(),
            audit_db: None,
        }
    }

    #[test]
    fn resolves_own_endpoint_peers_and_coordinator() {
        let config = three_sentinels(2).validate().unwrap();
        assert_eq!(config.listener_ip, "127.0.0.1:20001".parse().unwrap());
        assert_eq!(
            config.peers,
            vec!["127.0.0.1:20000".parse().unwrap(), "127.0.0.1:20002".parse().unwrap()]
        );
        assert_eq!(config.coordinator, "127.0.0.1:30001".parse().unwrap());
        assert_eq!(config.peer_timeout, Duration::from_millis(5000));
        assert_eq!(config.connect_timeout, Duration::from_millis(1000));
        let keypair = config.keypair.unwrap();
        assert_eq!(
            hex::encode(keypair.public.as_bytes()),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }

    #[test]
    fn rejects_out_of_range_id() {
        let mut settings = three_sentinels(0);
        settings.sentinel_id = 3;
        assert_eq!(
            settings.validate().err(),
            Some(ConfigError::SentinelIdOutOfRange { id: 3, endpoints: 3 })
        );
    }

    #[test]
    fn rejects_empty_endpoint_lists() {
        let mut settings = three_sentinels(0);
        settings.coordinator_endpoints.clear();
        assert_eq!(settings.validate().err(), Some(ConfigError::NoCoordinatorEndpoints));
        settings.sentinel_endpoints.clear();
        assert_eq!(settings.validate().err(), Some(ConfigError::NoSentinelEndpoints));
    }

    #[test]
    fn rejects_malformed_endpoint() {
        let mut settings = three_sentinels(0);
        settings.sentinel_endpoints[2] = "localhost".to_owned();
        assert_eq!(
            settings.validate().err(),
            Some(ConfigError::InvalidEndpoint("localhost".to_owned()))
        );
    }

    #[test]
    fn key_is_required_only_for_attestation() {
        let mut settings = three_sentinels(1);
        settings.sentinel_private_keys.clear();
        assert_eq!(settings.validate().err(), Some(ConfigError::MissingPrivateKey(1)));

        settings.attestation_threshold = 0;
        let config = settings.validate().unwrap();
        assert!(config.keypair.is_none());
    }

    #[test]
    fn rejects_bad_key() {
        let mut settings = three_sentinels(0);
        let _ = settings.sentinel_private_keys.insert("1".to_owned(), "0badkey".to_owned());
        assert_eq!(settings.validate().err(), Some(ConfigError::InvalidPrivateKey(1)));
    }

    #[test]
    fn rejects_unreachable_threshold() {
        assert!(three_sentinels(3).validate().is_ok());
        assert_eq!(
            three_sentinels(4).validate().err(),
            Some(ConfigError::InsufficientPeers { threshold: 4, available: 3 })
        );
    }

    #[test]
    fn connecting_must_time_out_before_answering() {
        let mut settings = three_sentinels(0);
        settings.connect_timeout_ms = 5000;
        assert_eq!(
            settings.validate().err(),
            Some(ConfigError::ConnectTimeoutTooLong { connect_ms: 5000, peer_ms: 5000 })
        );
        settings.connect_timeout_ms = 4999;
        assert_eq!(settings.validate().unwrap().connect_timeout, Duration::from_millis(4999));
    }

    #[test]
    fn own_endpoint_listed_twice_is_not_a_peer() {
        let mut settings = three_sentinels(0);
        settings.sentinel_endpoints.push("127.0.0.1:20001".to_owned());
        assert_eq!(settings.validate().unwrap().peers.len(), 2);
    }

    #[test]
    fn deserialises_with_defaults() {
        let mut csprng = OsRng {};
        let secret = hex::encode(Keypair::generate(&mut csprng).secret.as_bytes());
        let json = format!(
            r#"{{
                "sentinel_id": 0,
                "sentinel_endpoints": ["127.0.0.1:20000"],
                "coordinator_endpoints": ["127.0.0.1:30000"],
                "sentinel_private_keys": {{ "0": "{}" }},
                "attestation_threshold": 1
            }}"#,
            secret
        );
        let settings: Settings = Config::builder()
            .add_source(File::from_str(&json, FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.peer_retry_ms, 100);
        assert_eq!(settings.connect_timeout_ms, 1000);
        assert_eq!(settings.coordinator_init_attempts, 5);
        assert!(settings.audit_db.is_none());

        let config = settings.validate().unwrap();
        assert!(config.peers.is_empty());
        assert!(config.keypair.is_some());
    }
}
