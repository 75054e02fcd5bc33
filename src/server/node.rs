use crate::audit::{AuditSink, RecordTx};
use crate::client::{PeerClient, Probe, RequestAttestation};
use crate::colored::Colorize;
use crate::coordinator::{CoordinatorClient, Init, Submitter};
use crate::sentinel::{Controller, Gatherer, PeerSelector};
use crate::server::{Router, SentinelConfig, Server};
use crate::Result;

use actix::{Actor, Addr, Recipient};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Tries to reach the coordinator up to `attempts` times, doubling `delay` after each failure.
pub async fn init_coordinator(coordinator: &Recipient<Init>, attempts: u32, delay: Duration) -> bool {
    let mut delay = delay;
    for attempt in 1..=attempts {
        match coordinator.send(Init).await {
            Ok(true) => return true,
            Ok(false) => warn!(
                "[{}] coordinator not reachable (attempt {}/{})",
                "node".yellow(),
                attempt,
                attempts
            ),
            Err(err) => error!("[{}] coordinator client: {:?}", "node".yellow(), err),
        }
        if attempt < attempts {
            sleep(delay).await;
            delay *= 2;
        }
    }
    false
}

fn start_audit(config: &SentinelConfig) -> Option<Recipient<RecordTx>> {
    let path = config.audit_db.as_ref()?;
    match AuditSink::open(path) {
        Ok(sink) => {
            info!("[{}] recording transactions in {:?}", "node".yellow(), path);
            Some(sink.start_isolated().recipient())
        }
        Err(err) => {
            error!("[{}] audit disabled, cannot open {:?}: {}", "node".yellow(), path, err);
            None
        }
    }
}

fn start_peers(config: &SentinelConfig) -> Vec<Addr<PeerClient>> {
    config.peers.iter().map(|ip| PeerClient::new(*ip, config.connect_timeout).start()).collect()
}

/// Starts the sentinel's actors and begins serving on its own endpoint.
///
/// Only a failure to bind the listener is fatal. An unreachable coordinator or peer is
/// logged and left to the retry policies of the submitter and the quorum gatherer.
pub async fn run(config: SentinelConfig) -> Result<()> {
    info!(
        "[{}] sentinel {} starting on {} with {} peers, threshold {}",
        "node".yellow(),
        config.sentinel_id,
        config.listener_ip,
        config.peers.len(),
        config.attestation_threshold
    );

    let audit = start_audit(&config);

    let coordinator = CoordinatorClient::new(config.coordinator, config.connect_timeout).start();
    if init_coordinator(
        &coordinator.clone().recipient(),
        config.coordinator_init_attempts,
        config.coordinator_init_delay,
    )
    .await
    {
        info!("[{}] connected to coordinator {}", "node".yellow(), config.coordinator);
    } else {
        error!(
            "[{}] coordinator {} unreachable, continuing degraded",
            "node".yellow(),
            config.coordinator
        );
    }

    let peers = start_peers(&config);
    for (peer, ip) in peers.iter().zip(config.peers.iter()) {
        let peer = peer.clone();
        let ip = *ip;
        let _ = actix::spawn(async move {
            if let Ok(true) = peer.send(Probe).await {
                info!("[{}] connected to sentinel {}", "node".yellow(), ip);
            }
        });
    }
    let recipients: Vec<Recipient<RequestAttestation>> =
        peers.into_iter().map(|peer| peer.recipient()).collect();

    let gatherer = Gatherer::new(
        recipients,
        PeerSelector::new(config.peers.len()),
        config.attestation_threshold,
        config.peer_timeout,
        config.peer_retry,
    );
    let submitter = Submitter::new(coordinator.recipient(), config.coordinator_retry, audit);
    let controller = Controller::new(config.sentinel_id, config.keypair, gatherer, submitter).start();

    let router = Router::new(controller).start();
    let server = Server::bind(config.listener_ip, router).await?;
    let _ = actix::spawn(server.listen());
    Ok(())
}
