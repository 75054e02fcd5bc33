use crate::channel::Channel;
use crate::colored::Colorize;
use crate::protocol::{Request, Response};
use crate::sentinel::ValidateTx;
use crate::transaction::{Attestation, FullTx};
use crate::{Error, Result};
use tracing::{debug, warn};

use actix::{Actor, Context, Handler, ResponseFuture};
use std::net::SocketAddr;
use tokio::time::Duration;

/// Sends a single request to a sentinel and waits for its response.
///
/// Returns [Error::Unreachable] when no connection could be opened, meaning the request
/// was never dispatched.
pub async fn oneshot(ip: SocketAddr, request: Request, connect_timeout: Duration) -> Result<Response> {
    let mut channel: Channel<Request, Response> =
        Channel::connect_within(&ip, connect_timeout).await.map_err(|err| {
            debug!("cannot reach {}: {}", ip, err);
            Error::Unreachable
        })?;
    let (mut sender, mut receiver) = channel.split();
    let () = sender.send(request).await?;
    match receiver.recv().await? {
        Some(response) => Ok(response),
        None => Err(Error::EmptyResponse),
    }
}

/// The client side of the connection to another sentinel.
pub struct PeerClient {
    ip: SocketAddr,
    connect_timeout: Duration,
}

impl PeerClient {
    pub fn new(ip: SocketAddr, connect_timeout: Duration) -> PeerClient {
        PeerClient { ip, connect_timeout }
    }
}

impl Actor for PeerClient {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        debug!("started peer client for {}", self.ip);
    }
}

/// Checks that the peer accepts connections.
#[derive(Debug, Clone, Message)]
#[rtype(result = "bool")]
pub struct Probe;

impl Handler<Probe> for PeerClient {
    type Result = ResponseFuture<bool>;

    fn handle(&mut self, _msg: Probe, _ctx: &mut Context<Self>) -> Self::Result {
        let ip = self.ip;
        let connect_timeout = self.connect_timeout;
        Box::pin(async move {
            match Channel::<Request, Response>::connect_within(&ip, connect_timeout).await {
                Ok(_) => true,
                Err(err) => {
                    warn!("[{}] failed to connect to sentinel {}: {}", "client".yellow(), ip, err);
                    false
                }
            }
        })
    }
}

/// Asks the peer to validate `tx` and return its attestation.
///
/// `Ok(None)` means the peer found the transaction invalid.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<Option<Attestation>>")]
pub struct RequestAttestation {
    pub tx: FullTx,
}

impl Handler<RequestAttestation> for PeerClient {
    type Result = ResponseFuture<Result<Option<Attestation>>>;

    fn handle(&mut self, msg: RequestAttestation, _ctx: &mut Context<Self>) -> Self::Result {
        let ip = self.ip;
        let connect_timeout = self.connect_timeout;
        Box::pin(async move {
            let request = Request::ValidateTx(ValidateTx { tx: msg.tx });
            match oneshot(ip, request, connect_timeout).await? {
                Response::ValidateTxAck(ack) => Ok(ack.attestation),
                other => {
                    debug!("unexpected response from {}: {:?}", ip, other);
                    Err(Error::InvalidResponse)
                }
            }
        })
    }
}
