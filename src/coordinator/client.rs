use super::{CoordinatorRequest, CoordinatorResponse};
use crate::channel::Channel;
use crate::colored::Colorize;
use crate::transaction::CompactTx;
use crate::{Error, Result};

use actix::{Actor, Context, Handler, ResponseFuture};
use tokio::sync::oneshot;
use tokio::time::Duration;
use tracing::{debug, warn};

use std::net::SocketAddr;

/// Delivers the coordinator's outcome for an accepted submission.
pub type Outcome = oneshot::Receiver<Option<bool>>;

/// Client for one coordinator endpoint.
pub struct CoordinatorClient {
    ip: SocketAddr,
    connect_timeout: Duration,
}

impl CoordinatorClient {
    pub fn new(ip: SocketAddr, connect_timeout: Duration) -> Self {
        CoordinatorClient { ip, connect_timeout }
    }
}

impl Actor for CoordinatorClient {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        debug!("started coordinator client for {}", self.ip);
    }
}

/// Checks that the coordinator accepts connections.
#[derive(Debug, Clone, Message)]
#[rtype(result = "bool")]
pub struct Init;

impl Handler<Init> for CoordinatorClient {
    type Result = ResponseFuture<bool>;

    fn handle(&mut self, _msg: Init, _ctx: &mut Context<Self>) -> Self::Result {
        let ip = self.ip;
        let connect_timeout = self.connect_timeout;
        Box::pin(async move {
            Channel::<CoordinatorRequest, CoordinatorResponse>::connect_within(&ip, connect_timeout)
                .await
                .is_ok()
        })
    }
}

/// Submits a fully attested transaction.
///
/// Resolves to `Ok` as soon as the request is handed to the coordinator connection, with
/// a receiver for the eventual outcome, or to `Err` if it could not be dispatched. An
/// accepted submission always delivers exactly one outcome; a connection lost after
/// acceptance delivers `None`.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<Outcome>")]
pub struct SubmitTx {
    pub ctx: CompactTx,
}

impl Handler<SubmitTx> for CoordinatorClient {
    type Result = ResponseFuture<Result<Outcome>>;

    fn handle(&mut self, msg: SubmitTx, _ctx: &mut Context<Self>) -> Self::Result {
        let ip = self.ip;
        let connect_timeout = self.connect_timeout;
        let (accepted_tx, accepted_rx) = oneshot::channel::<bool>();
        let (outcome_tx, outcome_rx) = oneshot::channel::<Option<bool>>();

        let _ = tokio::spawn(async move {
            let mut channel: Channel<CoordinatorRequest, CoordinatorResponse> =
                match Channel::connect_within(&ip, connect_timeout).await {
                    Ok(channel) => channel,
                    Err(err) => {
                        debug!("coordinator {} unreachable: {}", ip, err);
                        let _ = accepted_tx.send(false);
                        return;
                    }
                };
            let (mut sender, mut receiver) = channel.split();
            if let Err(err) = sender.send(CoordinatorRequest::ExecuteTx(msg.ctx)).await {
                debug!("coordinator {} write failed: {}", ip, err);
                let _ = accepted_tx.send(false);
                return;
            }
            let _ = accepted_tx.send(true);

            let outcome = match receiver.recv().await {
                Ok(Some(CoordinatorResponse::Outcome(outcome))) => outcome,
                Ok(None) => {
                    warn!("[{}] {} closed the connection without an outcome", "coordinator".magenta(), ip);
                    None
                }
                Err(err) => {
                    warn!("[{}] reading outcome from {} failed: {}", "coordinator".magenta(), ip, err);
                    None
                }
            };
            let _ = outcome_tx.send(outcome);
        });

        Box::pin(async move {
            match accepted_rx.await {
                Ok(true) => Ok(outcome_rx),
                _ => Err(Error::NotAccepted),
            }
        })
    }
}
