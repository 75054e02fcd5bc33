use super::router::Router;
use crate::channel::Channel;
use crate::colored::Colorize;
use crate::protocol::{Request, Response};
use crate::Result;
use tracing::{debug, error, info, warn};

use actix::Addr;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_RETRY: Duration = Duration::from_millis(50);

/// Implements a server for handling incoming connections.
pub struct Server {
    /// The listener, bound to this sentinel's endpoint.
    listener: TcpListener,
    /// The address of the router.
    router: Addr<Router>,
}

impl Server {
    /// Binds the listener. Failing to bind is fatal for the sentinel.
    pub async fn bind(ip: SocketAddr, router: Addr<Router>) -> Result<Server> {
        let listener = TcpListener::bind(ip).await?;
        Ok(Server { listener, router })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves connections forever. Each connection may carry any number of requests,
    /// answered in order.
    pub async fn listen(self) {
        info!("[{}] listening on {:?}", "server".green(), self.listener.local_addr().ok());
        loop {
            let mut channel: Channel<Response, Request> = match Channel::accept(&self.listener).await {
                Ok(channel) => channel,
                Err(err) => {
                    warn!("[{}] accept failed: {}", "server".green(), err);
                    sleep(ACCEPT_RETRY).await;
                    continue;
                }
            };
            let router = self.router.clone();
            let _ = tokio::spawn(async move {
                let peer = channel.peer_addr();
                let (mut sender, mut receiver) = channel.split();
                loop {
                    let request = match receiver.recv().await {
                        Ok(Some(request)) => request,
                        Ok(None) => break,
                        Err(err) => {
                            warn!("[{}] bad request from {:?}: {}", "server".green(), peer, err);
                            break;
                        }
                    };
                    let response = match router.send(request).await {
                        Ok(response) => response,
                        Err(err) => {
                            error!("[{}] router unavailable: {:?}", "server".green(), err);
                            Response::Unavailable
                        }
                    };
                    if let Err(err) = sender.send(response).await {
                        debug!("could not answer {:?}: {}", peer, err);
                        break;
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::client::oneshot;
    use crate::coordinator::{CoordinatorClient, Submitter};
    use crate::sentinel::{Controller, ExecuteTx, Gatherer, PeerSelector, TxStatus, ValidateTx};
    use crate::transaction::validation::ValidationError;
    use crate::transaction::{public_key_hash, FullTx, Input, OutPoint, Output};

    use actix::Actor;
    use ed25519_dalek::Keypair;
    use rand::rngs::OsRng;
    use tokio::time::Duration;

    const TIMEOUT: Duration = Duration::from_millis(500);

    async fn serve() -> (SocketAddr, Keypair) {
        let mut csprng = OsRng {};
        let keypair = Keypair::generate(&mut csprng);
        let coordinator = CoordinatorClient::new("127.0.0.1:1".parse().unwrap(), TIMEOUT).start();
        let gatherer = Gatherer::new(vec![], PeerSelector::new(0), 1, TIMEOUT, TIMEOUT);
        let submitter = Submitter::new(coordinator.recipient(), TIMEOUT, None);
        let own = Keypair::from_bytes(&keypair.to_bytes()).unwrap();
        let controller = Controller::new(0, Some(own), gatherer, submitter).start();
        let router = Router::new(controller).start();
        let server = Server::bind("127.0.0.1:0".parse().unwrap(), router).await.unwrap();
        let ip = server.local_addr().unwrap();
        let _ = actix::spawn(server.listen());
        (ip, keypair)
    }

    fn valid_tx() -> FullTx {
        let owner = Keypair::generate(&mut OsRng {});
        let lock = public_key_hash(&owner.public);
        FullTx::signed(
            vec![Input::new(OutPoint::new([3; 32], 0), Output::new(lock, 10))],
            vec![Output::new(lock, 10)],
            &owner,
        )
    }

    #[actix_rt::test]
    async fn keeps_serving_after_broken_connections() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::TcpStream;

        let (ip, _) = serve().await;

        // Dropped without a request.
        drop(TcpStream::connect(ip).await.unwrap());
        // A frame which does not decode as a request.
        let mut garbage = TcpStream::connect(ip).await.unwrap();
        garbage.write_all(&[0, 0, 0, 4, 0xff, 0xff, 0xff, 0xff]).await.unwrap();
        drop(garbage);

        let response = oneshot(ip, Request::ValidateTx(ValidateTx { tx: valid_tx() }), TIMEOUT).await.unwrap();
        match response {
            Response::ValidateTxAck(ack) => assert!(ack.attestation.is_some()),
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn answers_validation_requests() {
        let (ip, keypair) = serve().await;
        let tx = valid_tx();

        let response = oneshot(ip, Request::ValidateTx(ValidateTx { tx: tx.clone() }), TIMEOUT).await.unwrap();
        match response {
            Response::ValidateTxAck(ack) => {
                let attestation = ack.attestation.unwrap();
                assert_eq!(attestation.public_key, keypair.public);
                assert!(attestation.verify(&tx.id()));
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn reports_static_violations() {
        let (ip, _) = serve().await;
        let tx = FullTx::new(vec![], vec![]);
        let response = oneshot(ip, Request::ExecuteTx(ExecuteTx { tx }), TIMEOUT).await.unwrap();
        match response {
            Response::ExecuteTxAck(Some(response)) => {
                assert_eq!(response.status, TxStatus::StaticInvalid);
                assert_eq!(response.error, Some(ValidationError::NoInputs));
            }
            other => panic!("unexpected response {:?}", other),
        }
    }
}
