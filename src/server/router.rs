use crate::colored::Colorize;
use crate::protocol::{Request, Response};
use crate::sentinel::Controller;

use tracing::{debug, error};

use actix::{Actor, Addr, Context, Handler, ResponseFuture};

/// Dispatches requests arriving at the server to the actor that handles them.
pub struct Router {
    controller: Addr<Controller>,
}

impl Router {
    pub fn new(controller: Addr<Controller>) -> Self {
        Router { controller }
    }
}

impl Actor for Router {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        debug!("router> started");
    }
}

impl Handler<Request> for Router {
    type Result = ResponseFuture<Response>;

    fn handle(&mut self, msg: Request, _ctx: &mut Context<Self>) -> Self::Result {
        let controller = self.controller.clone();
        Box::pin(async move {
            match msg {
                Request::ExecuteTx(execute_tx) => {
                    debug!("routing ExecuteTx -> Controller");
                    match controller.send(execute_tx).await {
                        Ok(response) => Response::ExecuteTxAck(response),
                        Err(err) => {
                            error!("[{}] controller unavailable: {:?}", "router".blue(), err);
                            Response::Unavailable
                        }
                    }
                }
                Request::ValidateTx(validate_tx) => {
                    debug!("routing ValidateTx -> Controller");
                    match controller.send(validate_tx).await {
                        Ok(ack) => Response::ValidateTxAck(ack),
                        Err(err) => {
                            error!("[{}] controller unavailable: {:?}", "router".blue(), err);
                            Response::Unavailable
                        }
                    }
                }
            }
        })
    }
}
