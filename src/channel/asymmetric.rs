use super::Error;

use futures::prelude::*;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::tcp::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tokio_serde::formats::*;
use tokio_serde::Framed;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

/// Reads `O` frames from the read half of a socket (`I` is the item written by the peer half).
pub type Reader<'a, I, O> =
    Framed<FramedRead<ReadHalf<'a>, LengthDelimitedCodec>, O, I, Bincode<O, I>>;

/// Writes `I` frames to the write half of a socket.
pub type Writer<'a, I, O> =
    Framed<FramedWrite<WriteHalf<'a>, LengthDelimitedCodec>, O, I, Bincode<O, I>>;

pub struct Receiver<'a, I, O> {
    reader: Reader<'a, I, O>,
}

impl<'a, I, O> Receiver<'a, I, O>
where
    I: for<'de> Deserialize<'de> + Serialize,
    O: for<'de> Deserialize<'de> + Serialize,
    Reader<'a, I, O>: TryStream<Ok = O, Error = std::io::Error> + Unpin,
{
    /// Waits for the next frame, `None` once the peer closed the connection.
    pub async fn recv(&mut self) -> Result<Option<O>, Error> {
        self.reader.try_next().await.map_err(Error::ReadError)
    }
}

pub struct Sender<'a, I, O> {
    writer: Writer<'a, I, O>,
}

impl<'a, I, O> Sender<'a, I, O>
where
    I: for<'de> Deserialize<'de> + Serialize,
    O: for<'de> Deserialize<'de> + Serialize,
    Writer<'a, I, O>: Sink<I, Error = std::io::Error> + Unpin,
{
    pub async fn send(&mut self, item: I) -> Result<(), Error> {
        self.writer.send(item).await.map_err(Error::WriteError)
    }
}

/// A TCP connection which writes `I` and reads `O`.
pub struct Channel<I, O> {
    socket: TcpStream,
    ghost: std::marker::PhantomData<(I, O)>,
}

impl<I, O> Channel<I, O>
where
    I: for<'de> Deserialize<'de> + Serialize,
    O: for<'de> Deserialize<'de> + Serialize,
{
    pub async fn connect(address: &SocketAddr) -> Result<Channel<I, O>, Error> {
        let socket = TcpStream::connect(address).await.map_err(Error::IO)?;
        Ok(Channel { socket, ghost: Default::default() })
    }

    /// Like [Channel::connect] but gives up after `delta`.
    pub async fn connect_within(address: &SocketAddr, delta: Duration) -> Result<Channel<I, O>, Error> {
        match timeout(delta, Channel::connect(address)).await {
            Ok(result) => result,
            Err(_) => Err(Error::IO(std::io::ErrorKind::TimedOut.into())),
        }
    }

    pub async fn accept(listener: &TcpListener) -> Result<Channel<I, O>, Error> {
        let (socket, _) = listener.accept().await.map_err(Error::IO)?;
        Ok(Channel { socket, ghost: Default::default() })
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.socket.peer_addr().ok()
    }

    pub fn split(&mut self) -> (Sender<'_, I, O>, Receiver<'_, I, O>) {
        let (reader, writer) = self.socket.split();

        let reader: FramedRead<ReadHalf, LengthDelimitedCodec> =
            FramedRead::new(reader, LengthDelimitedCodec::new());
        let reader = Framed::new(reader, Bincode::default());

        let writer: FramedWrite<WriteHalf, LengthDelimitedCodec> =
            FramedWrite::new(writer, LengthDelimitedCodec::new());
        let writer = Framed::new(writer, Bincode::default());

        (Sender { writer }, Receiver { reader })
    }
}
