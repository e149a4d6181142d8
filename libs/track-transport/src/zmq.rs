use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use zeromq::{PubSocket, Socket, SocketSend, ZmqMessage};

use track_api::{TrackError, Transport};

/// ZeroMQ PUB socket bound at `tcp://addr`.
///
/// Each record is one single-frame message. SUB sockets that are still
/// completing their handshake miss what is published meanwhile, which is
/// what the grace period before the first send is for.
pub struct ZmqPublisher {
    addr: SocketAddr,
    socket: Option<PubSocket>,
    bound: Option<String>,
}

impl ZmqPublisher {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, socket: None, bound: None }
    }

    /// Endpoint actually bound, e.g. `tcp://127.0.0.1:40123` for port 0.
    pub fn local_endpoint(&self) -> Option<&str> {
        self.bound.as_deref()
    }
}

#[async_trait]
impl Transport for ZmqPublisher {
    async fn start(&mut self) -> Result<(), TrackError> {
        if self.socket.is_some() {
            return Err(TrackError::new("zmq publisher already started"));
        }

        let requested = format!("tcp://{}", self.addr);
        let mut socket = PubSocket::new();
        let bound = socket
            .bind(&requested)
            .await
            .map_err(|e| TrackError::io(format!("bind {requested}: {e}")))?;

        tracing::info!(endpoint = %bound, "zmq publisher bound");
        self.bound = Some(bound.to_string());
        self.socket = Some(socket);
        Ok(())
    }

    async fn publish(&mut self, msg: &[u8]) -> Result<(), TrackError> {
        let socket = self.socket.as_mut().ok_or_else(|| TrackError::io("transport not started"))?;
        socket
            .send(ZmqMessage::from(Bytes::copy_from_slice(msg)))
            .await
            .map_err(|e| TrackError::io(format!("zmq send: {e}")))
    }

    async fn stop(&mut self) -> Result<(), TrackError> {
        if let Some(socket) = self.socket.take() {
            for e in socket.close().await {
                tracing::warn!(error = %e, "zmq close error");
            }
            tracing::info!(endpoint = ?self.bound, "zmq publisher stopped");
        }
        Ok(())
    }
}
