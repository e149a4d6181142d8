use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use track_api::{TrackError, Transport};

pub const DEFAULT_MULTICAST_TTL: u32 = 1;

/// UDP publisher: one datagram per message to a unicast or multicast group.
///
/// Datagrams keep message boundaries, so no framing is applied. The socket
/// stays unconnected: nobody listening at the target is not a send error.
pub struct UdpPublisher {
    target: SocketAddr,
    multicast_ttl: u32,
    socket: Option<UdpSocket>,
}

impl UdpPublisher {
    pub fn new(target: SocketAddr, multicast_ttl: u32) -> Self {
        Self { target, multicast_ttl, socket: None }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

#[async_trait]
impl Transport for UdpPublisher {
    async fn start(&mut self) -> Result<(), TrackError> {
        let any: IpAddr = match self.target {
            SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
        };
        let socket = UdpSocket::bind((any, 0))
            .await
            .map_err(|e| TrackError::io(format!("bind udp socket: {e}")))?;

        if self.target.ip().is_multicast() {
            match self.target {
                SocketAddr::V4(_) => {
                    socket.set_multicast_ttl_v4(self.multicast_ttl)?;
                    socket.set_multicast_loop_v4(true)?;
                }
                SocketAddr::V6(_) => socket.set_multicast_loop_v6(true)?,
            }
        }

        tracing::info!(
            target = %self.target,
            multicast = self.target.ip().is_multicast(),
            "udp publisher ready"
        );
        self.socket = Some(socket);
        Ok(())
    }

    async fn publish(&mut self, msg: &[u8]) -> Result<(), TrackError> {
        let socket = self.socket.as_ref().ok_or_else(|| TrackError::io("transport not started"))?;
        match socket.send_to(msg, self.target).await {
            Ok(n) if n == msg.len() => Ok(()),
            Ok(n) => Err(TrackError::io(format!("short datagram: {n} of {} bytes", msg.len()))),
            // Some platforms still report ICMP port-unreachable on the next send.
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                tracing::debug!(target = %self.target, "no listener, datagram dropped");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stop(&mut self) -> Result<(), TrackError> {
        if self.socket.take().is_some() {
            tracing::info!(target = %self.target, "udp publisher stopped");
        }
        Ok(())
    }
}
