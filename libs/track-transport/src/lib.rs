//! Transport adapters for publishing encoded track records.

pub mod endpoint;
pub mod framing;
pub mod tcp;
pub mod udp;
pub mod zmq;

use std::time::Duration;

use serde::Deserialize;

use track_api::{TrackError, Transport};

pub use endpoint::Endpoint;
pub use framing::{ByteOrder, FramingConfig, FramingKind, LengthPrefixedFraming, RawFraming};
pub use tcp::TcpPublisher;
pub use udp::UdpPublisher;
pub use zmq::ZmqPublisher;

/// Transport tuning that does not belong in the endpoint string.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    /// Stream framing (tcp+raw only).
    pub framing: FramingConfig,
    /// Per-subscriber queue length (tcp+raw only).
    pub subscriber_buffer: usize,
    /// How long `stop()` lets subscribers drain queued frames (tcp+raw only).
    pub linger_ms: u64,
    /// Multicast TTL (udp only).
    pub multicast_ttl: u32,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            framing: FramingConfig::default(),
            subscriber_buffer: tcp::DEFAULT_SUBSCRIBER_BUFFER,
            linger_ms: tcp::DEFAULT_LINGER_MS,
            multicast_ttl: udp::DEFAULT_MULTICAST_TTL,
        }
    }
}

/// Build the (not yet started) transport for `endpoint`.
pub fn open(endpoint: &Endpoint, options: &TransportOptions) -> Result<Box<dyn Transport>, TrackError> {
    let transport: Box<dyn Transport> = match *endpoint {
        Endpoint::Zmq(addr) => Box::new(ZmqPublisher::new(addr)),
        Endpoint::RawTcp(addr) => {
            let framing = options.framing.build()?;
            Box::new(
                TcpPublisher::new(addr, framing, options.subscriber_buffer)
                    .with_linger(Duration::from_millis(options.linger_ms)),
            )
        }
        Endpoint::Udp(addr) => Box::new(UdpPublisher::new(addr, options.multicast_ttl)),
    };
    tracing::debug!(%endpoint, "transport created");
    Ok(transport)
}
