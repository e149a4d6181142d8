use async_trait::async_trait;

use crate::TrackError;

// ════════════════════════════════════════════════════════════════
//  Transport / Framing Traits
// ════════════════════════════════════════════════════════════════

/// Transport — publish side of a pub/sub endpoint.
///
/// Lifecycle: `start()` once (bind/connect), any number of `publish()`,
/// then `stop()` once. Each `publish()` is one discrete message; no
/// acknowledgment is expected from subscribers.
#[async_trait]
pub trait Transport: Send {
    /// Acquire the underlying socket (bind, listen, connect).
    async fn start(&mut self) -> Result<(), TrackError>;

    /// Hand one message to the transport. Fire-and-forget.
    async fn publish(&mut self, msg: &[u8]) -> Result<(), TrackError>;

    /// Flush what was already accepted by `publish()`, then release the
    /// socket and any background tasks.
    async fn stop(&mut self) -> Result<(), TrackError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn start(&mut self) -> Result<(), TrackError> {
        (**self).start().await
    }

    async fn publish(&mut self, msg: &[u8]) -> Result<(), TrackError> {
        (**self).publish(msg).await
    }

    async fn stop(&mut self) -> Result<(), TrackError> {
        (**self).stop().await
    }
}

/// Framing — message boundaries on a byte-stream transport.
///
/// Implementations must be stateless so one instance can serve every
/// subscriber connection.
pub trait Framing: Send + Sync {
    /// Append the framed message to `buf`.
    fn encode(&self, data: &[u8], buf: &mut Vec<u8>) -> Result<(), TrackError>;
}
