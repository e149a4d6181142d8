use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use track_api::{Framing, TrackError, Transport};

/// Frames queued per subscriber before a slow reader starts losing messages.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 1024;
/// How long `stop()` waits for subscribers to receive already queued frames.
pub const DEFAULT_LINGER_MS: u64 = 1000;

/// Plain TCP publisher: binds a listener and fans every framed message out
/// to all connected subscribers.
///
/// A subscriber only sees messages published after it connected, and
/// publishing with nobody connected drops the message. `stop()` delivers
/// what is already queued (bounded by the linger) before closing.
pub struct TcpPublisher {
    addr: SocketAddr,
    framing: Arc<dyn Framing>,
    buffer: usize,
    linger: Duration,
    tx: Option<broadcast::Sender<Arc<[u8]>>>,
    accepting: CancellationToken,
    abort: CancellationToken,
    tasks: TaskTracker,
    local_addr: Option<SocketAddr>,
    buf: Vec<u8>,
}

impl TcpPublisher {
    pub fn new(addr: SocketAddr, framing: Arc<dyn Framing>, buffer: usize) -> Self {
        Self {
            addr,
            framing,
            buffer: buffer.max(1),
            linger: Duration::from_millis(DEFAULT_LINGER_MS),
            tx: None,
            accepting: CancellationToken::new(),
            abort: CancellationToken::new(),
            tasks: TaskTracker::new(),
            local_addr: None,
            buf: Vec::with_capacity(128),
        }
    }

    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    /// Address actually bound (differs from the requested one for port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of currently attached subscribers.
    pub fn subscribers(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.receiver_count())
    }
}

#[async_trait]
impl Transport for TcpPublisher {
    async fn start(&mut self) -> Result<(), TrackError> {
        if self.tx.is_some() {
            return Err(TrackError::new("tcp publisher already started"));
        }

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| TrackError::io(format!("bind {}: {e}", self.addr)))?;
        let local = listener.local_addr()?;

        let (tx, _) = broadcast::channel(self.buffer);
        self.accepting = CancellationToken::new();
        self.abort = CancellationToken::new();
        self.tasks = TaskTracker::new();
        self.tasks.spawn(accept_loop(
            listener,
            tx.clone(),
            self.accepting.clone(),
            self.abort.clone(),
            self.tasks.clone(),
        ));

        tracing::info!(addr = %local, "tcp publisher listening");
        self.tx = Some(tx);
        self.local_addr = Some(local);
        Ok(())
    }

    async fn publish(&mut self, msg: &[u8]) -> Result<(), TrackError> {
        let tx = self.tx.as_ref().ok_or_else(|| TrackError::io("transport not started"))?;

        self.buf.clear();
        self.framing.encode(msg, &mut self.buf)?;

        match tx.send(Arc::from(self.buf.as_slice())) {
            Ok(n) => tracing::trace!(subscribers = n, bytes = self.buf.len(), "published"),
            Err(_) => tracing::trace!("no subscribers, message dropped"),
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TrackError> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };

        // The accept task holds the other sender; once both are gone the
        // writers see `Closed` after their queued frames.
        self.accepting.cancel();
        drop(tx);
        self.tasks.close();

        if tokio::time::timeout(self.linger, self.tasks.wait()).await.is_err() {
            tracing::warn!(
                linger_ms = self.linger.as_millis() as u64,
                "subscribers did not drain in time, closing"
            );
            self.abort.cancel();
            self.tasks.wait().await;
        }

        tracing::info!(addr = ?self.local_addr, "tcp publisher stopped");
        Ok(())
    }
}

impl Drop for TcpPublisher {
    fn drop(&mut self) {
        self.accepting.cancel();
        self.abort.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: broadcast::Sender<Arc<[u8]>>,
    accepting: CancellationToken,
    abort: CancellationToken,
    tasks: TaskTracker,
) {
    loop {
        tokio::select! {
            biased;
            _ = accepting.cancelled() => break,
            res = listener.accept() => match res {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!(%peer, error = ?e, "set_nodelay failed");
                    }
                    tracing::info!(%peer, "subscriber connected");
                    tasks.spawn(serve_subscriber(stream, peer, tx.subscribe(), abort.clone()));
                }
                Err(e) => tracing::warn!(error = ?e, "accept error"),
            },
        }
    }
}

async fn serve_subscriber(
    mut stream: TcpStream,
    peer: SocketAddr,
    rx: broadcast::Receiver<Arc<[u8]>>,
    abort: CancellationToken,
) {
    tokio::select! {
        _ = abort.cancelled() => tracing::debug!(%peer, "subscriber aborted"),
        res = forward(&mut stream, peer, rx) => {
            if let Err(e) = res {
                tracing::info!(%peer, error = %e, "subscriber disconnected");
                return;
            }
        }
    }
    let _ = stream.shutdown().await;
    tracing::debug!(%peer, "subscriber closed");
}

/// Write frames until the channel is closed and drained.
async fn forward(
    stream: &mut TcpStream,
    peer: SocketAddr,
    mut rx: broadcast::Receiver<Arc<[u8]>>,
) -> std::io::Result<()> {
    loop {
        match rx.recv().await {
            Ok(frame) => stream.write_all(&frame).await?,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(%peer, skipped, "subscriber lagging, messages dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return stream.flush().await,
        }
    }
}
