use track_api::TrackError;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("config: {0}")]
    Config(String),

    #[error("transport acquisition: {0}")]
    Acquire(#[source] TrackError),

    #[error("send failed after {sent} messages: {source}")]
    Send { sent: u64, source: TrackError },
}
