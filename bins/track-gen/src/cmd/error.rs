use track_api::TrackError;
use track_sim::RunError;

#[derive(Debug, thiserror::Error)]
pub enum TrackGenError {
    #[error("{0}")]
    Config(String),

    #[error("transport: {0}")]
    Transport(#[from] TrackError),

    #[error("{0}")]
    Run(#[from] RunError),
}
