pub mod kinematics;
pub mod publisher;
mod error;

pub use error::RunError;
pub use kinematics::{CircularOrbit, TrackState, simulate};
pub use publisher::{RunConfig, RunSummary, SendErrorPolicy, StopReason, run};
