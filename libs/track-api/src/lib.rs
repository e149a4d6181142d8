//! Shared vocabulary for the track generator: the wire record, the
//! transport and framing traits, the clock capability and the error type.

mod clock;
mod error;
mod record;
mod transport;

pub use clock::{Clock, SystemClock};
pub use error::{ErrorKind, TrackError};
pub use record::{RECORD_SIZE, TrackRecord, Vec3, encode};
pub use transport::{Framing, Transport};

/// Current Unix time in milliseconds.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
