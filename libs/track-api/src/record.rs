use crate::TrackError;

/// Size of one encoded track record on the wire.
///
/// track_id (i32) + velocity (3 × f64) + position (3 × f64) + capture time (i64).
pub const RECORD_SIZE: usize = 4 + 3 * 8 + 3 * 8 + 8;

const VELOCITY_OFFSET: usize = 4;
const POSITION_OFFSET: usize = VELOCITY_OFFSET + 3 * 8;
const TIME_OFFSET: usize = POSITION_OFFSET + 3 * 8;

/// Cartesian vector in the Earth-centered frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Squared length of the horizontal (x, y) component.
    pub fn horizontal_norm_sq(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }
}

/// Kinematic state of one track at one instant.
///
/// Built fresh for every publication and dropped after encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRecord {
    pub track_id: i32,
    /// m/s
    pub velocity: Vec3,
    /// m
    pub position: Vec3,
    /// Unix time in milliseconds, sampled when the record is encoded.
    pub capture_time_ms: i64,
}

impl TrackRecord {
    /// Consumer acceptance rule: finite kinematics, non-negative id and time.
    pub fn is_valid(&self) -> bool {
        self.velocity.is_finite()
            && self.position.is_finite()
            && self.track_id >= 0
            && self.capture_time_ms >= 0
    }

    /// Packs the record little-endian, fields in wire order, no padding.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[..VELOCITY_OFFSET].copy_from_slice(&self.track_id.to_le_bytes());
        put_vec3(&mut buf[VELOCITY_OFFSET..POSITION_OFFSET], &self.velocity);
        put_vec3(&mut buf[POSITION_OFFSET..TIME_OFFSET], &self.position);
        buf[TIME_OFFSET..].copy_from_slice(&self.capture_time_ms.to_le_bytes());
        buf
    }

    /// Appends the encoded record to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.encode());
    }

    /// Consumer-side inverse of [`TrackRecord::encode`].
    ///
    /// Bytes past the first `RECORD_SIZE` are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, TrackError> {
        if buf.len() < RECORD_SIZE {
            return Err(TrackError::format_err(format!(
                "track record needs {RECORD_SIZE} bytes, got {}",
                buf.len()
            )));
        }
        Ok(Self {
            track_id: i32::from_le_bytes(le_array(&buf[..VELOCITY_OFFSET])),
            velocity: get_vec3(&buf[VELOCITY_OFFSET..POSITION_OFFSET]),
            position: get_vec3(&buf[POSITION_OFFSET..TIME_OFFSET]),
            capture_time_ms: i64::from_le_bytes(le_array(&buf[TIME_OFFSET..RECORD_SIZE])),
        })
    }
}

/// Encode loose fields without building a [`TrackRecord`] first.
pub fn encode(track_id: i32, velocity: Vec3, position: Vec3, capture_time_ms: i64) -> [u8; RECORD_SIZE] {
    TrackRecord { track_id, velocity, position, capture_time_ms }.encode()
}

fn put_vec3(dst: &mut [u8], v: &Vec3) {
    dst[0..8].copy_from_slice(&v.x.to_le_bytes());
    dst[8..16].copy_from_slice(&v.y.to_le_bytes());
    dst[16..24].copy_from_slice(&v.z.to_le_bytes());
}

fn get_vec3(src: &[u8]) -> Vec3 {
    Vec3 {
        x: f64::from_le_bytes(le_array(&src[0..8])),
        y: f64::from_le_bytes(le_array(&src[8..16])),
        z: f64::from_le_bytes(le_array(&src[16..24])),
    }
}

// Callers always pass a slice of exactly N bytes.
fn le_array<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(src);
    out
}
