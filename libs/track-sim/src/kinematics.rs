use track_api::{TrackRecord, Vec3};

/// rad/s
pub const ANGULAR_VELOCITY: f64 = 0.1;
/// m
pub const ORBIT_RADIUS: f64 = 10_000.0;
/// m
pub const ALTITUDE: f64 = 5_000.0;

/// Level circular flight around the frame origin at constant speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularOrbit {
    pub angular_velocity: f64,
    pub radius: f64,
    pub altitude: f64,
}

impl Default for CircularOrbit {
    fn default() -> Self {
        Self {
            angular_velocity: ANGULAR_VELOCITY,
            radius: ORBIT_RADIUS,
            altitude: ALTITUDE,
        }
    }
}

impl CircularOrbit {
    /// Tangential speed, ω·r.
    pub fn speed(&self) -> f64 {
        self.angular_velocity * self.radius
    }

    /// Position and velocity after `elapsed_s` seconds on the orbit.
    ///
    /// The phase angle is not wrapped; `sin`/`cos` handle it directly.
    pub fn state(&self, track_id: i32, elapsed_s: f64) -> TrackState {
        let theta = self.angular_velocity * elapsed_s;
        let (sin, cos) = theta.sin_cos();
        let speed = self.speed();

        TrackState {
            track_id,
            position: Vec3::new(self.radius * cos, self.radius * sin, self.altitude),
            velocity: Vec3::new(-speed * sin, speed * cos, 0.0),
        }
    }
}

/// Simulated kinematics before a capture time is attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackState {
    pub track_id: i32,
    pub position: Vec3,
    pub velocity: Vec3,
}

impl TrackState {
    pub fn into_record(self, capture_time_ms: i64) -> TrackRecord {
        TrackRecord {
            track_id: self.track_id,
            velocity: self.velocity,
            position: self.position,
            capture_time_ms,
        }
    }
}

/// Returns `(position, velocity)` on the default orbit.
pub fn simulate(track_id: i32, elapsed_s: f64) -> (Vec3, Vec3) {
    let state = CircularOrbit::default().state(track_id, elapsed_s);
    (state.position, state.velocity)
}
