use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use track_api::{Clock, Transport};

use crate::RunError;
use crate::kinematics::CircularOrbit;

pub const DEFAULT_TRACK_ID: i32 = 1001;
/// 8 Hz
pub const DEFAULT_INTERVAL_MS: u64 = 125;
pub const DEFAULT_COUNT: u64 = 10;
pub const DEFAULT_ENDPOINT: &str = "tcp://127.0.0.1:15000";
/// Time given to subscribers to attach before the first send.
pub const DEFAULT_GRACE_MS: u64 = 2000;
/// One progress event per second at the default cadence.
pub const DEFAULT_PROGRESS_EVERY: u64 = 8;

// ═══════════════════════════════════════════════════════════════
//  Config
// ═══════════════════════════════════════════════════════════════

/// What the loop does when the transport rejects a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendErrorPolicy {
    /// Stop the run and report the error. The failed message is not counted.
    #[default]
    Abort,
    /// Log, count as failed, keep going.
    Skip,
}

impl FromStr for SendErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown send error policy {other:?} (abort, skip)")),
        }
    }
}

impl std::fmt::Display for SendErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abort => f.write_str("abort"),
            Self::Skip => f.write_str("skip"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub track_id: i32,
    /// Delay between sends. Must be positive.
    pub interval_ms: u64,
    /// Send budget; 0 = run until cancelled.
    pub count: u64,
    /// Transport address, for logging only.
    pub endpoint: String,
    pub grace_ms: u64,
    pub on_send_error: SendErrorPolicy,
    /// Progress event every N messages; 0 = only the first.
    pub progress_every: u64,
    pub orbit: CircularOrbit,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            track_id: DEFAULT_TRACK_ID,
            interval_ms: DEFAULT_INTERVAL_MS,
            count: DEFAULT_COUNT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            grace_ms: DEFAULT_GRACE_MS,
            on_send_error: SendErrorPolicy::default(),
            progress_every: DEFAULT_PROGRESS_EVERY,
            orbit: CircularOrbit::default(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), RunError> {
        if self.interval_ms == 0 {
            return Err(RunError::Config("interval must be positive".into()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(RunError::Config("endpoint is empty".into()));
        }
        let o = &self.orbit;
        if !(o.angular_velocity.is_finite() && o.radius.is_finite() && o.altitude.is_finite()) {
            return Err(RunError::Config("orbit parameters must be finite".into()));
        }
        Ok(())
    }

    fn budget_spent(&self, attempts: u64) -> bool {
        self.count != 0 && attempts >= self.count
    }
}

// ═══════════════════════════════════════════════════════════════
//  Summary
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The send budget was used up.
    Completed,
    /// The cancellation token fired.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub sent: u64,
    pub failed: u64,
    pub elapsed: Duration,
    pub stop: StopReason,
}

impl RunSummary {
    /// Successful sends per second over the whole run.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.sent as f64 / secs } else { 0.0 }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Loop state
// ═══════════════════════════════════════════════════════════════

struct RunState {
    start: Duration,
    sent: u64,
    failed: u64,
    last_capture_ms: i64,
}

impl RunState {
    fn new(start: Duration) -> Self {
        Self {
            start,
            sent: 0,
            failed: 0,
            last_capture_ms: i64::MIN,
        }
    }

    fn attempts(&self) -> u64 {
        self.sent + self.failed
    }

    fn elapsed<C: Clock + ?Sized>(&self, clock: &C) -> Duration {
        clock.monotonic().saturating_sub(self.start)
    }

    /// Wall-clock sample, held at the previous value if the clock stepped back.
    fn capture_time<C: Clock + ?Sized>(&mut self, clock: &C) -> i64 {
        let now = clock.now_ms().max(self.last_capture_ms);
        self.last_capture_ms = now;
        now
    }

    fn summary<C: Clock + ?Sized>(&self, clock: &C, stop: StopReason) -> RunSummary {
        RunSummary {
            sent: self.sent,
            failed: self.failed,
            elapsed: self.elapsed(clock),
            stop,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Run
// ═══════════════════════════════════════════════════════════════

/// Publish simulated track records at a fixed cadence.
///
/// Starts the transport, waits the grace period, then loops
/// simulate → encode → publish → sleep until the budget is spent or
/// `cancel` fires. The transport is stopped on every path once started.
pub async fn run<T, C>(
    config: &RunConfig,
    transport: &mut T,
    clock: &C,
    cancel: &CancellationToken,
) -> Result<RunSummary, RunError>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    config.validate()?;

    transport.start().await.map_err(RunError::Acquire)?;
    tracing::info!(endpoint = %config.endpoint, track_id = config.track_id, "transport started");

    let result = publish_loop(config, transport, clock, cancel).await;

    if let Err(e) = transport.stop().await {
        tracing::warn!(endpoint = %config.endpoint, error = ?e, "transport stop error");
    }

    match &result {
        Ok(summary) => tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            elapsed_s = format_args!("{:.2}", summary.elapsed.as_secs_f64()),
            stop = ?summary.stop,
            "run finished"
        ),
        Err(e) => tracing::error!(error = %e, "run aborted"),
    }

    result
}

async fn publish_loop<T, C>(
    config: &RunConfig,
    transport: &mut T,
    clock: &C,
    cancel: &CancellationToken,
) -> Result<RunSummary, RunError>
where
    T: Transport + ?Sized,
    C: Clock + ?Sized,
{
    let mut state = RunState::new(clock.monotonic());
    let interval = Duration::from_millis(config.interval_ms);

    if config.grace_ms > 0 {
        tracing::info!(grace_ms = config.grace_ms, "waiting for subscribers");
        if !pause(Duration::from_millis(config.grace_ms), cancel).await {
            return Ok(state.summary(clock, StopReason::Cancelled));
        }
    }

    loop {
        if config.budget_spent(state.attempts()) {
            return Ok(state.summary(clock, StopReason::Completed));
        }
        if cancel.is_cancelled() {
            return Ok(state.summary(clock, StopReason::Cancelled));
        }

        let elapsed = state.elapsed(clock);
        let record = config
            .orbit
            .state(config.track_id, elapsed.as_secs_f64())
            .into_record(state.capture_time(clock));
        let bytes = record.encode();

        match transport.publish(&bytes).await {
            Ok(()) => {
                state.sent += 1;
                if state.sent == 1 || (config.progress_every > 0 && state.sent % config.progress_every == 0) {
                    tracing::info!(
                        elapsed_s = format_args!("{:.1}", elapsed.as_secs_f64()),
                        sent = state.sent,
                        track_id = config.track_id,
                        "sent message"
                    );
                }
            }
            Err(e) => match config.on_send_error {
                SendErrorPolicy::Abort => {
                    return Err(RunError::Send { sent: state.sent, source: e });
                }
                SendErrorPolicy::Skip => {
                    state.failed += 1;
                    tracing::warn!(error = ?e, failed = state.failed, "send error, skipping");
                }
            },
        }

        if config.budget_spent(state.attempts()) {
            continue;
        }
        if !pause(interval, cancel).await {
            return Ok(state.summary(clock, StopReason::Cancelled));
        }
    }
}

/// Sleep for `d`. Returns false if cancelled first.
async fn pause(d: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(d) => true,
    }
}
