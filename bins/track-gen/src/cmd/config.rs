use clap::Args;
use serde::Deserialize;

use track_sim::publisher::{
    DEFAULT_COUNT, DEFAULT_ENDPOINT, DEFAULT_GRACE_MS, DEFAULT_INTERVAL_MS, DEFAULT_PROGRESS_EVERY,
    DEFAULT_TRACK_ID,
};
use track_sim::{CircularOrbit, RunConfig, SendErrorPolicy};
use track_transport::{Endpoint, FramingKind, TransportOptions};

use super::error::TrackGenError;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub track_id: Option<i32>,
    pub interval_ms: Option<u64>,
    pub count: Option<u64>,
    pub endpoint: Option<String>,
    pub grace_ms: Option<u64>,
    pub on_send_error: Option<SendErrorPolicy>,
    pub progress_every: Option<u64>,
    #[serde(default)]
    pub transport: TransportOptions,
}

pub fn load_config(path: &str) -> Result<Config, TrackGenError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TrackGenError::Config(format!("cannot read config {path}: {e}")))?;
    parse_config(path, &content)
}

fn parse_config(path: &str, content: &str) -> Result<Config, TrackGenError> {
    toml::from_str(content).map_err(|e| TrackGenError::Config(format!("bad config {path}: {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug, Default)]
pub struct GenArgs {
    /// Path to the TOML config file (optional)
    #[arg(long, default_value = "track-gen.toml", env = "TRACK_GEN_CONFIG")]
    pub config: String,

    /// Track id embedded in every record [default: 1001]
    #[arg(long, env = "TRACK_GEN_TRACK_ID", allow_negative_numbers = true)]
    pub track_id: Option<i32>,

    /// Delay between messages in ms [default: 125 = 8 Hz]
    #[arg(long, env = "TRACK_GEN_INTERVAL_MS")]
    pub interval: Option<u64>,

    /// Number of messages, 0 = until Ctrl+C [default: 10]
    #[arg(long, env = "TRACK_GEN_COUNT")]
    pub count: Option<u64>,

    /// Transport endpoint: tcp:// (ZeroMQ PUB), tcp+raw:// or udp://host:port [default: tcp://127.0.0.1:15000]
    #[arg(long, env = "TRACK_GEN_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Wait before the first message so subscribers can attach, in ms [default: 2000]
    #[arg(long)]
    pub grace_ms: Option<u64>,

    /// Stream framing for tcp+raw: raw | length-prefixed [default: raw]
    #[arg(long)]
    pub framing: Option<FramingKind>,

    /// On a failed send: abort | skip [default: abort]
    #[arg(long)]
    pub on_send_error: Option<SendErrorPolicy>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective — merged config
// ═══════════════════════════════════════════════════════════════

/// Final settings after the merge: config file < env/CLI.
#[derive(Debug)]
pub struct Effective {
    pub run: RunConfig,
    pub endpoint: Endpoint,
    pub transport: TransportOptions,
}

impl Effective {
    pub fn new(args: &GenArgs) -> Result<Self, TrackGenError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                tracing::debug!(config = %args.config, "no config file, using defaults");
                Config::default()
            }
        };
        Self::merge(args, cfg)
    }

    pub fn merge(args: &GenArgs, cfg: Config) -> Result<Self, TrackGenError> {
        let endpoint_str = args
            .endpoint
            .clone()
            .or(cfg.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint: Endpoint = endpoint_str
            .parse()
            .map_err(|e: track_api::TrackError| TrackGenError::Config(e.to_string()))?;

        let interval_ms = args.interval.or(cfg.interval_ms).unwrap_or(DEFAULT_INTERVAL_MS);
        if interval_ms == 0 {
            return Err(TrackGenError::Config("--interval must be positive".into()));
        }

        let mut transport = cfg.transport;
        if let Some(kind) = args.framing {
            transport.framing.kind = kind;
        }

        let run = RunConfig {
            track_id: args.track_id.or(cfg.track_id).unwrap_or(DEFAULT_TRACK_ID),
            interval_ms,
            count: args.count.or(cfg.count).unwrap_or(DEFAULT_COUNT),
            endpoint: endpoint.to_string(),
            grace_ms: args.grace_ms.or(cfg.grace_ms).unwrap_or(DEFAULT_GRACE_MS),
            on_send_error: args.on_send_error.or(cfg.on_send_error).unwrap_or_default(),
            progress_every: cfg.progress_every.unwrap_or(DEFAULT_PROGRESS_EVERY),
            orbit: CircularOrbit::default(),
        };

        Ok(Self { run, endpoint, transport })
    }
}
