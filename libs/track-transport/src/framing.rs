use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use track_api::{Framing, RECORD_SIZE, TrackError};

// ═══════════════════════════════════════════════════════════════
//  Raw (fixed-size) framing
// ═══════════════════════════════════════════════════════════════

/// No header: every message has the same size, so the size is the boundary.
pub struct RawFraming {
    frame_size: usize,
}

impl RawFraming {
    pub fn new(frame_size: usize) -> Self {
        Self { frame_size }
    }
}

impl Framing for RawFraming {
    fn encode(&self, data: &[u8], buf: &mut Vec<u8>) -> Result<(), TrackError> {
        if data.len() != self.frame_size {
            return Err(TrackError::format_err(format!(
                "raw framing expects {} byte messages, got {}",
                self.frame_size,
                data.len()
            )));
        }
        buf.extend_from_slice(data);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Length-prefixed framing
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    #[serde(alias = "be")]
    Big,
    #[serde(alias = "le")]
    Little,
}

pub struct LengthPrefixedFraming {
    length_bytes: usize,
    byte_order: ByteOrder,
}

impl LengthPrefixedFraming {
    pub fn new(length_bytes: usize, byte_order: ByteOrder) -> Result<Self, TrackError> {
        if !matches!(length_bytes, 1 | 2 | 4) {
            return Err(TrackError::config(format!(
                "length_bytes must be 1, 2, or 4, got {length_bytes}"
            )));
        }
        Ok(Self { length_bytes, byte_order })
    }
}

impl Framing for LengthPrefixedFraming {
    fn encode(&self, data: &[u8], buf: &mut Vec<u8>) -> Result<(), TrackError> {
        let len = data.len();
        match (self.length_bytes, self.byte_order) {
            (1, _) => {
                let n = u8::try_from(len)
                    .map_err(|_| TrackError::format_err(format!("payload too large for 1-byte header: {len}")))?;
                buf.push(n);
            }
            (2, order) => {
                let n = u16::try_from(len)
                    .map_err(|_| TrackError::format_err(format!("payload too large for 2-byte header: {len}")))?;
                buf.extend_from_slice(&match order {
                    ByteOrder::Big => n.to_be_bytes(),
                    ByteOrder::Little => n.to_le_bytes(),
                });
            }
            (4, order) => {
                let n = u32::try_from(len)
                    .map_err(|_| TrackError::format_err(format!("payload too large for 4-byte header: {len}")))?;
                buf.extend_from_slice(&match order {
                    ByteOrder::Big => n.to_be_bytes(),
                    ByteOrder::Little => n.to_le_bytes(),
                });
            }
            (n, _) => return Err(TrackError::config(format!("unsupported length_bytes: {n}"))),
        }
        buf.extend_from_slice(data);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Config
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FramingKind {
    /// Bare 60-byte records back to back.
    #[default]
    Raw,
    LengthPrefixed,
}

impl FromStr for FramingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "length-prefixed" => Ok(Self::LengthPrefixed),
            other => Err(format!("unknown framing {other:?} (raw, length-prefixed)")),
        }
    }
}

impl std::fmt::Display for FramingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::LengthPrefixed => f.write_str("length-prefixed"),
        }
    }
}

/// `[transport.framing]` table of the config file. Length fields apply to
/// `length-prefixed` only.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    pub kind: FramingKind,
    /// Header size in bytes: 1, 2 or 4.
    pub length_bytes: usize,
    pub byte_order: ByteOrder,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            kind: FramingKind::Raw,
            length_bytes: 4,
            byte_order: ByteOrder::Big,
        }
    }
}

impl FramingConfig {
    pub fn build(&self) -> Result<Arc<dyn Framing>, TrackError> {
        Ok(match self.kind {
            FramingKind::Raw => Arc::new(RawFraming::new(RECORD_SIZE)),
            FramingKind::LengthPrefixed => {
                Arc::new(LengthPrefixedFraming::new(self.length_bytes, self.byte_order)?)
            }
        })
    }
}
