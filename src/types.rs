//! Core types shared across the binocam crate.

use serde::{Deserialize, Serialize};

/// Identity of one of the two video feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    /// Built-in image sensor
    Internal,
    /// USB video-class device attached at runtime
    External,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Internal => "internal",
            SourceId::External => "external",
        }
    }

    /// Short uppercase tag used in status lines
    pub fn tag(&self) -> &'static str {
        match self {
            SourceId::Internal => "INT",
            SourceId::External => "EXT",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of one capture source.
///
/// At most one of `Starting`/`Running` holds at any instant. `Starting` is
/// entered only from `Idle`; it resolves to exactly one of `Running` or
/// `Idle`. `Running` returns to `Idle` only through an explicit stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifecycleState {
    Idle = 0,
    Starting = 1,
    Running = 2,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
        }
    }

    pub(crate) fn from_u8(v: u8) -> LifecycleState {
        match v {
            1 => LifecycleState::Starting,
            2 => LifecycleState::Running,
            _ => LifecycleState::Idle,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A frame geometry negotiated by the external capture backend.
///
/// Parsed out of the backend's human-readable mode string, e.g.
/// `"MJPG 1280x720"` or `"YUYV 640 x 480 @30"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiatedMode {
    pub width: u32,
    pub height: u32,
    /// Leading pixel-format tag, empty when the string carries none
    pub format: String,
}

/// Parse the first `WIDTHxHEIGHT` integer pair from a mode string.
///
/// The separator is `x` or `X`, optionally surrounded by spaces or tabs.
/// Both values must parse as positive integers; otherwise scanning resumes
/// after the candidate. Returns `None` when no valid pair exists, e.g. for
/// `"720p"`.
pub fn parse_mode(raw: &str) -> Option<NegotiatedMode> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let w_start = i;
        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        let w_end = j;

        let mut k = j;
        while k < bytes.len() && (bytes[k] == b' ' || bytes[k] == b'\t') {
            k += 1;
        }
        if k < bytes.len() && (bytes[k] == b'x' || bytes[k] == b'X') {
            k += 1;
            while k < bytes.len() && (bytes[k] == b' ' || bytes[k] == b'\t') {
                k += 1;
            }
            let h_start = k;
            let mut l = k;
            while l < bytes.len() && bytes[l].is_ascii_digit() {
                l += 1;
            }
            if l > h_start {
                let width = raw[w_start..w_end].parse::<u32>().ok();
                let height = raw[h_start..l].parse::<u32>().ok();
                if let (Some(width), Some(height)) = (width, height) {
                    if width > 0 && height > 0 {
                        return Some(NegotiatedMode {
                            width,
                            height,
                            format: leading_format_token(raw, w_start),
                        });
                    }
                }
            }
        }

        i = w_end;
    }
    None
}

/// First whitespace-separated token of the mode string, kept only when it
/// precedes the resolution pair (so `"1280x720"` alone yields no tag).
fn leading_format_token(raw: &str, pair_start: usize) -> String {
    match raw.split_whitespace().next() {
        Some(token) if !raw[..pair_start].trim().is_empty() => token.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_pair() {
        let mode = parse_mode("MJPG 1280x720").unwrap();
        assert_eq!(mode.width, 1280);
        assert_eq!(mode.height, 720);
        assert_eq!(mode.format, "MJPG");
    }

    #[test]
    fn test_parse_spaced_pair() {
        let mode = parse_mode("YUYV 640 x 480 @30fps").unwrap();
        assert_eq!(mode.width, 640);
        assert_eq!(mode.height, 480);
        assert_eq!(mode.format, "YUYV");
    }

    #[test]
    fn test_parse_uppercase_separator() {
        let mode = parse_mode("1920X1080").unwrap();
        assert_eq!((mode.width, mode.height), (1920, 1080));
        assert_eq!(mode.format, "");
    }

    #[test]
    fn test_parse_no_pair() {
        assert!(parse_mode("720p").is_none());
        assert!(parse_mode("").is_none());
        assert!(parse_mode("no geometry here").is_none());
    }

    #[test]
    fn test_parse_zero_dimension_rejected() {
        // 0x480 is not a usable geometry; scanning continues past it.
        assert!(parse_mode("0x480").is_none());
        let mode = parse_mode("0x480 640x480").unwrap();
        assert_eq!((mode.width, mode.height), (640, 480));
    }

    #[test]
    fn test_parse_overflow_is_no_match() {
        assert!(parse_mode("99999999999999999999x720").is_none());
    }

    #[test]
    fn test_lifecycle_state_roundtrip() {
        for state in [
            LifecycleState::Idle,
            LifecycleState::Starting,
            LifecycleState::Running,
        ] {
            assert_eq!(LifecycleState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_source_id_display() {
        assert_eq!(SourceId::Internal.to_string(), "internal");
        assert_eq!(SourceId::External.tag(), "EXT");
    }

    #[test]
    fn test_mode_serialization() {
        let mode = NegotiatedMode {
            width: 1280,
            height: 720,
            format: "MJPG".to_string(),
        };
        let json = serde_json::to_string(&mode).unwrap();
        let back: NegotiatedMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mode);
    }
}
