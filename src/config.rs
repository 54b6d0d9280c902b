//! Runtime tuning read from `QR_*` environment variables.
//!
//! Every knob has a compiled-in default; the environment only overrides.
//! Unparseable values fall back to the default silently.

use std::sync::OnceLock;
use std::time::Duration;

fn parse_env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

/// Default pause between decode attempts on a live stream
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(300);

/// Pacing and bounds for one scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Minimum spacing between attempts on a paced source
    pub interval: Duration,
    /// Give up after this many attempts; `None` scans until stopped
    pub max_attempts: Option<u64>,
    /// Give up after this much wall time; `None` scans until stopped
    pub timeout: Option<Duration>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SCAN_INTERVAL,
            max_attempts: None,
            timeout: None,
        }
    }
}

impl ScanConfig {
    /// Defaults overridden by `QR_SCAN_INTERVAL_MS`, `QR_SCAN_MAX_ATTEMPTS`
    /// and `QR_SCAN_TIMEOUT_MS`. Zero attempts or a zero timeout mean unbounded.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            interval: parse_env_u64("QR_SCAN_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            max_attempts: parse_env_u64("QR_SCAN_MAX_ATTEMPTS").filter(|&n| n > 0),
            timeout: parse_env_u64("QR_SCAN_TIMEOUT_MS")
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Attempt bound; zero means unbounded, as in `QR_SCAN_MAX_ATTEMPTS`
    pub fn with_max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = Some(attempts).filter(|&n| n > 0);
        self
    }

    /// Wall-time bound; zero means unbounded, as in `QR_SCAN_TIMEOUT_MS`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout).filter(|t| !t.is_zero());
        self
    }
}

/// Detection knobs for the single-frame decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Retry with inverted polarity (light modules on dark background)
    pub try_inverted: bool,
    /// Finder candidates kept after ranking
    pub max_finder_candidates: usize,
    /// Finder triples tried per binarization
    pub max_groups: usize,
    /// Side of the local-mean window used by adaptive binarization
    pub adaptive_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            try_inverted: true,
            max_finder_candidates: 24,
            max_groups: 40,
            adaptive_window: 31,
        }
    }
}

impl DetectorConfig {
    /// Defaults overridden by `QR_TRY_INVERTED`, `QR_MAX_FINDER_CANDIDATES`,
    /// `QR_MAX_GROUPS` and `QR_ADAPTIVE_WINDOW`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            try_inverted: parse_env_bool_u8("QR_TRY_INVERTED", defaults.try_inverted),
            max_finder_candidates: parse_env_usize(
                "QR_MAX_FINDER_CANDIDATES",
                defaults.max_finder_candidates,
            )
            .clamp(3, 64),
            max_groups: parse_env_usize("QR_MAX_GROUPS", defaults.max_groups).clamp(1, 200),
            adaptive_window: parse_env_usize("QR_ADAPTIVE_WINDOW", defaults.adaptive_window)
                .clamp(7, 255)
                | 1,
        }
    }

    /// Environment-derived config, read once per process
    pub fn shared() -> Self {
        static SHARED: OnceLock<DetectorConfig> = OnceLock::new();
        *SHARED.get_or_init(Self::from_env)
    }
}
