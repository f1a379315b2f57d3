//! Configuration types for scanning and disclosure

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Disclosure loader configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Estimated tokens per Tier-1 summary line
    #[serde(default = "default_tokens_per_summary_line")]
    pub tokens_per_summary_line: usize,

    /// Characters per token when estimating body and extension cost
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Pull direct `enhances` targets of matched documents into plans
    #[serde(default)]
    pub include_enhances: bool,

    /// Drop trigger matches scoring below this
    #[serde(default)]
    pub min_match_score: f32,

    /// "See also" extensions load only while remaining budget exceeds
    /// this multiple of the document's Tier-2 cost
    #[serde(default = "default_tier3_headroom_factor")]
    pub tier3_headroom_factor: usize,
}

fn default_tokens_per_summary_line() -> usize {
    12
}

fn default_chars_per_token() -> usize {
    4
}

fn default_tier3_headroom_factor() -> usize {
    2
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            tokens_per_summary_line: default_tokens_per_summary_line(),
            chars_per_token: default_chars_per_token(),
            include_enhances: false,
            min_match_score: 0.0,
            tier3_headroom_factor: default_tier3_headroom_factor(),
        }
    }
}

/// Corpus scan configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Corpus roots to walk
    #[serde(default)]
    pub directories: Vec<PathBuf>,

    /// Scan deadline in seconds
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,
}

fn default_scan_timeout() -> u64 {
    30
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            scan_timeout_secs: default_scan_timeout(),
        }
    }
}

impl ScanConfig {
    /// Get scan deadline
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}
