//! Full-text acquisition policy.

use serde::{Deserialize, Serialize};
use sift_core::retry::RetryPolicy;

/// Floor applied to `source_min_chars`.
pub const MIN_SOURCE_CHARS_FLOOR: usize = 200;

/// Floor applied to `max_tokens`.
pub const MAX_TOKENS_FLOOR: usize = 100;

const fn default_true() -> bool {
    true
}

const fn default_max_pages() -> usize {
    15
}

const fn default_max_tokens() -> usize {
    10_000
}

const fn default_ttl_days() -> u32 {
    30
}

const fn default_source_min_chars() -> usize {
    2_000
}

const fn default_max_source_mb() -> u64 {
    30
}

const fn default_max_pdf_mb() -> u64 {
    50
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_retry_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    2_000
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_source_base_url() -> String {
    "https://arxiv.org/e-print".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AcquisitionConfig {
    /// Fetch full text at all. When off every paper is analyzed from metadata.
    #[serde(default = "default_true")]
    pub full_text: bool,

    /// Body pages kept after the introduction.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Token budget for extracted text (4 characters per token).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_ttl_days")]
    pub pdf_ttl_days: u32,

    /// Fall back to the LaTeX source archive when PDF text is short.
    #[serde(default = "default_true")]
    pub source_fallback: bool,

    #[serde(default = "default_source_min_chars")]
    pub source_min_chars: usize,

    #[serde(default = "default_max_source_mb")]
    pub max_source_mb: u64,

    #[serde(default = "default_ttl_days")]
    pub source_ttl_days: u32,

    #[serde(default = "default_max_pdf_mb")]
    pub max_pdf_mb: u64,

    /// Per-download timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_source_base_url")]
    pub source_base_url: String,

    /// Attempts per download, the first included.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            full_text: true,
            max_pages: default_max_pages(),
            max_tokens: default_max_tokens(),
            pdf_ttl_days: default_ttl_days(),
            source_fallback: true,
            source_min_chars: default_source_min_chars(),
            max_source_mb: default_max_source_mb(),
            source_ttl_days: default_ttl_days(),
            max_pdf_mb: default_max_pdf_mb(),
            timeout_secs: default_timeout_secs(),
            source_base_url: default_source_base_url(),
            retry_attempts: default_retry_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl AcquisitionConfig {
    /// PDF text shorter than this triggers the source fallback.
    #[must_use]
    pub fn min_chars(&self) -> usize {
        self.source_min_chars.max(MIN_SOURCE_CHARS_FLOOR)
    }

    #[must_use]
    pub fn token_budget(&self) -> usize {
        self.max_tokens.max(MAX_TOKENS_FLOOR)
    }

    #[must_use]
    pub fn page_budget(&self) -> usize {
        self.max_pages.max(1)
    }

    #[must_use]
    pub const fn max_source_bytes(&self) -> u64 {
        mib(self.max_source_mb)
    }

    #[must_use]
    pub const fn max_pdf_bytes(&self) -> u64 {
        mib(self.max_pdf_mb)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(self.retry_attempts, self.base_delay_ms, self.max_delay_ms)
    }
}

const fn mib(n: u64) -> u64 {
    let n = if n == 0 { 1 } else { n };
    n.saturating_mul(1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = AcquisitionConfig::default();
        assert!(config.full_text);
        assert!(config.source_fallback);
        assert_eq!(config.max_pages, 15);
        assert_eq!(config.max_tokens, 10_000);
        assert_eq!(config.pdf_ttl_days, 30);
        assert_eq!(config.source_ttl_days, 30);
        assert_eq!(config.max_source_bytes(), 30 * 1024 * 1024);
        assert_eq!(config.retry_policy().max_attempts, 3);
    }

    #[test]
    fn floors_apply() {
        let config = AcquisitionConfig {
            source_min_chars: 10,
            max_tokens: 5,
            max_pages: 0,
            max_source_mb: 0,
            ..AcquisitionConfig::default()
        };
        assert_eq!(config.min_chars(), 200);
        assert_eq!(config.token_budget(), 100);
        assert_eq!(config.page_budget(), 1);
        assert_eq!(config.max_source_bytes(), 1024 * 1024);
    }
}
