use std::time::Duration;

use sxbmon_frame::FrameConfig;

/// Default time to wait for the status byte or a reply payload.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of attempts per exchange (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// When and how often an exchange is retried.
///
/// Only timeouts and corrupt frames are retried; link failures and device
/// error statuses never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per exchange, first try included. Default: 3.
    pub max_attempts: u32,
    /// Pause before resending, letting the line go quiet. Default: 10ms.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(10),
        }
    }
}

/// Configuration for a board session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Deadline for each reply (status byte, then payload). Default: 1s.
    pub reply_timeout: Duration,
    /// Retry discipline for every exchange.
    pub retry: RetryPolicy,
    /// Frame layout parameters.
    pub frame: FrameConfig,
    /// Start programs in 65816 native mode. Ignored on a 65C02. Default: false.
    pub native: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            retry: RetryPolicy::default(),
            frame: FrameConfig::default(),
            native: false,
        }
    }
}
