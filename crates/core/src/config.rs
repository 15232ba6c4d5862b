//! Streamer configuration.

/// Configuration for the transaction streamer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamerConfig {
    /// Maximum number of unconfirmed feed messages buffered while waiting for
    /// L1 to catch up. 0 disables the bound.
    pub max_broadcaster_queue_size: u64,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self { max_broadcaster_queue_size: 10_000 }
    }
}
