//! Timestamp and nonce sources for OAuth 1.0a requests.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

/// Supplies `oauth_timestamp` and `oauth_nonce` values.
///
/// The signer always asks for the timestamp first and then for a nonce
/// derived from it, so a deterministic implementation can hand out a fixed
/// pair in that order.
pub trait TimestampGenerator: Send + Sync {
    fn generate_timestamp(&self) -> u64;

    fn generate_nonce(&self, timestamp: u64) -> u64;
}

/// Wall-clock timestamps in Unix seconds with a randomized nonce.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimestampGenerator;

impl TimestampGenerator for SystemTimestampGenerator {
    fn generate_timestamp(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }

    fn generate_nonce(&self, timestamp: u64) -> u64 {
        timestamp + u64::from(rand::thread_rng().r#gen::<u32>())
    }
}

/// Hands out the same timestamp and nonce on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTimestampGenerator {
    pub timestamp: u64,
    pub nonce: u64,
}

impl FixedTimestampGenerator {
    pub fn new(timestamp: u64, nonce: u64) -> Self {
        Self { timestamp, nonce }
    }
}

impl TimestampGenerator for FixedTimestampGenerator {
    fn generate_timestamp(&self) -> u64 {
        self.timestamp
    }

    fn generate_nonce(&self, _timestamp: u64) -> u64 {
        self.nonce
    }
}
