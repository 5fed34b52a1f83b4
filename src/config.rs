// Funnel configuration
// Latencies stand in for the network round trips the front-end simulates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// Key the pending booking is stored under
pub const DEFAULT_STORAGE_KEY: &str = "lastBooking";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelConfig {
    pub submit_latency_ms: u64,
    pub payment_latency_ms: u64,
    pub payment_timeout_ms: u64,
    pub contact_latency_ms: u64,
    pub storage_key: String,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            submit_latency_ms: 1500,
            payment_latency_ms: 3000,
            payment_timeout_ms: 30_000,
            contact_latency_ms: 1500,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl FunnelConfig {
    // Configuration with no artificial latency, used by tests
    pub fn instant() -> Self {
        Self {
            submit_latency_ms: 0,
            payment_latency_ms: 0,
            contact_latency_ms: 0,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn submit_latency(&self) -> Duration {
        Duration::from_millis(self.submit_latency_ms)
    }

    pub fn payment_latency(&self) -> Duration {
        Duration::from_millis(self.payment_latency_ms)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_millis(self.payment_timeout_ms)
    }

    pub fn contact_latency(&self) -> Duration {
        Duration::from_millis(self.contact_latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = FunnelConfig::from_json(r#"{"payment_timeout_ms": 250}"#).unwrap();

        assert_eq!(config.payment_timeout(), Duration::from_millis(250));
        assert_eq!(config.submit_latency(), Duration::from_millis(1500));
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_instant_keeps_timeout_and_key() {
        let config = FunnelConfig::instant();

        assert_eq!(config.payment_latency(), Duration::ZERO);
        assert_eq!(config.contact_latency(), Duration::ZERO);
        assert_eq!(config.payment_timeout_ms, 30_000);
        assert_eq!(config.storage_key, "lastBooking");
    }
}
