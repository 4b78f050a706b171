//! Session configuration

use std::time::Duration;

use interact_core::{InteractiveError, InteractiveResult};
use interact_time::{DEFAULT_INITIAL_RETRY, DEFAULT_MAX_RETRY};
use interact_wire::methods::PROTOCOL_VERSION;
use serde::Deserialize;

/// Default host discovery endpoint
pub const DEFAULT_HOSTS_URI: &str = "https://mixer.com/api/v1/interactive/hosts";

/// Session configuration
///
/// Every field has a default, so a JSON document only needs the fields it
/// overrides. Durations use humantime notation (`"250ms"`, `"8s"`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Host discovery endpoint returning `[{"address": ...}]`
    pub hosts_uri: String,
    /// Sent as `X-Protocol-Version`
    pub protocol_version: String,
    /// First reconnect delay
    #[serde(deserialize_with = "duration::deserialize")]
    pub initial_retry: Duration,
    /// Reconnect delay cap
    #[serde(deserialize_with = "duration::deserialize")]
    pub max_retry: Duration,
    /// Pause before the outgoing thread retries a failed batch
    #[serde(deserialize_with = "duration::deserialize")]
    pub send_retry_pause: Duration,
    /// Upper bound on joining the worker threads in `close`
    #[serde(deserialize_with = "duration::deserialize")]
    pub close_timeout: Duration,
    /// Default `run` batch size when the caller passes `0`
    pub max_incoming_events: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hosts_uri: DEFAULT_HOSTS_URI.to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            initial_retry: DEFAULT_INITIAL_RETRY,
            max_retry: DEFAULT_MAX_RETRY,
            send_retry_pause: Duration::from_secs(1),
            close_timeout: Duration::from_secs(10),
            max_incoming_events: 64,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON document, filling unspecified fields with defaults
    pub fn from_json(text: &str) -> InteractiveResult<Self> {
        let config: SessionConfig = serde_json::from_str(text)
            .map_err(|e| InteractiveError::UnrecognizedDataFormat(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> InteractiveResult<()> {
        if self.hosts_uri.is_empty() {
            return Err(InteractiveError::InvalidArgument("hosts_uri is empty"));
        }
        if self.protocol_version.is_empty() {
            return Err(InteractiveError::InvalidArgument("protocol_version is empty"));
        }
        if self.initial_retry.is_zero() {
            return Err(InteractiveError::InvalidArgument("initial_retry is zero"));
        }
        if self.max_incoming_events == 0 {
            return Err(InteractiveError::InvalidArgument("max_incoming_events is zero"));
        }
        Ok(())
    }
}

mod duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
