//! Configuration shared by client stubs and dispatchers

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do when encoded arguments cannot be re-parsed for validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailurePolicy {
    /// Log the failure and skip validation for this call
    #[default]
    FailOpen,
    /// Treat the call as having invalid arguments
    Reject,
}

/// Stub configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubConfig {
    /// Upper bound on a client transport call, in milliseconds when serialized
    #[serde(with = "optional_duration_serde")]
    pub call_timeout: Option<Duration>,

    pub on_parse_failure: ParseFailurePolicy,
}

impl StubConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_parse_failure_policy(mut self, policy: ParseFailurePolicy) -> Self {
        self.on_parse_failure = policy;
        self
    }
}

// Helper module for Option<Duration> serialization as milliseconds
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fail_open_without_timeout() {
        let config = StubConfig::default();
        assert_eq!(config.on_parse_failure, ParseFailurePolicy::FailOpen);
        assert!(config.call_timeout.is_none());
    }

    #[test]
    fn test_load_from_json() {
        let config =
            StubConfig::from_json_str(r#"{"call_timeout": 1500, "on_parse_failure": "reject"}"#)
                .unwrap();
        assert_eq!(config.call_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.on_parse_failure, ParseFailurePolicy::Reject);

        let partial = StubConfig::from_json_str("{}").unwrap();
        assert_eq!(partial, StubConfig::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = StubConfig::default().with_call_timeout(Duration::from_secs(2));
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: StubConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, config);
    }
}
