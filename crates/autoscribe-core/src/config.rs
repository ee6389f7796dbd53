use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the autosave pipeline.
///
/// Hosts typically embed this in their own config file; every field has a
/// default so a partial (or absent) section is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Directory for transcripts, relative to the host project root.
    #[serde(default = "default_save_directory")]
    pub save_directory: PathBuf,

    /// Optional second root that receives a mirror of every transcript and
    /// extracted image. When unset, secondary writes are skipped entirely.
    #[serde(default)]
    pub secondary_root: Option<PathBuf>,

    /// Maximum characters for the topic portion of generated filenames.
    #[serde(default = "default_max_topic_length")]
    pub max_topic_length: usize,

    /// Quiet period after the last idle event before a flush fires.
    #[serde(default = "default_debounce", with = "duration_ms")]
    pub debounce: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            save_directory: default_save_directory(),
            secondary_root: None,
            max_topic_length: default_max_topic_length(),
            debounce: default_debounce(),
        }
    }
}

fn default_save_directory() -> PathBuf {
    PathBuf::from("conversations")
}

fn default_max_topic_length() -> usize {
    30
}

fn default_debounce() -> Duration {
    Duration::from_millis(2000)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_v1_values() {
        let config = AutosaveConfig::default();
        assert_eq!(config.save_directory, PathBuf::from("conversations"));
        assert_eq!(config.max_topic_length, 30);
        assert_eq!(config.debounce, Duration::from_millis(2000));
        assert!(config.secondary_root.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: AutosaveConfig =
            serde_json::from_str(r#"{ "save_directory": "logs" }"#).unwrap();
        assert_eq!(config.save_directory, PathBuf::from("logs"));
        assert_eq!(config.debounce, Duration::from_millis(2000));
    }

    #[test]
    fn debounce_round_trips_as_millis() {
        let config: AutosaveConfig = serde_json::from_str(r#"{ "debounce": 500 }"#).unwrap();
        assert_eq!(config.debounce, Duration::from_millis(500));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["debounce"], 500);
    }
}
