use std::time::Duration;

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

/// Timing and behaviour of the platform bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SyncConfig {
  /// Quiet time after the last input before pending edits are committed.
  #[serde(with = "millis")]
  pub flush_delay:            Duration,
  /// Grace period after composition end for trailing composition events.
  #[serde(with = "millis")]
  pub resolve_delay:          Duration,
  /// Fallback for actions whose input notification never arrives.
  #[serde(with = "millis")]
  pub action_delay:           Duration,
  #[serde(with = "millis")]
  pub selection_throttle:     Duration,
  /// Read the native selection even while an IME is composing.
  pub eager_composition_sync: bool,
  pub read_only:              bool,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      flush_delay:            Duration::from_millis(200),
      resolve_delay:          Duration::from_millis(25),
      action_delay:           Duration::ZERO,
      selection_throttle:     Duration::from_millis(100),
      eager_composition_sync: false,
      read_only:              false,
    }
  }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("failed to parse sync config: {0}")]
  Parse(#[from] toml::de::Error),
}

impl SyncConfig {
  pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(source)?)
  }
}

/// Durations as whole milliseconds.
mod millis {
  use std::time::Duration;

  use serde::{
    Deserialize,
    Deserializer,
    Serializer,
  };

  pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_is_default() {
    assert_eq!(SyncConfig::from_toml("").unwrap(), SyncConfig::default());
  }

  #[test]
  fn parses_kebab_case_millis() {
    let config = SyncConfig::from_toml(
      r#"
      flush-delay = 150
      selection-throttle = 0
      read-only = true
      "#,
    )
    .unwrap();
    assert_eq!(config.flush_delay, Duration::from_millis(150));
    assert_eq!(config.selection_throttle, Duration::ZERO);
    assert_eq!(config.resolve_delay, Duration::from_millis(25));
    assert!(config.read_only);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let err = SyncConfig::from_toml("flush-dealy = 10").unwrap_err();
    assert!(err.to_string().contains("flush-dealy"));
  }

  #[test]
  fn round_trips_through_toml() {
    let config = SyncConfig {
      resolve_delay: Duration::from_millis(40),
      eager_composition_sync: true,
      ..SyncConfig::default()
    };
    let text = toml::to_string(&config).unwrap();
    assert_eq!(SyncConfig::from_toml(&text).unwrap(), config);
  }
}
