//! Admission limits and polling configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Prefix for environment variables read by [`AdmissionConfig::from_env`].
pub const ENV_PREFIX: &str = "WAITING_ROOM_";

/// Variable naming a JSON config file for [`AdmissionConfig::load`].
pub const CONFIG_PATH_VAR: &str = "WAITING_ROOM_CONFIG";

/// Immutable limits for one scheduler instance.
///
/// Missing fields fall back to their defaults when deserializing, so a partial
/// JSON document such as `{"max_processing": 4}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum concurrent requests (admitted or waiting) per client.
    pub max_client_requests: usize,
    /// Maximum requests holding a processing slot at once.
    pub max_processing: usize,
    /// Maximum requests waiting for a slot.
    pub max_waiting: usize,
    /// Cadence of the liveness/position re-check for each waiter.
    pub poll_interval_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_client_requests: 3,
            max_processing: 1,
            max_waiting: 10,
            poll_interval_ms: 100,
        }
    }
}

impl AdmissionConfig {
    /// Set the per-client concurrent request cap.
    #[must_use]
    pub const fn with_max_client_requests(mut self, n: usize) -> Self {
        self.max_client_requests = n;
        self
    }

    /// Set the global processing slot count.
    #[must_use]
    pub const fn with_max_processing(mut self, n: usize) -> Self {
        self.max_processing = n;
        self
    }

    /// Set the waiting queue depth.
    #[must_use]
    pub const fn with_max_waiting(mut self, n: usize) -> Self {
        self.max_waiting = n;
        self
    }

    /// Set the poll interval in milliseconds.
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_client_requests == 0 {
            return Err("max_client_requests must be greater than 0".into());
        }
        if self.max_processing == 0 {
            return Err("max_processing must be greater than 0".into());
        }
        if self.max_waiting == 0 {
            return Err("max_waiting must be greater than 0".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message on malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `WAITING_ROOM_*` environment variables,
    /// loading a `.env` file first if one is present.
    ///
    /// Recognised keys: `WAITING_ROOM_MAX_CLIENT_REQUESTS`,
    /// `WAITING_ROOM_MAX_PROCESSING`, `WAITING_ROOM_MAX_WAITING`,
    /// `WAITING_ROOM_POLL_INTERVAL_MS`. Unset keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message when a variable is not a valid integer or the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup using the
    /// `WAITING_ROOM_*` names.
    ///
    /// # Errors
    ///
    /// Same as [`AdmissionConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            name: &str,
            fallback: T,
        ) -> Result<T, String> {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(key.as_str()).map_or(Ok(fallback), |raw| {
                raw.trim()
                    .parse()
                    .map_err(|_| format!("{key} must be a non-negative integer, got `{raw}`"))
            })
        }

        let defaults = Self::default();
        let cfg = Self {
            max_client_requests: parse(&lookup, "MAX_CLIENT_REQUESTS", defaults.max_client_requests)?,
            max_processing: parse(&lookup, "MAX_PROCESSING", defaults.max_processing)?,
            max_waiting: parse(&lookup, "MAX_WAITING", defaults.max_waiting)?,
            poll_interval_ms: parse(&lookup, "POLL_INTERVAL_MS", defaults.poll_interval_ms)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a JSON config file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is malformed, or holds invalid
    /// values; the error names the path.
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading admission config {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("loading admission config {}", path.display()))
    }

    /// Application entry point: the JSON file named by `WAITING_ROOM_CONFIG`
    /// if set, otherwise the `WAITING_ROOM_*` variables.
    ///
    /// # Errors
    ///
    /// See [`AdmissionConfig::from_json_file`] and [`AdmissionConfig::from_env`].
    pub fn load() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`AdmissionConfig::load`] over an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`AdmissionConfig::load`].
    pub fn load_with<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_json_file(path),
            None => Self::from_lookup(lookup)
                .map_err(|e| anyhow!(e))
                .context("reading WAITING_ROOM_* variables"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::util::ids::RequestId;

    #[test]
    fn test_defaults() {
        let cfg = AdmissionConfig::default();
        assert_eq!(cfg.max_client_requests, 3);
        assert_eq!(cfg.max_processing, 1);
        assert_eq!(cfg.max_waiting, 10);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(100));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        // A full waiting queue rejects even with free slots, so zero depth
        // would reject everything.
        assert!(AdmissionConfig::default().with_max_waiting(0).validate().is_err());
        assert!(AdmissionConfig::default().with_max_processing(0).validate().is_err());
        assert!(AdmissionConfig::default().with_max_client_requests(0).validate().is_err());
        assert!(AdmissionConfig::default().with_poll_interval_ms(0).validate().is_err());
    }

    #[test]
    fn test_lookup_overrides_and_defaults() {
        let vars: HashMap<&str, &str> = [
            ("WAITING_ROOM_MAX_PROCESSING", "4"),
            ("WAITING_ROOM_POLL_INTERVAL_MS", " 250 "),
        ]
        .into_iter()
        .collect();

        let cfg = AdmissionConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
        assert_eq!(cfg.max_processing, 4);
        assert_eq!(cfg.poll_interval_ms, 250);
        assert_eq!(cfg.max_waiting, 10);
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        let err = AdmissionConfig::from_lookup(|k| {
            (k == "WAITING_ROOM_MAX_WAITING").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(err.contains("WAITING_ROOM_MAX_WAITING"));
    }

    #[test]
    fn test_load_prefers_config_file() {
        let path = std::env::temp_dir().join(format!("waiting-room-{}.json", RequestId::new()));
        std::fs::write(&path, r#"{"max_processing": 6, "max_waiting": 2}"#).unwrap();
        let file = path.to_string_lossy().into_owned();

        let cfg = AdmissionConfig::load_with(|k| match k {
            CONFIG_PATH_VAR => Some(file.clone()),
            "WAITING_ROOM_MAX_PROCESSING" => Some("1".into()),
            _ => None,
        })
        .unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.max_processing, 6);
        assert_eq!(cfg.max_waiting, 2);
    }

    #[test]
    fn test_load_errors_name_their_source() {
        let err = AdmissionConfig::load_with(|k| {
            (k == CONFIG_PATH_VAR).then(|| "/nonexistent/waiting-room.json".to_string())
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/waiting-room.json"));

        let err = AdmissionConfig::load_with(|k| {
            (k == "WAITING_ROOM_MAX_PROCESSING").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("WAITING_ROOM_*"));
    }
}
