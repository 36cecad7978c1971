use crate::core::{Result, TrackError};
use crate::reconcile::derived::DEFAULT_REMAINING_SENTINEL;
use crate::reconcile::dirty::FailurePolicy;
use crate::reconcile::grid::RefetchPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_REFETCH_POLICY: &str = "SITETRACK_REFETCH_POLICY";
pub const ENV_FAILURE_POLICY: &str = "SITETRACK_FAILURE_POLICY";
pub const ENV_MAX_IN_FLIGHT: &str = "SITETRACK_MAX_IN_FLIGHT";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "SITETRACK_REQUEST_TIMEOUT_MS";
pub const ENV_REMAINING_SENTINEL: &str = "SITETRACK_REMAINING_SENTINEL";

/// Grid behavior configuration
///
/// Built with the chained setters, loaded from a JSON file, or read from
/// `SITETRACK_*` environment variables. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// What a reload does with unsaved edits
    pub refetch_policy: RefetchPolicy,

    /// What a failed update call does to its row
    pub failure_policy: FailurePolicy,

    /// Update calls allowed in flight during one commit
    pub max_in_flight: usize,

    /// Per-call timeout; `None` waits indefinitely
    pub request_timeout_ms: Option<u64>,

    /// Rendered in place of remaining days for ended entities
    pub remaining_sentinel: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            refetch_policy: RefetchPolicy::Discard,
            failure_policy: FailurePolicy::Discard,
            max_in_flight: 8,
            request_timeout_ms: None,
            remaining_sentinel: DEFAULT_REMAINING_SENTINEL.to_string(),
        }
    }
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set refetch policy
    pub fn refetch_policy(mut self, policy: RefetchPolicy) -> Self {
        self.refetch_policy = policy;
        self
    }

    /// Set failure policy
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set maximum concurrent update calls
    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Set per-call timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Set the remaining-days sentinel
    pub fn remaining_sentinel(mut self, sentinel: &str) -> Self {
        self.remaining_sentinel = sentinel.to_string();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(TrackError::Config(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(TrackError::Config(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from a JSON document
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TrackError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Read `SITETRACK_*` variables from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GridConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_REFETCH_POLICY) {
            config.refetch_policy = parse_var(ENV_REFETCH_POLICY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FAILURE_POLICY) {
            config.failure_policy = parse_var(ENV_FAILURE_POLICY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_IN_FLIGHT) {
            config.max_in_flight = parse_var(ENV_MAX_IN_FLIGHT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            config.request_timeout_ms = Some(parse_var(ENV_REQUEST_TIMEOUT_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_REMAINING_SENTINEL) {
            config.remaining_sentinel = raw;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| TrackError::Config(format!("invalid {}='{}'", name, raw)))
}

impl FromStr for RefetchPolicy {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "preserve_dirty" | "preserve-dirty" => Ok(Self::PreserveDirty),
            other => Err(TrackError::Config(format!("unknown refetch policy '{}'", other))),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "retain_dirty" | "retain-dirty" => Ok(Self::RetainDirty),
            "discard" => Ok(Self::Discard),
            other => Err(TrackError::Config(format!("unknown failure policy '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = GridConfig::default();
        assert_eq!(config.refetch_policy, RefetchPolicy::Discard);
        assert_eq!(config.failure_policy, FailurePolicy::Discard);
        assert_eq!(config.max_in_flight, 8);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.remaining_sentinel, "N/A");
    }

    #[test]
    fn test_builder() {
        let config = GridConfig::new()
            .failure_policy(FailurePolicy::RetainDirty)
            .max_in_flight(2)
            .request_timeout(Duration::from_millis(250));
        assert_eq!(config.failure_policy, FailurePolicy::RetainDirty);
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_REFETCH_POLICY, "preserve-dirty"),
            (ENV_FAILURE_POLICY, "retain-dirty"),
            (ENV_MAX_IN_FLIGHT, "3"),
            (ENV_REMAINING_SENTINEL, "-"),
        ]);
        let config = GridConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.refetch_policy, RefetchPolicy::PreserveDirty);
        assert_eq!(config.max_in_flight, 3);
        assert_eq!(config.remaining_sentinel, "-");
        assert_eq!(config.failure_policy, FailurePolicy::RetainDirty);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = GridConfig::from_lookup(|key| {
            (key == ENV_MAX_IN_FLIGHT).then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, TrackError::Config(_)));

        let err = GridConfig::from_lookup(|key| {
            (key == ENV_MAX_IN_FLIGHT).then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, TrackError::Config(_)));
    }

    #[test]
    fn test_from_json_partial() {
        let config = GridConfig::from_json_str(
            r#"{ "failure_policy": "retain_dirty", "request_timeout_ms": 500 }"#,
        )
        .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::RetainDirty);
        assert_eq!(config.timeout(), Some(Duration::from_millis(500)));
        assert_eq!(config.max_in_flight, 8);
    }
}
