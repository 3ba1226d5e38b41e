//! Election configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who may vacate a held leadership key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleasePolicy {
    /// Anyone may release; the holding session is read from the store.
    #[default]
    Permissive,
    /// The caller must present the holding session.
    Strict,
}

impl FromStr for ReleasePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(ReleasePolicy::Permissive),
            "strict" => Ok(ReleasePolicy::Strict),
            other => Err(format!("unknown release policy: {}", other)),
        }
    }
}

impl fmt::Display for ReleasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleasePolicy::Permissive => f.write_str("permissive"),
            ReleasePolicy::Strict => f.write_str("strict"),
        }
    }
}

/// Leader election configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// First key segment (`service` in `service/{name}/leader`)
    pub key_prefix: String,
    /// Last key segment (`leader` in `service/{name}/leader`)
    pub key_suffix: String,
    /// Release policy
    pub release_policy: ReleasePolicy,
    /// Destroy the session created for an election attempt that lost
    pub destroy_losing_sessions: bool,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            key_prefix: "service".to_string(),
            key_suffix: "leader".to_string(),
            release_policy: ReleasePolicy::Permissive,
            destroy_losing_sessions: true,
        }
    }
}

impl ElectionConfig {
    /// Create a builder.
    pub fn builder() -> ElectionConfigBuilder {
        ElectionConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `TENURE_KEY_PREFIX`, `TENURE_KEY_SUFFIX`,
    /// `TENURE_RELEASE_POLICY` and `TENURE_DESTROY_LOSING_SESSIONS`.
    pub fn from_env() -> ElectionConfigBuilder {
        let mut builder = ElectionConfigBuilder::default();

        if let Ok(prefix) = std::env::var("TENURE_KEY_PREFIX") {
            builder = builder.key_prefix(prefix);
        }

        if let Ok(suffix) = std::env::var("TENURE_KEY_SUFFIX") {
            builder = builder.key_suffix(suffix);
        }

        if let Ok(policy) = std::env::var("TENURE_RELEASE_POLICY")
            && let Ok(policy) = policy.parse()
        {
            builder = builder.release_policy(policy);
        }

        if let Ok(destroy) = std::env::var("TENURE_DESTROY_LOSING_SESSIONS") {
            let destroy = destroy == "1" || destroy.eq_ignore_ascii_case("true");
            builder = builder.destroy_losing_sessions(destroy);
        }

        builder
    }

    /// Derive the store key for a service.
    pub fn key_for(&self, service: &str) -> String {
        format!("{}/{}/{}", self.key_prefix, service, self.key_suffix)
    }
}

/// Builder for election configuration.
#[derive(Debug, Default)]
pub struct ElectionConfigBuilder {
    config: ElectionConfig,
}

impl ElectionConfigBuilder {
    /// Set the key prefix.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Set the key suffix.
    pub fn key_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.key_suffix = suffix.into();
        self
    }

    /// Set the release policy.
    pub fn release_policy(mut self, policy: ReleasePolicy) -> Self {
        self.config.release_policy = policy;
        self
    }

    /// Require the holding session for releases.
    pub fn strict(self) -> Self {
        self.release_policy(ReleasePolicy::Strict)
    }

    /// Whether sessions from lost attempts are destroyed.
    pub fn destroy_losing_sessions(mut self, destroy: bool) -> Self {
        self.config.destroy_losing_sessions = destroy;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ElectionConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key_mapping() {
        let config = ElectionConfig::default();
        assert_eq!(config.key_for("svcA"), "service/svcA/leader");
        assert_eq!(config.release_policy, ReleasePolicy::Permissive);
        assert!(config.destroy_losing_sessions);
    }

    #[test]
    fn test_builder() {
        let config = ElectionConfig::builder()
            .key_prefix("locks")
            .key_suffix("owner")
            .strict()
            .destroy_losing_sessions(false)
            .build();

        assert_eq!(config.key_for("db"), "locks/db/owner");
        assert_eq!(config.release_policy, ReleasePolicy::Strict);
        assert!(!config.destroy_losing_sessions);
    }

    #[test]
    fn test_release_policy_parse() {
        assert_eq!("strict".parse::<ReleasePolicy>(), Ok(ReleasePolicy::Strict));
        assert_eq!(" Permissive ".parse::<ReleasePolicy>(), Ok(ReleasePolicy::Permissive));
        assert!("sometimes".parse::<ReleasePolicy>().is_err());
        assert_eq!(ReleasePolicy::Strict.to_string(), "strict");
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: ElectionConfig =
            serde_json::from_str(r#"{"release_policy": "strict"}"#).unwrap();

        assert_eq!(config.release_policy, ReleasePolicy::Strict);
        assert_eq!(config.key_prefix, "service");
        assert_eq!(config.key_suffix, "leader");
    }
}
