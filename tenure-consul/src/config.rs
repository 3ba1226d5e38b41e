//! Consul client configuration.

use std::time::Duration;

/// Default Consul agent address.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1:8500";

/// Consul client configuration.
#[derive(Debug, Clone)]
pub struct ConsulConfig {
    /// Agent base URL.
    pub address: String,
    /// ACL token sent as `X-Consul-Token`.
    pub token: Option<String>,
    /// Datacenter to query (agent's own if unset).
    pub datacenter: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Lock delay applied to sessions created by this client.
    ///
    /// Consul refuses to hand a lock to a new session for this long after
    /// the previous holder's session was invalidated.
    pub lock_delay: Option<Duration>,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            token: None,
            datacenter: None,
            timeout: Duration::from_secs(10),
            lock_delay: None,
            user_agent: format!("tenure-consul/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConsulConfig {
    /// Create a configuration for the given agent address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: normalize_address(&address.into(), false),
            ..Default::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> ConsulConfigBuilder {
        ConsulConfigBuilder::default()
    }

    /// Load configuration from the standard Consul environment variables.
    ///
    /// Reads `CONSUL_HTTP_ADDR`, `CONSUL_HTTP_SSL`, `CONSUL_HTTP_TOKEN`,
    /// `CONSUL_DATACENTER` and `CONSUL_TIMEOUT_MS`.
    pub fn from_env() -> ConsulConfigBuilder {
        let mut builder = ConsulConfigBuilder::default();

        let ssl = std::env::var("CONSUL_HTTP_SSL")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if let Ok(address) = std::env::var("CONSUL_HTTP_ADDR") {
            builder.config.address = normalize_address(&address, ssl);
        }

        if let Ok(token) = std::env::var("CONSUL_HTTP_TOKEN")
            && !token.is_empty()
        {
            builder = builder.token(token);
        }

        if let Ok(dc) = std::env::var("CONSUL_DATACENTER") {
            builder = builder.datacenter(dc);
        }

        if let Ok(timeout) = std::env::var("CONSUL_TIMEOUT_MS")
            && let Ok(ms) = timeout.parse()
        {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        builder
    }
}

/// Prefix a bare `host:port` with a scheme.
fn normalize_address(address: &str, ssl: bool) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else if ssl {
        format!("https://{}", address)
    } else {
        format!("http://{}", address)
    }
}

/// Builder for Consul configuration.
#[derive(Debug, Default)]
pub struct ConsulConfigBuilder {
    config: ConsulConfig,
}

impl ConsulConfigBuilder {
    /// Set the agent address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = normalize_address(&address.into(), false);
        self
    }

    /// Set the ACL token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the datacenter.
    pub fn datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.config.datacenter = Some(datacenter.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the session lock delay.
    pub fn lock_delay(mut self, lock_delay: Duration) -> Self {
        self.config.lock_delay = Some(lock_delay);
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ConsulConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConsulConfig::default();
        assert_eq!(config.address, "http://127.0.0.1:8500");
        assert!(config.token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let config = ConsulConfig::builder()
            .address("consul.internal:8500/")
            .token("secret")
            .datacenter("dc2")
            .timeout(Duration::from_secs(3))
            .lock_delay(Duration::from_millis(500))
            .build();

        assert_eq!(config.address, "http://consul.internal:8500");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.datacenter.as_deref(), Some("dc2"));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.lock_delay, Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("localhost:8500", false), "http://localhost:8500");
        assert_eq!(normalize_address("localhost:8501", true), "https://localhost:8501");
        assert_eq!(
            normalize_address("https://consul.example.com/", false),
            "https://consul.example.com"
        );
    }
}
