//! Transport configuration

use std::time::Duration;

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`ReqwestHttpClient`](crate::ReqwestHttpClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Custom user agent
    pub user_agent: Option<String>,
    /// Proxy URL applied to all schemes, e.g. `socks5://127.0.0.1:1080`
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: None,
            proxy: None,
        }
    }
}

impl HttpConfig {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in seconds
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub(crate) fn user_agent_or_default(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or(concat!("tradewire/", env!("CARGO_PKG_VERSION")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = HttpConfig::new()
            .with_timeout(60)
            .with_user_agent("test-agent")
            .with_proxy("http://127.0.0.1:8080");

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent_or_default(), "test-agent");
        assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_default_user_agent() {
        assert!(HttpConfig::default().user_agent_or_default().starts_with("tradewire/"));
    }
}
