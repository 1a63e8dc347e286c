//! Adapter configuration

use std::sync::Arc;

use tradewire_auth::{Clock, Credentials};
use tradewire_http::{HttpClient, HttpConfig};

/// Everything an adapter needs from the outside
///
/// With no HTTP client injected, adapters build a [`ReqwestHttpClient`]
/// from `http_config`. With no clock, they use the system clock.
///
/// [`ReqwestHttpClient`]: tradewire_http::ReqwestHttpClient
///
/// # Example
///
/// ```no_run
/// use tradewire_auth::Credentials;
/// use tradewire_http::HttpConfig;
/// use tradewire_venues::VenueConfig;
///
/// let config = VenueConfig::new()
///     .with_credentials(Credentials::from_env("BINANCE").unwrap())
///     .with_http_config(HttpConfig::new().with_timeout(10));
/// ```
#[derive(Debug, Clone, Default)]
pub struct VenueConfig {
    pub credentials: Option<Credentials>,
    /// Replaces the venue's default base URL, e.g. `https://api.binance.us`
    pub base_url: Option<String>,
    pub http: Option<Arc<dyn HttpClient>>,
    pub clock: Option<Arc<dyn Clock>>,
    pub http_config: HttpConfig,
}

impl VenueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_http_config(mut self, http_config: HttpConfig) -> Self {
        self.http_config = http_config;
        self
    }
}
