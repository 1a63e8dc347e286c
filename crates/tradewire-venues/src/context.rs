//! Shared request plumbing for venue adapters

use std::sync::Arc;

use tracing::{debug, info, warn};
use tradewire_auth::{
    encode_params, Credentials, NonceGenerator, SignInput, SignScheme, SignedRequest, SystemClock,
    VenueClock,
};
use tradewire_http::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use tradewire_types::{ExchangeError, ExchangeResult};

use crate::config::VenueConfig;

/// HTTP capability, credentials, base URL, and clock of one adapter
///
/// The OKEx product adapters share one context so they also share the clock
/// offset and nonce sequence.
#[derive(Debug)]
pub struct RestContext {
    venue: &'static str,
    http: Arc<dyn HttpClient>,
    credentials: Option<Credentials>,
    base_url: String,
    clock: VenueClock,
    nonces: NonceGenerator,
}

impl RestContext {
    pub fn new(venue: &'static str, default_base_url: &str, config: VenueConfig) -> ExchangeResult<Self> {
        let http: Arc<dyn HttpClient> = match config.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new(config.http_config)?),
        };
        let clock = VenueClock::new(config.clock.unwrap_or_else(|| Arc::new(SystemClock)));
        let base_url = config
            .base_url
            .unwrap_or_else(|| default_base_url.to_string())
            .trim_end_matches('/')
            .to_string();

        info!(
            venue,
            base_url = %base_url,
            authenticated = config.credentials.is_some(),
            "Created venue adapter"
        );

        Ok(Self {
            venue,
            http,
            credentials: config.credentials,
            base_url,
            clock,
            nonces: NonceGenerator::new(),
        })
    }

    pub fn venue(&self) -> &'static str {
        self.venue
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Credentials for a private call
    pub fn credentials(&self) -> ExchangeResult<&Credentials> {
        self.credentials.as_ref().ok_or(ExchangeError::AuthRequired)
    }

    pub fn clock(&self) -> &VenueClock {
        &self.clock
    }

    /// Clock-corrected Unix milliseconds, used as capture time
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn next_nonce(&self) -> u64 {
        self.nonces.next_millis(&self.clock)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn url_with_query(&self, path: &str, params: &[(String, String)]) -> ExchangeResult<String> {
        if params.is_empty() {
            return Ok(self.url(path));
        }
        Ok(format!("{}{}?{}", self.base_url, path, encode_params(params)?))
    }

    /// Sign with the adapter's credentials at the next nonce and current time
    pub fn sign(
        &self,
        scheme: &SignScheme,
        method: &str,
        path: &str,
        params: Vec<(String, String)>,
        body: Option<&str>,
    ) -> ExchangeResult<SignedRequest> {
        let credentials = self.credentials()?;
        let mut input = SignInput::new(method, path, self.next_nonce(), self.now_millis()).with_params(params);
        if let Some(body) = body {
            input = input.with_body(body);
        }
        Ok(scheme.sign(credentials, input)?)
    }

    /// One network exchange
    pub async fn send(&self, request: HttpRequest) -> ExchangeResult<HttpResponse> {
        debug!(venue = self.venue, method = %request.method, url = %request.path_for_log(), "Sending request");
        let response = self.http.execute(request).await?;
        debug!(venue = self.venue, status = response.status, "Received response");
        Ok(response)
    }

    /// Unsigned GET
    pub async fn get(&self, path: &str, params: &[(String, String)]) -> ExchangeResult<HttpResponse> {
        self.send(HttpRequest::get(self.url_with_query(path, params)?)).await
    }

    /// Send an order placement or cancellation
    ///
    /// A transport failure here leaves the order state unknown.
    pub async fn send_order(&self, request: HttpRequest) -> ExchangeResult<HttpResponse> {
        self.send(request)
            .await
            .map_err(ExchangeError::into_order_state_unknown)
    }

    /// Apply a server-time reading, logging instead of failing when it is absent
    pub fn sync_clock(&self, server_millis: ExchangeResult<i64>) {
        match server_millis {
            Ok(server) => {
                let offset = self.clock.sync_to_server(server);
                info!(venue = self.venue, offset_ms = offset, "Synchronized clock to server time");
            }
            Err(err) => {
                warn!(venue = self.venue, error = %err, "Server time unavailable, using local clock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradewire_auth::FixedClock;
    use tradewire_http::{MockHttpClient, TransportError};

    fn context(mock: Arc<MockHttpClient>) -> RestContext {
        RestContext::new(
            "test.venue",
            "https://api.test/",
            VenueConfig::new()
                .with_http_client(mock)
                .with_clock(Arc::new(FixedClock::new(1_000))),
        )
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let ctx = context(Arc::new(MockHttpClient::new()));
        assert_eq!(ctx.url("/v1/ticker"), "https://api.test/v1/ticker");
        let params = vec![("symbol".to_string(), "BTC USDT".to_string())];
        assert_eq!(
            ctx.url_with_query("/v1/ticker", &params).unwrap(),
            "https://api.test/v1/ticker?symbol=BTC+USDT"
        );
    }

    #[test]
    fn test_private_call_without_credentials() {
        let ctx = context(Arc::new(MockHttpClient::new()));
        assert_eq!(ctx.credentials().unwrap_err(), ExchangeError::AuthRequired);
    }

    #[test]
    fn test_sync_clock_shifts_nonces() {
        let ctx = context(Arc::new(MockHttpClient::new()));
        ctx.sync_clock(Ok(5_000));
        assert_eq!(ctx.now_millis(), 5_000);
        assert_eq!(ctx.next_nonce(), 5_000);

        ctx.sync_clock(Err(ExchangeError::transport("down")));
        assert_eq!(ctx.clock().offset_millis(), 4_000);
    }

    #[tokio::test]
    async fn test_order_transport_failure_is_unknown_state() {
        let mock = Arc::new(MockHttpClient::new());
        mock.push_error(TransportError::Request("reset".into()));
        mock.push_error(TransportError::Request("reset".into()));
        let ctx = context(mock);

        let err = ctx.get("/x", &[]).await.unwrap_err();
        assert!(!err.is_order_state_unknown());

        let err = ctx.send_order(HttpRequest::post(ctx.url("/order"))).await.unwrap_err();
        assert!(err.is_order_state_unknown());
        assert!(!err.is_retryable());
    }
}
