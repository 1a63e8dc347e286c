//! reqwest-backed HTTP capability

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::HttpConfig;
use crate::transport::{HttpClient, HttpRequest, HttpResponse, Method, RequestBody, TransportError};

/// Production [`HttpClient`] on a pooled reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent_or_default());

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| TransportError::Setup(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.path_for_log()))]
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(params) => builder.form(&params),
            RequestBody::Json(json) => builder.header(CONTENT_TYPE, "application/json").body(json),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        debug!(status, len = body.len(), "Response received");
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_default_config() {
        assert!(ReqwestHttpClient::new(HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_proxy_is_setup_error() {
        let result = ReqwestHttpClient::new(HttpConfig::new().with_proxy("::not a url::"));
        assert!(matches!(result, Err(TransportError::Setup(_))));
    }
}
