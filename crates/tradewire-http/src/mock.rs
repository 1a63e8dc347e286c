//! Mock HTTP capability for testing
//!
//! Responses are replayed in FIFO order and every request is captured.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::transport::{HttpClient, HttpRequest, HttpResponse, TransportError};

/// Replays queued responses and records requests
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body
    pub fn push_json(&self, status: u16, body: impl Into<String>) {
        self.push_response(HttpResponse::new(status, body.into().into_bytes()));
    }

    /// Queue a 200 response
    pub fn push_ok(&self, body: impl Into<String>) {
        self.push_json(200, body);
    }

    /// Queue several 200 responses
    pub fn push_oks(&self, bodies: impl IntoIterator<Item = impl Into<String>>) {
        for body in bodies {
            self.push_ok(body);
        }
    }

    pub fn push_response(&self, response: HttpResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Simulate a transport failure
    pub fn push_error(&self, error: TransportError) {
        self.responses.lock().push_back(Err(error));
    }

    /// All captured requests, oldest first
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Responses not yet consumed
    pub fn pending(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no mock response queued".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let mock = MockHttpClient::new();
        mock.push_ok(r#"{"a":1}"#);
        mock.push_json(429, r#"{"msg":"Too many requests"}"#);

        let first = mock.get("https://mock.test/one", vec![]).await.unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(first.text(), r#"{"a":1}"#);

        let second = mock
            .post_form("https://mock.test/two", vec![("k".into(), "v".into())], vec![])
            .await
            .unwrap();
        assert_eq!(second.status, 429);

        assert_eq!(mock.request_count(), 2);
        let last = mock.last_request().unwrap();
        assert_eq!(last.method, Method::Post);
        assert_eq!(last.form_value("k"), Some("v"));
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn test_mock_error_and_empty_queue() {
        let mock = MockHttpClient::new();
        mock.push_error(TransportError::Request("connection reset".into()));

        let err = mock.get("https://mock.test", vec![]).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));

        let err = mock.get("https://mock.test", vec![]).await.unwrap_err();
        assert!(err.to_string().contains("no mock response queued"));
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_captures_json_body_and_headers() {
        let mock = MockHttpClient::new();
        mock.push_ok("{}");
        mock.post_json(
            "https://mock.test/order",
            r#"{"size":"1"}"#.into(),
            vec![("KC-API-KEY".into(), "key".into())],
        )
        .await
        .unwrap();

        let req = mock.last_request().unwrap();
        assert_eq!(req.header("kc-api-key"), Some("key"));
        assert_eq!(req.body, crate::RequestBody::Json(r#"{"size":"1"}"#.into()));
    }
}
