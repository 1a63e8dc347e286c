//! HTTP capability injected into every venue adapter
//!
//! Adapters never talk to the network directly. They build an
//! [`HttpRequest`], hand it to an [`HttpClient`], and normalize the
//! [`HttpResponse`]. A non-2xx status is returned as a normal response
//! because venues put their error envelope in the body.
//!
//! - [`ReqwestHttpClient`] is the production implementation
//! - `MockHttpClient` (feature `test-utils`) replays canned responses and
//!   records every request for assertions

mod client;
mod config;
#[cfg(any(test, feature = "test-utils"))]
mod mock;
mod transport;

pub use client::ReqwestHttpClient;
pub use config::HttpConfig;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockHttpClient;
pub use transport::{HttpClient, HttpRequest, HttpResponse, Method, RequestBody, TransportError};
