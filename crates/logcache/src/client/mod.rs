//! Log-cache HTTP integration
//!
//! This module provides:
//! - The [`HttpClient`] seam every request goes through
//! - A ureq-backed executor with a request timeout
//! - An OAuth2 decorator that injects and refreshes bearer tokens
//! - Clients for source reads, cache metadata and shard groups
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. The async
//! [`crate::Reader`] implementations run each request on tokio's blocking pool.

mod log_cache;
mod oauth2;
mod shard_group;

pub use log_cache::Client;
pub use oauth2::Oauth2HttpClient;
pub use shard_group::{ShardGroupReader, ShardGroupReaderClient};

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use ureq::http::{Request, Response, StatusCode};

use crate::context::Context;
use crate::error::{Error, Result};

/// Executes one HTTP request and buffers the response body
///
/// Non-2xx statuses are returned as responses, not errors.
pub trait HttpClient: Send + Sync {
    fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        (**self).execute(request)
    }
}

/// [`HttpClient`] backed by a ureq agent
#[derive(Debug, Clone)]
pub struct UreqHttpClient {
    agent: ureq::Agent,
}

impl UreqHttpClient {
    /// Requests give up after this long unless configured otherwise
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for UreqHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqHttpClient {
    fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let (parts, body) = request.into_parts();
        let response = if body.is_empty() {
            self.agent.run(Request::from_parts(parts, ()))?
        } else {
            self.agent.run(Request::from_parts(parts, body))?
        };

        let (parts, mut body) = response.into_parts();
        let bytes = body.read_to_vec()?;
        Ok(Response::from_parts(parts, bytes))
    }
}

/// Log-cache API response types
pub mod api {
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    use crate::models::{Envelope, MetaInfo};

    /// Response from a source or shard group read
    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct ReadResponse {
        pub envelopes: EnvelopeBatch,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct EnvelopeBatch {
        pub batch: Vec<Envelope>,
    }

    /// Response from the meta endpoint, keyed by source id
    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct MetaResponse {
        pub meta: BTreeMap<String, MetaInfo>,
    }

    /// Body of a shard group update
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SetShardGroupRequest<'a> {
        pub source_ids: &'a [String],
    }

    /// Token endpoint response; only the fields the wrapper uses
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    pub struct TokenResponse {
        pub token_type: String,
        pub access_token: String,
    }
}

/// Base address plus executor, shared by the log-cache clients
#[derive(Clone)]
pub(crate) struct Endpoint {
    addr: String,
    http: Arc<dyn HttpClient>,
}

impl Endpoint {
    pub(crate) fn new(addr: String, http: Arc<dyn HttpClient>) -> Self {
        Self { addr, http }
    }

    pub(crate) fn set_http_client(&mut self, http: Arc<dyn HttpClient>) {
        self.http = http;
    }

    pub(crate) fn addr(&self) -> &str {
        &self.addr
    }

    /// Join `path` onto the base address, keeping any base path prefix
    pub(crate) fn url(&self, path: &str) -> Result<url::Url> {
        let base = url::Url::parse(&self.addr)?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidAddress(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let joined = format!("{}/{}", self.addr.trim_end_matches('/'), path.trim_start_matches('/'));
        Ok(url::Url::parse(&joined)?)
    }

    /// Send a request and return the body of a 200 response
    pub(crate) fn send(&self, request: Request<Vec<u8>>) -> Result<Vec<u8>> {
        let response = self.http.execute(request)?;
        if response.status() != StatusCode::OK {
            return Err(Error::UnexpectedStatus(response.status().as_u16()));
        }
        Ok(response.into_body())
    }

    /// Send a request and decode the JSON body of a 200 response
    pub(crate) fn send_json<T: DeserializeOwned>(&self, request: Request<Vec<u8>>) -> Result<T> {
        let body = self.send(request)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Run a blocking request on tokio's blocking pool, abandoning it if `ctx`
/// finishes first
pub(crate) async fn run_blocking<T, F>(ctx: &Context, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    if ctx.is_done() {
        return Err(Error::Cancelled);
    }

    let task = tokio::task::spawn_blocking(f);
    tokio::select! {
        biased;
        _ = ctx.done() => Err(Error::Cancelled),
        joined = task => joined.map_err(Error::from).and_then(|result| result),
    }
}

/// Copy method, uri, version, headers and body; extensions are dropped
pub(crate) fn clone_request(request: &Request<Vec<u8>>) -> Request<Vec<u8>> {
    let mut copy = Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use ureq::http::Method;

    /// Records requests and replays queued responses, then a default
    #[derive(Default)]
    pub(crate) struct StubHttpClient {
        pub requests: Mutex<Vec<Request<Vec<u8>>>>,
        pub responses: Mutex<VecDeque<Result<Response<Vec<u8>>>>>,
        pub default_body: Mutex<Vec<u8>>,
    }

    impl StubHttpClient {
        pub fn with_default_body(body: &str) -> Self {
            let stub = Self::default();
            *stub.default_body.lock().unwrap() = body.as_bytes().to_vec();
            stub
        }

        pub fn push_response(&self, status: u16, body: &str) {
            self.responses.lock().unwrap().push_back(Ok(response(status, body)));
        }

        pub fn push_error(&self, err: Error) {
            self.responses.lock().unwrap().push_back(Err(err));
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl HttpClient for StubHttpClient {
        fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
            self.requests.lock().unwrap().push(request);
            match self.responses.lock().unwrap().pop_front() {
                Some(result) => result,
                None => Ok(response(200, &String::from_utf8_lossy(&self.default_body.lock().unwrap()))),
            }
        }
    }

    pub(crate) fn response(status: u16, body: &str) -> Response<Vec<u8>> {
        Response::builder()
            .status(status)
            .body(body.as_bytes().to_vec())
            .unwrap()
    }

    fn endpoint(addr: &str) -> Endpoint {
        Endpoint::new(addr.to_string(), Arc::new(StubHttpClient::default()))
    }

    #[test]
    fn test_url_joins_paths() {
        let url = endpoint("http://localhost:8080").url("api/v1/meta").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/meta");

        let url = endpoint("https://cache.example.com/prefix/").url("/api/v1/meta").unwrap();
        assert_eq!(url.as_str(), "https://cache.example.com/prefix/api/v1/meta");
    }

    #[test]
    fn test_url_rejects_invalid_address() {
        assert!(matches!(endpoint("-:-invalid").url("api"), Err(Error::InvalidAddress(_))));
        assert!(matches!(endpoint("mailto:someone").url("api"), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_send_rejects_non_200() {
        let stub = Arc::new(StubHttpClient::default());
        stub.push_response(500, "");
        let endpoint = Endpoint::new("http://localhost".to_string(), stub);

        let request = Request::get("http://localhost/api").body(Vec::new()).unwrap();
        assert!(matches!(endpoint.send(request), Err(Error::UnexpectedStatus(500))));
    }

    #[test]
    fn test_clone_request_copies_headers_and_body() {
        let request = Request::builder()
            .method(Method::PUT)
            .uri("http://localhost/api")
            .header("x-test", "1")
            .body(b"payload".to_vec())
            .unwrap();

        let copy = clone_request(&request);

        assert_eq!(copy.method(), &Method::PUT);
        assert_eq!(copy.uri(), request.uri());
        assert_eq!(copy.headers().get("x-test").unwrap(), "1");
        assert_eq!(copy.body(), b"payload");
    }

    #[tokio::test]
    async fn test_run_blocking_returns_result() {
        let value = run_blocking(&Context::new(), || Ok(7)).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_run_blocking_respects_cancelled_context() {
        let ctx = Context::new();
        ctx.cancel();

        let result = run_blocking(&ctx, || Ok(())).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
