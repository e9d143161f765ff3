//! OAuth2 bearer-token injection
//!
//! Wraps another [`HttpClient`], fetching a token from the UAA on first use
//! and reusing it until the target answers 401. A rejected token is dropped,
//! a fresh one is fetched and the request is retried exactly once.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use std::sync::{Mutex, PoisonError};
use ureq::http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use ureq::http::{Request, Response, StatusCode};

use super::api::TokenResponse;
use super::{HttpClient, UreqHttpClient, clone_request};
use crate::error::{Error, Result};

/// [`HttpClient`] decorator that authorizes requests with a cached token
///
/// Safe to share between threads. The token cache is locked only while it is
/// read or replaced, never across a network call, so concurrent callers may
/// each fetch a token when the cache is empty.
pub struct Oauth2HttpClient<C = UreqHttpClient> {
    http: C,
    addr: String,
    client_id: String,
    client_secret: String,
    user: Option<(String, String)>,
    token: Mutex<Option<TokenResponse>>,
}

impl Oauth2HttpClient {
    /// Authorize with the client-credentials grant against the UAA at `addr`
    pub fn new(
        addr: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http: UreqHttpClient::new(),
            addr: addr.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user: None,
            token: Mutex::new(None),
        }
    }
}

impl<C: HttpClient> Oauth2HttpClient<C> {
    /// Send token and target requests through `http` instead
    pub fn with_http_client<D: HttpClient>(self, http: D) -> Oauth2HttpClient<D> {
        Oauth2HttpClient {
            http,
            addr: self.addr,
            client_id: self.client_id,
            client_secret: self.client_secret,
            user: self.user,
            token: Mutex::new(None),
        }
    }

    /// Use the password grant for `username` instead of client credentials
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some((username.into(), password.into()));
        self
    }

    /// Cached token, fetching one if the cache is empty
    fn token(&self) -> Result<TokenResponse> {
        if let Some(token) = self.lock().clone() {
            return Ok(token);
        }

        let token = self.fetch_token()?;
        *self.lock() = Some(token.clone());
        Ok(token)
    }

    /// Drop `used` from the cache unless another caller already replaced it
    fn invalidate(&self, used: &TokenResponse) {
        let mut cached = self.lock();
        if cached.as_ref() == Some(used) {
            *cached = None;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<TokenResponse>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fetch_token(&self) -> Result<TokenResponse> {
        let mut url = url::Url::parse(&format!("{}/oauth/token", self.addr.trim_end_matches('/')))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            match &self.user {
                Some((username, password)) => {
                    query.append_pair("client_secret", &self.client_secret);
                    query.append_pair("grant_type", "password");
                    query.append_pair("username", username);
                    query.append_pair("password", password);
                }
                None => {
                    query.append_pair("grant_type", "client_credentials");
                }
            }
        }

        let credentials = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        let request = Request::post(url.as_str())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(AUTHORIZATION, format!("Basic {credentials}"))
            .body(Vec::new())?;

        debug!("requesting token from {}", self.addr);
        let response = self.http.execute(request)?;
        if response.status() != StatusCode::OK {
            warn!("token request to {} failed with {}", self.addr, response.status());
            return Err(Error::TokenRequest(response.status().as_u16()));
        }

        Ok(serde_json::from_slice(response.body())?)
    }
}

impl<C: HttpClient> HttpClient for Oauth2HttpClient<C> {
    fn execute(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        if has_authorization(&request) {
            return self.http.execute(request);
        }

        let retry = clone_request(&request);

        let token = self.token()?;
        let response = self.http.execute(authorize(request, &token)?)?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("token rejected by {}, fetching a new one", retry.uri());
        self.invalidate(&token);
        let token = self.token()?;
        self.http.execute(authorize(retry, &token)?)
    }
}

fn has_authorization(request: &Request<Vec<u8>>) -> bool {
    request
        .headers()
        .get(AUTHORIZATION)
        .is_some_and(|value| !value.is_empty())
}

fn authorize(mut request: Request<Vec<u8>>, token: &TokenResponse) -> Result<Request<Vec<u8>>> {
    let value = HeaderValue::from_str(&format!("{} {}", token.token_type, token.access_token))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}
