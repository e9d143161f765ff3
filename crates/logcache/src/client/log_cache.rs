//! Client for the log-cache read and meta endpoints

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use ureq::http::Request;

use super::api::{MetaResponse, ReadResponse};
use super::{Endpoint, HttpClient, UreqHttpClient, run_blocking};
use crate::context::Context;
use crate::error::Result;
use crate::models::{Envelope, MetaInfo};
use crate::reader::{ReadOptions, Reader, unix_nanos};

/// Reads envelopes for individual source ids
///
/// Cloning is cheap; clones share the same executor.
#[derive(Clone)]
pub struct Client {
    endpoint: Endpoint,
}

impl Client {
    /// Create a client for the log cache at `addr` (e.g. `https://log-cache.example.com`)
    ///
    /// Requests time out after five seconds unless another executor is set
    /// with [`Client::with_http_client`].
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new(addr.into(), Arc::new(UreqHttpClient::new())),
        }
    }

    /// Send requests through `http`, e.g. an [`super::Oauth2HttpClient`]
    pub fn with_http_client(mut self, http: impl HttpClient + 'static) -> Self {
        self.endpoint.set_http_client(Arc::new(http));
        self
    }

    pub fn addr(&self) -> &str {
        self.endpoint.addr()
    }

    /// Read one batch of envelopes for `source_id` starting at `start`
    ///
    /// # Errors
    /// Fails on an unparsable address, transport failure, a non-200 status or
    /// an undecodable body.
    pub fn read(
        &self,
        source_id: &str,
        start: DateTime<Utc>,
        options: &ReadOptions,
    ) -> Result<Vec<Envelope>> {
        let mut url = self
            .endpoint
            .url(&format!("api/v1/read/{}", urlencoding::encode(source_id)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("start_time", &unix_nanos(start).to_string());
            for (name, value) in options.query_pairs() {
                query.append_pair(name, &value);
            }
        }

        let request = Request::get(url.as_str()).body(Vec::new())?;
        let response: ReadResponse = self.endpoint.send_json(request)?;
        Ok(response.envelopes.batch)
    }

    /// Cache statistics for every source id the log cache holds
    pub fn meta(&self) -> Result<BTreeMap<String, MetaInfo>> {
        let url = self.endpoint.url("api/v1/meta")?;
        let request = Request::get(url.as_str()).body(Vec::new())?;
        let response: MetaResponse = self.endpoint.send_json(request)?;
        Ok(response.meta)
    }
}

#[async_trait]
impl Reader for Client {
    async fn read(
        &self,
        ctx: &Context,
        source_id: &str,
        start: DateTime<Utc>,
        options: &ReadOptions,
    ) -> Result<Vec<Envelope>> {
        let client = self.clone();
        let source_id = source_id.to_string();
        let options = options.clone();
        run_blocking(ctx, move || Client::read(&client, &source_id, start, &options)).await
    }
}
