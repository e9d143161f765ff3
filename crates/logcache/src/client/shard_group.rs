//! Client for shard group reads and membership

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ureq::http::Request;
use ureq::http::header::CONTENT_TYPE;

use super::api::{ReadResponse, SetShardGroupRequest};
use super::{Endpoint, HttpClient, UreqHttpClient, run_blocking};
use crate::context::Context;
use crate::error::Result;
use crate::models::{Envelope, ShardGroupResponse};
use crate::reader::{ReadOptions, Reader, unix_nanos};

/// Reads from and manages shard groups
///
/// Envelopes of a shard group are split across its requesters, so each
/// reader identifies itself with a requester id.
#[derive(Clone)]
pub struct ShardGroupReaderClient {
    endpoint: Endpoint,
}

impl ShardGroupReaderClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new(addr.into(), Arc::new(UreqHttpClient::new())),
        }
    }

    pub fn with_http_client(mut self, http: impl HttpClient + 'static) -> Self {
        self.endpoint.set_http_client(Arc::new(http));
        self
    }

    /// Read one batch from shard group `name` on behalf of `requester_id`
    pub fn read(
        &self,
        name: &str,
        start: DateTime<Utc>,
        requester_id: u64,
        options: &ReadOptions,
    ) -> Result<Vec<Envelope>> {
        let mut url = self.endpoint.url(&group_path(name))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("start_time", &unix_nanos(start).to_string());
            query.append_pair("requester_id", &requester_id.to_string());
            for (key, value) in options.query_pairs() {
                query.append_pair(key, &value);
            }
        }

        let request = Request::get(url.as_str()).body(Vec::new())?;
        let response: ReadResponse = self.endpoint.send_json(request)?;
        Ok(response.envelopes.batch)
    }

    /// A [`Reader`] that reads shard groups as `requester_id`; the source id
    /// passed to it is the group name
    pub fn build_reader(&self, requester_id: u64) -> ShardGroupReader {
        ShardGroupReader {
            client: self.clone(),
            requester_id,
        }
    }

    /// Add a sub-group of source ids to shard group `name`, creating the group
    /// if needed
    pub fn set_shard_group<I, S>(&self, name: &str, source_ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source_ids: Vec<String> = source_ids.into_iter().map(Into::into).collect();
        let body = serde_json::to_vec(&SetShardGroupRequest {
            source_ids: &source_ids,
        })?;

        let url = self.endpoint.url(&group_path(name))?;
        let request = Request::put(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body)?;
        self.endpoint.send(request)?;
        Ok(())
    }

    /// Current sub-groups and requesters of shard group `name`
    pub fn shard_group(&self, name: &str) -> Result<ShardGroupResponse> {
        let url = self.endpoint.url(&format!("{}/meta", group_path(name)))?;
        let request = Request::get(url.as_str()).body(Vec::new())?;
        self.endpoint.send_json(request)
    }
}

fn group_path(name: &str) -> String {
    format!("api/v1/shard_group/{}", urlencoding::encode(name))
}

/// [`Reader`] bound to one requester id of a [`ShardGroupReaderClient`]
#[derive(Clone)]
pub struct ShardGroupReader {
    client: ShardGroupReaderClient,
    requester_id: u64,
}

impl ShardGroupReader {
    pub fn requester_id(&self) -> u64 {
        self.requester_id
    }
}

#[async_trait]
impl Reader for ShardGroupReader {
    async fn read(
        &self,
        ctx: &Context,
        name: &str,
        start: DateTime<Utc>,
        options: &ReadOptions,
    ) -> Result<Vec<Envelope>> {
        let client = self.client.clone();
        let requester_id = self.requester_id;
        let name = name.to_string();
        let options = options.clone();
        run_blocking(ctx, move || client.read(&name, start, requester_id, &options)).await
    }
}
