//! Integration tests for the logcache crate
//!
//! These tests drive walks and windows through the real HTTP clients and the
//! OAuth2 wrapper, against an in-process fake of the log cache and UAA.

use chrono::{DateTime, Utc};
use logcache::{
    Client, Context, Envelope, HttpClient, Oauth2HttpClient, RangeWalker, ShardGroupReaderClient,
    WalkOptions, WalkStop, WindowOptions, build_walker, walk, window,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ureq::http::{Request, Response};

const TOKEN: &str = "bearer integration-token";

/// Serves `/oauth/token` and source reads from a fixed set of timestamps
struct FakeLogCache {
    timestamps: Vec<i64>,
    token_requests: Mutex<usize>,
    reads: Mutex<Vec<String>>,
}

impl FakeLogCache {
    fn new(timestamps: &[i64]) -> Self {
        Self {
            timestamps: timestamps.to_vec(),
            token_requests: Mutex::new(0),
            reads: Mutex::new(Vec::new()),
        }
    }

    fn read(&self, url: &url::Url) -> Response<Vec<u8>> {
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse::<i64>().ok())
        };
        let start = param("start_time").unwrap_or(0);
        let end = param("end_time").unwrap_or(i64::MAX);
        let limit = param("limit").unwrap_or(100) as usize;

        let source_id = url.path().trim_start_matches("/api/v1/read/").to_string();
        let batch: Vec<Envelope> = self
            .timestamps
            .iter()
            .filter(|&&ts| ts >= start && ts < end)
            .take(limit)
            .map(|&ts| Envelope::new(source_id.clone(), ts))
            .collect();

        self.reads.lock().unwrap().push(url.to_string());
        let body = serde_json::json!({ "envelopes": { "batch": batch } });
        respond(200, body.to_string())
    }
}

impl HttpClient for FakeLogCache {
    fn execute(&self, request: Request<Vec<u8>>) -> logcache::Result<Response<Vec<u8>>> {
        let url = url::Url::parse(&request.uri().to_string()).unwrap();

        if url.path() == "/oauth/token" {
            *self.token_requests.lock().unwrap() += 1;
            return Ok(respond(
                200,
                r#"{"token_type": "bearer", "access_token": "integration-token"}"#.to_string(),
            ));
        }

        let authorized = request
            .headers()
            .get("authorization")
            .is_some_and(|v| v == TOKEN);
        if !authorized {
            return Ok(respond(401, String::new()));
        }

        if url.path().starts_with("/api/v1/read/") {
            return Ok(self.read(&url));
        }
        if url.path().starts_with("/api/v1/shard_group/") {
            return Ok(respond(200, r#"{"subGroups": [], "requesterIds": []}"#.to_string()));
        }
        Ok(respond(404, String::new()))
    }
}

fn respond(status: u16, body: String) -> Response<Vec<u8>> {
    Response::builder()
        .status(status)
        .body(body.into_bytes())
        .unwrap()
}

fn client(fake: &Arc<FakeLogCache>) -> Client {
    let oauth = Oauth2HttpClient::new("http://uaa.example.com", "client", "secret")
        .with_http_client(Arc::clone(fake));
    Client::new("http://log-cache.example.com").with_http_client(oauth)
}

fn at(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

#[tokio::test]
async fn test_walk_through_authorized_client() {
    let fake = Arc::new(FakeLogCache::new(&[10, 20, 30, 40, 50]));
    let client = client(&fake);

    let mut seen = Vec::new();
    let stop = walk(
        &Context::new(),
        "app-guid",
        |batch| {
            seen.extend(batch.into_iter().map(|e| e.timestamp));
            true
        },
        &client,
        WalkOptions::new().with_start(at(0)).with_limit(2),
    )
    .await;

    assert_eq!(stop, WalkStop::Empty);
    assert_eq!(seen, vec![10, 20, 30, 40, 50]);
    assert_eq!(*fake.token_requests.lock().unwrap(), 1);

    let reads = fake.reads.lock().unwrap();
    assert_eq!(reads.len(), 4);
    assert!(reads[1].contains("start_time=21"));
}

#[tokio::test]
async fn test_bounded_walk_stops_at_end() {
    let fake = Arc::new(FakeLogCache::new(&[10, 20, 30, 40, 50]));
    let walker = build_walker("app-guid", client(&fake));

    let envelopes = walker.walk(&Context::new(), at(15), at(45)).await;

    let timestamps: Vec<i64> = envelopes.iter().map(|e| e.timestamp).collect();
    assert_eq!(timestamps, vec![20, 30, 40]);
    assert!(envelopes.iter().all(|e| e.source_id == "app-guid"));
}

#[tokio::test]
async fn test_window_over_authorized_client() {
    let fake = Arc::new(FakeLogCache::new(&[10, 100_000_010, 100_000_020, 200_000_010]));
    let walker = build_walker("app-guid", client(&fake));

    let mut windows = Vec::new();
    window(
        &Context::new(),
        |envelopes| {
            windows.push(envelopes.len());
            windows.len() < 3
        },
        &walker,
        WindowOptions::new()
            .with_start(at(0))
            .with_width(Duration::from_nanos(25))
            .with_interval(Duration::from_millis(100)),
    )
    .await;

    assert_eq!(windows, vec![1, 2, 1]);
}

#[tokio::test]
async fn test_cancelled_walk_sends_no_reads() {
    let fake = Arc::new(FakeLogCache::new(&[10]));
    let walker = build_walker("app-guid", client(&fake));
    let ctx = Context::new();
    ctx.cancel();

    let envelopes = walker.walk(&ctx, at(0), at(100)).await;

    assert!(envelopes.is_empty());
    assert!(fake.reads.lock().unwrap().is_empty());
}

#[test]
fn test_shard_group_through_authorized_client() {
    let fake = Arc::new(FakeLogCache::new(&[]));
    let oauth = Oauth2HttpClient::new("http://uaa.example.com", "client", "secret")
        .with_http_client(Arc::clone(&fake));
    let client = ShardGroupReaderClient::new("http://log-cache.example.com").with_http_client(oauth);

    client.set_shard_group("group", ["a", "b"]).unwrap();
    let group = client.shard_group("group").unwrap();

    assert!(group.sub_groups.is_empty());
    assert_eq!(*fake.token_requests.lock().unwrap(), 1);
}

#[test]
fn test_blocking_runtime_read() {
    let fake = Arc::new(FakeLogCache::new(&[5, 6]));
    let client = client(&fake);

    let envelopes = tokio_test::block_on(async {
        logcache::Reader::read(
            &client,
            &Context::new(),
            "app-guid",
            at(0),
            &logcache::ReadOptions::new(),
        )
        .await
    })
    .unwrap();

    assert_eq!(envelopes.len(), 2);
}
