//! Logcache crate - Client library for reading envelopes from a log cache
//!
//! This crate provides:
//! - Domain models (Envelope, MetaInfo, shard group membership)
//! - A cursor-based walker with pluggable backoff policies
//! - Bounded range walks and a sliding-window driver
//! - HTTP clients for source reads, cache metadata and shard groups
//! - An OAuth2 wrapper that injects and refreshes bearer tokens
//!
//! Walks, windows and reads are async and stop promptly when their
//! [`Context`] is cancelled or times out.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod reader;
pub mod walk;
pub mod window;

pub use client::{
    Client, HttpClient, Oauth2HttpClient, ShardGroupReader, ShardGroupReaderClient, UreqHttpClient,
};
pub use config::Oauth2Credentials;
pub use context::Context;
pub use error::{Error, Result};
pub use models::{
    Counter, Envelope, EnvelopeType, Event, Gauge, GaugeValue, GroupedSourceIds, Log, LogType,
    MetaInfo, ShardGroupResponse, Timer,
};
pub use reader::{ReadOptions, Reader};
pub use walk::{
    AlwaysDoneBackoff, AlwaysRetryBackoff, Backoff, BoundedWalker, ExponentialBackoff, RangeWalker,
    WalkOptions, WalkStop, build_walker, walk,
};
pub use window::{WindowOptions, window};
