//! Synchronous range reads built on [`walk`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;

use super::{WalkOptions, walk};
use crate::context::Context;
use crate::models::Envelope;
use crate::reader::Reader;

/// Reads every envelope in `[start, end)` and returns them at once
#[async_trait]
pub trait RangeWalker: Send + Sync {
    async fn walk(&self, ctx: &Context, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Envelope>;
}

#[async_trait]
impl<W: RangeWalker + ?Sized> RangeWalker for Arc<W> {
    async fn walk(&self, ctx: &Context, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Envelope> {
        (**self).walk(ctx, start, end).await
    }
}

/// A walker fixed to one source id and reader
///
/// Uses the default backoff, so the first read error or empty batch ends the
/// walk. Whatever was gathered up to that point is returned.
pub struct BoundedWalker<R> {
    source_id: String,
    reader: R,
}

/// Build a [`BoundedWalker`] for `source_id`
pub fn build_walker<R: Reader>(source_id: impl Into<String>, reader: R) -> BoundedWalker<R> {
    BoundedWalker {
        source_id: source_id.into(),
        reader,
    }
}

impl<R: Reader> BoundedWalker<R> {
    pub fn source_id(&self) -> &str {
        &self.source_id
    }
}

#[async_trait]
impl<R: Reader> RangeWalker for BoundedWalker<R> {
    async fn walk(&self, ctx: &Context, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Envelope> {
        let mut envelopes = Vec::new();
        let stop = walk(
            ctx,
            &self.source_id,
            |batch| {
                envelopes.extend(batch);
                true
            },
            &self.reader,
            WalkOptions::new().with_start(start).with_end(end),
        )
        .await;

        debug!(
            "bounded walk of {} returned {} envelopes ({:?})",
            self.source_id,
            envelopes.len(),
            stop
        );
        envelopes
    }
}
