//! The read capability consumed by walkers
//!
//! A [`Reader`] fetches up to one batch of envelopes for a source, starting at
//! a given time. Transports implement it; [`crate::walk`] only calls it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::models::{Envelope, EnvelopeType};

/// Fetches one batch of envelopes beginning at `start` (inclusive)
#[async_trait]
pub trait Reader: Send + Sync {
    async fn read(
        &self,
        ctx: &Context,
        source_id: &str,
        start: DateTime<Utc>,
        options: &ReadOptions,
    ) -> Result<Vec<Envelope>>;
}

#[async_trait]
impl<R: Reader + ?Sized> Reader for Arc<R> {
    async fn read(
        &self,
        ctx: &Context,
        source_id: &str,
        start: DateTime<Utc>,
        options: &ReadOptions,
    ) -> Result<Vec<Envelope>> {
        (**self).read(ctx, source_id, start, options).await
    }
}

/// Constraints forwarded to the log cache with each read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    /// Exclusive upper bound; unbounded when `None`
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum envelopes per batch; server default when `None`
    pub limit: Option<usize>,
    /// Only return these payload kinds; any kind when empty
    pub envelope_types: Vec<EnvelopeType>,
    /// Server-side filter template applied to the batch
    pub filter_template: Option<String>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_envelope_types(mut self, types: impl IntoIterator<Item = EnvelopeType>) -> Self {
        self.envelope_types = types.into_iter().collect();
        self
    }

    pub fn with_filter_template(mut self, template: impl Into<String>) -> Self {
        self.filter_template = Some(template.into());
        self
    }

    /// Query parameters in wire form; `envelope_types` repeats once per type
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(end) = self.end_time {
            pairs.push(("end_time", unix_nanos(end).to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        for t in &self.envelope_types {
            pairs.push(("envelope_types", t.as_str().to_string()));
        }
        if let Some(template) = &self.filter_template {
            pairs.push(("filter_template", template.clone()));
        }
        pairs
    }
}

/// Nanoseconds since the epoch, saturating outside the representable range
pub(crate) fn unix_nanos(t: DateTime<Utc>) -> i64 {
    t.timestamp_nanos_opt()
        .unwrap_or(if t.timestamp() < 0 { i64::MIN } else { i64::MAX })
}
