//! Cursor-based traversal of a source's envelopes
//!
//! [`walk`] calls a [`Reader`] repeatedly, handing each non-empty batch to a
//! visitor and moving its cursor to one nanosecond past the batch's last
//! envelope. Errors and empty batches are referred to a [`Backoff`] policy;
//! cancellation of the [`Context`] ends the walk without consulting it.

mod backoff;
mod bounded;

pub use backoff::{AlwaysDoneBackoff, AlwaysRetryBackoff, Backoff, ExponentialBackoff};
pub use bounded::{BoundedWalker, RangeWalker, build_walker};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::context::Context;
use crate::models::{Envelope, EnvelopeType};
use crate::reader::{ReadOptions, Reader, unix_nanos};

/// Settings for one walk; later setters overwrite earlier ones
pub struct WalkOptions {
    start: i64,
    end: Option<DateTime<Utc>>,
    limit: Option<usize>,
    envelope_types: Vec<EnvelopeType>,
    filter_template: Option<String>,
    backoff: Box<dyn Backoff>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            start: 0,
            end: None,
            limit: None,
            envelope_types: Vec::new(),
            filter_template: None,
            backoff: Box::new(AlwaysDoneBackoff),
        }
    }
}

impl WalkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// First timestamp to read (inclusive). Defaults to the epoch.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = unix_nanos(start);
        self
    }

    /// Stop once the cursor would reach `end` (exclusive). Unbounded by default.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Maximum envelopes per read
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Only read these payload kinds
    pub fn with_envelope_types(mut self, types: impl IntoIterator<Item = EnvelopeType>) -> Self {
        self.envelope_types = types.into_iter().collect();
        self
    }

    /// Filter template forwarded with every read
    pub fn with_filter_template(mut self, template: impl Into<String>) -> Self {
        self.filter_template = Some(template.into());
        self
    }

    /// Policy for errors and empty batches. Defaults to [`AlwaysDoneBackoff`].
    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Box::new(backoff);
        self
    }
}

/// Why a walk returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStop {
    /// The visitor returned false
    VisitorDone,
    /// The cursor reached the configured end time
    EndReached,
    /// The backoff declined to retry after an empty batch
    Empty,
    /// The backoff declined to retry after a read error
    Error,
    /// A batch ended before the cursor, so the cursor could not advance
    Stalled,
    /// The context was cancelled or timed out
    Cancelled,
}

/// Read `source_id` batch by batch until the visitor, the end bound, the
/// backoff policy or the context stops the walk
pub async fn walk<R, V>(
    ctx: &Context,
    source_id: &str,
    mut visitor: V,
    reader: &R,
    options: WalkOptions,
) -> WalkStop
where
    R: Reader + ?Sized,
    V: FnMut(Vec<Envelope>) -> bool,
{
    let WalkOptions {
        start,
        end,
        limit,
        envelope_types,
        filter_template,
        mut backoff,
    } = options;

    let read_options = ReadOptions {
        end_time: end,
        limit,
        envelope_types,
        filter_template,
    };
    let end = end.map(unix_nanos);
    let mut cursor = start;

    loop {
        if ctx.is_done() {
            debug!("walk of {} cancelled at {}", source_id, cursor);
            return WalkStop::Cancelled;
        }

        let result = tokio::select! {
            biased;
            _ = ctx.done() => return WalkStop::Cancelled,
            result = reader.read(ctx, source_id, DateTime::from_timestamp_nanos(cursor), &read_options) => result,
        };

        let batch = match result {
            Ok(batch) => batch,
            Err(err) => {
                if err.is_cancelled() || ctx.is_done() {
                    return WalkStop::Cancelled;
                }
                warn!("read of {} at {} failed: {}", source_id, cursor, err);

                let retry = tokio::select! {
                    biased;
                    _ = ctx.done() => return WalkStop::Cancelled,
                    retry = backoff.on_err(&err) => retry,
                };
                if !retry {
                    return WalkStop::Error;
                }
                continue;
            }
        };

        let Some(last) = batch.last().map(|e| e.timestamp) else {
            let retry = tokio::select! {
                biased;
                _ = ctx.done() => return WalkStop::Cancelled,
                retry = backoff.on_empty() => retry,
            };
            if !retry {
                debug!("walk of {} found no envelopes at {}", source_id, cursor);
                return WalkStop::Empty;
            }
            continue;
        };

        backoff.reset();

        let next = last.saturating_add(1);
        if !visitor(batch) {
            return WalkStop::VisitorDone;
        }
        if end.is_some_and(|end| next >= end) {
            return WalkStop::EndReached;
        }

        if next <= cursor {
            warn!(
                "read of {} at {} returned envelopes ending at {}, stopping",
                source_id, cursor, last
            );
            return WalkStop::Stalled;
        }
        cursor = next;
    }
}
