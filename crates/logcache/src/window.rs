//! Sliding-window polling over a bounded walker
//!
//! [`window`] reads `[start, start + width)` once per interval, moving `start`
//! forward by the interval each time. A width equal to the interval gives
//! tumbling windows; a wider width makes successive windows overlap.

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::context::Context;
use crate::models::Envelope;
use crate::walk::RangeWalker;

/// Settings for [`window`]; later setters overwrite earlier ones
#[derive(Debug, Clone)]
pub struct WindowOptions {
    start: Option<DateTime<Utc>>,
    width: Duration,
    interval: Duration,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            start: None,
            width: Duration::from_secs(60 * 60),
            interval: Duration::from_secs(60),
        }
    }
}

impl WindowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start of the first window. Defaults to now minus the width.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Span of each window. Defaults to one hour.
    pub fn with_width(mut self, width: Duration) -> Self {
        self.width = width;
        self
    }

    /// Time between windows, and how far each window advances. Defaults to
    /// one minute.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Walk successive windows until the visitor returns false or `ctx` is done
///
/// Each walk gets a context that expires one interval after it starts, so a
/// slow walk is cut short instead of running into the next tick. Read errors
/// are absorbed by the walker and show up as short or empty windows.
pub async fn window<W, V>(ctx: &Context, mut visitor: V, walker: &W, options: WindowOptions)
where
    W: RangeWalker + ?Sized,
    V: FnMut(Vec<Envelope>) -> bool,
{
    // tokio intervals must be non-zero
    let interval = options.interval.max(Duration::from_nanos(1));
    let width = to_time_delta(options.width);
    let step = to_time_delta(interval);

    let mut start = options.start.unwrap_or_else(|| shift(Utc::now(), -width));

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        let end = shift(start, width);
        let tick_ctx = ctx.with_timeout(interval);

        let envelopes = walker.walk(&tick_ctx, start, end).await;
        debug!("window [{}, {}) read {} envelopes", start, end, envelopes.len());

        if !visitor(envelopes) || ctx.is_done() {
            return;
        }

        start = shift(start, step);

        tokio::select! {
            biased;
            _ = ctx.done() => return,
            _ = ticker.tick() => {}
        }
    }
}

fn to_time_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

/// `t + delta`, clamped to the representable range
fn shift(t: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    t.checked_add_signed(delta).unwrap_or(if delta < TimeDelta::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
