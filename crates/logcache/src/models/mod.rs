//! Domain models for log-cache entities

mod envelope;
mod meta;
mod shard_group;
pub(crate) mod wire_int;

pub use envelope::{
    Counter, Envelope, EnvelopeType, Event, Gauge, GaugeValue, Log, LogType, Timer,
};
pub use meta::MetaInfo;
pub use shard_group::{GroupedSourceIds, ShardGroupResponse};
