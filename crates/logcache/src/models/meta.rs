//! Per-source cache statistics

use serde::{Deserialize, Serialize};

use super::wire_int;

/// What the log cache currently holds for one source id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaInfo {
    /// Envelopes currently stored
    #[serde(deserialize_with = "wire_int::deserialize")]
    pub count: i64,
    /// Envelopes evicted so far
    #[serde(deserialize_with = "wire_int::deserialize")]
    pub expired: i64,
    #[serde(deserialize_with = "wire_int::deserialize")]
    pub oldest_timestamp: i64,
    #[serde(deserialize_with = "wire_int::deserialize")]
    pub newest_timestamp: i64,
}
