//! Shard group models
//!
//! A shard group is a named set of source-id groups whose envelopes are
//! spread across the requesters reading from it.

use serde::{Deserialize, Serialize};

use super::wire_int;

/// One sub-group of source ids inside a shard group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupedSourceIds {
    pub source_ids: Vec<String>,
}

impl GroupedSourceIds {
    pub fn new<I, S>(source_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_ids: source_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// Current membership of a shard group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShardGroupResponse {
    pub sub_groups: Vec<GroupedSourceIds>,
    #[serde(deserialize_with = "wire_int::deserialize_vec")]
    pub requester_ids: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_shard_group_response() {
        let json = r#"{
            "subGroups": [{"sourceIds": ["a", "b"]}],
            "requesterIds": ["1", 2]
        }"#;

        let resp: ShardGroupResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.sub_groups, vec![GroupedSourceIds::new(["a", "b"])]);
        assert_eq!(resp.requester_ids, vec![1, 2]);
    }

    #[test]
    fn test_empty_response_defaults() {
        let resp: ShardGroupResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.sub_groups.is_empty());
        assert!(resp.requester_ids.is_empty());
    }
}
