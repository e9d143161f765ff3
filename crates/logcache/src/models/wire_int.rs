//! Lenient integer decoding
//!
//! Protobuf's JSON mapping renders 64-bit integers as decimal strings, while
//! hand-written payloads use plain numbers. Both are accepted.

use serde::Deserialize;
use serde::de::{self, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString<T> {
    Number(T),
    String(String),
}

impl<T> NumberOrString<T>
where
    T: FromStr,
    T::Err: Display,
{
    fn into_value<E: de::Error>(self) -> Result<T, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

/// Decode a single integer given as a number or a string
pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    NumberOrString::<T>::deserialize(deserializer)?.into_value()
}

/// Decode a list of integers, each given as a number or a string
pub fn deserialize_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    Vec::<NumberOrString<T>>::deserialize(deserializer)?
        .into_iter()
        .map(NumberOrString::into_value)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "super::deserialize")]
        value: i64,
        #[serde(deserialize_with = "super::deserialize_vec")]
        ids: Vec<u64>,
    }

    #[test]
    fn test_accepts_numbers_and_strings() {
        let sample: Sample = serde_json::from_str(r#"{"value": "-42", "ids": [1, "2"]}"#).unwrap();
        assert_eq!(sample.value, -42);
        assert_eq!(sample.ids, vec![1, 2]);

        let sample: Sample = serde_json::from_str(r#"{"value": 7, "ids": []}"#).unwrap();
        assert_eq!(sample.value, 7);
        assert!(sample.ids.is_empty());
    }

    #[test]
    fn test_rejects_non_numeric_strings() {
        assert!(serde_json::from_str::<Sample>(r#"{"value": "soon", "ids": []}"#).is_err());
    }
}
