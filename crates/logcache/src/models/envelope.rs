//! Envelope model representing one unit of loggregator telemetry

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::wire_int;

/// A timestamped telemetry record for one source
///
/// Exactly one of the payload fields is normally set; [`Envelope::envelope_type`]
/// reports which.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Envelope {
    /// Nanoseconds since the Unix epoch
    #[serde(deserialize_with = "wire_int::deserialize")]
    pub timestamp: i64,
    pub source_id: String,
    pub instance_id: String,
    pub tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<Log>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter: Option<Counter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gauge: Option<Gauge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer: Option<Timer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
}

impl Envelope {
    /// Create an envelope without a payload
    pub fn new(source_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            timestamp,
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    /// Attach a log payload (stdout)
    pub fn with_log(mut self, payload: impl AsRef<[u8]>) -> Self {
        self.log = Some(Log {
            payload: STANDARD.encode(payload),
            log_type: LogType::Out,
        });
        self
    }

    /// Attach a counter payload
    pub fn with_counter(mut self, name: impl Into<String>, delta: u64, total: u64) -> Self {
        self.counter = Some(Counter {
            name: name.into(),
            delta,
            total,
        });
        self
    }

    /// Attach a single-metric gauge payload
    pub fn with_gauge(mut self, name: impl Into<String>, unit: impl Into<String>, value: f64) -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            name.into(),
            GaugeValue {
                unit: unit.into(),
                value,
            },
        );
        self.gauge = Some(Gauge { metrics });
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// The timestamp as a UTC date-time
    pub fn time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp)
    }

    /// Which payload this envelope carries
    pub fn envelope_type(&self) -> EnvelopeType {
        if self.log.is_some() {
            EnvelopeType::Log
        } else if self.counter.is_some() {
            EnvelopeType::Counter
        } else if self.gauge.is_some() {
            EnvelopeType::Gauge
        } else if self.timer.is_some() {
            EnvelopeType::Timer
        } else if self.event.is_some() {
            EnvelopeType::Event
        } else {
            EnvelopeType::Any
        }
    }
}

/// Envelope payload kinds, also used as a read filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeType {
    Any,
    Log,
    Counter,
    Gauge,
    Timer,
    Event,
}

impl EnvelopeType {
    /// Name used on the wire (`LOG`, `GAUGE`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeType::Any => "ANY",
            EnvelopeType::Log => "LOG",
            EnvelopeType::Counter => "COUNTER",
            EnvelopeType::Gauge => "GAUGE",
            EnvelopeType::Timer => "TIMER",
            EnvelopeType::Event => "EVENT",
        }
    }
}

impl fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line; `payload` is base64 on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    pub payload: String,
    #[serde(rename = "type")]
    pub log_type: LogType,
}

impl Log {
    /// Decode the raw payload bytes
    pub fn payload_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.payload)
    }

    /// Decode the payload as text, replacing invalid UTF-8
    pub fn payload_text(&self) -> String {
        match self.payload_bytes() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => self.payload.clone(),
        }
    }
}

/// Output stream of a log line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogType {
    #[default]
    Out,
    Err,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Counter {
    pub name: String,
    #[serde(deserialize_with = "wire_int::deserialize")]
    pub delta: u64,
    #[serde(deserialize_with = "wire_int::deserialize")]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gauge {
    pub metrics: BTreeMap<String, GaugeValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeValue {
    pub unit: String,
    pub value: f64,
}

/// Duration measurement, bounds in nanoseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timer {
    pub name: String,
    #[serde(deserialize_with = "wire_int::deserialize")]
    pub start: i64,
    #[serde(deserialize_with = "wire_int::deserialize")]
    pub stop: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub title: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_protobuf_json() {
        let json = r#"{
            "timestamp": "1700000000000000000",
            "sourceId": "app-guid",
            "instanceId": "0",
            "tags": {"deployment": "cf"},
            "log": {"payload": "aGVsbG8=", "type": "ERR"}
        }"#;

        let envelope: Envelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.timestamp, 1_700_000_000_000_000_000);
        assert_eq!(envelope.source_id, "app-guid");
        assert_eq!(envelope.tags.get("deployment").map(String::as_str), Some("cf"));
        assert_eq!(envelope.envelope_type(), EnvelopeType::Log);

        let log = envelope.log.unwrap();
        assert_eq!(log.log_type, LogType::Err);
        assert_eq!(log.payload_text(), "hello");
    }

    #[test]
    fn test_decode_minimal_envelope() {
        let envelope: Envelope = serde_json::from_str(r#"{"timestamp": 99, "sourceId": "some-id"}"#).unwrap();

        assert_eq!(envelope, Envelope::new("some-id", 99));
        assert_eq!(envelope.envelope_type(), EnvelopeType::Any);
    }

    #[test]
    fn test_counter_with_string_totals() {
        let json = r#"{"timestamp": 1, "counter": {"name": "requests", "delta": "2", "total": "40"}}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.envelope_type(), EnvelopeType::Counter);
        let counter = envelope.counter.unwrap();
        assert_eq!(counter.delta, 2);
        assert_eq!(counter.total, 40);
    }

    #[test]
    fn test_builders_set_payload_type() {
        assert_eq!(Envelope::new("a", 1).with_log("x").envelope_type(), EnvelopeType::Log);
        assert_eq!(
            Envelope::new("a", 1).with_gauge("cpu", "percentage", 0.5).envelope_type(),
            EnvelopeType::Gauge
        );
        assert_eq!(
            Envelope::new("a", 1).with_counter("hits", 1, 10).envelope_type(),
            EnvelopeType::Counter
        );
    }

    #[test]
    fn test_time_conversion() {
        let envelope = Envelope::new("a", 1_500_000_000);
        assert_eq!(envelope.time().timestamp(), 1);
        assert_eq!(envelope.time().timestamp_subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_envelope_type_wire_names() {
        assert_eq!(EnvelopeType::Log.to_string(), "LOG");
        assert_eq!(EnvelopeType::Gauge.as_str(), "GAUGE");
        assert_eq!(serde_json::to_string(&EnvelopeType::Timer).unwrap(), "\"TIMER\"");
    }
}
