//! Metric model types and text encodings.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Tag set of a metric, ordered by key.
pub type Tags = BTreeMap<String, String>;

/// Field set of a metric, ordered by key.
pub type Fields = BTreeMap<String, FieldValue>;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    String(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
        }
    }
}

/// A normalized measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub measurement: String,
    pub tags: Tags,
    pub fields: Fields,
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    /// Compact form: `name,tag=v,tag=v field=v,field=v`.
    pub fn short_string(&self) -> String {
        let mut msg = self.measurement.clone();
        for (k, v) in &self.tags {
            msg.push_str(&format!(",{}={}", k, v));
        }
        msg.push(' ');
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        msg.push_str(&fields.join(","));
        msg
    }

    /// InfluxDB line protocol with a nanosecond timestamp.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);
        for (k, v) in &self.tags {
            line.push(',');
            line.push_str(&escape(k, &[',', '=', ' ']));
            line.push('=');
            line.push_str(&escape(v, &[',', '=', ' ']));
        }
        line.push(' ');

        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    FieldValue::Float(f) => f.to_string(),
                    FieldValue::Integer(i) => format!("{}i", i),
                    FieldValue::String(s) => format!("\"{}\"", escape(s, &['"', '\\'])),
                };
                format!("{}={}", escape(k, &[',', '=', ' ']), value)
            })
            .collect();
        line.push_str(&fields.join(","));

        // Out of range for i64 nanoseconds only past the year 2262.
        if let Some(nanos) = self.timestamp.timestamp_nanos_opt() {
            line.push(' ');
            line.push_str(&nanos.to_string());
        }
        line
    }
}

/// Extended form: the short form followed by the RFC 3339 timestamp.
impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.short_string(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
        )
    }
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Metric {
        Metric {
            measurement: "http_response".to_string(),
            tags: Tags::from([
                ("server".to_string(), "http://example.test".to_string()),
                ("method".to_string(), "GET".to_string()),
            ]),
            fields: Fields::from([
                ("response_time".to_string(), FieldValue::Float(0.25)),
                ("http_response_code".to_string(), FieldValue::Integer(200)),
            ]),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn test_short_string_sorted() {
        assert_eq!(
            sample().short_string(),
            "http_response,method=GET,server=http://example.test http_response_code=200,response_time=0.25"
        );
    }

    #[test]
    fn test_short_string_without_tags() {
        let mut metric = sample();
        metric.tags.clear();
        assert_eq!(
            metric.short_string(),
            "http_response http_response_code=200,response_time=0.25"
        );
    }

    #[test]
    fn test_display_appends_timestamp() {
        let line = sample().to_string();
        assert!(line.starts_with(&sample().short_string()));
        assert!(line.ends_with(" 2024-01-02T03:04:05.000000000Z"));
    }

    #[test]
    fn test_line_protocol() {
        assert_eq!(
            sample().to_line_protocol(),
            "http_response,method=GET,server=http://example.test http_response_code=200i,response_time=0.25 1704164645000000000"
        );
    }

    #[test]
    fn test_line_protocol_escaping() {
        let metric = Metric {
            measurement: "my metric,x".to_string(),
            tags: Tags::from([("a b".to_string(), "c=d,e".to_string())]),
            fields: Fields::from([("note".to_string(), FieldValue::from("say \"hi\" \\o/"))]),
            timestamp: Utc.timestamp_opt(1, 0).unwrap(),
        };
        assert_eq!(
            metric.to_line_protocol(),
            r#"my\ metric\,x,a\ b=c\=d\,e note="say \"hi\" \\o/" 1000000000"#
        );
    }

    #[test]
    fn test_serialize_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["fields"]["http_response_code"], 200);
        assert_eq!(json["fields"]["response_time"], 0.25);
        assert_eq!(json["tags"]["method"], "GET");
        assert_eq!(json["timestamp"], "2024-01-02T03:04:05Z");
    }
}
