//! Output sinks for finished runs.
//!
//! Supports printing to stdout and writing to InfluxDB.

mod influx;

pub use influx::*;

use std::io::Write;
use std::str::FromStr;

use thiserror::Error;

use crate::metrics::Accumulator;

/// Sink error types.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("metrics endpoint answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid sink configuration: {0}")]
    Config(String),
}

/// Line format used by [`StdoutSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `name,tags fields`
    #[default]
    Short,
    /// Short form plus timestamp.
    Long,
    /// InfluxDB line protocol.
    Line,
    /// One JSON object per metric.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            "line" => Ok(Self::Line),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Prints one metric per line.
#[derive(Debug, Clone, Default)]
pub struct StdoutSink {
    format: OutputFormat,
}

impl StdoutSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render all metrics, newline-terminated.
    pub fn render(&self, acc: &Accumulator) -> Result<String, SinkError> {
        let mut out = String::new();
        for metric in acc {
            let line = match self.format {
                OutputFormat::Short => metric.short_string(),
                OutputFormat::Long => metric.to_string(),
                OutputFormat::Line => metric.to_line_protocol(),
                OutputFormat::Json => serde_json::to_string(metric)?,
            };
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn emit(&self, acc: &Accumulator) -> Result<(), SinkError> {
        let rendered = self.render(acc)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

/// Destination for a finished accumulator.
#[derive(Debug)]
pub enum Sink {
    Stdout(StdoutSink),
    Influx(InfluxSink),
}

impl Sink {
    pub async fn emit(&self, acc: &Accumulator) -> Result<(), SinkError> {
        match self {
            Self::Stdout(sink) => sink.emit(acc),
            Self::Influx(sink) => sink.emit(acc).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{FieldValue, Fields, Tags};
    use chrono::TimeZone;

    fn accumulator() -> Accumulator {
        let mut acc = Accumulator::new();
        let ts = chrono::Utc.timestamp_opt(10, 0).unwrap();
        acc.add_fields(
            "http_response",
            Fields::from([("http_response_code".to_string(), FieldValue::Integer(204))]),
            Some(Tags::from([("method".to_string(), "HEAD".to_string())])),
            Some(ts),
        );
        acc.add_fields(
            "http_response",
            Fields::from([("http_response_code".to_string(), FieldValue::Integer(500))]),
            None,
            Some(ts),
        );
        acc
    }

    #[test]
    fn test_render_short() {
        let out = StdoutSink::new(OutputFormat::Short).render(&accumulator()).unwrap();
        assert_eq!(
            out,
            "http_response,method=HEAD http_response_code=204\nhttp_response http_response_code=500\n"
        );
    }

    #[test]
    fn test_render_long_and_line() {
        let long = StdoutSink::new(OutputFormat::Long).render(&accumulator()).unwrap();
        assert!(long.starts_with("http_response,method=HEAD http_response_code=204 1970-01-01T00:00:10"));

        let line = StdoutSink::new(OutputFormat::Line).render(&accumulator()).unwrap();
        assert_eq!(line.lines().next(), Some("http_response,method=HEAD http_response_code=204i 10000000000"));
    }

    #[test]
    fn test_render_json() {
        let out = StdoutSink::new(OutputFormat::Json).render(&accumulator()).unwrap();
        let first: serde_json::Value = serde_json::from_str(out.lines().next().unwrap()).unwrap();
        assert_eq!(first["measurement"], "http_response");
        assert_eq!(first["fields"]["http_response_code"], 204);
    }

    #[test]
    fn test_render_empty() {
        let out = StdoutSink::default().render(&Accumulator::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("short".parse::<OutputFormat>(), Ok(OutputFormat::Short));
        assert_eq!("LONG".parse::<OutputFormat>(), Ok(OutputFormat::Long));
        assert_eq!("line".parse::<OutputFormat>(), Ok(OutputFormat::Line));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
