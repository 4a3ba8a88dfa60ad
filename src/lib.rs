//! httpcheck - HTTP endpoint health-check probe
//!
//! Probes each configured endpoint once, measures response time and status,
//! optionally matches the body against a pattern, and emits the results as
//! `http_response` metrics.
//!
//! # Architecture
//!
//! - **Config**: YAML target list and sink settings ([`config`])
//! - **Probe**: target resolution and the HTTP request/response cycle ([`probe`])
//! - **Metrics**: metric model and per-run accumulator ([`metrics`])
//! - **Runner**: sequential driver over all targets ([`runner`])
//! - **Sink**: stdout printer and InfluxDB writer ([`sink`])
//!
//! # Example
//!
//! ```rust,no_run
//! use httpcheck::{probe::Target, runner, sink::StdoutSink};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut targets = vec![Target::new("http://localhost:8080/health")];
//! let acc = runner::run(&mut targets).await;
//! StdoutSink::default().emit(&acc)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod metrics;
pub mod probe;
pub mod runner;
pub mod sink;

#[cfg(test)]
mod test_support;
