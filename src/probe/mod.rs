//! Probe module for HTTP endpoint checks.
//!
//! A [`Target`] is resolved, probed once and turned into an `http_response`
//! metric by [`gather`].

mod http;
mod target;

pub use http::*;
pub use target::*;

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::metrics::{Accumulator, Tags};

/// Measurement name for HTTP probe results.
pub const MEASUREMENT: &str = "http_response";

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("invalid target: {0}")]
    Validation(String),
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("TLS configuration error: {0}")]
    Tls(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ProbeError {
    /// Whether the probe failed on the wire rather than before dispatch.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

/// Probe a target once and append the result to the accumulator.
///
/// Defaults are applied and the address is validated before any network
/// I/O. On error nothing is appended.
pub async fn gather(target: &mut Target, acc: &mut Accumulator) -> Result<(), ProbeError> {
    let url = target.resolve()?;

    let fields = probe(target, url).await?;

    let tags: Tags = BTreeMap::from([
        ("server".to_string(), target.address.clone()),
        ("method".to_string(), target.method.clone()),
    ]);
    acc.add_fields(MEASUREMENT, fields, Some(tags), None);

    Ok(())
}
