//! Append-only metric collection for one run.

use chrono::{DateTime, Utc};

use super::models::{Fields, Metric, Tags};

/// Ordered collection of metrics, in the order they were added.
#[derive(Debug, Default)]
pub struct Accumulator {
    metrics: Vec<Metric>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a measurement point.
    ///
    /// Nothing is added when `fields` is empty. Missing tags become an empty
    /// set and a missing timestamp becomes the current time.
    pub fn add_fields(
        &mut self,
        measurement: &str,
        fields: Fields,
        tags: Option<Tags>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        if fields.is_empty() {
            return;
        }

        self.metrics.push(Metric {
            measurement: measurement.to_string(),
            tags: tags.unwrap_or_default(),
            fields,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        });
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Metric> {
        self.metrics.iter()
    }
}

impl<'a> IntoIterator for &'a Accumulator {
    type Item = &'a Metric;
    type IntoIter = std::slice::Iter<'a, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
