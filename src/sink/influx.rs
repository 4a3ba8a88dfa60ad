//! InfluxDB v1 write endpoint sink.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use super::SinkError;
use crate::config::InfluxConfig;
use crate::metrics::Accumulator;

/// Posts line protocol to `{url}/write?db={database}`.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: Client,
    write_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl InfluxSink {
    pub fn new(config: &InfluxConfig) -> Result<Self, SinkError> {
        if config.database.is_empty() {
            return Err(SinkError::Config("influxdb database is empty".to_string()));
        }

        let mut write_url = Url::parse(&config.url)
            .map_err(|e| SinkError::Config(format!("invalid influxdb url {}: {}", config.url, e)))?;
        write_url
            .path_segments_mut()
            .map_err(|_| SinkError::Config(format!("influxdb url {} cannot be a base", config.url)))?
            .pop_if_empty()
            .push("write");
        write_url.query_pairs_mut().append_pair("db", &config.database);

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            write_url,
            username: config.username.clone().filter(|u| !u.is_empty()),
            password: config.password.clone(),
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    pub async fn emit(&self, acc: &Accumulator) -> Result<(), SinkError> {
        if acc.is_empty() {
            tracing::debug!("No metrics to write");
            return Ok(());
        }

        let body: Vec<String> = acc.iter().map(|m| m.to_line_protocol()).collect();

        let mut request = self
            .client
            .post(self.write_url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body.join("\n"));
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Wrote {} metrics to {}", acc.len(), self.write_url);
        Ok(())
    }
}
