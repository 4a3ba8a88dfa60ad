//! Target descriptor for a single HTTP endpoint.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::bytes::Regex;
use reqwest::{Certificate, ClientBuilder, Identity, Method, Url};

use super::ProbeError;

/// Timeout applied when the configured one is unset or below [`MIN_TIMEOUT`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Smallest timeout accepted as-is.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Method used when none is configured.
pub const DEFAULT_METHOD: &str = "GET";

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "http://localhost";

/// TLS settings handed to the HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// Path to a PEM CA bundle trusted in addition to the system roots.
    pub ssl_ca: Option<PathBuf>,
    /// Path to a PEM client certificate.
    pub ssl_cert: Option<PathBuf>,
    /// Path to the PKCS#8 PEM key for `ssl_cert`.
    pub ssl_key: Option<PathBuf>,
    /// Accept invalid certificates and host names.
    pub insecure_skip_verify: bool,
}

impl TlsOptions {
    /// Install these options on a client builder.
    pub fn apply(&self, mut builder: ClientBuilder) -> Result<ClientBuilder, ProbeError> {
        if let Some(path) = &self.ssl_ca {
            let pem = read_pem(path)?;
            let cert = Certificate::from_pem(&pem)
                .map_err(|e| ProbeError::Tls(format!("invalid CA {}: {}", path.display(), e)))?;
            builder = builder.add_root_certificate(cert);
        }

        match (&self.ssl_cert, &self.ssl_key) {
            (Some(cert_path), Some(key_path)) => {
                let cert = read_pem(cert_path)?;
                let key = read_pem(key_path)?;
                let identity = Identity::from_pkcs8_pem(&cert, &key)
                    .map_err(|e| ProbeError::Tls(format!("invalid client identity: {}", e)))?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(ProbeError::Tls(
                    "ssl_cert and ssl_key must be configured together".to_string(),
                ))
            }
        }

        if self.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(builder)
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ProbeError> {
    std::fs::read(path)
        .map_err(|e| ProbeError::Tls(format!("failed to read {}: {}", path.display(), e)))
}

/// One endpoint to probe.
///
/// Defaults are applied by [`Target::resolve`], which `gather` calls before
/// any network I/O. The body-match pattern is compiled on first use and the
/// outcome (including a compile error) is kept for the lifetime of the
/// descriptor.
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub address: String,
    pub method: String,
    pub body: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub response_string_match: Option<String>,
    pub tls: TlsOptions,
    compiled_string_match: OnceLock<Result<Regex, regex::Error>>,
}

impl Target {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn with_string_match(mut self, pattern: &str) -> Self {
        self.response_string_match = Some(pattern.to_string());
        self.compiled_string_match = OnceLock::new();
        self
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Apply defaults and validate the address.
    ///
    /// Returns the parsed URL; only `http` and `https` are accepted.
    pub fn resolve(&mut self) -> Result<Url, ProbeError> {
        if self.timeout < MIN_TIMEOUT {
            self.timeout = DEFAULT_TIMEOUT;
        }
        if self.method.is_empty() {
            self.method = DEFAULT_METHOD.to_string();
        } else {
            self.method = self.method.to_ascii_uppercase();
        }
        if self.address.is_empty() {
            self.address = DEFAULT_ADDRESS.to_string();
        }

        let url = Url::parse(&self.address)
            .map_err(|e| ProbeError::Validation(format!("invalid address {}: {}", self.address, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ProbeError::Validation(
                "only http and https are supported".to_string(),
            ));
        }

        self.http_method()?;
        Ok(url)
    }

    /// The configured method as a request method.
    pub fn http_method(&self) -> Result<Method, ProbeError> {
        Method::from_bytes(self.method.as_bytes())
            .map_err(|_| ProbeError::Validation(format!("invalid HTTP method: {}", self.method)))
    }

    /// The configured `Host` header, matched case-insensitively.
    pub fn host_override(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("host"))
            .map(|(_, value)| value.as_str())
    }

    /// The body-match regex, compiled on first call.
    ///
    /// `None` when no (or an empty) pattern is configured.
    pub fn string_match(&self) -> Option<&Result<Regex, regex::Error>> {
        let pattern = self
            .response_string_match
            .as_deref()
            .filter(|p| !p.is_empty())?;
        Some(self.compiled_string_match.get_or_init(|| Regex::new(pattern)))
    }
}
