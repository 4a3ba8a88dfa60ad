//! HTTP probe implementation.

use std::time::Instant;

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST,
    LOCATION, PROXY_AUTHORIZATION,
};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Response, StatusCode, Url};

use super::{ProbeError, Target};
use crate::metrics::{FieldValue, Fields};

pub const RESPONSE_TIME: &str = "response_time";
pub const HTTP_RESPONSE_CODE: &str = "http_response_code";
pub const RESPONSE_STRING_MATCH: &str = "response_string_match";

/// Outcome of sending one request.
#[derive(Debug)]
pub enum Dispatch {
    /// A final response.
    Delivered(Response),
    /// A redirect that was not followed because the target disables redirects.
    RedirectBlocked(Response),
    /// The request never produced a response.
    Failed(ProbeError),
}

impl Dispatch {
    /// Collapse into the response the probe reports on.
    pub fn into_response(self) -> Result<Response, ProbeError> {
        match self {
            Self::Delivered(response) | Self::RedirectBlocked(response) => Ok(response),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Headers dropped when a redirect leaves the original authority.
const SENSITIVE_HEADERS: [HeaderName; 3] = [AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION];

/// Build a client bound to the target's timeout and redirect policy.
///
/// With a `Host` override the client never follows redirects itself, so the
/// override can be dropped on hops to another server.
pub fn build_client(target: &Target) -> Result<Client, ProbeError> {
    let policy = if target.follow_redirects && target.host_override().is_none() {
        Policy::default()
    } else {
        Policy::none()
    };

    let builder = Client::builder()
        .timeout(target.timeout)
        .connect_timeout(target.timeout)
        .redirect(policy);

    target
        .tls
        .apply(builder)?
        .build()
        .map_err(|e| ProbeError::Client(e.to_string()))
}

/// Validate the configured headers.
fn request_headers(target: &Target) -> Result<HeaderMap, ProbeError> {
    let mut headers = HeaderMap::new();
    for (key, value) in &target.headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ProbeError::Validation(format!("invalid header name {}: {}", key, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ProbeError::Validation(format!("invalid header {}: {}", key, e)))?;
        // An explicit Host replaces the one the transport derives from the URL.
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Run a single HTTP probe against a resolved target.
///
/// Returns `response_time` (seconds), `http_response_code` and, when a
/// pattern is configured, `response_string_match`.
pub async fn probe(target: &Target, url: Url) -> Result<Fields, ProbeError> {
    let client = build_client(target)?;
    let request = Hop {
        method: target.http_method()?,
        url,
        headers: request_headers(target)?,
        body: target.body.clone().filter(|b| !b.is_empty()),
    };

    let start = Instant::now();
    let dispatch = dispatch(&client, target, request).await;
    let elapsed = start.elapsed();

    if let Dispatch::RedirectBlocked(response) = &dispatch {
        tracing::debug!(
            "Redirect from {} not followed (status {})",
            target.address,
            response.status()
        );
    }
    let response = dispatch.into_response()?;

    let mut fields = Fields::new();
    fields.insert(RESPONSE_TIME.to_string(), elapsed.as_secs_f64().into());
    fields.insert(
        HTTP_RESPONSE_CODE.to_string(),
        FieldValue::Integer(response.status().as_u16().into()),
    );

    let Some(compiled) = target.string_match() else {
        return Ok(fields);
    };

    let regex = match compiled {
        Ok(regex) => regex,
        Err(e) => {
            tracing::warn!(
                "Failed to compile regular expression {:?}: {}",
                target.response_string_match,
                e
            );
            fields.insert(RESPONSE_STRING_MATCH.to_string(), FieldValue::Integer(0));
            return Ok(fields);
        }
    };

    let matched = match response.bytes().await {
        Ok(body) => regex.is_match(&body),
        Err(e) => {
            tracing::warn!("Failed to read body of HTTP response from {}: {}", target.address, e);
            false
        }
    };
    fields.insert(
        RESPONSE_STRING_MATCH.to_string(),
        FieldValue::Integer(matched.into()),
    );

    Ok(fields)
}

/// One request of a possibly redirected exchange.
#[derive(Debug)]
struct Hop {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<String>,
}

impl Hop {
    /// The request for the `Location` of `response`.
    ///
    /// `Host` is kept only for a relative location on the same authority;
    /// credentials are dropped when the authority changes.
    fn follow(mut self, response: &Response) -> Result<Self, ProbeError> {
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ProbeError::Network("redirect without a valid Location".to_string()))?;
        let next = self
            .url
            .join(location)
            .map_err(|e| ProbeError::Network(format!("invalid redirect location {}: {}", location, e)))?;
        if next.scheme() != "http" && next.scheme() != "https" {
            return Err(ProbeError::Network(format!(
                "redirect to unsupported scheme: {}",
                next
            )));
        }

        let same_authority = next.origin() == self.url.origin();
        let relative = Url::parse(location).is_err();
        if !(relative && same_authority) {
            self.headers.remove(HOST);
        }
        if !same_authority {
            for name in &SENSITIVE_HEADERS {
                self.headers.remove(name);
            }
        }

        // 307 and 308 replay the request as sent; the others turn into a GET.
        let keep_method = matches!(
            response.status(),
            StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
        ) || self.method == Method::GET
            || self.method == Method::HEAD;
        if !keep_method {
            self.method = Method::GET;
            self.body = None;
            self.headers.remove(CONTENT_TYPE);
            self.headers.remove(CONTENT_LENGTH);
        }

        self.url = next;
        Ok(self)
    }
}

/// Send the request and classify the outcome.
///
/// The wait for response headers, across every redirect hop, is bounded
/// separately from the client's overall timeout, which also covers the body
/// read.
async fn dispatch(client: &Client, target: &Target, request: Hop) -> Dispatch {
    match tokio::time::timeout(target.timeout, send(client, target, request)).await {
        Ok(dispatch) => dispatch,
        Err(_) => Dispatch::Failed(ProbeError::Timeout(target.timeout)),
    }
}

async fn send(client: &Client, target: &Target, mut hop: Hop) -> Dispatch {
    let manual = target.follow_redirects && hop.headers.contains_key(HOST);
    let mut redirects = 0;

    loop {
        let mut request = client
            .request(hop.method.clone(), hop.url.clone())
            .headers(hop.headers.clone());
        if let Some(body) = &hop.body {
            request = request.body(body.clone());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Dispatch::Failed(ProbeError::Timeout(target.timeout)),
            Err(e) => return Dispatch::Failed(ProbeError::Network(e.to_string())),
        };

        if !is_redirect(&response) {
            return Dispatch::Delivered(response);
        }
        if !target.follow_redirects {
            return Dispatch::RedirectBlocked(response);
        }
        if !manual {
            return Dispatch::Delivered(response);
        }

        redirects += 1;
        if redirects > MAX_REDIRECTS {
            return Dispatch::Failed(ProbeError::Network(format!(
                "stopped after {} redirects",
                MAX_REDIRECTS
            )));
        }
        hop = match hop.follow(&response) {
            Ok(next) => next,
            Err(e) => return Dispatch::Failed(e),
        };
        tracing::debug!("Following redirect to {}", hop.url);
    }
}

fn is_redirect(response: &Response) -> bool {
    matches!(
        response.status(),
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    ) && response.headers().contains_key(LOCATION)
}
