//! Blocking HTTP transport.
//!
//! Uses async reqwest internally, driven by a runtime the transport owns,
//! but presents a sync interface: the extraction loop keeps exactly one
//! request in flight and only suspends inside `get` or a backoff sleep.

use std::time::Duration;

use crate::error::TransportError;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request timeout (connect + headers + body)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A response that made it back from the server, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed `Retry-After` hint, when the server sent one in seconds
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Issue one GET request and wait for the full response.
///
/// Implementations must not retry on their own; retry policy belongs to
/// the caller.
pub trait Transport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportError> {
        (**self).get(url, query)
    }
}

/// Client settings for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            user_agent: concat!("steamline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest-backed [`Transport`].
///
/// Each transport owns its client and a current-thread runtime, so two
/// transports share nothing and can extract different targets from
/// different threads.
pub struct HttpTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self { client, runtime })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportError> {
        self.runtime.block_on(async {
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(|e| TransportError::from_reqwest(&e))?;

            let status = response.status().as_u16();
            let retry_after = parse_retry_after(
                response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::from_reqwest(&e))?;

            log::trace!("GET {url} -> {status} ({} bytes)", body.len());
            Ok::<_, TransportError>(HttpResponse {
                status,
                retry_after,
                body,
            })
        })
    }
}

/// Parse a `Retry-After` header given in delta-seconds.
///
/// The HTTP-date form is not used by the storefront and yields `None`,
/// which makes the caller fall back to its own backoff.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .map(str::trim)
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_seconds() {
        assert_eq!(parse_retry_after(Some("3")), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_after(Some(" 120 ")), Some(Duration::from_secs(120)));
    }

    #[test]
    fn retry_after_zero_is_kept() {
        // Zero is a valid header value; the retry policy decides to ignore it
        assert_eq!(parse_retry_after(Some("0")), Some(Duration::ZERO));
    }

    #[test]
    fn retry_after_http_date_ignored() {
        assert_eq!(parse_retry_after(Some("Wed, 21 Oct 2015 07:28:00 GMT")), None);
    }

    #[test]
    fn retry_after_missing() {
        assert_eq!(parse_retry_after(None), None);
        assert_eq!(parse_retry_after(Some("")), None);
    }

    #[test]
    fn success_range() {
        let resp = |status| HttpResponse {
            status,
            retry_after: None,
            body: String::new(),
        };
        assert!(resp(200).is_success());
        assert!(resp(204).is_success());
        assert!(!resp(301).is_success());
        assert!(!resp(429).is_success());
        assert!(resp(429).is_rate_limited());
    }

    #[test]
    fn default_user_agent_names_crate() {
        assert!(HttpConfig::default().user_agent.starts_with("steamline/"));
    }
}
