//! Request/response primitive underneath the REST client.

use hp_types::{HopaasError, HopaasResult};
use std::time::Duration;

/// Status and raw body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Blocking HTTP transport.
///
/// Implementations return `Err` only when no response was obtained at all;
/// any status code, including errors, comes back as an [`HttpResponse`].
pub trait Transport: Send + Sync {
    /// GET `url` with the given query pairs.
    fn get(&self, url: &str, query: &[(&str, String)]) -> HopaasResult<HttpResponse>;

    /// POST `body` (already JSON-encoded) to `url`.
    fn post(&self, url: &str, body: String) -> HopaasResult<HttpResponse>;
}

/// reqwest-backed transport used against a real server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Abort any request that takes longer than `timeout`.
    pub fn with_timeout(timeout: Duration) -> HopaasResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HopaasError::Transport {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    fn finish(response: reqwest::blocking::Response) -> HopaasResult<HttpResponse> {
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| HopaasError::Transport {
            message: format!("failed to read response body: {e}"),
        })?;
        Ok(HttpResponse { status, body })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> HopaasResult<HttpResponse> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| HopaasError::Transport {
                message: format!("GET {url} failed: {e}"),
            })?;
        Self::finish(response)
    }

    fn post(&self, url: &str, body: String) -> HopaasResult<HttpResponse> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| HopaasError::Transport {
                message: format!("POST {url} failed: {e}"),
            })?;
        Self::finish(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_counts_as_ok() {
        assert!(HttpResponse::ok("1.0").is_ok());
        assert!(!HttpResponse::new(201, "").is_ok());
        assert!(!HttpResponse::new(500, "boom").is_ok());
    }

    #[test]
    fn malformed_server_url_is_a_transport_error() {
        let transport = HttpTransport::with_timeout(Duration::from_millis(200)).unwrap();
        // No scheme: rejected while building the request, before any I/O.
        let err = transport.get("hopaas.invalid/api/version", &[]).unwrap_err();
        assert!(matches!(err, HopaasError::Transport { .. }));
        let err = transport
            .post("hopaas.invalid/api/tell/tok", "{}".to_string())
            .unwrap_err();
        assert!(matches!(err, HopaasError::Transport { .. }));
    }
}
