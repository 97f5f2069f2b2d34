//! HTTP transport seam.
//!
//! Sources build an [`HttpRequest`] and hand it to an [`HttpTransport`]; the
//! real implementation is a blocking reqwest client, tests script replies.

use super::FetchError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: String) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Some(body),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a status line (DNS, connect, timeout, TLS).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportFailure(pub String);

pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpReply, TransportFailure>;
}

/// Client-wide HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: "Mozilla/5.0".into(),
        }
    }
}

/// Blocking reqwest transport.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpReply, TransportFailure> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let resp = builder.send().map_err(|e| {
            if e.is_timeout() {
                TransportFailure(format!("request timed out: {e}"))
            } else {
                TransportFailure(e.to_string())
            }
        })?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| TransportFailure(format!("failed to read body: {e}")))?;
        Ok(HttpReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range_is_2xx() {
        assert!(HttpReply { status: 200, body: String::new() }.is_success());
        assert!(HttpReply { status: 204, body: String::new() }.is_success());
        assert!(!HttpReply { status: 301, body: String::new() }.is_success());
        assert!(!HttpReply { status: 503, body: String::new() }.is_success());
    }

    #[test]
    fn post_json_sets_content_type() {
        let req = HttpRequest::post_json("http://x", "{}".into()).header("Origin", "http://y");
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.headers[0], ("Content-Type".into(), "application/json".into()));
        assert_eq!(req.headers[1], ("Origin".into(), "http://y".into()));
    }

    #[test]
    fn default_settings() {
        let s = HttpSettings::default();
        assert_eq!(s.timeout, Duration::from_secs(15));
        assert_eq!(s.user_agent, "Mozilla/5.0");
    }
}
