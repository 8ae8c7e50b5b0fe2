//! HTTP transport used by site adapters.
//!
//! Adapters never talk to `reqwest` directly; they build an [`HttpRequest`]
//! and hand it to a [`Transport`]. This keeps adapters testable offline.

use crate::error::SiteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const HEADER_USER_AGENT: &str = "User-Agent";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

pub const CONTENT_TYPE_URLENCODED: &str = "application/x-www-form-urlencoded; charset=UTF-8";

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

/// Platform whose browser signature is sent to source sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Desktop,
    Mobile,
}

impl Platform {
    /// Returns the user agent string for this platform.
    pub fn user_agent(self) -> &'static str {
        match self {
            Platform::Desktop => DESKTOP_USER_AGENT,
            Platform::Mobile => MOBILE_USER_AGENT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Builds a form-encoded POST request.
    pub fn post_form(url: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();

        Self {
            method: Method::Post,
            url: url.into(),
            headers: BTreeMap::new(),
            body: Some(body),
        }
        .with_header(HEADER_CONTENT_TYPE, CONTENT_TYPE_URLENCODED)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Sets the user agent matching the platform.
    pub fn with_user_agent(self, platform: Platform) -> Self {
        self.with_header(HEADER_USER_AGENT, platform.user_agent())
    }
}

/// Response returned by a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Final URL after transport-level redirects.
    pub url: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts a non-2xx response into a transport error.
    pub fn error_for_status(self) -> Result<Self, SiteError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SiteError::Transport(format!(
                "HTTP {} from {}",
                self.status, self.url
            )))
        }
    }
}

/// Sends requests on behalf of site adapters.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SiteError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SiteError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        tracing::debug!(url = %request.url, method = ?request.method, "Sending request");
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;

        Ok(HttpResponse { status, body, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_by_platform() {
        let request = HttpRequest::get("https://skscans.com").with_user_agent(Platform::Mobile);
        assert_eq!(
            request.headers.get(HEADER_USER_AGENT).map(String::as_str),
            Some(MOBILE_USER_AGENT)
        );

        let request = request.with_user_agent(Platform::Desktop);
        assert!(request.headers[HEADER_USER_AGENT].contains("Windows NT"));
    }

    #[test]
    fn test_post_form_encoding() {
        let request = HttpRequest::post_form(
            "https://mangatx.com/wp-admin/admin-ajax.php",
            &[("action", "manga_get_chapters"), ("manga", "12 34")],
        );
        assert_eq!(request.method, Method::Post);
        assert_eq!(
            request.body.as_deref(),
            Some("action=manga_get_chapters&manga=12+34")
        );
        assert_eq!(request.headers[HEADER_CONTENT_TYPE], CONTENT_TYPE_URLENCODED);
    }

    #[test]
    fn test_error_for_status() {
        let ok = HttpResponse {
            status: 200,
            body: String::new(),
            url: "https://a".to_string(),
        };
        assert!(ok.error_for_status().is_ok());

        let not_found = HttpResponse {
            status: 404,
            body: String::new(),
            url: "https://a".to_string(),
        };
        let err = not_found.error_for_status().unwrap_err();
        assert!(matches!(err, SiteError::Transport(ref msg) if msg.contains("404")));
    }
}
