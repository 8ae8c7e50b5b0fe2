//! Test utilities: hand-written mocks for the transport and site traits.

use crate::error::SiteError;
use crate::sites::{Site, SiteLoginState, SiteType, Title};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Transport answering from a fixed URL → response table.
///
/// Unknown URLs fail with a transport error. Every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, status: u16, body: &str) -> Self {
        self.redirect(url, url, body).with_status(url, status)
    }

    /// Answers `url` as if the server redirected to `final_url`.
    pub fn redirect(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            HttpResponse {
                status: 200,
                body: body.to_string(),
                url: final_url.to_string(),
            },
        );
        self
    }

    fn with_status(mut self, url: &str, status: u16) -> Self {
        if let Some(response) = self.routes.get_mut(url) {
            response.status = status;
        }
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SiteError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        self.routes
            .get(&url)
            .cloned()
            .ok_or_else(|| SiteError::Transport(format!("connection refused: {}", url)))
    }
}

// ---------------------------------------------------------------------------
// MockSite
// ---------------------------------------------------------------------------

/// Site adapter with scripted outcomes.
pub struct MockSite {
    site: SiteType,
    reads: HashMap<String, Result<Title, SiteError>>,
    search: Result<Vec<Title>, SiteError>,
    search_delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl MockSite {
    pub fn new(site: SiteType) -> Self {
        Self {
            site,
            reads: HashMap::new(),
            search: Ok(Vec::new()),
            search_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Scripts the outcome of `read_url(url)`.
    pub fn with_read(mut self, url: &str, result: Result<Title, SiteError>) -> Self {
        self.reads.insert(url.to_string(), result);
        self
    }

    /// Scripts `read_url(url)` to succeed with a title named `name`.
    pub fn with_title(self, url: &str, name: &str) -> Self {
        let mut title = Title::new(url, self.site);
        title.title = name.to_string();
        self.with_read(url, Ok(title))
    }

    pub fn with_search(mut self, result: Result<Vec<Title>, SiteError>) -> Self {
        self.search = result;
        self
    }

    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    /// URLs passed to `read_url`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Site for MockSite {
    fn site_type(&self) -> SiteType {
        self.site
    }

    async fn read_url(&self, url: &str) -> Result<Title, SiteError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.reads
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(SiteError::NotFound(url.to_string())))
    }

    async fn search(&self, _query: &str) -> Result<Vec<Title>, SiteError> {
        if !self.search_delay.is_zero() {
            tokio::time::sleep(self.search_delay).await;
        }
        self.search.clone()
    }

    async fn check_login(&self) -> SiteLoginState {
        SiteLoginState::NotRequired
    }

    fn test_url(&self) -> String {
        format!("{}/manga/test/", self.site.base_url())
    }
}
