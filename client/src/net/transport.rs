//! HTTP transport abstraction.
//!
//! Client-side (csr): `BrowserTransport` issues real `fetch` calls via
//! `gloo-net`. Native builds of the app get `OfflineTransport`, and tests
//! script responses through `MockTransport`.
//!
//! Everything runs on one thread, so the trait is `?Send`.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Outgoing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: Vec::new(), body: None }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Set `name`, replacing any existing value (names compare case-insensitively).
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.into()));
        self
    }

    #[must_use]
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    #[must_use]
    pub fn json_body(mut self, body: &serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self.header("Content-Type", "application/json")
    }

    /// `application/x-www-form-urlencoded` body from ordered pairs.
    #[must_use]
    pub fn form_body(mut self, fields: &[(&str, &str)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.body = Some(encoded);
        self.header("Content-Type", "application/x-www-form-urlencoded")
    }

    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response with a fully read text body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request produced no response at all.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("transport failed: {0}")]
pub struct TransportError(pub String);

#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `fetch`-backed transport for the browser.
#[cfg(feature = "csr")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserTransport;

#[cfg(feature = "csr")]
#[async_trait(?Send)]
impl Transport for BrowserTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        use gloo_net::http::{Method as GlooMethod, RequestBuilder};

        let method = match request.method {
            Method::Get => GlooMethod::GET,
            Method::Post => GlooMethod::POST,
            Method::Put => GlooMethod::PUT,
            Method::Patch => GlooMethod::PATCH,
            Method::Delete => GlooMethod::DELETE,
        };
        let mut builder = RequestBuilder::new(&request.url).method(method);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let prepared = match request.body {
            Some(body) => builder.body(body),
            None => builder.build(),
        }
        .map_err(|e| TransportError(e.to_string()))?;

        let resp = prepared.send().await.map_err(|e| TransportError(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| TransportError(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

/// Transport for builds with no browser: every request fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineTransport;

#[async_trait(?Send)]
impl Transport for OfflineTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError(format!(
            "{} {} not available outside the browser",
            request.method.as_str(),
            request.url
        )))
    }
}

type Scripted = Result<HttpResponse, TransportError>;

/// Scripted transport for tests. Clones share scripts and the request log.
///
/// Responses queued for a URL are served in order; the last one repeats.
/// URLs with nothing queued get the default response, or a transport error.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Rc<RefCell<HashMap<String, VecDeque<Scripted>>>>,
    default_response: Rc<RefCell<Option<HttpResponse>>>,
    requests: Rc<RefCell<Vec<HttpRequest>>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_default(response: HttpResponse) -> Self {
        let transport = Self::default();
        *transport.default_response.borrow_mut() = Some(response);
        transport
    }

    pub fn respond(&self, url: impl Into<String>, response: HttpResponse) {
        self.push(url, Ok(response));
    }

    /// Make requests to `url` fail without a response.
    pub fn fail(&self, url: impl Into<String>, message: &str) {
        self.push(url, Err(TransportError(message.to_owned())));
    }

    fn push(&self, url: impl Into<String>, outcome: Scripted) {
        self.routes.borrow_mut().entry(url.into()).or_default().push_back(outcome);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|r| r.url == url).count()
    }

    fn next_outcome(&self, url: &str) -> Scripted {
        let mut routes = self.routes.borrow_mut();
        if let Some(queue) = routes.get_mut(url) {
            if queue.len() > 1 {
                if let Some(outcome) = queue.pop_front() {
                    return outcome;
                }
            }
            if let Some(outcome) = queue.front() {
                return outcome.clone();
            }
        }
        match self.default_response.borrow().clone() {
            Some(resp) => Ok(resp),
            None => Err(TransportError(format!("no mock response for {url}"))),
        }
    }
}

#[async_trait(?Send)]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let outcome = self.next_outcome(&request.url);
        self.requests.borrow_mut().push(request);
        outcome
    }
}
