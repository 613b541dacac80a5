//! Per-attempt HTTP session context.
//!
//! A [`BypassSession`] carries the cookie jar (through its client) and the
//! default headers across the short request sequence one strategy performs.
//! Sessions are created fresh for every invocation and never shared between
//! concurrent attempts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{
    CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, LOCATION, REFERER, USER_AGENT,
};
use http::Method;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::{BypassError, TransportError};
use crate::modules::events::{EventDispatcher, RequestEvent, ResponseEvent, UnlockEvent};

/// Request body variants used by the strategies.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    None,
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
}

/// Transport-neutral request description.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub follow_redirects: bool,
    pub timeout: Option<Duration>,
}

impl SessionRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::None,
            follow_redirects: true,
            timeout: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url, body: RequestBody) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Fully buffered response handed back to strategies.
#[derive(Debug, Clone)]
pub struct SessionResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub url: Url,
}

impl SessionResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>, url: Url) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            url,
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Turn any non-2xx status into [`TransportError::Status`].
    pub fn ensure_success(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                status: self.status,
                url: self.url.to_string(),
            })
        }
    }
}

/// Contract for the transport backing a session.
///
/// Implementations must keep cookies between calls so the multi-step flows
/// behave like a browser tab.
#[async_trait]
pub trait SessionHttpClient: Send + Sync {
    async fn execute(&self, request: SessionRequest) -> Result<SessionResponse, TransportError>;

    /// Value of cookie `name` the jar would send to `url`.
    fn cookie(&self, url: &Url, name: &str) -> Option<String>;
}

/// Creates one isolated client (and therefore cookie jar) per bypass attempt.
pub trait SessionClientFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn SessionHttpClient>, TransportError>;
}

/// Cookie jar + default headers scoped to one bypass attempt.
pub struct BypassSession {
    client: Arc<dyn SessionHttpClient>,
    headers: HeaderMap,
    events: Option<Arc<EventDispatcher>>,
}

impl BypassSession {
    pub fn new(client: Arc<dyn SessionHttpClient>) -> Self {
        Self {
            client,
            headers: HeaderMap::new(),
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Result<Self, BypassError> {
        self.set_user_agent(user_agent)?;
        Ok(self)
    }

    pub fn set_user_agent(&mut self, user_agent: &str) -> Result<(), BypassError> {
        self.set_header(USER_AGENT, user_agent)
    }

    pub fn set_referer(&mut self, referer: &str) -> Result<(), BypassError> {
        self.set_header(REFERER, referer)
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), BypassError> {
        let value = HeaderValue::from_str(value).map_err(|_| {
            BypassError::Transport(TransportError::InvalidRequest(format!(
                "invalid value for header '{name}'"
            )))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Cookie value currently held by this session's jar for `url`.
    pub fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        self.client.cookie(url, name)
    }

    pub async fn get(&self, url: &Url) -> Result<SessionResponse, TransportError> {
        self.send(SessionRequest::get(url.clone())).await
    }

    pub async fn get_with_timeout(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<SessionResponse, TransportError> {
        self.send(SessionRequest::get(url.clone()).with_timeout(timeout))
            .await
    }

    /// GET that surfaces 30x responses instead of following them.
    pub async fn get_without_redirect(&self, url: &Url) -> Result<SessionResponse, TransportError> {
        self.send(SessionRequest::get(url.clone()).without_redirects())
            .await
    }

    pub async fn post_form(
        &self,
        url: &Url,
        fields: Vec<(String, String)>,
        headers: HeaderMap,
    ) -> Result<SessionResponse, TransportError> {
        self.send(SessionRequest::post(url.clone(), RequestBody::Form(fields)).with_headers(headers))
            .await
    }

    pub async fn post_json(
        &self,
        url: &Url,
        body: serde_json::Value,
        headers: HeaderMap,
    ) -> Result<SessionResponse, TransportError> {
        self.send(SessionRequest::post(url.clone(), RequestBody::Json(body)).with_headers(headers))
            .await
    }

    /// Send a request with the session defaults underneath the request's own headers.
    pub async fn send(&self, mut request: SessionRequest) -> Result<SessionResponse, TransportError> {
        for (name, value) in self.headers.iter() {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }

        self.dispatch(UnlockEvent::Request(RequestEvent {
            method: request.method.clone(),
            url: request.url.clone(),
            has_cookie: request.headers.contains_key(COOKIE),
            content_type: request
                .headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            timestamp: chrono::Utc::now(),
        }));

        let method = request.method.clone();
        let started = Instant::now();
        let response = self.client.execute(request).await?;

        self.dispatch(UnlockEvent::Response(ResponseEvent {
            method,
            url: response.url.clone(),
            status: response.status,
            latency: started.elapsed(),
            timestamp: chrono::Utc::now(),
        }));

        Ok(response)
    }

    fn dispatch(&self, event: UnlockEvent) {
        if let Some(events) = &self.events {
            events.dispatch(event);
        }
    }
}
