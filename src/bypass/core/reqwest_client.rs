//! Reqwest-based implementation of the `SessionHttpClient` trait.
//!
//! Two clients share one cookie jar: the default one follows redirects, the
//! other uses `Policy::none()` so strategies can read `Location` headers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, redirect::Policy};
use url::Url;

use super::error::TransportError;
use super::session::{
    RequestBody, SessionClientFactory, SessionHttpClient, SessionRequest, SessionResponse,
};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Reqwest-backed session transport with a private cookie jar.
pub struct ReqwestSessionClient {
    client: Client,
    no_redirect: Client,
    jar: Arc<Jar>,
    timeout: Duration,
}

impl ReqwestSessionClient {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let jar = Arc::new(Jar::default());

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let no_redirect = Client::builder()
            .cookie_provider(jar.clone())
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;

        Ok(Self {
            client,
            no_redirect,
            jar,
            timeout,
        })
    }
}

#[async_trait]
impl SessionHttpClient for ReqwestSessionClient {
    async fn execute(&self, request: SessionRequest) -> Result<SessionResponse, TransportError> {
        let client = if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect
        };

        let timeout = request.timeout.unwrap_or(self.timeout);
        let has_content_type = request.headers.contains_key(CONTENT_TYPE);
        let mut builder = client
            .request(request.method, request.url.as_str())
            .headers(request.headers)
            .timeout(timeout);

        builder = match request.body {
            RequestBody::None => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Json(value) if has_content_type => builder.body(value.to_string()),
            RequestBody::Json(value) => builder.json(&value),
        };

        let response = builder
            .send()
            .await
            .map_err(|err| map_error(err, timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| map_error(err, timeout))?;

        Ok(SessionResponse::new(status, headers, body, url))
    }

    fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.jar.cookies(url)?;
        let raw = header.to_str().ok()?;
        raw.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }
}

fn map_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

/// Builds a fresh [`ReqwestSessionClient`] (and cookie jar) per attempt.
#[derive(Debug, Clone)]
pub struct ReqwestSessionFactory {
    timeout: Duration,
}

impl ReqwestSessionFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ReqwestSessionFactory {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl SessionClientFactory for ReqwestSessionFactory {
    fn create(&self) -> Result<Arc<dyn SessionHttpClient>, TransportError> {
        Ok(Arc::new(ReqwestSessionClient::with_timeout(self.timeout)?))
    }
}
