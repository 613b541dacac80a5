//! Canned-response transport used by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION};
use http::Method;
use url::Url;

use super::error::TransportError;
use super::session::{SessionClientFactory, SessionHttpClient, SessionRequest, SessionResponse};

#[derive(Clone)]
struct Fixture {
    status: u16,
    headers: HeaderMap,
    body: String,
    cookies: Vec<(String, String)>,
}

/// Replays registered responses keyed by method + URL; anything else is a 404.
#[derive(Default)]
pub struct FixtureClient {
    fixtures: HashMap<(Method, String), Fixture>,
    failures: HashMap<(Method, String), TransportError>,
    jar: Mutex<HashMap<String, HashMap<String, String>>>,
    sent: Mutex<Vec<SessionRequest>>,
}

impl FixtureClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(mut self, method: Method, url: &str, fixture: Fixture) -> Self {
        self.fixtures.insert((method, url.to_string()), fixture);
        self
    }

    pub fn with_page(self, url: &str, status: u16, body: &str) -> Self {
        self.register(
            Method::GET,
            url,
            Fixture {
                status,
                headers: HeaderMap::new(),
                body: body.to_string(),
                cookies: Vec::new(),
            },
        )
    }

    /// GET fixture that also plants a cookie for the URL's host.
    pub fn with_page_setting_cookie(
        self,
        url: &str,
        body: &str,
        cookie: (&str, &str),
    ) -> Self {
        self.register(
            Method::GET,
            url,
            Fixture {
                status: 200,
                headers: HeaderMap::new(),
                body: body.to_string(),
                cookies: vec![(cookie.0.to_string(), cookie.1.to_string())],
            },
        )
    }

    pub fn with_post(self, url: &str, status: u16, body: &str) -> Self {
        self.register(
            Method::POST,
            url,
            Fixture {
                status,
                headers: HeaderMap::new(),
                body: body.to_string(),
                cookies: Vec::new(),
            },
        )
    }

    pub fn with_json(self, url: &str, value: serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.register(
            Method::GET,
            url,
            Fixture {
                status: 200,
                headers,
                body: value.to_string(),
                cookies: Vec::new(),
            },
        )
    }

    pub fn with_redirect(self, url: &str, location: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_str(location).unwrap());
        self.register(
            Method::GET,
            url,
            Fixture {
                status: 302,
                headers,
                body: String::new(),
                cookies: Vec::new(),
            },
        )
    }

    pub fn with_failure(mut self, url: &str, error: TransportError) -> Self {
        self.failures.insert((Method::GET, url.to_string()), error);
        self
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<SessionRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn request_count(&self, method: Method, url: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|req| req.method == method && req.url.as_str() == url)
            .count()
    }
}

#[async_trait]
impl SessionHttpClient for FixtureClient {
    async fn execute(&self, request: SessionRequest) -> Result<SessionResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        let key = (request.method.clone(), request.url.as_str().to_string());

        if let Some(error) = self.failures.get(&key) {
            return Err(error.clone());
        }

        let Some(fixture) = self.fixtures.get(&key).cloned() else {
            return Ok(SessionResponse::new(
                404,
                HeaderMap::new(),
                "not found",
                request.url,
            ));
        };

        if !fixture.cookies.is_empty() {
            let host = request.url.host_str().unwrap_or_default().to_string();
            let mut jar = self.jar.lock().unwrap();
            let entry = jar.entry(host).or_default();
            for (name, value) in fixture.cookies {
                entry.insert(name, value);
            }
        }

        Ok(SessionResponse::new(
            fixture.status,
            fixture.headers,
            fixture.body,
            request.url,
        ))
    }

    fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        self.jar
            .lock()
            .unwrap()
            .get(url.host_str()?)
            .and_then(|cookies| cookies.get(name).cloned())
    }
}

/// Factory handing out the same fixture client on every call.
pub struct FixtureFactory(pub Arc<FixtureClient>);

impl SessionClientFactory for FixtureFactory {
    fn create(&self) -> Result<Arc<dyn SessionHttpClient>, TransportError> {
        Ok(self.0.clone())
    }
}
