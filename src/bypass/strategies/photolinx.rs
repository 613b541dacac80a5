//! PhotoLinx (`photolinx.*`) download generator.
//!
//! The landing page issues a `PHPSESSID` cookie and carries a "generate"
//! button with `data-token` / `data-uid` attributes. Both are posted back as a
//! JSON `DOWNLOAD_GENERATE` action, which answers with the download URL.

use async_trait::async_trait;
use http::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, REFERER};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Value, json};
use url::Url;

use super::BypassStrategy;
use crate::bypass::classifier::ServiceFamily;
use crate::bypass::core::{
    BypassError, BypassSession, RawOutcome, TransportError, origin_of, resolve_link,
};

pub const DEFAULT_ORIGIN: &str = "https://photolinx.space";

const SESSION_COOKIE: &str = "PHPSESSID";
const ACTION_TYPE: &str = "DOWNLOAD_GENERATE";

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("invalid title selector"));
static GENERATE_BUTTON: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#generate_url").expect("invalid button selector"));
static ALTERNATE_BUTTONS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".generate-url, .btn-generate, [data-token]")
        .expect("invalid alternate button selector")
});

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"data-token\s*=\s*['"]([^'"]+)['"]"#).expect("invalid token regex")
});
static UID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-uid\s*=\s*['"]([^'"]+)['"]"#).expect("invalid uid regex"));

/// What the landing page gives away before the action call.
#[derive(Debug, Default, PartialEq)]
struct Landing {
    file_name: Option<String>,
    access_token: Option<String>,
    uid: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_landing(body: &str) -> Landing {
    let document = Html::parse_document(body);

    let file_name = document
        .select(&TITLE)
        .next()
        .map(|h1| h1.text().collect::<String>())
        .and_then(|text| non_empty(Some(text.as_str())));

    let button = document
        .select(&GENERATE_BUTTON)
        .next()
        .or_else(|| document.select(&ALTERNATE_BUTTONS).next());

    let mut access_token = button.and_then(|b| non_empty(b.value().attr("data-token")));
    let mut uid = button.and_then(|b| non_empty(b.value().attr("data-uid")));

    if access_token.is_none() || uid.is_none() {
        if button.is_none() {
            log::debug!("generate button not found, scanning markup for data attributes");
        }
        let capture = |re: &Regex| {
            re.captures(body)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        };
        access_token = access_token.or_else(|| capture(&*TOKEN_RE));
        uid = uid.or_else(|| capture(&*UID_RE));
    }

    Landing {
        file_name,
        access_token,
        uid,
    }
}

fn header(value: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(value)
        .map_err(|_| TransportError::InvalidRequest(format!("invalid header value '{value}'")))
}

fn action_headers(ssid: &str, referer: &Url) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers.insert(COOKIE, header(&format!("{SESSION_COOKIE}={ssid}"))?);
    headers.insert(REFERER, header(referer.as_str())?);
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    Ok(headers)
}

pub struct PhotoLinxStrategy {
    fallback_origin: String,
}

impl PhotoLinxStrategy {
    pub fn new() -> Self {
        Self::with_fallback_origin(DEFAULT_ORIGIN)
    }

    pub fn with_fallback_origin(origin: impl Into<String>) -> Self {
        Self {
            fallback_origin: origin.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for PhotoLinxStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BypassStrategy for PhotoLinxStrategy {
    fn family(&self) -> ServiceFamily {
        ServiceFamily::PhotoLinx
    }

    async fn bypass(
        &self,
        session: &mut BypassSession,
        url: &Url,
    ) -> Result<RawOutcome, BypassError> {
        let base = origin_of(url.as_str())
            .unwrap_or(&self.fallback_origin)
            .to_string();

        let landing = session.get(url).await?.ensure_success()?;
        let ssid = session
            .cookie(url, SESSION_COOKIE)
            .ok_or_else(|| BypassError::session("no PHPSESSID cookie found"))?;

        let Landing {
            file_name,
            access_token,
            uid,
        } = parse_landing(&landing.text());
        let (Some(access_token), Some(uid)) = (access_token, uid) else {
            return Err(BypassError::token("missing data-token/data-uid on the landing page"));
        };

        let payload = json!({
            "type": ACTION_TYPE,
            "payload": {
                "access_token": access_token,
                "uid": uid,
            }
        });
        let action_url = Url::parse(&format!("{base}/action"))?;
        let response = session
            .post_json(&action_url, payload, action_headers(&ssid, url)?)
            .await?;
        if response.status != 200 {
            return Err(TransportError::Status {
                status: response.status,
                url: action_url.to_string(),
            }
            .into());
        }

        let data: Value = response.json()?;
        let download_url = data
            .get("download_url")
            .and_then(Value::as_str)
            .and_then(|raw| resolve_link(&base, raw));
        if download_url.is_none() {
            log::debug!("action response for {url} carried no download_url");
        }

        Ok(RawOutcome::Download {
            file_name,
            url: download_url,
        })
    }
}
