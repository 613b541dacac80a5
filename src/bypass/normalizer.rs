//! Shape unification for strategy results.
//!
//! Every [`RawOutcome`] becomes a [`BypassResult`]: either a bundle of
//! labelled links (plus any file metadata) or the explicit `NotFound`
//! outcome. URLs pass through untouched apart from de-duplication and the
//! removal of blank entries.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::bypass::classifier::ServiceFamily;
use crate::bypass::core::{CandidateLink, RawOutcome};

/// Uniform link list handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkBundle {
    pub family: ServiceFamily,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_size: Option<String>,
    pub links: Vec<CandidateLink>,
}

impl LinkBundle {
    /// The one URL of a single-link family; `None` for list families.
    pub fn single_url(&self) -> Option<&str> {
        if self.family.is_single_link() {
            self.links.first().map(|link| link.url.as_str())
        } else {
            None
        }
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|link| link.url.as_str())
    }

    /// Caller-facing JSON: `{"url", "file_name"?}` for single-link families,
    /// otherwise `{"file_name"?, "file_size"?, "links": [{"type", "url"}]}`.
    pub fn to_json(&self) -> Value {
        if let Some(url) = self.single_url() {
            let mut value = json!({ "url": url });
            if let Some(file_name) = &self.file_name {
                value["file_name"] = json!(file_name);
            }
            return value;
        }

        let links: Vec<Value> = self
            .links
            .iter()
            .map(|link| json!({ "type": link.kind, "url": link.url }))
            .collect();

        let mut value = json!({ "links": links });
        if let Some(file_name) = &self.file_name {
            value["file_name"] = json!(file_name);
        }
        if let Some(file_size) = &self.file_size {
            value["file_size"] = json!(file_size);
        }
        value
    }
}

/// Normalized outcome of a successful bypass attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BypassResult {
    Found(LinkBundle),
    NotFound,
}

impl BypassResult {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn bundle(&self) -> Option<&LinkBundle> {
        match self {
            Self::Found(bundle) => Some(bundle),
            Self::NotFound => None,
        }
    }

    pub fn into_bundle(self) -> Option<LinkBundle> {
        match self {
            Self::Found(bundle) => Some(bundle),
            Self::NotFound => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Found(bundle) => bundle.to_json(),
            Self::NotFound => json!({ "not_found": true }),
        }
    }
}

/// Unify a strategy's raw result for `family`.
pub fn normalize(family: ServiceFamily, raw: RawOutcome) -> BypassResult {
    let label = family.default_label();
    let (file_name, file_size, links) = match raw {
        RawOutcome::Single(url) => (
            None,
            None,
            url.into_iter()
                .map(|url| CandidateLink::new(label, url))
                .collect(),
        ),
        RawOutcome::Links(urls) => (
            None,
            None,
            urls.into_iter()
                .map(|url| CandidateLink::new(label, url))
                .collect(),
        ),
        RawOutcome::Download { file_name, url } => {
            let links = url
                .into_iter()
                .map(|url| CandidateLink::new(label, url).with_file(file_name.clone(), None))
                .collect();
            (file_name, None, links)
        }
        RawOutcome::Catalogue {
            file_name,
            file_size,
            links,
        } => (file_name, file_size, links),
    };

    let links = dedupe_links(links);
    if links.is_empty() {
        return BypassResult::NotFound;
    }

    BypassResult::Found(LinkBundle {
        family,
        file_name: file_name.filter(|name| !name.trim().is_empty()),
        file_size: file_size.filter(|size| !size.trim().is_empty()),
        links,
    })
}

/// Drop blank URLs and keep the first link seen for each URL.
fn dedupe_links(links: Vec<CandidateLink>) -> Vec<CandidateLink> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| !link.url.trim().is_empty())
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_link_wraps_into_one_element_bundle() {
        let result = normalize(
            ServiceFamily::HubDrive,
            RawOutcome::Single(Some("https://hubcloud.one/drive/abc123".into())),
        );
        let bundle = result.bundle().unwrap();
        assert_eq!(bundle.links.len(), 1);
        assert_eq!(bundle.single_url(), Some("https://hubcloud.one/drive/abc123"));
        assert_eq!(
            result.to_json(),
            json!({ "url": "https://hubcloud.one/drive/abc123" })
        );
    }

    #[test]
    fn empty_results_are_not_found() {
        assert_eq!(
            normalize(ServiceFamily::HubCloud, RawOutcome::Single(None)),
            BypassResult::NotFound
        );
        assert_eq!(
            normalize(ServiceFamily::Gyani, RawOutcome::Links(vec!["  ".into()])),
            BypassResult::NotFound
        );
        assert_eq!(
            normalize(
                ServiceFamily::PhotoLinx,
                RawOutcome::Download {
                    file_name: Some("a.mkv".into()),
                    url: None
                }
            ),
            BypassResult::NotFound
        );
    }

    #[test]
    fn duplicate_urls_appear_once() {
        let result = normalize(
            ServiceFamily::FastiLinks,
            RawOutcome::Links(vec![
                "https://a.example/1".into(),
                "https://b.example/2".into(),
                "https://a.example/1".into(),
            ]),
        );
        let urls: Vec<&str> = result.bundle().unwrap().urls().collect();
        assert_eq!(urls, vec!["https://a.example/1", "https://b.example/2"]);
    }

    #[test]
    fn catalogue_keeps_metadata_and_labels() {
        let result = normalize(
            ServiceFamily::GDFlix,
            RawOutcome::Catalogue {
                file_name: Some("Movie.mkv".into()),
                file_size: Some("1.4GB".into()),
                links: vec![
                    CandidateLink::new("Direct", "https://d.example/1"),
                    CandidateLink::new("Index", "https://i.example/1"),
                    CandidateLink::new("Index", "https://d.example/1"),
                ],
            },
        );
        let bundle = result.bundle().unwrap();
        assert_eq!(bundle.single_url(), None);
        assert_eq!(
            bundle.to_json(),
            json!({
                "file_name": "Movie.mkv",
                "file_size": "1.4GB",
                "links": [
                    { "type": "Direct", "url": "https://d.example/1" },
                    { "type": "Index", "url": "https://i.example/1" }
                ]
            })
        );
    }

    #[test]
    fn download_carries_file_name_into_link() {
        let result = normalize(
            ServiceFamily::PhotoLinx,
            RawOutcome::Download {
                file_name: Some("clip.mp4".into()),
                url: Some("https://photolinx.space/dl/clip.mp4".into()),
            },
        );
        let bundle = result.into_bundle().unwrap();
        assert_eq!(bundle.file_name.as_deref(), Some("clip.mp4"));
        assert_eq!(bundle.links[0].kind, ServiceFamily::PhotoLinx.default_label());
        assert_eq!(bundle.links[0].file_name.as_deref(), Some("clip.mp4"));
        assert_eq!(
            bundle.to_json(),
            json!({
                "url": "https://photolinx.space/dl/clip.mp4",
                "file_name": "clip.mp4"
            })
        );
    }
}
